use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ApiError {
    #[snafu(display("{entity} with id '{id}' was not found"))]
    NotFound {
        stage: &'static str,
        entity: &'static str,
        id: String,
    },
    #[snafu(display("message content for channel '{channel_id}' is empty after trimming"))]
    EmptyContent {
        stage: &'static str,
        channel_id: String,
    },
    #[snafu(display("id '{raw}' is invalid for {id_type}"))]
    InvalidId {
        stage: &'static str,
        id_type: &'static str,
        raw: String,
        source: uuid::Error,
    },
    #[snafu(display("transport failed on `{stage}`: {details}"))]
    Transport {
        stage: &'static str,
        details: String,
    },
}

impl ApiError {
    /// Returns the operation stage that produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::NotFound { stage, .. }
            | Self::EmptyContent { stage, .. }
            | Self::InvalidId { stage, .. }
            | Self::Transport { stage, .. } => *stage,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
