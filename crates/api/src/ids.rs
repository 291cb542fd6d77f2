use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use uuid::Uuid;

use super::error::{ApiError, ApiResult, InvalidIdSnafu};

/// Ids are minted client-side as UUIDv7 so they sort by creation time, and
/// travel as bare strings on the wire.
macro_rules! define_api_id {
    ($name:ident, $id_type:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Parses a route segment or wire value, tolerating surrounding whitespace.
            pub fn parse(raw: &str) -> ApiResult<Self> {
                Uuid::parse_str(raw.trim())
                    .map(Self)
                    .context(InvalidIdSnafu {
                        stage: "parse-api-id",
                        id_type: $id_type,
                        raw: raw.to_string(),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, formatter)
            }
        }

        impl FromStr for $name {
            type Err = ApiError;

            fn from_str(raw: &str) -> ApiResult<Self> {
                Self::parse(raw)
            }
        }
    };
}

define_api_id!(WorkspaceId, "workspace-id");
define_api_id!(ChannelId, "channel-id");
define_api_id!(MessageId, "message-id");
