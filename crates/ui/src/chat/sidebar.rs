use openvibe_api::{Channel, ChannelApi, ChannelId, WorkspaceId};

use crate::chat::events::NavigationIntent;
use crate::settings::state::DEFAULT_WORKSPACE_NAME;

pub const LOADING_PLACEHOLDER: &str = "Loading...";
pub const CHANNELS_HEADING: &str = "Channels";

/// Route a channel is reachable at. Pure function of the (workspace-unique) name.
pub fn channel_route(name: &str) -> String {
    format!("/{name}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRow {
    pub id: ChannelId,
    pub name: String,
    pub route: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorView {
    /// Channel list has not arrived yet; rendered as one non-interactive row.
    Loading,
    Channels(Vec<ChannelRow>),
}

impl SelectorView {
    pub fn active_row(&self) -> Option<&ChannelRow> {
        match self {
            Self::Loading => None,
            Self::Channels(rows) => rows.iter().find(|row| row.active),
        }
    }
}

/// Channel list plus active-channel derivation against the current location.
pub struct ChannelSelector {
    workspace_name: Option<String>,
    channels: Option<Vec<Channel>>,
    location: String,
}

impl ChannelSelector {
    pub fn new(workspace_name: Option<String>, location: impl Into<String>) -> Self {
        Self {
            workspace_name,
            channels: None,
            location: location.into(),
        }
    }

    pub fn workspace_title(&self) -> &str {
        self.workspace_name
            .as_deref()
            .unwrap_or(DEFAULT_WORKSPACE_NAME)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    pub fn is_loading(&self) -> bool {
        self.channels.is_none()
    }

    pub fn channels(&self) -> Option<&[Channel]> {
        self.channels.as_deref()
    }

    pub fn set_channels(&mut self, channels: Vec<Channel>) {
        self.channels = Some(channels);
    }

    /// Fetches the workspace's channels. Failures keep the loading state.
    pub async fn load(&mut self, api: &dyn ChannelApi, workspace_id: WorkspaceId) {
        match api.list_channels(workspace_id).await {
            Ok(channels) => {
                tracing::info!(%workspace_id, count = channels.len(), "loaded channels");
                self.set_channels(channels);
            }
            Err(error) => {
                tracing::error!(%workspace_id, stage = error.stage(), "failed to load channels: {error}");
            }
        }
    }

    pub fn view(&self) -> SelectorView {
        let Some(channels) = self.channels.as_ref() else {
            return SelectorView::Loading;
        };

        let rows = channels
            .iter()
            .map(|channel| {
                let route = channel_route(&channel.name);
                ChannelRow {
                    id: channel.id,
                    name: channel.name.clone(),
                    active: route == self.location,
                    route,
                }
            })
            .collect();

        SelectorView::Channels(rows)
    }

    /// Channel whose route exactly matches the current location, if any.
    pub fn channel_for_location(&self) -> Option<&Channel> {
        self.channels
            .as_ref()?
            .iter()
            .find(|channel| channel_route(&channel.name) == self.location)
    }

    /// Builds the navigation intent for a click. Navigation itself belongs to the router.
    pub fn select(&self, channel_id: ChannelId) -> Option<NavigationIntent> {
        let channel = self
            .channels
            .as_ref()?
            .iter()
            .find(|channel| channel.id == channel_id)?;

        Some(NavigationIntent {
            channel_id,
            route: channel_route(&channel.name),
        })
    }
}
