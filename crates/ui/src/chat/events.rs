use openvibe_api::{ChannelId, MessageId};

/// Emitted by a composer once its in-flight send settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerEvent {
    Sent {
        channel_id: ChannelId,
        message_id: MessageId,
    },
    SendFailed {
        channel_id: ChannelId,
        reason: String,
    },
}

/// Broadcast by the cache coordinator whenever a channel's cached collection changes state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Invalidated {
        channel_id: ChannelId,
        generation: u64,
    },
    Refreshed {
        channel_id: ChannelId,
        message_count: usize,
    },
    RefreshFailed {
        channel_id: ChannelId,
        reason: String,
    },
}

/// Emitted when the user picks a channel. Routing collaborators perform the navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationIntent {
    pub channel_id: ChannelId,
    pub route: String,
}
