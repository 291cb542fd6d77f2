use serde::{Deserialize, Serialize};

use super::ids::{ChannelId, MessageId, WorkspaceId};

/// Who authored a message. Agents are automated responders living in a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorType {
    Human,
    Agent,
}

/// Server-owned message. Clients only ever hold read-only cached copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub content: String,
    #[serde(default)]
    pub author_name: Option<String>,
    pub author_type: AuthorType,
    #[serde(rename = "createdAt")]
    pub created_at_unix_seconds: u64,
}

/// Server-owned channel. `name` is unique within a workspace and doubles as the route slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub workspace_id: WorkspaceId,
    pub name: String,
}

impl Channel {
    pub fn new(id: ChannelId, workspace_id: WorkspaceId, name: impl Into<String>) -> Self {
        Self {
            id,
            workspace_id,
            name: name.into(),
        }
    }
}

/// Validated payload submitted for remote persistence.
///
/// Content is always trimmed and never empty; `from_draft` is the only way
/// callers outside this crate should build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub channel_id: ChannelId,
    pub content: String,
}

impl SendRequest {
    pub fn from_draft(channel_id: ChannelId, draft_text: &str) -> Option<Self> {
        let trimmed = draft_text.trim();
        if trimmed.is_empty() {
            return None;
        }

        Some(Self {
            channel_id,
            content: trimmed.to_string(),
        })
    }
}
