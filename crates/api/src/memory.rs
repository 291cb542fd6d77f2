use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::future::LocalBoxFuture;
use snafu::{OptionExt, ensure};

use super::error::{ApiResult, EmptyContentSnafu, NotFoundSnafu, TransportSnafu};
use super::ids::{ChannelId, MessageId, WorkspaceId};
use super::types::{AuthorType, Channel, Message, SendRequest};
use super::{ChannelApi, MessageApi};

pub const DEFAULT_HUMAN_AUTHOR: &str = "You";

#[derive(Debug, Default)]
struct MemoryState {
    channels: Vec<Channel>,
    messages: HashMap<ChannelId, Vec<Message>>,
    responder_name: Option<String>,
    latency: Option<Duration>,
    failing_sends: usize,
    failing_lists: usize,
    send_calls: usize,
    list_message_calls: HashMap<ChannelId, usize>,
    list_channel_calls: usize,
}

/// In-process backend with server-side validation, failure injection and call counters.
///
/// Mirrors what the real server does on send: trims and validates content,
/// appends to the channel log, and optionally lets an automated responder
/// reply, which is why clients must refetch instead of appending locally.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RefCell<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a channel at the end of the workspace listing order.
    pub fn add_channel(&self, workspace_id: WorkspaceId, name: impl Into<String>) -> Channel {
        let channel = Channel::new(ChannelId::new_v7(), workspace_id, name);
        let mut state = self.state.borrow_mut();
        state.messages.entry(channel.id).or_default();
        state.channels.push(channel.clone());
        channel
    }

    pub fn with_responder(self, name: impl Into<String>) -> Self {
        self.state.borrow_mut().responder_name = Some(name.into());
        self
    }

    /// Delays every call by `latency` on the tokio clock.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.borrow_mut().latency = Some(latency);
        self
    }

    /// Makes the next `count` sends fail with a transport error.
    pub fn fail_next_sends(&self, count: usize) {
        self.state.borrow_mut().failing_sends = count;
    }

    /// Makes the next `count` message listings fail with a transport error.
    pub fn fail_next_lists(&self, count: usize) {
        self.state.borrow_mut().failing_lists = count;
    }

    pub fn send_calls(&self) -> usize {
        self.state.borrow().send_calls
    }

    pub fn list_message_calls(&self, channel_id: ChannelId) -> usize {
        self.state
            .borrow()
            .list_message_calls
            .get(&channel_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn list_channel_calls(&self) -> usize {
        self.state.borrow().list_channel_calls
    }

    /// Stored message log for a channel, bypassing call accounting.
    pub fn stored_messages(&self, channel_id: ChannelId) -> Vec<Message> {
        self.state
            .borrow()
            .messages
            .get(&channel_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn simulate_latency(&self) {
        let latency = self.state.borrow().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn accept_message(&self, request: SendRequest) -> ApiResult<Message> {
        let mut state = self.state.borrow_mut();
        state.send_calls += 1;

        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return TransportSnafu {
                stage: "memory-send-message",
                details: "injected send failure".to_string(),
            }
            .fail();
        }

        let content = request.content.trim().to_string();
        ensure!(
            !content.is_empty(),
            EmptyContentSnafu {
                stage: "memory-send-message",
                channel_id: request.channel_id.to_string(),
            }
        );

        let responder_name = state.responder_name.clone();
        let log = state
            .messages
            .get_mut(&request.channel_id)
            .context(NotFoundSnafu {
                stage: "memory-send-message",
                entity: "channel",
                id: request.channel_id.to_string(),
            })?;

        let accepted = Message {
            id: MessageId::new_v7(),
            channel_id: request.channel_id,
            content,
            author_name: Some(DEFAULT_HUMAN_AUTHOR.to_string()),
            author_type: AuthorType::Human,
            created_at_unix_seconds: unix_now_seconds(),
        };
        log.push(accepted.clone());

        if let Some(responder_name) = responder_name {
            log.push(Message {
                id: MessageId::new_v7(),
                channel_id: request.channel_id,
                content: format!("Received: {}", accepted.content),
                author_name: Some(responder_name),
                author_type: AuthorType::Agent,
                created_at_unix_seconds: unix_now_seconds(),
            });
        }

        tracing::debug!(channel_id = %request.channel_id, "memory backend accepted message");
        Ok(accepted)
    }
}

impl MessageApi for MemoryBackend {
    fn send_message(&self, request: SendRequest) -> LocalBoxFuture<'_, ApiResult<Message>> {
        Box::pin(async move {
            self.simulate_latency().await;
            self.accept_message(request)
        })
    }

    fn list_messages(&self, channel_id: ChannelId) -> LocalBoxFuture<'_, ApiResult<Vec<Message>>> {
        Box::pin(async move {
            self.simulate_latency().await;
            let mut state = self.state.borrow_mut();
            *state.list_message_calls.entry(channel_id).or_insert(0) += 1;

            if state.failing_lists > 0 {
                state.failing_lists -= 1;
                return TransportSnafu {
                    stage: "memory-list-messages",
                    details: "injected listing failure".to_string(),
                }
                .fail();
            }

            state
                .messages
                .get(&channel_id)
                .cloned()
                .context(NotFoundSnafu {
                    stage: "memory-list-messages",
                    entity: "channel",
                    id: channel_id.to_string(),
                })
        })
    }
}

impl ChannelApi for MemoryBackend {
    fn list_channels(
        &self,
        workspace_id: WorkspaceId,
    ) -> LocalBoxFuture<'_, ApiResult<Vec<Channel>>> {
        Box::pin(async move {
            self.simulate_latency().await;
            let mut state = self.state.borrow_mut();
            state.list_channel_calls += 1;
            Ok(state
                .channels
                .iter()
                .filter(|channel| channel.workspace_id == workspace_id)
                .cloned()
                .collect())
        })
    }
}

fn unix_now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}
