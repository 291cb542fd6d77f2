//! Remote contract for the channel messaging surface.
//!
//! The traits here are the only way the client core talks to the server. They
//! are transport-agnostic and return local (non-`Send`) futures because the
//! client core runs on a single-threaded cooperative executor.
#![deny(unsafe_code)]

pub mod error;
pub mod ids;
pub mod memory;
pub mod types;

use futures::future::LocalBoxFuture;

pub use error::{ApiError, ApiResult};
pub use ids::{ChannelId, MessageId, WorkspaceId};
pub use memory::MemoryBackend;
pub use types::{AuthorType, Channel, Message, SendRequest};

pub trait MessageApi {
    /// Persists one message. Callers must issue at most one call per submission.
    fn send_message(&self, request: SendRequest) -> LocalBoxFuture<'_, ApiResult<Message>>;
    /// Lists a channel's messages in server order.
    fn list_messages(&self, channel_id: ChannelId) -> LocalBoxFuture<'_, ApiResult<Vec<Message>>>;
}

pub trait ChannelApi {
    /// Lists a workspace's channels in server listing order.
    fn list_channels(
        &self,
        workspace_id: WorkspaceId,
    ) -> LocalBoxFuture<'_, ApiResult<Vec<Channel>>>;
}

/// Everything a full client needs from one backend handle.
pub trait RemoteApi: MessageApi + ChannelApi {}

impl<T> RemoteApi for T where T: MessageApi + ChannelApi {}
