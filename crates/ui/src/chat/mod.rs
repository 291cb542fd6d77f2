/// Cache coordinator: send-then-invalidate consistency for per-channel message collections.
pub mod cache;
pub mod composer;
/// Event contracts for chat module wiring.
pub mod events;
pub mod message;
pub mod sidebar;

pub use cache::{CacheCoordinator, EntryStatus};
pub use composer::{
    Composer, ComposerHandle, Draft, InputMetrics, KeyAction, KeyOutcome, Keystroke, PendingSend,
    SendTask, SendTicket,
};
pub use events::{CacheEvent, ComposerEvent, NavigationIntent};
pub use message::MessageRow;
pub use sidebar::{ChannelRow, ChannelSelector, SelectorView, channel_route};
