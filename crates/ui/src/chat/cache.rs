use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use std::time::Duration;

use openvibe_api::{ApiResult, ChannelId, Message, MessageApi, SendRequest};
use tokio::sync::broadcast;

use crate::chat::events::CacheEvent;

const CACHE_EVENT_CAPACITY: usize = 64;

/// Freshness of one channel's cached collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Fresh,
    Stale,
}

#[derive(Debug, Default)]
struct CacheEntry {
    messages: Option<Vec<Message>>,
    // Bumped on every invalidation; a fetch is current only if it started at this generation.
    generation: u64,
    fetched_generation: Option<u64>,
}

impl CacheEntry {
    fn status(&self) -> EntryStatus {
        if self.messages.is_some() && self.fetched_generation == Some(self.generation) {
            EntryStatus::Fresh
        } else {
            EntryStatus::Stale
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<ChannelId, CacheEntry>,
    watched: Option<ChannelId>,
    refreshing: HashSet<ChannelId>,
}

/// Owns the per-channel message cache and keeps it consistent with the server after sends.
///
/// Sends are fire-and-confirm: nothing is appended locally. A confirmed send
/// invalidates exactly the channel it targeted, and the watched channel is
/// refetched once per settle window no matter how many sends land inside it.
/// Refresh tasks run on the current `LocalSet`.
pub struct CacheCoordinator {
    api: Rc<dyn MessageApi>,
    settle_window: Duration,
    state: RefCell<CacheState>,
    events: broadcast::Sender<CacheEvent>,
}

impl CacheCoordinator {
    pub fn new(api: Rc<dyn MessageApi>, settle_window: Duration) -> Rc<Self> {
        let (events, _) = broadcast::channel(CACHE_EVENT_CAPACITY);
        Rc::new(Self {
            api,
            settle_window,
            state: RefCell::new(CacheState::default()),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    pub fn settle_window(&self) -> Duration {
        self.settle_window
    }

    pub fn watched_channel(&self) -> Option<ChannelId> {
        self.state.borrow().watched
    }

    /// Snapshot of the cached collection, `None` if the channel was never loaded.
    pub fn messages(&self, channel_id: ChannelId) -> Option<Vec<Message>> {
        self.state
            .borrow()
            .entries
            .get(&channel_id)
            .and_then(|entry| entry.messages.clone())
    }

    /// Freshness of a channel, `None` if it was never cached or invalidated.
    pub fn status(&self, channel_id: ChannelId) -> Option<EntryStatus> {
        self.state
            .borrow()
            .entries
            .get(&channel_id)
            .map(CacheEntry::status)
    }

    pub fn is_stale(&self, channel_id: ChannelId) -> bool {
        self.status(channel_id) == Some(EntryStatus::Stale)
    }

    pub fn is_refreshing(&self, channel_id: ChannelId) -> bool {
        self.state.borrow().refreshing.contains(&channel_id)
    }

    /// Makes `channel_id` the watched channel and loads it right away if it is missing or stale.
    pub async fn open_channel(self: &Rc<Self>, channel_id: ChannelId) {
        let generation = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            state.watched = Some(channel_id);

            let entry = state.entries.entry(channel_id).or_default();
            let generation = entry.generation;
            if entry.status() == EntryStatus::Fresh || state.refreshing.contains(&channel_id) {
                return;
            }

            state.refreshing.insert(channel_id);
            generation
        };

        let result = self.api.list_messages(channel_id).await;
        if self.apply_fetch(channel_id, generation, result) {
            self.spawn_refresh(channel_id);
        } else {
            self.state.borrow_mut().refreshing.remove(&channel_id);
        }
    }

    /// Stops watching. Later invalidations only mark channels stale.
    pub fn close_channel(&self) {
        self.state.borrow_mut().watched = None;
    }

    /// Issues one send and invalidates the target channel once the server confirms it.
    pub async fn send(self: &Rc<Self>, request: SendRequest) -> ApiResult<Message> {
        let channel_id = request.channel_id;
        match self.api.send_message(request).await {
            Ok(message) => {
                tracing::info!(%channel_id, message_id = %message.id, "send confirmed");
                self.invalidate(channel_id);
                Ok(message)
            }
            Err(error) => {
                tracing::warn!(%channel_id, stage = error.stage(), "send failed: {error}");
                Err(error)
            }
        }
    }

    /// Marks one channel's collection stale and schedules a coalesced refetch if it is watched.
    pub fn invalidate(self: &Rc<Self>, channel_id: ChannelId) {
        let (generation, watched, already_refreshing) = {
            let mut state = self.state.borrow_mut();
            let entry = state.entries.entry(channel_id).or_default();
            entry.generation = entry.generation.saturating_add(1);
            let generation = entry.generation;
            let watched = state.watched == Some(channel_id);
            let already_refreshing = state.refreshing.contains(&channel_id);
            if watched && !already_refreshing {
                state.refreshing.insert(channel_id);
            }
            (generation, watched, already_refreshing)
        };

        let _ = self.events.send(CacheEvent::Invalidated {
            channel_id,
            generation,
        });

        if !watched {
            tracing::debug!(%channel_id, "channel not watched; refetch deferred until reopened");
            return;
        }

        if already_refreshing {
            tracing::debug!(%channel_id, generation, "invalidation coalesced into pending refresh");
            return;
        }

        self.spawn_refresh(channel_id);
    }

    fn spawn_refresh(self: &Rc<Self>, channel_id: ChannelId) {
        let coordinator = Rc::downgrade(self);
        let settle_window = self.settle_window;
        tokio::task::spawn_local(run_refresh(coordinator, channel_id, settle_window));
    }

    fn current_generation(&self, channel_id: ChannelId) -> u64 {
        self.state
            .borrow()
            .entries
            .get(&channel_id)
            .map(|entry| entry.generation)
            .unwrap_or(0)
    }

    fn is_watched(&self, channel_id: ChannelId) -> bool {
        self.state.borrow().watched == Some(channel_id)
    }

    fn finish_refresh(&self, channel_id: ChannelId) {
        self.state.borrow_mut().refreshing.remove(&channel_id);
    }

    /// Stores a fetch result into its own channel entry.
    ///
    /// Returns true when the channel was invalidated again while the fetch was
    /// in flight and is still watched, meaning one more settle cycle is owed.
    /// That holds whether the fetch succeeded or failed.
    fn apply_fetch(
        &self,
        channel_id: ChannelId,
        fetched_generation: u64,
        result: ApiResult<Vec<Message>>,
    ) -> bool {
        match result {
            Ok(messages) => {
                let message_count = messages.len();
                let needs_another_cycle = {
                    let mut state = self.state.borrow_mut();
                    let watched = state.watched == Some(channel_id);
                    let entry = state.entries.entry(channel_id).or_default();
                    entry.messages = Some(messages);
                    entry.fetched_generation = Some(fetched_generation);
                    watched && entry.generation != fetched_generation
                };

                tracing::info!(%channel_id, message_count, "channel messages refreshed");
                let _ = self.events.send(CacheEvent::Refreshed {
                    channel_id,
                    message_count,
                });
                needs_another_cycle
            }
            Err(error) => {
                // Previous list stays; only an invalidation that raced the fetch earns a retry.
                let needs_another_cycle = {
                    let state = self.state.borrow();
                    state.watched == Some(channel_id)
                        && state
                            .entries
                            .get(&channel_id)
                            .is_some_and(|entry| entry.generation != fetched_generation)
                };

                tracing::error!(%channel_id, stage = error.stage(), "failed to refresh messages: {error}");
                let _ = self.events.send(CacheEvent::RefreshFailed {
                    channel_id,
                    reason: error.to_string(),
                });
                needs_another_cycle
            }
        }
    }
}

async fn run_refresh(coordinator: Weak<CacheCoordinator>, channel_id: ChannelId, settle: Duration) {
    loop {
        tokio::time::sleep(settle).await;

        let Some(this) = coordinator.upgrade() else {
            return;
        };

        if !this.is_watched(channel_id) {
            // Navigated away during the settle window: leave the entry stale for the next open.
            tracing::debug!(%channel_id, "dropping refresh for channel that is no longer watched");
            this.finish_refresh(channel_id);
            return;
        }

        let generation = this.current_generation(channel_id);
        let result = this.api.list_messages(channel_id).await;
        if !this.apply_fetch(channel_id, generation, result) {
            this.finish_refresh(channel_id);
            return;
        }
    }
}
