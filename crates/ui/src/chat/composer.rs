use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use openvibe_api::{ApiResult, ChannelId, Message, SendRequest};
use tokio::task::JoinHandle;

use crate::chat::cache::CacheCoordinator;
use crate::chat::events::ComposerEvent;

pub const ACTIVATE_KEY: &str = "enter";

/// Geometry used to auto-size the input from its content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputMetrics {
    pub line_height: f32,
    pub max_height: f32,
    pub wrap_columns: usize,
}

impl Default for InputMetrics {
    fn default() -> Self {
        Self {
            line_height: 20.0,
            max_height: 200.0,
            wrap_columns: 80,
        }
    }
}

impl InputMetrics {
    /// Height of an empty, single-line input.
    pub fn baseline(&self) -> f32 {
        self.line_height
    }

    /// Unclamped height the content would occupy.
    pub fn natural_height(&self, text: &str) -> f32 {
        visual_line_count(text, self.wrap_columns) as f32 * self.line_height
    }

    /// Natural height clamped to `[one line, max_height]`.
    pub fn visible_height(&self, text: &str) -> f32 {
        let ceiling = self.max_height.max(self.line_height);
        self.natural_height(text).clamp(self.line_height, ceiling)
    }
}

/// Composer-local, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub pending: bool,
}

/// Identifies one submission so a late outcome can never settle a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SendTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub ticket: SendTicket,
    pub request: SendRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keystroke {
    pub key: String,
    pub shift: bool,
}

impl Keystroke {
    pub fn new(key: impl Into<String>, shift: bool) -> Self {
        Self {
            key: key.into(),
            shift,
        }
    }

    pub fn enter() -> Self {
        Self::new(ACTIVATE_KEY, false)
    }

    pub fn shift_enter() -> Self {
        Self::new(ACTIVATE_KEY, true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Submit and suppress the key's default newline insertion.
    Submit,
    /// Let the input apply its default behavior.
    Default,
}

pub struct Composer {
    channel_id: ChannelId,
    channel_name: String,
    metrics: InputMetrics,
    draft: Draft,
    height: f32,
    in_flight: Option<SendTicket>,
    next_ticket: u64,
    last_error: Option<String>,
    events: Vec<ComposerEvent>,
}

impl Composer {
    pub fn new(channel_id: ChannelId, channel_name: impl Into<String>, metrics: InputMetrics) -> Self {
        Self {
            channel_id,
            channel_name: channel_name.into(),
            metrics,
            draft: Draft::default(),
            height: metrics.baseline(),
            in_flight: None,
            next_ticket: 1,
            last_error: None,
            events: Vec::new(),
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn placeholder(&self) -> String {
        format!("Message #{}", self.channel_name)
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn text(&self) -> &str {
        &self.draft.text
    }

    pub fn is_pending(&self) -> bool {
        self.draft.pending
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Rendered reason of the most recent failed send, cleared by the next edit or success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replaces the draft text unconditionally and re-derives the visible height.
    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
        self.height = self.metrics.visible_height(&self.draft.text);
        self.last_error = None;
    }

    /// Whether the submit affordance is enabled. Always derived from current state.
    pub fn can_submit(&self) -> bool {
        !self.draft.pending && !self.draft.text.trim().is_empty()
    }

    /// Gates a submission and marks the composer pending.
    ///
    /// Returns `None` (silently) for blank drafts or while a send is in flight.
    pub fn begin_submit(&mut self) -> Option<PendingSend> {
        if self.draft.pending {
            tracing::debug!(channel_id = %self.channel_id, "submit ignored while a send is pending");
            return None;
        }

        let request = SendRequest::from_draft(self.channel_id, &self.draft.text)?;
        let ticket = SendTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.saturating_add(1);
        self.in_flight = Some(ticket);
        self.draft.pending = true;

        Some(PendingSend { ticket, request })
    }

    /// Settles the in-flight send. Returns false for outcomes that do not match it.
    pub fn finish_send(&mut self, ticket: SendTicket, outcome: &ApiResult<Message>) -> bool {
        if self.in_flight != Some(ticket) {
            tracing::debug!(channel_id = %self.channel_id, ?ticket, "ignoring stale send outcome");
            return false;
        }

        self.in_flight = None;
        self.draft.pending = false;

        match outcome {
            Ok(message) => {
                self.draft.text.clear();
                self.height = self.metrics.baseline();
                self.last_error = None;
                self.events.push(ComposerEvent::Sent {
                    channel_id: self.channel_id,
                    message_id: message.id,
                });
            }
            Err(error) => {
                // Draft is kept verbatim so the user can retry.
                let reason = error.to_string();
                self.last_error = Some(reason.clone());
                self.events.push(ComposerEvent::SendFailed {
                    channel_id: self.channel_id,
                    reason,
                });
            }
        }

        true
    }

    pub fn dispatch_key(keystroke: &Keystroke) -> KeyAction {
        if keystroke.key == ACTIVATE_KEY && !keystroke.shift {
            KeyAction::Submit
        } else {
            KeyAction::Default
        }
    }

    pub fn take_events(&mut self) -> Vec<ComposerEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Send spawned on the current `LocalSet`. Dropping the handle detaches it; the send still settles.
pub type SendTask = JoinHandle<()>;

pub enum KeyOutcome {
    /// Key was not intercepted; the input applies its default.
    PassThrough,
    /// Key was intercepted. Carries the send task when the submit was accepted.
    Handled(Option<SendTask>),
}

/// Shared handle to a mounted composer.
///
/// Send tasks only keep a weak reference, so a send that settles after the
/// composer is dropped runs its continuation as a no-op.
#[derive(Clone)]
pub struct ComposerHandle {
    inner: Rc<RefCell<Composer>>,
}

impl ComposerHandle {
    pub fn new(composer: Composer) -> Self {
        Self {
            inner: Rc::new(RefCell::new(composer)),
        }
    }

    pub fn read(&self) -> Ref<'_, Composer> {
        self.inner.borrow()
    }

    pub fn update<R>(&self, update: impl FnOnce(&mut Composer) -> R) -> R {
        update(&mut *self.inner.borrow_mut())
    }

    pub fn downgrade(&self) -> Weak<RefCell<Composer>> {
        Rc::downgrade(&self.inner)
    }

    pub fn update_draft(&self, text: impl Into<String>) {
        self.update(|composer| composer.update_draft(text));
    }

    /// Starts a submission through the coordinator.
    ///
    /// The send is spawned immediately, so `pending` always has exactly one
    /// request behind it. Must be called inside a `LocalSet`.
    pub fn submit(&self, coordinator: &Rc<CacheCoordinator>) -> Option<SendTask> {
        let PendingSend { ticket, request } = self.update(Composer::begin_submit)?;
        let composer = self.downgrade();
        let coordinator = Rc::clone(coordinator);

        Some(tokio::task::spawn_local(async move {
            let channel_id = request.channel_id;
            let outcome = coordinator.send(request).await;

            let Some(composer) = composer.upgrade() else {
                tracing::warn!(%channel_id, "composer dropped before send settled; ignoring outcome");
                return;
            };
            composer.borrow_mut().finish_send(ticket, &outcome);
        }))
    }

    pub fn handle_key(&self, keystroke: &Keystroke, coordinator: &Rc<CacheCoordinator>) -> KeyOutcome {
        match Composer::dispatch_key(keystroke) {
            KeyAction::Submit => KeyOutcome::Handled(self.submit(coordinator)),
            KeyAction::Default => KeyOutcome::PassThrough,
        }
    }
}

fn visual_line_count(text: &str, wrap_columns: usize) -> usize {
    let wrap_columns = wrap_columns.max(1);
    text.split('\n')
        .map(|line| line.chars().count().div_ceil(wrap_columns).max(1))
        .sum()
}
