use std::rc::Rc;
use std::sync::Arc;

use openvibe_api::{Channel, ChannelApi, ChannelId, MessageApi, RemoteApi, WorkspaceId};

use crate::chat::message::{self, MessageRow};
use crate::chat::{
    CacheCoordinator, ChannelSelector, Composer, ComposerEvent, ComposerHandle, KeyOutcome,
    Keystroke,
};
use crate::routing::Navigator;
use crate::settings::ClientSettings;

/// Application shell that composes the selector, the cache coordinator and the composer.
///
/// The three components never share implicit state: the shell reads the
/// router, feeds the selector, opens the active channel in the coordinator
/// and mounts one composer per active channel.
pub struct ChatAppShell {
    settings: Arc<ClientSettings>,
    workspace_id: WorkspaceId,
    channels_api: Rc<dyn ChannelApi>,
    coordinator: Rc<CacheCoordinator>,
    router: Rc<dyn Navigator>,
    selector: ChannelSelector,
    composer: Option<ComposerHandle>,
}

impl ChatAppShell {
    pub fn new<A>(
        settings: Arc<ClientSettings>,
        workspace_id: WorkspaceId,
        api: Rc<A>,
        router: Rc<dyn Navigator>,
    ) -> Self
    where
        A: RemoteApi + 'static,
    {
        let message_api: Rc<dyn MessageApi> = api.clone();
        let channels_api: Rc<dyn ChannelApi> = api;
        let coordinator = CacheCoordinator::new(message_api, settings.cache.settle_window());
        let selector =
            ChannelSelector::new(settings.workspace_name.clone(), router.current_location());

        Self {
            settings,
            workspace_id,
            channels_api,
            coordinator,
            router,
            selector,
            composer: None,
        }
    }

    pub fn selector(&self) -> &ChannelSelector {
        &self.selector
    }

    pub fn coordinator(&self) -> &Rc<CacheCoordinator> {
        &self.coordinator
    }

    pub fn composer(&self) -> Option<&ComposerHandle> {
        self.composer.as_ref()
    }

    pub fn active_channel(&self) -> Option<&Channel> {
        self.selector.channel_for_location()
    }

    /// Loads the channel list and mounts whatever the current location points at.
    pub async fn start(&mut self) {
        self.selector
            .load(self.channels_api.as_ref(), self.workspace_id)
            .await;
        self.sync_location().await;
    }

    pub async fn navigate(&mut self, path: &str) {
        self.router.navigate_to(path);
        self.sync_location().await;
    }

    pub async fn select_channel(&mut self, channel_id: ChannelId) {
        let Some(intent) = self.selector.select(channel_id) else {
            tracing::warn!(%channel_id, "selected channel is not in the list");
            return;
        };
        self.navigate(&intent.route).await;
    }

    /// Re-derives the active channel from the router.
    pub async fn sync_location(&mut self) {
        self.selector.set_location(self.router.current_location());

        let Some(channel) = self.selector.channel_for_location().cloned() else {
            self.composer = None;
            self.coordinator.close_channel();
            return;
        };

        let already_mounted = self
            .composer
            .as_ref()
            .is_some_and(|composer| composer.read().channel_id() == channel.id);
        if !already_mounted {
            // Replacing the handle unmounts the previous composer; its in-flight send becomes a no-op.
            self.composer = Some(ComposerHandle::new(Composer::new(
                channel.id,
                channel.name.clone(),
                self.settings.composer.metrics(),
            )));
        }

        self.coordinator.open_channel(channel.id).await;
    }

    pub fn type_text(&self, text: &str) {
        if let Some(composer) = self.composer.as_ref() {
            composer.update_draft(text);
        }
    }

    pub fn handle_key(&self, keystroke: &Keystroke) -> KeyOutcome {
        match self.composer.as_ref() {
            Some(composer) => composer.handle_key(keystroke, &self.coordinator),
            None => KeyOutcome::PassThrough,
        }
    }

    pub fn take_composer_events(&self) -> Vec<ComposerEvent> {
        self.composer
            .as_ref()
            .map(|composer| composer.update(Composer::take_events))
            .unwrap_or_default()
    }

    /// Rows for the active channel, `None` while its collection has never loaded.
    pub fn active_message_rows(&self) -> Option<Vec<MessageRow>> {
        let channel = self.active_channel()?;
        let messages = self.coordinator.messages(channel.id)?;
        Some(message::rows(&messages))
    }
}
