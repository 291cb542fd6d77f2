use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use openvibe_api::{Channel, MemoryBackend, WorkspaceId};
use tokio::task::LocalSet;
use ui::app::ChatAppShell;
use ui::chat::{ComposerEvent, KeyOutcome, Keystroke, SelectorView, SendTask};
use ui::routing::{HistoryRouter, Navigator};
use ui::settings::ClientSettings;

const SETTLE: Duration = Duration::from_millis(250);

struct Fixture {
    backend: Rc<MemoryBackend>,
    router: Rc<HistoryRouter>,
    general: Channel,
    random: Channel,
    shell: ChatAppShell,
}

fn fixture(location: &str, backend: MemoryBackend, settings: ClientSettings) -> Fixture {
    let workspace_id = WorkspaceId::new_v7();
    let backend = Rc::new(backend);
    let general = backend.add_channel(workspace_id, "general");
    let random = backend.add_channel(workspace_id, "random");
    let router = Rc::new(HistoryRouter::new(location));
    let shell = ChatAppShell::new(
        Arc::new(settings),
        workspace_id,
        backend.clone(),
        router.clone(),
    );

    Fixture {
        backend,
        router,
        general,
        random,
        shell,
    }
}

fn press_enter(shell: &ChatAppShell) -> Option<SendTask> {
    match shell.handle_key(&Keystroke::enter()) {
        KeyOutcome::Handled(task) => task,
        KeyOutcome::PassThrough => panic!("enter should be intercepted while a composer is mounted"),
    }
}

#[tokio::test(start_paused = true)]
async fn padded_draft_is_sent_trimmed_and_cleared() {
    LocalSet::new()
        .run_until(async {
            let mut fx = fixture("/general", MemoryBackend::new(), ClientSettings::default());
            fx.shell.start().await;

            fx.shell.type_text("  hello  ");
            press_enter(&fx.shell)
                .expect("send should start")
                .await
                .expect("send task completes");

            let stored = fx.backend.stored_messages(fx.general.id);
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].content, "hello");

            let composer = fx.shell.composer().expect("composer mounted").read();
            assert_eq!(composer.text(), "");
            assert!(!composer.is_pending());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn whitespace_only_draft_sends_nothing() {
    LocalSet::new()
        .run_until(async {
            let mut fx = fixture("/general", MemoryBackend::new(), ClientSettings::default());
            fx.shell.start().await;

            fx.shell.type_text("   ");
            assert!(press_enter(&fx.shell).is_none());
            assert_eq!(fx.backend.send_calls(), 0);

            let composer = fx.shell.composer().expect("composer mounted").read();
            assert_eq!(composer.text(), "   ");
            assert!(!composer.is_pending());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn location_selects_exactly_one_active_channel() {
    LocalSet::new()
        .run_until(async {
            let mut fx = fixture("/random", MemoryBackend::new(), ClientSettings::default());
            fx.shell.start().await;

            let view = fx.shell.selector().view();
            let SelectorView::Channels(rows) = &view else {
                panic!("channels should be loaded");
            };
            assert_eq!(rows.iter().filter(|row| row.active).count(), 1);
            assert_eq!(view.active_row().map(|row| row.id), Some(fx.random.id));

            let composer = fx.shell.composer().expect("composer mounted").read();
            assert_eq!(composer.channel_id(), fx.random.id);
            assert_eq!(composer.placeholder(), "Message #random");
            assert_eq!(fx.shell.coordinator().watched_channel(), Some(fx.random.id));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn failed_send_keeps_draft_and_skips_invalidation() {
    LocalSet::new()
        .run_until(async {
            let mut fx = fixture("/general", MemoryBackend::new(), ClientSettings::default());
            fx.shell.start().await;
            fx.backend.fail_next_sends(1);

            fx.shell.type_text("retry me");
            press_enter(&fx.shell)
                .expect("send should start")
                .await
                .expect("send task completes");

            {
                let composer = fx.shell.composer().expect("composer mounted").read();
                assert_eq!(composer.text(), "retry me");
                assert!(!composer.is_pending());
                assert!(composer.last_error().is_some());
            }

            let events = fx.shell.take_composer_events();
            assert!(matches!(
                events.as_slice(),
                [ComposerEvent::SendFailed { channel_id, .. }] if *channel_id == fx.general.id
            ));

            tokio::time::sleep(SETTLE * 4).await;
            assert!(!fx.shell.coordinator().is_stale(fx.general.id));
            assert_eq!(fx.backend.list_message_calls(fx.general.id), 1);

            // Retrying the same draft goes through.
            press_enter(&fx.shell)
                .expect("retry should start")
                .await
                .expect("send task completes");
            assert_eq!(fx.backend.stored_messages(fx.general.id).len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn rapid_sends_share_one_refetch() {
    LocalSet::new()
        .run_until(async {
            let mut fx = fixture(
                "/general",
                MemoryBackend::new().with_responder("Vibe"),
                ClientSettings::default(),
            );
            fx.shell.start().await;
            assert_eq!(fx.backend.list_message_calls(fx.general.id), 1);

            fx.shell.type_text("first");
            press_enter(&fx.shell)
                .expect("first send")
                .await
                .expect("send task completes");
            fx.shell.type_text("second");
            press_enter(&fx.shell)
                .expect("second send")
                .await
                .expect("send task completes");

            tokio::time::sleep(SETTLE * 4).await;

            assert_eq!(fx.backend.list_message_calls(fx.general.id), 2);
            assert_eq!(fx.backend.list_message_calls(fx.random.id), 0);

            let rows = fx.shell.active_message_rows().expect("messages loaded");
            let contents: Vec<_> = rows.iter().map(|row| row.content.as_str()).collect();
            assert_eq!(
                contents,
                ["first", "Received: first", "second", "Received: second"]
            );
            assert_eq!(rows[1].badge, Some("BOT"));
            assert_eq!(rows[1].avatar_label, "AI");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn navigating_replaces_the_composer() {
    LocalSet::new()
        .run_until(async {
            let mut fx = fixture("/general", MemoryBackend::new(), ClientSettings::default());
            fx.shell.start().await;
            fx.shell.type_text("unsent");

            fx.shell.navigate("/random").await;
            {
                let composer = fx.shell.composer().expect("composer mounted").read();
                assert_eq!(composer.channel_id(), fx.random.id);
                assert_eq!(composer.text(), "");
            }

            fx.shell.navigate("/").await;
            assert!(fx.shell.composer().is_none());
            assert!(fx.shell.active_channel().is_none());
            assert_eq!(fx.shell.coordinator().watched_channel(), None);
            assert!(matches!(
                fx.shell.handle_key(&Keystroke::enter()),
                KeyOutcome::PassThrough
            ));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn send_settling_after_navigation_does_not_touch_new_composer() {
    LocalSet::new()
        .run_until(async {
            let mut fx = fixture(
                "/general",
                MemoryBackend::new().with_latency(Duration::from_millis(100)),
                ClientSettings::default(),
            );
            fx.shell.start().await;

            fx.shell.type_text("in flight");
            let task = press_enter(&fx.shell).expect("send should start");

            fx.shell.navigate("/random").await;
            fx.shell.type_text("new draft");
            task.await.expect("send task completes");

            assert_eq!(fx.backend.stored_messages(fx.general.id).len(), 1);
            assert_eq!(
                fx.shell.composer().expect("composer mounted").read().text(),
                "new draft"
            );

            // General is no longer watched: it is marked stale but not refetched.
            tokio::time::sleep(SETTLE * 4).await;
            assert!(fx.shell.coordinator().is_stale(fx.general.id));
            assert_eq!(fx.backend.list_message_calls(fx.general.id), 1);

            fx.shell.navigate("/general").await;
            assert_eq!(fx.backend.list_message_calls(fx.general.id), 2);
            assert_eq!(fx.shell.active_message_rows().map(|rows| rows.len()), Some(1));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn selecting_a_channel_routes_through_the_navigator() {
    LocalSet::new()
        .run_until(async {
            let settings = ClientSettings {
                workspace_name: Some("Acme".to_string()),
                ..ClientSettings::default()
            };
            let mut fx = fixture("/", MemoryBackend::new(), settings);
            assert_eq!(fx.shell.selector().view(), SelectorView::Loading);

            fx.shell.start().await;
            assert_eq!(fx.shell.selector().workspace_title(), "Acme");
            assert!(fx.shell.composer().is_none());

            fx.shell.select_channel(fx.general.id).await;
            assert_eq!(fx.router.current_location(), "/general");
            assert_eq!(fx.router.history(), ["/", "/general"]);
            assert_eq!(
                fx.shell.active_channel().map(|channel| channel.id),
                Some(fx.general.id)
            );
            assert_eq!(fx.backend.list_channel_calls(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn dropped_send_handle_does_not_strand_the_composer() {
    LocalSet::new()
        .run_until(async {
            let mut fx = fixture("/general", MemoryBackend::new(), ClientSettings::default());
            fx.shell.start().await;

            fx.shell.type_text("fire and forget");
            drop(press_enter(&fx.shell));
            tokio::time::sleep(SETTLE * 4).await;

            assert_eq!(fx.backend.send_calls(), 1);
            assert_eq!(fx.backend.list_message_calls(fx.general.id), 2);
            let composer = fx.shell.composer().expect("composer mounted").read();
            assert!(!composer.is_pending());
            assert_eq!(composer.text(), "");
        })
        .await;
}
