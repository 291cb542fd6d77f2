use std::rc::Rc;
use std::time::Duration;

use openvibe_api::{MemoryBackend, WorkspaceId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::LocalSet;
use tracing_subscriber::EnvFilter;

use ui::app::ChatAppShell;
use ui::chat::{ComposerEvent, KeyOutcome, Keystroke, SelectorView, sidebar};
use ui::routing::HistoryRouter;
use ui::settings::SettingsStore;

const DEMO_LATENCY: Duration = Duration::from_millis(150);
const DEMO_RESPONDER: &str = "Vibe";

/// Line-oriented demo of the client core over the in-memory backend.
///
/// `/name` navigates to a channel; any other line is typed into the composer
/// and submitted with Enter. The message list is printed once the cache has
/// settled and refetched.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!("failed to initialize runtime: {error}");
            return;
        }
    };

    // Everything in the core is single-threaded, so it runs on one LocalSet.
    LocalSet::new().block_on(&runtime, run());
}

async fn run() {
    let store = SettingsStore::load();
    let mut settings = store.settings();
    let workspace_id = settings
        .workspace_id
        .as_deref()
        .and_then(|raw| match raw.parse::<WorkspaceId>() {
            Ok(id) => Some(id),
            Err(error) => {
                tracing::warn!("ignoring configured workspace id: {error}");
                None
            }
        })
        .unwrap_or_else(WorkspaceId::new_v7);

    // Remember the demo workspace so later runs reuse the same id.
    if settings.workspace_id.is_none() {
        match store.update(|settings| settings.workspace_id = Some(workspace_id.to_string())) {
            Ok(saved) => settings = saved,
            Err(error) => tracing::warn!(stage = error.stage(), "failed to save settings: {error}"),
        }
    }

    let backend = Rc::new(
        MemoryBackend::new()
            .with_responder(DEMO_RESPONDER)
            .with_latency(DEMO_LATENCY),
    );
    backend.add_channel(workspace_id, "general");
    backend.add_channel(workspace_id, "random");

    let settle_window = settings.cache.settle_window();
    let router = Rc::new(HistoryRouter::new("/general"));
    let mut shell = ChatAppShell::new(settings, workspace_id, backend, router);
    shell.start().await;
    print_sidebar(&shell);
    print_messages(&shell);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                tracing::error!("failed to read input: {error}");
                break;
            }
        };

        if line.starts_with('/') {
            shell.navigate(line.trim()).await;
            print_sidebar(&shell);
            print_messages(&shell);
            continue;
        }

        shell.type_text(&line);
        match shell.handle_key(&Keystroke::enter()) {
            KeyOutcome::Handled(Some(task)) => {
                if let Err(error) = task.await {
                    tracing::error!("send task failed: {error}");
                }
            }
            KeyOutcome::Handled(None) => {
                println!("(nothing to send)");
                continue;
            }
            KeyOutcome::PassThrough => {
                println!("(no channel selected)");
                continue;
            }
        }

        for event in shell.take_composer_events() {
            if let ComposerEvent::SendFailed { reason, .. } = event {
                println!("! send failed: {reason}");
            }
        }

        tokio::time::sleep(settle_window + DEMO_LATENCY * 2).await;
        print_messages(&shell);
    }
}

fn print_sidebar(shell: &ChatAppShell) {
    let selector = shell.selector();
    println!("== {} ==", selector.workspace_title());
    println!("{}", sidebar::CHANNELS_HEADING);
    match selector.view() {
        SelectorView::Loading => println!("  {}", sidebar::LOADING_PLACEHOLDER),
        SelectorView::Channels(rows) => {
            for row in rows {
                let marker = if row.active { '>' } else { ' ' };
                println!("{marker} #{}", row.name);
            }
        }
    }
}

fn print_messages(shell: &ChatAppShell) {
    let Some(rows) = shell.active_message_rows() else {
        return;
    };

    for row in rows {
        let badge = row.badge.map(|badge| format!(" [{badge}]")).unwrap_or_default();
        println!("[{}] {}{}: {}", row.time_label, row.display_name, badge, row.content);
    }

    if let Some(composer) = shell.composer() {
        println!("-- {} --", composer.read().placeholder());
    }
}
