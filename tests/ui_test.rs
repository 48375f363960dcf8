//! UI component tests
//!
//! Renders the shell into a test backend and checks what ends up on screen.

mod support;

use ratatui::{backend::TestBackend, Terminal};
use tokio::sync::mpsc;

use support::{channel_notifier, poller, HangingTransport, InstantSleeper};
use tvshell::app::{FocusRegion, Intent, Router};
use tvshell::profile::Profile;
use tvshell::shell::{AppEvent, Shell};
use tvshell::storage::MemoryStore;
use tvshell::ui::{self, TuiSurface};
use tvshell::{catalog, BoundaryPolicy, Credentials};

fn shell(store: MemoryStore) -> (Shell<TuiSurface>, mpsc::UnboundedReceiver<AppEvent>) {
    let (events_tx, events) = mpsc::unbounded_channel();
    let (notify, _profile_events) = channel_notifier();
    let profile = Profile::new(
        Box::new(store),
        poller(HangingTransport::new(), InstantSleeper::new()),
        notify,
    );
    let shell = Shell::new(
        Router::new(catalog(), BoundaryPolicy::Clamp),
        profile,
        TuiSurface::new(),
        events_tx,
    )
    .with_sleeper(InstantSleeper::new());
    (shell, events)
}

fn screen_text(shell: &Shell<TuiSurface>) -> String {
    let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
    terminal.draw(|frame| ui::draw(frame, shell)).unwrap();

    let buffer = terminal.backend().buffer();
    let mut text = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            text.push_str(buffer[(x, y)].symbol());
        }
        text.push('\n');
    }
    text
}

#[tokio::test]
async fn test_grid_shows_catalog() {
    let (shell, _events) = shell(MemoryStore::new());

    let text = screen_text(&shell);

    assert!(text.contains("Elephants Dream"));
    assert!(text.contains("Tears of Steel"));
    assert!(text.contains("signed out"));
    assert!(shell.surface().is_focused(FocusRegion::Grid, 0));
}

#[tokio::test]
async fn test_player_hides_sidebar() {
    let (mut shell, _events) = shell(MemoryStore::new());

    shell.handle_event(AppEvent::Input(Intent::Select));
    let text = screen_text(&shell);

    assert!(!shell.surface().sidebar_visible());
    assert_eq!(shell.surface().screen(), FocusRegion::Player);
    assert!(text.contains("NOW PLAYING"));
    assert!(text.contains("Playing"));
}

#[tokio::test]
async fn test_profile_shows_account() {
    let (mut shell, mut events) = shell(MemoryStore::with(Credentials {
        email: "a@b.com".into(),
        auth_token: "tok".into(),
    }));

    shell.handle_event(AppEvent::Input(Intent::Left));
    assert!(shell.surface().sidebar_expanded());
    let ready = events.recv().await.unwrap();
    shell.handle_event(ready);
    assert!(shell.surface().is_focused(FocusRegion::Sidebar, 0));

    shell.handle_event(AppEvent::Input(Intent::Down));
    shell.handle_event(AppEvent::Input(Intent::Select));
    let text = screen_text(&shell);

    assert_eq!(shell.surface().screen(), FocusRegion::Profile);
    assert!(text.contains("PROFILE"));
    assert!(text.contains("a@b.com"));
    assert!(text.contains("Sign out"));
}
