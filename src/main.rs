//! tvshell - remote-driven TV shell in the terminal
//!
//! Arrow keys act as the remote: browse the grid, open the sidebar, play
//! videos and sign in with a registration code.
//!
//! # Usage
//!
//! ```bash
//! # Launch interactive UI
//! tvshell
//!
//! # CLI mode (for automation)
//! tvshell media
//! tvshell signin
//! tvshell status --json
//! ```

use std::io::{stdout, Stdout};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, info};

use tvshell::app::intent_for_key;
use tvshell::cli::{Cli, Command, ExitCode, Output};
use tvshell::commands;
use tvshell::config::Config;
use tvshell::continuity::{to_wire_video, ContinuityHandle, ContinuitySink, LoopbackContinuity};
use tvshell::shell::{profile_notifier, AppEvent, Shell};
use tvshell::ui::{self, TuiSurface};
use tvshell::{catalog, Router, SignInInfo, SignInRequest};

/// Terminal type alias for convenience
type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Resume position used by the demo deeplink key
const DEMO_DEEPLINK_START_MS: u64 = 300_000;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging first so config problems are reported
    if cli.is_cli_mode() {
        init_stderr_logging();
    } else {
        init_file_logging()?;
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    // Resolve (and possibly cache) the device id before applying overrides
    // so they never get written back to the config file
    config.get_device_id();
    if let Some(url) = &cli.base_url {
        config.sso_base_url = Some(url.clone());
    }

    if cli.is_cli_mode() {
        // CLI mode: execute command and exit
        let exit_code = run_cli(cli, &mut config).await;
        std::process::exit(exit_code.into());
    } else {
        // TUI mode: launch interactive interface
        run_tui(config).await
    }
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli, config: &mut Config) -> ExitCode {
    let output = Output::new(&cli);

    match cli.command {
        Some(Command::Media) => commands::media_cmd(&output).await,

        Some(Command::Status) => commands::status_cmd(config, &output).await,

        Some(Command::Signin(cmd)) => commands::signin_cmd(cmd, config, &output).await,

        Some(Command::Signout) => commands::signout_cmd(config, &output).await,

        Some(Command::Convert(cmd)) => commands::convert_cmd(cmd, &output).await,

        None => ExitCode::Success,
    }
}

// =============================================================================
// Logging
// =============================================================================

fn env_filter(default: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter("warn"))
        .init();
}

/// The terminal is in raw mode, so logs go to a file under the data dir
fn init_file_logging() -> Result<()> {
    let dir = dirs::data_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
        .join("tvshell");
    std::fs::create_dir_all(&dir)?;

    let log_path = dir.join("tvshell.log");
    let log_file = std::fs::OpenOptions::new().create(true).append(true).open(&log_path)?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(env_filter("info,tvshell=debug"))
        .with_ansi(false)
        .init();

    eprintln!("tvshell log: {}", log_path.display());
    Ok(())
}

// =============================================================================
// TUI Mode
// =============================================================================

/// Initialize the terminal for TUI mode
fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state
fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run interactive TUI
async fn run_tui(mut config: Config) -> Result<()> {
    info!("tvshell starting");

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let profile = commands::open_profile(&mut config, profile_notifier(events_tx.clone()))?;
    let continuity = ContinuityHandle::new(events_tx.clone(), profile.subscribe());
    let router = Router::new(catalog(), config.boundary());
    let mut shell = Shell::new(router, profile, TuiSurface::new(), events_tx.clone())
        .with_continuity(Arc::new(LoopbackContinuity::new(config.app_id())));

    let mut terminal = init_terminal()?;
    spawn_input_reader(events_tx, continuity);

    let result = run_event_loop(&mut terminal, &mut shell, &mut events_rx).await;

    // Always restore terminal, even on error
    restore_terminal(&mut terminal)?;

    result
}

/// Main event loop - applies events, renders after each one
async fn run_event_loop(
    terminal: &mut Tui,
    shell: &mut Shell<TuiSurface>,
    events: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    terminal.draw(|frame| ui::draw(frame, shell))?;

    while let Some(event) = events.recv().await {
        shell.handle_event(event);
        if shell.should_exit() {
            break;
        }
        terminal.draw(|frame| ui::draw(frame, shell))?;
    }

    info!("tvshell exiting");
    Ok(())
}

/// Read keys on a dedicated thread. Demo keys stand in for a companion
/// device: `1` asks for a sign-in, `2` sends a deeplink.
fn spawn_input_reader(events: mpsc::UnboundedSender<AppEvent>, continuity: ContinuityHandle) {
    let runtime = tokio::runtime::Handle::current();

    std::thread::spawn(move || loop {
        let key = match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
            Ok(_) => continue,
            Err(_) => break,
        };

        let event = match key {
            KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                ..
            }
            | KeyEvent {
                code: KeyCode::Char('q'),
                ..
            } => Some(AppEvent::Quit),
            KeyEvent {
                code: KeyCode::Char('1'),
                ..
            } => {
                let mut handle = continuity.on_sign_in_requested(SignInRequest::new(SignInInfo {
                    sign_in_type: "MVPD".to_string(),
                    is_signed_in: false,
                }));
                runtime.spawn(async move {
                    while let Some(status) = handle.next().await {
                        info!(?status, "Companion received sign-in status");
                    }
                });
                None
            }
            KeyEvent {
                code: KeyCode::Char('2'),
                ..
            } => {
                if let Some(video) = catalog().into_iter().nth(1) {
                    continuity.on_deeplink(to_wire_video(&video.with_start_position(DEMO_DEEPLINK_START_MS)));
                }
                None
            }
            key => intent_for_key(key).map(AppEvent::Input),
        };

        if let Some(event) = event {
            if events.send(event).is_err() {
                debug!("Event channel closed; input reader stopping");
                break;
            }
        }
    });
}
