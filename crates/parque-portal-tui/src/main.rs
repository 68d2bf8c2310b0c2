//! Parque-e portal - terminal front end for the Parque-e login portal.
//!
//! Checks the stored session on startup, collects credentials when there is
//! none, and sends the signed-in user on to their tenant site.

mod app;
mod ui;

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use parque_portal_core::{AuthState, Config, Credentials, FlowOutcome};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Prefix of the daily log files in the cache directory
const LOG_FILE_PREFIX: &str = "parque-portal.log";

const USAGE: &str = "\
Usage: parque-portal [OPTION]

Without options, opens the interactive portal.

Options:
  --health   Print the backend health status
  --login    Sign in from the terminal prompt and open your site
  --logout   End the stored session
  --help     Show this message

Environment:
  PARQUE_API_URL   Backend base URL (overrides config.json)
  PARQUE_USERNAME  Username prefilled in the login form
  RUST_LOG         Log filter, default \"warn\"";

/// Initialize the tracing subscriber for logging.
///
/// Output goes to a daily file so it never draws over the terminal UI.
/// The returned guard flushes the writer when dropped.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);
    match command {
        None | Some("--health" | "--logout" | "--login") => {}
        Some("--help" | "-h") => {
            println!("{}", USAGE);
            return Ok(());
        }
        // Rejected before logging starts, so there is no log writer to flush
        Some(other) => {
            eprintln!("Unknown option: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }

    let config = Config::load()?;
    let log_dir = config.cache_dir()?;
    std::fs::create_dir_all(&log_dir)?;
    let _guard = init_tracing(&log_dir);
    info!(api_url = %config.api_url(), "Parque-e portal starting");

    let mut app = App::new(config)?;

    match command {
        Some("--health") => return health(&app).await,
        Some("--logout") => return logout(&mut app).await,
        Some("--login") => return login(&mut app).await,
        _ => {}
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    if let Some(url) = app.redirected_to {
        println!("Opened {}", url);
    }

    info!("Parque-e portal shutting down");
    Ok(())
}

/// Print the backend health status
async fn health(app: &App) -> Result<()> {
    match app.flow.client().health_check().await {
        Ok(status) => {
            println!("API:       {}", app.api_url());
            println!("Status:    {}", status.status);
            if let Some(ref database) = status.database {
                println!("Database:  {}", database);
            }
            match (status.parsed_timestamp(), status.timestamp.as_deref()) {
                (Some(ts), _) => println!("Timestamp: {}", ts.format("%Y-%m-%d %H:%M:%S")),
                (None, Some(raw)) => println!("Timestamp: {}", raw),
                (None, None) => {}
            }
            if !status.is_healthy() {
                bail!("Backend reported status \"{}\"", status.status);
            }
            Ok(())
        }
        Err(e) => bail!("Health check failed: {}", e),
    }
}

/// End the stored session
async fn logout(app: &mut App) -> Result<()> {
    let had_session = app.flow.client().is_authenticated();
    app.flow.logout().await;
    if had_session {
        println!("Signed out.");
    } else {
        println!("No stored session.");
    }
    Ok(())
}

/// Sign in from the terminal prompt, then follow the redirect
async fn login(app: &mut App) -> Result<()> {
    app.mount().await;

    if let AuthState::Authenticated(user) = app.flow.state() {
        println!("Already signed in as {}.", user.username);
        return Ok(());
    }

    let username = prompt_username(&app.login_username)?;
    let password = rpassword::prompt_password("Password: ")?;
    if username.is_empty() || password.is_empty() {
        bail!("Username and password required");
    }

    let credentials = Credentials::new(username.clone(), password);
    if let Err(e) = app.flow.submit_login(&credentials).await {
        bail!("Login failed: {}", e.message);
    }

    app.config.last_username = Some(username.clone());
    if let Err(e) = app.config.save() {
        warn!(error = %e, "Failed to save config");
    }
    println!("Access granted! Welcome, {}. Redirecting...", username);

    match app.flow.next_event().await {
        Some(FlowOutcome::Navigated(url)) => {
            println!("Opened {}", url);
            Ok(())
        }
        Some(FlowOutcome::RedirectAborted) => bail!("Could not open your site"),
        Some(FlowOutcome::Ignored) | None => Ok(()),
    }
}

fn prompt_username(default: &str) -> Result<String> {
    if default.is_empty() {
        print!("Username: ");
    } else {
        print!("Username [{}]: ", default);
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let entered = line.trim();
    Ok(if entered.is_empty() { default.to_string() } else { entered.to_string() })
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // The loading panel is on screen while the stored session is checked
        if !app.mounted {
            app.mount().await;
            continue;
        }

        // Redraw with "Signing in..." before blocking on the request
        if app.login_pending {
            app.attempt_login().await;
            continue;
        }

        // Poll for events with timeout to allow the redirect timer to fire
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                // Handle input
                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Apply hard resets and redirect events
        app.check_background_tasks();

        // Check if we should quit
        if app.quitting {
            return Ok(());
        }
    }
}
