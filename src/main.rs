// ABOUTME: Main entry point for the socket-term TUI application

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::*, Terminal};
use socket_term::{
    app::{App, EventHandler},
    components::LayoutComponent,
    config::AppConfig,
};
use std::{
    io,
    path::PathBuf,
    time::{Duration, Instant},
};

/// Terminal client for Socket.IO web-terminal servers
#[derive(Debug, Parser)]
#[command(name = "socket-term", version, about)]
struct Cli {
    /// Server URL (http, https, ws or wss)
    #[arg(short, long)]
    url: Option<String>,

    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interval between resource requests, in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Disable automatic reconnection
    #[arg(long)]
    no_reconnect: bool,
}

impl Cli {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match self.config.clone().or_else(AppConfig::default_path) {
            Some(path) => AppConfig::load(&path)?,
            None => AppConfig::default(),
        };

        if let Some(url) = &self.url {
            config.server_url.clone_from(url);
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        if self.no_reconnect {
            config.reconnection.enabled = false;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging()?;
    setup_panic_handler();

    let config = cli.load_config()?;
    tracing::info!("Starting socket-term against {}", config.server_url);

    // Startup failures surface here, before the screen is taken over
    let mut app = App::new(&config)?;
    app.init().await;

    let mut layout = LayoutComponent::new();
    let result = run_tui(&mut app, &mut layout);

    app.shutdown().await;
    result
}

fn run_tui(app: &mut App, layout: &mut LayoutComponent) -> Result<()> {
    crossterm::terminal::is_raw_mode_enabled()
        .map_err(|e| anyhow::anyhow!("Terminal not compatible: {}", e))?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app, layout);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    layout: &mut LayoutComponent,
) -> Result<()> {
    // Input poll bounds how long transport events wait before being drawn
    let input_poll = Duration::from_millis(50);
    let blink_rate = Duration::from_millis(500);
    let mut last_blink = Instant::now();

    loop {
        app.drain_events();

        terminal.draw(|frame| {
            layout.render(frame, &app.state);
        })?;

        if event::poll(input_poll)? {
            let app_event = match event::read()? {
                Event::Key(key_event) => EventHandler::handle_key_event(key_event),
                Event::Mouse(mouse_event) => {
                    EventHandler::handle_mouse_event(mouse_event, layout.execute_area())
                }
                Event::Resize(_, _) | Event::FocusGained | Event::FocusLost | Event::Paste(_) => None,
            };

            if let Some(app_event) = app_event {
                EventHandler::process_event(app_event, &mut app.state);
            }
        }

        if last_blink.elapsed() >= blink_rate {
            app.tick();
            last_blink = Instant::now();
        }

        if app.state.should_quit {
            return Ok(());
        }
    }
}

fn setup_logging() -> Result<()> {
    use std::fs::OpenOptions;
    use tracing_subscriber::prelude::*;

    // Create log directory if it doesn't exist
    let log_dir = std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".socket-term").join("logs"))
        .unwrap_or_else(|_| PathBuf::from(".socket-term/logs"));

    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    // Create log file with timestamp
    let log_file = log_dir.join(format!(
        "socket-term-{}.log",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("failed to create log file {}", log_file.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false), // No ANSI colors in log file
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "socket_term=info".into()),
        )
        .init();

    Ok(())
}

fn setup_panic_handler() {
    use tracing::error;

    std::panic::set_hook(Box::new(|panic_info| {
        // Ensure terminal is restored before logging the panic
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stderr(), LeaveAlternateScreen, DisableMouseCapture);

        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        eprintln!("Please check the logs for more details.");
    }));
}
