use crate::app::{App, AppEvent};
use crate::client::{ApiClient, GetOutcome};
use crate::config::Config;
use crate::state::Mode;
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use futures::StreamExt;
use ratatui::prelude::*;
use std::io::Stdout;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

mod app;
mod client;
mod config;
mod particles;
mod ring;
mod state;
mod ui;

/// Ringwatch: live operator dashboard for a consistent-hash KV ring
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the interactive dashboard
    Watch {
        /// Path to the configuration file
        #[arg(short, long, default_value = "ringwatch.toml")]
        config: String,
        /// Master API URL (overrides the config file)
        #[arg(long)]
        api: Option<String>,
    },
    /// Fetch the current cluster status and print it as JSON
    Status {
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        api: String,
    },
    /// Store one key
    Put {
        key: String,
        value: String,
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        api: String,
    },
    /// Read one key
    Get {
        key: String,
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        api: String,
    },
    /// Switch the replication mode
    Mode {
        #[arg(value_enum)]
        mode: Mode,
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        api: String,
    },
    /// Validate configuration file
    Validate {
        #[arg(short, long, default_value = "ringwatch.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Watch {
        config: "ringwatch.toml".to_string(),
        api: None,
    }) {
        Commands::Watch { config, api } => run_watch(&config, api).await,
        Commands::Status { api } => {
            tracing_subscriber::fmt::init();
            let snap = ApiClient::new(&api).status().await?;
            println!("{}", serde_json::to_string_pretty(&snap)?);
            Ok(())
        }
        Commands::Put { key, value, api } => {
            tracing_subscriber::fmt::init();
            let body = ApiClient::new(&api).put(&key, &value).await?;
            println!("{}", body);
            Ok(())
        }
        Commands::Get { key, api } => {
            tracing_subscriber::fmt::init();
            match ApiClient::new(&api).get(&key).await? {
                GetOutcome::Found(value) => println!("{}", value),
                // A miss is an answer, not an error.
                GetOutcome::NotFound => println!("not found"),
            }
            Ok(())
        }
        Commands::Mode { mode, api } => {
            tracing_subscriber::fmt::init();
            ApiClient::new(&api).switch_mode(mode).await?;
            info!("replication mode set to {}", mode);
            Ok(())
        }
        Commands::Validate { config } => {
            tracing_subscriber::fmt::init();
            validate_config(&config)
        }
    }
}

fn validate_config(path: &str) -> anyhow::Result<()> {
    let cfg = Config::load(path).with_context(|| format!("configuration '{}' is invalid", path))?;
    info!("Configuration '{}' is valid.", path);
    info!("API: {}", cfg.api.url);
    info!("Poll interval: {}ms", cfg.poll.interval_ms);
    Ok(())
}

async fn run_watch(config_path: &str, api_override: Option<String>) -> anyhow::Result<()> {
    let cfg = Config::load_or_default(config_path)?;
    let base = api_override.unwrap_or_else(|| cfg.api.url.clone());
    let client = ApiClient::new(&base);

    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, &cfg, client).await;
    restore_terminal(&mut terminal)?;
    result
}

/// The single control flow that owns all mutable dashboard state. Two
/// independent clocks (poll and animation) plus command outcomes and
/// input are multiplexed here; spawned request tasks only report back
/// over the channel.
async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    cfg: &Config,
    client: ApiClient,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let mut app = App::new(cfg, client.clone(), tx.clone());

    // First poll fires immediately; failures wait for the next tick.
    let mut poll_tick = tokio::time::interval(Duration::from_millis(cfg.poll.interval_ms.max(1)));
    let mut frame_tick =
        tokio::time::interval(Duration::from_millis(cfg.visual.frame_interval_ms.max(1)));
    let mut input = EventStream::new();

    loop {
        tokio::select! {
            _ = poll_tick.tick() => {
                // Unguarded: overlapping polls are possible, and the
                // last snapshot delivered on the channel wins.
                let client = client.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let ev = match client.status().await {
                        Ok(snap) => AppEvent::Snapshot(snap),
                        Err(e) => AppEvent::PollFailed(e.to_string()),
                    };
                    let _ = tx.send(ev);
                });
            }
            _ = frame_tick.tick() => {
                app.particles.advance();
                terminal.draw(|frame| ui::draw(frame, &mut app))?;
            }
            Some(ev) = rx.recv() => {
                app.handle_event(ev);
            }
            maybe_event = input.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        app.handle_key(key);
                    }
                    Some(Ok(Event::Mouse(mouse))) => {
                        app.handle_mouse(mouse);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableMouseCapture)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(DisableMouseCapture)?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
