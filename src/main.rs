use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

mod actions;
mod app;
mod config;
mod fuzzy;
mod input;
mod layout;
mod preview;
mod tmux;

use actions::Action;
use app::App;
use config::{Config, Overrides};
use input::InputReader;
use tmux::{TargetType, TmuxClient};

/// Fuzzy-pick a tmux session or window while previewing its panes
#[derive(Debug, Parser)]
#[command(name = "tmux-schmooze", version, about)]
struct Cli {
    /// What to pick from
    #[arg(value_enum)]
    target_type: TargetType,

    /// Horizontal scale of the pane preview
    #[arg(long, env = "SCHMOOZE_SCALE")]
    scale: Option<f64>,

    /// Sidebar width, percent of the screen
    #[arg(long)]
    sidebar: Option<u16>,

    /// tmux binary to run
    #[arg(long, env = "SCHMOOZE_TMUX")]
    tmux: Option<String>,

    /// Config file (default: ~/.config/tmux-schmooze/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file (default: ~/.cache/tmux-schmooze/tmux-schmooze.log)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Stdout belongs to the TUI, so logs go to a file
fn init_logging(log_file: Option<PathBuf>) {
    let path = log_file.or_else(|| {
        dirs::cache_dir().map(|dir| dir.join("tmux-schmooze").join("tmux-schmooze.log"))
    });
    let writer = path
        .and_then(|path| {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok()?;
            }
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        })
        .map(|file| BoxMakeWriter::new(Mutex::new(file)))
        .unwrap_or_else(|| BoxMakeWriter::new(std::io::sink));

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_ansi(false)
        .with_writer(writer)
        .init();
}

/// Run a tmux command with the terminal handed back to it
fn run_interactive(cmd: &[String]) -> std::io::Result<std::process::ExitStatus> {
    std::process::Command::new(&cmd[0])
        .args(&cmd[1..])
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.log_file);

    let config = Config::load(cli.config.as_deref())?.with_overrides(Overrides {
        tmux_path: cli.tmux,
        scale_x: cli.scale,
        sidebar_percent: cli.sidebar,
    });
    tracing::info!(?config, target_type = ?cli.target_type, "starting");

    // Create event channel
    let (tx, mut rx) = mpsc::unbounded_channel::<Action>();

    // Initialize terminal
    let mut terminal = ratatui::init();

    // Spawn input handler
    let input = InputReader::spawn(tx.clone());

    // Spawn tmux poller
    let tmux_tx = tx.clone();
    let poll_client = TmuxClient::new(config.tmux_path.clone());
    let target_type = cli.target_type;
    let refresh = config.refresh_interval();
    tokio::spawn(async move {
        loop {
            let action = match poll_client.list_targets(target_type).await {
                Ok(targets) => Action::TargetsUpdated(targets),
                Err(e) => Action::Error(format!("Tmux: {:#}", e)),
            };
            if tmux_tx.send(action).is_err() {
                break;
            }
            tokio::time::sleep(refresh).await;
        }
    });

    // Create shared tmux client for actions
    let tmux_client = TmuxClient::new(config.tmux_path.clone());
    let inside_tmux = std::env::var_os("TMUX").is_some();

    // Create app state
    let mut app = App::new(cli.target_type, &config);

    // Main event loop
    let result = 'main: loop {
        // Render
        terminal.draw(|f| app.render(f))?;

        // Process any pending actions from the app
        for pending_action in app.take_pending_actions() {
            match pending_action {
                Action::LoadPreview(target_id) => {
                    let client = tmux_client.clone();
                    let preview_tx = tx.clone();
                    tokio::spawn(async move {
                        let action = match client.capture_window(&target_id).await {
                            Ok(panes) => Action::PreviewLoaded { target_id, panes },
                            Err(e) => Action::PreviewFailed {
                                target_id,
                                message: format!("{:#}", e),
                            },
                        };
                        let _ = preview_tx.send(action);
                    });
                }
                Action::EnterTarget(target_id) => {
                    // tmux gets the terminal to itself
                    input.stop().await;
                    ratatui::restore();

                    let cmd = tmux_client.enter_command(&target_id, inside_tmux);
                    tracing::info!(?cmd, "entering target");
                    let status = run_interactive(&cmd)?;
                    if !status.success() {
                        tracing::warn!(%status, "tmux exited unsuccessfully");
                    }
                    return Ok(());
                }
                _ => {}
            }
        }

        // Handle events from channel
        tokio::select! {
            Some(action) = rx.recv() => {
                match app.handle_action(action) {
                    Ok(should_quit) => {
                        if should_quit {
                            break 'main Ok(());
                        }
                    }
                    Err(e) => {
                        break 'main Err(e);
                    }
                }
            }
        }
    };

    // Restore terminal
    input.stop().await;
    ratatui::restore();
    result
}
