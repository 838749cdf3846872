//! Stage Prompter - headless operator console
//!
//! Usage:
//!   prompter                       # start with the welcome script
//!   prompter talk.docx             # start with a script loaded
//!   prompter --config my.toml      # explicit config file

mod console;
mod host;

use anyhow::{Context, Result};
use clap::Parser;
use console::{ConsoleCommand, HELP};
use crossbeam_channel::{bounded, select, unbounded, Receiver};
use host::HeadlessHost;
use log::{error, info, warn};
use prompter_bridge::{
    ChannelTransport, ControlSurface, DocumentLoader, PrompterConfig, Rect, WindowHost,
    WindowKind,
};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

#[derive(Parser)]
#[command(name = "prompter")]
#[command(about = "Teleprompter with a live-synchronized stage window")]
struct Cli {
    /// Config file (defaults to $PROMPTER_CONFIG, then the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Script to load on startup (.txt or .docx)
    script: Option<PathBuf>,
}

enum Flow {
    Continue,
    Quit,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = PrompterConfig::load(cli.config.as_deref()).context("loading configuration")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();
    info!("Stage Prompter starting");

    let host = Arc::new(HeadlessHost::new(config.displays.clone()));
    let dashboard_window = host
        .create_window(WindowKind::Dashboard, Rect::new(100.0, 100.0, 1280.0, 800.0))
        .and_then(|id| host.show(id).map(|_| id))
        .context("creating the dashboard window")?;

    let transport = ChannelTransport::new(host.clone(), &config);
    let mut dashboard = ControlSurface::new(transport, DocumentLoader::new(config.max_file_bytes));

    if let Some(path) = cli.script.as_deref() {
        match dashboard.load_path(path) {
            Ok(document) => println!("Loaded {} ({} words)", document.name, dashboard.stats().words),
            Err(e) => println!("Could not load {}: {}", path.display(), e),
        }
    }

    let (quit_tx, quit_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = quit_tx.try_send(());
    })
    .context("installing the Ctrl+C handler")?;

    let commands = spawn_stdin_reader();
    println!("{}", HELP);

    loop {
        select! {
            recv(quit_rx) -> _ => {
                info!("Interrupted");
                break;
            }
            recv(commands) -> line => match line {
                Ok(line) => match ConsoleCommand::parse(&line) {
                    Ok(command) => {
                        if let Flow::Quit = run_command(command, &mut dashboard, host.as_ref()) {
                            break;
                        }
                    }
                    Err(e) => println!("{}", e),
                },
                Err(_) => {
                    info!("Console input closed");
                    break;
                }
            },
            default(config.sync_interval()) => {}
        }

        dashboard.poll_control();
        if host.quit_requested() {
            break;
        }
    }

    dashboard.shutdown();
    host.destroy(dashboard_window);
    host.quit();
    info!("Stage Prompter stopped");
    Ok(())
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    let spawned = thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Console read error: {}", e);
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        error!("Cannot read console input: {}", e);
    }
    rx
}

fn run_command(
    command: ConsoleCommand,
    dashboard: &mut ControlSurface<ChannelTransport>,
    host: &HeadlessHost,
) -> Flow {
    match command {
        ConsoleCommand::Nothing => {}
        ConsoleCommand::Open => match dashboard.open_stage() {
            Ok(status) => println!("Stage {:?}", status),
            Err(e) => println!("Could not open the stage: {} (try open again)", e),
        },
        ConsoleCommand::Close => {
            if let Err(e) = dashboard.close_stage() {
                println!("{}", e);
            }
        }
        ConsoleCommand::Play => dashboard.set_playing(true),
        ConsoleCommand::Pause => dashboard.set_playing(false),
        ConsoleCommand::Toggle => dashboard.toggle_play(),
        ConsoleCommand::Reset => dashboard.reset_position(),
        ConsoleCommand::Seek(position) => dashboard.seek(position),
        ConsoleCommand::Speed(speed) => dashboard.set_speed(speed),
        ConsoleCommand::Font(size) => dashboard.set_font_size(size),
        ConsoleCommand::LineHeight(line_height) => dashboard.set_line_height(line_height),
        ConsoleCommand::Colors { text, background } => {
            if let Err(e) = dashboard.set_colors(&text, &background) {
                println!("{}", e);
            }
        }
        ConsoleCommand::Mirror(mirrored) => dashboard.set_mirrored(mirrored),
        ConsoleCommand::Text(text) => dashboard.set_text(text),
        ConsoleCommand::Load(path) => match dashboard.load_path(&path) {
            Ok(document) => println!(
                "Loaded {} ({} characters)",
                document.name,
                dashboard.stats().characters
            ),
            Err(e) => println!("{}", e),
        },
        ConsoleCommand::Key(key) => match dashboard.transport().stage_keys() {
            Some(keys) => {
                let _ = keys.send(key);
            }
            None => println!("The stage is not open"),
        },
        ConsoleCommand::Link(url) => {
            if let Err(e) = host.open_external(&url) {
                println!("{}", e);
            }
        }
        ConsoleCommand::Status => print_status(dashboard),
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => return Flow::Quit,
    }
    Flow::Continue
}

fn print_status(dashboard: &ControlSurface<ChannelTransport>) {
    let state = dashboard.state();
    let stats = dashboard.stats();
    let shared = dashboard.transport().shared();
    let scroll = shared.scroll.read();
    let status = shared.status.read();

    println!(
        "{} | speed {} px/s | font {}px | line height {:.1} | {} on {} | mirrored {}",
        if state.is_playing { "playing" } else { "paused" },
        state.speed,
        state.font_size,
        state.line_height,
        state.color,
        state.bg_color,
        state.is_mirrored
    );
    println!("{} characters, {} words", stats.characters, stats.words);
    println!(
        "stage: {} | offset {:.0}/{:.0} px | seq {} | rejected {}",
        if dashboard.is_stage_visible() { "visible" } else { "hidden" },
        scroll.offset,
        scroll.max_scroll,
        status.applied_seq,
        status.rejected_frames
    );
}
