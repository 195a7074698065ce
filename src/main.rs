//! Spectra monitor - live bar charts for an AS7341 + AS7263 sensor pair
//!
//! Reads sentinel-framed blocks from the sensor bridge's serial port and
//! redraws one bar per channel on every refresh tick.
//!
//! Module structure:
//! - `domain/` - Channel groups, sentinels, frames
//! - `io/` - Line sources (serial port, capture replay, scripted)
//! - `services/` - Block extractor and frame assembler
//! - `infra/` - Config and logging
//! - `ui/` - ratatui dashboard

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use spectra_monitor::infra::{logging, Config};
use spectra_monitor::io::{list_ports, open_replay, open_serial, LineSource, ReadError};
use spectra_monitor::services::ReadingAssembler;
use spectra_monitor::ui::{draw, DashboardState};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Spectra monitor - live spectrometer bar charts from a serial sensor bridge
#[derive(Parser, Debug)]
#[command(name = "spectra-monitor", version, about)]
struct Args {
    /// Path to TOML configuration file (default: CONFIG_FILE or config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Serial device, overrides the config file
    #[arg(short, long)]
    device: Option<String>,

    /// Baud rate, overrides the config file
    #[arg(short, long)]
    baud: Option<u32>,

    /// Read lines from a capture file instead of the serial port
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Print frames as JSON lines instead of drawing charts
    #[arg(long)]
    headless: bool,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

type Source = Box<dyn LineSource>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.list_ports {
        logging::init_stderr();
        let ports = list_ports()?;
        if ports.is_empty() {
            println!("No serial ports found");
        }
        for port in ports {
            println!("{}", port);
        }
        return Ok(());
    }

    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = Config::load_from_path(&config_path)?.with_overrides(args.device, args.baud)?;

    if args.headless {
        logging::init_stderr();
    } else {
        logging::init_file(config.log_file())?;
    }

    info!(
        git_hash = env!("GIT_HASH"),
        config_file = %config.config_file(),
        device = %config.serial_device(),
        baud = %config.serial_baud(),
        groups = ?config.groups().iter().map(|g| g.name.as_str()).collect::<Vec<_>>(),
        block_timeout_ms = ?config.block_timeout().map(|d| d.as_millis()),
        "spectra_monitor_starting"
    );
    if config.is_default() {
        warn!(config_file = %config_path, "config_file_missing_using_defaults");
    }

    let source: Source = match &args.replay {
        Some(path) => Box::new(open_replay(path).await?),
        None => match open_serial(&config) {
            Ok(reader) => Box::new(reader),
            Err(e) => {
                error!(device = %config.serial_device(), error = %format!("{:#}", e), "serial_port_open_failed");
                return Err(e.into());
            }
        },
    };

    let assembler = ReadingAssembler::from_config(source, &config);

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Handle shutdown on Ctrl+C
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = signal_tx.send(true);
    });

    let result = if args.headless {
        run_headless(assembler, &config, shutdown_rx).await
    } else {
        run_terminal(assembler, &config, shutdown_tx, shutdown_rx).await
    };

    info!("spectra_monitor_shutdown_complete");
    result
}

fn is_shutdown(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// One frame per tick, printed as JSON lines on stdout
async fn run_headless(
    mut assembler: ReadingAssembler<Source>,
    config: &Config,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut ticker = tokio::time::interval(config.refresh_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stdout = io::stdout();

    while !is_shutdown(&shutdown) {
        tokio::select! {
            _ = shutdown.changed() => continue,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            _ = shutdown.changed() => continue,
            result = assembler.next_frame() => result,
        };

        match result {
            Ok(frame) => {
                for group in &frame.groups {
                    info!(
                        frame = assembler.frames_assembled(),
                        group = %group.name,
                        present = group.present_count(),
                        values = ?group.values,
                        "frame"
                    );
                }
                writeln!(stdout, "{}", serde_json::to_string(&frame)?)?;
                stdout.flush()?;
            }
            Err(ReadError::BlockTimeout { sentinel, waited }) => {
                warn!(sentinel = %sentinel, waited_ms = %waited.as_millis(), "block_timeout");
            }
            Err(ReadError::Closed) => {
                info!(source = %assembler.source_name(), frames = assembler.frames_assembled(), "source_closed");
                break;
            }
            Err(e) => {
                error!(error = %e, "read_failed");
                return Err(e.into());
            }
        }
    }
    Ok(())
}

/// Watches the keyboard on a blocking thread; q, Esc or Ctrl-C request shutdown.
fn spawn_key_watcher(shutdown_tx: Arc<watch::Sender<bool>>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || loop {
        if *shutdown_tx.borrow() {
            return;
        }
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => {
                if let Ok(Event::Key(key)) = event::read() {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    let ctrl_c = key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL);
                    if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) || ctrl_c {
                        let _ = shutdown_tx.send(true);
                        return;
                    }
                }
            }
            Ok(false) => {}
            Err(_) => {
                let _ = shutdown_tx.send(true);
                return;
            }
        }
    })
}

async fn run_terminal(
    assembler: ReadingAssembler<Source>,
    config: &Config,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let keys = spawn_key_watcher(shutdown_tx.clone());
    let result = run_ui(&mut terminal, assembler, config, shutdown).await;

    let _ = shutdown_tx.send(true);
    let _ = keys.join();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut assembler: ReadingAssembler<Source>,
    config: &Config,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut state =
        DashboardState::new(assembler.source_name(), assembler.groups().to_vec(), config.y_max());
    let mut ticker = tokio::time::interval(config.refresh_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Keeps the header's frame age moving while a block is in flight
    let mut redraw = tokio::time::interval(Duration::from_millis(250));
    redraw.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut closed = false;

    while !is_shutdown(&shutdown) {
        terminal.draw(|f| draw(f, &state))?;

        if closed {
            tokio::select! {
                _ = shutdown.changed() => {}
                _ = redraw.tick() => {}
            }
            continue;
        }

        tokio::select! {
            _ = shutdown.changed() => continue,
            _ = ticker.tick() => {}
        }

        // Ticks serialize: the next tick waits until this frame completes
        let result = {
            let next = assembler.next_frame();
            tokio::pin!(next);
            loop {
                tokio::select! {
                    result = &mut next => break Some(result),
                    _ = shutdown.changed() => break None,
                    _ = redraw.tick() => {
                        terminal.draw(|f| draw(f, &state))?;
                    }
                }
            }
        };

        match result {
            None => continue,
            Some(Ok(frame)) => state.update_frame(frame),
            Some(Err(ReadError::BlockTimeout { sentinel, waited })) => {
                warn!(sentinel = %sentinel, waited_ms = %waited.as_millis(), "block_timeout");
                state.record_error(format!("no {} block for {}ms", sentinel, waited.as_millis()));
            }
            Some(Err(ReadError::Closed)) => {
                info!(source = %assembler.source_name(), frames = assembler.frames_assembled(), "source_closed");
                state.mark_closed();
                closed = true;
            }
            Some(Err(e)) => {
                error!(error = %e, "read_failed");
                return Err(e.into());
            }
        }
    }
    Ok(())
}
