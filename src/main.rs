//! # PXX2 Link
//!
//! Drive PXX2 RF modules from the command line.
//!
//! This application generates the PXX2 frame stream for every configured
//! module and writes it to that module's serial port at a fixed cycle period.

use anyhow::{Context, Result};
use std::time::Instant;
use tokio::time::{interval, Duration};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use pxx2_link::capture::FrameRecorder;
use pxx2_link::config::{Config, LoggingConfig, SerialConfig, MAX_OUTPUT_CHANNELS};
use pxx2_link::link::LinkDriver;
use pxx2_link::pxx2::LogNotifier;
use pxx2_link::serial::{ModuleSerial, DEFAULT_DEVICE_PATHS};

/// Config file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Length of one generator tick
const TICK_MS: u128 = 10;

/// Main entry point for PXX2 Link
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or `config/default.toml`)
///    - Set up logging with tracing subscriber (stdout, optional daily file)
///    - Open one serial port per RF module
///
/// 2. **Main Loop**
///    - Run one cycle per period: one frame per module
///    - Log status every `log_interval_cycles` cycles
///    - Handle Ctrl+C for graceful shutdown
///
/// # Current Behavior
///
/// Channel outputs are held at center. Every module starts in normal mode.
///
/// # Errors
///
/// Returns error if:
/// - Configuration cannot be loaded
/// - Serial port cannot be opened (no RF module found)
/// - Capture directory cannot be created
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging);

    info!("PXX2 Link v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Loaded {} ({} module(s), registration id {:?})",
        config_path,
        config.model.modules.len(),
        config.model.registration_id
    );

    let ports = open_module_ports(&config.serial)?;
    let mut driver = LinkDriver::new(config.model.clone(), ports)?;
    if config.capture.enabled {
        driver = driver.with_recorder(FrameRecorder::from_config(&config.capture)?);
    }

    let channel_outputs = [0i16; MAX_OUTPUT_CHANNELS];
    let mut notifier = LogNotifier;

    let period = Duration::from_millis(config.link.cycle_period_ms);
    let mut cycle_interval = interval(period);
    let started = Instant::now();

    info!("Starting PXX2 cycle loop every {}ms", config.link.cycle_period_ms);
    info!("Press Ctrl+C to exit");

    let mut last_log_cycle: u64 = 0;

    loop {
        tokio::select! {
            _ = cycle_interval.tick() => {
                let tick = tick_at(started.elapsed());
                driver.run_cycle(tick, &channel_outputs, &mut notifier).await?;

                let stats = driver.stats();
                if stats.cycles - last_log_cycle >= config.link.log_interval_cycles {
                    info!(
                        "{} cycles, {} frames sent, {} send errors",
                        stats.cycles, stats.frames_sent, stats.send_errors
                    );
                    last_log_cycle = stats.cycles;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                let stats = driver.stats();
                info!("Total frames sent: {} in {} cycles", stats.frames_sent, stats.cycles);
                break;
            }
        }
    }

    Ok(())
}

/// Open the port of every module, in module order
///
/// An empty port list (single module only, enforced by config validation)
/// auto-detects the device.
fn open_module_ports(config: &SerialConfig) -> Result<Vec<ModuleSerial>> {
    if config.ports.is_empty() {
        let serial = ModuleSerial::open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate)?;
        info!("Module 0 serial port opened at: {}", serial.device_path());
        return Ok(vec![serial]);
    }

    let mut ports = Vec::with_capacity(config.ports.len());
    for (module_id, path) in config.ports.iter().enumerate() {
        let serial = ModuleSerial::open_with_paths(&[path.as_str()], config.baud_rate)?;
        info!("Module {} serial port opened at: {}", module_id, serial.device_path());
        ports.push(serial);
    }
    Ok(ports)
}

/// Generator tick for the time elapsed since start
///
/// Wraps like the 32-bit tick it models.
fn tick_at(elapsed: Duration) -> u32 {
    (elapsed.as_millis() / TICK_MS) as u32
}

/// Install the tracing subscriber
///
/// `RUST_LOG` overrides the configured level. The returned guard flushes the
/// file writer and must live until shutdown.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = if config.file_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.file_dir, "pxx2-link.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}
