//! # Gantry Binary
//!
//! Command-line front end of the wash gantry.
//!
//! # Usage
//!
//! ```bash
//! # One wash cycle with the simulation backend
//! gantry --config config/gantry.toml --simulate wash
//!
//! # Home, then move 500 steps along X
//! gantry -c config/gantry.toml move --dx 500 --dy 0
//!
//! # Store a calibration record, then show it
//! gantry calibrate --label default --x 120 --y 80
//! gantry show-calibration --label default
//!
//! # Send a raw token to the peripheral controller
//! gantry peripheral pump_soap
//! ```

use clap::{Parser, Subcommand};
use gantry_common::config::{GantryConfig, LogLevel};
use gantry_common::consts::DEFAULT_CONFIG_PATH;
use gantry_common::motion::command::MotionCommand;
use gantry_hal::peripheral::open_link;
use gantry_hal::PeripheralCommand;
use gantry_motion::{CalibrationStore, MotionCoordinator, WashCycleOrchestrator, WorkCycleLog};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Gantry - two-axis wash gantry controller
#[derive(Parser, Debug)]
#[command(name = "gantry")]
#[command(version)]
#[command(about = "Two-axis wash gantry controller")]
#[command(long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force the simulation backend and simulated peripherals
    #[arg(short = 's', long)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one wash cycle
    Wash,
    /// Home both axes
    Home,
    /// Home, then move relative to the reference
    Move {
        /// X displacement [steps]
        #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
        dx: i64,
        /// Y displacement [steps]
        #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
        dy: i64,
    },
    /// Store a calibration record
    Calibrate {
        /// Record label
        #[arg(long, default_value = "default")]
        label: String,
        /// X position [steps]
        #[arg(long, allow_hyphen_values = true)]
        x: i64,
        /// Y position [steps]
        #[arg(long, allow_hyphen_values = true)]
        y: i64,
    },
    /// Print a calibration record
    ShowCalibration {
        /// Record label
        #[arg(long, default_value = "default")]
        label: String,
    },
    /// Send one token to the peripheral controller
    Peripheral {
        /// Token, e.g. rotate, pump_soap, pump_water
        token: String,
    },
}

fn main() {
    if let Err(e) = run() {
        error!("gantry failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let loaded = if args.config.exists() {
        GantryConfig::load_file(&args.config).map(Some)
    } else {
        Ok(None)
    };
    let log_level = match &loaded {
        Ok(Some(config)) => config.shared.log_level,
        _ => LogLevel::default(),
    };
    setup_tracing(&args, log_level);
    let mut config = loaded?.unwrap_or_default();

    info!("Gantry v{} starting...", env!("CARGO_PKG_VERSION"));
    if !args.config.exists() {
        warn!("{} not found, using defaults", args.config.display());
    }
    if args.simulate {
        info!("Simulation mode enabled");
        config.machine.driver = "simulation".to_string();
        config.peripheral.port = None;
    }

    match &args.command {
        Command::Calibrate { label, x, y } => {
            let store = CalibrationStore::new(&config.storage.calibration_dir);
            store.save(label, *x, *y)?;
            return Ok(());
        }
        Command::ShowCalibration { label } => {
            let store = CalibrationStore::new(&config.storage.calibration_dir);
            let record = store.load(label)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            return Ok(());
        }
        Command::Peripheral { token } => {
            let mut link = open_link(&config.peripheral)?;
            for line in link.send(&PeripheralCommand::from_token(token))? {
                info!("Peripheral: {}", line);
            }
            return Ok(());
        }
        Command::Wash | Command::Home | Command::Move { .. } => {}
    }

    let coordinator = MotionCoordinator::from_config(&config)?;
    let shared = Arc::clone(coordinator.shared());
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping all motion");
        shared.register.apply(MotionCommand::StopAll);
        shared.running_flag().store(false, Ordering::SeqCst);
    })?;

    coordinator.start()?;
    let result = execute(&args.command, &config, &coordinator);

    println!("{}", serde_json::to_string_pretty(&coordinator.status())?);
    coordinator.shutdown()?;
    info!("Gantry shutdown complete");
    result
}

fn execute(
    command: &Command,
    config: &GantryConfig,
    coordinator: &MotionCoordinator,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Wash => {
            let link = open_link(&config.peripheral)?;
            let wash = WashCycleOrchestrator::new(
                coordinator,
                link,
                WorkCycleLog::new(&config.storage.cycle_log),
                config.wash.clone(),
            );
            let report = wash.run_cycle()?;
            info!(
                "Wash cycle {} -> {} ({} steps)",
                report.start_time,
                report.end_time,
                report.steps.len()
            );
        }
        Command::Home => coordinator.home()?,
        Command::Move { dx, dy } => {
            coordinator.home()?;
            coordinator.move_to(*dx, *dy)?;
        }
        Command::Calibrate { .. } | Command::ShowCalibration { .. } | Command::Peripheral { .. } => {}
    }
    Ok(())
}

/// Setup tracing subscriber from CLI arguments and `[shared].log_level`.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level.as_directive()))
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
