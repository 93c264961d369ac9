//! # GPS Control Unit
//!
//! Runs the actuator controller against a simulated robot at a fixed
//! tick period.
//!
//! The plugin parameters are read from a TOML parameter file under
//! `--namespace`; the robot comes from a TOML robot description. An
//! optional linear-Gaussian trial controller is attached before the
//! session starts.

use clap::Parser;
use gps_common::config::TomlConfigSource;
use gps_common::consts::DEFAULT_NAMESPACE;
use gps_control_unit::control::lin_gauss::LinearGaussianController;
use gps_control_unit::cycle::{CycleRunner, rt_setup};
use gps_control_unit::host::{HostController, PluginAdapter};
use gps_control_unit::sim::SimRobot;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// GPS Control Unit: realtime actuator control loop
#[derive(Parser, Debug)]
#[command(name = "gps_control_unit")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Multi-rate actuator controller with position and trial control")]
struct Args {
    /// Plugin parameter file (TOML, keys under --namespace).
    #[arg(long, default_value = "config/plugin.toml")]
    config: PathBuf,

    /// Robot description file (TOML).
    #[arg(long, default_value = "config/robot.toml")]
    robot: PathBuf,

    /// Parameter namespace.
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Linear-Gaussian trial controller parameter file (TOML).
    #[arg(long, value_name = "FILE")]
    trial: Option<PathBuf>,

    /// Stop after this many ticks (default: run until Ctrl-C).
    #[arg(long)]
    ticks: Option<u64>,

    /// CPU core to pin the RT thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Abort on the first tick that exceeds its period.
    #[arg(long)]
    strict_deadline: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("GPS Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("GPS Control Unit shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let source = TomlConfigSource::from_file(&args.config)?;
    let robot = SimRobot::load(&args.robot)?;
    info!("Robot '{}' loaded from {}", robot.name(), args.robot.display());

    let mut plugin = PluginAdapter::with_namespace(robot, &args.namespace);
    if !plugin.init(&source) {
        return Err(format!("plugin init failed under '{}'", args.namespace).into());
    }

    if let Some(path) = &args.trial {
        let trial = LinearGaussianController::load(path)?;
        info!(
            "Trial controller loaded from {} (horizon {} steps)",
            path.display(),
            trial.horizon()
        );
        plugin.control_mut().attach_trial_controller(Box::new(trial));
    }

    let period = plugin
        .control()
        .config()
        .map(|c| c.tick_period())
        .ok_or("plugin has no configuration after init")?;

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut runner = CycleRunner::new(period, running)
        .with_max_ticks(args.ticks)
        .with_strict_deadline(args.strict_deadline);

    plugin.starting();
    let result = runner.run(&mut plugin);
    plugin.stopping();

    let stats = runner.stats();
    info!(
        "{} control steps, {} sensor fault ticks, {} controller fault steps, {} saturated steps",
        stats.control_steps,
        stats.sensor_fault_ticks,
        stats.controller_fault_steps,
        stats.saturated_steps
    );

    if let Err(e) = result {
        error!("Tick loop error: {e}");
        return Err(Box::new(e));
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
