use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mecanum_drive_runtime::config::DriveConfig;
use mecanum_drive_runtime::drivetrain::DriveTrainController;
use mecanum_drive_runtime::drivetrain::sim::{SimParams, SimWorld};

/// Mecanum drivetrain runtime (simulated wheel set)
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON drivetrain config; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated wheel speed at full power (ticks/s)
    #[arg(long, default_value_t = 2700.0)]
    max_ticks_per_sec: f64,

    /// Simulated rotation rate with full differential power (deg/s)
    #[arg(long, default_value_t = 180.0)]
    max_yaw_deg_per_sec: f64,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init(); // installs the subscriber globally

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match DriveConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {}", e);
                std::process::exit(2);
            }
        },
        None => DriveConfig::default(),
    };

    let world = SimWorld::new(SimParams {
        max_ticks_per_sec: args.max_ticks_per_sec,
        max_yaw_deg_per_sec: args.max_yaw_deg_per_sec,
    });
    info!("Using simulated drivetrain: {:?}", args);

    let controller = match DriveTrainController::new(world.wheels(), world.imu(), world, config) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("Drivetrain error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = mecanum_drive_runtime::runtime::run(controller).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
