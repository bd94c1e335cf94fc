//! Dustwatch CLI - runs the SDS011 acquisition service in the foreground.
//!
//! Loads the configuration file (creating a commented template on first
//! run), starts the duty-cycle controller, and runs until Ctrl-C. While
//! running, the latest reading is logged once per full cycle so a quick
//! glance at the console shows whether data is flowing.

mod error;

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing::info;

use dustwatch::config::ConfigFile;
use dustwatch::logging::init_logging;
use dustwatch::sensor::ReadingProvider;
use dustwatch::service::SensorService;
use error::CliError;

#[derive(Parser)]
#[command(name = "dustwatch")]
#[command(version = dustwatch::VERSION)]
#[command(about = "Duty-cycled SDS011 particulate sensor service", long_about = None)]
struct Args {
    /// Path to the configuration file (default: ~/.dustwatch/config.ini)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port override (e.g. /dev/ttyUSB0)
    #[arg(long)]
    port: Option<String>,

    /// Snapshot output path override
    #[arg(long)]
    json_output: Option<PathBuf>,

    /// Enable debug-level logging regardless of RUST_LOG
    #[arg(long)]
    debug: bool,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn main() {
    let args = Args::parse();

    if args.list_ports {
        list_ports();
        return;
    }

    if let Err(e) = run(args) {
        e.exit();
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(&args)?;

    let log_path = &config.logging.file;
    let log_dir = log_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let log_file = log_path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "dustwatch.log".to_string());

    let _logging_guard = init_logging(&log_dir, &log_file, true, args.debug)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    info!(version = dustwatch::VERSION, "dustwatch starting");

    let service =
        SensorService::start(&config).map_err(|e| CliError::Config(e.to_string()))?;
    let readings = service.readings();

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .map_err(|e| CliError::Signal(e.to_string()))?;

    // Idle between status lines; one line per full wake/sleep cycle.
    let status_interval =
        Duration::from_secs(config.cycle.read_period_secs + config.cycle.sleep_period_secs);
    loop {
        match stop_rx.recv_timeout(status_interval) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => log_status(&readings),
        }
    }

    info!("Shutdown requested");
    service.stop();
    Ok(())
}

fn load_config(args: &Args) -> Result<ConfigFile, CliError> {
    let loaded = match &args.config {
        Some(path) => ConfigFile::load_from(path),
        // Default location: write the commented template on first run.
        None => ConfigFile::ensure_exists().and_then(|_| ConfigFile::load()),
    };
    let mut config = loaded.map_err(|e| CliError::Config(e.to_string()))?;

    if let Some(port) = &args.port {
        config.device.port = port.clone();
    }
    if let Some(path) = &args.json_output {
        config.output.json_output = path.clone();
    }
    config
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(config)
}

fn log_status(readings: &dyn ReadingProvider) {
    match readings.latest() {
        Some(reading) => {
            let age_secs = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|now| now.as_secs() as i64 - reading.timestamp)
                .unwrap_or(0);
            info!(
                pm2_5 = reading.pm2_5,
                pm10_0 = reading.pm10_0,
                age_secs,
                "Latest reading"
            );
        }
        None => info!("No reading yet"),
    }
}

fn list_ports() {
    match serialport::available_ports() {
        Ok(ports) if ports.is_empty() => println!("No serial ports found"),
        Ok(ports) => {
            println!("Available serial ports:");
            for port in ports {
                println!("  {} ({})", port.port_name, port_type_name(&port.port_type));
            }
        }
        Err(e) => eprintln!("Failed to enumerate serial ports: {}", e),
    }
}

fn port_type_name(port_type: &serialport::SerialPortType) -> &'static str {
    match port_type {
        serialport::SerialPortType::UsbPort(_) => "USB",
        serialport::SerialPortType::BluetoothPort => "Bluetooth",
        serialport::SerialPortType::PciPort => "PCI",
        serialport::SerialPortType::Unknown => "unknown",
    }
}
