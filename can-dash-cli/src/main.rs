//! CAN Dashboard CLI Application
//!
//! Command-line front end for the can-dash-core library:
//! - Loads DBC files and a frame source (candump replay or SocketCAN)
//! - Runs the ingestion loop on its own thread
//! - Polls the shared telemetry and prints a dashboard summary (text or JSON)

use anyhow::{anyhow, bail, Context, Result};
use can_dash_core::{CandumpReplay, FrameDecoder, FrameSource, IngestionLoop};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};

mod config;
mod report;

use config::{AppConfig, InputSource};
use report::Snapshot;

/// CAN Dashboard - live gauges, drag times and g-forces from CAN frames
#[derive(Parser, Debug)]
#[command(name = "can-dash-cli")]
#[command(about = "Decode CAN frames into dashboard telemetry", long_about = None)]
#[command(version)]
struct Args {
    /// Path to DBC file(s) (can be repeated)
    #[arg(long, value_name = "FILE")]
    dbc: Vec<PathBuf>,

    /// Path to configuration file (dash.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// candump -L log to replay
    #[arg(long, value_name = "FILE", conflicts_with = "interface")]
    replay: Option<PathBuf>,

    /// Replay at the logged pace instead of as fast as possible
    #[arg(long)]
    realtime: bool,

    /// SocketCAN interface to read live (needs the `socketcan` feature)
    #[arg(long, value_name = "IFACE")]
    interface: Option<String>,

    /// Stop after this many seconds (default: until the source is exhausted)
    #[arg(long, value_name = "SECS")]
    duration: Option<f64>,

    /// Dashboard refresh interval in milliseconds
    #[arg(long, value_name = "MS")]
    interval: Option<u64>,

    /// Signal(s) to show as gauges (can be repeated)
    #[arg(long, value_name = "SIGNAL")]
    watch: Vec<String>,

    /// Override the speed signal driving the performance timer
    #[arg(long, value_name = "SIGNAL")]
    speed_signal: Option<String>,

    /// Override the lateral acceleration signal
    #[arg(long, value_name = "SIGNAL")]
    lateral_signal: Option<String>,

    /// Print snapshots as JSON lines
    #[arg(long)]
    json: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CAN Dashboard CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using core library v{}", can_dash_core::VERSION);

    let config = resolve_config(&args)?;

    if config.input.dbc_files.is_empty() {
        println!("CAN Dashboard - No DBC specified");
        println!("\nQuick Start:");
        println!("  can-dash-cli --dbc gm_global_a_hs.dbc --replay drive.log");
        println!("  can-dash-cli --dbc gm_global_a_hs.dbc --interface can0");
        println!("\nOr put everything in a config file:");
        println!("  can-dash-cli --config dash.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    run_dashboard(&config, args.duration, args.json)
}

/// Config file (if any) with command-line overrides applied
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    config.input.dbc_files.extend(args.dbc.iter().cloned());
    if let Some(replay) = &args.replay {
        config.input.replay = Some(replay.clone());
        config.input.interface = None;
    }
    if args.realtime {
        config.input.realtime = true;
    }
    if let Some(interface) = &args.interface {
        config.input.interface = Some(interface.clone());
        config.input.replay = None;
    }
    if let Some(interval) = args.interval {
        config.display.interval_ms = interval;
    }
    if !args.watch.is_empty() {
        config.display.watch = args.watch.clone();
    }
    if let Some(speed) = &args.speed_signal {
        config.telemetry.speed_signal = speed.clone();
    }
    if let Some(lateral) = &args.lateral_signal {
        config.telemetry.lateral_signal = lateral.clone();
    }

    if config.display.interval_ms == 0 {
        bail!("Refresh interval must be at least 1ms");
    }
    if config.display.watch.is_empty() {
        config.display.watch = vec![
            config.telemetry.speed_signal.clone(),
            config.telemetry.lateral_signal.clone(),
        ];
    }

    Ok(config)
}

fn open_source(input: &InputSource) -> Result<Box<dyn FrameSource + Send>> {
    match input {
        InputSource::Replay { path, realtime } => {
            let replay = CandumpReplay::open(path)
                .with_context(|| format!("Failed to open replay log: {:?}", path))?;
            Ok(Box::new(replay.realtime(*realtime)))
        }
        InputSource::Interface(iface) => open_interface(iface),
    }
}

#[cfg(all(feature = "socketcan", target_os = "linux"))]
fn open_interface(iface: &str) -> Result<Box<dyn FrameSource + Send>> {
    let socket = can_dash_core::SocketCanSource::open(iface)
        .with_context(|| format!("Failed to open CAN interface: {}", iface))?;
    Ok(Box::new(socket))
}

#[cfg(not(all(feature = "socketcan", target_os = "linux")))]
fn open_interface(iface: &str) -> Result<Box<dyn FrameSource + Send>> {
    bail!(
        "Cannot open '{}': live capture needs a Linux build with the `socketcan` feature",
        iface
    )
}

/// Load signals, start ingestion and print snapshots until done
fn run_dashboard(config: &AppConfig, duration: Option<f64>, json: bool) -> Result<()> {
    let decoder = FrameDecoder::from_dbc_files(&config.input.dbc_files)
        .context("Failed to load DBC files")?;

    let stats = decoder.database_stats();
    if !json {
        println!("═══════════════════════════════════════════════");
        println!("  CAN Dashboard");
        println!("═══════════════════════════════════════════════\n");
        println!("📊 Signal Database:");
        println!("  Messages: {}", stats.num_messages);
        println!("  Signals:  {}", stats.num_signals);
    }

    let source = open_source(&config.input.source()?)?;
    let ingest = IngestionLoop::new(source, decoder, &config.telemetry)
        .context("Failed to start ingestion")?;

    let telemetry = ingest.telemetry();
    let run_flag = ingest.run_flag();
    let handle = ingest
        .spawn()
        .context("Failed to spawn ingestion thread")?;

    let interval = Duration::from_millis(config.display.interval_ms);
    let deadline = duration
        .map(|secs| deadline_after(secs, Instant::now()))
        .transpose()?;
    let watch = &config.display.watch;

    loop {
        std::thread::sleep(interval);
        print_snapshot(&Snapshot::capture(&telemetry, watch), json)?;

        if handle.is_finished() {
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            log::info!("Duration elapsed, stopping");
            break;
        }
    }

    run_flag.stop();
    let reason = handle
        .join()
        .map_err(|_| anyhow!("Ingestion thread panicked"))?;
    log::info!("Ingestion stopped: {:?}", reason);

    if !json {
        println!("\n✓ Final state:");
    }
    print_snapshot(&Snapshot::capture(&telemetry, watch), json)?;

    Ok(())
}

/// Instant `secs` seconds after `now`
fn deadline_after(secs: f64, now: Instant) -> Result<Instant> {
    if !secs.is_finite() || secs < 0.0 {
        bail!("Duration must be a non-negative number of seconds, got {}", secs);
    }
    Duration::try_from_secs_f64(secs)
        .ok()
        .and_then(|d| now.checked_add(d))
        .ok_or_else(|| anyhow!("Duration of {} seconds is out of range", secs))
}

fn print_snapshot(snapshot: &Snapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", snapshot.to_json().context("Failed to serialize snapshot")?);
    } else {
        print!("{}", snapshot.to_text());
    }
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_defaults() {
        let args = Args::parse_from([
            "can-dash-cli",
            "--dbc",
            "a.dbc",
            "--dbc",
            "b.dbc",
            "--replay",
            "drive.log",
            "--interval",
            "250",
            "--speed-signal",
            "vehicle_speed",
        ]);
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.input.dbc_files.len(), 2);
        assert_eq!(config.display.interval_ms, 250);
        assert_eq!(config.telemetry.speed_signal, "vehicle_speed");
        // Watch list falls back to the designated signals
        assert_eq!(
            config.display.watch,
            vec![
                "vehicle_speed".to_string(),
                can_dash_core::config::DEFAULT_LATERAL_SIGNAL.to_string()
            ]
        );
        assert!(matches!(
            config.input.source().unwrap(),
            InputSource::Replay { realtime: false, .. }
        ));
    }

    #[test]
    fn test_replay_and_interface_conflict() {
        let result = Args::try_parse_from([
            "can-dash-cli",
            "--dbc",
            "a.dbc",
            "--replay",
            "drive.log",
            "--interface",
            "can0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_duration_validation() {
        let now = Instant::now();
        assert_eq!(deadline_after(1.5, now).unwrap(), now + Duration::from_millis(1500));
        assert_eq!(deadline_after(0.0, now).unwrap(), now);

        assert!(deadline_after(f64::INFINITY, now).is_err());
        assert!(deadline_after(f64::NAN, now).is_err());
        assert!(deadline_after(-1.0, now).is_err());
        assert!(deadline_after(1e30, now).is_err());
        assert!(deadline_after(u64::MAX as f64 / 2.0, now).is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let args = Args::parse_from(["can-dash-cli", "--dbc", "a.dbc", "--interval", "0"]);
        assert!(resolve_config(&args).is_err());
    }
}
