//! drishti-scan - sweep the room once and plot what the sensor saw
//!
//! ```bash
//! drishti-scan -c /etc/drishti.toml
//! drishti-scan --mock --step-angle 5 -o room.svg
//! ```
//!
//! Ctrl-C stops the sweep before the next step; pins are released on every
//! exit path.

use clap::Parser;
use drishti_scan::{create_device, Config, PlotSink, Result, Scanner, SvgPlot, SvgPlotConfig};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "drishti-scan", version, about = "Ultrasonic sweep mapper")]
struct Args {
    /// TOML configuration file (built-in defaults if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Degrees between samples (overrides config)
    #[arg(long)]
    step_angle: Option<u32>,

    /// Use the simulated board instead of real GPIO
    #[arg(long)]
    mock: bool,

    /// SVG output path (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip plotting
    #[arg(long)]
    no_plot: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Using config: {}", path.display());
            Config::load(path)?
        }
        None => Config::default(),
    };

    if let Some(step_angle) = args.step_angle {
        config.scan.step_angle = step_angle;
    }
    if args.mock {
        config.device.device_type = "mock".to_string();
    }
    if let Some(output) = &args.output {
        config.plot.output = output.display().to_string();
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    log::info!(
        "Device: {} ({})",
        config.device.name,
        config.device.device_type
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received interrupt, stopping after current step");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| drishti_scan::Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    // Any failure here aborts before the motor moves
    let device = create_device(&config)?;
    let scanner = Scanner::new(device, &config.pins)?;

    log::info!("Starting object mapping...");
    let session = scanner.run(config.scan.step_angle, &running)?;

    if session.aborted {
        log::info!("Mapping stopped by user");
        return Ok(());
    }

    if args.no_plot {
        log::info!("Mapping complete");
        return Ok(());
    }

    log::info!("Mapping complete. Plotting data...");
    let mut plot = SvgPlot::new(
        &config.plot.output,
        SvgPlotConfig {
            title: config.plot.title.clone(),
            ..Default::default()
        },
    );
    plot.render(session)?;

    Ok(())
}
