use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use force_sensor::calibration::{CalibrationProcedure, CalibrationRecord, CalibrationStore};
use force_sensor::config::{AppConfig, SerialConfig};
use force_sensor::error::{log_store_error, log_transport_error};
use force_sensor::session::{
    cancel_on_ctrl_c, CalibrationSession, ConsoleOperator, DisplaySurface, JsonLinesDisplay,
    MonitorSession, TerminalDisplay,
};
use force_sensor::transport::{CancelToken, LineSource, ReaderLineSource};

const RULE_WIDTH: usize = 70;

#[derive(Parser, Debug)]
#[command(
    name = "force_cli",
    about = "Calibrate and monitor a magnetometer force sensor over serial"
)]
struct Cli {
    /// JSON configuration file (defaults are used when absent or invalid)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

/// Where sensor lines come from
#[derive(clap::Args, Debug)]
struct SourceArgs {
    /// Serial port, e.g. /dev/ttyACM0 or COM4
    #[arg(long)]
    port: Option<String>,
    #[arg(long)]
    baud: Option<u32>,
    /// Replay a captured log file instead of opening a serial port
    #[arg(long)]
    replay: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DisplayFormat {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive calibration with known weights
    Calibrate {
        #[command(flatten)]
        source: SourceArgs,
        /// Valid readings averaged per weight
        #[arg(long)]
        samples: Option<usize>,
        #[arg(long)]
        sample_delay_ms: Option<u64>,
        /// Where to write the calibration record
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Live force readout using a stored calibration
    Monitor {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        calibration: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = DisplayFormat::Table)]
        format: DisplayFormat,
        /// Stop after this many reads
        #[arg(long)]
        max_ticks: Option<u64>,
    },
    /// Print a stored calibration record
    Show {
        #[arg(long)]
        calibration: Option<PathBuf>,
    },
    /// List serial ports
    Ports,
}

fn main() -> ExitCode {
    force_sensor::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref());

    match cli.command {
        Commands::Calibrate {
            source,
            samples,
            sample_delay_ms,
            output,
        } => {
            source.apply(&mut config.serial);
            if let Some(samples) = samples {
                config.calibration.samples_per_weight = samples;
            }
            if let Some(delay) = sample_delay_ms {
                config.calibration.sample_delay_ms = delay;
            }
            if let Some(output) = output {
                config.calibration.output_path = output;
            }
            run_calibrate(&config, source.replay.as_deref())
        }
        Commands::Monitor {
            source,
            calibration,
            format,
            max_ticks,
        } => {
            source.apply(&mut config.serial);
            let path = calibration.unwrap_or_else(|| config.calibration.output_path.clone());
            run_monitor(&config, &path, source.replay.as_deref(), format, max_ticks)
        }
        Commands::Show { calibration } => {
            let path = calibration.unwrap_or_else(|| config.calibration.output_path.clone());
            run_show(&path)
        }
        Commands::Ports => run_ports(),
    }
}

impl SourceArgs {
    fn apply(&self, serial: &mut SerialConfig) {
        if let Some(port) = &self.port {
            serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            serial.baud_rate = baud;
        }
    }
}

fn open_source(serial: &SerialConfig, replay: Option<&Path>) -> Result<Box<dyn LineSource>> {
    match replay {
        Some(path) => {
            let source = ReaderLineSource::from_path(path)
                .map_err(|err| {
                    log_transport_error(&err, "open_replay");
                    err
                })
                .with_context(|| format!("opening replay file {}", path.display()))?;
            Ok(Box::new(source))
        }
        None => open_serial(serial),
    }
}

#[cfg(feature = "serial")]
fn open_serial(serial: &SerialConfig) -> Result<Box<dyn LineSource>> {
    use force_sensor::transport::SerialLineSource;

    eprintln!("Connecting to Pico on {}...", serial.port);
    let source = SerialLineSource::open(serial)
        .map_err(|err| {
            log_transport_error(&err, "open_serial");
            err
        })
        .with_context(|| format!("connecting to {}", serial.port))?;
    eprintln!("Connected!");
    Ok(Box::new(source))
}

#[cfg(not(feature = "serial"))]
fn open_serial(serial: &SerialConfig) -> Result<Box<dyn LineSource>> {
    anyhow::bail!(
        "built without serial support; cannot open {} (use --replay FILE)",
        serial.port
    )
}

fn run_calibrate(config: &AppConfig, replay: Option<&Path>) -> Result<ExitCode> {
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("FORCE SENSOR CALIBRATION");
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("Keyword: {}", config.sensor.z_axis_keyword);

    let source = open_source(&config.serial, replay)?;
    let store = CalibrationStore::new(&config.calibration.output_path);
    let outcome =
        CalibrationSession::new(source, ConsoleOperator::stdio(), config).run(&store)?;

    print_results(&outcome.record);
    println!(
        "\nCalibration saved to '{}'",
        config.calibration.output_path.display()
    );
    print_table(&outcome.procedure);
    Ok(ExitCode::SUCCESS)
}

fn run_monitor(
    config: &AppConfig,
    calibration_path: &Path,
    replay: Option<&Path>,
    format: DisplayFormat,
    max_ticks: Option<u64>,
) -> Result<ExitCode> {
    let store = CalibrationStore::new(calibration_path);
    let model = store
        .load_model()
        .map_err(|err| {
            log_store_error(&err, "run_monitor");
            err
        })
        .with_context(|| format!("loading calibration from {}", calibration_path.display()))?;

    let mut display: Box<dyn DisplaySurface> = match format {
        DisplayFormat::Table => {
            println!("Z-axis sensor ({}):", model.sensor_label);
            println!(
                "  Formula:   Force (N) = {:.6} * Z-axis (mT) + {:.6}",
                model.slope, model.intercept
            );
            println!("  R² value:  {:.6}", model.r_squared);
            Box::new(TerminalDisplay::new(io::stdout()))
        }
        DisplayFormat::Json => Box::new(JsonLinesDisplay::new(io::stdout())),
    };

    let source = open_source(&config.serial, replay)?;
    let cancel = CancelToken::new();
    cancel_on_ctrl_c(cancel.clone()).context("installing Ctrl-C handler")?;

    let mut session = MonitorSession::new(
        source,
        &config.sensor.z_axis_keyword,
        model,
        config.monitor.clone(),
    );
    session.run(&mut *display, &cancel, max_ticks)?;
    Ok(ExitCode::SUCCESS)
}

fn run_show(path: &Path) -> Result<ExitCode> {
    let record = CalibrationStore::new(path)
        .load()
        .map_err(|err| {
            log_store_error(&err, "run_show");
            err
        })
        .with_context(|| format!("reading {}", path.display()))?;

    println!("Calibration file: {}", path.display());
    println!("Generated:        {}", record.generated);
    println!("Points:           {}", record.num_calibration_points);
    println!("Keyword:          {}", record.sensor_config.z_axis_keyword);
    match &record.z_axis_sensor {
        Some(_) => print_results(&record),
        None => println!("No valid calibration data found"),
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(feature = "serial")]
fn run_ports() -> Result<ExitCode> {
    let ports = force_sensor::transport::list_ports().map_err(|err| {
        log_transport_error(&err, "run_ports");
        err
    })?;

    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}\t{}", port.name, port.description);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(not(feature = "serial"))]
fn run_ports() -> Result<ExitCode> {
    anyhow::bail!("built without serial support")
}

fn print_results(record: &CalibrationRecord) {
    let Some(sensor) = &record.z_axis_sensor else {
        return;
    };
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("Z-AXIS SENSOR CALIBRATION RESULTS");
    println!("{}", "=".repeat(RULE_WIDTH));
    println!(
        "Formula: Force (N) = {:.6} * Z-axis (mT) + {:.6}",
        sensor.slope, sensor.intercept
    );
    println!("Slope:     {:.6}", sensor.slope);
    println!("Intercept: {:.6}", sensor.intercept);
    println!("R² value:  {:.6}", sensor.r_squared);
    println!("Sensor:    {}", sensor.sensor_label);
}

fn print_table(procedure: &CalibrationProcedure) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("CALIBRATION DATA TABLE");
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("{:<15} {:<15} {:<15}", "Weight (kg)", "Force (N)", "Z-axis (mT)");
    println!("{}", "-".repeat(RULE_WIDTH));
    for row in procedure.table() {
        let raw = row
            .raw_mean
            .map(|mean| format!("{:.3}", mean))
            .unwrap_or_else(|| "N/A".to_string());
        println!(
            "{:<15.3} {:<15.3} {:<15}",
            row.weight_kg, row.force_newtons, raw
        );
    }
    println!("{}", "=".repeat(RULE_WIDTH));
}
