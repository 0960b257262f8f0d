use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use benchbus::{
    InstrumentInterface,
    bus::{self, Bus},
};
use clap::{Parser, Subcommand};
use log::info;
use pvbench::{
    Bench, BenchConfig, EfficiencySweep, IvSweep, MpptProfile, MpptReplay, NoGate, PromptGate,
    ShutdownGuard, SystemClock, Trigger, max_power_point, write_csv_file,
};

/// Characterize PV power converters on a Keysight N5769A / EL34243A bench.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// TOML configuration file, defaults apply where it is silent.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log every instrument command.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the USB instruments on the bus.
    List,
    /// Measure efficiency over input voltages and load set-points.
    Efficiency {
        /// Do not wait for the operator before each input voltage.
        #[arg(long)]
        no_pause: bool,
        /// CSV file for the samples.
        #[arg(short, long, default_value = "effsweep.csv")]
        output: PathBuf,
    },
    /// Sweep the load voltage across the emulated panel's I-V curve.
    IvSweep {
        /// CSV file for the samples.
        #[arg(short, long, default_value = "ivsweep.csv")]
        output: PathBuf,
    },
    /// Replay a short-circuit current profile for MPPT testing.
    Mppt {
        /// CSV file with `t,isc` columns.
        #[arg(short, long)]
        profile: PathBuf,
        /// CSV file for the running mean power after each profile point.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => BenchConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => BenchConfig::default(),
    };

    #[cfg(feature = "visa")]
    let bus = benchbus::bus::VisaBus::try_new().context("Failed to open the VISA resource manager")?;
    #[cfg(not(feature = "visa"))]
    let bus = benchbus::bus::UsbtmcBus::default();

    run(bus, &cli.command, &config)
}

fn run<B>(mut bus: B, command: &Command, config: &BenchConfig) -> Result<()>
where
    B: Bus,
    B::Session: Send + 'static,
{
    let guard: Arc<ShutdownGuard<B::Session, B::Session>> = Arc::new(ShutdownGuard::new());
    let handler_guard = Arc::clone(&guard);
    ctrlc::set_handler(move || {
        handler_guard.interrupt();
    })
    .context("Failed to install the interrupt handler")?;

    let profile = match command {
        Command::Mppt { profile, .. } => Some(
            MpptProfile::from_path(profile)
                .with_context(|| format!("Failed to load MPPT profile {}", profile.display()))?,
        ),
        _ => None,
    };

    let devices = bus::enumerate(&mut bus).context("Failed to enumerate instruments")?;
    if let Command::List = command {
        for device in &devices {
            println!("{device}");
        }
        return Ok(());
    }
    for device in &devices {
        info!("Found {device}");
    }

    let timeout = config.bench.timeout();
    let source = bus::connect_by_idn(&mut bus, &config.bench.source_idn, timeout)
        .context("Failed to connect to the source")?;
    let sink = bus::connect_by_idn(&mut bus, &config.bench.sink_idn, timeout)
        .context("Failed to connect to the load")?;
    let mut bench = Bench::new(source, sink, config.bench.sink_channel)
        .context("Failed to open the bench instruments")?;
    guard.arm(&bench);

    let result = run_procedure(&mut bench, command, config, profile.as_ref());
    let shutdown = guard.shutdown(Trigger::Completion);
    result?;
    shutdown.context("Failed to bring the bench into a safe state")
}

fn run_procedure<S, L>(
    bench: &mut Bench<S, L>,
    command: &Command,
    config: &BenchConfig,
    profile: Option<&MpptProfile>,
) -> Result<()>
where
    S: InstrumentInterface,
    L: InstrumentInterface,
{
    let clock = SystemClock::new();
    match command {
        Command::List => Ok(()),
        Command::Efficiency { no_pause, output } => {
            let sweep = EfficiencySweep::new(config.efficiency.clone());
            let samples = if *no_pause || !config.efficiency.pause {
                sweep.run(bench, &clock, &mut NoGate)?
            } else {
                let mut gate = PromptGate::new(io::stdin().lock(), io::stdout());
                sweep.run(bench, &clock, &mut gate)?
            };
            save(output, &samples)
        }
        Command::IvSweep { output } => {
            let samples = IvSweep::new(config.iv_sweep.clone()).run(bench, &clock)?;
            if let Some(mpp) = max_power_point(&samples) {
                println!(
                    "Max power point = {:.1} W at {:.1} V",
                    mpp.power, mpp.voltage
                );
            }
            save(output, &samples)
        }
        Command::Mppt { output, .. } => {
            let profile = profile.context("No MPPT profile loaded")?;
            let report = MpptReplay::new(config.mppt.clone()).run(bench, &clock, profile)?;
            println!(
                "Mean power = {:.2} W over {} samples",
                report.mean_power(),
                report.samples
            );
            match output {
                Some(path) => save(path, &report.segments),
                None => Ok(()),
            }
        }
    }
}

fn save<T: serde::Serialize>(path: &Path, records: &[T]) -> Result<()> {
    write_csv_file(path, records)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}
