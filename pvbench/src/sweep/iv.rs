use benchbus::InstrumentInterface;
use keysight_el34243a::RegulationMode;
use log::info;
use measurements::{Current, Voltage};
use serde::{Deserialize, Serialize};

use crate::{Bench, BenchError, Clock, IvSample, max_power_point, sweep::secs};

/// Open-circuit voltage of the emulated panel, in volt.
const PANEL_VOC: f64 = 24.3;

/// `n` evenly spaced values from `start` to `stop`, both included.
fn linspace(start: f64, stop: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 {
        (stop - start) / (n - 1) as f64
    } else {
        0.0
    };
    (0..n).map(move |i| start + step * i as f64)
}

/// Values from `start` up to but excluding `stop` in increments of `step`.
///
/// Computed from the index so rounding does not accumulate. Values within rounding distance of
/// `stop` are excluded.
fn arange(start: f64, stop: f64, step: f64) -> impl Iterator<Item = f64> {
    let n = ((stop - start) / step - 1e-9).ceil().max(0.0) as usize;
    (0..n).map(move |i| start + step * i as f64)
}

/// Load voltages of the default I-V sweep, from the open-circuit voltage down to 0.5 V.
///
/// Coarse below 12 V, 1 V steps to 19 V, and fine steps around the maximum-power point.
pub fn default_iv_voltages() -> Vec<f64> {
    let mut voltages: Vec<f64> = linspace(0.5, 11.0, 4)
        .chain(arange(12.0, 20.0, 1.0))
        .chain(arange(20.0, 22.5, 0.1))
        .chain(arange(22.5, PANEL_VOC, 0.2))
        .chain(std::iter::once(PANEL_VOC))
        .collect();
    voltages.reverse();
    voltages
}

/// Settings of the panel I-V sweep.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IvSweepConfig {
    /// Regulation mode of the load, `VOLT` for a voltage sweep.
    pub mode: String,
    /// Sense the voltage at the converter terminals instead of at the load.
    pub remote_sense: bool,
    /// Source current limit while measuring, i.e., the emulated short-circuit current.
    pub current_ceiling: f64,
    /// Source current limit while the load changes its operating point.
    pub low_current_limit: f64,
    /// Source voltage and first load set-point, in volt.
    pub open_circuit_voltage: f64,
    /// Load set-points, in the order they are applied.
    pub voltages: Vec<f64>,
    /// Wait after each change of the source current limit, in seconds.
    pub settle_secs: f64,
    /// Hold time at the full current limit before reading, in seconds.
    pub run_secs: f64,
}

impl Default for IvSweepConfig {
    fn default() -> Self {
        Self {
            mode: RegulationMode::Voltage.to_string(),
            remote_sense: false,
            current_ceiling: 4.0,
            low_current_limit: 1.0,
            open_circuit_voltage: PANEL_VOC,
            voltages: default_iv_voltages(),
            settle_secs: 1.0,
            run_secs: 1.0,
        }
    }
}

/// Current-voltage characteristic of a panel emulated by the source.
///
/// Before each new load set-point the source current limit drops to `low_current_limit` and is
/// only raised back to `current_ceiling` once the load has settled. Changing the operating point
/// at the full current limit makes the source overshoot.
#[derive(Debug, Clone, Default)]
pub struct IvSweep {
    config: IvSweepConfig,
}

impl IvSweep {
    /// Create the procedure with the given settings.
    pub fn new(config: IvSweepConfig) -> Self {
        Self { config }
    }

    /// The settings in use.
    pub fn config(&self) -> &IvSweepConfig {
        &self.config
    }

    /// Run the sweep and return one sample per load voltage, in sweep order.
    pub fn run<S, L, C>(&self, bench: &mut Bench<S, L>, clock: &C) -> Result<Vec<IvSample>, BenchError>
    where
        S: InstrumentInterface,
        L: InstrumentInterface,
        C: Clock + ?Sized,
    {
        let cfg = &self.config;
        let mode: RegulationMode = cfg.mode.parse()?;
        let ceiling = Current::from_amperes(cfg.current_ceiling);
        let low = Current::from_amperes(cfg.low_current_limit);

        bench.power_down()?;
        bench.source.set_current(ceiling)?;
        bench
            .source
            .set_voltage(Voltage::from_volts(cfg.open_circuit_voltage))?;
        bench.source.activate()?;
        bench.load.set_mode(mode, cfg.remote_sense)?;
        bench.load.set_value(cfg.open_circuit_voltage)?;

        let nof_steps = cfg.voltages.len();
        let mut samples = Vec::with_capacity(nof_steps);
        for (idx, &setpoint) in cfg.voltages.iter().enumerate() {
            info!("Sweep {}/{nof_steps}: {setpoint:.2} V", idx + 1);

            bench.source.set_current(low)?;
            clock.sleep(secs(cfg.settle_secs));
            bench.load.set_value(setpoint)?;
            bench.load.activate()?;
            clock.sleep(secs(cfg.settle_secs));
            bench.source.set_current(ceiling)?;
            clock.sleep(secs(cfg.run_secs));

            let voltage = bench.load.read_voltage()?;
            let current = bench.load.read_current()?;
            bench.load.deactivate()?;

            samples.push(IvSample::new(voltage, current));
        }

        if let Some(mpp) = max_power_point(&samples) {
            info!(
                "Max power point = {:.1} W at {:.1} V",
                mpp.power, mpp.voltage
            );
        }
        Ok(samples)
    }
}
