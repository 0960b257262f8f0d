use benchbus::InstrumentInterface;
use keysight_el34243a::RegulationMode;
use log::info;
use measurements::{Current, Voltage};
use serde::{Deserialize, Serialize};

use crate::{Bench, BenchError, Clock, EfficiencySample, OperatorGate, sweep::secs};

/// Nominal output voltage of the converter, used to derive the default load currents.
const NOMINAL_OUTPUT_VOLTAGE: f64 = 12.0;

/// Settings of the efficiency sweep.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EfficiencyConfig {
    /// Regulation mode of the load: `CURR`, `RES`, `POW`, or `VOLT`.
    pub mode: String,
    /// Sense the voltage at the converter terminals instead of at the load.
    pub remote_sense: bool,
    /// Source current limit for the whole sweep, in ampere.
    pub current_limit: f64,
    /// Input voltage steps in volt, outer loop.
    pub input_voltages: Vec<f64>,
    /// Load set-points in the unit of `mode`, inner loop.
    pub load_setpoints: Vec<f64>,
    /// Wait after a new input voltage, in seconds.
    pub settle_secs: f64,
    /// Hold time with the load enabled before reading, in seconds.
    pub run_secs: f64,
    /// Ask the operator before every new input voltage.
    pub pause: bool,
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        Self {
            mode: RegulationMode::Current.to_string(),
            remote_sense: true,
            current_limit: 12.0,
            input_voltages: vec![16.0, 18.0, 20.0, 22.0, 24.0],
            load_setpoints: [50.0, 62.5, 75.0, 87.5, 100.0]
                .iter()
                .map(|p| p / NOMINAL_OUTPUT_VOLTAGE)
                .collect(),
            settle_secs: 1.0,
            run_secs: 1.0,
            pause: true,
        }
    }
}

/// Converter efficiency over a grid of input voltages and load set-points.
///
/// The load is disabled after every sample so one operating point does not bias the next.
#[derive(Debug, Clone, Default)]
pub struct EfficiencySweep {
    config: EfficiencyConfig,
}

impl EfficiencySweep {
    /// Create the procedure with the given settings.
    pub fn new(config: EfficiencyConfig) -> Self {
        Self { config }
    }

    /// The settings in use.
    pub fn config(&self) -> &EfficiencyConfig {
        &self.config
    }

    /// Run the sweep and return one sample per grid point, input voltage major.
    pub fn run<S, L, C, G>(
        &self,
        bench: &mut Bench<S, L>,
        clock: &C,
        gate: &mut G,
    ) -> Result<Vec<EfficiencySample>, BenchError>
    where
        S: InstrumentInterface,
        L: InstrumentInterface,
        C: Clock + ?Sized,
        G: OperatorGate + ?Sized,
    {
        let cfg = &self.config;
        let mode: RegulationMode = cfg.mode.parse()?;

        bench.power_down()?;
        bench
            .source
            .set_current(Current::from_amperes(cfg.current_limit))?;
        bench.load.set_mode(mode, cfg.remote_sense)?;

        let nof_steps = cfg.input_voltages.len();
        let mut samples = Vec::with_capacity(nof_steps * cfg.load_setpoints.len());
        for (idx, &vin) in cfg.input_voltages.iter().enumerate() {
            let sweep_index = idx + 1;
            let vin = Voltage::from_volts(vin);
            gate.confirm(vin)?;

            info!("Sweep {sweep_index}/{nof_steps}: input {vin}");
            bench.source.set_voltage(vin)?;
            bench.source.activate()?;
            clock.sleep(secs(cfg.settle_secs));

            for &setpoint in &cfg.load_setpoints {
                bench.load.set_value(setpoint)?;
                bench.load.activate()?;
                clock.sleep(secs(cfg.run_secs));

                let input_voltage = bench.source.read_voltage()?;
                let input_current = bench.source.read_current()?;
                let output_voltage = bench.load.read_voltage()?;
                let output_current = bench.load.read_current()?;
                bench.load.deactivate()?;

                let sample = EfficiencySample::new(
                    sweep_index,
                    input_voltage,
                    input_current,
                    output_voltage,
                    output_current,
                );
                info!(
                    "Load {setpoint} {}: Pin = {:.3} W, Pout = {:.3} W, efficiency = {:.2} %",
                    mode.unit(),
                    sample.input_power,
                    sample.output_power,
                    sample.efficiency_percent
                );
                samples.push(sample);
            }
        }
        Ok(samples)
    }
}
