use benchbus::InstrumentInterface;
use keysight_el34243a::RegulationMode;
use log::{debug, info};
use measurements::{Current, Voltage};
use serde::{Deserialize, Serialize};

use crate::{Bench, BenchError, Clock, LinearRamp, MpptProfile, Phase, sweep::secs};

/// Settings of the MPPT profile replay.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MpptConfig {
    /// Short-circuit current of the emulated panel, in ampere. Profile values scale this.
    pub short_circuit_current: f64,
    /// Open-circuit voltage of the emulated panel, in volt.
    pub open_circuit_voltage: f64,
    /// Regulation mode of the load.
    pub mode: String,
    /// Sense the voltage at the converter terminals instead of at the load.
    pub remote_sense: bool,
    /// Load set-point in the unit of `mode`, held during the whole replay.
    pub load_setpoint: f64,
    /// Source current limit the initial ramp starts from, in ampere.
    pub start_current: f64,
    /// Length of the initial ramp, in seconds.
    pub ramp_secs: f64,
    /// Interval between set-point updates while ramping, in seconds.
    pub poll_secs: f64,
}

impl Default for MpptConfig {
    fn default() -> Self {
        Self {
            short_circuit_current: 5.21,
            open_circuit_voltage: 24.3,
            mode: RegulationMode::Voltage.to_string(),
            remote_sense: true,
            load_setpoint: 12.0,
            start_current: 1.0,
            ramp_secs: 1.0,
            poll_secs: 0.1,
        }
    }
}

/// State after one profile point was reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentReport {
    /// Profile time of the point, in seconds.
    #[serde(rename = "t")]
    pub elapsed_s: f64,
    /// Source current limit at the point, in ampere.
    #[serde(rename = "Iset")]
    pub target_current: f64,
    /// Mean of all output power samples so far, in watt.
    #[serde(rename = "Pavg")]
    pub mean_power: f64,
}

/// Outcome of a replay.
#[derive(Debug, Clone, PartialEq)]
pub struct MpptReport {
    /// One entry per profile point, in profile order.
    pub segments: Vec<SegmentReport>,
    /// Number of output power samples taken.
    pub samples: usize,
}

impl MpptReport {
    /// Mean output power over the whole replay, in watt.
    pub fn mean_power(&self) -> f64 {
        self.segments.last().map_or(0.0, |s| s.mean_power)
    }
}

/// Replays a profile of panel short-circuit currents through the source current limit while
/// the converter under test tracks the maximum-power point.
///
/// Between profile points the current limit follows a linear ramp that is recomputed from the
/// elapsed time at every poll. A point whose time has already passed is applied at once.
#[derive(Debug, Clone, Default)]
pub struct MpptReplay {
    config: MpptConfig,
}

/// Running mean of the output power samples.
#[derive(Debug, Default)]
struct PowerMean {
    sum: f64,
    count: usize,
}

impl PowerMean {
    fn add(&mut self, watts: f64) {
        self.sum += watts;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        self.sum / self.count.max(1) as f64
    }
}

impl MpptReplay {
    /// Create the procedure with the given settings.
    pub fn new(config: MpptConfig) -> Self {
        Self { config }
    }

    /// The settings in use.
    pub fn config(&self) -> &MpptConfig {
        &self.config
    }

    /// Run the replay of `profile`.
    pub fn run<S, L, C>(
        &self,
        bench: &mut Bench<S, L>,
        clock: &C,
        profile: &MpptProfile,
    ) -> Result<MpptReport, BenchError>
    where
        S: InstrumentInterface,
        L: InstrumentInterface,
        C: Clock + ?Sized,
    {
        let cfg = &self.config;
        let mode: RegulationMode = cfg.mode.parse()?;

        bench.power_down()?;
        bench
            .source
            .set_voltage(Voltage::from_volts(cfg.open_circuit_voltage))?;
        bench.source.activate()?;
        bench.load.set_mode(mode, cfg.remote_sense)?;
        bench.load.set_value(cfg.load_setpoint)?;
        bench.load.activate()?;

        let first_target = profile.first().isc * cfg.short_circuit_current;
        info!(
            "Ramping source current to {first_target:.2} A in {:.1} s",
            cfg.ramp_secs
        );
        let start = clock.now();
        let ramp = LinearRamp::new(
            start,
            start + secs(cfg.ramp_secs),
            cfg.start_current,
            first_target,
        );
        loop {
            match ramp.phase_at(clock.now()) {
                Phase::Ramping(value) => {
                    set_source_current(bench, value)?;
                    clock.sleep(secs(cfg.poll_secs));
                }
                Phase::Holding(value) => {
                    set_source_current(bench, value)?;
                    break;
                }
            }
        }

        let t0 = clock.now();
        let mut prev = (t0, first_target);
        let mut power = PowerMean::default();
        let mut segments = Vec::with_capacity(profile.len());
        for point in profile.points() {
            let target = point.isc * cfg.short_circuit_current;
            let t_point = t0.checked_add(point.elapsed()?).ok_or_else(|| {
                BenchError::Profile(format!("point at {} s ends past the clock range", point.t))
            })?;
            info!("Step: {} s, {} -> {target:.2} A", point.t, point.isc);

            if clock.now() >= t_point {
                set_source_current(bench, target)?;
                power.add(bench.load.read_power()?.as_watts());
            } else {
                let ramp = LinearRamp::new(prev.0, t_point, prev.1, target);
                loop {
                    let phase = ramp.phase_at(clock.now());
                    set_source_current(bench, phase.value())?;
                    power.add(bench.load.read_power()?.as_watts());
                    match phase {
                        Phase::Ramping(_) => clock.sleep(secs(cfg.poll_secs)),
                        Phase::Holding(_) => break,
                    }
                }
            }
            prev = (t_point, target);

            let mean_power = power.mean();
            info!("Avg power = {mean_power:.2} W");
            segments.push(SegmentReport {
                elapsed_s: point.t,
                target_current: target,
                mean_power,
            });
        }

        Ok(MpptReport {
            segments,
            samples: power.count,
        })
    }
}

fn set_source_current<S, L>(bench: &mut Bench<S, L>, amperes: f64) -> Result<(), BenchError>
where
    S: InstrumentInterface,
    L: InstrumentInterface,
{
    debug!("Source current limit {amperes:.4} A");
    bench.source.set_current(Current::from_amperes(amperes))?;
    Ok(())
}
