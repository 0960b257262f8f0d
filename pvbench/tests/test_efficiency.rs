//! Tests for the efficiency sweep.

mod common;

use std::time::Duration;

use benchbus::{LoopbackInterface, Transcript};

use common::*;
use measurements::Voltage;
use pvbench::*;
use rstest::*;

/// Two input voltages times two load currents (50 W and 62.5 W at 12 V).
#[fixture]
fn small_grid() -> EfficiencyConfig {
    EfficiencyConfig {
        input_voltages: vec![16.0, 18.0],
        load_setpoints: vec![4.17, 5.21],
        pause: false,
        ..Default::default()
    }
}

/// Gate remembering which voltages it was asked about.
#[derive(Default)]
struct CountingGate {
    asked: Vec<f64>,
}

impl OperatorGate for CountingGate {
    fn confirm(&mut self, next_input: Voltage) -> Result<(), BenchError> {
        self.asked.push(next_input.as_volts());
        Ok(())
    }
}

/// Gate declining every request.
struct ClosedGate;

impl OperatorGate for ClosedGate {
    fn confirm(&mut self, _next_input: Voltage) -> Result<(), BenchError> {
        Err(BenchError::OperatorAborted)
    }
}

#[rstest]
fn test_grid_yields_indexed_samples(small_grid: EfficiencyConfig) {
    let (mut bench, _log) = recorded_bench();
    let clock = ManualClock::new();

    let samples = EfficiencySweep::new(small_grid)
        .run(&mut bench, &clock, &mut NoGate)
        .unwrap();

    assert_eq!(4, samples.len());
    let indices: Vec<usize> = samples.iter().map(|s| s.sweep_index).collect();
    assert_eq!(vec![1, 1, 2, 2], indices);

    let sample = samples[0];
    assert_eq!(18.0, sample.input_voltage);
    assert_eq!(2.5, sample.input_current);
    assert!((sample.input_power - 45.0).abs() < 1e-9);
    assert!((sample.output_power - 42.0).abs() < 1e-9);
    assert!((sample.efficiency_percent - 42.0 / 45.0 * 100.0).abs() < 1e-9);

    // Settle once per input voltage, run once per sample.
    assert_eq!(Duration::from_secs(2 + 4), clock.now());
}

#[rstest]
fn test_command_sequence(small_grid: EfficiencyConfig) {
    let (mut bench, log) = recorded_bench();
    let mut config = small_grid;
    config.input_voltages = vec![16.0];
    config.load_setpoints = vec![4.17];

    EfficiencySweep::new(config)
        .run(&mut bench, &ManualClock::new(), &mut NoGate)
        .unwrap();

    let exp = vec![
        ":OUTP OFF",
        "INP OFF, (@2)",
        ":CURR 12",
        "FUNC CURR, (@2)",
        "VOLT:SENS:SOUR EXT, (@2)",
        ":VOLT 16",
        ":OUTP ON",
        "CURR 4.17, (@2)",
        "INP ON, (@2)",
        ":MEAS:VOLT?",
        ":MEAS:CURR?",
        "MEAS:VOLT? (@2)",
        "MEAS:CURR? (@2)",
        "INP OFF, (@2)",
    ];
    assert_eq!(exp, drain(&log));
}

#[rstest]
fn test_gate_asked_before_each_input_voltage(small_grid: EfficiencyConfig) {
    let (mut bench, _log) = recorded_bench();
    let mut gate = CountingGate::default();

    EfficiencySweep::new(small_grid)
        .run(&mut bench, &ManualClock::new(), &mut gate)
        .unwrap();

    assert_eq!(vec![16.0, 18.0], gate.asked);
}

#[rstest]
fn test_gate_abort_stops_before_source_on(small_grid: EfficiencyConfig) {
    let (mut bench, log) = recorded_bench();

    let result = EfficiencySweep::new(small_grid).run(&mut bench, &ManualClock::new(), &mut ClosedGate);

    assert!(matches!(result, Err(BenchError::OperatorAborted)));
    assert!(!drain(&log).iter().any(|cmd| cmd == ":OUTP ON"));
}

/// A source reading no input power yields the undefined efficiency instead of a division by zero.
#[rstest]
fn test_zero_input_power(small_grid: EfficiencyConfig) {
    let log = Transcript::default();
    let mut bench = bench_with(
        LoopbackInterface::answering(&log, &[(":MEAS:VOLT?", "0.0"), (":MEAS:CURR?", "0.0")]),
        LoopbackInterface::answering(&log, &LOAD_READINGS),
    );

    let samples = EfficiencySweep::new(small_grid)
        .run(&mut bench, &ManualClock::new(), &mut NoGate)
        .unwrap();

    assert!(samples
        .iter()
        .all(|s| s.efficiency_percent == EFFICIENCY_UNDEFINED && s.efficiency().is_none()));
}

#[rstest]
fn test_invalid_mode_sends_nothing(small_grid: EfficiencyConfig) {
    let (mut bench, log) = recorded_bench();
    let mut config = small_grid;
    config.mode = "CC".to_string();

    let result = EfficiencySweep::new(config).run(&mut bench, &ManualClock::new(), &mut NoGate);

    assert!(matches!(
        result,
        Err(BenchError::Instrument(
            benchbus::InstrumentError::InvalidArgument(_)
        ))
    ));
    assert!(drain(&log).is_empty());
}

#[rstest]
fn test_samples_to_csv(small_grid: EfficiencyConfig) {
    let (mut bench, _log) = recorded_bench();
    let samples = EfficiencySweep::new(small_grid)
        .run(&mut bench, &ManualClock::new(), &mut NoGate)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("effsweep.csv");
    write_csv_file(&path, &samples).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(Some("Sweep,Vin,Iin,Pin,Vout,Iout,Pout,Eff"), lines.next());
    assert_eq!(4, lines.count());
}
