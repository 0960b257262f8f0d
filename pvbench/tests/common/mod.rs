//! Simulated bench instruments for the procedure tests.

#![allow(dead_code)]

use benchbus::{LoopbackInterface, Transcript};
use pvbench::Bench;

/// The bench the procedure tests run on.
pub type TestBench = Bench<LoopbackInterface, LoopbackInterface>;

/// Readings of the simulated bench.
pub const SOURCE_READINGS: [(&str, &str); 2] = [(":MEAS:VOLT?", "18.0"), (":MEAS:CURR?", "2.5")];
pub const LOAD_READINGS: [(&str, &str); 3] = [
    ("MEAS:VOLT? (@2)", "12.0"),
    ("MEAS:CURR? (@2)", "3.5"),
    ("MEAS:POW? (@2)", "42.0"),
];

/// A bench on load channel 2.
pub fn bench_with(source: LoopbackInterface, load: LoopbackInterface) -> TestBench {
    Bench::new(source, load, 2).unwrap()
}

/// A bench answering with [`SOURCE_READINGS`] and [`LOAD_READINGS`], both instruments recording
/// into the returned transcript.
pub fn recorded_bench() -> (TestBench, Transcript) {
    let log = Transcript::default();
    let bench = bench_with(
        LoopbackInterface::answering(&log, &SOURCE_READINGS),
        LoopbackInterface::answering(&log, &LOAD_READINGS),
    );
    (bench, log)
}

/// Take all commands logged so far.
pub fn drain(log: &Transcript) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}
