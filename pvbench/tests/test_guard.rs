//! Tests for the shutdown guard.

mod common;

use std::{sync::Arc, thread};

use benchbus::{InstrumentError, LoopbackInterface, Transcript};
use common::*;
use pvbench::*;
use rstest::*;

const SAFE_SEQUENCE: [&str; 4] = ["INP OFF, (@2)", ":VOLT 0", ":CURR 0.1", ":OUTP OFF"];

#[rstest]
fn test_unarmed_does_nothing() {
    let (bench, log) = recorded_bench();
    let guard: ShutdownGuard<LoopbackInterface, LoopbackInterface> = ShutdownGuard::new();

    assert!(!guard.is_armed());
    guard.shutdown(Trigger::Completion).unwrap();
    assert!(drain(&log).is_empty());
    assert!(!bench.is_halted());
}

/// The load is released before the source is zeroed and switched off.
#[rstest]
fn test_safe_sequence_order() {
    let (bench, log) = recorded_bench();
    let guard = ShutdownGuard::new();
    guard.arm(&bench);
    assert!(guard.is_armed());

    guard.shutdown(Trigger::Completion).unwrap();

    assert_eq!(SAFE_SEQUENCE.to_vec(), drain(&log));
    assert!(bench.is_halted());
}

#[rstest]
fn test_idempotent() {
    let (bench, log) = recorded_bench();
    let guard = ShutdownGuard::new();
    guard.arm(&bench);

    guard.shutdown(Trigger::Completion).unwrap();
    guard.safe_state().unwrap();

    let exp: Vec<&str> = SAFE_SEQUENCE.iter().chain(SAFE_SEQUENCE.iter()).copied().collect();
    assert_eq!(exp, drain(&log));
}

/// A load that does not answer does not keep the source energized.
#[rstest]
fn test_failing_step_continues() {
    let log = Transcript::default();
    let bench = bench_with(
        LoopbackInterface::answering(&log, &[]),
        LoopbackInterface::answering(&log, &[]).failing_on("INP OFF, (@2)"),
    );
    let guard = ShutdownGuard::new();
    guard.arm(&bench);

    let result = guard.shutdown(Trigger::Completion);

    assert!(matches!(result, Err(InstrumentError::Io(_))));
    assert_eq!(vec![":VOLT 0", ":CURR 0.1", ":OUTP OFF"], drain(&log));
}

/// After a procedure failed half-way the guard still reaches the sessions it used.
#[rstest]
fn test_shutdown_after_failed_sweep() {
    let log = Transcript::default();
    let mut bench = bench_with(
        LoopbackInterface::answering(&log, &SOURCE_READINGS),
        LoopbackInterface::answering(&log, &LOAD_READINGS).failing_on("MEAS:CURR? (@2)"),
    );
    let guard = ShutdownGuard::new();
    guard.arm(&bench);

    let config = IvSweepConfig {
        voltages: vec![20.0, 10.0],
        ..Default::default()
    };
    let result = IvSweep::new(config).run(&mut bench, &ManualClock::new());
    assert!(result.is_err());
    let log_sweep = drain(&log);
    assert_eq!(Some(&"MEAS:VOLT? (@2)".to_string()), log_sweep.last());

    guard.shutdown(Trigger::Completion).unwrap();
    assert_eq!(SAFE_SEQUENCE.to_vec(), drain(&log));
}

/// The guard can be triggered from another thread, as an interrupt handler does.
#[rstest]
fn test_shutdown_from_other_thread() {
    let (bench, log) = recorded_bench();
    let guard = Arc::new(ShutdownGuard::new());
    guard.arm(&bench);

    let handler_guard = Arc::clone(&guard);
    thread::spawn(move || handler_guard.safe_state())
        .join()
        .unwrap()
        .unwrap();

    assert_eq!(SAFE_SEQUENCE.to_vec(), drain(&log));
}

/// A sweep still running on another thread sends nothing once the safe-state sequence started,
/// and gives up with the refused command.
#[rstest]
fn test_running_sweep_silenced() {
    let (bench, log) = recorded_bench();
    let guard = ShutdownGuard::new();
    guard.arm(&bench);

    let mut sweep_bench = bench.clone();
    let sweep = thread::spawn(move || {
        let clock = ManualClock::new();
        let iv = IvSweep::new(IvSweepConfig {
            voltages: vec![20.0, 10.0],
            ..Default::default()
        });
        loop {
            if let Err(err) = iv.run(&mut sweep_bench, &clock) {
                return err;
            }
        }
    });
    while log.lock().unwrap().len() < 100 {
        thread::yield_now();
    }

    guard.safe_state().unwrap();
    let err = sweep.join().unwrap();

    assert!(matches!(
        err,
        BenchError::Instrument(InstrumentError::Interlocked)
    ));
    let log = drain(&log);
    assert_eq!(SAFE_SEQUENCE.to_vec(), log[log.len() - SAFE_SEQUENCE.len()..]);
}

/// Once halted, the bench refuses commands from every thread but the one that shut it down.
#[rstest]
fn test_halted_bench_refuses_other_threads() {
    let (bench, log) = recorded_bench();
    let guard = ShutdownGuard::new();
    guard.arm(&bench);
    guard.safe_state().unwrap();
    drain(&log);

    let mut late = bench.clone();
    let result = thread::spawn(move || late.source.activate())
        .join()
        .unwrap();

    assert!(matches!(result, Err(InstrumentError::Interlocked)));
    assert!(drain(&log).is_empty());
}

/// An interrupt runs the safe-state sequence and asks for the interrupt exit status.
#[rstest]
fn test_interrupt_armed() {
    let (bench, log) = recorded_bench();
    let guard = ShutdownGuard::new();
    guard.arm(&bench);

    assert_eq!(INTERRUPT_EXIT_CODE, guard.interrupt_status());
    assert_eq!(SAFE_SEQUENCE.to_vec(), drain(&log));
    assert!(bench.is_halted());
}

/// An interrupt before the instruments are connected touches no device and still terminates.
#[rstest]
fn test_interrupt_before_arming() {
    let (bench, log) = recorded_bench();
    let guard: ShutdownGuard<LoopbackInterface, LoopbackInterface> = ShutdownGuard::new();

    assert_eq!(130, guard.interrupt_status());
    assert!(drain(&log).is_empty());
    assert!(!bench.is_halted());
}

/// A failing step during an interrupt does not change the exit status.
#[rstest]
fn test_interrupt_with_failing_step() {
    let log = Transcript::default();
    let bench = bench_with(
        LoopbackInterface::answering(&log, &[]).failing_on(":VOLT 0"),
        LoopbackInterface::answering(&log, &[]),
    );
    let guard = ShutdownGuard::new();
    guard.arm(&bench);

    assert_eq!(INTERRUPT_EXIT_CODE, guard.interrupt_status());
    assert_eq!(vec!["INP OFF, (@2)", ":CURR 0.1", ":OUTP OFF"], drain(&log));
}
