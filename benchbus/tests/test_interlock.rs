//! Tests for sessions sharing an interlock.

use std::{sync::Arc, thread};

use rstest::*;

use benchbus::{
    InstrumentError, InstrumentInterface, Interlock, Interlocked, LoopbackInterface, Transcript,
};

/// A session on an instrument answering one query, recording into `transcript`.
fn recorded(transcript: &Transcript, interlock: &Arc<Interlock>) -> Interlocked<LoopbackInterface> {
    Interlocked::new(
        LoopbackInterface::answering(transcript, &[(":MEAS:VOLT?", "+1.8E+01")]),
        interlock,
    )
}

#[rstest]
fn disengaged_passes_writes() {
    let transcript = Transcript::default();
    let interlock = Interlock::new();
    let mut session = recorded(&transcript, &interlock);

    assert!(!interlock.is_engaged());
    session.sendcmd(":OUTP ON").unwrap();
    assert_eq!("+1.8E+01", session.query(":MEAS:VOLT?").unwrap());
    assert_eq!(vec![":OUTP ON", ":MEAS:VOLT?"], *transcript.lock().unwrap());
}

/// Once another thread engaged the interlock, none of the sessions sharing it write anymore.
#[rstest]
fn engaged_elsewhere_refuses_writes() {
    let transcript = Transcript::default();
    let interlock = Interlock::new();
    let mut source = recorded(&transcript, &interlock);
    let mut load = recorded(&transcript, &interlock);

    let other = interlock.clone();
    thread::spawn(move || other.engage()).join().unwrap();

    assert!(interlock.is_engaged());
    assert!(matches!(
        source.sendcmd(":OUTP ON"),
        Err(InstrumentError::Interlocked)
    ));
    assert!(matches!(
        load.query(":MEAS:VOLT?"),
        Err(InstrumentError::Interlocked)
    ));
    assert!(transcript.lock().unwrap().is_empty());
}

/// The engaging thread keeps writing, from any session.
#[rstest]
fn engaging_thread_writes() {
    let transcript = Transcript::default();
    let interlock = Interlock::new();
    let session = recorded(&transcript, &interlock);

    let engaged = interlock.clone();
    thread::spawn(move || {
        let mut session = session;
        engaged.engage();
        session.sendcmd("INP OFF, (@2)").unwrap();
        session.sendcmd(":OUTP OFF").unwrap();
    })
    .join()
    .unwrap();

    assert_eq!(vec!["INP OFF, (@2)", ":OUTP OFF"], *transcript.lock().unwrap());
}

#[rstest]
fn terminator_passes_through() {
    let transcript = Transcript::default();
    let mut session = recorded(&transcript, &Interlock::new());
    session.set_terminator("\r\n");
    assert_eq!("\r\n", session.get_terminator());
}
