//! Reserving a group of instrument sessions for a single thread.

use std::{
    sync::{Arc, Mutex},
    thread::{self, ThreadId},
    time::Duration,
};

use log::debug;

use crate::{InstrumentError, InstrumentInterface};

/// Shared by all [`Interlocked`] sessions of one setup.
///
/// While disengaged, every thread may write. Once engaged, only the thread that engaged it may
/// write to the sessions, writes from any other thread fail with
/// [`InstrumentError::Interlocked`]. A write that is in progress when another thread engages the
/// interlock finishes first. The interlock is never released.
#[derive(Debug, Default)]
pub struct Interlock {
    owner: Mutex<Option<ThreadId>>,
}

impl Interlock {
    /// Create a disengaged interlock to share between sessions.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reserve the sessions for the calling thread.
    ///
    /// Engaging again, from any thread, moves the reservation to the caller.
    pub fn engage(&self) {
        let mut owner = self.owner.lock().expect("Mutex should not be poisoned");
        *owner = Some(thread::current().id());
    }

    /// Whether any thread engaged the interlock.
    pub fn is_engaged(&self) -> bool {
        self.owner
            .lock()
            .expect("Mutex should not be poisoned")
            .is_some()
    }

    /// Run `write` unless another thread holds the reservation. The check and the write happen
    /// under the same lock.
    fn permit<F>(&self, write: F) -> Result<(), InstrumentError>
    where
        F: FnOnce() -> Result<(), InstrumentError>,
    {
        let owner = self.owner.lock().expect("Mutex should not be poisoned");
        match *owner {
            Some(id) if id != thread::current().id() => {
                debug!("Write refused, interlock engaged by {id:?}");
                Err(InstrumentError::Interlocked)
            }
            _ => write(),
        }
    }
}

/// A session whose writes pass through an [`Interlock`].
///
/// Reads are never refused, so a query sent before the interlock was engaged still receives its
/// response.
///
/// ```
/// use std::thread;
/// use benchbus::{InstrumentError, InstrumentInterface, Interlock, Interlocked, LoopbackInterface};
///
/// let interlock = Interlock::new();
/// let lbk = LoopbackInterface::new(vec![":OUTP OFF".to_string()], vec![], "\n");
/// let mut session = Interlocked::new(lbk, &interlock);
///
/// let engaged = interlock.clone();
/// thread::spawn(move || engaged.engage()).join().unwrap();
/// assert!(matches!(session.sendcmd(":OUTP ON"), Err(InstrumentError::Interlocked)));
///
/// interlock.engage();
/// session.sendcmd(":OUTP OFF").unwrap();
/// ```
#[derive(Debug)]
pub struct Interlocked<T: InstrumentInterface> {
    inner: T,
    interlock: Arc<Interlock>,
}

impl<T: InstrumentInterface> Interlocked<T> {
    /// Wrap `inner` so that its writes pass through `interlock`.
    pub fn new(inner: T, interlock: &Arc<Interlock>) -> Self {
        Self {
            inner,
            interlock: Arc::clone(interlock),
        }
    }
}

impl<T: InstrumentInterface> InstrumentInterface for Interlocked<T> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError> {
        self.inner.read_exact(buf)
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), InstrumentError> {
        let inner = &mut self.inner;
        self.interlock.permit(|| inner.write_raw(data))
    }

    fn get_terminator(&self) -> &str {
        self.inner.get_terminator()
    }

    fn set_terminator(&mut self, terminator: &str) {
        self.inner.set_terminator(terminator);
    }

    fn get_timeout(&self) -> Duration {
        self.inner.get_timeout()
    }
}
