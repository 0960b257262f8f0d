//! Simulated instruments for testing drivers and the procedures built on them.
//!
//! A [`LoopbackInterface`] either follows a strict script of the exact exchange with the host, or
//! answers queries from a table while recording every command it receives. The first is meant
//! for driver tests, the second for procedures where only the resulting command sequence across
//! several instruments matters.

use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::{Arc, Mutex},
};

use crate::{InstrumentError, InstrumentInterface};

/// Commands received by one or several loopback instruments, in the order they arrived and
/// without terminators.
pub type Transcript = Arc<Mutex<Vec<String>>>;

/// How the instrument reacts to the host.
enum Script {
    /// Every command must match the next expected one, responses are handed out in order.
    Exact {
        commands: VecDeque<String>,
        responses: VecDeque<String>,
    },
    /// Any command is accepted. Queries found in the table are answered, the last answer of a
    /// sequence repeats.
    Answering {
        answers: HashMap<String, VecDeque<String>>,
    },
}

/// An interface that allows you to simply write tests for your instrument driver.
///
/// # Example
///
/// Let us build a simple instrument that sends a `"*IDN?"` command and gets back a string, then
/// write a test for it using the [`LoopbackInterface`].
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use benchbus::{InstrumentInterface, InstrumentError, LoopbackInterface};
///
/// struct MyInstrument<T: InstrumentInterface> {
///    interface: Arc<Mutex<T>>,
/// }
///
/// impl<T: InstrumentInterface> MyInstrument<T> {
///    fn new(interface: T) -> Self {
///        let interface = Arc::new(Mutex::new(interface));
///        MyInstrument { interface }
///    }
///
///    fn get_name(&mut self) -> Result<String, InstrumentError> {
///        self.interface.lock().unwrap().query("*IDN?")
///    }
/// }
///
/// let host2inst = vec!["*IDN?".to_string()];
/// let inst2host = vec!["Keysight Technologies,N5769A,US12345678,B.01.02".to_string()];
/// let loopback = LoopbackInterface::new(host2inst, inst2host, "\n");
///
/// let mut inst = MyInstrument::new(loopback);
/// assert!(inst.get_name().unwrap().contains("N5769A"));
/// ```
///
/// Two instruments recording into one transcript:
///
/// ```
/// use benchbus::{InstrumentInterface, LoopbackInterface, Transcript};
///
/// let transcript = Transcript::default();
/// let mut source = LoopbackInterface::answering(&transcript, &[(":MEAS:VOLT?", "18.0")]);
/// let mut load = LoopbackInterface::answering(&transcript, &[]);
///
/// load.sendcmd("INP ON, (@2)").unwrap();
/// assert_eq!("18.0", source.query(":MEAS:VOLT?").unwrap());
/// assert_eq!(
///     vec!["INP ON, (@2)", ":MEAS:VOLT?"],
///     *transcript.lock().unwrap()
/// );
/// ```
pub struct LoopbackInterface {
    script: Script,
    transcript: Option<Transcript>,
    failing: Option<String>,
    terminator_exp: String,
    terminator: String,
    pending: VecDeque<u8>,
}

impl LoopbackInterface {
    /// Create a new loopback instrument with given commands to and from instrument.
    ///
    /// The commands are consumed in order. Whenever something is sent to the instrument that is
    /// not expected, the [`LoopbackInterface`] panics. When it is dropped, `finalize` checks
    /// that all commands have been used and panics otherwise.
    ///
    /// # Arguments:
    /// * `from_host` - Commands from host to instrument.
    /// * `from_inst` - Commands from instrument to host.
    /// * `terminator_exp` - The expected terminator, appended to every scripted command.
    pub fn new(from_host: Vec<String>, from_inst: Vec<String>, terminator_exp: &str) -> Self {
        Self::with_script(
            Script::Exact {
                commands: from_host.into(),
                responses: from_inst.into(),
            },
            None,
            terminator_exp,
        )
    }

    /// Create a loopback instrument that accepts any command and records it into `transcript`.
    ///
    /// Each `(query, response)` pair answers `query` with `response` every time it is asked.
    /// Reading without a pending response fails with an [`io::ErrorKind::UnexpectedEof`] error.
    pub fn answering(transcript: &Transcript, answers: &[(&str, &str)]) -> Self {
        let answers = answers
            .iter()
            .map(|(q, r)| (q.to_string(), VecDeque::from([r.to_string()])))
            .collect();
        Self::with_script(
            Script::Answering { answers },
            Some(Arc::clone(transcript)),
            "\n",
        )
    }

    fn with_script(script: Script, transcript: Option<Transcript>, terminator_exp: &str) -> Self {
        Self {
            script,
            transcript,
            failing: None,
            terminator_exp: terminator_exp.to_string(),
            terminator: "\n".to_string(),
            pending: VecDeque::new(),
        }
    }

    /// Answer `query` with `responses` in turn, repeating the last one.
    ///
    /// Only answering instruments use the table, a scripted instrument ignores it.
    pub fn answer_sequence(mut self, query: &str, responses: &[&str]) -> Self {
        if let Script::Answering { answers } = &mut self.script {
            answers.insert(
                query.to_string(),
                responses.iter().map(|r| r.to_string()).collect(),
            );
        }
        self
    }

    /// Fail every write of `cmd` with an [`io::ErrorKind::BrokenPipe`] error, as if the
    /// instrument went away. The command is neither checked against the script nor recorded.
    pub fn failing_on(mut self, cmd: &str) -> Self {
        self.failing = Some(cmd.to_string());
        self
    }

    /// This command panics if a scripted instrument has commands left that were not exchanged.
    ///
    /// It is automatically called when the [`LoopbackInterface`] is dropped, but you can also
    /// call it manually to ensure that all commands have been used.
    pub fn finalize(&mut self) {
        if let Script::Exact {
            commands,
            responses,
        } = &self.script
        {
            if let Some(cmd) = commands.front() {
                panic!("Leftover expected commands found from host to instrument: {cmd}");
            }
            if let Some(resp) = responses.front() {
                panic!("Leftover expected commands found from instrument to host: {resp}");
            }
        }
    }

    /// Queue the response to `cmd` of an answering instrument.
    fn queue_answer(&mut self, cmd: &str) {
        let Script::Answering { answers } = &mut self.script else {
            return;
        };
        let response = match answers.get_mut(cmd) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        if let Some(response) = response {
            self.pending
                .extend(format!("{response}{}", self.terminator_exp).bytes());
        }
    }

    /// Next byte to the host. A scripted instrument moves on to its next response once the
    /// current one is used up, which just panics if there is none.
    fn read_one_byte(&mut self) -> Result<u8, InstrumentError> {
        if self.pending.is_empty() {
            match &mut self.script {
                Script::Exact { responses, .. } => {
                    let resp = responses
                        .pop_front()
                        .expect("No more commands were expected from instrument to host.");
                    self.pending
                        .extend(format!("{resp}{}", self.terminator_exp).bytes());
                }
                Script::Answering { .. } => {
                    return Err(InstrumentError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "no response queued",
                    )));
                }
            }
        }
        self.pending.pop_front().ok_or_else(|| {
            InstrumentError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "empty response scripted",
            ))
        })
    }
}

impl InstrumentInterface for LoopbackInterface {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError> {
        for byte in buf.iter_mut() {
            *byte = self.read_one_byte()?;
        }
        Ok(())
    }

    fn get_terminator(&self) -> &str {
        self.terminator.as_str()
    }

    fn set_terminator(&mut self, terminator: &str) {
        self.terminator = terminator.to_string();
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), InstrumentError> {
        let text = String::from_utf8_lossy(data);
        let cmd = text
            .strip_suffix(self.terminator_exp.as_str())
            .unwrap_or(&text)
            .to_string();
        if self.failing.as_deref() == Some(cmd.as_str()) {
            return Err(InstrumentError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "instrument gone",
            )));
        }

        if let Script::Exact { commands, .. } = &mut self.script {
            let exp = commands
                .pop_front()
                .expect("No more commands were expected from host to instrument.");
            assert_eq!(
                format!("{exp}{}", self.terminator_exp).as_bytes(),
                data,
                "Expected sendcmd '{exp}', got '{:?}'",
                std::str::from_utf8(data)
            );
        } else {
            self.queue_answer(&cmd);
        }

        if let Some(transcript) = &self.transcript {
            transcript
                .lock()
                .expect("Mutex should not be poisoned")
                .push(cmd);
        }
        Ok(())
    }
}

impl Drop for LoopbackInterface {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            self.finalize();
        }
    }
}
