//! Operator confirmation between the outer steps of a sweep.

use std::io::{BufRead, Write};

use measurements::Voltage;

use crate::BenchError;

/// Token the operator types to continue a paused sweep.
pub const CONFIRM_TOKEN: &str = "go";

/// Blocks a sweep until the operator allows the next input voltage.
pub trait OperatorGate {
    /// Wait for confirmation that `next_input` may be applied.
    fn confirm(&mut self, next_input: Voltage) -> Result<(), BenchError>;
}

/// A gate that never waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGate;

impl OperatorGate for NoGate {
    fn confirm(&mut self, _next_input: Voltage) -> Result<(), BenchError> {
        Ok(())
    }
}

/// Prompts on `output` and reads lines from `input` until the token is entered.
///
/// The operator uses the pause to adjust the converter, e.g., its duty ratio, for the next
/// input voltage. End of input aborts the sweep.
pub struct PromptGate<R: BufRead, W: Write> {
    input: R,
    output: W,
    token: String,
}

impl<R: BufRead, W: Write> PromptGate<R, W> {
    /// Create a gate waiting for [`CONFIRM_TOKEN`].
    pub fn new(input: R, output: W) -> Self {
        Self::with_token(input, output, CONFIRM_TOKEN)
    }

    /// Create a gate waiting for a custom token.
    pub fn with_token(input: R, output: W, token: &str) -> Self {
        Self {
            input,
            output,
            token: token.to_string(),
        }
    }
}

impl<R: BufRead, W: Write> OperatorGate for PromptGate<R, W> {
    fn confirm(&mut self, next_input: Voltage) -> Result<(), BenchError> {
        writeln!(
            self.output,
            "Input voltage will be set to {:.2} V.",
            next_input.as_volts()
        )?;
        loop {
            write!(
                self.output,
                "Adjust the converter, then type `{}` to proceed: ",
                self.token
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(BenchError::OperatorAborted);
            }
            if line.trim() == self.token {
                return Ok(());
            }
        }
    }
}
