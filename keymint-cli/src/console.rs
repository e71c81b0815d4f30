//! Line-oriented prompts and output for interactive commands.

use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::{Context, Result};

/// Input and output streams of one CLI run.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Writer for command output.
    pub fn out(&mut self) -> &mut W {
        &mut self.output
    }

    /// Asks for a line of input and returns it trimmed. End of input reads
    /// as an empty answer.
    pub fn ask(&mut self, label: &str) -> Result<String> {
        write!(self.output, "{label}: ")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input
            .read_line(&mut line)
            .with_context(|| format!("Failed to read {label}"))?;
        Ok(line.trim().to_string())
    }

    /// Like [`ask`](Self::ask), mapping a blank answer to `None`.
    pub fn ask_optional(&mut self, label: &str) -> Result<Option<String>> {
        let answer = self.ask(label)?;
        Ok((!answer.is_empty()).then_some(answer))
    }

    /// Asks for an optional value parsed from the answer.
    pub fn ask_parsed<T>(&mut self, label: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.ask_optional(label)?
            .map(|answer| {
                answer
                    .parse()
                    .with_context(|| format!("Invalid {label}: {answer:?}"))
            })
            .transpose()
    }
}
