//! Dialing through a local program.
//!
//! `ATD<number>` spawns the configured program with the number appended to
//! its arguments (and in `VMODEM_NUMBER`). The program's stdin/stdout become
//! the call: whatever it prints goes to the terminal, whatever the terminal
//! types goes to it. The program exiting is a remote hang-up.

use anyhow::{Context, Result};
use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use vmodem_core::{CallStream, Modem};

pub const NUMBER_ENV: &str = "VMODEM_NUMBER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl DialCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Starts the program for one call. No shell is involved, so the number
    /// is passed through verbatim.
    pub fn spawn(&self, number: &str) -> Result<ProcessCall> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(number)
            .env(NUMBER_ENV, number)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn dial program {}", self.program))?;

        let stdin = child.stdin.take().context("Dial program has no stdin")?;
        let stdout = child.stdout.take().context("Dial program has no stdout")?;
        tracing::info!(program = %self.program, pid = child.id(), "dial program started");

        Ok(ProcessCall {
            child,
            stdin: Some(stdin),
            stdout: Some(stdout),
        })
    }

    /// The outgoing-call capability for `ModemConfig::with_outgoing_call`.
    pub fn into_outgoing_call(
        self,
    ) -> impl Fn(&Modem, &str) -> Result<Box<dyn CallStream>> + Send + Sync + 'static {
        move |_: &Modem, number: &str| -> Result<Box<dyn CallStream>> {
            Ok(Box::new(self.spawn(number)?))
        }
    }
}

/// A running dial program, as a call stream.
#[derive(Debug)]
pub struct ProcessCall {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
}

impl ProcessCall {
    /// True while the program has not exited.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Write for ProcessCall {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.stdin.as_mut() {
            Some(stdin) => stdin.write(buf),
            None => Err(io::ErrorKind::BrokenPipe.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stdin.as_mut() {
            Some(stdin) => stdin.flush(),
            None => Ok(()),
        }
    }
}

impl CallStream for ProcessCall {
    fn reader(&mut self) -> io::Result<Box<dyn Read + Send>> {
        let stdout = self
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("dial program stdout already taken"))?;
        Ok(Box::new(stdout))
    }

    /// Hangs up: closes the program's stdin and kills it.
    fn close(&mut self) -> io::Result<()> {
        self.stdin = None;
        if let Err(e) = self.child.kill() {
            // already exited and reaped
            if e.kind() != io::ErrorKind::InvalidInput {
                return Err(e);
            }
        }
        let status = self.child.wait()?;
        tracing::info!(pid = self.child.id(), %status, "dial program ended");
        Ok(())
    }
}
