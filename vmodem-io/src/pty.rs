use anyhow::{Context, Result};
use portable_pty::{MasterPty, NativePtySystem, PtySize, PtySystem, SlavePty};
use std::io::{self, Read, Write};
use vmodem_core::TerminalStream;

/// Window size of a freshly opened pseudo-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtyConfig {
    pub cols: u16,
    pub rows: u16,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

impl PtyConfig {
    fn size(self) -> PtySize {
        PtySize {
            rows: self.rows,
            cols: self.cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

/// The master side of a pseudo-terminal pair. Terminal software opens the
/// slave ([`PtyTerminal::name`]) and talks to the modem through it.
pub struct PtyTerminal {
    master: Box<dyn MasterPty + Send>,
    /// Held open so the master does not see a hang-up before a client
    /// attaches.
    slave: Option<Box<dyn SlavePty + Send>>,
    writer: Option<Box<dyn Write + Send>>,
    name: String,
}

impl std::fmt::Debug for PtyTerminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyTerminal")
            .field("name", &self.name)
            .field("open", &self.writer.is_some())
            .finish()
    }
}

impl PtyTerminal {
    pub fn open(config: PtyConfig) -> Result<Self> {
        let pty_system = NativePtySystem::default();
        let pair = pty_system
            .openpty(config.size())
            .context("Failed to open PTY")?;

        let writer = pair
            .master
            .take_writer()
            .context("Failed to take PTY writer")?;

        let name = slave_name(pair.master.as_ref());
        tracing::debug!(name = %name, cols = config.cols, rows = config.rows, "pty opened");

        Ok(Self {
            master: pair.master,
            slave: Some(pair.slave),
            writer: Some(writer),
            name,
        })
    }
}

#[cfg(unix)]
fn slave_name(master: &(dyn MasterPty + Send)) -> String {
    master
        .tty_name()
        .map(|path| path.display().to_string())
        .unwrap_or_default()
}

#[cfg(not(unix))]
fn slave_name(_master: &(dyn MasterPty + Send)) -> String {
    String::new()
}

fn pty_error(e: impl std::fmt::Display) -> io::Error {
    io::Error::other(e.to_string())
}

impl Write for PtyTerminal {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::ErrorKind::BrokenPipe.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl TerminalStream for PtyTerminal {
    fn reader(&mut self) -> io::Result<Box<dyn Read + Send>> {
        self.master.try_clone_reader().map_err(pty_error)
    }

    fn close(&mut self) -> io::Result<()> {
        self.writer = None;
        self.slave = None;
        tracing::debug!(name = %self.name, "pty closed");
        Ok(())
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn resize(&mut self, cols: u16, rows: u16) -> io::Result<()> {
        self.master
            .resize(PtyConfig { cols, rows }.size())
            .map_err(pty_error)
    }
}
