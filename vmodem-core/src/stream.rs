//! Byte-stream contracts the engine is wired to.
//!
//! Both sides are split the same way a PTY master is: the stream itself is
//! the write half (owned by the modem, used under its lock), and `reader()`
//! hands out an independent read half for a background task, so a blocking
//! read never holds the modem lock.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

/// The terminal side: a serial line, a PTY master, or a test double.
pub trait TerminalStream: Write + Send {
    /// An independent read half. Called once, at modem construction.
    fn reader(&mut self) -> io::Result<Box<dyn Read + Send>>;

    /// Close the stream. Must unblock a pending read on the read half.
    fn close(&mut self) -> io::Result<()>;

    /// Device name shown to the user (e.g. `/dev/pts/4`).
    fn name(&self) -> String {
        String::new()
    }

    /// Window-size change. Streams without a window ignore it.
    fn resize(&mut self, _cols: u16, _rows: u16) -> io::Result<()> {
        Ok(())
    }
}

/// The call side, supplied by the outgoing-call capability or an incoming
/// call injection.
pub trait CallStream: Write + Send {
    /// Read half for the carrier pump. Streams that cannot be split return
    /// an error; the call then carries data in one direction only.
    fn reader(&mut self) -> io::Result<Box<dyn Read + Send>>;

    /// Hang up. Must unblock a pending read on the read half.
    fn close(&mut self) -> io::Result<()>;
}

impl CallStream for TcpStream {
    fn reader(&mut self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(self.try_clone()?))
    }

    fn close(&mut self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

impl<T: CallStream + ?Sized> CallStream for Box<T> {
    fn reader(&mut self) -> io::Result<Box<dyn Read + Send>> {
        (**self).reader()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Read errors that mean "nothing yet" rather than "stream gone".
pub(crate) fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
