//! In-memory terminal and call streams for driving a modem from tests.

#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use vmodem_core::{CallStream, Modem, ModemConfig, ModemStatus, TerminalStream};

pub const WAIT: Duration = Duration::from_secs(3);

/// Blocking read half fed by a channel. An empty chunk means EOF.
pub struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    eof: bool,
}

impl ChannelReader {
    fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
            eof: false,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() && !self.eof {
            match self.rx.recv() {
                Ok(chunk) if chunk.is_empty() => self.eof = true,
                Ok(chunk) => self.pending = chunk,
                Err(_) => self.eof = true,
            }
        }
        if self.eof && self.pending.is_empty() {
            return Ok(0);
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// Growable output buffer shared between a stream and the test.
#[derive(Clone, Default)]
pub struct Sink(Arc<Mutex<Vec<u8>>>);

impl Sink {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    fn push(&self, bytes: &[u8]) {
        self.0.lock().unwrap().extend_from_slice(bytes);
    }

    /// Polls until the output contains `needle`.
    pub fn wait_for(&self, needle: &str) -> bool {
        wait_until(|| self.text().contains(needle))
    }
}

pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

pub fn wait_for_status(modem: &Modem, status: ModemStatus) -> bool {
    wait_until(|| modem.status() == status)
}

// ============================================================================
// Terminal
// ============================================================================

pub struct MockTerminal {
    input_tx: Sender<Vec<u8>>,
    input_rx: Option<Receiver<Vec<u8>>>,
    output: Sink,
    closed: Arc<AtomicBool>,
    size: Arc<Mutex<Option<(u16, u16)>>>,
}

/// The test's end of a [`MockTerminal`].
#[derive(Clone)]
pub struct TerminalHandle {
    input_tx: Sender<Vec<u8>>,
    pub output: Sink,
    closed: Arc<AtomicBool>,
    size: Arc<Mutex<Option<(u16, u16)>>>,
}

pub fn terminal() -> (MockTerminal, TerminalHandle) {
    let (input_tx, input_rx) = mpsc::channel();
    let output = Sink::default();
    let closed = Arc::new(AtomicBool::new(false));
    let size = Arc::new(Mutex::new(None));
    let handle = TerminalHandle {
        input_tx: input_tx.clone(),
        output: output.clone(),
        closed: closed.clone(),
        size: size.clone(),
    };
    let term = MockTerminal {
        input_tx,
        input_rx: Some(input_rx),
        output,
        closed,
        size,
    };
    (term, handle)
}

impl Write for MockTerminal {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.output.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl TerminalStream for MockTerminal {
    fn reader(&mut self) -> io::Result<Box<dyn Read + Send>> {
        let rx = self
            .input_rx
            .take()
            .ok_or_else(|| io::Error::other("reader already taken"))?;
        Ok(Box::new(ChannelReader::new(rx)))
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.input_tx.send(Vec::new());
        Ok(())
    }

    fn name(&self) -> String {
        "/dev/mock-tty".to_string()
    }

    fn resize(&mut self, cols: u16, rows: u16) -> io::Result<()> {
        *self.size.lock().unwrap() = Some((cols, rows));
        Ok(())
    }
}

impl TerminalHandle {
    pub fn type_str(&self, text: &str) {
        self.type_bytes(text.as_bytes());
    }

    pub fn type_bytes(&self, bytes: &[u8]) {
        let _ = self.input_tx.send(bytes.to_vec());
    }

    /// Simulates the far end of the terminal going away.
    pub fn hang_up(&self) {
        let _ = self.input_tx.send(Vec::new());
    }

    pub fn text(&self) -> String {
        self.output.text()
    }

    pub fn wait_for(&self, needle: &str) -> bool {
        self.output.wait_for(needle)
    }

    pub fn clear(&self) {
        self.output.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn size(&self) -> Option<(u16, u16)> {
        *self.size.lock().unwrap()
    }
}

// ============================================================================
// Call
// ============================================================================

pub struct MockCall {
    received: Sink,
    remote_tx: Sender<Vec<u8>>,
    remote_rx: Option<Receiver<Vec<u8>>>,
    closed: Arc<AtomicBool>,
}

/// The far end of a [`MockCall`].
#[derive(Clone)]
pub struct CallHandle {
    pub received: Sink,
    remote_tx: Sender<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

pub fn call() -> (MockCall, CallHandle) {
    let (remote_tx, remote_rx) = mpsc::channel();
    let received = Sink::default();
    let closed = Arc::new(AtomicBool::new(false));
    let handle = CallHandle {
        received: received.clone(),
        remote_tx: remote_tx.clone(),
        closed: closed.clone(),
    };
    let stream = MockCall {
        received,
        remote_tx,
        remote_rx: Some(remote_rx),
        closed,
    };
    (stream, handle)
}

impl Write for MockCall {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        self.received.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CallStream for MockCall {
    fn reader(&mut self) -> io::Result<Box<dyn Read + Send>> {
        let rx = self
            .remote_rx
            .take()
            .ok_or_else(|| io::Error::other("reader already taken"))?;
        Ok(Box::new(ChannelReader::new(rx)))
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.remote_tx.send(Vec::new());
        Ok(())
    }
}

impl CallHandle {
    /// Data from the remote side towards the terminal.
    pub fn send(&self, text: &str) {
        let _ = self.remote_tx.send(text.as_bytes().to_vec());
    }

    /// Remote hang-up.
    pub fn hang_up(&self) {
        let _ = self.remote_tx.send(Vec::new());
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> String {
        self.received.text()
    }
}

// ============================================================================
// Modem
// ============================================================================

pub fn modem() -> (Modem, TerminalHandle) {
    let (term, handle) = terminal();
    let modem = Modem::new(ModemConfig::new(term)).expect("modem construction");
    (modem, handle)
}

pub fn modem_with(configure: impl FnOnce(ModemConfig) -> ModemConfig) -> (Modem, TerminalHandle) {
    let (term, handle) = terminal();
    let modem = Modem::new(configure(ModemConfig::new(term))).expect("modem construction");
    (modem, handle)
}

/// Outgoing-call capability that always connects to a fresh [`MockCall`],
/// publishing the far end through the returned receiver.
pub fn connecting_dialer() -> (
    impl Fn(&Modem, &str) -> anyhow::Result<Box<dyn CallStream>> + Send + Sync + 'static,
    Receiver<(String, CallHandle)>,
) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let dialer = move |_: &Modem, number: &str| -> anyhow::Result<Box<dyn CallStream>> {
        let (stream, handle) = call();
        let _ = tx.lock().unwrap().send((number.to_string(), handle));
        Ok(Box::new(stream))
    };
    (dialer, rx)
}
