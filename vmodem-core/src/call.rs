//! Call manager: outgoing dial attempts, incoming call injection, and the
//! carrier pump that carries call data back to the terminal.

use crate::engine::{Modem, ModemGuard, OutgoingCall};
use crate::error::{ModemError, Result};
use crate::state_machine::ModemStatus;
use crate::stream::{is_transient, CallStream};
use std::io::{Read, Write};
use std::thread;
use tokio_util::sync::CancellationToken;

/// The active call. `carrier` is cancelled the moment the modem lets go of
/// the stream, so a pump still draining it never touches a newer call.
pub(crate) struct Connection {
    pub(crate) stream: Box<dyn CallStream>,
    carrier: CancellationToken,
}

impl Connection {
    fn hang_up(mut self) {
        self.carrier.cancel();
        if let Err(e) = self.stream.close() {
            tracing::warn!("failed to close call stream: {}", e);
        }
    }
}

fn discard(mut stream: Box<dyn CallStream>) {
    if let Err(e) = stream.close() {
        tracing::warn!("failed to close discarded call stream: {}", e);
    }
}

impl ModemGuard<'_> {
    /// Offers an incoming call. Only an idle modem can take it; otherwise
    /// the stream is closed and [`ModemError::Busy`] returned.
    pub fn incoming_call<S: CallStream + 'static>(&mut self, stream: S) -> Result<()> {
        let stream: Box<dyn CallStream> = Box::new(stream);
        match self.status() {
            ModemStatus::Idle => {}
            ModemStatus::Closed => {
                discard(stream);
                return Err(ModemError::Closed);
            }
            other => {
                tracing::info!(status = %other, "incoming call rejected, modem busy");
                discard(stream);
                return Err(ModemError::Busy);
            }
        }

        self.enter_with_call(ModemStatus::Ringing, stream)
    }

    /// Dial succeeded: go online with `stream`.
    fn connect_call(&mut self, stream: Box<dyn CallStream>) -> Result<()> {
        self.enter_with_call(ModemStatus::Connected, stream)
    }

    /// Attaches `stream` and enters `next`; the call is dropped if the
    /// transition fails.
    fn enter_with_call(&mut self, next: ModemStatus, stream: Box<dyn CallStream>) -> Result<()> {
        self.attach_connection(stream);
        if let Err(e) = self.set_status(next) {
            self.drop_connection();
            return Err(e);
        }
        Ok(())
    }

    fn attach_connection(&mut self, mut stream: Box<dyn CallStream>) {
        let carrier = self.modem.shared.lifetime.child_token();
        match stream.reader() {
            Ok(reader) => spawn_carrier_pump(self.modem.clone(), reader, carrier.clone()),
            Err(e) => tracing::debug!("call stream has no read half, carrier pump disabled: {}", e),
        }
        self.state.connection = Some(Connection { stream, carrier });
    }

    pub(crate) fn drop_connection(&mut self) {
        if let Some(connection) = self.state.connection.take() {
            connection.hang_up();
        }
    }

    /// Starts the dial task. Must be called right after entering Dialing:
    /// the task is bound to the status token of that transition.
    pub(crate) fn start_dial(&mut self, outgoing: OutgoingCall, number: String) {
        let token = self.state.status_token.clone();
        let modem = self.modem.clone();

        let spawned = thread::Builder::new()
            .name("vmodem-dial".into())
            .spawn(move || dial(modem, outgoing, token, number));

        if let Err(e) = spawned {
            tracing::error!("failed to spawn dial task: {}", e);
            if let Err(e) = self.set_status(ModemStatus::Idle) {
                tracing::error!("fatal modem error while abandoning dial: {}", e);
            }
        }
    }

    /// Online-mode byte from the terminal.
    pub(crate) fn forward_to_call(&mut self, bytes: &[u8]) {
        let Some(connection) = self.state.connection.as_mut() else {
            return;
        };
        let sent = connection
            .stream
            .write_all(bytes)
            .and_then(|()| connection.stream.flush());
        if let Err(e) = sent {
            tracing::warn!("call stream write failed: {}", e);
        }
    }
}

fn dial(modem: Modem, outgoing: OutgoingCall, token: CancellationToken, number: String) {
    if token.is_cancelled() {
        return;
    }

    tracing::info!(number = %number, "dialing");
    let outcome = outgoing(&modem, &number);

    let mut guard = modem.lock();
    if token.is_cancelled() {
        // the modem left Dialing while we were out; the call is stale
        if let Ok(stream) = outcome {
            tracing::debug!(number = %number, "dial superseded, dropping call stream");
            discard(stream);
        }
        return;
    }

    let result = match outcome {
        Ok(stream) => guard.connect_call(stream),
        Err(e) => {
            tracing::info!(number = %number, "dial failed: {:#}", e);
            guard.set_status(ModemStatus::Idle)
        }
    };
    if let Err(e) = result {
        tracing::error!("fatal modem error in dial task: {}", e);
    }
}

fn spawn_carrier_pump(modem: Modem, reader: Box<dyn Read + Send>, carrier: CancellationToken) {
    let spawned = thread::Builder::new()
        .name("vmodem-carrier".into())
        .spawn(move || carrier_pump(modem, reader, carrier));
    if let Err(e) = spawned {
        tracing::warn!("failed to spawn carrier pump: {}", e);
    }
}

fn carrier_pump(modem: Modem, mut reader: Box<dyn Read + Send>, carrier: CancellationToken) {
    tracing::debug!("carrier pump started");
    let mut buf = [0u8; 4096];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if is_transient(&e) => {
                if carrier.is_cancelled() {
                    return;
                }
                continue;
            }
            Err(e) => {
                tracing::debug!("call stream read failed: {}", e);
                break;
            }
        };

        let mut guard = modem.lock();
        if carrier.is_cancelled() {
            return;
        }
        // Ringing and command mode swallow call data
        if guard.status() == ModemStatus::Connected {
            guard.emit(&buf[..n]);
        }
    }

    let mut guard = modem.lock();
    if carrier.is_cancelled() {
        return;
    }
    tracing::info!("remote end hung up");
    if let Err(e) = guard.set_status(ModemStatus::Idle) {
        tracing::error!("fatal modem error in carrier pump: {}", e);
    }
}
