use crate::call::Connection;
use crate::error::{ModemError, Result};
use crate::reader;
use crate::registers::Registers;
use crate::runtime::parser::AtCommand;
use crate::state_machine::{ModemStatus, ResultCode};
use crate::stream::{CallStream, TerminalStream};
use crate::term::escape::EscapeDetector;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONNECT_STRING: &str = "CONNECT";

/// Places an outgoing call. Runs on the dial task, without the modem lock;
/// it may block for as long as the transport needs.
pub type OutgoingCall =
    Arc<dyn Fn(&Modem, &str) -> anyhow::Result<Box<dyn CallStream>> + Send + Sync>;

/// Consulted before the built-in command table. `None` defers to the
/// built-ins; any result replaces them for that sub-command. The hook runs
/// under the modem lock: use the guard it is given, never the `Modem`
/// handle, or it deadlocks.
pub type CommandHook =
    Arc<dyn Fn(&mut ModemGuard<'_>, &AtCommand) -> Option<ResultCode> + Send + Sync>;

/// Everything a modem needs at construction.
#[derive(Default)]
pub struct ModemConfig {
    pub terminal: Option<Box<dyn TerminalStream>>,
    pub outgoing_call: Option<OutgoingCall>,
    pub command_hook: Option<CommandHook>,
    /// Printed on connect in verbose mode. Empty means `CONNECT`.
    pub connect_string: String,
}

impl std::fmt::Debug for ModemConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModemConfig")
            .field("terminal", &self.terminal.as_ref().map(|t| t.name()))
            .field("outgoing_call", &self.outgoing_call.is_some())
            .field("command_hook", &self.command_hook.is_some())
            .field("connect_string", &self.connect_string)
            .finish()
    }
}

impl ModemConfig {
    pub fn new(terminal: impl TerminalStream + 'static) -> Self {
        Self {
            terminal: Some(Box::new(terminal)),
            ..Self::default()
        }
    }

    pub fn with_outgoing_call<F>(mut self, call: F) -> Self
    where
        F: Fn(&Modem, &str) -> anyhow::Result<Box<dyn CallStream>> + Send + Sync + 'static,
    {
        self.outgoing_call = Some(Arc::new(call));
        self
    }

    pub fn with_command_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ModemGuard<'_>, &AtCommand) -> Option<ResultCode> + Send + Sync + 'static,
    {
        self.command_hook = Some(Arc::new(hook));
        self
    }

    pub fn with_connect_string(mut self, connect_string: impl Into<String>) -> Self {
        self.connect_string = connect_string.into();
        self
    }
}

/// Everything behind the modem lock.
pub(crate) struct ModemState {
    pub(crate) status: ModemStatus,
    pub(crate) status_token: CancellationToken,
    pub(crate) terminal: Box<dyn TerminalStream>,
    pub(crate) connection: Option<Connection>,
    pub(crate) connect_string: String,
    pub(crate) registers: Registers,
    pub(crate) echo: bool,
    pub(crate) short_form: bool,
    pub(crate) escape: EscapeDetector,
}

pub(crate) struct Shared {
    state: Mutex<ModemState>,
    pub(crate) lifetime: CancellationToken,
    pub(crate) read_task_done: CancellationToken,
    pub(crate) outgoing_call: Option<OutgoingCall>,
    pub(crate) command_hook: Option<CommandHook>,
}

/// Handle to a running modem. Cheap to clone; all clones drive the same
/// modem.
///
/// Methods on `Modem` take the lock themselves. Code that already holds it
/// (a command hook, or a caller batching several operations) uses the same
/// operations on [`ModemGuard`].
#[derive(Clone)]
pub struct Modem {
    pub(crate) shared: Arc<Shared>,
}

impl std::fmt::Debug for Modem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Modem")
            .field("outgoing_call", &self.shared.outgoing_call.is_some())
            .field("command_hook", &self.shared.command_hook.is_some())
            .field("alive", &!self.shared.lifetime.is_cancelled())
            .finish()
    }
}

impl Modem {
    /// Builds the modem and starts its terminal read task.
    pub fn new(config: ModemConfig) -> Result<Self> {
        let ModemConfig {
            terminal,
            outgoing_call,
            command_hook,
            connect_string,
        } = config;

        let mut terminal = terminal.ok_or(ModemError::ConfigRequired)?;
        let tty_reader = terminal.reader()?;
        let terminal_name = terminal.name();

        let connect_string = if connect_string.is_empty() {
            DEFAULT_CONNECT_STRING.to_string()
        } else {
            connect_string
        };

        let lifetime = CancellationToken::new();
        let state = ModemState {
            status: ModemStatus::Idle,
            status_token: lifetime.child_token(),
            terminal,
            connection: None,
            connect_string,
            registers: Registers::new(),
            echo: true,
            short_form: false,
            escape: EscapeDetector::default(),
        };

        let modem = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                lifetime,
                read_task_done: CancellationToken::new(),
                outgoing_call,
                command_hook,
            }),
        };

        reader::spawn(modem.clone(), tty_reader)?;
        tracing::info!(terminal = %terminal_name, "modem started");
        Ok(modem)
    }

    /// Acquire the modem lock.
    pub fn lock(&self) -> ModemGuard<'_> {
        let state = self
            .shared
            .state
            .lock()
            .expect("modem lock poisoned by a panicking holder");
        ModemGuard { modem: self, state }
    }

    pub fn status(&self) -> ModemStatus {
        self.lock().status()
    }

    pub fn close(&self) -> Result<()> {
        self.lock().close()
    }

    pub fn incoming_call<S: CallStream + 'static>(&self, stream: S) -> Result<()> {
        self.lock().incoming_call(stream)
    }

    /// Runs a command line as if typed after `AT`. The result is returned,
    /// not printed.
    pub fn process_at_command(&self, line: &str) -> Result<ResultCode> {
        self.lock().process_at_command(line)
    }

    pub fn write_str(&self, text: &str) -> Result<()> {
        self.lock().write_str(text)
    }

    /// Current line ending: `\r\n` verbose, `\r` terse.
    pub fn cr(&self) -> &'static str {
        self.lock().cr()
    }

    pub fn terminal_name(&self) -> String {
        self.lock().terminal_name()
    }

    pub fn resize_terminal(&self, cols: u16, rows: u16) -> Result<()> {
        self.lock().resize_terminal(cols, rows)
    }

    /// Cancelled once the terminal read task has exited, for any reason.
    /// The modem does not close itself; call [`Modem::close`] afterwards.
    pub fn read_task_done(&self) -> CancellationToken {
        self.shared.read_task_done.clone()
    }
}

/// Proof that the modem lock is held. Every lock-required operation is a
/// method here, so none of them can be reached without the lock.
pub struct ModemGuard<'a> {
    pub(crate) modem: &'a Modem,
    pub(crate) state: MutexGuard<'a, ModemState>,
}

impl std::fmt::Debug for ModemGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModemGuard")
            .field("status", &self.state.status)
            .field("echo", &self.state.echo)
            .field("short_form", &self.state.short_form)
            .field("connected", &self.state.connection.is_some())
            .finish()
    }
}

impl<'a> ModemGuard<'a> {
    /// The unlocked handle, e.g. for handing to a background task.
    pub fn modem(&self) -> &'a Modem {
        self.modem
    }

    pub fn status(&self) -> ModemStatus {
        self.state.status
    }

    /// Moves to `next`, applying the entry side effects of the transition
    /// table. Errors are contract violations (see [`ModemError::is_fatal`]).
    pub fn set_status(&mut self, next: ModemStatus) -> Result<()> {
        let prev = self.state.status;
        if prev == ModemStatus::Closed {
            return Err(ModemError::Closed);
        }
        let needs_call = matches!(next, ModemStatus::Ringing | ModemStatus::Connected);
        if !prev.can_transition_to(next) || (needs_call && self.state.connection.is_none()) {
            return Err(ModemError::InvalidTransition {
                from: prev,
                to: next,
            });
        }

        match next {
            ModemStatus::Idle => {
                if prev.reports_no_carrier() {
                    self.print_result(ResultCode::NoCarrier);
                }
                if prev.holds_connection() {
                    self.drop_connection();
                }
            }
            ModemStatus::Connected => self.print_result(ResultCode::Connect),
            ModemStatus::ConnectedCmd => self.print_result(ResultCode::Ok),
            ModemStatus::Closed => self.drop_connection(),
            ModemStatus::Dialing | ModemStatus::Ringing => {}
        }

        self.state.status_token.cancel();
        self.state.status_token = self.modem.shared.lifetime.child_token();
        self.state.escape.reset_at(Instant::now());
        self.state.status = next;
        tracing::info!(from = %prev, to = %next, "modem status transition");
        Ok(())
    }

    /// Final transition: closes the call (if any), stops the background
    /// tasks and closes the terminal. Closing twice is a contract violation.
    pub fn close(&mut self) -> Result<()> {
        self.set_status(ModemStatus::Closed)?;
        self.modem.shared.lifetime.cancel();
        self.state.terminal.close()?;
        tracing::info!("modem closed");
        Ok(())
    }

    pub fn cr(&self) -> &'static str {
        if self.state.short_form { "\r" } else { "\r\n" }
    }

    /// Prints a result code in the current form. `Silent` prints nothing.
    pub fn print_result(&mut self, code: ResultCode) {
        let cr = self.cr();
        let line = code.render(self.state.short_form, &self.state.connect_string, cr);
        if let Some(line) = line {
            self.emit(line.as_bytes());
        }
    }

    pub fn write_str(&mut self, text: &str) -> Result<()> {
        self.write_bytes(text.as_bytes())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let terminal = &mut self.state.terminal;
        terminal.write_all(bytes)?;
        terminal.flush()?;
        Ok(())
    }

    /// Terminal output from the engine itself; a failed write is logged,
    /// the read task notices a dead terminal on its own.
    pub(crate) fn emit(&mut self, bytes: &[u8]) {
        if let Err(e) = self.write_bytes(bytes) {
            tracing::warn!("terminal write failed: {}", e);
        }
    }

    pub fn echo(&self) -> bool {
        self.state.echo
    }

    pub fn set_echo(&mut self, echo: bool) {
        self.state.echo = echo;
    }

    pub fn short_form(&self) -> bool {
        self.state.short_form
    }

    pub fn set_short_form(&mut self, short_form: bool) {
        self.state.short_form = short_form;
    }

    pub fn registers(&self) -> &Registers {
        &self.state.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.state.registers
    }

    pub fn connect_string(&self) -> &str {
        &self.state.connect_string
    }

    pub fn set_connect_string(&mut self, connect_string: impl Into<String>) {
        self.state.connect_string = connect_string.into();
    }

    /// True while a call stream is attached.
    pub fn has_connection(&self) -> bool {
        self.state.connection.is_some()
    }

    pub fn terminal_name(&self) -> String {
        self.state.terminal.name()
    }

    pub fn resize_terminal(&mut self, cols: u16, rows: u16) -> Result<()> {
        self.state.terminal.resize(cols, rows)?;
        Ok(())
    }

    pub(crate) fn outgoing_call(&self) -> Option<OutgoingCall> {
        self.modem.shared.outgoing_call.clone()
    }
}
