//! Modem lifecycle status and its transition table.
//!
//! The table lives here; the side effects of entering a status (printing a
//! result code, dropping the call) are applied by
//! [`ModemGuard::set_status`](crate::engine::ModemGuard::set_status), which
//! consults [`ModemStatus::can_transition_to`] before touching anything.

use std::fmt;

/// Where the modem is in its call lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModemStatus {
    /// On hook, accepting commands.
    #[default]
    Idle,
    /// An outgoing call is being placed.
    Dialing,
    /// Online: terminal bytes go straight to the call.
    Connected,
    /// A call is up but the terminal is talking to the command interpreter.
    ConnectedCmd,
    /// An incoming call is waiting to be answered.
    Ringing,
    /// Dead modem. Nothing leaves this state.
    Closed,
}

impl ModemStatus {
    pub const ALL: [ModemStatus; 6] = [
        ModemStatus::Idle,
        ModemStatus::Dialing,
        ModemStatus::Connected,
        ModemStatus::ConnectedCmd,
        ModemStatus::Ringing,
        ModemStatus::Closed,
    ];

    /// The legal transition table.
    pub fn can_transition_to(self, next: ModemStatus) -> bool {
        use ModemStatus::*;
        match self {
            Idle => matches!(next, Dialing | Ringing | Closed),
            Dialing => matches!(next, Connected | Idle | Closed),
            Ringing => matches!(next, Connected | Idle | Closed),
            Connected => matches!(next, ConnectedCmd | Idle | Closed),
            ConnectedCmd => matches!(next, Connected | Idle | Closed),
            Closed => false,
        }
    }

    /// True for the statuses in which the modem owns a call stream.
    pub fn holds_connection(self) -> bool {
        matches!(
            self,
            ModemStatus::Ringing | ModemStatus::Connected | ModemStatus::ConnectedCmd
        )
    }

    /// True for the statuses in which a typed command line is interpreted.
    pub fn accepts_commands(self) -> bool {
        matches!(
            self,
            ModemStatus::Idle | ModemStatus::Ringing | ModemStatus::ConnectedCmd
        )
    }

    /// Leaving this status for Idle reports a lost carrier.
    pub(crate) fn reports_no_carrier(self) -> bool {
        matches!(
            self,
            ModemStatus::Connected | ModemStatus::ConnectedCmd | ModemStatus::Dialing
        )
    }
}

impl fmt::Display for ModemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModemStatus::Idle => "Idle",
            ModemStatus::Dialing => "Dialing",
            ModemStatus::Connected => "Connected",
            ModemStatus::ConnectedCmd => "ConnectedCmd",
            ModemStatus::Ringing => "Ringing",
            ModemStatus::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// Outcome of a command or a status change, as reported to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    Error,
    /// Nothing is printed; a status transition already reported the outcome.
    Silent,
    Connect,
    NoCarrier,
    NoDialtone,
    Busy,
    NoAnswer,
}

impl ResultCode {
    /// Terse (`ATV0`) form.
    pub fn numeric(self) -> Option<&'static str> {
        match self {
            ResultCode::Ok => Some("0"),
            ResultCode::Connect => Some("1"),
            ResultCode::NoCarrier => Some("3"),
            ResultCode::Error => Some("4"),
            ResultCode::NoDialtone => Some("6"),
            ResultCode::Busy => Some("7"),
            ResultCode::NoAnswer => Some("8"),
            ResultCode::Silent => None,
        }
    }

    /// Verbose (`ATV1`) form. `Connect` prints the configured connect string.
    pub fn verbose<'a>(self, connect_string: &'a str) -> Option<&'a str> {
        match self {
            ResultCode::Ok => Some("OK"),
            ResultCode::Error => Some("ERROR"),
            ResultCode::Connect => Some(connect_string),
            ResultCode::NoCarrier => Some("NO CARRIER"),
            ResultCode::NoDialtone => Some("NO DIALTONE"),
            ResultCode::Busy => Some("BUSY"),
            ResultCode::NoAnswer => Some("NO ANSWER"),
            ResultCode::Silent => None,
        }
    }

    /// Full terminal line for this code, framed by `cr` on both sides.
    pub fn render(self, short_form: bool, connect_string: &str, cr: &str) -> Option<String> {
        let text = if short_form {
            self.numeric()
        } else {
            self.verbose(connect_string)
        }?;
        Some(format!("{cr}{text}{cr}"))
    }
}
