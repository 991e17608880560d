use crate::state_machine::ModemStatus;
use thiserror::Error;

/// Errors surfaced by the modem API.
///
/// Two classes live here. `ConfigRequired`, `Busy` and `Io` are ordinary
/// runtime conditions. `InvalidTransition` and `Closed` mean the embedding
/// code broke the modem's contract; see [`ModemError::is_fatal`].
#[derive(Debug, Error)]
pub enum ModemError {
    #[error("config required: a terminal stream must be supplied")]
    ConfigRequired,

    #[error("modem busy")]
    Busy,

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: ModemStatus, to: ModemStatus },

    #[error("modem is closed")]
    Closed,

    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ModemError {
    /// Contract violations. The modem instance must be considered dead.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ModemError::InvalidTransition { .. } | ModemError::Closed
        )
    }
}

pub type Result<T> = std::result::Result<T, ModemError>;
