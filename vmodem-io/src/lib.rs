//! # vmodem IO
//!
//! The hardware side of the modem.
//! Terminal providers (pseudo-terminal, serial line) and call transports
//! that plug into the `vmodem-core` engine.

pub mod process;
pub mod pty;
pub mod serial;
pub mod util;

pub use process::{DialCommand, ProcessCall};
pub use pty::{PtyConfig, PtyTerminal};
pub use serial::{SerialConfig, SerialTerminal};
