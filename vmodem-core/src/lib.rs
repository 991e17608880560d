//! # vmodem core
//!
//! A Hayes-compatible modem engine. It reads a terminal stream, interprets
//! the AT command language typed on it, and drives a call lifecycle over
//! whatever byte-stream transport the embedding application plugs in.

pub mod builtins;
mod call;
pub mod engine;
pub mod error;
mod reader;
pub mod registers;
mod runner;
pub mod runtime;
pub mod state_machine;
pub mod stream;
pub mod term;

// Re-export the main types so users can just use `vmodem_core::Modem`
pub use engine::{CommandHook, Modem, ModemConfig, ModemGuard, OutgoingCall};
pub use error::ModemError;
pub use registers::Registers;
pub use runtime::parser::AtCommand;
pub use state_machine::{ModemStatus, ResultCode};
pub use stream::{CallStream, TerminalStream};
