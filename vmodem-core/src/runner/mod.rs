//! Executes AT command lines: scans them into sub-commands and routes each
//! one through the command hook, then the built-in table.

use crate::builtins;
use crate::engine::{Modem, ModemGuard};
use crate::error::Result;
use crate::runtime::parser::{AtCommand, CommandScanner};
use crate::state_machine::ResultCode;

impl<'a> ModemGuard<'a> {
    /// Runs one command line (no `AT`, no CR) and returns the line's result:
    /// the first ERROR, or the result of the last sub-command executed.
    ///
    /// Only Idle, Ringing and ConnectedCmd accept command lines; any other
    /// status answers ERROR without looking at the line.
    pub fn process_at_command(&mut self, line: &str) -> Result<ResultCode> {
        let status = self.status();
        if !status.accepts_commands() {
            tracing::debug!(status = %status, "command line rejected in current status");
            return Ok(ResultCode::Error);
        }

        let mut code = ResultCode::Ok;
        for item in CommandScanner::new(line) {
            let cmd = match item {
                Ok(cmd) => cmd,
                Err(malformed) => {
                    tracing::debug!(line, position = malformed.position, "malformed command line");
                    return Ok(ResultCode::Error);
                }
            };

            code = self.execute_command(&cmd)?;
            if code == ResultCode::Error {
                break;
            }
        }
        Ok(code)
    }

    /// Runs a single sub-command.
    pub fn execute_command(&mut self, cmd: &AtCommand) -> Result<ResultCode> {
        let modem: &'a Modem = self.modem;
        if let Some(hook) = modem.shared.command_hook.as_ref() {
            if let Some(code) = hook(&mut *self, cmd) {
                return Ok(code);
            }
        }
        builtins::dispatch(self, cmd)
    }
}
