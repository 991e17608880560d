//! The terminal read task.
//!
//! One thread per modem, reading a byte at a time. The read itself happens
//! with the lock released; each byte is then handled under the lock.

use crate::engine::{Modem, ModemGuard};
use crate::error::Result;
use crate::state_machine::{ModemStatus, ResultCode};
use crate::stream::is_transient;
use crate::term::line_editor::{LineEditor, LineEvent};
use std::io::{self, Read};
use std::thread;
use std::time::{Duration, Instant};

pub(crate) fn spawn(modem: Modem, reader: Box<dyn Read + Send>) -> io::Result<()> {
    thread::Builder::new()
        .name("vmodem-tty".into())
        .spawn(move || run(modem, reader))?;
    Ok(())
}

fn run(modem: Modem, mut reader: Box<dyn Read + Send>) {
    tracing::debug!("terminal read task started");
    let lifetime = modem.shared.lifetime.clone();
    let mut editor = LineEditor::new();
    let mut byte = [0u8; 1];

    while !lifetime.is_cancelled() {
        match reader.read(&mut byte) {
            Ok(0) => {
                tracing::debug!("terminal stream reached EOF");
                break;
            }
            Ok(_) => {}
            Err(e) if is_transient(&e) => continue,
            Err(e) => {
                tracing::warn!("terminal read failed: {}", e);
                break;
            }
        }

        let mut guard = modem.lock();
        if guard.status() == ModemStatus::Closed {
            break;
        }
        if let Err(e) = guard.handle_terminal_byte(byte[0], &mut editor) {
            tracing::error!("fatal modem error in terminal read task: {}", e);
            break;
        }
    }

    modem.shared.read_task_done.cancel();
    tracing::debug!("terminal read task stopped");
}

impl ModemGuard<'_> {
    fn handle_terminal_byte(&mut self, byte: u8, editor: &mut LineEditor) -> Result<()> {
        match self.status() {
            ModemStatus::Connected => {
                self.forward_to_call(&[byte]);
                self.watch_for_escape(byte);
                Ok(())
            }
            ModemStatus::Dialing => {
                tracing::info!("dial aborted from the terminal");
                self.set_status(ModemStatus::Idle)
            }
            _ => {
                for event in editor.feed(byte, self.echo()) {
                    match event {
                        LineEvent::Echo(bytes) => self.emit(&bytes),
                        LineEvent::Submit(line) => {
                            let code = self.process_at_command(&line)?;
                            self.print_result(code);
                        }
                        LineEvent::NothingToRepeat => self.print_result(ResultCode::Error),
                    }
                }
                Ok(())
            }
        }
    }

    fn watch_for_escape(&mut self, byte: u8) {
        let escape_char = self.state.registers.escape_char();
        let guard_time = self.state.registers.guard_time();
        let ticket = self
            .state
            .escape
            .feed(byte, Instant::now(), escape_char, guard_time);
        if let Some(ticket) = ticket {
            spawn_escape_timer(self.modem.clone(), ticket, guard_time);
        }
    }
}

/// Waits out the trailing guard time, then drops to command mode unless
/// something was typed in the meantime.
fn spawn_escape_timer(modem: Modem, ticket: u64, guard_time: Duration) {
    let spawned = thread::Builder::new()
        .name("vmodem-escape".into())
        .spawn(move || {
            thread::sleep(guard_time);
            let mut guard = modem.lock();
            if guard.status() != ModemStatus::Connected || !guard.state.escape.confirm(ticket) {
                return;
            }
            tracing::info!("escape sequence detected");
            if let Err(e) = guard.set_status(ModemStatus::ConnectedCmd) {
                tracing::error!("fatal modem error entering command mode: {}", e);
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("failed to spawn escape timer: {}", e);
    }
}
