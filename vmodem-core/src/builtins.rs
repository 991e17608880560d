//! The built-in command table.
//!
//! Unknown commands answer OK, like most real modems.

use crate::engine::ModemGuard;
use crate::error::Result;
use crate::runtime::parser::{numeric_arg, AtCommand};
use crate::state_machine::{ModemStatus, ResultCode};

/// Central dispatch for one sub-command.
pub fn dispatch(modem: &mut ModemGuard<'_>, cmd: &AtCommand) -> Result<ResultCode> {
    let Some(letter) = cmd.letter() else {
        return Ok(ResultCode::Ok);
    };

    match letter {
        // ── S-registers ──
        'S' => Ok(s_register(modem, cmd)),

        // ── Echo / result form ──
        'E' => Ok(match numeric_arg(&cmd.number) {
            Some(0) => {
                modem.set_echo(false);
                ResultCode::Ok
            }
            Some(1) => {
                modem.set_echo(true);
                ResultCode::Ok
            }
            _ => ResultCode::Error,
        }),
        'V' => Ok(match numeric_arg(&cmd.number) {
            Some(0) => {
                modem.set_short_form(true);
                ResultCode::Ok
            }
            Some(1) => {
                modem.set_short_form(false);
                ResultCode::Ok
            }
            _ => ResultCode::Error,
        }),

        // ── Call control ──
        'D' => dial(modem, cmd),
        'A' => answer(modem),
        'H' => hang_up(modem),
        'O' => go_online(modem),

        _ => Ok(ResultCode::Ok),
    }
}

fn s_register(modem: &mut ModemGuard<'_>, cmd: &AtCommand) -> ResultCode {
    let Some(index) = numeric_arg(&cmd.number).and_then(|n| u8::try_from(n).ok()) else {
        return ResultCode::Error;
    };

    if cmd.assign {
        let Some(value) = numeric_arg(&cmd.value).and_then(|v| u8::try_from(v).ok()) else {
            return ResultCode::Error;
        };
        modem.registers_mut().set(index, value);
        return ResultCode::Ok;
    }

    if cmd.query {
        let cr = modem.cr();
        let value = modem.registers().value(index);
        modem.emit(format!("{cr}{value:03}{cr}").as_bytes());
    }
    ResultCode::Ok
}

fn dial(modem: &mut ModemGuard<'_>, cmd: &AtCommand) -> Result<ResultCode> {
    if modem.status() != ModemStatus::Idle {
        return Ok(ResultCode::Error);
    }
    let Some(outgoing) = modem.outgoing_call() else {
        return Ok(ResultCode::NoCarrier);
    };

    modem.set_status(ModemStatus::Dialing)?;
    modem.start_dial(outgoing, cmd.value.clone());
    Ok(ResultCode::Silent)
}

fn answer(modem: &mut ModemGuard<'_>) -> Result<ResultCode> {
    match modem.status() {
        ModemStatus::Idle => Ok(ResultCode::NoCarrier),
        ModemStatus::Ringing => {
            modem.set_status(ModemStatus::Connected)?;
            Ok(ResultCode::Silent)
        }
        _ => Ok(ResultCode::Error),
    }
}

fn hang_up(modem: &mut ModemGuard<'_>) -> Result<ResultCode> {
    match modem.status() {
        ModemStatus::Connected | ModemStatus::ConnectedCmd => {
            modem.set_status(ModemStatus::Idle)?;
            Ok(ResultCode::Silent)
        }
        _ => Ok(ResultCode::Ok),
    }
}

fn go_online(modem: &mut ModemGuard<'_>) -> Result<ResultCode> {
    if modem.status() != ModemStatus::ConnectedCmd {
        return Ok(ResultCode::Error);
    }
    modem.set_status(ModemStatus::Connected)?;
    Ok(ResultCode::Silent)
}
