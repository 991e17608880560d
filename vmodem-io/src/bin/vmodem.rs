// vmodem-io/src/bin/vmodem.rs

use anyhow::{Context, Result};
use clap::Parser;
use vmodem_core::{Modem, ModemConfig};
use vmodem_io::{DialCommand, PtyConfig, PtyTerminal, SerialConfig, SerialTerminal};

/// Hayes-compatible virtual modem.
#[derive(Parser, Debug)]
#[command(name = "vmodem", version, about = "Hayes-compatible virtual modem")]
struct Cli {
    /// Serve a real serial port instead of a new pseudo-terminal.
    #[arg(long, value_name = "PORT")]
    serial: Option<String>,

    /// Serial line speed.
    #[arg(long, default_value_t = 9600)]
    baud: u32,

    /// Pseudo-terminal width.
    #[arg(long, default_value_t = 80)]
    cols: u16,

    /// Pseudo-terminal height.
    #[arg(long, default_value_t = 24)]
    rows: u16,

    /// Printed on connect in verbose mode.
    #[arg(long, default_value = "CONNECT")]
    connect_string: String,

    /// Program run by ATD; the number is appended to its arguments.
    #[arg(last = true, value_name = "DIAL_PROGRAM")]
    dial: Vec<String>,
}

impl Cli {
    fn dial_command(&self) -> Option<DialCommand> {
        let (program, args) = self.dial.split_first()?;
        Some(
            args.iter()
                .fold(DialCommand::new(program.as_str()), |cmd, arg| cmd.arg(arg.as_str())),
        )
    }

    fn build_modem(&self) -> Result<Modem> {
        let mut config = match &self.serial {
            Some(port) => {
                let serial = SerialConfig::new(port.as_str(), self.baud);
                ModemConfig::new(SerialTerminal::open(&serial)?)
            }
            None => {
                let pty = PtyConfig {
                    cols: self.cols,
                    rows: self.rows,
                };
                ModemConfig::new(PtyTerminal::open(pty)?)
            }
        }
        .with_connect_string(self.connect_string.as_str());

        if let Some(dial) = self.dial_command() {
            tracing::info!(program = %dial.program, "dialing through local program");
            config = config.with_outgoing_call(dial.into_outgoing_call());
        }

        Modem::new(config).context("Failed to start modem")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    vmodem_io::util::init_tracing();

    let cli = Cli::parse();
    let modem = cli.build_modem()?;

    println!("{}", modem.terminal_name());

    let read_task_done = modem.read_task_done();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received, shutting down");
        }
        _ = read_task_done.cancelled() => {
            tracing::info!("terminal went away, shutting down");
        }
    }

    modem.close().context("Failed to close modem")?;
    Ok(())
}
