use anyhow::{Context, Result};
use serialport::{DataBits, FlowControl, SerialPort};
use std::io::{self, Read, Write};
use std::time::Duration;
use vmodem_core::TerminalStream;

/// Read timeout on the port. Timeouts come back to the read task as
/// transient errors, so this bounds how long it takes to notice a close.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Configuration for a Serial Connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub flow_control: bool,
}

impl SerialConfig {
    /// 8 data bits, no flow control.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            data_bits: 8,
            flow_control: false,
        }
    }

    fn data_bits(&self) -> Result<DataBits> {
        Ok(match self.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            8 => DataBits::Eight,
            n => anyhow::bail!("Unsupported data bits: {}", n),
        })
    }

    fn flow_control(&self) -> FlowControl {
        if self.flow_control {
            FlowControl::Hardware
        } else {
            FlowControl::None
        }
    }
}

/// A real serial line with the terminal on the far end.
pub struct SerialTerminal {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl std::fmt::Debug for SerialTerminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTerminal")
            .field("name", &self.name)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl SerialTerminal {
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port_name, config.baud_rate)
            .data_bits(config.data_bits()?)
            .flow_control(config.flow_control())
            .timeout(READ_TIMEOUT)
            .open()
            .with_context(|| format!("Failed to open {}", config.port_name))?;

        tracing::info!(port = %config.port_name, baud = config.baud_rate, "serial port opened");
        Ok(Self {
            port: Some(port),
            name: config.port_name.clone(),
        })
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::ErrorKind::NotConnected.into())
    }
}

impl Write for SerialTerminal {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port()?.flush()
    }
}

impl TerminalStream for SerialTerminal {
    fn reader(&mut self) -> io::Result<Box<dyn Read + Send>> {
        let clone = self.port()?.try_clone()?;
        Ok(Box::new(clone))
    }

    fn close(&mut self) -> io::Result<()> {
        if self.port.take().is_some() {
            tracing::info!(port = %self.name, "serial port closed");
        }
        Ok(())
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
