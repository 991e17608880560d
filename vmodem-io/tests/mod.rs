use vmodem_io::{DialCommand, PtyConfig, SerialConfig, SerialTerminal};

// ============================================================================
// SerialConfig Tests
// ============================================================================

#[test]
fn test_serial_config_defaults() {
    let config = SerialConfig::new("/dev/ttyUSB0", 115200);
    assert_eq!(config.port_name, "/dev/ttyUSB0");
    assert_eq!(config.baud_rate, 115200);
    assert_eq!(config.data_bits, 8);
    assert!(!config.flow_control);
}

#[test]
fn test_serial_config_clone() {
    let config = SerialConfig {
        port_name: "COM3".to_string(),
        baud_rate: 9600,
        data_bits: 7,
        flow_control: true,
    };
    let cloned = config.clone();
    assert_eq!(cloned, config);
}

#[test]
fn test_serial_open_rejects_bad_data_bits() {
    let mut config = SerialConfig::new("/dev/null", 9600);
    config.data_bits = 9;
    let err = SerialTerminal::open(&config).unwrap_err();
    assert!(err.to_string().contains("data bits"));
}

#[test]
fn test_serial_open_missing_port() {
    let config = SerialConfig::new("/dev/vmodem-no-such-port", 9600);
    let err = SerialTerminal::open(&config).unwrap_err();
    assert!(format!("{:#}", err).contains("/dev/vmodem-no-such-port"));
}

// ============================================================================
// PtyConfig Tests
// ============================================================================

#[test]
fn test_pty_config_default() {
    let config = PtyConfig::default();
    assert_eq!(config.cols, 80);
    assert_eq!(config.rows, 24);
}

// ============================================================================
// DialCommand Tests
// ============================================================================

#[test]
fn test_dial_command_builder() {
    let cmd = DialCommand::new("nc").arg("-q0").arg("bbs.example.org");
    assert_eq!(cmd.program, "nc");
    assert_eq!(cmd.args, vec!["-q0".to_string(), "bbs.example.org".to_string()]);
}

#[test]
fn test_dial_command_missing_program() {
    let err = DialCommand::new("/nonexistent/vmodem-dialer")
        .spawn("123")
        .unwrap_err();
    assert!(err.to_string().contains("vmodem-dialer"));
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;
    use std::time::{Duration, Instant};
    use vmodem_core::{CallStream, Modem, ModemConfig, ModemStatus, TerminalStream};
    use vmodem_io::PtyTerminal;

    const WAIT: Duration = Duration::from_secs(5);

    fn read_until(stream: &mut impl Read, needle: &str) -> String {
        let deadline = Instant::now() + WAIT;
        let mut seen = Vec::new();
        let mut buf = [0u8; 256];
        while Instant::now() < deadline {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => seen.extend_from_slice(&buf[..n]),
                Err(_) => {}
            }
            if String::from_utf8_lossy(&seen).contains(needle) {
                break;
            }
        }
        String::from_utf8_lossy(&seen).into_owned()
    }

    fn shell(script: &str) -> DialCommand {
        // the dialed number lands in $1
        DialCommand::new("sh").arg("-c").arg(script).arg("vmodem-dial")
    }

    /// One end of a socket pair as the modem's terminal.
    struct SocketTerminal(UnixStream);

    impl Write for SocketTerminal {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.0.flush()
        }
    }

    impl TerminalStream for SocketTerminal {
        fn reader(&mut self) -> std::io::Result<Box<dyn Read + Send>> {
            Ok(Box::new(self.0.try_clone()?))
        }

        fn close(&mut self) -> std::io::Result<()> {
            self.0.shutdown(std::net::Shutdown::Both)
        }
    }

    fn modem_dialing(dial: DialCommand) -> (Modem, UnixStream) {
        let (ours, theirs) = UnixStream::pair().unwrap();
        theirs
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        let config =
            ModemConfig::new(SocketTerminal(ours)).with_outgoing_call(dial.into_outgoing_call());
        (Modem::new(config).unwrap(), theirs)
    }

    // ========================================================================
    // ProcessCall Tests
    // ========================================================================

    #[test]
    fn test_process_call_round_trip() {
        let mut call = shell("exec cat").spawn("555").unwrap();
        assert!(call.is_running());
        let mut reader = call.reader().unwrap();
        call.write_all(b"ping\n").unwrap();
        call.flush().unwrap();

        let mut buf = [0u8; 5];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping\n");
        call.close().unwrap();
        assert!(!call.is_running());
    }

    #[test]
    fn test_process_call_receives_number() {
        let mut call = shell("echo \"$1 $VMODEM_NUMBER\"")
            .spawn("T555-1234")
            .unwrap();
        let mut out = String::new();
        call.reader().unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "T555-1234 T555-1234\n");
        call.close().unwrap();
    }

    #[test]
    fn test_process_call_reader_taken_once() {
        let mut call = shell("exec cat").spawn("1").unwrap();
        let _reader = call.reader().unwrap();
        assert!(call.reader().is_err());
        call.close().unwrap();
    }

    #[test]
    fn test_process_call_write_after_close() {
        let mut call = shell("exec cat").spawn("1").unwrap();
        call.close().unwrap();
        assert!(call.write(b"x").is_err());
    }

    // ========================================================================
    // Modem Integration Tests
    // ========================================================================

    #[test]
    fn test_dial_program_carries_call() {
        let (modem, mut tty) = modem_dialing(shell("exec cat"));
        tty.write_all(b"ATD5551234\r").unwrap();
        assert!(read_until(&mut tty, "\r\nCONNECT\r\n").contains("CONNECT"));
        assert_eq!(modem.status(), ModemStatus::Connected);

        tty.write_all(b"hello").unwrap();
        assert!(read_until(&mut tty, "hello").contains("hello"));

        modem.close().unwrap();
    }

    #[test]
    fn test_dial_program_exit_is_hang_up() {
        let (modem, mut tty) = modem_dialing(shell("echo WELCOME"));
        tty.write_all(b"ATD1\r").unwrap();
        let seen = read_until(&mut tty, "\r\nNO CARRIER\r\n");
        assert!(seen.contains("WELCOME"));
        assert!(seen.contains("\r\nNO CARRIER\r\n"));

        let deadline = Instant::now() + WAIT;
        while modem.status() != ModemStatus::Idle && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(modem.status(), ModemStatus::Idle);
        modem.close().unwrap();
    }

    #[test]
    fn test_dial_program_spawn_failure() {
        let (modem, mut tty) = modem_dialing(DialCommand::new("/nonexistent/vmodem-dialer"));
        tty.write_all(b"ATD1\r").unwrap();
        assert!(read_until(&mut tty, "\r\nNO CARRIER\r\n").contains("\r\nNO CARRIER\r\n"));
        modem.close().unwrap();
    }

    // ========================================================================
    // PtyTerminal Tests
    // ========================================================================

    #[test]
    fn test_pty_terminal_open() {
        let mut pty = PtyTerminal::open(PtyConfig::default()).unwrap();
        assert!(pty.name().starts_with("/dev/"));
        pty.resize(132, 43).unwrap();
        let _reader = pty.reader().unwrap();
        pty.close().unwrap();
        assert!(pty.write(b"AT").is_err());
    }

    #[test]
    fn test_modem_on_pty() {
        let pty = PtyTerminal::open(PtyConfig { cols: 100, rows: 30 }).unwrap();
        let name = pty.name();
        let modem = Modem::new(ModemConfig::new(pty)).unwrap();
        assert_eq!(modem.terminal_name(), name);
        modem.resize_terminal(120, 40).unwrap();
        modem.close().unwrap();
        assert_eq!(modem.status(), ModemStatus::Closed);
    }
}
