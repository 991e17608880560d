/// Longest command line kept, `AT` prefix excluded.
pub const MAX_LINE: usize = 100;

/// Cursor left, space, cursor left: erases the last echoed character.
pub const ERASE_SEQUENCE: &[u8] = b"\x1b[D \x1b[D";

const DELETE: u8 = 0x7f;

/// What the modem must do after feeding one byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// Write these bytes back to the terminal.
    Echo(Vec<u8>),
    /// Execute this line (without `AT`) and print its result.
    Submit(String),
    /// `A/` with nothing to repeat.
    NothingToRepeat,
}

/// Command-mode input state machine.
///
/// Outside command entry it hunts for the `AT` prefix (or `A/`); inside, it
/// buffers the line until carriage return.
#[derive(Debug, Default, Clone)]
pub struct LineEditor {
    a_seen: bool,
    in_command: bool,
    buffer: String,
    last_command: Option<String>,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_command(&self) -> bool {
        self.in_command
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }

    pub fn feed(&mut self, byte: u8, echo: bool) -> Vec<LineEvent> {
        let mut events = Vec::new();
        if self.in_command {
            self.feed_line(byte, echo, &mut events);
        } else {
            self.feed_prefix(byte, echo, &mut events);
        }
        events
    }

    fn feed_prefix(&mut self, byte: u8, echo: bool, events: &mut Vec<LineEvent>) {
        if echo {
            events.push(LineEvent::Echo(vec![byte]));
        }

        if byte.eq_ignore_ascii_case(&b'A') {
            self.a_seen = true;
            return;
        }

        if self.a_seen && byte == b'/' {
            self.a_seen = false;
            events.push(LineEvent::Echo(b"\r".to_vec()));
            match &self.last_command {
                Some(line) => events.push(LineEvent::Submit(line.clone())),
                None => events.push(LineEvent::NothingToRepeat),
            }
            return;
        }

        if self.a_seen && byte.eq_ignore_ascii_case(&b'T') {
            self.a_seen = false;
            self.in_command = true;
            return;
        }

        self.a_seen = false;
    }

    fn feed_line(&mut self, byte: u8, echo: bool, events: &mut Vec<LineEvent>) {
        match byte {
            DELETE => {
                if self.buffer.pop().is_some() {
                    events.push(LineEvent::Echo(ERASE_SEQUENCE.to_vec()));
                }
            }
            b'\r' => {
                self.in_command = false;
                let line = std::mem::take(&mut self.buffer);
                self.last_command = Some(line.clone());
                events.push(LineEvent::Echo(b"\r".to_vec()));
                events.push(LineEvent::Submit(line));
            }
            b if b == b' ' || b.is_ascii_graphic() => {
                if echo {
                    events.push(LineEvent::Echo(vec![b]));
                }
                if self.buffer.len() < MAX_LINE {
                    self.buffer.push(char::from(b));
                }
            }
            _ => {}
        }
    }
}
