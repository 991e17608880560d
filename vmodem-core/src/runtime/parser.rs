//! AT command-line tokenizer.
//!
//! The scanner is lazy: each call to [`CommandScanner::next`] yields one
//! sub-command, so the executor can run `E0` before it discovers that the
//! rest of `ATE0!` is garbage, the way a real modem does.

/// One sub-command of an AT line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AtCommand {
    /// Upper-cased name: `E`, `&F`, `+GCAP`, `#CID`.
    pub name: String,
    /// Digits following a short name, verbatim (may be empty).
    pub number: String,
    /// `=` was present.
    pub assign: bool,
    /// `?` was present.
    pub query: bool,
    /// Text after `=`.
    pub value: String,
    /// `+`/`#` commands and `D`; these end the chain.
    pub long: bool,
}

impl AtCommand {
    /// Name without case folding, for single-letter matching.
    pub fn letter(&self) -> Option<char> {
        let mut chars = self.name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }
}

/// The line violates the AT grammar; the whole line reports ERROR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Malformed {
    pub position: usize,
}

pub struct CommandScanner<'a> {
    line: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> CommandScanner<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            line: line.as_bytes(),
            pos: 0,
            done: false,
        }
    }

    fn remaining(&self) -> usize {
        self.line.len() - self.pos
    }

    fn scan(&mut self) -> Result<AtCommand, Malformed> {
        let mut cmd = AtCommand::default();

        while let Some(&b) = self.line.get(self.pos) {
            let at = self.pos;
            self.pos += 1;

            if b == b'?' {
                if cmd.name.is_empty() {
                    return Err(Malformed { position: at });
                }
                cmd.query = true;
                break;
            }

            if cmd.assign {
                // short commands only take digits
                if !cmd.long && !b.is_ascii_digit() {
                    self.pos = at;
                    break;
                }
                cmd.value.push(char::from(b));
                continue;
            }

            if b == b'+' || b == b'#' {
                if !cmd.name.is_empty() {
                    return Err(Malformed { position: at });
                }
                cmd.long = true;
                cmd.name.push(char::from(b));
                continue;
            }

            if b == b'=' {
                if cmd.name.is_empty() {
                    return Err(Malformed { position: at });
                }
                cmd.assign = true;
                continue;
            }

            if cmd.long {
                if !b.is_ascii_alphabetic() {
                    return Err(Malformed { position: at });
                }
                cmd.name.push(char::from(b.to_ascii_uppercase()));
                continue;
            }

            if cmd.name.is_empty() || cmd.name == "&" {
                if b == b'&' && cmd.name.is_empty() && self.remaining() > 0 {
                    cmd.name.push('&');
                    continue;
                }
                if !b.is_ascii_alphabetic() {
                    return Err(Malformed { position: at });
                }
                cmd.name.push(char::from(b.to_ascii_uppercase()));
                if cmd.name == "D" {
                    // the dial string is free-form and runs to end of line
                    cmd.long = true;
                    cmd.assign = true;
                }
                continue;
            }

            if b.is_ascii_digit() {
                cmd.number.push(char::from(b));
            } else {
                self.pos = at;
                break;
            }
        }

        Ok(cmd)
    }
}

impl Iterator for CommandScanner<'_> {
    type Item = Result<AtCommand, Malformed>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining() == 0 {
            return None;
        }
        let item = self.scan();
        match &item {
            Ok(cmd) if cmd.long => self.done = true,
            Err(_) => self.done = true,
            Ok(_) => {}
        }
        Some(item)
    }
}

/// Numeric argument as a built-in sees it: empty means 0, overflow is
/// `None`.
pub fn numeric_arg(digits: &str) -> Option<u32> {
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse().ok()
}
