use std::collections::BTreeMap;

/// Escape character register (`+++`).
pub const S_ESCAPE_CHAR: u8 = 2;
/// Escape guard time register, in fiftieths of a second.
pub const S_GUARD_TIME: u8 = 12;

pub const DEFAULT_ESCAPE_CHAR: u8 = b'+';
pub const DEFAULT_GUARD_TIME: u8 = 50;

/// The S-register file. Starts empty; an unset register reads as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers {
    values: BTreeMap<u8, u8>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value as seen by `ATSn?`.
    pub fn value(&self, index: u8) -> u8 {
        self.values.get(&index).copied().unwrap_or(0)
    }

    /// `None` when the register was never written.
    pub fn get(&self, index: u8) -> Option<u8> {
        self.values.get(&index).copied()
    }

    pub fn set(&mut self, index: u8, value: u8) {
        self.values.insert(index, value);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    /// S2, or `None` when escape detection is disabled (values above 127).
    pub fn escape_char(&self) -> Option<u8> {
        let c = self.get(S_ESCAPE_CHAR).unwrap_or(DEFAULT_ESCAPE_CHAR);
        (c <= 127).then_some(c)
    }

    /// S12 in fiftieths of a second.
    pub fn guard_time(&self) -> std::time::Duration {
        let ticks = self.get(S_GUARD_TIME).unwrap_or(DEFAULT_GUARD_TIME);
        std::time::Duration::from_millis(u64::from(ticks) * 20)
    }
}
