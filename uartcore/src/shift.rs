/*!
Shift registers for both serialization directions.

Both registers model a 0-indexed bit vector where index 0 is the
earliest-loaded (transmit) or earliest-shifted (receive) bit. They are purely
mechanical: no timing, no state beyond the register contents.
*/

use crate::config::ones;

/// Parallel-to-serial shift register (transmit direction)
///
/// Loaded with a fully assembled frame; each `advance` shifts the register
/// right by one, exposing the next bit at index 0. The configured fill value
/// is shifted in behind the emptied frame, so a drained register drives the
/// line at the fill (idle) level.
#[derive(Debug, Clone)]
pub struct TxShifter {
    bits: u64,
    len: u32,
    fill: bool,
}

impl TxShifter {
    /// Create a register of `len` bits, initially holding the fill value
    pub fn new(len: u32, fill: bool) -> Self {
        let bits = if fill { ones(len) } else { 0 };
        Self { bits, len, fill }
    }

    /// Load a frame, overriding current contents and the output bit
    pub fn load(&mut self, frame: u64) {
        self.bits = frame & ones(self.len);
    }

    /// The bit currently exposed at index 0
    pub fn current_bit(&self) -> bool {
        self.bits & 1 != 0
    }

    /// Shift one position, exposing the next bit
    pub fn advance(&mut self) {
        self.bits >>= 1;
        if self.fill && self.len > 0 {
            self.bits |= 1u64 << (self.len - 1);
        }
    }
}

/// Serial-to-parallel shift register (receive direction)
///
/// Each `advance` shifts the register right and places the new bit at the top
/// (index `len - 1`). After `len` advances the first-shifted bit sits at
/// index 0, so frame bit *i* lands at register index *i*.
#[derive(Debug, Clone)]
pub struct RxShifter {
    bits: u64,
    len: u32,
}

impl RxShifter {
    /// Create an empty register of `len` bits
    pub fn new(len: u32) -> Self {
        Self { bits: 0, len }
    }

    /// Discard current contents
    pub fn clear(&mut self) {
        self.bits = 0;
    }

    /// Shift the new bit in, discarding the oldest
    pub fn advance(&mut self, bit: bool) {
        self.bits >>= 1;
        if bit && self.len > 0 {
            self.bits |= 1u64 << (self.len - 1);
        }
    }

    /// The full register contents
    pub fn value(&self) -> u64 {
        self.bits & ones(self.len)
    }
}
