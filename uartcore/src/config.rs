/*!
Frame configuration: framing geometry and bit-period divisor.

A [`FrameConfig`] is fixed at engine construction and shared by the transmit
and receive paths. The bit-period divisor is either supplied directly or
derived from a clock frequency and baud rate.
*/

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Widest supported data field, limited by the `u32` word type
pub const MAX_DATA_BITS: u32 = 32;

/// Widest supported frame, limited by the `u64` shift registers
pub const MAX_FRAME_BITS: u32 = 64;

/// Errors rejected at configuration time
///
/// The engines themselves never re-validate at runtime; construction is the
/// single checkpoint for configuration misuse.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("data field must be at least 1 bit wide")]
    ZeroDataBits,

    #[error("data field too wide: {0} bits (maximum {MAX_DATA_BITS})")]
    DataTooWide(u32),

    #[error("frame too wide: {0} bits total (maximum {MAX_FRAME_BITS})")]
    FrameTooWide(u32),

    #[error("divisor must be at least 1")]
    ZeroDivisor,

    #[error("baud rate must be non-zero and no greater than the clock frequency")]
    InvalidBaud,
}

/// Immutable framing parameters, fixed at engine instantiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameConfig {
    start_bits: u32,
    data_bits: u32,
    stop_bits: u32,
    idle_polarity: bool,
    divisor: u32,
}

impl FrameConfig {
    /// Create a configuration with an explicit bit-period divisor
    pub fn new(
        start_bits: u32,
        data_bits: u32,
        stop_bits: u32,
        idle_polarity: bool,
        divisor: u32,
    ) -> Result<Self, ConfigError> {
        if data_bits == 0 {
            return Err(ConfigError::ZeroDataBits);
        }
        if data_bits > MAX_DATA_BITS {
            return Err(ConfigError::DataTooWide(data_bits));
        }
        let total = start_bits + data_bits + stop_bits;
        if total > MAX_FRAME_BITS {
            return Err(ConfigError::FrameTooWide(total));
        }
        if divisor == 0 {
            return Err(ConfigError::ZeroDivisor);
        }
        Ok(Self {
            start_bits,
            data_bits,
            stop_bits,
            idle_polarity,
            divisor,
        })
    }

    /// Create a configuration deriving the divisor as `floor(clock_hz / baud)`
    ///
    /// When an explicit divisor is available, prefer [`FrameConfig::new`]; the
    /// explicit value always takes precedence over frequency/baud derivation.
    pub fn from_clock_baud(
        clock_hz: u32,
        baud: u32,
        start_bits: u32,
        data_bits: u32,
        stop_bits: u32,
        idle_polarity: bool,
    ) -> Result<Self, ConfigError> {
        if baud == 0 || baud > clock_hz {
            return Err(ConfigError::InvalidBaud);
        }
        Self::new(start_bits, data_bits, stop_bits, idle_polarity, clock_hz / baud)
    }

    /// Conventional 8N1 framing (1 start, 8 data, 1 stop, idle high)
    pub fn eight_n1(divisor: u32) -> Result<Self, ConfigError> {
        Self::new(1, 8, 1, true, divisor)
    }

    /// Start bits per frame
    pub fn start_bits(&self) -> u32 {
        self.start_bits
    }

    /// Data bits per frame
    pub fn data_bits(&self) -> u32 {
        self.data_bits
    }

    /// Stop bits per frame
    pub fn stop_bits(&self) -> u32 {
        self.stop_bits
    }

    /// Line value at rest; start bits are its inverse
    pub fn idle_polarity(&self) -> bool {
        self.idle_polarity
    }

    /// Clock cycles per bit period
    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    /// Clock cycles from a start edge to the center of the start bit
    pub fn half_divisor(&self) -> u32 {
        self.divisor / 2
    }

    /// Total bits per frame (start + data + stop)
    pub fn total_bits(&self) -> u32 {
        self.start_bits + self.data_bits + self.stop_bits
    }

    /// Mask selecting the data field of a word
    pub fn data_mask(&self) -> u64 {
        ones(self.data_bits)
    }

    /// Assemble the full frame shift vector for a data word
    ///
    /// Index 0 is transmitted first: start bits (inverse idle polarity), then
    /// data bits LSB first, then stop bits (idle polarity).
    pub fn assemble_frame(&self, word: u32) -> u64 {
        let mut frame = (u64::from(word) & self.data_mask()) << self.start_bits;
        if !self.idle_polarity {
            frame |= ones(self.start_bits);
        }
        if self.idle_polarity && self.stop_bits > 0 {
            frame |= ones(self.stop_bits) << (self.start_bits + self.data_bits);
        }
        frame
    }

    /// Extract the data field from a fully assembled receive frame
    pub fn extract_data(&self, frame: u64) -> u32 {
        ((frame >> self.start_bits) & self.data_mask()) as u32
    }
}

/// A `u64` with the low `n` bits set
pub(crate) fn ones(n: u32) -> u64 {
    if n == 0 {
        0
    } else if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divisor_derivation() {
        let config = FrameConfig::from_clock_baud(100_000_000, 115_200, 1, 8, 1, true).unwrap();
        assert_eq!(config.divisor(), 868);
    }

    #[test]
    fn test_explicit_divisor_takes_precedence() {
        // An integrator with a known divisor bypasses frequency/baud entirely
        let config = FrameConfig::new(1, 8, 1, true, 5).unwrap();
        assert_eq!(config.divisor(), 5);
        assert_eq!(config.total_bits(), 10);
    }

    #[test]
    fn test_rejects_misuse() {
        assert_eq!(
            FrameConfig::new(1, 0, 1, true, 4),
            Err(ConfigError::ZeroDataBits)
        );
        assert_eq!(
            FrameConfig::new(1, 33, 1, true, 4),
            Err(ConfigError::DataTooWide(33))
        );
        assert_eq!(
            FrameConfig::new(30, 32, 16, true, 4),
            Err(ConfigError::FrameTooWide(78))
        );
        assert_eq!(
            FrameConfig::new(1, 8, 1, true, 0),
            Err(ConfigError::ZeroDivisor)
        );
        assert_eq!(
            FrameConfig::from_clock_baud(1_000_000, 0, 1, 8, 1, true),
            Err(ConfigError::InvalidBaud)
        );
    }

    #[test]
    fn test_frame_assembly_idle_high() {
        let config = FrameConfig::eight_n1(4).unwrap();
        // 0x55 framed: start 0, data 0b01010101 LSB first, stop 1
        let frame = config.assemble_frame(0x55);
        assert_eq!(frame & 1, 0); // start bit low
        assert_eq!((frame >> 1) & 0xFF, 0x55); // data field
        assert_eq!((frame >> 9) & 1, 1); // stop bit high
        assert_eq!(config.extract_data(frame), 0x55);
    }

    #[test]
    fn test_frame_assembly_idle_low() {
        let config = FrameConfig::new(2, 4, 2, false, 4).unwrap();
        let frame = config.assemble_frame(0b1010);
        assert_eq!(frame & 0b11, 0b11); // start bits are inverse idle (high)
        assert_eq!((frame >> 2) & 0xF, 0b1010);
        assert_eq!((frame >> 6) & 0b11, 0); // stop bits at idle (low)
        assert_eq!(config.extract_data(frame), 0b1010);
    }

    #[test]
    fn test_data_masked_on_assembly() {
        let config = FrameConfig::new(1, 4, 1, true, 4).unwrap();
        // Bits above the data field width are ignored
        let frame = config.assemble_frame(0xFFFF_FFF3);
        assert_eq!(config.extract_data(frame), 0x3);
    }
}
