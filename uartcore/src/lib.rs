/*!
# uartcore

Cycle-accurate bit-serial line framing engines.

This crate contains the core logic that converts between parallel data words
and an asynchronous bit-serial line encoding (UART-style framing: start bits,
LSB-first data bits, stop bits, configurable idle polarity), and the inverse
decode path. Everything advances in lockstep on a single logical clock: each
component exposes a `tick`-style step method that is called exactly once per
simulated clock cycle.

## Core Types

- [`FrameConfig`] - framing geometry and bit-period divisor
- [`BitTimer`] - armed countdown with a one-tick `done` pulse
- [`TxShifter`] / [`RxShifter`] - serializing / deserializing shift registers
- [`TxEngine`] - transmit state machine with a ready/valid input handshake
- [`RxEngine`] - receive state machine with a ready/valid output handshake
  and overrun (drop) detection

## Modules

- [`config`] - frame configuration and divisor derivation
- [`timer`] - bit-period countdown timer
- [`shift`] - shift registers for both directions
- [`tx`] - transmit engine
- [`rx`] - receive engine and single-slot receive buffer
- [`error`] - common error types
*/

pub mod config;
pub mod error;
pub mod rx;
pub mod shift;
pub mod timer;
pub mod tx;

// Re-export commonly used types
pub use config::{ConfigError, FrameConfig};
pub use error::{Result, UartError};
pub use rx::{RxBuffer, RxEngine, RxState};
pub use shift::{RxShifter, TxShifter};
pub use timer::BitTimer;
pub use tx::{TxEngine, TxState};

/// Version information for the engine library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Conventional line parameters
pub mod defaults {
    /// Reference system clock frequency in Hz
    pub const CLOCK_HZ: u32 = 100_000_000;

    /// Reference baud rate
    pub const BAUD: u32 = 115_200;

    /// Start bits in the conventional 8N1 framing
    pub const START_BITS: u32 = 1;

    /// Data bits in the conventional 8N1 framing
    pub const DATA_BITS: u32 = 8;

    /// Stop bits in the conventional 8N1 framing
    pub const STOP_BITS: u32 = 1;

    /// Conventional idle polarity (line rests high)
    pub const IDLE_POLARITY: bool = true;
}
