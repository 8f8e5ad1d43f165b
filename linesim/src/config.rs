/*!
Configuration management for the line simulator.
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uartcore::FrameConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub line: LineConfig,
    pub sim: SimConfig,
}

impl AppConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            line: LineConfig::default(),
            sim: SimConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Serial line parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    /// System clock frequency in Hz
    pub clock_hz: u32,

    /// Baud rate; used to derive the divisor when none is given
    pub baud: u32,

    /// Explicit clock-cycles-per-bit divisor; takes precedence over
    /// clock_hz/baud when set
    pub divisor: Option<u32>,

    /// Start bits per frame
    pub start_bits: u32,

    /// Data bits per frame
    pub data_bits: u32,

    /// Stop bits per frame
    pub stop_bits: u32,

    /// Line rests high when true (conventional UART idle)
    pub idle_high: bool,
}

impl LineConfig {
    /// Build the validated engine configuration
    pub fn to_frame_config(&self) -> Result<FrameConfig> {
        let config = match self.divisor {
            Some(divisor) => FrameConfig::new(
                self.start_bits,
                self.data_bits,
                self.stop_bits,
                self.idle_high,
                divisor,
            ),
            None => FrameConfig::from_clock_baud(
                self.clock_hz,
                self.baud,
                self.start_bits,
                self.data_bits,
                self.stop_bits,
                self.idle_high,
            ),
        };
        config.with_context(|| "Invalid line configuration")
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            clock_hz: uartcore::defaults::CLOCK_HZ,
            baud: uartcore::defaults::BAUD,
            divisor: None,
            start_bits: uartcore::defaults::START_BITS,
            data_bits: uartcore::defaults::DATA_BITS,
            stop_bits: uartcore::defaults::STOP_BITS,
            idle_high: uartcore::defaults::IDLE_POLARITY,
        }
    }
}

/// Simulator behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Ticks the consumer waits after a word completes before asserting ready
    pub consumer_latency_ticks: u32,

    /// Report progress every this many completed words (0 disables)
    pub stats_interval_words: u64,

    /// Channel buffer size for the stream feeder thread
    pub channel_buffer_size: usize,

    /// Print final statistics as JSON to stdout
    pub json_stats: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            consumer_latency_ticks: 0,
            stats_interval_words: 1000,
            channel_buffer_size: 1000,
            json_stats: false,
        }
    }
}
