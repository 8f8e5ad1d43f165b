/*!
# Line Simulator

Tick-accurate loopback simulator for the `uartcore` bit-serial framing
engines. Drives a transmit and a receive engine in lockstep over a shared
line, one clock tick at a time.

## Usage

### Loopback a text payload
```bash
linesim loopback --text "hello"
```

### Loopback explicit words with a slow consumer
```bash
linesim loopback --hex "01 02 03" --latency 500
```

### Stream mode (stdin → line → stdout)
```bash
printf 'abc' | linesim stream
```

### Generate a configuration file
```bash
linesim config --output linesim.toml
```
*/

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod config;
mod loopback;

use config::AppConfig;
use loopback::LineSimulator;

#[derive(Parser)]
#[command(name = "linesim")]
#[command(about = "Tick-accurate serial line loopback simulator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, default_value = "linesim.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch of words through the Tx→Rx loopback
    Loopback {
        /// Text payload; each byte becomes one data word
        #[arg(short, long)]
        text: Option<String>,

        /// Whitespace-separated hex words (overrides --text)
        #[arg(long)]
        hex: Option<String>,

        /// Override the clock-cycles-per-bit divisor
        #[arg(long)]
        divisor: Option<u32>,

        /// Override the consumer latency in ticks
        #[arg(long)]
        latency: Option<u32>,

        /// Print final statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stream stdin bytes through the line to stdout
    Stream {
        /// Override the clock-cycles-per-bit divisor
        #[arg(long)]
        divisor: Option<u32>,

        /// Override the consumer latency in ticks
        #[arg(long)]
        latency: Option<u32>,
    },

    /// Generate configuration file
    Config {
        /// Output path for configuration file
        #[arg(short, long, default_value = "linesim.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Stream mode keeps stdout clean for the byte stream; suppress logging
    let is_stream_mode = matches!(cli.command, Some(Commands::Stream { .. }));

    if !is_stream_mode {
        // Initialize logging to stderr to keep stdout clean for results
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Some(Commands::Loopback {
            text,
            hex,
            divisor,
            latency,
            json,
        }) => run_loopback(cli.config, text, hex, divisor, latency, json),

        Some(Commands::Stream { divisor, latency }) => run_stream(cli.config, divisor, latency),

        Some(Commands::Config { output }) => generate_config_file(output),

        None => {
            // Default action: loopback with the built-in payload
            run_loopback(cli.config, None, None, None, None, false)
        }
    }
}

/// Load the application config, falling back to defaults when the file is absent
fn load_config(path: &PathBuf) -> AppConfig {
    if path.exists() {
        AppConfig::load_from_file(path).unwrap_or_else(|e| {
            eprintln!("⚠️ Failed to load config ({e:#}), using defaults");
            AppConfig::new()
        })
    } else {
        AppConfig::new()
    }
}

/// Run a batch of words through the loopback and report the outcome
fn run_loopback(
    config_path: PathBuf,
    text: Option<String>,
    hex: Option<String>,
    divisor: Option<u32>,
    latency: Option<u32>,
    json: bool,
) -> Result<()> {
    let mut app = load_config(&config_path);
    if divisor.is_some() {
        app.line.divisor = divisor;
    }
    if let Some(latency) = latency {
        app.sim.consumer_latency_ticks = latency;
    }

    let frame = app.line.to_frame_config()?;
    let words = parse_words(text, hex, frame.data_mask() as u32)?;

    println!("🚀 Starting loopback run");
    println!(
        "📡 Framing: {} start / {} data / {} stop, idle {}, divisor {}",
        frame.start_bits(),
        frame.data_bits(),
        frame.stop_bits(),
        if frame.idle_polarity() { "high" } else { "low" },
        frame.divisor()
    );

    let mut simulator = LineSimulator::new(frame, &app.sim);
    let (received, stats) = simulator.run_words(&words)?;

    for (word, dropped) in &received {
        if *dropped {
            println!("  0x{word:02x} (dropped predecessor)");
        } else {
            println!("  0x{word:02x}");
        }
    }

    let json = json_stats_enabled(json, &app.sim);
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("📊 Final stats:");
        println!("   Words sent: {}", stats.words_sent);
        println!("   Words delivered: {}", stats.words_received);
        println!("   Words dropped: {}", stats.words_dropped);
        println!("   Ticks: {}", stats.ticks);
    }
    println!("✅ Loopback run completed");
    Ok(())
}

/// Run stream mode until stdin is exhausted or Ctrl+C
fn run_stream(config_path: PathBuf, divisor: Option<u32>, latency: Option<u32>) -> Result<()> {
    let mut app = load_config(&config_path);
    if divisor.is_some() {
        app.line.divisor = divisor;
    }
    if let Some(latency) = latency {
        app.sim.consumer_latency_ticks = latency;
    }
    let frame = app.line.to_frame_config()?;

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        eprintln!("\n🛑 Received Ctrl+C, shutting down gracefully...");
        running_handler.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;

    let mut simulator = LineSimulator::new(frame, &app.sim);
    let stats = simulator.run_stream(app.sim.channel_buffer_size, running)?;

    eprintln!(
        "📊 Stream stats: {} sent, {} delivered, {} dropped, {} ticks",
        stats.words_sent, stats.words_received, stats.words_dropped, stats.ticks
    );
    Ok(())
}

/// JSON stats output: the CLI flag or the configured default
fn json_stats_enabled(cli_flag: bool, sim: &config::SimConfig) -> bool {
    cli_flag || sim.json_stats
}

/// Build the word batch from the CLI payload arguments
fn parse_words(text: Option<String>, hex: Option<String>, mask: u32) -> Result<Vec<u32>> {
    if let Some(hex) = hex {
        return hex
            .split_whitespace()
            .map(|token| {
                u32::from_str_radix(token, 16)
                    .map(|w| w & mask)
                    .with_context(|| format!("Invalid hex word: {token}"))
            })
            .collect();
    }
    let payload = text.unwrap_or_else(|| "hello, line".to_string());
    Ok(payload.bytes().map(|b| u32::from(b) & mask).collect())
}

/// Generate a default configuration file
fn generate_config_file(output_path: PathBuf) -> Result<()> {
    let config = AppConfig::new();
    config.save_to_file(&output_path)?;

    println!("✅ Generated configuration file: {}", output_path.display());
    println!("📝 Edit the file to customize settings, then run:");
    println!("   linesim loopback --config {}", output_path.display());

    Ok(())
}
