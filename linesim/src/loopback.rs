/*!
Lockstep loopback driver.

Wires the transmit engine's line output straight into the receive engine and
advances both one tick at a time, modeling the producer and consumer sides of
the handshakes:

1. Words are offered to the transmit engine as soon as it re-asserts ready,
   so frames go out back to back.
2. The consumer side waits a configurable number of ticks after a word
   completes before asserting ready, which makes overrun/drop behavior
   observable from the CLI.
3. Stream mode feeds bytes from stdin through a bounded channel (one reader
   thread, one simulation loop) and writes completed words to stdout.
*/

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use tracing::{info, warn};
use uartcore::{FrameConfig, RxEngine, RxState, TxEngine};

use crate::config::SimConfig;

/// Counters accumulated over a simulation run
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LoopbackStats {
    pub words_sent: u64,
    pub words_received: u64,
    pub words_dropped: u64,
    pub ticks: u64,
}

/// Tick-lockstep Tx→Rx loopback simulator
pub struct LineSimulator {
    frame: FrameConfig,
    tx: TxEngine,
    rx: RxEngine,
    consumer_latency: u32,
    stats_interval: u64,
}

impl LineSimulator {
    pub fn new(frame: FrameConfig, sim: &SimConfig) -> Self {
        Self {
            frame,
            tx: TxEngine::new(frame),
            rx: RxEngine::new(frame),
            consumer_latency: sim.consumer_latency_ticks,
            stats_interval: sim.stats_interval_words,
        }
    }

    /// Upper bound on the ticks a run may take before it counts as stalled
    ///
    /// Widened to `u64` before multiplying: a derived divisor can approach
    /// `u32::MAX` (high clock, very low baud).
    fn tick_budget(&self, word_count: u64) -> u64 {
        let per_word = (u64::from(self.frame.total_bits()) + 2) * u64::from(self.frame.divisor())
            + u64::from(self.consumer_latency);
        (word_count + 1) * per_word + 100
    }

    /// Drive a batch of words through the loopback
    ///
    /// Returns every word delivered through the consumer handshake, in
    /// completion order, with its drop flag. With a slow consumer some sent
    /// words are overwritten before delivery; those are reported only through
    /// the drop flags and counters.
    pub fn run_words(&mut self, words: &[u32]) -> Result<(Vec<(u32, bool)>, LoopbackStats)> {
        let mut stats = LoopbackStats::default();
        let mut queue = words.iter().copied();
        let mut next = queue.next();
        let mut received = Vec::with_capacity(words.len());
        let mut valid_age = 0u32;
        let budget = self.tick_budget(words.len() as u64);

        while next.is_some()
            || self.tx.busy()
            || self.rx.state() != RxState::Idle
            || self.rx.valid()
        {
            stats.ticks += 1;
            if stats.ticks > budget {
                bail!(
                    "line stalled: {} of {} words delivered after {} ticks",
                    received.len(),
                    words.len(),
                    stats.ticks
                );
            }

            if self.tx.tick(next) {
                stats.words_sent += 1;
                next = queue.next();
            }

            let out_ready = if self.rx.valid() {
                if valid_age >= self.consumer_latency {
                    true
                } else {
                    valid_age += 1;
                    false
                }
            } else {
                valid_age = 0;
                false
            };

            // Combinational wiring: this tick's line level feeds the receiver
            if let Some((word, dropped)) = self.rx.tick(self.tx.line(), out_ready) {
                valid_age = 0;
                stats.words_received += 1;
                if dropped {
                    warn!(word, "word delivered with drop flag set");
                }
                received.push((word, dropped));
                if self.stats_interval > 0 && stats.words_received % self.stats_interval == 0 {
                    info!(
                        "progress: {} words delivered, {} ticks",
                        stats.words_received, stats.ticks
                    );
                }
            }
        }

        let (_, dropped) = self.rx.stats();
        stats.words_dropped = dropped;
        Ok((received, stats))
    }

    /// Stream mode: stdin bytes → loopback → stdout bytes
    ///
    /// A feeder thread reads stdin and hands chunks to the simulation loop
    /// over a bounded channel. Runs until stdin is exhausted and the line has
    /// drained, or the running flag is cleared.
    pub fn run_stream(
        &mut self,
        channel_buffer_size: usize,
        running: Arc<AtomicBool>,
    ) -> Result<LoopbackStats> {
        let (data_tx, data_rx) = bounded::<Vec<u8>>(channel_buffer_size);

        let running_reader = Arc::clone(&running);
        let reader_handle = thread::spawn(move || Self::stdin_reader_thread(data_tx, running_reader));

        let stats = self.stream_loop(data_rx, running);

        // The reader exits on EOF or when the flag clears; a send into the
        // dropped channel also unblocks it.
        let _ = reader_handle.join();
        stats
    }

    /// Feeder thread: stdin chunks into the channel
    fn stdin_reader_thread(data_tx: Sender<Vec<u8>>, running: Arc<AtomicBool>) {
        let mut stdin = std::io::stdin().lock();
        let mut buffer = vec![0u8; 4096];
        while running.load(Ordering::SeqCst) {
            match stdin.read(&mut buffer) {
                Ok(0) => break, // EOF
                Ok(n) => {
                    if data_tx.send(buffer[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("stdin read error: {}", e);
                    break;
                }
            }
        }
    }

    fn stream_loop(
        &mut self,
        data_rx: Receiver<Vec<u8>>,
        running: Arc<AtomicBool>,
    ) -> Result<LoopbackStats> {
        let mut stats = LoopbackStats::default();
        let mut pending: VecDeque<u8> = VecDeque::new();
        let mut valid_age = 0u32;
        let mut disconnected = false;
        let mut stdout = std::io::stdout().lock();
        let mask = self.frame.data_mask() as u32;

        loop {
            // Top up the pending queue without blocking
            while let Ok(chunk) = data_rx.try_recv() {
                pending.extend(chunk);
            }

            let line_active = self.tx.busy() || self.rx.state() != RxState::Idle || self.rx.valid();

            if pending.is_empty() && !line_active {
                if disconnected || !running.load(Ordering::SeqCst) {
                    break;
                }
                // Nothing to simulate; wait for input and re-check the flag
                match data_rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(chunk) => pending.extend(chunk),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => {
                        disconnected = true;
                        continue;
                    }
                }
            }

            if !running.load(Ordering::SeqCst) && pending.is_empty() && !line_active {
                break;
            }

            stats.ticks += 1;

            let next = pending.front().map(|&b| u32::from(b) & mask);
            if self.tx.tick(next) {
                pending.pop_front();
                stats.words_sent += 1;
            }

            let out_ready = if self.rx.valid() {
                if valid_age >= self.consumer_latency {
                    true
                } else {
                    valid_age += 1;
                    false
                }
            } else {
                valid_age = 0;
                false
            };

            if let Some((word, dropped)) = self.rx.tick(self.tx.line(), out_ready) {
                valid_age = 0;
                stats.words_received += 1;
                if dropped {
                    warn!(word, "word delivered with drop flag set");
                }
                stdout
                    .write_all(&[(word & 0xFF) as u8])
                    .context("Failed to write to stdout")?;
                if self.stats_interval > 0 && stats.words_received % self.stats_interval == 0 {
                    stdout.flush().ok();
                }
            }
        }

        stdout.flush().context("Failed to flush stdout")?;
        let (_, dropped) = self.rx.stats();
        stats.words_dropped = dropped;
        Ok(stats)
    }
}
