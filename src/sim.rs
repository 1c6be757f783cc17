//! Transmission harness
//!
//! Pushes a message through the queue-delayed channel one character at a
//! time: draw a wait, turn it into a flip probability, corrupt the eight
//! bits of the symbol, then aggregate wait, bit-error rate and an
//! entropy-based capacity estimate.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::capacity::capacity_random_service;
use crate::noise::{binary_entropy, flip_probability};
use crate::params::ChannelParameters;
use crate::queue::WaitModel;
use crate::ChannelError;

/// Bits carried by one symbol
pub const BITS_PER_SYMBOL: u32 = 8;

/// Runner configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub wait_model: WaitModel,
    /// Leading symbols always kept in the diagnostic log
    pub diagnostic_head: usize,
    /// Hard cap on diagnostic log entries
    pub max_log_entries: usize,
    /// Glyph written in place of a corrupted character
    pub placeholder: char,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            wait_model: WaitModel::SteadyState,
            diagnostic_head: 3,
            max_log_entries: 64,
            placeholder: char::REPLACEMENT_CHARACTER,
        }
    }
}

/// Per-symbol outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub index: usize,
    pub wait_time: f64,
    pub flip_probability: f64,
    pub bit_errors: u32,
    pub corrupted: bool,
    /// XOR pattern applied to the symbol's low byte
    pub flip_mask: u8,
}

/// Aggregate outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub params: ChannelParameters,
    pub wait_model: WaitModel,
    pub received_text: String,
    pub symbols: usize,
    pub total_bit_errors: u64,
    pub average_wait: f64,
    pub empirical_bit_error_rate: f64,
    pub average_flip_probability: f64,
    pub estimated_capacity: f64,
    /// Symbols that had at least one bit flipped
    pub corrupted_symbols: usize,
    /// Closed-form random-service capacity at the same (lambda, kappa)
    pub theoretical_capacity: f64,
    pub diagnostic_log: Vec<SymbolRecord>,
}

/// Where a runner is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Initializing,
    PerSymbol(usize),
    Aggregating,
    Done,
    Aborted,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Aborted)
    }
}

#[derive(Debug, Default, Clone)]
struct TransmissionStats {
    symbols: usize,
    total_wait: f64,
    total_flip_probability: f64,
    bit_errors: u64,
    corrupted: usize,
}

impl TransmissionStats {
    fn observe(&mut self, record: &SymbolRecord) {
        self.symbols += 1;
        self.total_wait += record.wait_time;
        self.total_flip_probability += record.flip_probability;
        self.bit_errors += u64::from(record.bit_errors);
        if record.corrupted {
            self.corrupted += 1;
        }
    }

    fn average_wait(&self) -> f64 {
        if self.symbols == 0 {
            return 0.0;
        }
        self.total_wait / self.symbols as f64
    }

    fn average_flip_probability(&self) -> f64 {
        if self.symbols == 0 {
            return 0.0;
        }
        self.total_flip_probability / self.symbols as f64
    }

    fn bit_error_rate(&self) -> f64 {
        let bits = self.symbols as u64 * u64::from(BITS_PER_SYMBOL);
        if bits == 0 {
            return 0.0;
        }
        self.bit_errors as f64 / bits as f64
    }
}

/// Drives one message through the channel
#[derive(Debug, Clone)]
pub struct SimulationRunner {
    config: SimConfig,
    phase: RunPhase,
}

impl SimulationRunner {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            phase: RunPhase::Initializing,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Transmit `message` and aggregate the outcome.
    ///
    /// Fails before touching the RNG if the parameters are out of range or
    /// the queue is unstable. An empty message yields zero symbols, zero wait
    /// and error rate, and an estimated capacity of lambda.
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        message: &str,
        params: ChannelParameters,
        rng: &mut R,
    ) -> Result<SimulationResult, ChannelError> {
        self.phase = RunPhase::Initializing;

        let mut sampler = match params
            .validate()
            .and_then(|()| params.check_stable())
            .and_then(|()| self.config.wait_model.sampler(params.arrival_rate))
        {
            Ok(sampler) => sampler,
            Err(err) => {
                self.phase = RunPhase::Aborted;
                debug!("simulation aborted: {err}");
                return Err(err);
            }
        };

        let kappa = params.decoherence_rate;
        let mut stats = TransmissionStats::default();
        let mut received_text = String::with_capacity(message.len());
        let mut diagnostic_log = Vec::new();

        for (index, symbol) in message.chars().enumerate() {
            self.phase = RunPhase::PerSymbol(index);

            let wait_time = sampler.next_wait(rng);
            let p = flip_probability(wait_time, kappa);

            let mut flip_mask = 0_u8;
            for bit in 0..BITS_PER_SYMBOL {
                if rng.gen::<f64>() < p {
                    flip_mask |= 1 << bit;
                }
            }

            let record = SymbolRecord {
                index,
                wait_time,
                flip_probability: p,
                bit_errors: flip_mask.count_ones(),
                corrupted: flip_mask != 0,
                flip_mask,
            };

            trace!(
                index,
                wait = record.wait_time,
                p = record.flip_probability,
                bit_errors = record.bit_errors,
                "symbol transmitted"
            );

            received_text.push(if record.corrupted {
                self.config.placeholder
            } else {
                symbol
            });

            stats.observe(&record);

            let keep = index < self.config.diagnostic_head || record.corrupted;
            if keep && diagnostic_log.len() < self.config.max_log_entries {
                diagnostic_log.push(record);
            }
        }

        self.phase = RunPhase::Aggregating;

        let lambda = params.arrival_rate;
        let average_flip_probability = stats.average_flip_probability();
        let result = SimulationResult {
            params,
            wait_model: self.config.wait_model,
            received_text,
            symbols: stats.symbols,
            total_bit_errors: stats.bit_errors,
            average_wait: stats.average_wait(),
            empirical_bit_error_rate: stats.bit_error_rate(),
            average_flip_probability,
            estimated_capacity: lambda * (1.0 - binary_entropy(average_flip_probability)),
            corrupted_symbols: stats.corrupted,
            theoretical_capacity: capacity_random_service(lambda, kappa),
            diagnostic_log,
        };

        debug!(
            symbols = result.symbols,
            bit_errors = result.total_bit_errors,
            ber = result.empirical_bit_error_rate,
            avg_wait = result.average_wait,
            capacity = result.estimated_capacity,
            "transmission complete"
        );

        self.phase = RunPhase::Done;
        Ok(result)
    }
}

impl Default for SimulationRunner {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

/// Transmit `message` at arrival rate `lambda` and decoherence rate `kappa`
/// with the default runner configuration.
pub fn run<R: Rng + ?Sized>(
    message: &str,
    lambda: f64,
    kappa: f64,
    rng: &mut R,
) -> Result<SimulationResult, ChannelError> {
    SimulationRunner::default().run(message, ChannelParameters::new(lambda, kappa), rng)
}
