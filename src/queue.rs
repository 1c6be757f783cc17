//! Queue wait-time sampling
//!
//! Single-server FIFO queue with Poisson arrivals at rate lambda and unit
//! service rate. Two ways to obtain a symbol's wait:
//!
//! * [`sample_wait_time`]: independent draw from the steady-state sojourn
//!   distribution, Exponential(mu - lambda).
//! * [`EventChainedQueue`]: explicit arrival/departure chaining, where each
//!   symbol's service start depends on the previous symbol's departure.

use std::fmt;
use std::str::FromStr;

use rand::distributions::Open01;
use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};

use crate::params::SERVICE_RATE;
use crate::ChannelError;

/// Draw one steady-state sojourn time.
///
/// wait = -ln(u) / (mu - lambda), u ~ U(0, 1)
///
/// The caller must ensure `lambda < SERVICE_RATE`.
pub fn sample_wait_time<R: Rng + ?Sized>(lambda: f64, rng: &mut R) -> f64 {
    debug_assert!(lambda < SERVICE_RATE, "unstable queue: lambda >= mu");
    let u: f64 = rng.sample(Open01);
    -u.ln() / (SERVICE_RATE - lambda)
}

/// Discrete-event FIFO queue that chains arrivals and departures
#[derive(Debug, Clone)]
pub struct EventChainedQueue {
    inter_arrival: Exp<f64>,
    service: Exp<f64>,
    /// Arrival time of the most recent symbol
    clock: f64,
    /// Departure time of the most recent symbol
    last_departure: f64,
    served: usize,
}

impl EventChainedQueue {
    /// Create an empty queue with arrival rate `lambda`
    pub fn new(lambda: f64) -> Result<Self, ChannelError> {
        if !lambda.is_finite() || lambda <= 0.0 {
            return Err(ChannelError::InvalidParameter(format!(
                "event-chained queue needs a positive arrival rate, got {lambda}"
            )));
        }

        let inter_arrival = Exp::new(lambda)
            .map_err(|err| ChannelError::InvalidParameter(format!("arrival rate: {err}")))?;
        let service = Exp::new(SERVICE_RATE)
            .map_err(|err| ChannelError::InvalidParameter(format!("service rate: {err}")))?;

        Ok(Self {
            inter_arrival,
            service,
            clock: 0.0,
            last_departure: 0.0,
            served: 0,
        })
    }

    /// Admit the next symbol and return how long it waits for the server
    pub fn next_wait<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        self.clock += self.inter_arrival.sample(rng);

        let arrival = self.clock;
        let service_start = arrival.max(self.last_departure);
        let wait = service_start - arrival;

        self.last_departure = service_start + self.service.sample(rng);
        self.served += 1;

        wait
    }

    /// Number of symbols admitted so far
    pub fn served(&self) -> usize {
        self.served
    }

    /// Current simulation time (latest arrival)
    pub fn clock(&self) -> f64 {
        self.clock
    }
}

/// How a run obtains per-symbol wait times
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitModel {
    /// Independent steady-state sojourn samples
    #[default]
    SteadyState,
    /// Arrival/departure chaining through [`EventChainedQueue`]
    EventChained,
}

impl WaitModel {
    /// Build the per-run wait source for arrival rate `lambda`
    pub fn sampler(self, lambda: f64) -> Result<WaitSampler, ChannelError> {
        match self {
            WaitModel::SteadyState => Ok(WaitSampler::SteadyState { lambda }),
            WaitModel::EventChained => Ok(WaitSampler::EventChained(EventChainedQueue::new(
                lambda,
            )?)),
        }
    }
}

impl fmt::Display for WaitModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitModel::SteadyState => f.write_str("steady-state"),
            WaitModel::EventChained => f.write_str("event-chained"),
        }
    }
}

impl FromStr for WaitModel {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "steady-state" | "steady_state" | "steady" => Ok(WaitModel::SteadyState),
            "event-chained" | "event_chained" | "chained" => Ok(WaitModel::EventChained),
            other => Err(format!(
                "unknown wait model '{other}', expected 'steady-state' or 'event-chained'"
            )),
        }
    }
}

/// Stateful wait source for a single run
#[derive(Debug, Clone)]
pub enum WaitSampler {
    SteadyState { lambda: f64 },
    EventChained(EventChainedQueue),
}

impl WaitSampler {
    pub fn next_wait<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        match self {
            WaitSampler::SteadyState { lambda } => sample_wait_time(*lambda, rng),
            WaitSampler::EventChained(queue) => queue.next_wait(rng),
        }
    }
}
