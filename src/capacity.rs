//! Closed-form capacity model
//!
//! Effective capacity (bits per unit time) of the queue-delayed channel for
//! two service disciplines:
//!
//! * random service ("M/M/1"): alpha = 1 / (1 + kappa),
//!   C = alpha * lambda (1 - lambda) / (1 - alpha lambda)
//! * deterministic unit service ("M/D/1"): alpha = (1 - e^-kappa) / kappa,
//!   C = e^-kappa * lambda (1 - lambda) / (1 - alpha lambda)
//!
//! Both are clamped to 0 at and beyond the stability boundary so that curve
//! consumers get a defined value over the whole lambda axis.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::params::SERVICE_RATE;
use crate::ChannelError;

/// Denominators at or below this are treated as the stability singularity
pub const SINGULARITY_EPSILON: f64 = 1.0e-3;

/// Below this kappa the deterministic discount uses its Taylor series
const SMALL_KAPPA: f64 = 1.0e-4;

/// Largest number of points a capacity curve may hold
pub const MAX_CURVE_POINTS: usize = 1_000_000;

/// Tolerance absorbing float error in span / step
const GRID_TOLERANCE: f64 = 1.0e-6;

/// Points on an evenly stepped grid, as f64 so huge grids do not overflow
pub(crate) fn grid_point_count(span: f64, step: f64) -> f64 {
    (span / step + GRID_TOLERANCE).floor() + 1.0
}

/// Queue service discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueDiscipline {
    /// Exponential service times (M/M/1)
    RandomService,
    /// Fixed unit service time (M/D/1)
    DeterministicService,
}

impl QueueDiscipline {
    pub const ALL: [QueueDiscipline; 2] = [
        QueueDiscipline::RandomService,
        QueueDiscipline::DeterministicService,
    ];

    /// Capacity under this discipline
    pub fn capacity(self, lambda: f64, kappa: f64) -> f64 {
        match self {
            QueueDiscipline::RandomService => capacity_random_service(lambda, kappa),
            QueueDiscipline::DeterministicService => capacity_deterministic_service(lambda, kappa),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QueueDiscipline::RandomService => "M/M/1 (random service)",
            QueueDiscipline::DeterministicService => "M/D/1 (deterministic service)",
        }
    }
}

impl fmt::Display for QueueDiscipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueDiscipline::RandomService => f.write_str("random"),
            QueueDiscipline::DeterministicService => f.write_str("deterministic"),
        }
    }
}

impl FromStr for QueueDiscipline {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "random" | "mm1" | "m/m/1" | "random-service" => Ok(QueueDiscipline::RandomService),
            "deterministic" | "md1" | "m/d/1" | "deterministic-service" => {
                Ok(QueueDiscipline::DeterministicService)
            }
            other => Err(format!(
                "unknown discipline '{other}', expected 'random' or 'deterministic'"
            )),
        }
    }
}

/// Shared tail of both formulas: lambda (1 - lambda) / (1 - alpha lambda), or
/// `None` when the guard trips.
fn queue_throughput(lambda: f64, alpha: f64) -> Option<f64> {
    if !lambda.is_finite() || lambda < 0.0 || lambda >= SERVICE_RATE {
        return None;
    }

    let denom = 1.0 - alpha * lambda;
    if denom <= SINGULARITY_EPSILON {
        return None;
    }

    Some(lambda * (1.0 - lambda) / denom)
}

/// Capacity of the random-service (M/M/1) queue channel.
pub fn capacity_random_service(lambda: f64, kappa: f64) -> f64 {
    if !kappa.is_finite() || kappa < 0.0 {
        return 0.0;
    }

    let alpha = 1.0 / (1.0 + kappa);
    queue_throughput(lambda, alpha)
        .map(|throughput| (alpha * throughput).max(0.0))
        .unwrap_or(0.0)
}

/// Decoherence discount (1 - e^-kappa) / kappa for a unit deterministic service.
///
/// Removable singularity at kappa = 0 (limit 1).
pub fn deterministic_discount(kappa: f64) -> f64 {
    if kappa.abs() < SMALL_KAPPA {
        // 1 - k/2 + k^2/6 - k^3/24
        return 1.0 - kappa / 2.0 + kappa * kappa / 6.0 - kappa * kappa * kappa / 24.0;
    }
    -(-kappa).exp_m1() / kappa
}

/// Capacity of the deterministic-service (M/D/1) queue channel.
pub fn capacity_deterministic_service(lambda: f64, kappa: f64) -> f64 {
    if !kappa.is_finite() || kappa < 0.0 {
        return 0.0;
    }

    let alpha = deterministic_discount(kappa);
    queue_throughput(lambda, alpha)
        .map(|throughput| ((-kappa).exp() * throughput).max(0.0))
        .unwrap_or(0.0)
}

/// One sample of a capacity curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityPoint {
    pub lambda: f64,
    pub random_service: f64,
    pub deterministic_service: f64,
}

impl CapacityPoint {
    pub fn at(lambda: f64, kappa: f64) -> Self {
        Self {
            lambda,
            random_service: capacity_random_service(lambda, kappa),
            deterministic_service: capacity_deterministic_service(lambda, kappa),
        }
    }
}

/// Capacity of both disciplines over an evenly stepped lambda grid.
///
/// Holds only the grid description; every iteration recomputes the points,
/// so the curve can be walked any number of times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityCurve {
    pub kappa: f64,
    pub lambda_min: f64,
    pub lambda_max: f64,
    pub step: f64,
}

impl CapacityCurve {
    /// Grid used for plotting: lambda = 0.01 ..= 0.99 in steps of 0.01
    pub fn plot_default(kappa: f64) -> Self {
        Self {
            kappa,
            lambda_min: 0.01,
            lambda_max: 0.99,
            step: 0.01,
        }
    }

    /// Number of points on the grid
    pub fn len(&self) -> usize {
        let span = self.lambda_max - self.lambda_min;
        if !span.is_finite() || span < 0.0 || !self.step.is_finite() || self.step <= 0.0 {
            return 0;
        }
        let count = grid_point_count(span, self.step);
        if count >= usize::MAX as f64 {
            return usize::MAX;
        }
        count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lambda at grid index `idx`
    pub fn lambda_at(&self, idx: usize) -> f64 {
        self.lambda_min + idx as f64 * self.step
    }

    pub fn iter(&self) -> CapacityCurveIter {
        CapacityCurveIter {
            curve: *self,
            idx: 0,
            len: self.len(),
        }
    }

    pub fn points(&self) -> Vec<CapacityPoint> {
        self.iter().collect()
    }

    /// Lambda on the grid with the largest capacity under `discipline`
    pub fn peak(&self, discipline: QueueDiscipline) -> Option<(f64, f64)> {
        self.iter()
            .map(|point| {
                let value = match discipline {
                    QueueDiscipline::RandomService => point.random_service,
                    QueueDiscipline::DeterministicService => point.deterministic_service,
                };
                (point.lambda, value)
            })
            .fold(None, |best, (lambda, value)| match best {
                Some((_, best_value)) if best_value >= value => best,
                _ => Some((lambda, value)),
            })
    }
}

impl IntoIterator for &CapacityCurve {
    type Item = CapacityPoint;
    type IntoIter = CapacityCurveIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the points of a [`CapacityCurve`]
#[derive(Debug, Clone)]
pub struct CapacityCurveIter {
    curve: CapacityCurve,
    idx: usize,
    len: usize,
}

impl Iterator for CapacityCurveIter {
    type Item = CapacityPoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.len {
            return None;
        }
        let lambda = self.curve.lambda_at(self.idx);
        self.idx += 1;
        Some(CapacityPoint::at(lambda, self.curve.kappa))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.idx;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CapacityCurveIter {}

/// Build a capacity curve for `kappa` over `[lambda_min, lambda_max]`.
pub fn capacity_curve(
    kappa: f64,
    lambda_min: f64,
    lambda_max: f64,
    step: f64,
) -> Result<CapacityCurve, ChannelError> {
    if !kappa.is_finite() || kappa <= 0.0 {
        return Err(ChannelError::InvalidParameter(format!(
            "curve kappa must be finite and > 0, got {kappa}"
        )));
    }

    if !step.is_finite() || step <= 0.0 {
        return Err(ChannelError::InvalidParameter(format!(
            "curve step must be finite and > 0, got {step}"
        )));
    }

    if !lambda_min.is_finite() || !lambda_max.is_finite() || lambda_min < 0.0 {
        return Err(ChannelError::InvalidParameter(
            "curve lambda bounds must be finite and lambda_min >= 0".to_string(),
        ));
    }

    if lambda_max < lambda_min {
        return Err(ChannelError::InvalidParameter(format!(
            "lambda_max ({lambda_max}) must be >= lambda_min ({lambda_min})"
        )));
    }

    let count = grid_point_count(lambda_max - lambda_min, step);
    if count > MAX_CURVE_POINTS as f64 {
        return Err(ChannelError::InvalidParameter(format!(
            "curve step {step} gives {count:.0} points, limit is {MAX_CURVE_POINTS}"
        )));
    }

    Ok(CapacityCurve {
        kappa,
        lambda_min,
        lambda_max,
        step,
    })
}
