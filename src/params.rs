//! Channel parameters
//!
//! Arrival and decoherence rates shared by the capacity model and the simulator

use serde::{Deserialize, Serialize};

use crate::ChannelError;

/// Service rate of the single server (unit mean service time)
pub const SERVICE_RATE: f64 = 1.0;

/// Parameters of the queue-delayed channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelParameters {
    /// Symbol arrival rate lambda (stable for lambda < 1)
    pub arrival_rate: f64,
    /// Decoherence rate kappa (> 0)
    pub decoherence_rate: f64,
}

impl ChannelParameters {
    /// Create new channel parameters
    pub fn new(arrival_rate: f64, decoherence_rate: f64) -> Self {
        Self {
            arrival_rate,
            decoherence_rate,
        }
    }

    /// Reject values outside the model's domain
    pub fn validate(&self) -> Result<(), ChannelError> {
        if !self.decoherence_rate.is_finite() || self.decoherence_rate <= 0.0 {
            return Err(ChannelError::InvalidParameter(format!(
                "decoherence rate must be finite and > 0, got {}",
                self.decoherence_rate
            )));
        }

        if !self.arrival_rate.is_finite() || self.arrival_rate < 0.0 {
            return Err(ChannelError::InvalidParameter(format!(
                "arrival rate must be finite and >= 0, got {}",
                self.arrival_rate
            )));
        }

        Ok(())
    }

    /// Fail with `UnstableQueue` once arrivals reach the service rate
    pub fn check_stable(&self) -> Result<(), ChannelError> {
        if self.arrival_rate >= SERVICE_RATE {
            return Err(ChannelError::UnstableQueue {
                arrival_rate: self.arrival_rate,
                service_rate: SERVICE_RATE,
            });
        }
        Ok(())
    }

    /// Server utilisation rho = lambda / mu
    pub fn utilization(&self) -> f64 {
        self.arrival_rate / SERVICE_RATE
    }
}

impl Default for ChannelParameters {
    fn default() -> Self {
        Self::new(0.5, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid_and_stable() {
        let params = ChannelParameters::default();
        assert!(params.validate().is_ok());
        assert!(params.check_stable().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_kappa() {
        assert!(matches!(
            ChannelParameters::new(0.3, 0.0).validate(),
            Err(ChannelError::InvalidParameter(_))
        ));
        assert!(matches!(
            ChannelParameters::new(0.3, -1.0).validate(),
            Err(ChannelError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rejects_negative_or_nan_lambda() {
        assert!(ChannelParameters::new(-0.1, 1.0).validate().is_err());
        assert!(ChannelParameters::new(f64::NAN, 1.0).validate().is_err());
    }

    #[test]
    fn test_unstable_at_service_rate() {
        let params = ChannelParameters::new(1.0, 1.0);
        assert!(params.validate().is_ok());
        assert!(matches!(
            params.check_stable(),
            Err(ChannelError::UnstableQueue { .. })
        ));
    }
}
