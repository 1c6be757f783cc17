use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use crate::capacity::{capacity_curve, grid_point_count, CapacityCurve, MAX_CURVE_POINTS};
use crate::params::{ChannelParameters, SERVICE_RATE};
use crate::queue::WaitModel;
use crate::sim::SimConfig;
use crate::ChannelError;

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    #[serde_as(as = "DefaultOnNull")]
    pub kappa: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub lambda_min: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub lambda_max: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub num_lambda: usize,
    #[serde_as(as = "DefaultOnNull")]
    pub curve_step: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub message: String,
    #[serde_as(as = "DefaultOnNull")]
    pub random_seed: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub wait_model: WaitModel,
    #[serde_as(as = "DefaultOnNull")]
    pub diagnostic_head: usize,
    #[serde_as(as = "DefaultOnNull")]
    pub max_log_entries: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        let sim = SimConfig::default();
        Self {
            kappa: 0.5,
            lambda_min: 0.05,
            lambda_max: 0.95,
            num_lambda: 19,
            curve_step: 0.01,
            message: "QUEUE-DELAYED DECOHERENCE CHANNEL".to_string(),
            random_seed: 0x0DEC_2026_0001_u64,
            wait_model: sim.wait_model,
            diagnostic_head: sim.diagnostic_head,
            max_log_entries: sim.max_log_entries,
        }
    }
}

impl ChannelConfig {
    /// Load from a `.toml` file, anything else is parsed as JSON
    pub fn load(path: &Path) -> Result<Self, ChannelError> {
        let raw = fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let config: ChannelConfig = if is_toml {
            toml::from_str(&raw)?
        } else {
            serde_json::from_str(&raw)?
        };
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChannelError> {
        if !self.kappa.is_finite() || self.kappa <= 0.0 {
            return Err(ChannelError::InvalidConfig(
                "kappa must be finite and greater than zero".to_string(),
            ));
        }

        if self.num_lambda == 0 {
            return Err(ChannelError::InvalidConfig(
                "num_lambda must be greater than zero".to_string(),
            ));
        }

        if !self.lambda_min.is_finite() || !self.lambda_max.is_finite() {
            return Err(ChannelError::InvalidConfig(
                "lambda_min and lambda_max must be finite".to_string(),
            ));
        }

        if self.lambda_min < 0.0 {
            return Err(ChannelError::InvalidConfig(
                "lambda_min must be non-negative".to_string(),
            ));
        }

        if self.lambda_max < self.lambda_min {
            return Err(ChannelError::InvalidConfig(
                "lambda_max must be greater than or equal to lambda_min".to_string(),
            ));
        }

        if self.lambda_min >= SERVICE_RATE {
            return Err(ChannelError::InvalidConfig(
                "lambda_min must be below the service rate".to_string(),
            ));
        }

        if !self.curve_step.is_finite() || self.curve_step <= 0.0 {
            return Err(ChannelError::InvalidConfig(
                "curve_step must be finite and greater than zero".to_string(),
            ));
        }

        if grid_point_count(self.curve_lambda_max(), self.curve_step) > MAX_CURVE_POINTS as f64 {
            return Err(ChannelError::InvalidConfig(format!(
                "curve_step {} yields more than {MAX_CURVE_POINTS} curve points",
                self.curve_step
            )));
        }

        if self.wait_model == WaitModel::EventChained && self.lambda_min <= 0.0 {
            return Err(ChannelError::InvalidConfig(
                "event-chained wait model needs lambda_min > 0".to_string(),
            ));
        }

        if self.message.is_empty() {
            return Err(ChannelError::InvalidConfig(
                "message must not be empty".to_string(),
            ));
        }

        if self.max_log_entries < self.diagnostic_head {
            return Err(ChannelError::InvalidConfig(
                "max_log_entries must be at least diagnostic_head".to_string(),
            ));
        }

        Ok(())
    }

    /// Evenly spaced arrival rates from `lambda_min` to `lambda_max`; points at
    /// or past the service rate are left in and skipped by the sweep.
    pub fn lambda_grid(&self) -> Vec<f64> {
        if self.num_lambda == 1 {
            return vec![self.lambda_min];
        }

        let span = self.lambda_max - self.lambda_min;
        let denom = (self.num_lambda - 1) as f64;

        (0..self.num_lambda)
            .map(|idx| self.lambda_min + span * idx as f64 / denom)
            .collect()
    }

    pub fn sim_config(&self) -> SimConfig {
        SimConfig {
            wait_model: self.wait_model,
            diagnostic_head: self.diagnostic_head,
            max_log_entries: self.max_log_entries,
            ..SimConfig::default()
        }
    }

    pub fn params_at(&self, lambda: f64) -> ChannelParameters {
        ChannelParameters::new(lambda, self.kappa)
    }

    fn curve_lambda_max(&self) -> f64 {
        (SERVICE_RATE - self.curve_step).max(0.0)
    }

    /// Capacity curve over [0, 1) at `curve_step`
    pub fn curve(&self) -> Result<CapacityCurve, ChannelError> {
        capacity_curve(self.kappa, 0.0, self.curve_lambda_max(), self.curve_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ChannelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_lambda_grid_endpoints() {
        let config = ChannelConfig::default();
        let grid = config.lambda_grid();
        assert_eq!(grid.len(), 19);
        assert!((grid[0] - 0.05).abs() < 1e-12);
        assert!((grid[18] - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_single_point_grid() {
        let config = ChannelConfig {
            num_lambda: 1,
            ..Default::default()
        };
        assert_eq!(config.lambda_grid(), vec![0.05]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            ChannelConfig {
                kappa: 0.0,
                ..Default::default()
            },
            ChannelConfig {
                num_lambda: 0,
                ..Default::default()
            },
            ChannelConfig {
                lambda_min: 0.8,
                lambda_max: 0.2,
                ..Default::default()
            },
            ChannelConfig {
                curve_step: -0.1,
                ..Default::default()
            },
            ChannelConfig {
                curve_step: 1.0e-30,
                ..Default::default()
            },
            ChannelConfig {
                wait_model: WaitModel::EventChained,
                lambda_min: 0.0,
                ..Default::default()
            },
            ChannelConfig {
                message: String::new(),
                ..Default::default()
            },
            ChannelConfig {
                diagnostic_head: 10,
                max_log_entries: 4,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(ChannelError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let raw = "kappa = 2.0\nwait_model = \"event-chained\"\n";
        let config: ChannelConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.kappa, 2.0);
        assert_eq!(config.wait_model, WaitModel::EventChained);
        assert_eq!(config.num_lambda, ChannelConfig::default().num_lambda);
    }

    #[test]
    fn test_json_null_falls_back_to_default() {
        let raw = r#"{"kappa": null, "num_lambda": 5}"#;
        let config: ChannelConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.kappa, ChannelConfig::default().kappa);
        assert_eq!(config.num_lambda, 5);
    }

    #[test]
    fn test_valid_config_builds_its_curve() {
        let config = ChannelConfig {
            curve_step: 1.0e-6,
            wait_model: WaitModel::EventChained,
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.curve().unwrap().len(), 1_000_000);
    }

    #[test]
    fn test_curve_stays_below_service_rate() {
        let curve = ChannelConfig::default().curve().unwrap();
        let points = curve.points();
        assert_eq!(points.len(), 100);
        assert!(points.iter().all(|p| p.lambda < SERVICE_RATE));
    }
}
