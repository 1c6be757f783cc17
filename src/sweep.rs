use std::fs;
use std::path::{Path, PathBuf};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::capacity::{capacity_deterministic_service, capacity_random_service};
use crate::config::ChannelConfig;
use crate::output::{write_curve_csv, write_json, write_symbol_log_csv, write_sweep_csv};
use crate::queue::WaitModel;
use crate::sim::SimulationRunner;
use crate::ChannelError;

/// Empirical and closed-form capacity at one arrival rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub lambda: f64,
    pub average_wait: f64,
    pub empirical_bit_error_rate: f64,
    pub estimated_capacity: f64,
    pub random_service_capacity: f64,
    pub deterministic_service_capacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub kappa: f64,
    pub random_seed: u64,
    pub wait_model: WaitModel,
    pub message_symbols: usize,
    pub n_points: usize,
    pub skipped_unstable: usize,
    pub mean_abs_gap_random_service: f64,
    pub peak_estimated: Option<(f64, f64)>,
    pub peak_random_service: Option<(f64, f64)>,
    pub peak_deterministic_service: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResult {
    pub output_dir: PathBuf,
    pub points: Vec<SweepPoint>,
    pub summary: SweepSummary,
}

/// Simulate the configured message at every stable lambda on the grid.
///
/// Grid values at or past the service rate are skipped; everything else
/// that the runner rejects is returned as an error.
pub fn run_sweep<R: Rng + ?Sized>(
    config: &ChannelConfig,
    rng: &mut R,
) -> Result<Vec<SweepPoint>, ChannelError> {
    config.validate()?;

    let grid = config.lambda_grid();
    let mut runner = SimulationRunner::new(config.sim_config());
    let mut points = Vec::with_capacity(grid.len());

    for lambda in grid {
        let result = match runner.run(&config.message, config.params_at(lambda), rng) {
            Ok(result) => result,
            Err(ChannelError::UnstableQueue { .. }) => {
                warn!(lambda, "skipping unstable arrival rate");
                continue;
            }
            Err(err) => return Err(err),
        };

        points.push(SweepPoint {
            lambda,
            average_wait: result.average_wait,
            empirical_bit_error_rate: result.empirical_bit_error_rate,
            estimated_capacity: result.estimated_capacity,
            random_service_capacity: capacity_random_service(lambda, config.kappa),
            deterministic_service_capacity: capacity_deterministic_service(lambda, config.kappa),
        });
    }

    Ok(points)
}

fn peak_by(points: &[SweepPoint], value: impl Fn(&SweepPoint) -> f64) -> Option<(f64, f64)> {
    points
        .iter()
        .map(|point| (point.lambda, value(point)))
        .fold(None, |best, (lambda, v)| match best {
            Some((_, best_v)) if best_v >= v => best,
            _ => Some((lambda, v)),
        })
}

pub fn summarize_sweep(config: &ChannelConfig, points: &[SweepPoint]) -> SweepSummary {
    let mean_abs_gap_random_service = if points.is_empty() {
        0.0
    } else {
        points
            .iter()
            .map(|point| (point.estimated_capacity - point.random_service_capacity).abs())
            .sum::<f64>()
            / points.len() as f64
    };

    SweepSummary {
        kappa: config.kappa,
        random_seed: config.random_seed,
        wait_model: config.wait_model,
        message_symbols: config.message.chars().count(),
        n_points: points.len(),
        skipped_unstable: config.num_lambda.saturating_sub(points.len()),
        mean_abs_gap_random_service,
        peak_estimated: peak_by(points, |p| p.estimated_capacity),
        peak_random_service: peak_by(points, |p| p.random_service_capacity),
        peak_deterministic_service: peak_by(points, |p| p.deterministic_service_capacity),
    }
}

/// Run a seeded sweep and write `sweep.csv`, `curve.csv`, `symbols.csv` and
/// `summary.json` into `output_dir`.
///
/// `symbols.csv` holds the diagnostic log of one extra transmission at the
/// middle stable arrival rate; it is only missing when no grid point is stable.
pub fn run_sweep_into_dir(
    config: &ChannelConfig,
    output_dir: &Path,
) -> Result<SweepResult, ChannelError> {
    config.validate()?;
    fs::create_dir_all(output_dir)?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.random_seed);
    let points = run_sweep(config, &mut rng)?;
    write_sweep_csv(&output_dir.join("sweep.csv"), &points)?;

    let curve = config.curve()?;
    write_curve_csv(&output_dir.join("curve.csv"), &curve)?;

    // one representative transmission at the middle of the simulated points
    if let Some(mid) = points.get(points.len() / 2) {
        let mut runner = SimulationRunner::new(config.sim_config());
        match runner.run(&config.message, config.params_at(mid.lambda), &mut rng) {
            Ok(example) => {
                write_symbol_log_csv(&output_dir.join("symbols.csv"), &example.diagnostic_log)?;
            }
            Err(ChannelError::UnstableQueue { .. }) => {
                warn!(lambda = mid.lambda, "no symbol log for unstable arrival rate");
            }
            Err(err) => return Err(err),
        }
    } else {
        warn!("no stable arrival rate on the grid, symbols.csv not written");
    }

    let summary = summarize_sweep(config, &points);
    write_json(&output_dir.join("summary.json"), &summary)?;

    info!(
        points = points.len(),
        dir = %output_dir.display(),
        "sweep written"
    );

    Ok(SweepResult {
        output_dir: output_dir.to_path_buf(),
        points,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    #[test]
    fn test_sweep_covers_stable_grid() {
        let config = ChannelConfig {
            num_lambda: 5,
            lambda_min: 0.1,
            lambda_max: 0.9,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let points = run_sweep(&config, &mut rng).unwrap();
        assert_eq!(points.len(), 5);
        for point in &points {
            assert_eq!(
                point.random_service_capacity,
                capacity_random_service(point.lambda, config.kappa)
            );
            assert!(point.estimated_capacity <= point.lambda + 1e-12);
        }
    }

    #[test]
    fn test_sweep_skips_unstable_lambda() {
        let config = ChannelConfig {
            num_lambda: 3,
            lambda_min: 0.5,
            lambda_max: 1.5,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let points = run_sweep(&config, &mut rng).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(summarize_sweep(&config, &points).skipped_unstable, 2);
    }

    #[test]
    fn test_sweep_dir_logs_symbols_when_grid_middle_is_unstable() {
        let dir = tempfile::tempdir().unwrap();
        let config = ChannelConfig {
            num_lambda: 3,
            lambda_min: 0.5,
            lambda_max: 1.5,
            ..Default::default()
        };
        let result = run_sweep_into_dir(&config, dir.path()).unwrap();
        assert_eq!(result.points.len(), 1);
        assert_eq!(result.summary.skipped_unstable, 2);

        let symbols = fs::read_to_string(dir.path().join("symbols.csv")).unwrap();
        assert!(symbols.lines().count() > 1);
    }

    #[test]
    fn test_summary_peaks() {
        let config = ChannelConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let points = run_sweep(&config, &mut rng).unwrap();
        let summary = summarize_sweep(&config, &points);
        assert_eq!(summary.n_points, points.len());
        let (lambda, value) = summary.peak_random_service.unwrap();
        assert!(lambda > config.lambda_min && lambda < config.lambda_max);
        assert!(value > 0.0);
    }
}
