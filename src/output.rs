use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::Writer;
use serde::Serialize;

use crate::capacity::CapacityCurve;
use crate::sim::SymbolRecord;
use crate::sweep::SweepPoint;
use crate::ChannelError;

/// Create `<root>/<UTC timestamp>` (suffixed if it already exists).
///
/// The root comes from the caller (the CLI `--outdir`, tests use a tempdir)
/// rather than a fixed output folder.
pub fn create_timestamped_output_dir(output_root: &Path) -> Result<PathBuf, ChannelError> {
    fs::create_dir_all(output_root)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = output_root.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = output_root.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn fmt_f64(value: f64) -> String {
    format!("{value:.10}")
}

pub fn write_curve_csv(path: &Path, curve: &CapacityCurve) -> Result<(), ChannelError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "lambda",
        "kappa",
        "random_service_capacity",
        "deterministic_service_capacity",
    ])?;

    for point in curve {
        writer.write_record([
            fmt_f64(point.lambda),
            fmt_f64(curve.kappa),
            fmt_f64(point.random_service),
            fmt_f64(point.deterministic_service),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_sweep_csv(path: &Path, points: &[SweepPoint]) -> Result<(), ChannelError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "lambda",
        "average_wait",
        "empirical_ber",
        "estimated_capacity",
        "random_service_capacity",
        "deterministic_service_capacity",
    ])?;

    for point in points {
        writer.write_record([
            fmt_f64(point.lambda),
            fmt_f64(point.average_wait),
            fmt_f64(point.empirical_bit_error_rate),
            fmt_f64(point.estimated_capacity),
            fmt_f64(point.random_service_capacity),
            fmt_f64(point.deterministic_service_capacity),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_symbol_log_csv(path: &Path, records: &[SymbolRecord]) -> Result<(), ChannelError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "index",
        "wait_time",
        "flip_probability",
        "bit_errors",
        "corrupted",
        "flip_mask",
    ])?;

    for record in records {
        writer.write_record([
            record.index.to_string(),
            fmt_f64(record.wait_time),
            fmt_f64(record.flip_probability),
            record.bit_errors.to_string(),
            record.corrupted.to_string(),
            format!("{:08b}", record.flip_mask),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ChannelError> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::capacity_curve;

    #[test]
    fn test_curve_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.csv");
        let curve = capacity_curve(0.5, 0.0, 0.9, 0.1).unwrap();
        write_curve_csv(&path, &curve).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 1 + curve.len());
        assert!(lines[0].starts_with("lambda,kappa"));
    }

    #[test]
    fn test_symbol_log_csv_mask_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symbols.csv");
        let record = SymbolRecord {
            index: 4,
            wait_time: 1.5,
            flip_probability: 0.25,
            bit_errors: 2,
            corrupted: true,
            flip_mask: 0b0000_0101,
        };
        write_symbol_log_csv(&path, &[record]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.lines().nth(1).unwrap().ends_with("2,true,00000101"));
    }

    #[test]
    fn test_timestamped_dirs_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let first = create_timestamped_output_dir(root.path()).unwrap();
        let second = create_timestamped_output_dir(root.path()).unwrap();
        assert_ne!(first, second);
        assert!(first.is_dir() && second.is_dir());
    }
}
