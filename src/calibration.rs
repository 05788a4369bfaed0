// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Confidence calibration for Stage 2 predictions.
//!
//! Predictions are binned into five confidence ranges on [0.5, 1.0).
//! Confidence below 0.5 is treated as "not attempting calibrated confidence"
//! and never binned; such predictions still count in the ECE denominator,
//! which therefore shrinks ECE when many low-confidence predictions exist.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bin boundaries. Each bin is half-open: `[low, high)`.
const BIN_EDGES: [f64; 6] = [0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// One confidence bin's calibration summary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationBin {
    /// Mean model-reported confidence in this bin.
    pub expected: f64,
    /// Fraction of correct predictions in this bin.
    pub actual: f64,
    pub samples: usize,
    /// `|expected - actual|`.
    pub calibration_error: f64,
}

/// Calibration report: per-bin detail plus Expected Calibration Error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub expected_calibration_error: f64,
    /// Non-empty bins keyed by range, e.g. `"0.5-0.6"`.
    pub calibration_by_bin: BTreeMap<String, CalibrationBin>,
}

impl CalibrationReport {
    /// Compute calibration from (confidence, correct) pairs.
    pub fn from_pairs(pairs: &[(f64, bool)]) -> Self {
        let mut calibration_by_bin = BTreeMap::new();
        let mut weighted_error = 0.0;

        for window in BIN_EDGES.windows(2) {
            let (low, high) = (window[0], window[1]);
            let in_bin: Vec<&(f64, bool)> = pairs
                .iter()
                .filter(|(conf, _)| *conf >= low && *conf < high)
                .collect();
            if in_bin.is_empty() {
                continue;
            }

            let expected =
                in_bin.iter().map(|(conf, _)| conf).sum::<f64>() / in_bin.len() as f64;
            let actual = in_bin.iter().filter(|(_, correct)| *correct).count() as f64
                / in_bin.len() as f64;
            let calibration_error = (expected - actual).abs();
            weighted_error += calibration_error * in_bin.len() as f64;

            calibration_by_bin.insert(
                format!("{low:.1}-{high:.1}"),
                CalibrationBin {
                    expected,
                    actual,
                    samples: in_bin.len(),
                    calibration_error,
                },
            );
        }

        // Denominator is the full prediction count, unbinned ones included.
        let expected_calibration_error = if pairs.is_empty() {
            0.0
        } else {
            weighted_error / pairs.len() as f64
        };

        Self {
            expected_calibration_error,
            calibration_by_bin,
        }
    }
}
