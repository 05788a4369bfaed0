// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Latency and cost aggregation across a prediction batch.
//!
//! Latencies and costs that are zero or negative mean "not measured" and are
//! excluded from their distribution. When every value is excluded the
//! distribution degenerates to a single zero entry rather than computing
//! statistics over an empty sequence.

use crate::schema::ModelPrediction;
use serde::{Deserialize, Serialize};

/// Latency percentiles and cost totals for one evaluation batch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub mean_latency: f64,
    pub median_latency: f64,
    pub p90_latency: f64,
    pub p95_latency: f64,
    pub p99_latency: f64,
    pub max_latency: f64,
    pub total_cost: f64,
    pub mean_cost_per_sample: f64,
}

impl PerformanceMetrics {
    /// Aggregate over every supplied prediction.
    pub fn from_predictions(predictions: &[ModelPrediction]) -> Self {
        let mut latencies: Vec<f64> = predictions
            .iter()
            .map(|p| p.latency)
            .filter(|l| *l > 0.0)
            .collect();
        let costs: Vec<f64> = predictions
            .iter()
            .map(|p| p.cost)
            .filter(|c| *c > 0.0)
            .collect();

        if latencies.is_empty() {
            latencies.push(0.0);
        }
        let costs = if costs.is_empty() { vec![0.0] } else { costs };

        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let total_cost: f64 = costs.iter().sum();
        Self {
            mean_latency: latencies.iter().sum::<f64>() / latencies.len() as f64,
            median_latency: percentile(&latencies, 50.0),
            p90_latency: percentile(&latencies, 90.0),
            p95_latency: percentile(&latencies, 95.0),
            p99_latency: percentile(&latencies, 99.0),
            max_latency: *latencies.last().unwrap_or(&0.0),
            total_cost,
            mean_cost_per_sample: total_cost / costs.len() as f64,
        }
    }
}

/// Linear-interpolation percentile over a sorted, non-empty sequence.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let fraction = rank - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PredictionValue;
    use std::collections::HashMap;

    fn prediction(latency: f64, cost: f64) -> ModelPrediction {
        ModelPrediction {
            sample_id: "s".to_string(),
            prediction: PredictionValue::Boolean(true),
            confidence: 0.9,
            explanation: None,
            sources: vec![],
            latency,
            cost,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn interpolated_percentiles() {
        let sorted: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        assert!((percentile(&sorted, 50.0) - 5.5).abs() < 1e-9);
        assert!((percentile(&sorted, 90.0) - 9.1).abs() < 1e-9);
        assert!((percentile(&sorted, 100.0) - 10.0).abs() < 1e-9);
        assert!((percentile(&sorted, 0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn latency_distribution_over_one_to_ten() {
        let predictions: Vec<ModelPrediction> =
            (1..=10).map(|i| prediction(i as f64, 0.01)).collect();
        let perf = PerformanceMetrics::from_predictions(&predictions);
        assert!((perf.median_latency - 5.5).abs() < 1e-9);
        assert!((perf.p90_latency - 9.1).abs() < 1e-9);
        assert!((perf.mean_latency - 5.5).abs() < 1e-9);
        assert!((perf.max_latency - 10.0).abs() < 1e-9);
        assert!((perf.total_cost - 0.1).abs() < 1e-9);
        assert!((perf.mean_cost_per_sample - 0.01).abs() < 1e-9);
    }

    #[test]
    fn non_positive_values_are_excluded() {
        let predictions = vec![prediction(0.0, 0.0), prediction(2.0, 0.02), prediction(-1.0, 0.0)];
        let perf = PerformanceMetrics::from_predictions(&predictions);
        assert!((perf.mean_latency - 2.0).abs() < 1e-9);
        assert!((perf.total_cost - 0.02).abs() < 1e-9);
        assert!((perf.mean_cost_per_sample - 0.02).abs() < 1e-9);
    }

    #[test]
    fn all_unmeasured_degenerates_to_zero() {
        let predictions = vec![prediction(0.0, 0.0), prediction(0.0, 0.0)];
        let perf = PerformanceMetrics::from_predictions(&predictions);
        assert_eq!(perf.mean_latency, 0.0);
        assert_eq!(perf.p99_latency, 0.0);
        assert_eq!(perf.total_cost, 0.0);
        assert_eq!(perf.mean_cost_per_sample, 0.0);
    }
}
