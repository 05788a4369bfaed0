// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Multi-class metrics for Stage 2 (verification) over the fixed label set
//! {true, false, unknown}.
//!
//! The critical-error count is the safety signal of this system: a
//! true↔false verdict swap asserts the opposite of the truth, which is far
//! costlier than a benign "unknown" miss.

use crate::schema::Verdict;
use serde::{Deserialize, Serialize};

/// Fixed label order for deterministic output.
pub const VERDICT_LABELS: [Verdict; 3] = [Verdict::True, Verdict::False, Verdict::Unknown];

fn label_index(v: Verdict) -> usize {
    match v {
        Verdict::True => 0,
        Verdict::False => 1,
        Verdict::Unknown => 2,
    }
}

/// One-vs-rest metrics for a single class.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class metrics, keyed by canonical verdict label.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerClassMetrics {
    #[serde(rename = "true")]
    pub true_: ClassMetrics,
    #[serde(rename = "false")]
    pub false_: ClassMetrics,
    pub unknown: ClassMetrics,
}

impl PerClassMetrics {
    pub fn get(&self, label: Verdict) -> &ClassMetrics {
        match label {
            Verdict::True => &self.true_,
            Verdict::False => &self.false_,
            Verdict::Unknown => &self.unknown,
        }
    }

    fn get_mut(&mut self, label: Verdict) -> &mut ClassMetrics {
        match label {
            Verdict::True => &mut self.true_,
            Verdict::False => &mut self.false_,
            Verdict::Unknown => &mut self.unknown,
        }
    }
}

/// One row of the confusion matrix: prediction counts for a ground truth.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ConfusionRow {
    #[serde(rename = "true")]
    pub true_: usize,
    #[serde(rename = "false")]
    pub false_: usize,
    pub unknown: usize,
}

impl ConfusionRow {
    fn get_mut(&mut self, label: Verdict) -> &mut usize {
        match label {
            Verdict::True => &mut self.true_,
            Verdict::False => &mut self.false_,
            Verdict::Unknown => &mut self.unknown,
        }
    }

    pub fn get(&self, label: Verdict) -> usize {
        match label {
            Verdict::True => self.true_,
            Verdict::False => self.false_,
            Verdict::Unknown => self.unknown,
        }
    }
}

/// Full 3×3 confusion matrix; rows = ground truth, columns = prediction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VerdictConfusion {
    #[serde(rename = "true")]
    pub true_: ConfusionRow,
    #[serde(rename = "false")]
    pub false_: ConfusionRow,
    pub unknown: ConfusionRow,
}

impl VerdictConfusion {
    /// Build from (ground truth, prediction) pairs.
    pub fn from_pairs(pairs: &[(Verdict, Verdict)]) -> Self {
        let mut matrix = Self::default();
        for &(truth, pred) in pairs {
            *matrix.row_mut(truth).get_mut(pred) += 1;
        }
        matrix
    }

    pub fn row(&self, truth: Verdict) -> &ConfusionRow {
        match truth {
            Verdict::True => &self.true_,
            Verdict::False => &self.false_,
            Verdict::Unknown => &self.unknown,
        }
    }

    fn row_mut(&mut self, truth: Verdict) -> &mut ConfusionRow {
        match truth {
            Verdict::True => &mut self.true_,
            Verdict::False => &mut self.false_,
            Verdict::Unknown => &mut self.unknown,
        }
    }
}

/// Aggregate multi-class metrics over matched verdict pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictMetrics {
    pub accuracy: f64,
    pub per_class: PerClassMetrics,
    pub confusion_matrix: VerdictConfusion,
    pub total_samples: usize,
}

impl VerdictMetrics {
    /// Compute from (ground truth, prediction) pairs. Predictions must
    /// already be normalized to a verdict (anything unrecognized maps to
    /// `unknown` upstream).
    pub fn from_pairs(pairs: &[(Verdict, Verdict)]) -> Self {
        let total = pairs.len();
        let correct = pairs.iter().filter(|(t, p)| t == p).count();
        let accuracy = if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        };

        let mut per_class = PerClassMetrics::default();
        for label in VERDICT_LABELS {
            let tp = pairs.iter().filter(|(t, p)| *p == label && *t == label).count();
            let fp = pairs.iter().filter(|(t, p)| *p == label && *t != label).count();
            let fn_ = pairs.iter().filter(|(t, p)| *p != label && *t == label).count();

            let precision = safe_div(tp, tp + fp);
            let recall = safe_div(tp, tp + fn_);
            let f1_score = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            let support = pairs.iter().filter(|(t, _)| *t == label).count();

            *per_class.get_mut(label) = ClassMetrics {
                precision,
                recall,
                f1_score,
                support,
            };
        }

        Self {
            accuracy,
            per_class,
            confusion_matrix: VerdictConfusion::from_pairs(pairs),
            total_samples: total,
        }
    }
}

fn safe_div(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// True↔false verdict swaps, the costliest misclassification.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CriticalErrors {
    /// Ground truth "true" predicted "false".
    pub true_marked_false: usize,
    /// Ground truth "false" predicted "true".
    pub false_marked_true: usize,
    pub total_critical_errors: usize,
    pub critical_error_rate: f64,
}

impl CriticalErrors {
    /// Count swaps over (ground truth, prediction) pairs.
    pub fn from_pairs(pairs: &[(Verdict, Verdict)]) -> Self {
        let true_marked_false = pairs
            .iter()
            .filter(|(t, p)| *t == Verdict::True && *p == Verdict::False)
            .count();
        let false_marked_true = pairs
            .iter()
            .filter(|(t, p)| *t == Verdict::False && *p == Verdict::True)
            .count();
        let total_critical_errors = true_marked_false + false_marked_true;
        let critical_error_rate = if pairs.is_empty() {
            0.0
        } else {
            total_critical_errors as f64 / pairs.len() as f64
        };
        Self {
            true_marked_false,
            false_marked_true,
            total_critical_errors,
            critical_error_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_error_counting() {
        // (ground_truth, prediction)
        let pairs = vec![
            (Verdict::True, Verdict::False),
            (Verdict::False, Verdict::True),
            (Verdict::True, Verdict::True),
            (Verdict::Unknown, Verdict::True),
        ];
        let critical = CriticalErrors::from_pairs(&pairs);
        assert_eq!(critical.true_marked_false, 1);
        assert_eq!(critical.false_marked_true, 1);
        assert_eq!(critical.total_critical_errors, 2);
        assert!((critical.critical_error_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_miss_is_not_critical() {
        let pairs = vec![
            (Verdict::True, Verdict::Unknown),
            (Verdict::False, Verdict::Unknown),
            (Verdict::Unknown, Verdict::False),
        ];
        let critical = CriticalErrors::from_pairs(&pairs);
        assert_eq!(critical.total_critical_errors, 0);
        assert_eq!(critical.critical_error_rate, 0.0);
    }

    #[test]
    fn per_class_one_vs_rest() {
        let pairs = vec![
            (Verdict::True, Verdict::True),
            (Verdict::True, Verdict::False),
            (Verdict::False, Verdict::False),
            (Verdict::Unknown, Verdict::Unknown),
        ];
        let metrics = VerdictMetrics::from_pairs(&pairs);
        assert!((metrics.accuracy - 0.75).abs() < 1e-9);

        let true_class = metrics.per_class.get(Verdict::True);
        assert!((true_class.precision - 1.0).abs() < 1e-9);
        assert!((true_class.recall - 0.5).abs() < 1e-9);
        assert_eq!(true_class.support, 2);

        let false_class = metrics.per_class.get(Verdict::False);
        assert!((false_class.precision - 0.5).abs() < 1e-9);
        assert!((false_class.recall - 1.0).abs() < 1e-9);
        assert_eq!(false_class.support, 1);
    }

    #[test]
    fn confusion_matrix_rows_are_ground_truth() {
        let pairs = vec![
            (Verdict::True, Verdict::False),
            (Verdict::True, Verdict::False),
            (Verdict::False, Verdict::Unknown),
        ];
        let matrix = VerdictConfusion::from_pairs(&pairs);
        assert_eq!(matrix.row(Verdict::True).get(Verdict::False), 2);
        assert_eq!(matrix.row(Verdict::False).get(Verdict::Unknown), 1);
        assert_eq!(matrix.row(Verdict::Unknown).get(Verdict::True), 0);
    }

    #[test]
    fn serializes_with_canonical_label_keys() {
        let metrics = VerdictMetrics::from_pairs(&[(Verdict::True, Verdict::True)]);
        let json = serde_json::to_value(&metrics).unwrap();
        assert!(json["per_class"]["true"]["precision"].is_number());
        assert_eq!(json["confusion_matrix"]["true"]["true"], 1);
    }

    #[test]
    fn empty_input_degrades_to_zero() {
        let metrics = VerdictMetrics::from_pairs(&[]);
        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.total_samples, 0);
        assert_eq!(metrics.per_class.get(Verdict::True).f1_score, 0.0);
    }
}
