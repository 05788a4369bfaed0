// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Binary classification metrics for Stage 1 (claim detection).
//!
//! All derived rates are zero-safe: a zero denominator yields 0.0, never a
//! panic or NaN, so a report is fully populated even for degenerate inputs.

use crate::schema::Stage1Sample;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Confusion counts for binary claim detection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BinaryCounts {
    /// Correctly detected claims.
    pub tp: usize,
    /// Non-claims flagged as claims.
    pub fp: usize,
    /// Correctly passed non-claims.
    pub tn: usize,
    /// Missed claims.
    pub fn_: usize,
}

impl BinaryCounts {
    /// Tally counts from (prediction, ground truth) pairs.
    pub fn from_pairs(pairs: &[(bool, bool)]) -> Self {
        let mut counts = Self::default();
        for &(pred, truth) in pairs {
            match (pred, truth) {
                (true, true) => counts.tp += 1,
                (true, false) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (false, true) => counts.fn_ += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }

    pub fn false_positive_rate(&self) -> f64 {
        ratio(self.fp, self.fp + self.tn)
    }

    pub fn false_negative_rate(&self) -> f64 {
        ratio(self.fn_, self.fn_ + self.tp)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// Maximum characters of free text carried into a misclassification record.
const EXCERPT_LEN: usize = 100;

/// Misclassified samples retained per error side for manual review.
const EXAMPLE_CAP: usize = 10;

/// One misclassified sample, excerpted for manual review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MisclassifiedExample {
    pub id: String,
    pub text: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Confusion detail: the first few false positives and false negatives,
/// plus uncapped totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionAnalysis {
    pub false_positives: Vec<MisclassifiedExample>,
    pub false_negatives: Vec<MisclassifiedExample>,
    pub num_false_positives: usize,
    pub num_false_negatives: usize,
}

impl ConfusionAnalysis {
    /// Collect misclassification detail from (prediction, sample) pairs.
    pub fn from_pairs(pairs: &[(bool, &Stage1Sample)]) -> Self {
        let mut false_positives = Vec::new();
        let mut false_negatives = Vec::new();
        let mut num_fp = 0;
        let mut num_fn = 0;

        for &(pred, sample) in pairs {
            if pred && !sample.has_claim {
                num_fp += 1;
                if false_positives.len() < EXAMPLE_CAP {
                    false_positives.push(example(sample, false));
                }
            } else if !pred && sample.has_claim {
                num_fn += 1;
                if false_negatives.len() < EXAMPLE_CAP {
                    false_negatives.push(example(sample, true));
                }
            }
        }

        Self {
            false_positives,
            false_negatives,
            num_false_positives: num_fp,
            num_false_negatives: num_fn,
        }
    }
}

fn example(sample: &Stage1Sample, include_claims: bool) -> MisclassifiedExample {
    MisclassifiedExample {
        id: sample.id.clone(),
        text: excerpt(&sample.text, EXCERPT_LEN),
        platform: sample.platform.as_str().to_string(),
        claims: include_claims.then(|| sample.claims.clone()),
        metadata: sample.metadata.clone(),
    }
}

/// Truncate free text to `max` characters, appending an ellipsis marker.
pub fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max).collect();
    format!("{truncated}...")
}
