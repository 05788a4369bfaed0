// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Stage evaluators: join predictions to ground truth and compose the full
//! metric reports.
//!
//! Predictions are matched to samples by `sample_id`; predictions without a
//! matching sample (and samples without a prediction) are silently dropped
//! from correctness metrics. Performance aggregation runs over every supplied
//! prediction, matched or not, since latency and cost were spent either way.

use crate::breakdown::{Stage1ErrorAnalysis, Stage2ErrorAnalysis};
use crate::calibration::CalibrationReport;
use crate::metrics::{BinaryCounts, ConfusionAnalysis};
use crate::multiclass::{CriticalErrors, PerClassMetrics, VerdictConfusion, VerdictMetrics};
use crate::performance::PerformanceMetrics;
use crate::schema::{ModelPrediction, Stage1Sample, Stage2Sample};
use crate::sources::SourceQuality;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Evaluation output: either a full report or a structured failure record.
/// Serializes untagged, so a failure appears as `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvalOutcome<T> {
    Ready(T),
    Failed { error: String },
}

impl<T> EvalOutcome<T> {
    pub fn report(&self) -> Option<&T> {
        match self {
            EvalOutcome::Ready(report) => Some(report),
            EvalOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, EvalOutcome::Failed { .. })
    }
}

/// Join predictions to ground truth by sample id, preserving ground-truth
/// order. Later duplicate ids win the join, matching last-write semantics.
fn match_pairs<'a, T>(
    samples: &'a [T],
    predictions: &'a [ModelPrediction],
    id_of: impl Fn(&T) -> &str,
) -> Vec<(&'a ModelPrediction, &'a T)> {
    let by_id: HashMap<&str, &ModelPrediction> = predictions
        .iter()
        .map(|p| (p.sample_id.as_str(), p))
        .collect();
    samples
        .iter()
        .filter_map(|sample| by_id.get(id_of(sample)).map(|pred| (*pred, sample)))
        .collect()
}

/// Full Stage 1 (claim detection) report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage1Report {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
    pub total_samples: usize,
    #[serde(flatten)]
    pub performance: PerformanceMetrics,
    pub confusion_analysis: ConfusionAnalysis,
    pub error_analysis: Stage1ErrorAnalysis,
}

/// Evaluates claim-detection predictions against Stage 1 ground truth.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stage1Evaluator;

impl Stage1Evaluator {
    pub fn evaluate(
        &self,
        samples: &[Stage1Sample],
        predictions: &[ModelPrediction],
    ) -> EvalOutcome<Stage1Report> {
        let matched = match_pairs(samples, predictions, |s| s.id.as_str());
        if matched.is_empty() {
            return EvalOutcome::Failed {
                error: "no predictions matched ground truth samples".to_string(),
            };
        }

        let bool_pairs: Vec<(bool, bool)> = matched
            .iter()
            .map(|(pred, sample)| (pred.prediction.is_positive(), sample.has_claim))
            .collect();
        let counts = BinaryCounts::from_pairs(&bool_pairs);

        let sample_pairs: Vec<(bool, &Stage1Sample)> = matched
            .iter()
            .map(|(pred, sample)| (pred.prediction.is_positive(), *sample))
            .collect();
        let correctness: Vec<(bool, &Stage1Sample)> = matched
            .iter()
            .map(|(pred, sample)| (pred.prediction.is_positive() == sample.has_claim, *sample))
            .collect();

        EvalOutcome::Ready(Stage1Report {
            accuracy: counts.accuracy(),
            precision: counts.precision(),
            recall: counts.recall(),
            f1_score: counts.f1_score(),
            false_positive_rate: counts.false_positive_rate(),
            false_negative_rate: counts.false_negative_rate(),
            true_positives: counts.tp,
            false_positives: counts.fp,
            true_negatives: counts.tn,
            false_negatives: counts.fn_,
            total_samples: matched.len(),
            performance: PerformanceMetrics::from_predictions(predictions),
            confusion_analysis: ConfusionAnalysis::from_pairs(&sample_pairs),
            error_analysis: Stage1ErrorAnalysis::from_pairs(&correctness),
        })
    }
}

/// Full Stage 2 (verification) report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage2Report {
    pub accuracy: f64,
    pub per_class: PerClassMetrics,
    pub confusion_matrix: VerdictConfusion,
    pub total_samples: usize,
    pub critical_errors: CriticalErrors,
    pub calibration: CalibrationReport,
    pub source_quality: SourceQuality,
    #[serde(flatten)]
    pub performance: PerformanceMetrics,
    pub error_analysis: Stage2ErrorAnalysis,
}

/// Evaluates verdict predictions against Stage 2 ground truth.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stage2Evaluator;

impl Stage2Evaluator {
    pub fn evaluate(
        &self,
        samples: &[Stage2Sample],
        predictions: &[ModelPrediction],
    ) -> EvalOutcome<Stage2Report> {
        let matched = match_pairs(samples, predictions, |s| s.id.as_str());
        if matched.is_empty() {
            return EvalOutcome::Failed {
                error: "no predictions matched ground truth samples".to_string(),
            };
        }

        let verdict_pairs: Vec<(crate::schema::Verdict, crate::schema::Verdict)> = matched
            .iter()
            .map(|(pred, sample)| (sample.verdict, pred.prediction.verdict_or_unknown()))
            .collect();
        let verdict_metrics = VerdictMetrics::from_pairs(&verdict_pairs);

        let confidence_pairs: Vec<(f64, bool)> = matched
            .iter()
            .map(|(pred, sample)| {
                (
                    pred.confidence,
                    pred.prediction.verdict_or_unknown() == sample.verdict,
                )
            })
            .collect();

        let correctness: Vec<(bool, &Stage2Sample)> = matched
            .iter()
            .map(|(pred, sample)| {
                (pred.prediction.verdict_or_unknown() == sample.verdict, *sample)
            })
            .collect();

        EvalOutcome::Ready(Stage2Report {
            accuracy: verdict_metrics.accuracy,
            per_class: verdict_metrics.per_class,
            confusion_matrix: verdict_metrics.confusion_matrix,
            total_samples: verdict_metrics.total_samples,
            critical_errors: CriticalErrors::from_pairs(&verdict_pairs),
            calibration: CalibrationReport::from_pairs(&confidence_pairs),
            source_quality: SourceQuality::from_pairs(&matched),
            performance: PerformanceMetrics::from_predictions(predictions),
            error_analysis: Stage2ErrorAnalysis::from_pairs(&correctness),
        })
    }
}
