// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Evaluation harness for a two-stage fact-checking pipeline
//!
//! This crate provides:
//! - Dataset schema, loading, and persistence for both pipeline stages
//! - Seeded, optionally stratified train/val/test splitting
//! - Stage 1 claim-detection metrics (binary classification + error detail)
//! - Stage 2 verification metrics (multi-class, critical errors, calibration,
//!   source quality)
//! - Latency/cost performance aggregation and per-category breakdowns
//! - A model-agnostic batch inference runner

pub mod breakdown;
pub mod calibration;
pub mod datasets;
pub mod error;
pub mod evaluators;
pub mod filter;
pub mod metrics;
pub mod multiclass;
pub mod performance;
pub mod runner;
pub mod schema;
pub mod sources;
pub mod split;

pub use datasets::{DatasetManager, LoadSummary};
pub use error::{Error, Result};
pub use evaluators::{EvalOutcome, Stage1Evaluator, Stage1Report, Stage2Evaluator, Stage2Report};
pub use runner::{InferenceInput, InferenceResponse, ModelProvider, ModelRunner, RunnerConfig};
pub use schema::{
    ModelPrediction, PredictionValue, Stage1Sample, Stage2Sample, Verdict,
};
pub use split::{SplitAssignment, SplitSpec};
