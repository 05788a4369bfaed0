// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Error types for the evaluation harness.

use thiserror::Error;

/// Result type for evaluation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for evaluation operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Split fractions do not sum to 1.0 within tolerance.
    #[error("split proportions must sum to 1.0, got {sum:.4}")]
    InvalidProportions { sum: f64 },

    /// A stratification or filter constraint named a field that does not exist.
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// A sample violated a schema invariant.
    #[error("invalid sample {id}: {reason}")]
    InvalidSample { id: String, reason: String },

    /// A split name other than train/val/test was requested.
    #[error("unknown split: {0}")]
    UnknownSplit(String),

    /// A dataset operation was attempted before loading.
    #[error("stage {0} dataset not loaded")]
    NotLoaded(u8),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create an invalid-sample error.
    pub fn invalid_sample(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidSample {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
