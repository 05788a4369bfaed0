// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Dataset loading, persistence, splitting, and subsetting.
//!
//! Datasets live as JSON arrays or newline-delimited JSON under a data
//! directory. Malformed records are skipped with a warning rather than
//! aborting the load, so one bad annotation cannot block an evaluation run.

use crate::error::{Error, Result};
use crate::filter::filter_samples;
use crate::schema::{FieldValue, Stage1Sample, Stage2Sample, Validate};
use crate::split::{split_samples, SplitAssignment, SplitSpec};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of a dataset load: how many records survived validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
}

/// Hashable identity of a split request. Proportions are keyed by their bit
/// patterns since `f64` itself is not `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SplitKey {
    train_bits: u64,
    val_bits: u64,
    test_bits: u64,
    stratify_by: Option<String>,
    seed: u64,
}

impl SplitKey {
    fn from_spec(spec: &SplitSpec) -> Self {
        Self {
            train_bits: spec.train.to_bits(),
            val_bits: spec.val.to_bits(),
            test_bits: spec.test.to_bits(),
            stratify_by: spec.stratify_by.clone(),
            seed: spec.seed,
        }
    }
}

/// Owns the loaded datasets and memoizes split computations.
#[derive(Debug, Default)]
pub struct DatasetManager {
    data_dir: PathBuf,
    stage1: Option<Vec<Stage1Sample>>,
    stage2: Option<Vec<Stage2Sample>>,
    stage1_splits: HashMap<SplitKey, SplitAssignment<Stage1Sample>>,
    stage2_splits: HashMap<SplitKey, SplitAssignment<Stage2Sample>>,
}

impl DatasetManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load the Stage 1 dataset from a file under the data directory.
    pub fn load_stage1(&mut self, filename: &str) -> Result<LoadSummary> {
        let (samples, summary) = load_validated::<Stage1Sample>(&self.data_dir.join(filename))?;
        info!(
            loaded = summary.loaded,
            skipped = summary.skipped,
            file = filename,
            "loaded stage 1 dataset"
        );
        self.stage1 = Some(samples);
        self.stage1_splits.clear();
        Ok(summary)
    }

    /// Load the Stage 2 dataset from a file under the data directory.
    pub fn load_stage2(&mut self, filename: &str) -> Result<LoadSummary> {
        let (samples, summary) = load_validated::<Stage2Sample>(&self.data_dir.join(filename))?;
        info!(
            loaded = summary.loaded,
            skipped = summary.skipped,
            file = filename,
            "loaded stage 2 dataset"
        );
        self.stage2 = Some(samples);
        self.stage2_splits.clear();
        Ok(summary)
    }

    pub fn stage1(&self) -> Result<&[Stage1Sample]> {
        self.stage1.as_deref().ok_or(Error::NotLoaded(1))
    }

    pub fn stage2(&self) -> Result<&[Stage2Sample]> {
        self.stage2.as_deref().ok_or(Error::NotLoaded(2))
    }

    /// Replace the in-memory Stage 1 dataset, e.g. with generated samples.
    pub fn set_stage1(&mut self, samples: Vec<Stage1Sample>) {
        self.stage1 = Some(samples);
        self.stage1_splits.clear();
    }

    /// Replace the in-memory Stage 2 dataset.
    pub fn set_stage2(&mut self, samples: Vec<Stage2Sample>) {
        self.stage2 = Some(samples);
        self.stage2_splits.clear();
    }

    /// Save the Stage 1 dataset as a pretty-printed JSON array.
    pub fn save_stage1(&self, filename: &str) -> Result<()> {
        save_json(&self.data_dir.join(filename), self.stage1()?)
    }

    /// Save the Stage 2 dataset as a pretty-printed JSON array.
    pub fn save_stage2(&self, filename: &str) -> Result<()> {
        save_json(&self.data_dir.join(filename), self.stage2()?)
    }

    /// Export the Stage 1 dataset as newline-delimited JSON.
    pub fn export_stage1_jsonl(&self, path: &Path) -> Result<()> {
        save_jsonl(path, self.stage1()?)
    }

    /// Export the Stage 2 dataset as newline-delimited JSON.
    pub fn export_stage2_jsonl(&self, path: &Path) -> Result<()> {
        save_jsonl(path, self.stage2()?)
    }

    /// Export the Stage 1 dataset as CSV for spreadsheet review. Multi-valued
    /// claims are joined with `"; "`.
    pub fn export_stage1_csv(&self, path: &Path) -> Result<()> {
        let samples = self.stage1()?;
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "id",
            "text",
            "platform",
            "has_claim",
            "claims",
            "annotator",
            "confidence",
        ])?;
        for s in samples {
            writer.write_record([
                s.id.as_str(),
                s.text.as_str(),
                s.platform.as_str(),
                if s.has_claim { "true" } else { "false" },
                &s.claims.join("; "),
                s.annotator.as_str(),
                &s.confidence.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Export the Stage 2 dataset as CSV for spreadsheet review.
    pub fn export_stage2_csv(&self, path: &Path) -> Result<()> {
        let samples = self.stage2()?;
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "id",
            "claim",
            "verdict",
            "confidence",
            "explanation",
            "difficulty",
            "topic",
            "num_sources",
        ])?;
        for s in samples {
            writer.write_record([
                s.id.as_str(),
                s.claim.as_str(),
                s.verdict.as_str(),
                &s.confidence.to_string(),
                s.explanation.as_str(),
                s.difficulty.as_str(),
                s.topic.as_str(),
                &s.sources.len().to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Split the Stage 1 dataset, memoizing per split parameters.
    pub fn split_stage1(&mut self, spec: &SplitSpec) -> Result<&SplitAssignment<Stage1Sample>> {
        let key = SplitKey::from_spec(spec);
        if !self.stage1_splits.contains_key(&key) {
            let samples = self.stage1.as_deref().ok_or(Error::NotLoaded(1))?;
            let assignment = split_samples(samples, spec)?;
            self.stage1_splits.insert(key.clone(), assignment);
        }
        Ok(&self.stage1_splits[&key])
    }

    /// Split the Stage 2 dataset, memoizing per split parameters.
    pub fn split_stage2(&mut self, spec: &SplitSpec) -> Result<&SplitAssignment<Stage2Sample>> {
        let key = SplitKey::from_spec(spec);
        if !self.stage2_splits.contains_key(&key) {
            let samples = self.stage2.as_deref().ok_or(Error::NotLoaded(2))?;
            let assignment = split_samples(samples, spec)?;
            self.stage2_splits.insert(key.clone(), assignment);
        }
        Ok(&self.stage2_splits[&key])
    }

    /// Filtered subset of the Stage 1 dataset, optionally within one split
    /// (default split parameters).
    pub fn subset_stage1(
        &mut self,
        constraints: &[(String, FieldValue)],
        split: Option<&str>,
    ) -> Result<Vec<Stage1Sample>> {
        match split {
            None => filter_samples(self.stage1()?, constraints),
            Some(name) => {
                let assignment = self.split_stage1(&SplitSpec::default())?;
                filter_samples(assignment.get(name)?, constraints)
            }
        }
    }

    /// Filtered subset of the Stage 2 dataset, optionally within one split.
    pub fn subset_stage2(
        &mut self,
        constraints: &[(String, FieldValue)],
        split: Option<&str>,
    ) -> Result<Vec<Stage2Sample>> {
        match split {
            None => filter_samples(self.stage2()?, constraints),
            Some(name) => {
                let assignment = self.split_stage2(&SplitSpec::default())?;
                filter_samples(assignment.get(name)?, constraints)
            }
        }
    }

    /// Descriptive statistics over the Stage 1 dataset.
    pub fn stage1_statistics(&self) -> Result<Stage1Statistics> {
        let samples = self.stage1()?;
        let with_claims = samples.iter().filter(|s| s.has_claim).count();
        let total_claims: usize = samples
            .iter()
            .filter(|s| s.has_claim)
            .map(|s| s.claims.len())
            .sum();
        let mut by_platform: HashMap<String, usize> = HashMap::new();
        let mut by_topic: HashMap<String, usize> = HashMap::new();
        let mut by_complexity: HashMap<String, usize> = HashMap::new();
        for s in samples {
            *by_platform.entry(s.platform.as_str().to_string()).or_default() += 1;
            *by_topic.entry(s.topic()).or_default() += 1;
            *by_complexity.entry(s.complexity()).or_default() += 1;
        }
        Ok(Stage1Statistics {
            total: samples.len(),
            with_claims,
            without_claims: samples.len() - with_claims,
            avg_claims_per_sample: if with_claims == 0 {
                0.0
            } else {
                total_claims as f64 / with_claims as f64
            },
            by_platform,
            by_topic,
            by_complexity,
        })
    }

    /// Descriptive statistics over the Stage 2 dataset.
    pub fn stage2_statistics(&self) -> Result<Stage2Statistics> {
        let samples = self.stage2()?;
        let mut by_verdict: HashMap<String, usize> = HashMap::new();
        let mut by_difficulty: HashMap<String, usize> = HashMap::new();
        let mut by_topic: HashMap<String, usize> = HashMap::new();
        let mut total_sources = 0usize;
        let mut reliability_sum = 0.0;
        for s in samples {
            *by_verdict.entry(s.verdict.as_str().to_string()).or_default() += 1;
            *by_difficulty
                .entry(s.difficulty.as_str().to_string())
                .or_default() += 1;
            *by_topic.entry(s.topic.as_str().to_string()).or_default() += 1;
            total_sources += s.sources.len();
            reliability_sum += s.sources.iter().map(|src| src.reliability_score).sum::<f64>();
        }
        Ok(Stage2Statistics {
            total: samples.len(),
            avg_sources_per_sample: if samples.is_empty() {
                0.0
            } else {
                total_sources as f64 / samples.len() as f64
            },
            avg_source_reliability: if total_sources == 0 {
                0.0
            } else {
                reliability_sum / total_sources as f64
            },
            by_verdict,
            by_difficulty,
            by_topic,
        })
    }
}

/// Stage 1 dataset distributions.
#[derive(Debug, Clone, Serialize)]
pub struct Stage1Statistics {
    pub total: usize,
    pub with_claims: usize,
    pub without_claims: usize,
    /// Mean claim count among claim-bearing samples.
    pub avg_claims_per_sample: f64,
    pub by_platform: HashMap<String, usize>,
    pub by_topic: HashMap<String, usize>,
    pub by_complexity: HashMap<String, usize>,
}

/// Stage 2 dataset distributions.
#[derive(Debug, Clone, Serialize)]
pub struct Stage2Statistics {
    pub total: usize,
    pub avg_sources_per_sample: f64,
    pub avg_source_reliability: f64,
    pub by_verdict: HashMap<String, usize>,
    pub by_difficulty: HashMap<String, usize>,
    pub by_topic: HashMap<String, usize>,
}

/// Load and validate records from a JSON array or newline-delimited JSON
/// file, deciding by the first non-whitespace byte.
fn load_validated<T>(path: &Path) -> Result<(Vec<T>, LoadSummary)>
where
    T: DeserializeOwned + Validate,
{
    let data = std::fs::read_to_string(path)?;
    let mut skipped = 0;
    let raw: Vec<serde_json::Value> = if data.trim_start().starts_with('[') {
        serde_json::from_str(&data)?
    } else {
        let mut records = Vec::new();
        for (lineno, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(value) => records.push(value),
                Err(e) => {
                    warn!(line = lineno + 1, error = %e, "skipping unparseable line");
                    skipped += 1;
                }
            }
        }
        records
    };

    let mut samples = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(mut sample) => match sample.validate() {
                Ok(()) => samples.push(sample),
                Err(e) => {
                    warn!(index, error = %e, "skipping invalid record");
                    skipped += 1;
                }
            },
            Err(e) => {
                warn!(index, error = %e, "skipping malformed record");
                skipped += 1;
            }
        }
    }

    let summary = LoadSummary {
        loaded: samples.len(),
        skipped,
    };
    Ok((samples, summary))
}

fn save_json<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn save_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    for record in records {
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
    }
    Ok(())
}

/// Load newline-delimited JSON predictions or samples without validation.
pub fn load_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}
