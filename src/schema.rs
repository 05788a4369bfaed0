// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Dataset schema for the two-stage fact-checking evaluation harness.
//!
//! Stage 1 samples are labeled for claim detection (does this text contain a
//! verifiable factual claim?); Stage 2 samples are labeled verification tasks
//! (is this claim true, false, or unknown given cited sources?). Model output
//! is captured as [`ModelPrediction`] with a tagged [`PredictionValue`] so
//! every consumer must handle the inference-failure case explicitly.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Platforms a Stage 1 text can originate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Linkedin,
    Facebook,
    Article,
    Other,
}

/// Content topics shared by both stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Politics,
    Health,
    Science,
    Business,
    Other,
}

/// Claim complexity levels (Stage 1 metadata).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

/// Stage 2 verification verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    True,
    False,
    Unknown,
}

/// Stage 2 verification difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Platform {
    /// Canonical string form, used for grouping and filtering.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Facebook => "facebook",
            Platform::Article => "article",
            Platform::Other => "other",
        }
    }
}

impl Topic {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Politics => "politics",
            Topic::Health => "health",
            Topic::Science => "science",
            Topic::Business => "business",
            Topic::Other => "other",
        }
    }
}

impl Complexity {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
        }
    }
}

impl Verdict {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::True => "true",
            Verdict::False => "false",
            Verdict::Unknown => "unknown",
        }
    }

    /// Parse a canonical verdict string, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "true" => Some(Verdict::True),
            "false" => Some(Verdict::False),
            "unknown" => Some(Verdict::Unknown),
            _ => None,
        }
    }
}

impl Difficulty {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Source citation for fact-checking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// Source credibility in [0,1]. Model-cited sources may omit it.
    #[serde(default = "default_reliability")]
    pub reliability_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_date: Option<String>,
}

fn default_reliability() -> f64 {
    0.5
}

/// Stage 1: claim detection sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage1Sample {
    pub id: String,
    pub text: String,
    pub platform: Platform,
    /// Ground truth: does the text contain a verifiable factual claim?
    pub has_claim: bool,
    #[serde(default)]
    pub claims: Vec<String>,
    #[serde(default)]
    pub annotator: String,
    /// Annotator confidence in [0,1].
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn default_confidence() -> f64 {
    1.0
}

impl Stage1Sample {
    /// Metadata topic, defaulting to "other".
    pub fn topic(&self) -> String {
        metadata_string(&self.metadata, "topic").unwrap_or_else(|| "other".to_string())
    }

    /// Metadata complexity, defaulting to "moderate".
    pub fn complexity(&self) -> String {
        metadata_string(&self.metadata, "complexity").unwrap_or_else(|| "moderate".to_string())
    }
}

/// Stage 2: verification sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage2Sample {
    pub id: String,
    pub claim: String,
    /// Ground truth verdict.
    pub verdict: Verdict,
    /// Annotator confidence in [0,1].
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: Difficulty,
    #[serde(default = "default_topic")]
    pub topic: Topic,
    #[serde(default)]
    pub annotator: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn default_difficulty() -> Difficulty {
    Difficulty::Medium
}

fn default_topic() -> Topic {
    Topic::Other
}

/// Model output value: Stage 1 yields booleans, Stage 2 yields verdicts, and
/// a failed inference yields `Missing` (serialized as JSON `null`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionValue {
    Missing,
    Boolean(bool),
    Verdict(Verdict),
}

impl Default for PredictionValue {
    fn default() -> Self {
        PredictionValue::Missing
    }
}

impl PredictionValue {
    /// Stage 2 normalization: anything that is not a recognized verdict
    /// counts as `unknown`.
    pub fn verdict_or_unknown(&self) -> Verdict {
        match self {
            PredictionValue::Verdict(v) => *v,
            _ => Verdict::Unknown,
        }
    }

    /// Stage 1 normalization: only an explicit boolean `true` counts as a
    /// positive claim detection. Failed inferences lower recall, by design.
    pub fn is_positive(&self) -> bool {
        matches!(self, PredictionValue::Boolean(true))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, PredictionValue::Missing)
    }
}

impl Serialize for PredictionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            PredictionValue::Missing => serializer.serialize_none(),
            PredictionValue::Boolean(b) => serializer.serialize_bool(*b),
            PredictionValue::Verdict(v) => serializer.serialize_str(v.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for PredictionValue {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            None | Some(serde_json::Value::Null) => PredictionValue::Missing,
            Some(serde_json::Value::Bool(b)) => PredictionValue::Boolean(b),
            Some(serde_json::Value::String(s)) => match Verdict::parse(&s) {
                Some(v) => PredictionValue::Verdict(v),
                None => PredictionValue::Missing,
            },
            Some(_) => PredictionValue::Missing,
        })
    }
}

/// One inference result for one sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub sample_id: String,
    #[serde(default = "missing_prediction")]
    pub prediction: PredictionValue,
    /// Model-reported confidence in [0,1].
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Inference wall time in seconds; 0 means not measured.
    #[serde(default)]
    pub latency: f64,
    /// API cost in USD; 0 means not measured.
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn missing_prediction() -> PredictionValue {
    PredictionValue::Missing
}

impl ModelPrediction {
    /// Whether the underlying inference call succeeded.
    pub fn succeeded(&self) -> bool {
        self.metadata
            .get("success")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(!self.prediction.is_missing())
    }
}

/// Persisted record of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub prompt_id: String,
    pub dataset: String,
    pub stage: u8,
    pub metrics: serde_json::Value,
    pub predictions: Vec<ModelPrediction>,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

impl EvaluationResult {
    /// Save to a JSON file.
    pub fn save_json(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file.
    pub fn load_json(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// A scalar field value in normal form, used by filtering and stratification.
///
/// Categorical enums resolve to their canonical string so a bare string
/// constraint and the enumerated constant compare equal.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Canonical string rendering, used as a grouping key.
    pub fn canonical(&self) -> String {
        match self {
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Platform> for FieldValue {
    fn from(p: Platform) -> Self {
        FieldValue::Text(p.as_str().to_string())
    }
}

impl From<Topic> for FieldValue {
    fn from(t: Topic) -> Self {
        FieldValue::Text(t.as_str().to_string())
    }
}

impl From<Verdict> for FieldValue {
    fn from(v: Verdict) -> Self {
        FieldValue::Text(v.as_str().to_string())
    }
}

impl From<Difficulty> for FieldValue {
    fn from(d: Difficulty) -> Self {
        FieldValue::Text(d.as_str().to_string())
    }
}

/// Scalar field access by dot-separated path, e.g. `"metadata.topic"`.
pub trait FieldAccess {
    /// Resolve a field path to its normal-form value.
    ///
    /// Fails with [`Error::FieldNotFound`] when any path segment is absent.
    fn field(&self, path: &str) -> Result<FieldValue>;

    /// The sample's unique identifier.
    fn sample_id(&self) -> &str;
}

fn metadata_string(metadata: &HashMap<String, serde_json::Value>, key: &str) -> Option<String> {
    metadata.get(key).map(json_to_text)
}

fn json_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn metadata_field(
    metadata: &HashMap<String, serde_json::Value>,
    key: &str,
    path: &str,
) -> Result<FieldValue> {
    let value = metadata
        .get(key)
        .ok_or_else(|| Error::FieldNotFound(path.to_string()))?;
    Ok(match value {
        serde_json::Value::Bool(b) => FieldValue::Bool(*b),
        serde_json::Value::Number(n) => FieldValue::Number(n.as_f64().unwrap_or(0.0)),
        other => FieldValue::Text(json_to_text(other)),
    })
}

impl FieldAccess for Stage1Sample {
    fn field(&self, path: &str) -> Result<FieldValue> {
        let (head, rest) = split_path(path);
        match (head, rest) {
            ("id", None) => Ok(FieldValue::Text(self.id.clone())),
            ("text", None) => Ok(FieldValue::Text(self.text.clone())),
            ("platform", None) => Ok(self.platform.into()),
            ("has_claim", None) => Ok(FieldValue::Bool(self.has_claim)),
            ("annotator", None) => Ok(FieldValue::Text(self.annotator.clone())),
            ("confidence", None) => Ok(FieldValue::Number(self.confidence)),
            ("metadata", Some(key)) => metadata_field(&self.metadata, key, path),
            _ => Err(Error::FieldNotFound(path.to_string())),
        }
    }

    fn sample_id(&self) -> &str {
        &self.id
    }
}

impl FieldAccess for Stage2Sample {
    fn field(&self, path: &str) -> Result<FieldValue> {
        let (head, rest) = split_path(path);
        match (head, rest) {
            ("id", None) => Ok(FieldValue::Text(self.id.clone())),
            ("claim", None) => Ok(FieldValue::Text(self.claim.clone())),
            ("verdict", None) => Ok(self.verdict.into()),
            ("confidence", None) => Ok(FieldValue::Number(self.confidence)),
            ("explanation", None) => Ok(FieldValue::Text(self.explanation.clone())),
            ("reasoning", None) => Ok(FieldValue::Text(self.reasoning.clone())),
            ("difficulty", None) => Ok(self.difficulty.into()),
            ("topic", None) => Ok(self.topic.into()),
            ("annotator", None) => Ok(FieldValue::Text(self.annotator.clone())),
            ("metadata", Some(key)) => metadata_field(&self.metadata, key, path),
            _ => Err(Error::FieldNotFound(path.to_string())),
        }
    }

    fn sample_id(&self) -> &str {
        &self.id
    }
}

fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

/// Schema invariants applied when a record enters the system.
pub trait Validate {
    /// Normalize defaults and check invariants. Called once at load time.
    fn validate(&mut self) -> Result<()>;
}

impl Validate for Stage1Sample {
    fn validate(&mut self) -> Result<()> {
        // Default metadata so category breakdowns always have a key.
        self.metadata
            .entry("topic".to_string())
            .or_insert_with(|| serde_json::Value::String(Topic::Other.as_str().to_string()));
        self.metadata.entry("complexity".to_string()).or_insert_with(|| {
            serde_json::Value::String(Complexity::Moderate.as_str().to_string())
        });

        if self.has_claim && self.claims.is_empty() {
            return Err(Error::invalid_sample(
                &self.id,
                "has_claim=true but no claims listed",
            ));
        }
        Ok(())
    }
}

impl Validate for Stage2Sample {
    fn validate(&mut self) -> Result<()> {
        if self.verdict != Verdict::Unknown && self.sources.is_empty() {
            return Err(Error::invalid_sample(
                &self.id,
                format!("verdict {} but no sources", self.verdict.as_str()),
            ));
        }
        Ok(())
    }
}
