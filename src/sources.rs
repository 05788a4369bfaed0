// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Source-quality scoring: how well do a model's cited sources line up with
//! the annotated ground-truth sources?

use crate::schema::{ModelPrediction, Stage2Sample};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Aggregate source quality over all matched pairs. Every field is an
/// arithmetic mean, defaulting to 0 when no pair contributed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SourceQuality {
    /// Mean |predicted ∩ truth| / |truth| over pairs whose ground truth
    /// cites at least one source.
    pub avg_source_overlap: f64,
    /// Mean reliability score of predicted sources.
    pub avg_source_reliability: f64,
    /// Mean number of sources cited per prediction.
    pub avg_sources_per_prediction: f64,
    /// Mean number of distinct domains among predicted sources.
    pub avg_unique_domains: f64,
}

impl SourceQuality {
    /// Score predicted source sets against ground truth.
    pub fn from_pairs(pairs: &[(&ModelPrediction, &Stage2Sample)]) -> Self {
        let mut overlaps = Vec::new();
        let mut reliabilities = Vec::new();
        let mut counts = Vec::new();
        let mut domain_counts = Vec::new();

        for (pred, truth) in pairs {
            let pred_urls: HashSet<&str> =
                pred.sources.iter().map(|s| s.url.as_str()).collect();
            let truth_urls: HashSet<&str> =
                truth.sources.iter().map(|s| s.url.as_str()).collect();

            // Overlap is undefined when the annotation cites nothing.
            if !truth_urls.is_empty() {
                let shared = pred_urls.intersection(&truth_urls).count();
                overlaps.push(shared as f64 / truth_urls.len() as f64);
            }

            if !pred.sources.is_empty() {
                let mean_reliability = pred
                    .sources
                    .iter()
                    .map(|s| s.reliability_score)
                    .sum::<f64>()
                    / pred.sources.len() as f64;
                reliabilities.push(mean_reliability);
                counts.push(pred.sources.len() as f64);

                let domains: HashSet<String> =
                    pred.sources.iter().map(|s| domain(&s.url)).collect();
                domain_counts.push(domains.len() as f64);
            }
        }

        Self {
            avg_source_overlap: mean(&overlaps),
            avg_source_reliability: mean(&reliabilities),
            avg_sources_per_prediction: mean(&counts),
            avg_unique_domains: mean(&domain_counts),
        }
    }
}

/// Host component of a URL, empty when unparseable.
fn domain(raw: &str) -> String {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Difficulty, PredictionValue, Source, Topic, Verdict};
    use std::collections::HashMap;

    fn source(url: &str, reliability: f64) -> Source {
        Source {
            url: url.to_string(),
            title: String::new(),
            reliability_score: reliability,
            excerpt: None,
            access_date: None,
        }
    }

    fn prediction(id: &str, sources: Vec<Source>) -> ModelPrediction {
        ModelPrediction {
            sample_id: id.to_string(),
            prediction: PredictionValue::Verdict(Verdict::True),
            confidence: 0.9,
            explanation: None,
            sources,
            latency: 1.0,
            cost: 0.001,
            metadata: HashMap::new(),
        }
    }

    fn truth(id: &str, sources: Vec<Source>) -> Stage2Sample {
        Stage2Sample {
            id: id.to_string(),
            claim: "claim".to_string(),
            verdict: if sources.is_empty() {
                Verdict::Unknown
            } else {
                Verdict::True
            },
            confidence: 1.0,
            sources,
            explanation: String::new(),
            reasoning: String::new(),
            difficulty: Difficulty::Medium,
            topic: Topic::Other,
            annotator: String::new(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn overlap_is_intersection_over_truth_count() {
        let pred = prediction(
            "a",
            vec![
                source("https://www.bls.gov/report", 0.9),
                source("https://example.org/blog", 0.3),
            ],
        );
        let gt = truth(
            "a",
            vec![
                source("https://www.bls.gov/report", 0.95),
                source("https://pubmed.ncbi.nlm.nih.gov/1", 0.9),
            ],
        );
        let quality = SourceQuality::from_pairs(&[(&pred, &gt)]);
        assert!((quality.avg_source_overlap - 0.5).abs() < 1e-9);
        assert!((quality.avg_source_reliability - 0.6).abs() < 1e-9);
        assert!((quality.avg_sources_per_prediction - 2.0).abs() < 1e-9);
        // bls.gov and example.org are distinct hosts.
        assert!((quality.avg_unique_domains - 2.0).abs() < 1e-9);
    }

    #[test]
    fn pairs_without_truth_sources_skip_overlap_only() {
        let pred = prediction("a", vec![source("https://example.org/x", 0.7)]);
        let gt = truth("a", vec![]);
        let quality = SourceQuality::from_pairs(&[(&pred, &gt)]);
        assert_eq!(quality.avg_source_overlap, 0.0);
        assert!((quality.avg_source_reliability - 0.7).abs() < 1e-9);
        assert!((quality.avg_sources_per_prediction - 1.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_domains_count_once() {
        let pred = prediction(
            "a",
            vec![
                source("https://example.org/one", 0.5),
                source("https://example.org/two", 0.5),
            ],
        );
        let gt = truth("a", vec![source("https://example.org/one", 0.9)]);
        let quality = SourceQuality::from_pairs(&[(&pred, &gt)]);
        assert!((quality.avg_unique_domains - 1.0).abs() < 1e-9);
        assert!((quality.avg_source_overlap - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_degrades_to_zero() {
        let quality = SourceQuality::from_pairs(&[]);
        assert_eq!(quality.avg_source_overlap, 0.0);
        assert_eq!(quality.avg_unique_domains, 0.0);
    }
}
