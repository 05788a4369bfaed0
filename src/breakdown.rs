// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Cross-tabulation of correctness against categorical sample attributes.

use crate::schema::{Stage1Sample, Stage2Sample};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Accuracy within one category value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CategoryAccuracy {
    pub accuracy: f64,
    pub correct: usize,
    pub total: usize,
}

/// Accumulate (category, correct) rows into per-category accuracy.
pub fn accumulate<I>(rows: I) -> BTreeMap<String, CategoryAccuracy>
where
    I: IntoIterator<Item = (String, bool)>,
{
    let mut counters: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for (category, correct) in rows {
        let entry = counters.entry(category).or_insert((0, 0));
        entry.1 += 1;
        if correct {
            entry.0 += 1;
        }
    }
    counters
        .into_iter()
        .map(|(category, (correct, total))| {
            let accuracy = if total == 0 {
                0.0
            } else {
                correct as f64 / total as f64
            };
            (
                category,
                CategoryAccuracy {
                    accuracy,
                    correct,
                    total,
                },
            )
        })
        .collect()
}

/// Stage 1 error analysis, keyed by platform, topic, and complexity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stage1ErrorAnalysis {
    pub by_platform: BTreeMap<String, CategoryAccuracy>,
    pub by_topic: BTreeMap<String, CategoryAccuracy>,
    pub by_complexity: BTreeMap<String, CategoryAccuracy>,
}

impl Stage1ErrorAnalysis {
    /// Tabulate from (correct, sample) rows.
    pub fn from_pairs(pairs: &[(bool, &Stage1Sample)]) -> Self {
        Self {
            by_platform: accumulate(
                pairs
                    .iter()
                    .map(|(correct, s)| (s.platform.as_str().to_string(), *correct)),
            ),
            by_topic: accumulate(pairs.iter().map(|(correct, s)| (s.topic(), *correct))),
            by_complexity: accumulate(
                pairs.iter().map(|(correct, s)| (s.complexity(), *correct)),
            ),
        }
    }
}

/// Stage 2 error analysis, keyed by difficulty and topic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stage2ErrorAnalysis {
    pub by_difficulty: BTreeMap<String, CategoryAccuracy>,
    pub by_topic: BTreeMap<String, CategoryAccuracy>,
}

impl Stage2ErrorAnalysis {
    /// Tabulate from (correct, sample) rows.
    pub fn from_pairs(pairs: &[(bool, &Stage2Sample)]) -> Self {
        Self {
            by_difficulty: accumulate(
                pairs
                    .iter()
                    .map(|(correct, s)| (s.difficulty.as_str().to_string(), *correct)),
            ),
            by_topic: accumulate(
                pairs
                    .iter()
                    .map(|(correct, s)| (s.topic.as_str().to_string(), *correct)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Platform;
    use std::collections::HashMap;

    fn sample(platform: Platform, topic: &str) -> Stage1Sample {
        let mut metadata = HashMap::new();
        metadata.insert("topic".to_string(), serde_json::json!(topic));
        Stage1Sample {
            id: "s".to_string(),
            text: String::new(),
            platform,
            has_claim: false,
            claims: vec![],
            annotator: String::new(),
            confidence: 1.0,
            metadata,
        }
    }

    #[test]
    fn per_category_accuracy() {
        let a = sample(Platform::Twitter, "health");
        let b = sample(Platform::Twitter, "health");
        let c = sample(Platform::Article, "politics");
        let pairs = vec![(true, &a), (false, &b), (true, &c)];

        let analysis = Stage1ErrorAnalysis::from_pairs(&pairs);
        let twitter = &analysis.by_platform["twitter"];
        assert_eq!(twitter.total, 2);
        assert_eq!(twitter.correct, 1);
        assert!((twitter.accuracy - 0.5).abs() < 1e-9);

        let article = &analysis.by_platform["article"];
        assert!((article.accuracy - 1.0).abs() < 1e-9);

        assert_eq!(analysis.by_topic["health"].total, 2);
        // Complexity metadata absent: accessor defaults to "moderate".
        assert_eq!(analysis.by_complexity["moderate"].total, 3);
    }
}
