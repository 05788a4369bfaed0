// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Field-equality dataset filtering.
//!
//! Constraints are ANDed. A constraint naming a field that does not exist on
//! any sample fails the whole call: partial filtering would silently hide
//! data-quality bugs.

use crate::error::Result;
use crate::schema::{FieldAccess, FieldValue};

/// Return the samples matching every `(field, value)` constraint, in input
/// order. An empty constraint list returns the input unmodified.
pub fn filter_samples<T: FieldAccess + Clone>(
    samples: &[T],
    constraints: &[(String, FieldValue)],
) -> Result<Vec<T>> {
    let mut matched = Vec::new();
    for sample in samples {
        let mut keep = true;
        for (field, wanted) in constraints {
            // Resolve every constraint even after a mismatch so a bad field
            // name fails regardless of constraint ordering.
            let actual = sample.field(field)?;
            if actual != *wanted {
                keep = false;
            }
        }
        if keep {
            matched.push(sample.clone());
        }
    }
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::schema::{Difficulty, Stage2Sample, Topic, Verdict};
    use std::collections::HashMap;

    fn sample(id: &str, verdict: Verdict, difficulty: Difficulty) -> Stage2Sample {
        Stage2Sample {
            id: id.to_string(),
            claim: format!("claim {id}"),
            verdict,
            confidence: 0.9,
            sources: vec![crate::schema::Source {
                url: "https://example.org/a".to_string(),
                title: "a".to_string(),
                reliability_score: 0.8,
                excerpt: None,
                access_date: None,
            }],
            explanation: String::new(),
            reasoning: String::new(),
            difficulty,
            topic: Topic::Health,
            annotator: String::new(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn constraints_are_anded() {
        let samples = vec![
            sample("a", Verdict::True, Difficulty::Easy),
            sample("b", Verdict::True, Difficulty::Hard),
            sample("c", Verdict::False, Difficulty::Easy),
        ];
        let constraints = vec![
            ("verdict".to_string(), FieldValue::from("true")),
            ("difficulty".to_string(), FieldValue::from("easy")),
        ];
        let out = filter_samples(&samples, &constraints).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a");
    }

    #[test]
    fn enum_constant_and_bare_string_compare_equal() {
        let samples = vec![sample("a", Verdict::False, Difficulty::Medium)];
        let by_enum = vec![("verdict".to_string(), FieldValue::from(Verdict::False))];
        let by_str = vec![("verdict".to_string(), FieldValue::from("false"))];
        assert_eq!(filter_samples(&samples, &by_enum).unwrap().len(), 1);
        assert_eq!(filter_samples(&samples, &by_str).unwrap().len(), 1);
    }

    #[test]
    fn empty_constraints_preserve_order() {
        let samples = vec![
            sample("a", Verdict::True, Difficulty::Easy),
            sample("b", Verdict::False, Difficulty::Easy),
        ];
        let out = filter_samples(&samples, &[]).unwrap();
        let ids: Vec<_> = out.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn unknown_field_fails_the_whole_call() {
        let samples = vec![
            sample("a", Verdict::True, Difficulty::Easy),
            sample("b", Verdict::False, Difficulty::Easy),
        ];
        // First constraint already excludes "b"; the bad field must still fail.
        let constraints = vec![
            ("verdict".to_string(), FieldValue::from("true")),
            ("no_such_field".to_string(), FieldValue::from("x")),
        ];
        assert!(matches!(
            filter_samples(&samples, &constraints),
            Err(Error::FieldNotFound(_))
        ));
    }
}
