// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Seeded train/val/test splitting, optionally stratified by a sample field.
//!
//! Cut boundaries truncate: train takes `floor(n * train)`, val takes
//! `floor(n * val)` of what follows, and test absorbs every remainder
//! element. Fixing the seed, the proportions, and the input ordering
//! reproduces the identical partition.

use crate::error::{Error, Result};
use crate::schema::FieldAccess;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Parameters of a split request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSpec {
    pub train: f64,
    pub val: f64,
    pub test: f64,
    /// Dot-path field to stratify by, e.g. `"verdict"` or `"metadata.topic"`.
    pub stratify_by: Option<String>,
    pub seed: u64,
}

impl Default for SplitSpec {
    fn default() -> Self {
        Self {
            train: 0.7,
            val: 0.15,
            test: 0.15,
            stratify_by: None,
            seed: 42,
        }
    }
}

/// The three split partitions, in split order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitAssignment<T> {
    pub train: Vec<T>,
    pub val: Vec<T>,
    pub test: Vec<T>,
}

impl<T> SplitAssignment<T> {
    pub fn total(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    /// Look up a split by name.
    pub fn get(&self, name: &str) -> Result<&[T]> {
        match name {
            "train" => Ok(&self.train),
            "val" | "validation" => Ok(&self.val),
            "test" => Ok(&self.test),
            other => Err(Error::UnknownSplit(other.to_string())),
        }
    }
}

/// Partition `samples` into train/val/test according to `spec`.
pub fn split_samples<T: FieldAccess + Clone>(
    samples: &[T],
    spec: &SplitSpec,
) -> Result<SplitAssignment<T>> {
    let sum = spec.train + spec.val + spec.test;
    if (sum - 1.0).abs() > 0.01 {
        return Err(Error::InvalidProportions { sum });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(spec.seed);

    match &spec.stratify_by {
        None => {
            let mut shuffled = samples.to_vec();
            shuffled.shuffle(&mut rng);
            Ok(cut(shuffled, spec.train, spec.val))
        }
        Some(field) => {
            // Group by the field's canonical string, preserving the order of
            // first occurrence so the shared RNG consumes a stable sequence.
            let mut groups: Vec<(String, Vec<T>)> = Vec::new();
            for sample in samples {
                let key = sample.field(field)?.canonical();
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, members)) => members.push(sample.clone()),
                    None => groups.push((key, vec![sample.clone()])),
                }
            }

            let mut train = Vec::new();
            let mut val = Vec::new();
            let mut test = Vec::new();
            for (_, mut members) in groups {
                members.shuffle(&mut rng);
                let part = cut(members, spec.train, spec.val);
                train.extend(part.train);
                val.extend(part.val);
                test.extend(part.test);
            }

            // One more shuffle per split breaks the group concatenation order.
            train.shuffle(&mut rng);
            val.shuffle(&mut rng);
            test.shuffle(&mut rng);

            Ok(SplitAssignment { train, val, test })
        }
    }
}

fn cut<T>(mut samples: Vec<T>, train: f64, val: f64) -> SplitAssignment<T> {
    let n = samples.len();
    let train_end = (n as f64 * train) as usize;
    let val_end = train_end + (n as f64 * val) as usize;

    let test = samples.split_off(val_end);
    let val = samples.split_off(train_end);
    SplitAssignment {
        train: samples,
        val,
        test,
    }
}
