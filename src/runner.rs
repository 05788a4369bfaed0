// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Batch model inference against a dataset.
//!
//! The runner is model-agnostic: anything implementing [`ModelProvider`] can
//! be driven. Inference failures never abort a batch; they become predictions
//! with a `Missing` value so downstream metrics see every sample. Each call
//! is bounded by the configured timeout; an expired call is abandoned and
//! recorded as a failed prediction. There is no cancellation propagation
//! beyond that per-call bound.

use crate::schema::{ModelPrediction, PredictionValue, Stage1Sample, Stage2Sample};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

/// Inference parameters for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub temperature: f64,
    pub max_tokens: usize,
    pub timeout_secs: u64,
    /// Concurrent inference workers.
    pub workers: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 1024,
            timeout_secs: 30,
            workers: 5,
        }
    }
}

/// What the model sees for one sample: raw text for Stage 1, the claim for
/// Stage 2.
#[derive(Debug, Clone)]
pub struct InferenceInput {
    pub sample_id: String,
    pub content: String,
}

impl From<&Stage1Sample> for InferenceInput {
    fn from(sample: &Stage1Sample) -> Self {
        Self {
            sample_id: sample.id.clone(),
            content: sample.text.clone(),
        }
    }
}

impl From<&Stage2Sample> for InferenceInput {
    fn from(sample: &Stage2Sample) -> Self {
        Self {
            sample_id: sample.id.clone(),
            content: sample.claim.clone(),
        }
    }
}

/// Raw model response before it is folded into a [`ModelPrediction`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceResponse {
    #[serde(default)]
    pub prediction: PredictionValue,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub sources: Vec<crate::schema::Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub tokens_used: usize,
    /// Provider-reported failure. Set, the whole response is discarded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A model backend the runner can drive. Implementations must be shareable
/// across worker threads.
pub trait ModelProvider: Send + Sync {
    /// Run one inference call. `config` carries the sampling parameters
    /// (temperature, max_tokens) the provider should apply; the runner
    /// enforces `timeout_secs` around the call regardless.
    fn infer(
        &self,
        model: &str,
        system_prompt: &str,
        input: &InferenceInput,
        config: &RunnerConfig,
    ) -> anyhow::Result<InferenceResponse>;

    /// Provider name recorded in prediction metadata.
    fn name(&self) -> &str;
}

/// Drives batches of inference calls through a [`ModelProvider`].
pub struct ModelRunner<P> {
    provider: Arc<P>,
    config: RunnerConfig,
}

impl<P: ModelProvider + 'static> ModelRunner<P> {
    pub fn new(provider: P, config: RunnerConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            config,
        }
    }

    /// Run one sample. Provider errors, error-carrying responses, and calls
    /// exceeding the configured timeout become a failed prediction rather
    /// than propagating.
    pub fn run_single(
        &self,
        model: &str,
        system_prompt: &str,
        input: &InferenceInput,
    ) -> ModelPrediction {
        run_one(&self.provider, model, system_prompt, &self.config, input)
    }

    /// Run a whole batch through a bounded worker pool. Results arrive in
    /// completion order, not input order; callers join by `sample_id`.
    pub fn run_batch(
        &self,
        model: &str,
        system_prompt: &str,
        inputs: Vec<InferenceInput>,
    ) -> Vec<ModelPrediction> {
        let total = inputs.len();
        if total == 0 {
            return Vec::new();
        }

        let progress = ProgressBar::new(total as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}] {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let workers = self.config.workers.max(1).min(total);
        let (job_tx, job_rx) = mpsc::channel::<InferenceInput>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, result_rx) = mpsc::channel::<ModelPrediction>();

        for input in inputs {
            // Receiver outlives this loop; send cannot fail.
            let _ = job_tx.send(input);
        }
        drop(job_tx);

        let config = &self.config;
        std::thread::scope(|scope| {
            for _ in 0..workers {
                let provider = Arc::clone(&self.provider);
                let job_rx = Arc::clone(&job_rx);
                let result_tx = result_tx.clone();
                let model = model.to_string();
                let system_prompt = system_prompt.to_string();
                scope.spawn(move || loop {
                    let job = {
                        let guard = match job_rx.lock() {
                            Ok(guard) => guard,
                            Err(_) => break,
                        };
                        guard.recv()
                    };
                    match job {
                        Ok(input) => {
                            let prediction =
                                run_one(&provider, &model, &system_prompt, config, &input);
                            if result_tx.send(prediction).is_err() {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                });
            }
            drop(result_tx);

            let mut predictions = Vec::with_capacity(total);
            for prediction in result_rx {
                progress.inc(1);
                predictions.push(prediction);
            }
            progress.finish_with_message("done");
            predictions
        })
    }
}

fn run_one<P: ModelProvider + 'static>(
    provider: &Arc<P>,
    model: &str,
    system_prompt: &str,
    config: &RunnerConfig,
    input: &InferenceInput,
) -> ModelPrediction {
    let started = Instant::now();

    // The call runs on a detached thread so an expired timeout abandons it
    // instead of blocking the worker; the thread ends when the call returns.
    let (tx, rx) = mpsc::channel();
    {
        let provider = Arc::clone(provider);
        let model = model.to_string();
        let system_prompt = system_prompt.to_string();
        let config = config.clone();
        let input = input.clone();
        std::thread::spawn(move || {
            let _ = tx.send(provider.infer(&model, &system_prompt, &input, &config));
        });
    }

    let outcome = match rx.recv_timeout(Duration::from_secs(config.timeout_secs)) {
        Ok(outcome) => outcome,
        Err(_) => Err(anyhow::anyhow!(
            "inference timed out after {}s",
            config.timeout_secs
        )),
    };
    let latency = started.elapsed().as_secs_f64();

    match outcome {
        Ok(response) if response.error.is_none() => ModelPrediction {
            sample_id: input.sample_id.clone(),
            prediction: response.prediction,
            confidence: response.confidence,
            explanation: response.explanation,
            sources: response.sources,
            latency,
            cost: response.cost,
            metadata: prediction_metadata(model, response.tokens_used, None),
        },
        Ok(response) => {
            let error = response.error.unwrap_or_default();
            warn!(sample_id = %input.sample_id, %error, "provider reported failure");
            failed_prediction(input, model, latency, error)
        }
        Err(e) => {
            warn!(sample_id = %input.sample_id, error = %e, "inference call failed");
            failed_prediction(input, model, latency, e.to_string())
        }
    }
}

fn failed_prediction(
    input: &InferenceInput,
    model: &str,
    latency: f64,
    error: String,
) -> ModelPrediction {
    ModelPrediction {
        sample_id: input.sample_id.clone(),
        prediction: PredictionValue::Missing,
        confidence: 0.0,
        explanation: None,
        sources: vec![],
        latency,
        cost: 0.0,
        metadata: prediction_metadata(model, 0, Some(error)),
    }
}

fn prediction_metadata(
    model: &str,
    tokens_used: usize,
    error: Option<String>,
) -> HashMap<String, serde_json::Value> {
    let mut metadata = HashMap::new();
    metadata.insert("model".to_string(), serde_json::json!(model));
    metadata.insert("tokens_used".to_string(), serde_json::json!(tokens_used));
    metadata.insert("success".to_string(), serde_json::json!(error.is_none()));
    if let Some(error) = error {
        metadata.insert("error".to_string(), serde_json::json!(error));
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Verdict;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers "true" for even-numbered sample ids and fails on ids
    /// containing "err".
    struct MockProvider {
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ModelProvider for MockProvider {
        fn infer(
            &self,
            _model: &str,
            _system_prompt: &str,
            input: &InferenceInput,
            _config: &RunnerConfig,
        ) -> anyhow::Result<InferenceResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if input.sample_id.contains("err") {
                anyhow::bail!("simulated provider outage");
            }
            if input.sample_id.contains("soft") {
                return Ok(InferenceResponse {
                    error: Some("rate limited".to_string()),
                    ..Default::default()
                });
            }
            Ok(InferenceResponse {
                prediction: PredictionValue::Verdict(Verdict::True),
                confidence: 0.8,
                cost: 0.002,
                tokens_used: 120,
                ..Default::default()
            })
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn input(id: &str) -> InferenceInput {
        InferenceInput {
            sample_id: id.to_string(),
            content: format!("content {id}"),
        }
    }

    #[test]
    fn successful_call_populates_prediction() {
        let runner = ModelRunner::new(MockProvider::new(), RunnerConfig::default());
        let prediction = runner.run_single("m1", "verify this claim", &input("s1"));
        assert_eq!(
            prediction.prediction,
            PredictionValue::Verdict(Verdict::True)
        );
        assert!((prediction.confidence - 0.8).abs() < 1e-9);
        assert!(prediction.succeeded());
        assert_eq!(prediction.metadata["tokens_used"], serde_json::json!(120));
    }

    #[test]
    fn provider_error_becomes_failed_prediction() {
        let runner = ModelRunner::new(MockProvider::new(), RunnerConfig::default());
        let prediction = runner.run_single("m1", "verify", &input("err-1"));
        assert!(prediction.prediction.is_missing());
        assert!(!prediction.succeeded());
        assert_eq!(prediction.confidence, 0.0);
        assert!(prediction.metadata["error"]
            .as_str()
            .unwrap()
            .contains("outage"));
    }

    #[test]
    fn error_carrying_response_is_treated_as_failure() {
        let runner = ModelRunner::new(MockProvider::new(), RunnerConfig::default());
        let prediction = runner.run_single("m1", "verify", &input("soft-1"));
        assert!(prediction.prediction.is_missing());
        assert_eq!(
            prediction.metadata["error"],
            serde_json::json!("rate limited")
        );
    }

    /// Echoes the sampling parameters it was given back through the response.
    struct ParameterEcho;

    impl ModelProvider for ParameterEcho {
        fn infer(
            &self,
            _model: &str,
            _system_prompt: &str,
            _input: &InferenceInput,
            config: &RunnerConfig,
        ) -> anyhow::Result<InferenceResponse> {
            Ok(InferenceResponse {
                prediction: PredictionValue::Boolean(true),
                confidence: config.temperature,
                tokens_used: config.max_tokens,
                ..Default::default()
            })
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    /// Never answers within any finite timeout used in these tests.
    struct StalledProvider;

    impl ModelProvider for StalledProvider {
        fn infer(
            &self,
            _model: &str,
            _system_prompt: &str,
            _input: &InferenceInput,
            _config: &RunnerConfig,
        ) -> anyhow::Result<InferenceResponse> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(InferenceResponse::default())
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[test]
    fn provider_receives_sampling_parameters() {
        let config = RunnerConfig {
            temperature: 0.7,
            max_tokens: 256,
            ..Default::default()
        };
        let runner = ModelRunner::new(ParameterEcho, config);
        let prediction = runner.run_single("m1", "verify", &input("s1"));
        assert!((prediction.confidence - 0.7).abs() < 1e-9);
        assert_eq!(prediction.metadata["tokens_used"], serde_json::json!(256));
    }

    #[test]
    fn call_exceeding_timeout_becomes_failed_prediction() {
        let runner = ModelRunner::new(
            StalledProvider,
            RunnerConfig {
                timeout_secs: 0,
                ..Default::default()
            },
        );
        let prediction = runner.run_single("m1", "verify", &input("s1"));
        assert!(prediction.prediction.is_missing());
        assert!(!prediction.succeeded());
        assert!(prediction.metadata["error"]
            .as_str()
            .unwrap()
            .contains("timed out"));
    }

    #[test]
    fn batch_covers_every_input_exactly_once() {
        let runner = ModelRunner::new(
            MockProvider::new(),
            RunnerConfig {
                workers: 3,
                ..Default::default()
            },
        );
        let inputs: Vec<InferenceInput> = (0..25).map(|i| input(&format!("s{i}"))).collect();
        let predictions = runner.run_batch("m1", "detect claims", inputs);

        assert_eq!(predictions.len(), 25);
        let mut ids: Vec<&str> = predictions.iter().map(|p| p.sample_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 25);
    }

    #[test]
    fn batch_mixes_failures_and_successes() {
        let runner = ModelRunner::new(MockProvider::new(), RunnerConfig::default());
        let inputs = vec![input("s1"), input("err-2"), input("s3")];
        let predictions = runner.run_batch("m1", "verify", inputs);
        assert_eq!(predictions.len(), 3);
        let failed = predictions.iter().filter(|p| !p.succeeded()).count();
        assert_eq!(failed, 1);
    }

    #[test]
    fn empty_batch_returns_empty() {
        let runner = ModelRunner::new(MockProvider::new(), RunnerConfig::default());
        let predictions = runner.run_batch("m1", "verify", vec![]);
        assert!(predictions.is_empty());
    }
}
