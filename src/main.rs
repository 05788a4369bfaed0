// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 factcheck-eval contributors

//! Evaluation CLI for the two-stage fact-checking pipeline
//!
//! Usage:
//!   factcheck-eval --stage 1 --dataset stage1.json --predictions preds.jsonl
//!   factcheck-eval --stage 2 --dataset stage2.json --predictions preds.json --format both

use anyhow::{Context, Result};
use clap::Parser;
use factcheck_eval::evaluators::EvalOutcome;
use factcheck_eval::schema::ModelPrediction;
use factcheck_eval::{DatasetManager, Stage1Evaluator, Stage1Report, Stage2Evaluator, Stage2Report};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "factcheck-eval")]
#[command(about = "Evaluate fact-checking model predictions against annotated datasets")]
#[command(version)]
struct Args {
    /// Pipeline stage to evaluate (1 = claim detection, 2 = verification)
    #[arg(short, long)]
    stage: u8,

    /// Directory containing dataset files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Dataset filename inside the data directory
    #[arg(short, long)]
    dataset: String,

    /// Predictions file (JSON array or newline-delimited JSON)
    #[arg(short, long)]
    predictions: PathBuf,

    /// Output directory for reports
    #[arg(short, long, default_value = "results")]
    output: PathBuf,

    /// Output format (json, markdown, both)
    #[arg(short, long, default_value = "json")]
    format: String,

    /// Model name recorded in the report
    #[arg(short, long, default_value = "unknown")]
    model: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    anyhow::ensure!(
        args.stage == 1 || args.stage == 2,
        "stage must be 1 or 2, got {}",
        args.stage
    );

    tracing::info!(stage = args.stage, model = %args.model, "fact-check evaluation");

    let predictions = load_predictions(&args.predictions)
        .with_context(|| format!("loading predictions from {}", args.predictions.display()))?;
    tracing::info!(count = predictions.len(), "loaded predictions");

    let mut manager = DatasetManager::new(&args.data_dir);

    let (report_json, markdown) = if args.stage == 1 {
        manager
            .load_stage1(&args.dataset)
            .with_context(|| format!("loading stage 1 dataset {}", args.dataset))?;
        let outcome = Stage1Evaluator.evaluate(manager.stage1()?, &predictions);
        print_stage1_summary(&outcome);
        (
            serde_json::to_value(&outcome)?,
            stage1_markdown(&args.model, &outcome),
        )
    } else {
        manager
            .load_stage2(&args.dataset)
            .with_context(|| format!("loading stage 2 dataset {}", args.dataset))?;
        let outcome = Stage2Evaluator.evaluate(manager.stage2()?, &predictions);
        print_stage2_summary(&outcome);
        (
            serde_json::to_value(&outcome)?,
            stage2_markdown(&args.model, &outcome),
        )
    };

    std::fs::create_dir_all(&args.output)?;
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");

    if args.format == "json" || args.format == "both" {
        let path = args
            .output
            .join(format!("eval_stage{}_{}.json", args.stage, timestamp));
        let wrapped = serde_json::json!({
            "model": args.model,
            "stage": args.stage,
            "dataset": args.dataset,
            "timestamp": chrono::Utc::now(),
            "metrics": report_json,
        });
        std::fs::write(&path, serde_json::to_string_pretty(&wrapped)?)?;
        println!("JSON report saved to: {}", path.display());
    }

    if args.format == "markdown" || args.format == "both" {
        let path = args
            .output
            .join(format!("eval_stage{}_{}.md", args.stage, timestamp));
        std::fs::write(&path, markdown)?;
        println!("Markdown report saved to: {}", path.display());
    }

    Ok(())
}

/// Predictions arrive either as a JSON array or as newline-delimited JSON.
fn load_predictions(path: &Path) -> Result<Vec<ModelPrediction>> {
    let data = std::fs::read_to_string(path)?;
    if data.trim_start().starts_with('[') {
        Ok(serde_json::from_str(&data)?)
    } else {
        Ok(factcheck_eval::datasets::load_jsonl(path)?)
    }
}

fn print_stage1_summary(outcome: &EvalOutcome<Stage1Report>) {
    println!("\n{}", "=".repeat(60));
    println!("STAGE 1: CLAIM DETECTION");
    println!("{}", "=".repeat(60));
    match outcome.report() {
        Some(r) => {
            println!("Samples:   {}", r.total_samples);
            println!("Accuracy:  {:.4}", r.accuracy);
            println!("Precision: {:.4}", r.precision);
            println!("Recall:    {:.4}", r.recall);
            println!("F1:        {:.4}", r.f1_score);
            println!(
                "FP: {}  FN: {}  (rates {:.4} / {:.4})",
                r.false_positives, r.false_negatives, r.false_positive_rate, r.false_negative_rate
            );
            println!(
                "Latency: mean {:.2}s p95 {:.2}s   Cost: ${:.4} total",
                r.performance.mean_latency, r.performance.p95_latency, r.performance.total_cost
            );
        }
        None => println!("Evaluation failed: no predictions matched the dataset"),
    }
}

fn print_stage2_summary(outcome: &EvalOutcome<Stage2Report>) {
    println!("\n{}", "=".repeat(60));
    println!("STAGE 2: CLAIM VERIFICATION");
    println!("{}", "=".repeat(60));
    match outcome.report() {
        Some(r) => {
            println!("Samples:   {}", r.total_samples);
            println!("Accuracy:  {:.4}", r.accuracy);
            println!(
                "Critical errors: {} ({:.4} rate, true->false {} / false->true {})",
                r.critical_errors.total_critical_errors,
                r.critical_errors.critical_error_rate,
                r.critical_errors.true_marked_false,
                r.critical_errors.false_marked_true
            );
            println!(
                "ECE: {:.4}   Source overlap: {:.4}",
                r.calibration.expected_calibration_error, r.source_quality.avg_source_overlap
            );
            println!(
                "Latency: mean {:.2}s p95 {:.2}s   Cost: ${:.4} total",
                r.performance.mean_latency, r.performance.p95_latency, r.performance.total_cost
            );
        }
        None => println!("Evaluation failed: no predictions matched the dataset"),
    }
}

fn stage1_markdown(model: &str, outcome: &EvalOutcome<Stage1Report>) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Stage 1 Evaluation: {model}\n\n"));
    match outcome.report() {
        Some(r) => {
            out.push_str("| Metric | Value |\n|--------|-------|\n");
            out.push_str(&format!("| Accuracy | {:.4} |\n", r.accuracy));
            out.push_str(&format!("| Precision | {:.4} |\n", r.precision));
            out.push_str(&format!("| Recall | {:.4} |\n", r.recall));
            out.push_str(&format!("| F1 | {:.4} |\n", r.f1_score));
            out.push_str(&format!("| Samples | {} |\n", r.total_samples));
            out.push_str(&format!(
                "| False positives | {} |\n| False negatives | {} |\n",
                r.false_positives, r.false_negatives
            ));
            out.push_str("\n## Accuracy by platform\n\n| Platform | Accuracy | N |\n|----------|----------|---|\n");
            for (platform, acc) in &r.error_analysis.by_platform {
                out.push_str(&format!(
                    "| {platform} | {:.4} | {} |\n",
                    acc.accuracy, acc.total
                ));
            }
        }
        None => out.push_str("Evaluation failed: no predictions matched the dataset.\n"),
    }
    out
}

fn stage2_markdown(model: &str, outcome: &EvalOutcome<Stage2Report>) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Stage 2 Evaluation: {model}\n\n"));
    match outcome.report() {
        Some(r) => {
            out.push_str("| Metric | Value |\n|--------|-------|\n");
            out.push_str(&format!("| Accuracy | {:.4} |\n", r.accuracy));
            out.push_str(&format!(
                "| Critical errors | {} ({:.4}) |\n",
                r.critical_errors.total_critical_errors, r.critical_errors.critical_error_rate
            ));
            out.push_str(&format!(
                "| ECE | {:.4} |\n",
                r.calibration.expected_calibration_error
            ));
            out.push_str(&format!(
                "| Source overlap | {:.4} |\n",
                r.source_quality.avg_source_overlap
            ));
            out.push_str(&format!("| Samples | {} |\n", r.total_samples));

            out.push_str("\n## Per-class metrics\n\n| Class | Precision | Recall | F1 | Support |\n|-------|-----------|--------|----|---------|\n");
            for verdict in factcheck_eval::multiclass::VERDICT_LABELS {
                let class = r.per_class.get(verdict);
                out.push_str(&format!(
                    "| {} | {:.4} | {:.4} | {:.4} | {} |\n",
                    verdict.as_str(),
                    class.precision,
                    class.recall,
                    class.f1_score,
                    class.support
                ));
            }

            out.push_str("\n## Accuracy by difficulty\n\n| Difficulty | Accuracy | N |\n|------------|----------|---|\n");
            for (difficulty, acc) in &r.error_analysis.by_difficulty {
                out.push_str(&format!(
                    "| {difficulty} | {:.4} | {} |\n",
                    acc.accuracy, acc.total
                ));
            }
        }
        None => out.push_str("Evaluation failed: no predictions matched the dataset.\n"),
    }
    out
}
