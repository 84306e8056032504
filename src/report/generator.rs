//! Summary generation.
//!
//! This module formats evaluated models for the console and writes the
//! plain-text and JSON summaries.

use crate::models::{EvaluatedModel, EvaluationReport};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Width of the `=` rules framing headers.
const RULE_WIDTH: usize = 80;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Console block for one model, including micro-averaged F1.
pub fn console_summary(model: &EvaluatedModel) -> String {
    let m = &model.metrics;
    let mut block = String::new();

    block.push_str(&format!("\n{}\n", rule()));
    block.push_str(&format!("{}\n", model.name));
    block.push_str(&format!("{}\n", rule()));
    block.push_str(&format!("  Accuracy:       {:.4}\n", m.accuracy));
    block.push_str(&format!("  F1 Score (macro): {:.4}\n", m.f1_macro));
    block.push_str(&format!("  F1 Score (micro): {:.4}\n", m.f1_micro));
    block.push_str(&format!("  Precision:      {:.4}\n", m.precision));
    block.push_str(&format!("  Recall:         {:.4}\n", m.recall));

    block
}

/// Generate the plain-text summary.
pub fn generate_text_summary(models: &[EvaluatedModel], family: &str) -> String {
    let mut output = String::new();

    // Header
    output.push_str(&format!("{}\n", rule()));
    output.push_str(&format!("{} Model Evaluation Summary\n", family));
    output.push_str(&format!("{}\n\n", rule()));

    for model in models {
        output.push_str(&generate_model_section(model));
    }

    output
}

fn generate_model_section(model: &EvaluatedModel) -> String {
    let m = &model.metrics;
    let mut section = String::new();

    section.push_str(&format!("Model: {}\n", model.name));
    section.push_str(&format!("  Accuracy:       {:.4}\n", m.accuracy));
    section.push_str(&format!("  F1 Score (macro): {:.4}\n", m.f1_macro));
    section.push_str(&format!("  Precision:      {:.4}\n", m.precision));
    section.push_str(&format!("  Recall:         {:.4}\n", m.recall));
    section.push('\n');

    section
}

/// Write the plain-text summary to a file.
pub fn write_text_summary(models: &[EvaluatedModel], family: &str, path: &Path) -> Result<()> {
    let content = generate_text_summary(models, family);
    write_file(path, &content)
}

/// Generate a JSON report.
pub fn generate_json_report(report: &EvaluationReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(report: &EvaluationReport, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;
    write_file(path, &content)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassificationMetrics, ConfusionMatrix, ReportMetadata};
    use chrono::Utc;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_model(name: &str) -> EvaluatedModel {
        EvaluatedModel {
            name: name.to_string(),
            metrics: ClassificationMetrics {
                accuracy: 1.0 / 3.0,
                f1_macro: 0.266_666_7,
                f1_micro: 1.0 / 3.0,
                precision: 2.0 / 9.0,
                recall: 1.0 / 3.0,
            },
            confusion: ConfusionMatrix {
                labels: vec![0, 1, 2],
                counts: vec![vec![2, 0, 0], vec![1, 0, 1], vec![0, 2, 0]],
            },
            n_samples: 6,
            source: PathBuf::from(format!("models/{}/results.pickle", name)),
        }
    }

    fn create_test_report() -> EvaluationReport {
        EvaluationReport {
            metadata: ReportMetadata {
                models_dir: PathBuf::from("./benchmark/cnn/models"),
                evaluated_at: Utc::now(),
                family: "CNN".to_string(),
                models_evaluated: 1,
                files_skipped: 2,
                duration_seconds: 0.4,
                tool_version: "0.1.0".to_string(),
            },
            models: vec![create_test_model("cnn_ir")],
        }
    }

    #[test]
    fn test_console_summary() {
        let block = console_summary(&create_test_model("cnn_ir"));
        let lines: Vec<&str> = block.lines().collect();

        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "=".repeat(80));
        assert_eq!(lines[2], "cnn_ir");
        assert_eq!(lines[3], "=".repeat(80));
        assert_eq!(lines[4], "  Accuracy:       0.3333");
        assert_eq!(lines[5], "  F1 Score (macro): 0.2667");
        assert_eq!(lines[6], "  F1 Score (micro): 0.3333");
        assert_eq!(lines[7], "  Precision:      0.2222");
        assert_eq!(lines[8], "  Recall:         0.3333");
    }

    #[test]
    fn test_text_summary_layout() {
        let models = vec![create_test_model("cnn_hnmr"), create_test_model("cnn_ir")];
        let summary = generate_text_summary(&models, "CNN");

        let expected_header = format!("{0}\nCNN Model Evaluation Summary\n{0}\n\n", "=".repeat(80));
        assert!(summary.starts_with(&expected_header));
        assert!(summary.contains(
            "Model: cnn_hnmr\n  Accuracy:       0.3333\n  F1 Score (macro): 0.2667\n  Precision:      0.2222\n  Recall:         0.3333\n\nModel: cnn_ir\n"
        ));
        assert!(!summary.contains("micro"));
        assert!(summary.ends_with("0.3333\n\n"));
    }

    #[test]
    fn test_text_summary_family_and_empty() {
        let summary = generate_text_summary(&[], "ResNet");
        assert_eq!(summary.lines().nth(1), Some("ResNet Model Evaluation Summary"));
        assert!(!summary.contains("Model: "));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"models_dir\""));
        assert!(json.contains("\"f1_micro\""));
        assert!(json.contains("\"cnn_ir\""));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["files_skipped"], 2);
        assert_eq!(value["models"][0]["confusion"]["labels"][2], 2);
    }

    #[test]
    fn test_write_files() {
        let temp_dir = TempDir::new().unwrap();
        let report = create_test_report();

        let txt = temp_dir.path().join("summary.txt");
        write_text_summary(&report.models, "CNN", &txt).unwrap();
        assert!(std::fs::read_to_string(&txt)
            .unwrap()
            .contains("Model: cnn_ir"));

        let json = temp_dir.path().join("summary.json");
        write_json_report(&report, &json).unwrap();
        assert!(json.exists());

        let missing = temp_dir.path().join("absent").join("summary.txt");
        assert!(write_text_summary(&report.models, "CNN", &missing).is_err());
    }
}
