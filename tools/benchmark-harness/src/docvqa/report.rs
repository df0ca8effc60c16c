//! Persistence of predictions, scores and comparisons
//!
//! File names are fixed per parser so repeated runs overwrite rather than
//! accumulate.

use super::comparison::{Comparison, ComparisonRow};
use super::dataset::Prediction;
use super::evaluation::{EvaluationReport, EvaluationResult};
use super::scoring::QuestionScore;
use crate::html::write_html;
use crate::output::{write_csv, write_json};
use crate::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Flat per-question row for CSV output
#[derive(Debug, Serialize)]
struct ScoreRow<'a> {
    question_id: String,
    question: &'a str,
    ground_truth: String,
    predicted: &'a str,
    exact_match: bool,
    normalized_match: bool,
    partial_match: bool,
    similarity: f64,
    bucket: &'static str,
    anls: f64,
    evidence_ap: Option<f64>,
    confidence: f64,
    processing_time: f64,
}

impl<'a> From<&'a QuestionScore> for ScoreRow<'a> {
    fn from(score: &'a QuestionScore) -> Self {
        Self {
            question_id: score.question_id.to_string(),
            question: &score.question,
            ground_truth: score.ground_truth.join(" | "),
            predicted: &score.predicted,
            exact_match: score.exact_match,
            normalized_match: score.normalized_match,
            partial_match: score.partial_match,
            similarity: score.similarity,
            bucket: score.bucket.as_str(),
            anls: score.anls,
            evidence_ap: score.evidence_ap,
            confidence: score.confidence,
            processing_time: score.processing_time,
        }
    }
}

/// Writes DocVQA artifacts under one output directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn predictions_path(&self, parser: &str) -> PathBuf {
        self.output_dir.join(format!("{}_predictions.json", parser))
    }

    pub fn summary_path(&self, parser: &str) -> PathBuf {
        self.output_dir.join(format!("{}_summary.json", parser))
    }

    /// `{parser}_predictions.json`
    pub fn write_predictions(&self, parser: &str, predictions: &[Prediction]) -> Result<PathBuf> {
        let path = self.predictions_path(parser);
        write_json(predictions, &path)?;
        info!("Wrote {} predictions to {}", predictions.len(), path.display());
        Ok(path)
    }

    /// `{parser}_results.json`, `{parser}_results.csv` and `{parser}_summary.json`
    pub fn write_evaluation(&self, report: &EvaluationReport) -> Result<()> {
        let parser = &report.summary.parser;

        write_json(&report.details, &self.output_dir.join(format!("{}_results.json", parser)))?;

        let rows: Vec<ScoreRow<'_>> = report.details.iter().map(ScoreRow::from).collect();
        write_csv(&rows, &self.output_dir.join(format!("{}_results.csv", parser)))?;

        let summary_path = self.summary_path(parser);
        write_json(&report.summary, &summary_path)?;
        info!("Wrote {} summary to {}", parser, summary_path.display());

        Ok(())
    }

    /// `comparison.json`, `comparison.csv` and `comparison.html`
    pub fn write_comparison(&self, comparison: &Comparison) -> Result<()> {
        write_json(comparison, &self.output_dir.join("comparison.json"))?;
        write_csv::<ComparisonRow>(&comparison.rows, &self.output_dir.join("comparison.csv"))?;
        write_html(comparison, "DocVQA parser comparison", &self.output_dir.join("comparison.html"))?;
        info!("Wrote comparison of {} parsers to {}", comparison.rows.len(), self.output_dir.display());
        Ok(())
    }
}

/// Read back a `{parser}_summary.json`
pub fn load_summary(path: impl AsRef<Path>) -> Result<EvaluationResult> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| Error::Benchmark(format!("Invalid summary {}: {}", path.display(), e)))
}
