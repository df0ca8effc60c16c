//! DocVQA visual question answering benchmark
//!
//! The flow is load → predict → score → aggregate → persist:
//!
//! - [`dataset`]: question and prediction records
//! - [`generator`]: answers every question with one parser
//! - [`evidence`]: evidence vectors for generated answers
//! - [`scoring`]: per-question answer and evidence metrics
//! - [`evaluation`]: per-parser aggregation
//! - [`comparison`]: rankings across parsers
//! - [`report`]: JSON, CSV and HTML output

pub mod comparison;
pub mod dataset;
pub mod evaluation;
pub mod evidence;
pub mod generator;
pub mod numbers;
pub mod report;
pub mod scoring;

pub use comparison::{Comparison, ComparisonRow, Ranking, compare, render_table};
pub use dataset::{Dataset, Prediction, Question, QuestionId, load_predictions};
pub use evaluation::{EvaluationReport, EvaluationResult, evaluate};
pub use generator::PredictionGenerator;
pub use report::{ReportWriter, load_summary};
pub use scoring::{QuestionScore, SimilarityBucket};

use crate::Result;
use crate::config::DocVqaConfig;
use doccraft::DocumentParser;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Runs the DocVQA pipeline for one or more parsers
pub struct DocVqaBenchmark {
    config: DocVqaConfig,
}

impl DocVqaBenchmark {
    pub fn new(config: DocVqaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DocVqaConfig {
        &self.config
    }

    fn writer(&self) -> ReportWriter {
        ReportWriter::new(&self.config.output_dir)
    }

    /// Generate and persist predictions for one parser
    pub async fn predict(&self, parser: &dyn DocumentParser) -> Result<Vec<Prediction>> {
        let dataset = Dataset::load(&self.config.dataset)?;
        let predictions = PredictionGenerator::new(&self.config).generate(parser, &dataset).await;
        self.writer().write_predictions(parser.name(), &predictions)?;
        Ok(predictions)
    }

    /// Score an existing predictions file and persist the results
    pub fn evaluate_file(&self, parser: &str, predictions_path: &Path) -> Result<EvaluationReport> {
        let dataset = Dataset::load(&self.config.dataset)?;
        let predictions = load_predictions(predictions_path)?;
        self.evaluate_predictions(parser, &dataset, &predictions)
    }

    fn evaluate_predictions(&self, parser: &str, dataset: &Dataset, predictions: &[Prediction]) -> Result<EvaluationReport> {
        let report = evaluate(
            parser,
            dataset,
            self.config.max_questions,
            predictions,
            self.config.anls_threshold,
        );
        self.writer().write_evaluation(&report)?;
        Ok(report)
    }

    /// Predict and evaluate with every parser, comparing them when there are several
    pub async fn run(&self, parsers: &[Arc<dyn DocumentParser>]) -> Result<Vec<EvaluationResult>> {
        let dataset = Dataset::load(&self.config.dataset)?;
        info!(
            "Loaded {} questions from {}",
            dataset.len(),
            self.config.dataset.display()
        );

        let generator = PredictionGenerator::new(&self.config);
        let writer = self.writer();
        let mut summaries = Vec::with_capacity(parsers.len());

        for parser in parsers {
            let predictions = generator.generate(parser.as_ref(), &dataset).await;
            writer.write_predictions(parser.name(), &predictions)?;

            let report = self.evaluate_predictions(parser.name(), &dataset, &predictions)?;
            info!(
                "{}: exact {:.1}%, ANLS {:.3}, {:.2}s/question",
                parser.name(),
                report.summary.exact_match_rate * 100.0,
                report.summary.mean_anls,
                report.summary.average_processing_time
            );
            summaries.push(report.summary);
        }

        if summaries.len() > 1 {
            let comparison = compare(&summaries);
            writer.write_comparison(&comparison)?;
            info!("\n{}", render_table(&comparison));
        }

        Ok(summaries)
    }
}
