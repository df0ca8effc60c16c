//! Per-parser aggregation of question scores

use super::dataset::{Dataset, Prediction, QuestionId};
use super::scoring::{QuestionScore, SimilarityBucket, score_question};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// How many best/worst examples a summary keeps
pub const EXAMPLE_COUNT: usize = 5;

/// A single scored answer kept as an example in the summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchExample {
    pub question_id: QuestionId,
    pub question: String,
    pub ground_truth: Vec<String>,
    pub predicted: String,
    pub similarity: f64,
}

impl From<&QuestionScore> for MatchExample {
    fn from(score: &QuestionScore) -> Self {
        Self {
            question_id: score.question_id.clone(),
            question: score.question.clone(),
            ground_truth: score.ground_truth.clone(),
            predicted: score.predicted.clone(),
            similarity: score.similarity,
        }
    }
}

/// Aggregate metrics for one parser over one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub parser: String,
    pub total_questions: usize,
    pub evaluated_questions: usize,
    pub missing_predictions: Vec<QuestionId>,

    pub exact_matches: usize,
    pub exact_match_rate: f64,
    /// Lenient count; includes exact matches
    pub normalized_matches: usize,
    pub normalized_match_rate: f64,
    /// Normalized matches that are not also exact
    #[serde(default)]
    pub normalized_only_matches: usize,
    /// `exact_matches + normalized_only_matches`
    #[serde(default)]
    pub matches_total: usize,
    pub partial_matches: usize,
    pub partial_match_rate: f64,

    pub high_similarity: usize,
    pub high_similarity_rate: f64,
    pub medium_similarity: usize,
    pub medium_similarity_rate: f64,
    pub low_similarity: usize,
    pub low_similarity_rate: f64,
    pub no_match: usize,
    pub no_match_rate: f64,

    pub average_similarity: f64,
    pub mean_anls: f64,
    /// `None` when no evaluated question carried ground-truth evidence
    pub mean_average_precision: Option<f64>,

    pub average_confidence: f64,
    pub average_processing_time: f64,
    pub total_processing_time: f64,

    /// Highest similarity first; ties keep dataset order
    pub best_matches: Vec<MatchExample>,
    /// Lowest similarity first; ties keep dataset order
    pub worst_matches: Vec<MatchExample>,
}

/// Summary plus the per-question rows it was computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub summary: EvaluationResult,
    pub details: Vec<QuestionScore>,
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { count as f64 / total as f64 }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Summarize question scores; `missing_predictions` lists ids with no prediction
pub fn summarize(parser: &str, total_questions: usize, missing_predictions: Vec<QuestionId>, details: &[QuestionScore]) -> EvaluationResult {
    let evaluated = details.len();
    let count = |predicate: &dyn Fn(&QuestionScore) -> bool| details.iter().filter(|s| predicate(s)).count();

    let exact_matches = count(&|s| s.exact_match);
    let normalized_matches = count(&|s| s.normalized_match);
    let normalized_only_matches = count(&|s| s.normalized_match && !s.exact_match);
    let partial_matches = count(&|s| s.partial_match);
    let high = count(&|s| s.bucket == SimilarityBucket::High);
    let medium = count(&|s| s.bucket == SimilarityBucket::Medium);
    let low = count(&|s| s.bucket == SimilarityBucket::Low);
    let none = count(&|s| s.bucket == SimilarityBucket::NoMatch);

    // stable sorts keep dataset order among equal similarities
    let mut best: Vec<&QuestionScore> = details.iter().collect();
    best.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    let mut worst: Vec<&QuestionScore> = details.iter().collect();
    worst.sort_by(|a, b| a.similarity.total_cmp(&b.similarity));

    let total_processing_time: f64 = details.iter().map(|s| s.processing_time).sum();

    EvaluationResult {
        parser: parser.to_string(),
        total_questions,
        evaluated_questions: evaluated,
        missing_predictions,
        exact_matches,
        exact_match_rate: rate(exact_matches, evaluated),
        normalized_matches,
        normalized_match_rate: rate(normalized_matches, evaluated),
        normalized_only_matches,
        matches_total: exact_matches + normalized_only_matches,
        partial_matches,
        partial_match_rate: rate(partial_matches, evaluated),
        high_similarity: high,
        high_similarity_rate: rate(high, evaluated),
        medium_similarity: medium,
        medium_similarity_rate: rate(medium, evaluated),
        low_similarity: low,
        low_similarity_rate: rate(low, evaluated),
        no_match: none,
        no_match_rate: rate(none, evaluated),
        average_similarity: mean(details.iter().map(|s| s.similarity)).unwrap_or(0.0),
        mean_anls: mean(details.iter().map(|s| s.anls)).unwrap_or(0.0),
        mean_average_precision: mean(details.iter().filter_map(|s| s.evidence_ap)),
        average_confidence: mean(details.iter().map(|s| s.confidence)).unwrap_or(0.0),
        average_processing_time: mean(details.iter().map(|s| s.processing_time)).unwrap_or(0.0),
        total_processing_time,
        best_matches: best.into_iter().take(EXAMPLE_COUNT).map(MatchExample::from).collect(),
        worst_matches: worst.into_iter().take(EXAMPLE_COUNT).map(MatchExample::from).collect(),
    }
}

/// Score `predictions` against the first `max_questions` of `dataset`
///
/// Questions without a prediction are listed and skipped; predictions for
/// unknown ids are ignored.
pub fn evaluate(parser: &str, dataset: &Dataset, max_questions: Option<usize>, predictions: &[Prediction], anls_threshold: f64) -> EvaluationReport {
    let by_id: BTreeMap<&QuestionId, &Prediction> = predictions.iter().map(|p| (&p.question_id, p)).rev().collect();
    let questions = dataset.head(max_questions);

    let unknown = predictions.iter().filter(|p| dataset.get(&p.question_id).is_none()).count();
    if unknown > 0 {
        warn!("{}: ignoring {} predictions for unknown questions", parser, unknown);
    }

    let mut missing = Vec::new();
    let mut details = Vec::with_capacity(questions.len());
    for question in questions {
        match by_id.get(&question.question_id) {
            Some(prediction) => details.push(score_question(question, prediction, anls_threshold)),
            None => {
                warn!("{}: no prediction for question {}", parser, question.question_id);
                missing.push(question.question_id.clone());
            }
        }
    }

    EvaluationReport {
        summary: summarize(parser, questions.len(), missing, &details),
        details,
    }
}
