//! Answer and evidence scoring
//!
//! All functions here are pure; [`score_question`] combines them into the
//! per-question record the aggregator consumes.

use super::dataset::{Prediction, Question, QuestionId};
use super::numbers::{numeral_to_words, words_to_numeral};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid punctuation regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Lowercase, optionally drop punctuation, collapse whitespace, trim
pub fn normalize_text(text: &str, strip_punctuation: bool) -> String {
    let lowered = text.to_lowercase();
    let stripped = if strip_punctuation {
        PUNCTUATION.replace_all(&lowered, "")
    } else {
        lowered.as_str().into()
    };
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Strip currency symbols and percent signs around a numeral
fn bare_numeral(text: &str) -> &str {
    text.trim()
        .trim_start_matches(['$', '€', '£', '¥'])
        .trim_end_matches('%')
        .trim()
}

/// Every normalized spelling of an answer: the text itself plus its
/// number-words or digits form when it is a number
pub fn normalized_forms(text: &str) -> BTreeSet<String> {
    let mut forms = BTreeSet::new();
    let base = normalize_text(text, true);
    if !base.is_empty() {
        forms.insert(base);
    }
    if let Some(words) = numeral_to_words(bare_numeral(text)) {
        forms.insert(normalize_text(&words, true));
    }
    if let Some(numeral) = words_to_numeral(text) {
        forms.insert(normalize_text(&numeral, true));
    }
    forms
}

/// Any normalized form of `a` equals any normalized form of `b`
pub fn is_normalized_match(a: &str, b: &str) -> bool {
    let forms = normalized_forms(a);
    !forms.is_empty() && normalized_forms(b).iter().any(|form| forms.contains(form))
}

/// One normalized answer contains the other
pub fn is_partial_match(predicted: &str, ground_truth: &str) -> bool {
    let predicted = normalize_text(predicted, true);
    let ground_truth = normalize_text(ground_truth, true);
    if predicted.is_empty() || ground_truth.is_empty() {
        return false;
    }
    predicted.contains(&ground_truth) || ground_truth.contains(&predicted)
}

/// Longest common block, earliest in `a` then `b` on ties: (start_a, start_b, len)
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        for j in 0..b.len() {
            current[j + 1] = if a[i] == b[j] { previous[j] + 1 } else { 0 };
            let k = current[j + 1];
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    best
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (i, j, k) = longest_match(a, b);
    if k == 0 {
        return 0;
    }
    k + matching_characters(&a[..i], &b[..j]) + matching_characters(&a[i + k..], &b[j + k..])
}

/// Ratcliff/Obershelp ratio `2·M / (|a| + |b|)` of the two normalized strings
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize_text(a, true).chars().collect();
    let b: Vec<char> = normalize_text(b, true).chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / (a.len() + b.len()) as f64
}

/// Coarse similarity band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityBucket {
    High,
    Medium,
    Low,
    NoMatch,
}

impl SimilarityBucket {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            SimilarityBucket::High
        } else if score >= 0.5 {
            SimilarityBucket::Medium
        } else if score >= 0.2 {
            SimilarityBucket::Low
        } else {
            SimilarityBucket::NoMatch
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityBucket::High => "high",
            SimilarityBucket::Medium => "medium",
            SimilarityBucket::Low => "low",
            SimilarityBucket::NoMatch => "no_match",
        }
    }
}

/// Normalized Levenshtein similarity after lowercasing and trimming
pub fn normalized_levenshtein_similarity(predicted: &str, ground_truth: &str) -> f64 {
    strsim::normalized_levenshtein(
        &predicted.trim().to_lowercase(),
        &ground_truth.trim().to_lowercase(),
    )
}

/// Best thresholded similarity over all (prediction, ground truth) pairs
///
/// Pair scores below `threshold` count as 0. Either list being empty gives 0.
pub fn anls(predicted: &[String], ground_truth: &[String], threshold: f64) -> f64 {
    predicted
        .iter()
        .flat_map(|p| ground_truth.iter().map(move |g| normalized_levenshtein_similarity(p, g)))
        .map(|score| if score < threshold { 0.0 } else { score })
        .fold(0.0, f64::max)
}

/// Pad with zeros or truncate to `len`
pub fn repair_length(scores: &[f64], len: usize) -> Vec<f64> {
    let mut repaired: Vec<f64> = scores.iter().copied().take(len).collect();
    repaired.resize(len, 0.0);
    repaired
}

/// Average precision of the predicted ranking against relevance labels
///
/// Slots are ranked by descending predicted score (stable, so ties keep slot
/// order); a slot is relevant when its label is nonzero. Returns 0 when no
/// slot is relevant.
pub fn average_precision(predicted: &[f64], ground_truth: &[f64]) -> f64 {
    let predicted = repair_length(predicted, ground_truth.len());
    let mut order: Vec<usize> = (0..predicted.len()).collect();
    order.sort_by(|&a, &b| predicted[b].total_cmp(&predicted[a]));

    let mut hits = 0usize;
    let mut precision_sum = 0.0;
    for (rank, &slot) in order.iter().enumerate() {
        if ground_truth[slot] != 0.0 {
            hits += 1;
            precision_sum += hits as f64 / (rank + 1) as f64;
        }
    }

    if hits == 0 { 0.0 } else { precision_sum / hits as f64 }
}

/// Everything measured for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionScore {
    pub question_id: QuestionId,
    pub question: String,
    pub ground_truth: Vec<String>,
    pub predicted: String,
    pub exact_match: bool,
    pub normalized_match: bool,
    pub partial_match: bool,
    pub similarity: f64,
    pub bucket: SimilarityBucket,
    pub anls: f64,
    /// Present only when the question carries ground-truth evidence
    pub evidence_ap: Option<f64>,
    pub confidence: f64,
    pub processing_time: f64,
}

/// Score one prediction against its question
pub fn score_question(question: &Question, prediction: &Prediction, anls_threshold: f64) -> QuestionScore {
    let predicted = prediction.primary_answer();
    let answers = &question.ground_truth_answers;

    let best_similarity = answers
        .iter()
        .map(|answer| similarity(predicted, answer))
        .fold(0.0, f64::max);

    let evidence_ap = question
        .ground_truth_evidence
        .as_ref()
        .filter(|labels| !labels.is_empty())
        .map(|labels| average_precision(&prediction.evidence_scores, labels));

    QuestionScore {
        question_id: question.question_id.clone(),
        question: question.question_text.clone(),
        ground_truth: answers.clone(),
        predicted: predicted.to_string(),
        exact_match: answers.iter().any(|answer| answer == predicted),
        normalized_match: answers.iter().any(|answer| is_normalized_match(predicted, answer)),
        partial_match: answers.iter().any(|answer| is_partial_match(predicted, answer)),
        similarity: best_similarity,
        bucket: SimilarityBucket::from_score(best_similarity),
        anls: anls(&prediction.predicted_answers, answers, anls_threshold),
        evidence_ap,
        confidence: prediction.confidence,
        processing_time: prediction.processing_time,
    }
}
