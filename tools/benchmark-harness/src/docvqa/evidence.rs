//! Evidence vectors from extracted text
//!
//! The document text is cut into segments and each segment is scored by how
//! much of the question and answer vocabulary it contains. Scores keep segment
//! order so position `i` always refers to the `i`-th segment.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Filler for slots beyond the last segment
pub const PADDING_SCORE: f64 = 0.05;

/// Filler for every slot when the document could not be read
pub const UNAVAILABLE_SCORE: f64 = 0.1;

const QUESTION_WEIGHT: f64 = 0.6;
const ANSWER_WEIGHT: f64 = 0.4;
const NUMERIC_BOOST: f64 = 1.2;
const KEYWORD_BOOST: f64 = 0.1;

const KEYWORDS: [&str; 8] = ["total", "amount", "date", "name", "address", "number", "signature", "phone"];

const STOPWORDS: [&str; 24] = [
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on", "or", "the", "this",
    "to", "was", "what", "which", "who", "with",
];

static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+\s+|\n{2,}").expect("valid sentence regex"));
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word regex"));

fn vocabulary(text: &str) -> BTreeSet<String> {
    WORD.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
        .collect()
}

fn overlap(segment: &BTreeSet<String>, target: &BTreeSet<String>) -> f64 {
    if target.is_empty() {
        return 0.0;
    }
    target.intersection(segment).count() as f64 / target.len() as f64
}

/// Sentences, or lines when the text has fewer sentences than `wanted`
pub fn segments(text: &str, wanted: usize) -> Vec<String> {
    let collect = |parts: Vec<&str>| -> Vec<String> {
        parts
            .into_iter()
            .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|part| !part.is_empty())
            .collect()
    };

    let sentences = collect(SENTENCE_BREAK.split(text).collect());
    if sentences.len() >= wanted {
        return sentences;
    }
    let lines = collect(text.lines().collect());
    if lines.len() > sentences.len() { lines } else { sentences }
}

/// Relevance of one segment to the question and the chosen answer
pub fn score_segment(segment: &str, question: &str, answer: &str) -> f64 {
    let words = vocabulary(segment);
    let mut score = QUESTION_WEIGHT * overlap(&words, &vocabulary(question))
        + ANSWER_WEIGHT * overlap(&words, &vocabulary(answer));

    if segment.chars().any(|c| c.is_ascii_digit()) {
        score *= NUMERIC_BOOST;
    }

    let question = question.to_lowercase();
    let segment = segment.to_lowercase();
    if KEYWORDS
        .iter()
        .any(|keyword| question.contains(keyword) && segment.contains(keyword))
    {
        score += KEYWORD_BOOST;
    }

    score.min(1.0)
}

/// Evidence vector of exactly `length` scores for `text`
pub fn generate_evidence(text: &str, question: &str, answer: &str, length: usize) -> Vec<f64> {
    let mut scores: Vec<f64> = segments(text, length)
        .iter()
        .take(length)
        .map(|segment| score_segment(segment, question, answer))
        .collect();
    scores.resize(length, PADDING_SCORE);
    scores
}

/// Evidence vector used when no text is available
pub fn unavailable_evidence(length: usize) -> Vec<f64> {
    vec![UNAVAILABLE_SCORE; length]
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVOICE: &str = "ACME Corporation. Invoice number 4411. Total amount due: 250.00 USD. Thank you for your business.";

    #[test]
    fn test_segments_prefers_sentences() {
        let parts = segments(INVOICE, 3);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "ACME Corporation");
        assert_eq!(parts[2], "Total amount due: 250.00 USD");
    }

    #[test]
    fn test_segments_falls_back_to_lines() {
        let text = "Name: Jane Doe\nDate: 2021-04-01\nTotal: 12";
        let parts = segments(text, 5);
        assert_eq!(parts, vec!["Name: Jane Doe", "Date: 2021-04-01", "Total: 12"]);
    }

    #[test]
    fn test_relevant_segment_scores_highest() {
        let scores = generate_evidence(INVOICE, "What is the total amount due?", "250.00", 4);
        let best = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(best, 2);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_length_is_exact() {
        let padded = generate_evidence(INVOICE, "total?", "250", 10);
        assert_eq!(padded.len(), 10);
        assert_eq!(&padded[4..], &[PADDING_SCORE; 6]);

        let truncated = generate_evidence(INVOICE, "total?", "250", 2);
        assert_eq!(truncated.len(), 2);

        assert_eq!(generate_evidence("", "total?", "", 3), vec![PADDING_SCORE; 3]);
    }

    #[test]
    fn test_score_is_capped() {
        let score = score_segment("total 100 total", "total", "100");
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_unavailable_evidence() {
        assert_eq!(unavailable_evidence(3), vec![0.1, 0.1, 0.1]);
    }
}
