//! Extracted text against reference transcriptions

use crate::types::{AccuracyMetrics, AccuracyResult};
use crate::{Error, Result};
use doccraft::DocumentParser;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// `1 - levenshtein / max_len` over characters; two empty texts score 1.0
pub fn character_accuracy(extracted: &str, reference: &str) -> f64 {
    let max_len = extracted.chars().count().max(reference.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - strsim::levenshtein(extracted, reference) as f64 / max_len as f64
}

/// `1 - levenshtein / max_len` over whitespace-separated words
pub fn word_accuracy(extracted: &str, reference: &str) -> f64 {
    let extracted: Vec<&str> = extracted.split_whitespace().collect();
    let reference: Vec<&str> = reference.split_whitespace().collect();
    let max_len = extracted.len().max(reference.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - strsim::generic_levenshtein(&extracted, &reference) as f64 / max_len as f64
}

fn word_counts(text: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for word in text.split_whitespace() {
        let word: String = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if !word.is_empty() {
            *counts.entry(word).or_insert(0) += 1;
        }
    }
    counts
}

/// Bag-of-words precision, recall and F1 of `extracted` against `reference`
pub fn word_precision_recall_f1(extracted: &str, reference: &str) -> (f64, f64, f64) {
    let predicted = word_counts(extracted);
    let expected = word_counts(reference);

    let predicted_total: usize = predicted.values().sum();
    let expected_total: usize = expected.values().sum();
    if predicted_total == 0 && expected_total == 0 {
        return (1.0, 1.0, 1.0);
    }

    let overlap: usize = predicted
        .iter()
        .map(|(word, count)| expected.get(word).map_or(0, |e| (*count).min(*e)))
        .sum();

    let precision = if predicted_total == 0 {
        0.0
    } else {
        overlap as f64 / predicted_total as f64
    };
    let recall = if expected_total == 0 {
        0.0
    } else {
        overlap as f64 / expected_total as f64
    };
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    (precision, recall, f1)
}

impl AccuracyMetrics {
    /// Compare an extraction with its reference transcription
    pub fn compute(extracted: &str, reference: &str) -> Self {
        let (precision, recall, f1) = word_precision_recall_f1(extracted, reference);
        Self {
            character_accuracy: character_accuracy(extracted, reference),
            word_accuracy: word_accuracy(extracted, reference),
            similarity: strsim::sorensen_dice(extracted, reference),
            precision,
            recall,
            f1,
        }
    }
}

/// Scores parser output against reference text files
pub struct AccuracyBenchmarker {
    timeout: Duration,
}

impl AccuracyBenchmarker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Extract `document` and compare it with the text in `reference`
    ///
    /// A missing or unreadable reference is an error; extraction failures are
    /// recorded in the result.
    pub async fn evaluate_file(&self, parser: &dyn DocumentParser, document: &Path, reference: &Path) -> Result<AccuracyResult> {
        let reference_text = tokio::fs::read_to_string(reference)
            .await
            .map_err(|_| Error::DocumentNotFound(reference.to_path_buf()))?;

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, parser.extract_text(document)).await;
        let extraction_time = start.elapsed();

        let failure = |message: String| AccuracyResult {
            parser: parser.name().to_string(),
            file_path: document.to_path_buf(),
            success: false,
            error_message: Some(message),
            metrics: None,
            extracted_chars: 0,
            reference_chars: reference_text.chars().count(),
            extraction_time,
        };

        let extraction = match outcome {
            Err(_) => {
                warn!("{} timed out on {}", parser.name(), document.display());
                return Ok(failure(format!("Extraction exceeded {:?}", self.timeout)));
            }
            Ok(Err(e)) => {
                warn!("{} failed on {}: {}", parser.name(), document.display(), e);
                return Ok(failure(e.to_string()));
            }
            Ok(Ok(extraction)) => extraction,
        };

        let metrics = AccuracyMetrics::compute(&extraction.text, &reference_text);
        debug!(
            "{} on {}: char accuracy {:.3}, word F1 {:.3}",
            parser.name(),
            document.display(),
            metrics.character_accuracy,
            metrics.f1
        );

        Ok(AccuracyResult {
            parser: parser.name().to_string(),
            file_path: document.to_path_buf(),
            success: true,
            error_message: None,
            metrics: Some(metrics),
            extracted_chars: extraction.text.chars().count(),
            reference_chars: reference_text.chars().count(),
            extraction_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use doccraft::{ExtractionMetadata, ExtractionResult};
    use tempfile::TempDir;

    struct FixedParser(&'static str);

    #[async_trait]
    impl DocumentParser for FixedParser {
        fn name(&self) -> &str {
            "fixed"
        }

        fn supported_formats(&self) -> &[&str] {
            &["png"]
        }

        async fn extract_text(&self, _path: &Path) -> doccraft::Result<ExtractionResult> {
            Ok(ExtractionResult::new(self.0.to_string(), ExtractionMetadata::default(), 0.0))
        }
    }

    #[test]
    fn test_character_accuracy() {
        assert_eq!(character_accuracy("kitten", "kitten"), 1.0);
        assert!((character_accuracy("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
        assert_eq!(character_accuracy("", ""), 1.0);
        assert_eq!(character_accuracy("", "abc"), 0.0);
    }

    #[test]
    fn test_word_accuracy() {
        assert_eq!(word_accuracy("total due 42", "total due 42"), 1.0);
        assert!((word_accuracy("total due 41", "total due 42") - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_precision_recall_ignore_case_and_punctuation() {
        let (p, r, f1) = word_precision_recall_f1("Invoice: TOTAL 42", "invoice total 42 paid");
        assert_eq!(p, 1.0);
        assert_eq!(r, 0.75);
        assert!((f1 - 6.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_precision_recall_counts_repeats_once_each() {
        let (p, _, _) = word_precision_recall_f1("the the the", "the cat");
        assert!((p - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_evaluate_file() {
        let dir = TempDir::new().unwrap();
        let reference = dir.path().join("ref.txt");
        std::fs::write(&reference, "Total due 42").unwrap();

        let result = AccuracyBenchmarker::new(Duration::from_secs(5))
            .evaluate_file(&FixedParser("Total due 42"), Path::new("scan.png"), &reference)
            .await
            .unwrap();

        assert!(result.success);
        let metrics = result.metrics.unwrap();
        assert_eq!(metrics.character_accuracy, 1.0);
        assert_eq!(metrics.f1, 1.0);
        assert_eq!(result.reference_chars, 12);
    }

    #[tokio::test]
    async fn test_missing_reference() {
        let result = AccuracyBenchmarker::new(Duration::from_secs(5))
            .evaluate_file(&FixedParser(""), Path::new("scan.png"), Path::new("/nonexistent/ref.txt"))
            .await;
        assert!(matches!(result, Err(Error::DocumentNotFound(_))));
    }
}
