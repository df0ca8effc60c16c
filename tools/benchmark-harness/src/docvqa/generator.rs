//! Prediction generation
//!
//! Each question is answered independently and always yields exactly one
//! [`Prediction`]: lookup misses, parser errors, panics and timeouts become
//! sentinel answers instead of aborting the batch.

use super::dataset::{Dataset, Prediction, Question, QuestionId};
use super::evidence::{generate_evidence, unavailable_evidence};
use crate::config::DocVqaConfig;
use doccraft::DocumentParser;
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Answer recorded when no document file could be located
pub const NO_DOCUMENT_ANSWER: &str = "no document found";

/// Answer recorded when the document yielded no usable text
pub const NO_ANSWER: &str = "No answer";

/// Extensions tried, in order, when a question's identifier is used as a file name
pub const DOCUMENT_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "tiff", "tif", "bmp", "pdf"];

const QUANTITY_KEYWORDS: [&str; 6] = ["how much", "what is the", "amount", "number", "percentage", "%"];
const DATE_KEYWORDS: [&str; 3] = ["when", "date", "year"];
const PERSON_KEYWORDS: [&str; 3] = ["who", "name", "person"];

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number regex"));
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}\b").expect("valid year regex"));
static PERSON: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+ [A-Z][a-z]+\b").expect("valid name regex"));

/// Conventional file stems for a question id: `42`, `doc_42`, `image_42`, `0042`
fn id_file_stems(id: &QuestionId) -> Vec<String> {
    let mut stems = vec![id.to_string(), format!("doc_{}", id), format!("image_{}", id)];
    if let QuestionId::Int(n) = id {
        stems.push(format!("{:04}", n));
    }
    stems
}

/// Paths to try for a question's document, first existing wins
pub fn candidate_paths(question: &Question, documents_dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(reference) = question.image_reference.as_deref().filter(|r| !r.is_empty()) {
        candidates.push(PathBuf::from(reference));
        candidates.push(documents_dir.join(reference));
        if !prefix.is_empty()
            && let Some(stripped) = reference.strip_prefix(prefix)
        {
            candidates.push(documents_dir.join(stripped));
        }
    }

    let identifier = question
        .image_reference
        .as_deref()
        .and_then(|r| Path::new(r).file_stem())
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| question.question_id.to_string());
    for stem in std::iter::once(identifier).chain(id_file_stems(&question.question_id)) {
        for extension in DOCUMENT_EXTENSIONS {
            candidates.push(documents_dir.join(format!("{}.{}", stem, extension)));
        }
    }

    let mut seen = std::collections::BTreeSet::new();
    candidates.retain(|path| seen.insert(path.clone()));
    candidates
}

/// The first candidate that is an existing file
pub fn locate_document(question: &Question, documents_dir: &Path, prefix: &str) -> Option<PathBuf> {
    candidate_paths(question, documents_dir, prefix)
        .into_iter()
        .find(|path| path.is_file())
}

fn asks_about(question: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| question.contains(keyword))
}

/// Keyword-driven answer from raw text, for parsers without question answering
///
/// Returns `None` only for text with no content.
pub fn heuristic_answer(question: &str, text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let lowered = question.to_lowercase();

    let rules: [(&[&str], &Lazy<Regex>); 3] = [
        (&QUANTITY_KEYWORDS[..], &NUMBER),
        (&DATE_KEYWORDS[..], &YEAR),
        (&PERSON_KEYWORDS[..], &PERSON),
    ];
    for (keywords, pattern) in rules {
        if asks_about(&lowered, keywords)
            && let Some(found) = pattern.find(text)
        {
            return Some(found.as_str().to_string());
        }
    }

    text.split('.')
        .map(str::trim)
        .find(|sentence| !sentence.is_empty())
        .map(|sentence| sentence.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Answers every dataset question with one parser
pub struct PredictionGenerator<'a> {
    config: &'a DocVqaConfig,
}

impl<'a> PredictionGenerator<'a> {
    pub fn new(config: &'a DocVqaConfig) -> Self {
        Self { config }
    }

    fn evidence_length(&self, question: &Question) -> usize {
        question
            .ground_truth_evidence
            .as_ref()
            .map_or(self.config.default_evidence_length, Vec::len)
    }

    fn sentinel(&self, question: &Question, answer: String, started: Instant) -> Prediction {
        Prediction {
            question_id: question.question_id.clone(),
            predicted_answers: vec![answer],
            evidence_scores: unavailable_evidence(self.evidence_length(question)),
            confidence: 0.0,
            processing_time: started.elapsed().as_secs_f64(),
        }
    }

    /// Answer via the parser; errors propagate to [`predict_one`](Self::predict_one)
    async fn answer(&self, parser: &dyn DocumentParser, question: &Question, document: &Path) -> doccraft::Result<(String, f64, Vec<f64>)> {
        let length = self.evidence_length(question);

        if parser.supports_question_answering() {
            let reply = parser.ask_question(document, &question.question_text).await?;
            let answer = reply.answer.trim().to_string();
            if answer.is_empty() {
                return Ok((NO_ANSWER.to_string(), 0.0, unavailable_evidence(length)));
            }
            let confidence = reply.confidence.unwrap_or(1.0).clamp(0.0, 1.0);

            let evidence = if self.config.evidence_from_text {
                match parser.extract_text(document).await {
                    Ok(extraction) => generate_evidence(&extraction.text, &question.question_text, &answer, length),
                    Err(e) => {
                        debug!("No evidence text for question {}: {}", question.question_id, e);
                        unavailable_evidence(length)
                    }
                }
            } else {
                unavailable_evidence(length)
            };
            return Ok((answer, confidence, evidence));
        }

        let extraction = parser.extract_text(document).await?;
        match heuristic_answer(&question.question_text, &extraction.text) {
            Some(answer) => {
                let evidence = generate_evidence(&extraction.text, &question.question_text, &answer, length);
                Ok((answer, 1.0, evidence))
            }
            None => Ok((NO_ANSWER.to_string(), 0.0, unavailable_evidence(length))),
        }
    }

    /// Produce the prediction for one question; never fails
    pub async fn predict_one(&self, parser: &dyn DocumentParser, question: &Question) -> Prediction {
        let started = Instant::now();

        let Some(document) = locate_document(question, &self.config.documents_dir, &self.config.document_prefix) else {
            warn!("No document found for question {}", question.question_id);
            return self.sentinel(question, NO_DOCUMENT_ANSWER.to_string(), started);
        };
        debug!("Question {} -> {}", question.question_id, document.display());

        let attempt = AssertUnwindSafe(self.answer(parser, question, &document)).catch_unwind();
        let outcome = tokio::time::timeout(self.config.question_timeout, attempt).await;

        let failure = match outcome {
            Ok(Ok(Ok((answer, confidence, evidence_scores)))) => {
                return Prediction {
                    question_id: question.question_id.clone(),
                    predicted_answers: vec![answer],
                    evidence_scores,
                    confidence,
                    processing_time: started.elapsed().as_secs_f64(),
                };
            }
            Ok(Ok(Err(e))) => e.to_string(),
            Ok(Err(_)) => "parser panicked".to_string(),
            Err(_) => format!("timed out after {:?}", self.config.question_timeout),
        };

        warn!("{} failed on question {}: {}", parser.name(), question.question_id, failure);
        self.sentinel(question, format!("Error: {}", failure), started)
    }

    /// One prediction per question, in dataset order
    pub async fn generate(&self, parser: &dyn DocumentParser, dataset: &Dataset) -> Vec<Prediction> {
        let questions = dataset.head(self.config.max_questions);
        let total = questions.len();
        info!("Generating {} predictions with {}", total, parser.name());

        let mut stream = stream::iter(questions)
            .map(|question| self.predict_one(parser, question))
            .buffered(self.config.concurrency.max(1));

        let mut predictions = Vec::with_capacity(total);
        while let Some(prediction) = stream.next().await {
            predictions.push(prediction);
            if predictions.len() % self.config.progress_interval.max(1) == 0 {
                info!("{}: {}/{} questions answered", parser.name(), predictions.len(), total);
            }
        }
        predictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use doccraft::{DoccraftError, ExtractionMetadata, ExtractionResult, QuestionAnswer};
    use tempfile::TempDir;

    fn question(id: i64, text: &str, image: Option<&str>) -> Question {
        Question {
            question_id: QuestionId::Int(id),
            question_text: text.to_string(),
            image_reference: image.map(str::to_string),
            ground_truth_answers: vec!["x".to_string()],
            ground_truth_evidence: None,
        }
    }

    struct TextParser(&'static str);

    #[async_trait]
    impl DocumentParser for TextParser {
        fn name(&self) -> &str {
            "text-mock"
        }

        fn supported_formats(&self) -> &[&str] {
            &["png"]
        }

        async fn extract_text(&self, path: &Path) -> doccraft::Result<ExtractionResult> {
            if path.file_stem().and_then(|s| s.to_str()) == Some("broken") {
                return Err(DoccraftError::ocr("unreadable scan"));
            }
            Ok(ExtractionResult::new(self.0.to_string(), ExtractionMetadata::default(), 0.0))
        }
    }

    struct QaParser;

    #[async_trait]
    impl DocumentParser for QaParser {
        fn name(&self) -> &str {
            "qa-mock"
        }

        fn supported_formats(&self) -> &[&str] {
            &["png"]
        }

        async fn extract_text(&self, _path: &Path) -> doccraft::Result<ExtractionResult> {
            Err(DoccraftError::unsupported_operation("qa-mock", "text extraction"))
        }

        fn supports_question_answering(&self) -> bool {
            true
        }

        async fn ask_question(&self, _path: &Path, _question: &str) -> doccraft::Result<QuestionAnswer> {
            Ok(QuestionAnswer {
                answer: " Jane Doe ".to_string(),
                confidence: None,
            })
        }
    }

    fn setup(files: &[&str]) -> (TempDir, DocVqaConfig) {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"img").unwrap();
        }
        let config = DocVqaConfig {
            documents_dir: dir.path().to_path_buf(),
            default_evidence_length: 4,
            ..Default::default()
        };
        (dir, config)
    }

    #[test]
    fn test_heuristic_answer_rules() {
        let text = "Report of Jane Doe. Issued 12 March 1998 for 45.5 percent";
        assert_eq!(heuristic_answer("How much was spent?", text).unwrap(), "12");
        assert_eq!(heuristic_answer("What percentage?", text).unwrap(), "12");
        assert_eq!(heuristic_answer("In which year?", text).unwrap(), "1998");
        assert_eq!(heuristic_answer("Who wrote it?", text).unwrap(), "Jane Doe");
        assert_eq!(heuristic_answer("Where?", text).unwrap(), "Report of Jane Doe");
        assert_eq!(heuristic_answer("Where?", "  \n "), None);
    }

    #[test]
    fn test_heuristic_answer_falls_through_when_pattern_absent() {
        assert_eq!(
            heuristic_answer("When was it signed?", "Signed by the director. Later filed."),
            Some("Signed by the director".to_string())
        );
    }

    #[test]
    fn test_candidate_paths_order() {
        let q = question(7, "?", Some("documents/abc_1.png"));
        let dir = Path::new("/data");
        let candidates = candidate_paths(&q, dir, "documents/");
        assert_eq!(candidates[0], PathBuf::from("documents/abc_1.png"));
        assert_eq!(candidates[1], PathBuf::from("/data/documents/abc_1.png"));
        assert_eq!(candidates[2], PathBuf::from("/data/abc_1.png"));
        assert_eq!(candidates[3], PathBuf::from("/data/abc_1.jpg"));
        assert_eq!(candidates[8], PathBuf::from("/data/abc_1.pdf"));
        assert_eq!(candidates[9], PathBuf::from("/data/7.jpg"));
        assert_eq!(candidates.last().unwrap(), &PathBuf::from("/data/0007.pdf"));
        assert_eq!(candidates.len(), 3 + 6 + 4 * DOCUMENT_EXTENSIONS.len());
    }

    #[test]
    fn test_candidate_paths_fall_back_to_question_id() {
        let q = question(42, "?", None);
        let candidates = candidate_paths(&q, Path::new("/data"), "documents/");
        assert_eq!(candidates.len(), 4 * DOCUMENT_EXTENSIONS.len());
        assert_eq!(candidates[0], PathBuf::from("/data/42.jpg"));
        assert!(candidates.contains(&PathBuf::from("/data/doc_42.png")));
        assert!(candidates.contains(&PathBuf::from("/data/image_42.tif")));
        assert!(candidates.contains(&PathBuf::from("/data/0042.bmp")));
    }

    #[test]
    fn test_locate_document_by_padded_question_id() {
        let (dir, config) = setup(&["0042.png"]);
        let q = question(42, "?", None);
        assert_eq!(
            locate_document(&q, &config.documents_dir, &config.document_prefix).unwrap(),
            dir.path().join("0042.png")
        );
    }

    #[test]
    fn test_locate_document_strips_prefix() {
        let (dir, config) = setup(&["abc_1.png"]);
        let q = question(1, "?", Some("documents/abc_1.png"));
        assert_eq!(
            locate_document(&q, &config.documents_dir, &config.document_prefix).unwrap(),
            dir.path().join("abc_1.png")
        );
    }

    #[tokio::test]
    async fn test_missing_document_sentinel() {
        let (_dir, config) = setup(&[]);
        let prediction = PredictionGenerator::new(&config)
            .predict_one(&TextParser("text"), &question(7, "What?", Some("missing.png")))
            .await;

        assert_eq!(prediction.question_id, QuestionId::Int(7));
        assert_eq!(prediction.predicted_answers, vec![NO_DOCUMENT_ANSWER]);
        assert_eq!(prediction.confidence, 0.0);
        assert_eq!(prediction.evidence_scores, vec![0.1; 4]);
    }

    #[tokio::test]
    async fn test_parser_error_sentinel() {
        let (_dir, config) = setup(&["broken.png"]);
        let prediction = PredictionGenerator::new(&config)
            .predict_one(&TextParser("text"), &question(3, "What?", Some("broken.png")))
            .await;

        assert_eq!(prediction.primary_answer(), "Error: OCR error: unreadable scan");
        assert_eq!(prediction.confidence, 0.0);
        assert_eq!(prediction.evidence_scores, vec![0.1; 4]);
    }

    #[tokio::test]
    async fn test_empty_text_gives_no_answer() {
        let (_dir, config) = setup(&["a.png"]);
        let prediction = PredictionGenerator::new(&config)
            .predict_one(&TextParser("   "), &question(1, "What?", Some("a.png")))
            .await;
        assert_eq!(prediction.primary_answer(), NO_ANSWER);
        assert_eq!(prediction.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_text_parser_heuristic_prediction() {
        let (_dir, config) = setup(&["a.png"]);
        let mut q = question(1, "What is the total amount?", Some("a.png"));
        q.ground_truth_evidence = Some(vec![0.0, 1.0]);
        let prediction = PredictionGenerator::new(&config)
            .predict_one(&TextParser("Invoice 12. Total amount 250.00 due."), &q)
            .await;

        assert_eq!(prediction.primary_answer(), "12");
        assert_eq!(prediction.confidence, 1.0);
        assert_eq!(prediction.evidence_scores.len(), 2);
        assert!(prediction.evidence_scores[1] > prediction.evidence_scores[0]);
    }

    #[tokio::test]
    async fn test_qa_parser_prediction() {
        let (_dir, config) = setup(&["a.png"]);
        let prediction = PredictionGenerator::new(&config)
            .predict_one(&QaParser, &question(1, "Who signed?", Some("a.png")))
            .await;

        assert_eq!(prediction.primary_answer(), "Jane Doe");
        assert_eq!(prediction.confidence, 1.0);
        // text extraction failed, so evidence falls back to the unavailable filler
        assert_eq!(prediction.evidence_scores, vec![0.1; 4]);
    }
}
