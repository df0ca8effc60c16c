//! End-to-end DocVQA runs against mock parsers

use async_trait::async_trait;
use benchmark_harness::docvqa::generator::NO_DOCUMENT_ANSWER;
use benchmark_harness::docvqa::{QuestionId, load_predictions, load_summary};
use benchmark_harness::{DocVqaBenchmark, DocVqaConfig};
use doccraft::{DoccraftError, DocumentParser, ExtractionMetadata, ExtractionResult, QuestionAnswer};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const INVOICE: &str = "Invoice total 250 dollars. Signed by Jane Doe in 2019.";

struct OcrMock;

#[async_trait]
impl DocumentParser for OcrMock {
    fn name(&self) -> &str {
        "ocr"
    }

    fn supported_formats(&self) -> &[&str] {
        &["png"]
    }

    async fn extract_text(&self, _path: &Path) -> doccraft::Result<ExtractionResult> {
        Ok(ExtractionResult::new(INVOICE.to_string(), ExtractionMetadata::default(), 0.0))
    }
}

struct VisionMock;

#[async_trait]
impl DocumentParser for VisionMock {
    fn name(&self) -> &str {
        "vision"
    }

    fn supported_formats(&self) -> &[&str] {
        &["png"]
    }

    async fn extract_text(&self, _path: &Path) -> doccraft::Result<ExtractionResult> {
        Err(DoccraftError::unsupported_operation("vision", "text extraction"))
    }

    fn supports_question_answering(&self) -> bool {
        true
    }

    async fn ask_question(&self, _path: &Path, question: &str) -> doccraft::Result<QuestionAnswer> {
        if question.starts_with("Who") {
            return Err(DoccraftError::network("rate limited"));
        }
        Ok(QuestionAnswer {
            answer: "$250".to_string(),
            confidence: Some(0.8),
        })
    }
}

fn setup() -> (TempDir, DocVqaConfig) {
    let dir = TempDir::new().unwrap();
    let documents = dir.path().join("documents");
    fs::create_dir_all(&documents).unwrap();
    fs::write(documents.join("invoice.png"), b"png").unwrap();

    let dataset = serde_json::json!({
        "data": [
            {
                "questionId": 1,
                "question": "What is the total amount?",
                "image": "documents/invoice.png",
                "answers": ["250"],
                "ground_truth": [1.0, 0.0]
            },
            {
                "questionId": 2,
                "question": "Who signed the invoice?",
                "image": "documents/invoice.png",
                "answers": ["Jane Doe"]
            },
            {
                "questionId": 7,
                "question": "What is the date?",
                "image": "documents/lost.png",
                "answers": "2019"
            }
        ]
    });
    let dataset_path = dir.path().join("val.json");
    fs::write(&dataset_path, serde_json::to_string(&dataset).unwrap()).unwrap();

    let config = DocVqaConfig {
        dataset: dataset_path,
        documents_dir: dir.path().to_path_buf(),
        output_dir: dir.path().join("results"),
        ..Default::default()
    };
    (dir, config)
}

#[tokio::test]
async fn test_run_writes_one_prediction_per_question() {
    let (_dir, config) = setup();
    let output_dir = config.output_dir.clone();
    let benchmark = DocVqaBenchmark::new(config).unwrap();

    let summaries = benchmark.run(&[Arc::new(OcrMock) as Arc<dyn DocumentParser>]).await.unwrap();
    assert_eq!(summaries.len(), 1);

    let predictions = load_predictions(output_dir.join("ocr_predictions.json")).unwrap();
    assert_eq!(predictions.len(), 3);
    assert_eq!(predictions[0].primary_answer(), "250");
    assert_eq!(predictions[0].evidence_scores.len(), 2);
    assert_eq!(predictions[1].primary_answer(), "Jane Doe");
    assert_eq!(predictions[2].question_id, QuestionId::Int(7));
    assert_eq!(predictions[2].predicted_answers, vec![NO_DOCUMENT_ANSWER.to_string()]);

    let summary = &summaries[0];
    assert_eq!(summary.total_questions, 3);
    assert_eq!(summary.evaluated_questions, 3);
    assert_eq!(summary.exact_matches, 2);
    assert!(summary.mean_average_precision.is_some());

    for name in ["ocr_results.json", "ocr_results.csv", "ocr_summary.json"] {
        assert!(output_dir.join(name).exists(), "{} missing", name);
    }
    assert!(!output_dir.join("comparison.json").exists());
}

#[tokio::test]
async fn test_run_compares_multiple_parsers() {
    let (_dir, config) = setup();
    let output_dir = config.output_dir.clone();
    let benchmark = DocVqaBenchmark::new(config).unwrap();

    let parsers: Vec<Arc<dyn DocumentParser>> = vec![Arc::new(OcrMock), Arc::new(VisionMock)];
    let summaries = benchmark.run(&parsers).await.unwrap();
    assert_eq!(summaries.len(), 2);

    let vision = load_predictions(output_dir.join("vision_predictions.json")).unwrap();
    assert_eq!(vision.len(), 3);
    assert_eq!(vision[0].primary_answer(), "$250");
    assert!(vision[1].primary_answer().starts_with("Error: "));
    assert_eq!(vision[2].primary_answer(), NO_DOCUMENT_ANSWER);

    // "$250" still matches "250" once normalized
    assert_eq!(summaries[1].exact_matches, 0);
    assert_eq!(summaries[1].normalized_matches, 1);

    for name in ["comparison.json", "comparison.csv", "comparison.html"] {
        assert!(output_dir.join(name).exists(), "{} missing", name);
    }
}

#[tokio::test]
async fn test_evaluate_file_is_deterministic() {
    let (_dir, config) = setup();
    let output_dir = config.output_dir.clone();
    let benchmark = DocVqaBenchmark::new(config).unwrap();

    benchmark.predict(&OcrMock).await.unwrap();
    let predictions_path = output_dir.join("ocr_predictions.json");

    benchmark.evaluate_file("ocr", &predictions_path).unwrap();
    let first = fs::read(output_dir.join("ocr_summary.json")).unwrap();
    benchmark.evaluate_file("ocr", &predictions_path).unwrap();
    let second = fs::read(output_dir.join("ocr_summary.json")).unwrap();

    assert_eq!(first, second);
    assert_eq!(load_summary(output_dir.join("ocr_summary.json")).unwrap().parser, "ocr");
}

#[tokio::test]
async fn test_malformed_dataset_is_fatal() {
    let (dir, mut config) = setup();
    let bad = dir.path().join("bad.json");
    fs::write(&bad, r#"{"data": [{"questionId": 1, "question": "?"}]}"#).unwrap();
    config.dataset = bad;

    let benchmark = DocVqaBenchmark::new(config).unwrap();
    let err = benchmark.predict(&OcrMock).await.unwrap_err();
    assert!(matches!(err, benchmark_harness::Error::InvalidDataset { .. }));
}
