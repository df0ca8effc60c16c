//! DocVQA dataset and prediction files
//!
//! Dataset files follow the DocVQA release layout:
//!
//! ```json
//! {
//!   "dataset_name": "docvqa",
//!   "data": [
//!     {
//!       "questionId": 49153,
//!       "question": "What is the total amount?",
//!       "image": "documents/pybv0228_81.png",
//!       "answers": ["$100", "100"]
//!     }
//!   ]
//! }
//! ```
//!
//! Prediction files are JSON arrays of [`Prediction`] records.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Question identifier; DocVQA uses integers, other sets use strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionId {
    Int(i64),
    Text(String),
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionId::Int(id) => write!(f, "{}", id),
            QuestionId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for QuestionId {
    fn from(id: i64) -> Self {
        QuestionId::Int(id)
    }
}

impl From<&str> for QuestionId {
    fn from(id: &str) -> Self {
        QuestionId::Text(id.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// One dataset question with its ground truth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(alias = "questionId")]
    pub question_id: QuestionId,

    #[serde(rename = "question")]
    pub question_text: String,

    /// Path or name of the source document, as written in the dataset
    #[serde(
        default,
        rename = "image",
        alias = "image_id",
        alias = "image_path",
        alias = "document",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_reference: Option<String>,

    #[serde(rename = "answers", alias = "answer", deserialize_with = "one_or_many")]
    pub ground_truth_answers: Vec<String>,

    /// Per-segment relevance labels, when the dataset provides them
    #[serde(default, rename = "ground_truth", skip_serializing_if = "Option::is_none")]
    pub ground_truth_evidence: Option<Vec<f64>>,
}

#[derive(Deserialize)]
struct DatasetFile {
    data: Vec<Question>,
}

/// A loaded dataset, in file order with unique ids
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    questions: Vec<Question>,
    index: BTreeMap<QuestionId, usize>,
}

impl Dataset {
    /// Build a dataset, rejecting duplicate ids and non-finite evidence labels
    pub fn from_questions(questions: Vec<Question>) -> std::result::Result<Self, String> {
        let mut index = BTreeMap::new();
        for (position, question) in questions.iter().enumerate() {
            if index.insert(question.question_id.clone(), position).is_some() {
                return Err(format!("duplicate question_id {}", question.question_id));
            }
            if let Some(evidence) = &question.ground_truth_evidence
                && evidence.iter().any(|v| !v.is_finite())
            {
                return Err(format!("non-finite ground_truth value in question {}", question.question_id));
            }
        }
        Ok(Self { questions, index })
    }

    /// Load a `{"data": [...]}` dataset file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let invalid = |reason: String| Error::InvalidDataset {
            path: path.to_path_buf(),
            reason,
        };

        let contents = std::fs::read_to_string(path)?;
        let file: DatasetFile = serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;
        Self::from_questions(file.data).map_err(invalid)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// The first `max` questions, or all of them
    pub fn head(&self, max: Option<usize>) -> &[Question] {
        let end = max.map_or(self.questions.len(), |m| m.min(self.questions.len()));
        &self.questions[..end]
    }

    pub fn get(&self, id: &QuestionId) -> Option<&Question> {
        self.index.get(id).map(|&position| &self.questions[position])
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// A parser's answer to one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(alias = "questionId")]
    pub question_id: QuestionId,

    #[serde(
        rename = "answer",
        alias = "answers",
        alias = "predicted_answer",
        alias = "predicted_answers",
        deserialize_with = "one_or_many"
    )]
    pub predicted_answers: Vec<String>,

    #[serde(default, rename = "evidence", alias = "evidence_scores")]
    pub evidence_scores: Vec<f64>,

    #[serde(default)]
    pub confidence: f64,

    /// Seconds spent on this question
    #[serde(default)]
    pub processing_time: f64,
}

impl Prediction {
    /// The answer that is scored; empty when the parser returned nothing
    pub fn primary_answer(&self) -> &str {
        self.predicted_answers.first().map(String::as_str).unwrap_or("")
    }
}

/// Load a predictions array
///
/// Duplicate ids keep the first record and log the rest.
pub fn load_predictions(path: impl AsRef<Path>) -> Result<Vec<Prediction>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let predictions: Vec<Prediction> = serde_json::from_str(&contents).map_err(|e| Error::InvalidPredictions {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut seen = BTreeSet::new();
    Ok(predictions
        .into_iter()
        .filter(|p| {
            let first = seen.insert(p.question_id.clone());
            if !first {
                warn!("Ignoring duplicate prediction for question {}", p.question_id);
            }
            first
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DATASET: &str = r#"{
        "dataset_name": "docvqa",
        "data": [
            {"questionId": 1, "question": "What is the total?", "image": "documents/a.png", "answers": ["$100", "100"]},
            {"question_id": "q-2", "question": "Who signed?", "document": "b.pdf", "answer": "Jane Doe", "ground_truth": [0, 1, 0]},
            {"question_id": 3, "question": "When?", "answers": "1999"}
        ]
    }"#;

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_dataset_accepts_key_variants() {
        let dir = TempDir::new().unwrap();
        let dataset = Dataset::load(write(&dir, "val.json", DATASET)).unwrap();

        assert_eq!(dataset.len(), 3);
        let first = &dataset.questions()[0];
        assert_eq!(first.question_id, QuestionId::Int(1));
        assert_eq!(first.image_reference.as_deref(), Some("documents/a.png"));
        assert_eq!(first.ground_truth_answers, vec!["$100", "100"]);

        let second = dataset.get(&QuestionId::from("q-2")).unwrap();
        assert_eq!(second.image_reference.as_deref(), Some("b.pdf"));
        assert_eq!(second.ground_truth_answers, vec!["Jane Doe"]);
        assert_eq!(second.ground_truth_evidence, Some(vec![0.0, 1.0, 0.0]));

        let third = &dataset.questions()[2];
        assert_eq!(third.image_reference, None);
        assert_eq!(third.ground_truth_answers, vec!["1999"]);
    }

    #[test]
    fn test_missing_required_key_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.json", r#"{"data": [{"questionId": 1, "answers": ["x"]}]}"#);
        let err = Dataset::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidDataset { .. }));
        assert!(err.to_string().contains("question"));
    }

    #[test]
    fn test_duplicate_ids_are_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "dup.json",
            r#"{"data": [
                {"questionId": 1, "question": "a", "answers": ["x"]},
                {"questionId": 1, "question": "b", "answers": ["y"]}
            ]}"#,
        );
        let err = Dataset::load(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate question_id 1"));
    }

    #[test]
    fn test_head() {
        let dir = TempDir::new().unwrap();
        let dataset = Dataset::load(write(&dir, "val.json", DATASET)).unwrap();
        assert_eq!(dataset.head(Some(2)).len(), 2);
        assert_eq!(dataset.head(Some(10)).len(), 3);
        assert_eq!(dataset.head(None).len(), 3);
    }

    #[test]
    fn test_prediction_serialized_shape() {
        let prediction = Prediction {
            question_id: QuestionId::Int(7),
            predicted_answers: vec!["no document found".to_string()],
            evidence_scores: vec![0.1, 0.1],
            confidence: 0.0,
            processing_time: 0.5,
        };
        let value = serde_json::to_value(&prediction).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "question_id": 7,
                "answer": ["no document found"],
                "evidence": [0.1, 0.1],
                "confidence": 0.0,
                "processing_time": 0.5
            })
        );

        let back: Prediction = serde_json::from_value(value).unwrap();
        assert_eq!(back, prediction);
    }

    #[test]
    fn test_load_predictions_accepts_aliases_and_dedups() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "preds.json",
            r#"[
                {"questionId": 1, "predicted_answer": "100"},
                {"question_id": 2, "predicted_answers": ["a", "b"], "evidence_scores": [0.5]},
                {"questionId": 1, "predicted_answer": "ignored"}
            ]"#,
        );
        let predictions = load_predictions(&path).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].primary_answer(), "100");
        assert_eq!(predictions[0].confidence, 0.0);
        assert_eq!(predictions[1].predicted_answers, vec!["a", "b"]);
        assert_eq!(predictions[1].evidence_scores, vec![0.5]);
    }

    #[test]
    fn test_malformed_predictions() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "preds.json", r#"[{"questionId": 1}]"#);
        assert!(matches!(load_predictions(&path), Err(Error::InvalidPredictions { .. })));
    }
}
