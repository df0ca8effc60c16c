//! Harness errors

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A doccraft failure that was not contained in a result record
    #[error(transparent)]
    Parser(#[from] doccraft::DoccraftError),

    #[error("Fixture {path} rejected: {reason}")]
    InvalidFixture { path: PathBuf, reason: String },

    #[error("No fixture at {0}")]
    FixtureNotFound(PathBuf),

    #[error("Document referenced by fixture is missing: {0}")]
    DocumentNotFound(PathBuf),

    /// The DocVQA question file could not be read as a list of questions
    #[error("Invalid dataset at {path}: {reason}")]
    InvalidDataset { path: PathBuf, reason: String },

    #[error("Invalid predictions at {path}: {reason}")]
    InvalidPredictions { path: PathBuf, reason: String },

    #[error("{parser} could not extract {file}: {message}")]
    ExtractionFailed {
        parser: String,
        file: PathBuf,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Benchmark error: {0}")]
    Benchmark(String),

    /// Extraction or question answering ran past its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Template error: {0}")]
    Template(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_dataset_display() {
        let err = Error::InvalidDataset {
            path: PathBuf::from("val.json"),
            reason: "missing field `question`".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid dataset at val.json: missing field `question`");
    }

    #[test]
    fn test_parser_error_is_transparent() {
        let err: Error = doccraft::DoccraftError::validation("Unknown parser 'x'").into();
        assert_eq!(err.to_string(), "Validation error: Unknown parser 'x'");
    }

    #[test]
    fn test_extraction_failed_display() {
        let err = Error::ExtractionFailed {
            parser: "tesseract".to_string(),
            file: PathBuf::from("scan.png"),
            message: "exit status 1".to_string(),
        };
        assert_eq!(err.to_string(), "tesseract could not extract scan.png: exit status 1");
    }
}
