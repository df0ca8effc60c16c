//! JSON and CSV result files
//!
//! Parent directories are created on demand. JSON is pretty-printed; CSV
//! gets a header row derived from the record's field names.

use crate::Result;
use serde::Serialize;
use std::fs;
use std::path::Path;

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    create_parent(path)?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Rows must be flat records
pub fn write_csv<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    create_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccuracyMetrics, AccuracyResult};
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Row {
        parser: &'static str,
        score: Option<f64>,
    }

    #[test]
    fn test_accuracy_results_to_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runs/2024/accuracy.json");

        let results = [
            AccuracyResult {
                parser: "tesseract".to_string(),
                file_path: PathBuf::from("receipt.png"),
                success: true,
                error_message: None,
                metrics: Some(AccuracyMetrics {
                    character_accuracy: 0.9,
                    word_accuracy: 0.8,
                    similarity: 0.85,
                    precision: 0.75,
                    recall: 1.0,
                    f1: 0.857,
                }),
                extracted_chars: 120,
                reference_chars: 118,
                extraction_time: Duration::from_millis(340),
            },
            AccuracyResult {
                parser: "qwenvl".to_string(),
                file_path: PathBuf::from("receipt.png"),
                success: false,
                error_message: Some("model server unreachable".to_string()),
                metrics: None,
                extracted_chars: 0,
                reference_chars: 118,
                extraction_time: Duration::ZERO,
            },
        ];

        write_json(&results[..], &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["metrics"]["recall"], 1.0);
        assert!(value[0].get("error_message").is_none());
        assert!(value[1].get("metrics").is_none());
        assert_eq!(value[1]["error_message"], "model server unreachable");
    }

    #[test]
    fn test_bare_file_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");
        write_json(&Vec::<AccuracyResult>::new(), &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn test_write_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/rows.csv");

        write_csv(
            &[
                Row {
                    parser: "pdf",
                    score: Some(0.5),
                },
                Row {
                    parser: "tesseract",
                    score: None,
                },
            ],
            &path,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "parser,score\npdf,0.5\ntesseract,\n");
    }
}
