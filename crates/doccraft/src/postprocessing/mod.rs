//! Postprocessing of parser output.

pub mod table;
pub mod text;

use crate::{DoccraftError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use table::{Table, TableFormat, TableMetadata, TablePostprocessor};
pub use text::{TextPostprocessingMetadata, TextPostprocessor, TextStatistics};

/// Available postprocessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostprocessorKind {
    Text,
    Table,
}

impl PostprocessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostprocessorKind::Text => "text",
            PostprocessorKind::Table => "table",
        }
    }
}

impl fmt::Display for PostprocessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostprocessorKind {
    type Err = DoccraftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(PostprocessorKind::Text),
            "table" => Ok(PostprocessorKind::Table),
            other => Err(DoccraftError::validation(format!(
                "Unknown postprocessor '{}'. Available postprocessors: text, table",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postprocessor_kind_from_str() {
        assert_eq!("TEXT".parse::<PostprocessorKind>().unwrap(), PostprocessorKind::Text);
        assert_eq!("table".parse::<PostprocessorKind>().unwrap(), PostprocessorKind::Table);
        assert!("spellcheck".parse::<PostprocessorKind>().is_err());
    }
}
