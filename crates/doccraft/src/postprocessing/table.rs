//! Delimited-text table normalization and export.
//!
//! Input is any delimited text with a header row (comma, tab, pipe or
//! semicolon separated, auto-detected). Output formats:
//!
//! ```markdown
//! | Item | Amount |
//! |------|------|
//! | Coffee | 3.50 |
//! ```
//!
//! plus CSV, JSON (array of header-keyed objects, column order preserved)
//! and HTML.

use crate::{DoccraftError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const CANDIDATE_DELIMITERS: [char; 4] = [',', '\t', '|', ';'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    Csv,
    Json,
    Html,
    Markdown,
}

impl TableFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Json => "json",
            TableFormat::Html => "html",
            TableFormat::Markdown => "markdown",
        }
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableFormat {
    type Err = DoccraftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(TableFormat::Csv),
            "json" => Ok(TableFormat::Json),
            "html" => Ok(TableFormat::Html),
            "markdown" | "md" => Ok(TableFormat::Markdown),
            other => Err(DoccraftError::validation(format!(
                "Unknown table format '{}'. Expected csv, json, html or markdown",
                other
            ))),
        }
    }
}

/// A header row plus data rows, all padded to the header width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub rows: usize,
    pub columns: usize,
    pub delimiter: String,
    pub format: TableFormat,
}

fn detect_delimiter(first_line: &str) -> char {
    CANDIDATE_DELIMITERS
        .into_iter()
        .map(|d| (d, first_line.matches(d).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(d, _)| d)
        .unwrap_or(',')
}

/// Drop Markdown-style outer pipes and `|---|---|` separator rows.
fn strip_pipe_borders(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' ')))
        .map(|line| {
            let line = line.strip_prefix('|').unwrap_or(line);
            line.strip_suffix('|').unwrap_or(line).to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl Table {
    /// Parse delimited text, returning the table and the detected delimiter.
    pub fn parse(text: &str) -> Result<(Self, char)> {
        let first_line = text
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| DoccraftError::validation("No table data"))?;
        let delimiter = detect_delimiter(first_line);

        let source = if delimiter == '|' {
            strip_pipe_borders(text)
        } else {
            text.trim().to_string()
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter as u8)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(source.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| DoccraftError::parsing_with_source("Invalid table header", e))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| DoccraftError::parsing_with_source("Invalid table row", e))?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            if row.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            row.resize(headers.len().max(row.len()), String::new());
            rows.push(row);
        }

        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(headers.len());
        let mut headers = headers;
        for i in headers.len()..width {
            headers.push(format!("column_{}", i + 1));
        }
        for row in &mut rows {
            row.resize(width, String::new());
        }

        Ok((Self { headers, rows }, delimiter))
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(&self.headers)
            .map_err(|e| DoccraftError::serialization_with_source("Failed to write CSV header", e))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| DoccraftError::serialization_with_source("Failed to write CSV row", e))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| DoccraftError::serialization(format!("Failed to flush CSV: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| DoccraftError::serialization_with_source("CSV is not UTF-8", e))
    }

    pub fn to_json(&self) -> Result<String> {
        let records: Vec<IndexMap<&str, &str>> = self
            .rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter().map(String::as_str))
                    .collect()
            })
            .collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    pub fn to_html(&self) -> String {
        let mut html = String::from("<table>\n  <thead>\n    <tr>");
        for header in &self.headers {
            html.push_str(&format!("<th>{}</th>", escape_html(header)));
        }
        html.push_str("</tr>\n  </thead>\n  <tbody>\n");
        for row in &self.rows {
            html.push_str("    <tr>");
            for cell in row {
                html.push_str(&format!("<td>{}</td>", escape_html(cell)));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("  </tbody>\n</table>");
        html
    }

    pub fn to_markdown(&self) -> String {
        let mut markdown = String::new();

        markdown.push('|');
        for header in &self.headers {
            markdown.push_str(&format!(" {} |", header.replace('|', "\\|")));
        }
        markdown.push('\n');

        markdown.push('|');
        for _ in &self.headers {
            markdown.push_str("------|");
        }
        markdown.push('\n');

        for row in &self.rows {
            markdown.push('|');
            for cell in row {
                markdown.push_str(&format!(" {} |", cell.replace('|', "\\|")));
            }
            markdown.push('\n');
        }

        markdown.trim_end().to_string()
    }

    pub fn render(&self, format: TableFormat) -> Result<String> {
        match format {
            TableFormat::Csv => self.to_csv(),
            TableFormat::Json => self.to_json(),
            TableFormat::Html => Ok(self.to_html()),
            TableFormat::Markdown => Ok(self.to_markdown()),
        }
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TablePostprocessor;

impl TablePostprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Parse `text` as a table and render it as `format`.
    pub fn process(&self, text: &str, format: TableFormat) -> Result<(String, TableMetadata)> {
        let (table, delimiter) = Table::parse(text)?;
        let rendered = table.render(format)?;
        let metadata = TableMetadata {
            rows: table.rows.len(),
            columns: table.headers.len(),
            delimiter: match delimiter {
                '\t' => "tab".to_string(),
                other => other.to_string(),
            },
            format,
        };
        Ok((rendered, metadata))
    }
}
