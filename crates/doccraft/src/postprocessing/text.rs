//! Text cleanup for extracted and OCR'd content.

use crate::types::TextPostprocessingConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HYPHEN_BREAK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\w)-[ \t]*\n[ \t]*(\w)").expect("Hyphen break regex pattern is valid and should compile")
});
static CONTROL_CHARS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("Control chars regex pattern is valid and should compile")
});
static ZERO_IN_WORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])0([a-z])").expect("Zero-in-word regex pattern is valid and should compile"));
static ONE_IN_WORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])1([a-z])").expect("One-in-word regex pattern is valid and should compile"));
static SPACE_BEFORE_PUNCT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\w)[ \t]+([,.;:!?])(\s|$)").expect("Space before punctuation regex pattern is valid and should compile")
});
static INLINE_WHITESPACE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("Inline whitespace regex pattern is valid and should compile"));
static BLANK_LINES_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("Blank lines regex pattern is valid and should compile"));

const UNICODE_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201A}', "'"),
    ('\u{201B}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{201E}', "\""),
    ('\u{201F}', "\""),
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2012}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "-"),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{00AD}', ""),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStatistics {
    pub char_count: usize,
    pub word_count: usize,
    pub line_count: usize,
    pub paragraph_count: usize,
}

impl TextStatistics {
    pub fn from_text(text: &str) -> Self {
        Self {
            char_count: text.chars().count(),
            word_count: text.split_whitespace().count(),
            line_count: text.lines().filter(|line| !line.trim().is_empty()).count(),
            paragraph_count: text.split("\n\n").filter(|p| !p.trim().is_empty()).count(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextPostprocessingMetadata {
    pub operations: Vec<String>,
    pub original_length: usize,
    pub processed_length: usize,
    pub text_statistics: TextStatistics,
}

#[derive(Debug, Clone, Default)]
pub struct TextPostprocessor {
    config: TextPostprocessingConfig,
}

impl TextPostprocessor {
    pub fn new(config: TextPostprocessingConfig) -> Self {
        Self { config }
    }

    /// Clean `text`, returning the cleaned text and what was done to it.
    pub fn process(&self, text: &str) -> (String, TextPostprocessingMetadata) {
        let mut operations = Vec::new();
        let mut current = text.replace("\r\n", "\n").replace('\r', "\n");

        if self.config.normalize_unicode {
            current = normalize_unicode(&current);
            operations.push("normalize_unicode".to_string());
        }

        if self.config.dehyphenate {
            current = HYPHEN_BREAK_PATTERN.replace_all(&current, "${1}${2}").into_owned();
            operations.push("dehyphenate".to_string());
        }

        if self.config.fix_ocr_errors {
            current = fix_ocr_errors(&current);
            operations.push("fix_ocr_errors".to_string());
        }

        if self.config.normalize_whitespace {
            current = normalize_whitespace(&current);
            operations.push("normalize_whitespace".to_string());
        }

        let metadata = TextPostprocessingMetadata {
            operations,
            original_length: text.chars().count(),
            processed_length: current.chars().count(),
            text_statistics: TextStatistics::from_text(&current),
        };

        (current, metadata)
    }
}

fn normalize_unicode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match UNICODE_REPLACEMENTS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}

fn fix_ocr_errors(text: &str) -> String {
    let text = CONTROL_CHARS_PATTERN.replace_all(text, "");
    let text = ZERO_IN_WORD_PATTERN.replace_all(&text, "${1}o${2}");
    let text = ONE_IN_WORD_PATTERN.replace_all(&text, "${1}l${2}");
    SPACE_BEFORE_PUNCT_PATTERN
        .replace_all(&text, "${1}${2}${3}")
        .into_owned()
}

fn normalize_whitespace(text: &str) -> String {
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| INLINE_WHITESPACE_PATTERN.replace_all(line, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");
    BLANK_LINES_PATTERN.replace_all(&joined, "\n\n").trim().to_string()
}
