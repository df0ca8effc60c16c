//! doccraft - document parsing toolkit
//!
//! doccraft puts OCR engines, PDF text extraction and vision-language models
//! behind one [`DocumentParser`](parsers::DocumentParser) interface, and ships
//! the image and text processing steps that usually surround them.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use doccraft::{DoccraftConfig, ParserRegistry};
//! use std::path::Path;
//!
//! # async fn example() -> doccraft::Result<()> {
//! let registry = ParserRegistry::from_config(&DoccraftConfig::default())?;
//! let parser = registry.resolve("pdf")?;
//! let result = parser.extract_text(Path::new("invoice.pdf")).await?;
//! println!("{}", result.text);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core** (`core`): configuration loading and file type detection
//! - **Parsers** (`parsers`): the closed set of engines and the registry built from config
//! - **Preprocessing** (`preprocessing`): image cleanup for OCR, PDF passthrough
//! - **Postprocessing** (`postprocessing`): text cleanup, table export

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod parsers;
pub mod postprocessing;
pub mod preprocessing;
pub mod types;

pub use crate::core::config::DoccraftConfig;
pub use error::{DoccraftError, Result};
pub use parsers::{DocumentParser, ParserKind, ParserRegistry};
pub use types::{ExtractionMetadata, ExtractionResult, QuestionAnswer};
