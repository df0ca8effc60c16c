//! Error types for doccraft.
//!
//! All fallible library operations return [`DoccraftError`]. The conventions are:
//!
//! - `Io` errors (from `std::io::Error`) bubble up unchanged
//! - Application errors carry a message and, where available, the underlying source
//! - Engine availability problems are reported as `MissingDependency`
//!
//! # Example
//!
//! ```rust
//! use doccraft::{DoccraftError, Result};
//!
//! fn read_answer(path: &str) -> Result<String> {
//!     let content = std::fs::read_to_string(path)?;
//!
//!     if content.trim().is_empty() {
//!         return Err(DoccraftError::validation(format!("File is empty: {}", path)));
//!     }
//!
//!     Ok(content)
//! }
//! ```
use thiserror::Error;

/// Result type alias using `DoccraftError`.
pub type Result<T> = std::result::Result<T, DoccraftError>;

/// Main error type for all doccraft operations.
#[derive(Debug, Error)]
pub enum DoccraftError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("OCR error: {message}")]
    Ocr {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Image processing error: {message}")]
    ImageProcessing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Parser '{parser}' does not support {operation}")]
    UnsupportedOperation { parser: String, operation: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for DoccraftError {
    fn from(err: serde_json::Error) -> Self {
        DoccraftError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<lopdf::Error> for DoccraftError {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(io_err) => DoccraftError::Io(io_err),
            other => DoccraftError::Parsing {
                message: format!("Invalid PDF: {}", other),
                source: Some(Box::new(other)),
            },
        }
    }
}

impl From<image::ImageError> for DoccraftError {
    fn from(err: image::ImageError) -> Self {
        DoccraftError::ImageProcessing {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<reqwest::Error> for DoccraftError {
    fn from(err: reqwest::Error) -> Self {
        DoccraftError::Network {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl DoccraftError {
    error_constructor!(parsing, Parsing);
    error_constructor!(ocr, Ocr);
    error_constructor!(validation, Validation);
    error_constructor!(image_processing, ImageProcessing);
    error_constructor!(serialization, Serialization);
    error_constructor!(network, Network);

    /// Create an error for a capability the parser does not offer.
    pub fn unsupported_operation(parser: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            parser: parser.into(),
            operation: operation.into(),
        }
    }
}
