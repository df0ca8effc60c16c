//! Configuration and file type detection shared by parsers and processors.

pub mod config;
pub mod mime;

pub use config::{DoccraftConfig, TesseractConfig, VisionConfig};
