//! preprocess → parse → postprocess → benchmark

use anyhow::{Context, bail};
use benchmark_harness::{AccuracyBenchmarker, BenchmarkConfig, BenchmarkKind, PerformanceBenchmarker};
use doccraft::core::mime::detect_file_type;
use doccraft::postprocessing::{PostprocessorKind, TableFormat, TablePostprocessor, TextPostprocessor};
use doccraft::preprocessing::{PreprocessingMetadata, PreprocessorKind, preprocess};
use doccraft::{DoccraftConfig, DocumentParser, ExtractionResult, ParserRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// What one `extract` run should do
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub input: PathBuf,
    /// Parser key; picked from the file type when absent
    pub parser: Option<String>,
    pub preprocess: bool,
    pub postprocess: Option<PostprocessorKind>,
    pub table_format: Option<TableFormat>,
    pub benchmark: Option<BenchmarkKind>,
    /// Reference transcription for accuracy benchmarks
    pub reference: Option<PathBuf>,
}

impl PipelineOptions {
    /// Load options from a JSON, TOML or YAML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let extension = detect_file_type(path);

        let options = match extension.as_str() {
            "toml" => toml::from_str(&content)?,
            "yaml" | "yml" => serde_yaml_ng::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            other => bail!(
                "Unsupported pipeline config format '{}' for {} (expected toml, yaml or json)",
                other,
                path.display()
            ),
        };
        Ok(options)
    }

    /// Fields set in `file` win over the ones given on the command line
    pub fn overridden_by(self, file: PipelineOptions) -> Self {
        Self {
            input: if file.input.as_os_str().is_empty() {
                self.input
            } else {
                file.input
            },
            parser: file.parser.or(self.parser),
            preprocess: self.preprocess || file.preprocess,
            postprocess: file.postprocess.or(self.postprocess),
            table_format: file.table_format.or(self.table_format),
            benchmark: file.benchmark.or(self.benchmark),
            reference: file.reference.or(self.reference),
        }
    }
}

/// Everything a pipeline run produced
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub input: PathBuf,
    pub parser: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessing: Option<PreprocessingMetadata>,
    pub extraction: ExtractionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postprocessing: Option<serde_json::Value>,
    /// Final text after postprocessing
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<serde_json::Value>,
}

fn select_parser(
    registry: &ParserRegistry,
    name: Option<&str>,
    file_type: &str,
) -> anyhow::Result<Arc<dyn DocumentParser>> {
    match name {
        Some(name) => Ok(registry.resolve(name)?),
        None => registry
            .default_for(file_type)
            .with_context(|| format!("No parser handles '{}' files; pass --parser", file_type)),
    }
}

/// Run the pipeline for one document
pub async fn run_pipeline(
    options: &PipelineOptions,
    registry: &ParserRegistry,
    config: &DoccraftConfig,
) -> anyhow::Result<PipelineReport> {
    if !options.input.is_file() {
        bail!("Input file not found: {}", options.input.display());
    }
    let file_type = detect_file_type(&options.input);
    let parser = select_parser(registry, options.parser.as_deref(), &file_type)?;

    let mut document = options.input.clone();
    let mut preprocessing = None;
    if options.preprocess {
        match PreprocessorKind::for_file_type(&file_type) {
            Some(kind) => {
                info!("Preprocessing with {}", kind);
                let output = preprocess(kind, &document, &config.image_preprocessing).await?;
                document = output.path;
                preprocessing = Some(output.metadata);
            }
            None => warn!("No preprocessor for '{}' files, skipping", file_type),
        }
    }

    info!("Parsing {} with {}", document.display(), parser.name());
    let extraction = parser.extract_text(&document).await?;

    let (text, postprocessing) = match options.postprocess {
        Some(PostprocessorKind::Text) => {
            info!("Postprocessing with text");
            let (text, metadata) = TextPostprocessor::new(config.text_postprocessing.clone()).process(&extraction.text);
            (text, Some(serde_json::to_value(metadata)?))
        }
        Some(PostprocessorKind::Table) => {
            let format = options.table_format.unwrap_or(TableFormat::Markdown);
            info!("Postprocessing with table ({})", format);
            let (text, metadata) = TablePostprocessor::new().process(&extraction.text, format)?;
            (text, Some(serde_json::to_value(metadata)?))
        }
        None => (extraction.text.clone(), None),
    };

    let benchmark = match options.benchmark {
        Some(kind) => Some(run_benchmark(kind, parser.as_ref(), &options.input, options.reference.as_deref()).await?),
        None => None,
    };

    Ok(PipelineReport {
        input: options.input.clone(),
        parser: parser.name().to_string(),
        preprocessing,
        extraction,
        postprocessing,
        text,
        benchmark,
    })
}

/// Benchmarks always run against the original input
async fn run_benchmark(
    kind: BenchmarkKind,
    parser: &dyn DocumentParser,
    input: &Path,
    reference: Option<&Path>,
) -> anyhow::Result<serde_json::Value> {
    info!("Benchmarking with {}", kind);
    let config = BenchmarkConfig::default();

    let value = match kind {
        BenchmarkKind::Performance => {
            let result = PerformanceBenchmarker::new(config).benchmark_file(parser, input).await?;
            serde_json::to_value(result)?
        }
        BenchmarkKind::Accuracy => {
            let reference = reference.context("Accuracy benchmarks need --reference")?;
            let result = AccuracyBenchmarker::new(config.timeout)
                .evaluate_file(parser, input, reference)
                .await?;
            serde_json::to_value(result)?
        }
        BenchmarkKind::DocVqa => bail!("DocVQA runs over a dataset; use `benchmark-harness docvqa run`"),
    };
    Ok(value)
}

/// Shorten long text for terminal output
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
