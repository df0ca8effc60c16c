//! doccraft command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Extract text, picking a parser from the file type
//! doccraft extract scan.png
//!
//! # Clean the image first, tidy the OCR output and time the parser
//! doccraft extract scan.png --parser tesseract --preprocess --postprocess text --benchmark performance
//!
//! # List parsers and whether their engines are usable here
//! doccraft parsers
//! ```

#![deny(unsafe_code)]

mod pipeline;

use anyhow::Context;
use benchmark_harness::BenchmarkKind;
use clap::{Parser, Subcommand, ValueEnum};
use doccraft::postprocessing::{PostprocessorKind, TableFormat};
use doccraft::{DoccraftConfig, ParserKind, ParserRegistry};
use pipeline::{PipelineOptions, preview, run_pipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const PREVIEW_CHARS: usize = 500;

#[derive(Parser)]
#[command(name = "doccraft")]
#[command(version, about = "Document parsing with OCR engines, PDF text layers and vision-language models", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (.toml, .yaml or .json). Discovered from the
    /// current directory upwards when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run preprocess → parse → postprocess → benchmark on one document
    Extract {
        /// Document to process
        input: PathBuf,

        /// Parser key (text, pdf, tesseract, qwenvl, deepseekvl)
        #[arg(short, long)]
        parser: Option<String>,

        /// Preprocess the document before parsing
        #[arg(long)]
        preprocess: bool,

        /// Postprocess the parser output (text or table)
        #[arg(long)]
        postprocess: Option<PostprocessorKind>,

        /// Output format for table postprocessing (csv, json, html, markdown)
        #[arg(long)]
        table_format: Option<TableFormat>,

        /// Benchmark the parser on the input (performance or accuracy)
        #[arg(long)]
        benchmark: Option<BenchmarkKind>,

        /// Reference text for accuracy benchmarks
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Pipeline options file; its values override these flags
        #[arg(long)]
        pipeline: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List parser kinds and whether they are available
    Parsers {
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the resolved configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<DoccraftConfig> {
    match path {
        Some(path) => {
            DoccraftConfig::from_file(&path).with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => Ok(DoccraftConfig::discover()?
            .map(|(path, config)| {
                tracing::debug!("Using config {}", path.display());
                config
            })
            .unwrap_or_default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Extract {
            input,
            parser,
            preprocess,
            postprocess,
            table_format,
            benchmark,
            reference,
            pipeline,
            format,
        } => {
            let mut options = PipelineOptions {
                input,
                parser,
                preprocess,
                postprocess,
                table_format,
                benchmark,
                reference,
            };
            if let Some(path) = pipeline {
                options = options.overridden_by(PipelineOptions::from_file(&path)?);
            }

            let registry = ParserRegistry::from_config(&config)?;
            let report = run_pipeline(&options, &registry, &config).await?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => {
                    println!("Parser: {}", report.parser);
                    if let Some(error) = &report.extraction.error {
                        println!("Partial failure: {}", error);
                    }
                    println!("{}", preview(&report.text, PREVIEW_CHARS));
                    if let Some(benchmark) = &report.benchmark {
                        println!("\nBenchmark:\n{}", serde_json::to_string_pretty(benchmark)?);
                    }
                }
            }
        }

        Commands::Parsers { format } => {
            let registry = ParserRegistry::from_config(&config)?;
            let rows: Vec<serde_json::Value> = ParserKind::ALL
                .iter()
                .filter_map(|kind| registry.get(*kind).map(|parser| (kind, parser)))
                .map(|(kind, parser)| {
                    serde_json::json!({
                        "key": kind.as_str(),
                        "name": parser.name(),
                        "version": parser.version(),
                        "available": parser.is_available(),
                        "question_answering": parser.supports_question_answering(),
                        "formats": parser.supported_formats(),
                    })
                })
                .collect();

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
                OutputFormat::Text => {
                    for row in &rows {
                        println!(
                            "{:<12} {:<10} qa={:<5} {}",
                            row["key"].as_str().unwrap_or_default(),
                            if row["available"] == true { "available" } else { "missing" },
                            row["question_answering"],
                            row["formats"]
                        );
                    }
                }
            }
        }

        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
