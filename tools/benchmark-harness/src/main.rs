//! Benchmark harness CLI

use anyhow::{Context, bail};
use benchmark_harness::docvqa::{ReportWriter, compare, load_summary, render_table};
use benchmark_harness::fixture::validate_dir;
use benchmark_harness::{
    BenchmarkConfig, BenchmarkKind, BenchmarkRunner, DocVqaBenchmark, DocVqaConfig, FixtureManager, write_json,
};
use clap::{Args, Parser, Subcommand};
use doccraft::{DoccraftConfig, DocumentParser, ParserRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "benchmark-harness")]
#[command(about = "Benchmark harness for doccraft parsers", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// doccraft configuration file (defaults to discovery from the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all fixtures from a directory
    ListFixtures {
        /// Directory or file to search for fixtures
        #[arg(short, long)]
        fixtures: PathBuf,
    },

    /// Validate fixtures and the files they reference
    Validate {
        /// Directory to search for fixtures
        #[arg(short, long)]
        fixtures: PathBuf,
    },

    /// Run performance or accuracy benchmarks over fixtures
    Run {
        /// Directory or file to search for fixtures
        #[arg(short, long)]
        fixtures: PathBuf,

        /// Parsers to benchmark (comma-separated, default: all available)
        #[arg(short, long, value_delimiter = ',')]
        parsers: Vec<String>,

        /// Fixture file stems to keep (comma-separated, default: all)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Benchmark kind: performance or accuracy
        #[arg(short, long, default_value = "performance")]
        kind: BenchmarkKind,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Timeout in seconds
        #[arg(short = 't', long)]
        timeout: Option<u64>,

        /// Number of warmup iterations (discarded from statistics)
        #[arg(short = 'w', long, default_value = "1")]
        warmup: usize,

        /// Number of benchmark iterations for statistical analysis
        #[arg(short = 'i', long, default_value = "3")]
        iterations: usize,
    },

    /// DocVQA question answering benchmark
    #[command(subcommand)]
    Docvqa(DocVqaCommand),
}

#[derive(Subcommand)]
enum DocVqaCommand {
    /// Generate predictions with one parser
    Predict {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// Parser to answer with
        #[arg(short, long)]
        parser: String,
    },

    /// Score an existing predictions file
    Evaluate {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// Predictions JSON file
        #[arg(long)]
        predictions: PathBuf,

        /// Name the results are written under
        #[arg(short, long)]
        parser: String,
    },

    /// Predict and evaluate with one or more parsers
    Run {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// Parsers to run (comma-separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        parsers: Vec<String>,
    },

    /// Compare previously written summaries
    Compare {
        /// `{parser}_summary.json` files, in ranking tie-break order
        #[arg(required = true)]
        summaries: Vec<PathBuf>,

        /// Output directory for the comparison
        #[arg(short, long, default_value = "results/docvqa")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct DatasetArgs {
    /// Dataset JSON file
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Directory holding the documents
    #[arg(long)]
    documents_dir: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only process the first N questions
    #[arg(long)]
    max_questions: Option<usize>,

    /// Questions answered concurrently
    #[arg(long)]
    concurrency: Option<usize>,
}

impl DatasetArgs {
    fn into_config(self) -> DocVqaConfig {
        let mut config = DocVqaConfig::default();
        if let Some(dataset) = self.dataset {
            config.dataset = dataset;
        }
        if let Some(documents_dir) = self.documents_dir {
            config.documents_dir = documents_dir;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        config.max_questions = self.max_questions;
        config
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_registry(config: Option<PathBuf>) -> anyhow::Result<ParserRegistry> {
    let config = match config {
        Some(path) => DoccraftConfig::from_file(&path).with_context(|| format!("loading {}", path.display()))?,
        None => DoccraftConfig::discover()?.map(|(_, config)| config).unwrap_or_default(),
    };
    Ok(ParserRegistry::from_config(&config)?)
}

/// Resolve parser names, or every available parser when none are given
fn resolve_parsers(registry: &ParserRegistry, names: &[String]) -> anyhow::Result<Vec<Arc<dyn DocumentParser>>> {
    if names.is_empty() {
        return Ok(registry
            .kinds()
            .into_iter()
            .filter_map(|kind| registry.get(kind))
            .filter(|parser| parser.is_available())
            .collect());
    }
    names
        .iter()
        .map(|name| registry.resolve(name).map_err(anyhow::Error::from))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::ListFixtures { fixtures } => {
            let mut manager = FixtureManager::new();
            manager.load(&fixtures)?;

            println!("Loaded {} fixture(s)", manager.len());
            for (path, fixture) in manager.fixtures() {
                println!(
                    "  {} - {} ({})",
                    path.display(),
                    fixture.document.display(),
                    fixture.file_type
                );
            }
            Ok(())
        }

        Commands::Validate { fixtures } => {
            let count = validate_dir(&fixtures)?;
            println!("All {} fixture(s) are valid", count);
            Ok(())
        }

        Commands::Run {
            fixtures,
            parsers,
            only,
            kind,
            output,
            timeout,
            warmup,
            iterations,
        } => {
            let config = BenchmarkConfig {
                output_dir: output.clone(),
                timeout: Duration::from_secs(timeout.unwrap_or(1800)),
                warmup_iterations: warmup,
                benchmark_iterations: iterations,
                ..Default::default()
            };
            config.validate()?;

            let registry = load_registry(cli.config)?;
            let parsers = resolve_parsers(&registry, &parsers)?;
            let mut runner = BenchmarkRunner::new(config, parsers);
            runner.load_fixtures(&fixtures)?;
            runner.fixtures_mut().retain_named(&only.into_iter().collect());

            println!("Loaded {} fixture(s)", runner.fixture_count());
            if runner.fixture_count() == 0 {
                println!("No fixtures to benchmark");
                return Ok(());
            }

            let (total, failed, output_file) = match kind {
                BenchmarkKind::Performance => {
                    let results = runner.run_performance().await?;
                    let output_file = output.join("performance.json");
                    write_json(&results, &output_file)?;
                    (results.len(), results.iter().filter(|r| !r.success).count(), output_file)
                }
                BenchmarkKind::Accuracy => {
                    let results = runner.run_accuracy().await?;
                    let output_file = output.join("accuracy.json");
                    write_json(&results, &output_file)?;
                    (results.len(), results.iter().filter(|r| !r.success).count(), output_file)
                }
                BenchmarkKind::DocVqa => bail!("Use the `docvqa` subcommand for DocVQA runs"),
            };

            println!("\nSummary:");
            println!("  Successful: {}", total - failed);
            println!("  Failed: {}", failed);
            println!("  Total: {}", total);
            println!("\nResults written to: {}", output_file.display());
            Ok(())
        }

        Commands::Docvqa(command) => run_docvqa(command, cli.config).await,
    }
}

async fn run_docvqa(command: DocVqaCommand, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    match command {
        DocVqaCommand::Predict { dataset, parser } => {
            let benchmark = DocVqaBenchmark::new(dataset.into_config())?;
            let parser = load_registry(config_path)?.resolve(&parser)?;
            let predictions = benchmark.predict(parser.as_ref()).await?;
            println!("Generated {} predictions with {}", predictions.len(), parser.name());
        }

        DocVqaCommand::Evaluate {
            dataset,
            predictions,
            parser,
        } => {
            let benchmark = DocVqaBenchmark::new(dataset.into_config())?;
            let report = benchmark.evaluate_file(&parser, &predictions)?;
            println!("{}", render_table(&compare(std::slice::from_ref(&report.summary))));
        }

        DocVqaCommand::Run { dataset, parsers } => {
            let benchmark = DocVqaBenchmark::new(dataset.into_config())?;
            let registry = load_registry(config_path)?;
            let parsers = resolve_parsers(&registry, &parsers)?;
            let summaries = benchmark.run(&parsers).await?;
            println!("{}", render_table(&compare(&summaries)));
        }

        DocVqaCommand::Compare { summaries, output } => {
            let results = summaries
                .iter()
                .map(|path| load_summary(path).with_context(|| format!("loading {}", path.display())))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let comparison = compare(&results);
            ReportWriter::new(&output).write_comparison(&comparison)?;
            println!("{}", render_table(&comparison));
        }
    }
    Ok(())
}
