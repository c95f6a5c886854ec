//! Command-line entry point for the case-intelligence pipeline.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use veredicto_core::PipelineConfig;
use veredicto_index::{Encoder, HashingEncoder};
use veredicto_service::{Pipeline, SearchFilters, read_documents};

#[derive(Parser)]
#[command(name = "veredicto", version, about = "Legal case intelligence pipeline")]
struct Cli {
    /// Directory holding durable artifacts (index snapshot, model).
    #[arg(long, env = "VEREDICTO_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Parquet file with the case corpus.
    #[arg(long, env = "VEREDICTO_CORPUS", default_value = "./data/casos.parquet")]
    corpus: PathBuf,

    /// Directory with an ONNX sentence-encoder model (model.onnx +
    /// tokenizer.json). Requires the `onnx` build feature; the default
    /// is the deterministic hashing encoder.
    #[arg(long, env = "VEREDICTO_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the corpus file and report row counts.
    Ingest,
    /// Rebuild the vector index over the whole corpus.
    Reindex,
    /// Train the outcome classifier on the corpus.
    Train {
        /// Fraction of each class held out for evaluation.
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f32,
    },
    /// Search the corpus for similar cases.
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        /// Restrict hits to tribunals containing this text.
        #[arg(long)]
        tribunal: Option<String>,
        /// Restrict hits to matters containing this text.
        #[arg(long)]
        materia: Option<String>,
    },
    /// Predict the outcome of a case description.
    Predict {
        description: String,
        #[arg(long)]
        case_type: Option<String>,
    },
    /// Predict and explain, listing supporting precedent.
    Explain {
        description: String,
        #[arg(long)]
        case_type: Option<String>,
    },
    /// Evaluate the trained model against the full corpus.
    Evaluate,
    /// Report corpus, index, and model status.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("veredicto v{}", env!("CARGO_PKG_VERSION"));
    let cli = Cli::parse();

    let (documents, report) =
        read_documents(&cli.corpus).with_context(|| format!("reading {}", cli.corpus.display()))?;

    if let Command::Ingest = cli.command {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let config = PipelineConfig::new(&cli.data_dir);
    let encoder = build_encoder(&config, cli.model_dir.as_deref())?;
    let pipeline = Pipeline::open(config, encoder, documents).context("opening pipeline")?;

    match cli.command {
        Command::Ingest => unreachable!("handled above"),
        Command::Reindex => {
            let report = pipeline.reindex().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Train { test_fraction } => {
            let report = pipeline.train(test_fraction).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Search {
            query,
            limit,
            tribunal,
            materia,
        } => {
            let filters = SearchFilters {
                tribunal,
                matter: materia,
            };
            let hits = pipeline.search(&query, limit, &filters)?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        Command::Predict {
            description,
            case_type,
        } => {
            let prediction = pipeline.predict(&description, case_type.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        Command::Explain {
            description,
            case_type,
        } => {
            let analysis = pipeline.explain_case(&description, case_type.as_deref())?;
            println!("{}", analysis.explanation);
        }
        Command::Evaluate => {
            let report = pipeline.evaluate()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Stats => {
            println!("{}", serde_json::to_string_pretty(&pipeline.stats())?);
        }
    }

    Ok(())
}

#[cfg(feature = "onnx")]
fn build_encoder(
    config: &PipelineConfig,
    model_dir: Option<&std::path::Path>,
) -> anyhow::Result<Box<dyn Encoder>> {
    match model_dir {
        Some(dir) => {
            let encoder =
                veredicto_index::OnnxEncoder::load(dir).context("loading ONNX encoder")?;
            Ok(Box::new(encoder))
        }
        None => Ok(Box::new(HashingEncoder::new(config.embedding_dim))),
    }
}

#[cfg(not(feature = "onnx"))]
fn build_encoder(
    config: &PipelineConfig,
    model_dir: Option<&std::path::Path>,
) -> anyhow::Result<Box<dyn Encoder>> {
    if model_dir.is_some() {
        anyhow::bail!("--model-dir requires a build with the `onnx` feature");
    }
    Ok(Box::new(HashingEncoder::new(config.embedding_dim)))
}
