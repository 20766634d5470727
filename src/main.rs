//! faith-kg CLI: reasoning-trail faithfulness scoring.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use faith_kg::batch::BatchRunner;
use faith_kg::config::{EmbedderKind, FaithConfig};
use faith_kg::embed::EmbeddingProvider;
use faith_kg::error::RecordError;
use faith_kg::faithfulness::FaithfulnessEvaluator;
use faith_kg::record::{self, Record};

#[derive(Parser)]
#[command(
    name = "faith-kg",
    version,
    about = "Score reasoning-trail knowledge graphs against reference subgraphs"
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Embedding backend, overriding the config (ollama or hashing).
    #[arg(long, global = true)]
    embedder: Option<EmbedderKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every record in a JSON file.
    Evaluate {
        /// JSON array of records with `question_id`, `cot_kg` and `kg_rag`.
        #[arg(long)]
        input: PathBuf,

        /// Where to write the records with `faithfulness_score` added.
        #[arg(long)]
        output: PathBuf,

        /// Also write hallucination records, keyed by question id.
        #[arg(long)]
        hallucinations: Option<PathBuf>,

        /// Score records in parallel.
        #[arg(long)]
        parallel: bool,
    },

    /// Score a single record and print the full report.
    ScoreRecord {
        /// JSON file holding one record object.
        #[arg(long)]
        input: PathBuf,
    },

    /// Print the default configuration as TOML.
    ConfigDefault,
}

fn load_config(path: Option<&Path>, embedder: Option<EmbedderKind>) -> Result<FaithConfig> {
    let mut config = match path {
        Some(path) => FaithConfig::load(path)?,
        None => FaithConfig::default(),
    };
    if let Some(kind) = embedder {
        config.embedder.kind = kind;
    }
    Ok(config)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::ConfigDefault => {
            print!("{}", FaithConfig::default().to_toml()?);
        }

        Commands::Evaluate {
            input,
            output,
            hallucinations,
            parallel,
        } => {
            let config = load_config(cli.config.as_deref(), cli.embedder)?;
            let provider = EmbeddingProvider::from_config(&config)?;
            let evaluator = FaithfulnessEvaluator::new(&config);

            let records = record::read_records(&input)?;
            let result = BatchRunner::new(&evaluator, &provider)
                .parallel(parallel)
                .run(records);

            record::write_json(&output, &result.outputs())?;
            if let Some(path) = hallucinations {
                record::write_json(&path, &result.hallucinations())?;
            }

            println!("Wrote {} records to {}", result.outcomes.len(), output.display());
            print!("{}", result.summary);
        }

        Commands::ScoreRecord { input } => {
            let config = load_config(cli.config.as_deref(), cli.embedder)?;
            let provider = EmbeddingProvider::from_config(&config)?;
            let evaluator = FaithfulnessEvaluator::new(&config);

            let text = std::fs::read_to_string(&input).map_err(|source| RecordError::Io {
                path: input.display().to_string(),
                source,
            })?;
            let value: serde_json::Value = serde_json::from_str(&text).into_diagnostic()?;
            let record = Record::from_value(value)?;
            let report = evaluator.evaluate(
                &record.question_label(),
                &record.chain()?,
                &record.reference()?,
                &provider,
            )?;

            let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
            println!("{json}");
        }
    }

    Ok(())
}
