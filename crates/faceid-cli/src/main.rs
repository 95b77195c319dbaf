use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faceid_core::Embedding;
use faceid_service::{Config, FaceService};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "faceid", about = "Face registration and recognition over an embedding gallery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an embedding under a label
    Register {
        /// Identity label (e.g., "alice")
        #[arg(short, long)]
        label: String,
        /// JSON file holding the embedding as an array of floats
        #[arg(short, long)]
        embedding: PathBuf,
        /// Original name of the source image, kept in the audit log
        #[arg(long)]
        filename: Option<String>,
    },
    /// Match an embedding against the gallery
    Match {
        /// JSON file holding the probe embedding
        #[arg(short, long)]
        embedding: PathBuf,
        /// Override the configured distance threshold
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Original name of the probe image, kept in history
        #[arg(long)]
        filename: Option<String>,
    },
    /// List registered identities
    List,
    /// Show recognition history
    History,
    /// Show gallery status
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    tracing::debug!(
        gallery = %config.gallery_path.display(),
        history = %config.history_path.display(),
        dimension = config.embedding_dim,
        threshold = config.match_threshold,
        "configuration loaded"
    );
    let service = FaceService::open(&config)
        .with_context(|| format!("opening gallery {}", config.gallery_path.display()))?;
    tracing::debug!(records = service.registered().len(), "gallery opened");

    match cli.command {
        Commands::Register {
            label,
            embedding,
            filename,
        } => {
            let embedding = read_embedding(&embedding)?;
            let reg = service.register(&label, embedding, filename.as_deref())?;
            println!(
                "{}",
                serde_json::json!({
                    "name": reg.label,
                    "record": reg.record.index(),
                    "filename": reg.filename,
                })
            );
        }
        Commands::Match {
            embedding,
            threshold,
            filename,
        } => {
            let probe = read_embedding(&embedding)?;
            let threshold = threshold.unwrap_or(service.threshold());
            tracing::debug!(threshold, "matching embedding");
            let rec = service.recognize_with_threshold(&probe, threshold, filename.as_deref())?;
            println!(
                "{}",
                serde_json::json!({
                    "name": rec.result.label,
                    "filename": rec.entry.filename,
                    "distance": rec.result.distance,
                    "confidence": rec.entry.confidence,
                    "recognition_type": rec.entry.recognition_type,
                    "matched_record": rec.result.matched_record.map(|r| r.index()),
                })
            );
        }
        Commands::List => {
            let records = service.registered();
            if records.is_empty() {
                println!("No identities registered");
            }
            for (i, record) in records.iter().enumerate() {
                println!("{i}\t{}\t{}", record.label, record.filename.as_deref().unwrap_or("-"));
            }
        }
        Commands::History => {
            println!("{}", serde_json::to_string_pretty(&service.recognized())?);
        }
        Commands::Status => {
            println!("{}", serde_json::to_string_pretty(&service.status())?);
        }
    }

    Ok(())
}

fn read_embedding(path: &Path) -> Result<Embedding> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading embedding {}", path.display()))?;
    let values: Vec<f32> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of floats", path.display()))?;
    Ok(Embedding::new(values))
}
