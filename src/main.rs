use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use railscribe::{
    BackendKind, BatchResult, MergedRecordBuilder, TranscribeConfig, TranscriptionPipeline,
};

/// Railscribe - Batch transcription of radio traffic recordings
#[derive(Parser, Debug)]
#[command(name = "railscribe")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backend(s) to transcribe with
    #[arg(short = 'b', long = "backend", value_enum, default_value_t = BackendChoice::Both)]
    backend: BackendChoice,

    /// Recognizer chunk window in seconds (5-60)
    #[arg(long = "chunk-seconds", value_name = "N")]
    chunk_seconds: Option<u64>,

    /// Directory for transcripts and reports
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = "transcripts")]
    output: PathBuf,

    /// Audio files to transcribe
    #[arg(required = true, value_name = "FILES")]
    files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendChoice {
    Recognizer,
    Generative,
    Both,
}

impl BackendChoice {
    fn kinds(self) -> Vec<BackendKind> {
        match self {
            Self::Recognizer => vec![BackendKind::Recognizer],
            Self::Generative => vec![BackendKind::Generative],
            Self::Both => BackendKind::all().to_vec(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = if let Some(config_path) = &cli.config {
        info!("Loading configuration from {}", config_path.display());
        TranscribeConfig::from_file(config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        TranscribeConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    if let Some(secs) = cli.chunk_seconds {
        config.recognizer_chunk_seconds = secs;
        config.validate().map_err(|e| anyhow!(e))?;
    }

    let kinds = cli.backend.kinds();
    let pipeline = TranscriptionPipeline::from_config(&config, &kinds)
        .context("Failed to initialize transcription backends")?;
    drop(config);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling outstanding requests");
                cancel.cancel();
            }
        });
    }

    let result = pipeline.run(&cli.files, cancel).await;

    tokio::fs::create_dir_all(&cli.output)
        .await
        .with_context(|| format!("Failed to create output directory {}", cli.output.display()))?;
    write_outputs(&cli.output, &result).await?;

    info!("Wrote results for {} file(s) to {}", result.files.len(), cli.output.display());
    Ok(())
}

async fn write_outputs(dir: &Path, result: &BatchResult) -> anyhow::Result<()> {
    for file in &result.files {
        let stem = Path::new(&file.source.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.source.name.clone());

        for transcript in &file.transcripts {
            let path = dir.join(format!("{stem}_{}.txt", transcript.backend));
            write_text(&path, &transcript.render_individual()).await?;
        }
    }

    let builder = MergedRecordBuilder::new();
    for backend in &result.backends {
        let merged = result.merged(backend, &builder);
        write_text(&dir.join(format!("merged_{backend}.txt")), &merged.render()).await?;
    }

    if let [left, right] = result.backends.as_slice() {
        let report = result
            .compare(left, right)
            .context("Failed to compare backend results")?;
        write_text(&dir.join("comparison.txt"), &report.render()).await?;
    }

    Ok(())
}

async fn write_text(path: &Path, contents: &str) -> anyhow::Result<()> {
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}
