use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fit_analyzer::analysis::{Analyzer, AnalyzerSettings};
use fit_analyzer::config::Config;
use fit_analyzer::criteria_provider::{CriteriaProvider, InMemoryCriteriaProvider};
use fit_analyzer::history::discover_sources;
use fit_analyzer::llm_client::{self, AnthropicClient};

#[derive(Debug, Parser)]
#[command(
    name = "fit-analyzer",
    version,
    about = "Score a sales-call transcript against the ideal customer profile",
    after_help = "Examples:\n  fit-analyzer call.txt --criteria criteria.json --history-dir history/\n  cat call.txt | fit-analyzer - --compact"
)]
struct Cli {
    #[arg(help = "Transcript file, or - to read from stdin")]
    transcript: PathBuf,
    #[arg(long, value_name = "FILE", help = "Scoring criteria as JSON")]
    criteria: Option<PathBuf>,
    #[arg(
        long = "history-dir",
        value_name = "DIR",
        help = "Directory of historical customer exports (.csv, .json, .txt, .md)"
    )]
    history_dir: Option<PathBuf>,
    #[arg(long, help = "Print compact JSON instead of pretty-printed")]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging. Logs go to stderr; stdout carries the result.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting fit-analyzer v{}", env!("CARGO_PKG_VERSION"));

    let transcript = read_transcript(&cli.transcript).await?;

    // Initialize LLM client
    let llm = AnthropicClient::new(config.anthropic_api_key.clone(), config.llm_timeout)?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize criteria provider
    let criteria: Arc<dyn CriteriaProvider> = match &cli.criteria {
        Some(path) => Arc::new(InMemoryCriteriaProvider::from_json_file(path).await?),
        None => {
            warn!("No criteria file given; scoring without industry or requirement constraints");
            Arc::new(InMemoryCriteriaProvider::default())
        }
    };

    // Initialize historical sources
    let sources = match &cli.history_dir {
        Some(dir) => discover_sources(dir).await?,
        None => Vec::new(),
    };
    info!("{} historical sources configured", sources.len());

    let analyzer = Analyzer::new(
        Arc::new(llm),
        criteria,
        sources,
        AnalyzerSettings::from_config(&config),
    );

    match analyzer.analyze(&transcript).await {
        Ok(outcome) => {
            let json = if cli.compact {
                serde_json::to_string(&outcome)?
            } else {
                serde_json::to_string_pretty(&outcome)?
            };
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            let body = serde_json::json!({
                "error": e.code(),
                "message": e.to_string(),
            });
            eprintln!("{body}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn read_transcript(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read transcript from stdin")?;
        return Ok(buf);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read transcript {}", path.display()))
}
