use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use kubeward_admission::{AdmissionReview, AdmissionSettings};
use kubeward_core::config::KubewardConfig;
use kubeward_daemon::cli::{Command, DaemonCli};
use kubeward_daemon::logging;
use kubeward_daemon::orchestrator::Orchestrator;
use kubeward_daemon::review::evaluate_review;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = KubewardConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;

    // CLI flags take precedence over file and environment
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    match cli.command {
        Some(Command::Review { request, settings }) => run_review(config, request, settings).await,
        None => {
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "kubeward-daemon starting");
            let mut orchestrator = Orchestrator::build_from_config(config)?;
            orchestrator.run().await?;
            tracing::info!("kubeward-daemon shut down");
            Ok(())
        }
    }
}

async fn run_review(
    config: KubewardConfig,
    request: PathBuf,
    settings: Option<PathBuf>,
) -> Result<()> {
    let settings_path = match settings {
        Some(path) => path,
        None if !config.admission.settings_path.is_empty() => {
            PathBuf::from(&config.admission.settings_path)
        }
        None => anyhow::bail!("no settings file given and admission.settings_path is empty"),
    };
    let settings = AdmissionSettings::load(&settings_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load admission settings: {}", e))?;

    let raw = tokio::fs::read_to_string(&request)
        .await
        .with_context(|| format!("failed to read {}", request.display()))?;
    let review: AdmissionReview = serde_json::from_str(&raw)
        .with_context(|| format!("invalid admission review in {}", request.display()))?;

    let response = evaluate_review(&config, settings, review).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
