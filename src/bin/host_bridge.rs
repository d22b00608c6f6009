//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! This binary reads `CommandEnvelope` messages as newline-delimited JSON
//! from stdin, dispatches them against the owner's workspace, and writes
//! `ResponseEnvelope` and `EventEnvelope` messages to stdout.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::path::PathBuf;
use std::sync::Arc;

use planink::auth::{OwnerId, SessionIdentity};
use planink::config::PlaninkConfig;
use planink::host::stdio::run_stdio_bridge;
use planink::workspace::Workspace;

fn load_config() -> anyhow::Result<PlaninkConfig> {
    let path = std::env::var_os("PLANINK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(PlaninkConfig::default_config_path);
    if !path.exists() {
        tracing::info!(path = %path.display(), "no config file; using defaults");
        return Ok(PlaninkConfig::default());
    }
    PlaninkConfig::from_file(&path)
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {e}", path.display()))
}

fn resolve_identity(config: &PlaninkConfig) -> anyhow::Result<SessionIdentity> {
    let owner = config
        .identity
        .owner
        .clone()
        .or_else(|| std::env::var("PLANINK_OWNER").ok());
    match owner {
        Some(raw) => {
            let owner = OwnerId::new(raw)?;
            tracing::info!(owner = %owner, "bridge signed in");
            Ok(SessionIdentity::signed_in(owner))
        }
        None => {
            tracing::warn!("no owner configured; entity commands will be rejected");
            Ok(SessionIdentity::anonymous())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("planink=info")),
        )
        .init();

    tracing::info!("planink-host starting");

    let config = load_config()?;
    let identity = resolve_identity(&config)?;
    let workspace = Workspace::open(config, Arc::new(identity))?;

    run_stdio_bridge(workspace).await.map_err(|e| {
        tracing::error!(error = %e, "planink-host exited with error");
        anyhow::anyhow!("planink-host failed: {e}")
    })?;

    tracing::info!("planink-host shut down cleanly");
    Ok(())
}
