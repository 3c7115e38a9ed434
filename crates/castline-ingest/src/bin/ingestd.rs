//! castline ingest debug tool.
//!
//! Thin wrappers that run one message or one account through the
//! pipeline. The queue consumer driving live ingestion is an external
//! collaborator and is not part of this binary.
//!
//! ```text
//! ingestd process --message msg.json     # one raw Hub message
//! ingestd backfill --fid 3               # hydrate one account
//! ```

use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use castline_core::id::Fid;
use castline_ingest::{
  BackfillProcessor, EventProcessor, ResolverConfig,
  hub_http::{HttpHubClient, HubConfig},
  publish::StdoutPublisher,
};
use castline_proto::Message;
use castline_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "castline ingest debug tool")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Run a single raw Hub message (JSON file) through the event
  /// processor.
  Process {
    /// Path to a file containing one Hub message as JSON.
    #[arg(long)]
    message: PathBuf,
  },
  /// Hydrate the full history of one account from the Hub.
  Backfill {
    #[arg(long)]
    fid: u64,
  },
}

/// Runtime configuration, deserialised from `config.toml` with
/// `CASTLINE_`-prefixed environment overrides.
#[derive(Deserialize, Clone)]
struct IngestConfig {
  store_path: PathBuf,
  hub_url:    String,
  #[serde(default = "default_hub_timeout_secs")]
  hub_timeout_secs: u64,
  #[serde(default = "default_page_size")]
  page_size:  u32,
}

fn default_hub_timeout_secs() -> u64 { 10 }

fn default_page_size() -> u32 { 100 }

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CASTLINE"))
    .build()
    .context("failed to read config file")?;

  let ingest_cfg: IngestConfig = settings
    .try_deserialize()
    .context("failed to deserialise IngestConfig")?;

  let store = SqliteStore::open(&ingest_cfg.store_path)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", ingest_cfg.store_path)
    })?;

  let hub_cfg = HubConfig {
    timeout: Duration::from_secs(ingest_cfg.hub_timeout_secs),
    page_size: ingest_cfg.page_size,
    ..HubConfig::new(ingest_cfg.hub_url.clone())
  };
  let hub = HttpHubClient::new(&hub_cfg).context("failed to build hub client")?;

  match cli.command {
    Command::Process { message } => {
      let raw = std::fs::read_to_string(&message)
        .with_context(|| format!("failed to read {message:?}"))?;
      let message: Message =
        serde_json::from_str(&raw).context("failed to parse Hub message JSON")?;

      let processor = EventProcessor::new(
        store,
        hub,
        StdoutPublisher,
        ResolverConfig::default(),
      );
      let outcome = processor.process(&message).await?;
      tracing::info!(?outcome, "message processed");
    }
    Command::Backfill { fid } => {
      let backfill =
        BackfillProcessor::new(store, hub, ResolverConfig::default());
      let summary = backfill.backfill_fid(Fid(fid)).await?;
      tracing::info!(
        casts = summary.casts.stored,
        reactions = summary.reactions.stored,
        links = summary.links.stored,
        verifications = summary.verifications.stored,
        user_data = summary.user_data.stored,
        username_proofs = summary.username_proofs.stored,
        "backfill complete"
      );
    }
  }

  Ok(())
}
