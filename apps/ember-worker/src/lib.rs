pub mod cli;
pub mod worker;

mod error;

pub use error::{Error, Result};
pub use worker::{TickOutcome, Worker};

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ember_config::Config;
use ember_domain::clock::SystemClock;
use ember_providers::{HttpEmbedding, HttpLlm};
use ember_service::MemoryService;
use ember_storage::{PgStore, db::Db};

#[derive(Debug, Parser)]
#[command(
	version = cli::VERSION,
	rename_all = "kebab",
	styles = cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Entries to process back to back after a stop request, before exiting.
	#[arg(long, value_name = "N", default_value_t = 0)]
	pub drain_on_exit: usize,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	color_eyre::install()?;

	let config = ember_config::load(&args.config)?;
	let filter = EnvFilter::try_new(&config.service.log_level)?;

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let worker_id = config.service.worker_id.clone().unwrap_or_else(default_worker_id);
	let service = Arc::new(build_service(config).await?);
	let worker = Worker::new(service, worker_id);

	worker.ensure_start();
	tokio::signal::ctrl_c().await?;
	tracing::info!("Shutdown requested. Waiting for the current tick.");
	worker.stop().await;

	if args.drain_on_exit > 0 {
		worker.drain(args.drain_on_exit).await;
	}

	Ok(())
}

/// Connects Postgres, applies the schema, and wires the HTTP providers.
pub async fn build_service(config: Config) -> Result<MemoryService> {
	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let embedding = HttpEmbedding::new(config.providers.embedding.clone())?;
	let llm = HttpLlm::new(config.providers.llm.clone())?;

	Ok(MemoryService::new(
		config,
		Arc::new(PgStore::new(db)),
		Arc::new(embedding),
		Arc::new(llm),
		Arc::new(SystemClock),
	))
}

/// `<host>-<pid>`, with `ember` standing in for an unknown host.
pub fn default_worker_id() -> String {
	let host = std::env::var("HOSTNAME")
		.ok()
		.map(|host| host.trim().to_string())
		.filter(|host| !host.is_empty())
		.unwrap_or_else(|| "ember".to_string());

	format!("{host}-{}", std::process::id())
}
