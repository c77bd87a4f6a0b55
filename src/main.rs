mod config;
mod garmin;
mod ingest;
mod sync;
#[cfg(test)]
mod test_support;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Settings;
use crate::garmin::GarminConnectClient;
use crate::ingest::IngestClient;
use crate::sync::SyncOrchestrator;
use crate::sync::state_persistence::StatePersistenceService;

/// Export new Garmin Connect GPS trackpoints to the ingestion endpoint.
#[derive(Debug, Parser)]
#[command(name = "garmin-trackpoint-sync", version)]
struct Cli {
	/// Path to a TOML config file (defaults to ./gps-sync.toml when present).
	#[arg(short, long, env = "GPS_SYNC_CONFIG")]
	config: Option<PathBuf>,

	/// Directory holding sync_state.json and failed_activities.txt.
	#[arg(long)]
	state_dir: Option<PathBuf>,

	/// Log debug output for this crate.
	#[arg(short, long)]
	verbose: bool,
}

fn init_tracing(verbose: bool) {
	let mut filter = tracing_subscriber::EnvFilter::from_default_env()
		.add_directive(tracing::Level::INFO.into());
	if verbose {
		if let Ok(directive) = "garmin_trackpoint_sync=debug".parse() {
			filter = filter.add_directive(directive);
		}
	}

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let cli = Cli::parse();
	init_tracing(cli.verbose);

	info!("Starting trackpoint sync service");

	let mut settings = match Settings::load(cli.config.as_deref()) {
		Ok(settings) => settings,
		Err(e) => {
			error!("{}", e);
			return ExitCode::FAILURE;
		}
	};
	if let Some(dir) = cli.state_dir {
		settings.state.dir = dir;
	}

	let source = match GarminConnectClient::new(
		&settings.garmin.domain,
		settings.garmin.access_token.clone(),
		settings.request_timeout(),
	) {
		Ok(client) => client,
		Err(e) => {
			error!("Failed to create Garmin Connect client: {}", e);
			return ExitCode::FAILURE;
		}
	};

	let uploader = match IngestClient::new(
		&settings.ingest.base_url,
		settings.ingest.api_key.clone(),
		settings.request_timeout(),
	) {
		Ok(client) => client,
		Err(e) => {
			error!("Failed to create ingestion client: {}", e);
			return ExitCode::FAILURE;
		}
	};

	info!(
		"Syncing from connectapi.{} to {} (state in {:?})",
		settings.garmin.domain, settings.ingest.base_url, settings.state.dir
	);

	let orchestrator = SyncOrchestrator::new(
		Arc::new(source),
		Arc::new(uploader),
		StatePersistenceService::new(settings.state.dir.clone()),
		settings.orchestrator_config(),
	);

	match orchestrator.sync().await {
		Ok(report) if report.failed_downloads.is_empty() => ExitCode::SUCCESS,
		Ok(report) => {
			info!(
				"Run finished with {} failed downloads, see failed_activities.txt",
				report.failed_downloads.len()
			);
			ExitCode::SUCCESS
		}
		Err(e) => {
			error!("Sync aborted: {}", e);
			ExitCode::FAILURE
		}
	}
}
