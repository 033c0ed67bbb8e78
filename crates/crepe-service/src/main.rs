//! Main entry point for the crepe shop service.
//!
//! Loads the shop configuration, builds the engine from the configured
//! storage, remote store and notification implementations, and runs the
//! engine (and optionally the HTTP API) until interrupted.

use clap::Parser;
use crepe_config::Config;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the crepe shop service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/shop.toml", env = "CREPE_SHOP_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started crepe shop");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!(shop_id = %config.shop.id, "Loaded configuration");

	let engine = Arc::new(factory_registry::build_shop_from_config(config.clone())?);
	engine.initialize().await?;

	match config.api.as_ref().filter(|api| api.enabled) {
		Some(api_config) => {
			let engine_task = engine.run();
			let api_task = server::start_server(api_config.clone(), Arc::clone(&engine));

			tokio::select! {
				result = engine_task => {
					tracing::info!("Engine finished");
					result?;
				}
				result = api_task => {
					tracing::info!("API server finished");
					result?;
				}
			}
		}
		None => {
			tracing::info!("Starting engine only");
			engine.run().await?;
		}
	}

	engine.shutdown().await?;
	tracing::info!("Stopped crepe shop");
	Ok(())
}
