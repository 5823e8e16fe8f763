//! Service entry point.

// std
use std::{path::PathBuf, sync::Arc};
// crates.io
use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
// self
use idp_bridge::{
	config::Config,
	flows::Orchestrator,
	gateway::{self, BrokerGateway, GraphProvider, ProviderRegistry},
	http::{AppState, router},
	store::MemoryStore,
};

#[derive(Debug, Parser)]
#[command(about, version)]
struct Cli {
	/// Path to the TOML configuration file.
	#[arg(long, short, value_name = "PATH", default_value = "idp-bridge.toml")]
	config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
		.init();

	let cli = Cli::parse();
	let config = Config::load(&cli.config)?;
	let http_client = gateway::gateway_http_client()?;
	let broker = Arc::new(BrokerGateway::new(config.broker.admin_url.clone(), http_client.clone()));
	let providers = ProviderRegistry::new()
		.register(Arc::new(GraphProvider::new(config.provider.clone(), http_client)));
	let orchestrator = Orchestrator::new(broker, providers, Arc::new(MemoryStore::new()));
	let app = router(AppState { orchestrator, secure_cookies: config.http.secure_cookies })
		.layer(TraceLayer::new_for_http());
	let listener = TcpListener::bind(&config.http.listen).await?;

	info!(listen = %config.http.listen, "Bridge service is ready.");

	axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

	Ok(())
}

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %err, "Failed to install the shutdown signal handler.");
	}
}
