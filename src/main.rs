//! Server binary wiring configuration, the snapshot store, and the HTTP surface.

// std
use std::{process::ExitCode, sync::Arc};
// crates.io
use clap::Parser;
use tracing_subscriber::EnvFilter;
// self
use connect_proxy::{
	config::Config,
	flows::ReqwestProxy,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	server::{self, AppState},
	store::{FileStore, ProxyStore},
};

/// Bearer-token schedule proxy for the Connect portal.
#[derive(Debug, Parser)]
#[command(about, version)]
struct Args {
	/// Path to the configuration file.
	#[arg(short, long, default_value = "connect-proxy.toml")]
	config: String,

	/// Port to listen on (overrides the configuration file).
	#[arg(short, long)]
	port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
	match run().await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("Error: {e}");

			ExitCode::FAILURE
		},
	}
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

	let args = Args::parse();
	let mut config = Config::load(&args.config)?;

	if let Some(port) = args.port {
		config.server.port = port;
	}
	if config.gate.password.is_none() {
		tracing::warn!("No gate password configured; token management endpoints are disabled.");
	}

	let descriptor = config.portal.descriptor()?;
	let store: Arc<dyn ProxyStore> = Arc::new(FileStore::open(&config.store.path)?);
	let http_client = ReqwestHttpClient::with_timeout(config.upstream.timeout())?;
	let proxy = ReqwestProxy::with_http_client(
		store,
		descriptor,
		http_client,
		Arc::new(ReqwestTransportErrorMapper),
	)
	.with_safety_margin(config.upstream.safety_margin());
	let state = AppState::new(proxy, config.gate.clone());
	let app = server::build_app(state, config.server.request_timeout());
	let addr = config.server.bind_addr()?;

	tracing::info!(%addr, "Starting connect-proxy");
	server::serve(app, addr).await?;
	tracing::info!("Server stopped");

	Ok(())
}
