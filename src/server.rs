//! Exposed HTTP surface: schedule retrieval plus gated token management.
//!
//! The surface is deliberately thin; every schedule decision lives in the flows and
//! the handlers only translate between HTTP and the proxy's error taxonomy.

mod handlers;

// std
use std::net::SocketAddr;
// crates.io
use axum::{Router, middleware, routing::get};
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
// self
use crate::{_prelude::*, config::GateConfig, flows::ReqwestProxy};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
	/// Proxy executing token and schedule flows.
	pub proxy: Arc<ReqwestProxy>,
	/// Password gate configuration for the management endpoints.
	pub gate: Arc<GateConfig>,
	/// Server start instant rendered on the status page.
	pub started_at: std::time::Instant,
}
impl AppState {
	/// Creates fresh state for the provided proxy + gate pair.
	pub fn new(proxy: ReqwestProxy, gate: GateConfig) -> Self {
		Self {
			proxy: Arc::new(proxy),
			gate: Arc::new(gate),
			started_at: std::time::Instant::now(),
		}
	}
}

/// Assembles the service router.
pub fn build_app(state: AppState, request_timeout: std::time::Duration) -> Router {
	let gated = Router::new()
		.route("/enter-tokens", get(handlers::enter_tokens_form).post(handlers::save_tokens))
		.route("/mytokens", get(handlers::view_tokens))
		.layer(middleware::from_fn_with_state(state.clone(), handlers::password_gate));

	Router::new()
		.route("/", get(handlers::index))
		.route("/raw-schedule", get(handlers::raw_schedule))
		.merge(gated)
		.layer(TimeoutLayer::new(request_timeout))
		.with_state(state)
}

/// Binds the listener and serves the app until SIGINT/SIGTERM.
pub async fn serve(app: Router, addr: SocketAddr) -> std::io::Result<()> {
	let listener = tokio::net::TcpListener::bind(addr).await?;

	axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if signal::ctrl_c().await.is_err() {
			// With no signal handler the server simply runs until killed.
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			},
			Err(_) => std::future::pending::<()>().await,
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
