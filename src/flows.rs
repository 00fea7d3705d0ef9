//! High-level token and schedule flows for the proxy.

pub mod refresh;
pub mod schedule;

pub use refresh::*;
pub use schedule::*;

// self
use crate::{
	_prelude::*,
	http::PortalHttpClient,
	oauth::TransportErrorMapper,
	portal::PortalDescriptor,
	store::ProxyStore,
	token::DEFAULT_SAFETY_MARGIN,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Proxy specialized for the crate's default reqwest transport stack.
pub type ReqwestProxy = Proxy<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Coordinates the token lifecycle and schedule retrieval against one portal.
///
/// The proxy owns the HTTP transport, the snapshot store, and the descriptor so the
/// refresh and schedule flows can focus on their guarded transitions. One singleflight
/// guard coalesces concurrent in-process refreshes; cross-process races stay
/// last-writer-wins on the store, which is the accepted concurrency model for the two
/// single-slot records.
#[derive(Clone)]
pub struct Proxy<C, M>
where
	C: ?Sized + PortalHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound portal request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Snapshot store holding the token and schedule slots.
	pub store: Arc<dyn ProxyStore>,
	/// Portal descriptor defining endpoints and client identity.
	pub descriptor: PortalDescriptor,
	/// Safety margin applied before `expires_at` when judging token validity.
	pub safety_margin: Duration,
	/// Shared metrics recorder for refresh flow outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	refresh_guard: Arc<AsyncMutex<()>>,
}
impl<C, M> Proxy<C, M>
where
	C: ?Sized + PortalHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a proxy that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn ProxyStore>,
		descriptor: PortalDescriptor,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			descriptor,
			safety_margin: DEFAULT_SAFETY_MARGIN,
			refresh_metrics: Default::default(),
			refresh_guard: Default::default(),
		}
	}

	/// Overrides the validity safety margin (defaults to 60 seconds).
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	pub(crate) fn refresh_guard(&self) -> Arc<AsyncMutex<()>> {
		self.refresh_guard.clone()
	}
}
#[cfg(feature = "reqwest")]
impl Proxy<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a new proxy for the provided descriptor with the default reqwest
	/// transport (bounded timeout, no redirects).
	pub fn new(store: Arc<dyn ProxyStore>, descriptor: PortalDescriptor) -> Self {
		Self::with_http_client(
			store,
			descriptor,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for Proxy<C, M>
where
	C: ?Sized + PortalHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Proxy")
			.field("descriptor", &self.descriptor)
			.field("safety_margin", &self.safety_margin)
			.finish()
	}
}
