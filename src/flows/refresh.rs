//! Token resolution and refresh orchestration with a singleflight guard.
//!
//! [`Proxy::ensure_valid_token`] decides, per request, whether the stored access token
//! is usable, exchanges the refresh token for a new pair when it is not, and persists
//! the result as one whole-record overwrite. A failed exchange leaves the stale record
//! in the store so an operator can inspect or re-enter it.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	flows::Proxy,
	http::PortalHttpClient,
	oauth::{RefreshFacade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	token::{TokenRecord, TokenSecret, TokenStatus},
};

/// How an access token was obtained for the current request.
#[derive(Clone, Debug)]
pub enum ResolvedToken {
	/// Caller-supplied bearer used verbatim; never validated against the store.
	Explicit(TokenSecret),
	/// Stored access token still inside its validity window.
	Stored(TokenSecret),
	/// Token minted by a refresh exchange performed during this resolution.
	Refreshed(TokenSecret),
}
impl ResolvedToken {
	/// Returns the bearer secret regardless of provenance.
	pub fn secret(&self) -> &TokenSecret {
		match self {
			Self::Explicit(secret) | Self::Stored(secret) | Self::Refreshed(secret) => secret,
		}
	}

	/// Returns `true` when this resolution already spent the request's single refresh
	/// attempt.
	pub fn already_refreshed(&self) -> bool {
		matches!(self, Self::Refreshed(_))
	}
}

impl<C, M> Proxy<C, M>
where
	C: ?Sized + PortalHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Resolves a usable access token for the current request.
	///
	/// An explicit token bypasses the store entirely; validating it is the caller's
	/// responsibility. Otherwise the stored record is consulted: `Valid` records are
	/// returned unchanged, while `Expired` and `Unknown` records trigger exactly one
	/// refresh exchange whose result replaces the stored record in full.
	pub async fn ensure_valid_token(&self, explicit: Option<&str>) -> Result<ResolvedToken> {
		if let Some(token) = explicit {
			return Ok(ResolvedToken::Explicit(TokenSecret::new(token)));
		}

		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "ensure_valid_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(async move { self.resolve_stored_token().await }).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn resolve_stored_token(&self) -> Result<ResolvedToken> {
		let guard = self.refresh_guard();
		let _singleflight = guard.lock().await;
		let now = OffsetDateTime::now_utc();
		let current = self.store.fetch_tokens().await?.ok_or(Error::NoTokenConfigured)?;

		match current.status_at(now, self.safety_margin) {
			TokenStatus::Valid => {
				self.refresh_metrics.record_reused();

				Ok(ResolvedToken::Stored(current.access_token))
			},
			TokenStatus::Expired | TokenStatus::Unknown => self.refresh_locked(current).await,
		}
	}

	/// Forces one refresh exchange against the stored refresh token.
	///
	/// Used by the schedule flow after the portal rejects a credential that this
	/// request has not refreshed yet. When a concurrent request already rotated the
	/// rejected credential, the fresh record is reused instead of refreshing again.
	pub(crate) async fn refresh_rejected_token(
		&self,
		rejected: &TokenSecret,
	) -> Result<ResolvedToken> {
		let guard = self.refresh_guard();
		let _singleflight = guard.lock().await;
		let now = OffsetDateTime::now_utc();
		let current = self.store.fetch_tokens().await?.ok_or(Error::NoTokenConfigured)?;

		if current.access_token != *rejected && current.is_usable_at(now, self.safety_margin) {
			self.refresh_metrics.record_reused();

			return Ok(ResolvedToken::Refreshed(current.access_token));
		}

		self.refresh_locked(current).await
	}

	async fn refresh_locked(&self, current: TokenRecord) -> Result<ResolvedToken> {
		self.refresh_metrics.record_attempt();

		let facade = <RefreshFacade<C, M>>::from_descriptor(
			&self.descriptor,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)
		.inspect_err(|_| self.refresh_metrics.record_failure())?;
		// A failed exchange must not disturb the stored record.
		let replacement = match facade.refresh_token(current.refresh_token.expose()).await {
			Ok(record) => record,
			Err(err) => {
				self.refresh_metrics.record_failure();

				return Err(err);
			},
		};

		self.store.save_tokens(replacement.clone()).await.map_err(|err| {
			self.refresh_metrics.record_failure();

			Error::from(err)
		})?;
		self.refresh_metrics.record_success();

		Ok(ResolvedToken::Refreshed(replacement.access_token))
	}
}
