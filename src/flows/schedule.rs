//! Schedule retrieval with an explicit live-then-cache fallback chain.
//!
//! [`Proxy::get_schedule`] resolves a bearer credential, attempts one live portal call
//! (with at most one refresh-and-retry cycle after an auth rejection), and degrades to
//! the cached snapshot. Strategies run in a fixed order and each reports a tagged
//! outcome, so the chain never hides why the live path was unavailable.

// self
use crate::{
	_prelude::*,
	flows::{Proxy, ResolvedToken},
	http::PortalHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	schedule::{CachedSchedule, ScheduleResult},
	token::TokenSecret,
	upstream,
};

/// Ordered fallback strategies evaluated by [`Proxy::get_schedule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FetchStrategy {
	Live,
	Cache,
}
impl FetchStrategy {
	const CHAIN: [Self; 2] = [Self::Live, Self::Cache];

	const fn as_str(self) -> &'static str {
		match self {
			Self::Live => "live",
			Self::Cache => "cache",
		}
	}
}

/// Tagged outcome reported by each strategy.
enum StrategyOutcome {
	/// The strategy produced a response to serve.
	Served(ScheduleResult),
	/// The strategy cannot run for this request; the reason is logged, not surfaced.
	Skipped(Error),
	/// The strategy ran and failed.
	Failed(Error),
}

impl<C, M> Proxy<C, M>
where
	C: ?Sized + PortalHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Fetches the schedule, preferring a live portal call and degrading to the cache.
	///
	/// Callers always receive fresh data, stale-but-tagged cached data, or a terminal
	/// error: [`Error::NoDataAvailable`] when neither slot can serve, or
	/// [`Error::Storage`] when the fallback read itself fails.
	pub async fn get_schedule(
		&self,
		explicit_access_token: Option<&str>,
	) -> Result<ScheduleResult> {
		const KIND: FlowKind = FlowKind::Schedule;

		let span = FlowSpan::new(KIND, "get_schedule");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				// The terminal error always reflects the LAST strategy's outcome; an
				// earlier live failure never masks an empty cache.
				let mut terminal = None;

				for strategy in FetchStrategy::CHAIN {
					let outcome = match strategy {
						FetchStrategy::Live => self.try_live(explicit_access_token).await,
						FetchStrategy::Cache => self.try_cache().await,
					};

					match outcome {
						StrategyOutcome::Served(result) => {
							obs::flow_event(&format!(
								"Schedule served from the {} strategy.",
								strategy.as_str(),
							));

							return Ok(result);
						},
						StrategyOutcome::Skipped(reason) => {
							obs::flow_event(&format!(
								"Schedule {} strategy skipped: {reason}",
								strategy.as_str(),
							));

							terminal = None;
						},
						StrategyOutcome::Failed(err) => {
							obs::flow_warning(&format!(
								"Schedule {} strategy failed: {err}",
								strategy.as_str(),
							));

							terminal = Some(err);
						},
					}
				}

				Err(terminal.unwrap_or(Error::NoDataAvailable))
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn try_live(&self, explicit: Option<&str>) -> StrategyOutcome {
		let resolved = match self.ensure_valid_token(explicit).await {
			Ok(resolved) => resolved,
			// No usable credential; the live path is simply unavailable.
			Err(err) => return StrategyOutcome::Skipped(err),
		};
		let bearer = resolved.secret().clone();

		match self.live_fetch(&bearer).await {
			Ok(result) => StrategyOutcome::Served(result),
			Err(err) if is_auth_rejection(&err) && !resolved.already_refreshed() => {
				// One refresh-and-retry cycle; a second rejection falls through to
				// the cache strategy.
				let retried = match self.refresh_rejected_token(&bearer).await {
					Ok(resolved) => resolved,
					Err(refresh_err) => return StrategyOutcome::Failed(refresh_err),
				};

				match self.live_fetch(retried.secret()).await {
					Ok(result) => StrategyOutcome::Served(result),
					Err(retry_err) => StrategyOutcome::Failed(retry_err),
				}
			},
			Err(err) => StrategyOutcome::Failed(err),
		}
	}

	async fn try_cache(&self) -> StrategyOutcome {
		match self.store.fetch_schedule().await {
			Ok(Some(snapshot)) => StrategyOutcome::Served(ScheduleResult::cached(snapshot)),
			Ok(None) => StrategyOutcome::Skipped(Error::NoDataAvailable),
			Err(err) => StrategyOutcome::Failed(err.into()),
		}
	}

	async fn live_fetch(&self, bearer: &TokenSecret) -> Result<ScheduleResult> {
		let payload = upstream::fetch_schedule(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			&self.descriptor.endpoints.schedule,
			bearer,
		)
		.await?;
		let snapshot = CachedSchedule::new(payload.clone(), OffsetDateTime::now_utc());

		// A failed cache write must not invalidate a successful live response.
		if let Err(err) = self.store.save_schedule(snapshot).await {
			obs::flow_warning(&format!("Failed to cache the live schedule payload: {err}"));
		}

		Ok(ScheduleResult::live(payload))
	}
}

fn is_auth_rejection(err: &Error) -> bool {
	matches!(err, Error::Upstream(upstream_err) if upstream_err.is_auth_rejected())
}
