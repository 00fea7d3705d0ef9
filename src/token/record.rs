//! Token record structs, explicit lifecycle status, and builders.

// self
use crate::{
	_prelude::*,
	token::{claims::BearerClaims, secret::TokenSecret},
};

/// Safety margin subtracted from the expiry instant before a token is considered usable,
/// so a request never races the portal's own expiry check.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(60);

/// Explicit lifecycle status of a stored token record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Access token is inside its validity window (safety margin applied).
	Valid,
	/// Access token reached or passed `expires_at - margin`.
	Expired,
	/// No expiry metadata is available; the record must be refreshed before use.
	Unknown,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no refresh token value was provided.
	#[error("Refresh token is required.")]
	MissingRefreshToken,
}

/// Whole-record token pair persisted as a single store slot.
///
/// Records are never partially updated: every successful refresh or manual entry
/// replaces the full record, and a failed refresh leaves the previous record in place.
#[derive(Serialize, Deserialize, Clone)]
pub struct TokenRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret used to mint replacement access tokens.
	pub refresh_token: TokenSecret,
	/// Instant the record was created or last replaced.
	#[serde(with = "time::serde::timestamp")]
	pub issued_at: OffsetDateTime,
	/// Absolute expiry of the access token, when known.
	#[serde(with = "time::serde::timestamp::option")]
	pub expires_at: Option<OffsetDateTime>,
}
impl TokenRecord {
	/// Returns a builder for constructing replacement records.
	pub fn builder() -> TokenRecordBuilder {
		TokenRecordBuilder::new()
	}

	/// Computes the lifecycle status at a given instant with the provided margin.
	pub fn status_at(&self, instant: OffsetDateTime, margin: Duration) -> TokenStatus {
		match self.expires_at {
			None => TokenStatus::Unknown,
			Some(expires_at) if instant < expires_at - margin => TokenStatus::Valid,
			Some(_) => TokenStatus::Expired,
		}
	}

	/// Convenience helper using the current UTC instant and the default margin.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc(), DEFAULT_SAFETY_MARGIN)
	}

	/// Returns `true` if the record can be used without a refresh at the provided instant.
	pub fn is_usable_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		matches!(self.status_at(instant, margin), TokenStatus::Valid)
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug)]
pub struct TokenRecordBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenRecordBuilder {
	fn new() -> Self {
		Self {
			access_token: None,
			refresh_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	///
	/// When no expiry was supplied, the builder falls back to the `exp` claim of a
	/// JWT-shaped access token; failing that, the record's expiry stays unknown and
	/// the first use will trigger a refresh.
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self.access_token.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let refresh_token =
			self.refresh_token.ok_or(TokenRecordBuilderError::MissingRefreshToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => Some(instant),
			(None, Some(delta)) => Some(issued_at + delta),
			(None, None) =>
				BearerClaims::decode(access_token.expose()).and_then(|claims| claims.expires_at()),
		};

		Ok(TokenRecord { access_token, refresh_token, issued_at, expires_at })
	}
}
