//! Best-effort decoding of bearer-token JWT claims.
//!
//! Manually entered tokens carry no `expires_in` metadata, so the proxy inspects the
//! token payload for the registered `exp`/`iat` claims to recover an absolute expiry.
//! Opaque (non-JWT) tokens simply yield no claims and leave the expiry unknown.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// Subset of registered JWT claims the proxy inspects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BearerClaims {
	/// Expiry instant as a Unix timestamp.
	#[serde(default)]
	pub exp: Option<i64>,
	/// Issued-at instant as a Unix timestamp.
	#[serde(default)]
	pub iat: Option<i64>,
}
impl BearerClaims {
	/// Decodes the payload segment of a JWT-shaped bearer token.
	///
	/// The signature is not verified; only the portal consumes the token, the proxy
	/// merely reads lifetime metadata out of it.
	pub fn decode(token: &str) -> Option<Self> {
		let mut segments = token.split('.');
		let _header = segments.next()?;
		let payload = segments.next()?;
		let _signature = segments.next()?;
		let bytes = URL_SAFE_NO_PAD.decode(payload.as_bytes()).ok()?;

		serde_json::from_slice(&bytes).ok()
	}

	/// Converts the `exp` claim into an absolute instant, if present and in range.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.exp.and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
	}

	/// Converts the `iat` claim into an absolute instant, if present and in range.
	pub fn issued_at(&self) -> Option<OffsetDateTime> {
		self.iat.and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
	}
}
