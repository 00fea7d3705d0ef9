//! Proxy-level error types shared across flows, transports, and stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical proxy error exposed by public APIs.
///
/// Everything below [`Error::NoDataAvailable`] is recovered by the schedule
/// orchestrator via the cache fallback; only the terminal variants reach callers.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Refresh-token exchange failure; the stored record is left untouched.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
	/// Live schedule call failure.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),

	/// No token record exists in the store.
	#[error("No token record is configured.")]
	NoTokenConfigured,
	/// Neither a live response nor a cached schedule is available.
	#[error("No live data and no cached schedule are available.")]
	NoDataAvailable,
}
impl Error {
	/// Stable machine-readable code rendered into HTTP error bodies.
	pub const fn code(&self) -> &'static str {
		match self {
			Self::Storage(_) => "STORE_UNAVAILABLE",
			Self::Config(_) => "CONFIG_ERROR",
			Self::Refresh(_) => "REFRESH_FAILED",
			Self::Upstream(_) => "UPSTREAM_UNAVAILABLE",
			Self::NoTokenConfigured => "NO_TOKEN_CONFIGURED",
			Self::NoDataAvailable => "NO_DATA_AVAILABLE",
		}
	}
}

/// Configuration and validation failures raised by the proxy.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Portal descriptor contains an invalid endpoint URL.
	#[error("Portal descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Portal descriptor validation failed.
	#[error(transparent)]
	Descriptor(#[from] crate::portal::PortalDescriptorError),
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::token::TokenRecordBuilderError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Refresh-token exchange failures; recovered by the orchestrator via fallback.
#[derive(Debug, ThisError)]
pub enum RefreshError {
	/// Token endpoint rejected the refresh token.
	#[error("Token endpoint rejected the refresh token: {reason}.")]
	Rejected {
		/// Portal-supplied reason string (OAuth error code plus description).
		reason: String,
	},
	/// Token endpoint returned an unexpected but well-formed response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint omitted `expires_in` or returned an unusable value.
	#[error("Token endpoint returned an unusable expires_in value.")]
	InvalidExpiry,
	/// Transport failure while calling the token endpoint.
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Live schedule call failures; recovered by the orchestrator via fallback.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Schedule endpoint rejected the bearer credential.
	#[error("Schedule endpoint rejected the bearer credential (HTTP {status}).")]
	AuthRejected {
		/// HTTP status code of the rejection.
		status: u16,
	},
	/// Schedule endpoint returned a non-success status.
	#[error("Schedule endpoint returned HTTP {status}.")]
	Endpoint {
		/// HTTP status code of the response.
		status: u16,
	},
	/// Schedule endpoint returned a body that is not valid JSON.
	#[error("Schedule endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Transport failure while calling the schedule endpoint.
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl UpstreamError {
	/// Returns `true` when the failure indicates an invalid or expired bearer credential.
	pub const fn is_auth_rejected(&self) -> bool {
		matches!(self, Self::AuthRejected { .. })
	}
}

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the portal.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The call exceeded the configured upstream timeout.
	#[error("Portal call exceeded the configured timeout.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the portal.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps an opaque transport failure description.
	pub fn opaque(message: impl Into<String>) -> Self {
		Self::Network { source: message.into().into() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}
