//! Storage contracts and built-in snapshot stores for the proxy's single-slot records.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, schedule::CachedSchedule, token::TokenRecord};

/// Boxed future returned by [`ProxyStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for the token record and schedule cache slots.
///
/// Both slots are global singletons with last-writer-wins overwrite semantics. The
/// backend must apply each `save_*` call as one atomic whole-record replacement so a
/// crash mid-write can never leave a mixed-version record. Nothing outside the store
/// adapters touches the backend directly.
pub trait ProxyStore
where
	Self: Send + Sync,
{
	/// Replaces the token record slot.
	fn save_tokens(&self, record: TokenRecord) -> StoreFuture<'_, ()>;

	/// Fetches the token record slot, if populated.
	fn fetch_tokens(&self) -> StoreFuture<'_, Option<TokenRecord>>;

	/// Replaces the schedule cache slot.
	fn save_schedule(&self, snapshot: CachedSchedule) -> StoreFuture<'_, ()>;

	/// Fetches the schedule cache slot, if populated.
	fn fetch_schedule(&self) -> StoreFuture<'_, Option<CachedSchedule>>;
}

/// Error type produced by [`ProxyStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Serialized layout holding the two named singleton slots.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
	/// Token record slot.
	#[serde(default)]
	pub tokens: Option<TokenRecord>,
	/// Schedule cache slot.
	#[serde(default)]
	pub schedule: Option<CachedSchedule>,
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_proxy_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let proxy_error: Error = store_error.clone().into();

		assert!(matches!(proxy_error, Error::Storage(_)));
		assert!(proxy_error.to_string().contains("database unreachable"));

		let source = StdError::source(&proxy_error)
			.expect("Proxy error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn snapshot_defaults_to_empty_slots() {
		let snapshot: StoreSnapshot =
			serde_json::from_str("{}").expect("Empty snapshot should deserialize.");

		assert!(snapshot.tokens.is_none());
		assert!(snapshot.schedule.is_none());
	}
}
