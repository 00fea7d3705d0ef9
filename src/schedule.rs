//! Cached schedule snapshots and tagged fetch results.

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Single-slot cached schedule payload shared by all requesters.
///
/// At most one snapshot exists globally; every successful live fetch overwrites it
/// (last-writer-wins) and it is never deleted, only replaced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedSchedule {
	/// Opaque schedule document exactly as returned by the portal.
	pub payload: JsonValue,
	/// Instant of the last successful live fetch.
	#[serde(with = "time::serde::timestamp")]
	pub cached_at: OffsetDateTime,
	/// SHA-256 hex digest of the serialized payload.
	pub fingerprint: String,
}
impl CachedSchedule {
	/// Wraps a freshly fetched payload, stamping the digest and capture instant.
	pub fn new(payload: JsonValue, cached_at: OffsetDateTime) -> Self {
		let fingerprint = fingerprint(&payload);

		Self { payload, cached_at, fingerprint }
	}
}

/// Origin of a served schedule document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleSource {
	/// Fresh response from the portal schedule endpoint.
	Live,
	/// Previously cached snapshot served because the live path was unavailable.
	Cache,
}
impl ScheduleSource {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ScheduleSource::Live => "live",
			ScheduleSource::Cache => "cache",
		}
	}
}
impl Display for ScheduleSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Tagged result returned to schedule callers.
///
/// Callers always learn where the data came from; stale cache responses carry their
/// capture instant so consumers can judge freshness.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScheduleResult {
	/// Whether the payload came from a live call or the fallback cache.
	pub source: ScheduleSource,
	/// Opaque schedule document.
	pub payload: JsonValue,
	/// Capture instant of the cached payload; absent for live responses.
	#[serde(skip_serializing_if = "Option::is_none", with = "time::serde::timestamp::option")]
	pub cached_at: Option<OffsetDateTime>,
}
impl ScheduleResult {
	/// Tags a fresh portal response.
	pub fn live(payload: JsonValue) -> Self {
		Self { source: ScheduleSource::Live, payload, cached_at: None }
	}

	/// Tags a snapshot served from the fallback cache.
	pub fn cached(snapshot: CachedSchedule) -> Self {
		Self {
			source: ScheduleSource::Cache,
			payload: snapshot.payload,
			cached_at: Some(snapshot.cached_at),
		}
	}
}

/// Computes the SHA-256 hex digest of a JSON payload's canonical serialization.
pub fn fingerprint(payload: &JsonValue) -> String {
	use std::fmt::Write;

	let digest = Sha256::digest(payload.to_string().as_bytes());

	digest.iter().fold(String::with_capacity(64), |mut out, byte| {
		let _ = write!(out, "{byte:02x}");

		out
	})
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	use time::macros;
	// self
	use super::*;

	#[test]
	fn fingerprint_tracks_payload_changes() {
		let first = fingerprint(&json!({"classes": []}));
		let second = fingerprint(&json!({"classes": [{"code": "CSE110"}]}));

		assert_eq!(first.len(), 64);
		assert_ne!(first, second);
		assert_eq!(first, fingerprint(&json!({"classes": []})));
	}

	#[test]
	fn source_tags_serialize_lowercase() {
		let live = serde_json::to_string(&ScheduleSource::Live)
			.expect("Schedule source should serialize to JSON.");

		assert_eq!(live, "\"live\"");

		let cache: ScheduleSource = serde_json::from_str("\"cache\"")
			.expect("Schedule source should deserialize from JSON.");

		assert_eq!(cache, ScheduleSource::Cache);
	}

	#[test]
	fn live_results_omit_cached_at() {
		let result = ScheduleResult::live(json!({"classes": []}));
		let rendered =
			serde_json::to_string(&result).expect("Live result should serialize to JSON.");

		assert!(rendered.contains("\"source\":\"live\""));
		assert!(!rendered.contains("cached_at"));
	}

	#[test]
	fn cached_results_carry_capture_instant() {
		let cached_at = macros::datetime!(2025-01-01 08:00 UTC);
		let snapshot = CachedSchedule::new(json!({"classes": []}), cached_at);
		let result = ScheduleResult::cached(snapshot.clone());

		assert_eq!(result.source, ScheduleSource::Cache);
		assert_eq!(result.payload, snapshot.payload);
		assert_eq!(result.cached_at, Some(cached_at));
	}
}
