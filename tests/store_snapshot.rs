// std
use std::{env, fs, path::PathBuf, process};
// crates.io
use serde_json::json;
use time::{Duration, OffsetDateTime};
// self
use connect_proxy::{
	schedule::CachedSchedule,
	store::{FileStore, MemoryStore, ProxyStore},
	token::TokenRecord,
};

fn build_record(access: &str, refresh: &str) -> TokenRecord {
	TokenRecord::builder()
		.access_token(access)
		.refresh_token(refresh)
		.expires_in(Duration::hours(1))
		.build()
		.expect("Token record fixture should build successfully.")
}

#[tokio::test]
async fn token_round_trip_is_byte_identical() {
	let store = MemoryStore::default();
	let record = build_record("access-bytes", "refresh-bytes");

	store.save_tokens(record.clone()).await.expect("Saving the token record should succeed.");

	let fetched = store
		.fetch_tokens()
		.await
		.expect("Fetching the token record should succeed.")
		.expect("Token record should be present after save.");

	assert_eq!(fetched.access_token.expose(), "access-bytes");
	assert_eq!(fetched.refresh_token.expose(), "refresh-bytes");
	assert_eq!(fetched.access_token.expose(), record.access_token.expose());
	assert_eq!(fetched.refresh_token.expose(), record.refresh_token.expose());
}

#[tokio::test]
async fn empty_slots_read_as_none() {
	let store = MemoryStore::default();

	assert!(
		store
			.fetch_tokens()
			.await
			.expect("Fetching an empty token slot should succeed.")
			.is_none()
	);
	assert!(
		store
			.fetch_schedule()
			.await
			.expect("Fetching an empty schedule slot should succeed.")
			.is_none()
	);
}

#[tokio::test]
async fn token_slot_is_last_writer_wins() {
	let store = MemoryStore::default();

	store
		.save_tokens(build_record("first-access", "first-refresh"))
		.await
		.expect("Saving the first record should succeed.");
	store
		.save_tokens(build_record("second-access", "second-refresh"))
		.await
		.expect("Saving the replacement record should succeed.");

	let fetched = store
		.fetch_tokens()
		.await
		.expect("Fetching the token record should succeed.")
		.expect("Token record should be present after both saves.");

	// The replacement overwrites the whole record; nothing of the first survives.
	assert_eq!(fetched.access_token.expose(), "second-access");
	assert_eq!(fetched.refresh_token.expose(), "second-refresh");
}

#[tokio::test]
async fn schedule_slot_overwrites_whole_snapshot() {
	let store = MemoryStore::default();
	let first = CachedSchedule::new(json!({"classes": []}), OffsetDateTime::now_utc());
	let second = CachedSchedule::new(
		json!({"classes": [{"code": "CSE110"}]}),
		OffsetDateTime::now_utc(),
	);

	store.save_schedule(first.clone()).await.expect("Saving the first snapshot should succeed.");
	store
		.save_schedule(second.clone())
		.await
		.expect("Saving the replacement snapshot should succeed.");

	let fetched = store
		.fetch_schedule()
		.await
		.expect("Fetching the schedule snapshot should succeed.")
		.expect("Schedule snapshot should be present after both saves.");

	assert_eq!(fetched.payload, second.payload);
	assert_eq!(fetched.fingerprint, second.fingerprint);
	assert_ne!(fetched.fingerprint, first.fingerprint);
}

#[tokio::test]
async fn file_store_shares_state_across_clones() {
	let path = temp_path();
	let store = FileStore::open(&path).expect("Opening the file store should succeed.");
	let clone = store.clone();

	store
		.save_tokens(build_record("shared-access", "shared-refresh"))
		.await
		.expect("Saving through the original handle should succeed.");

	let fetched = clone
		.fetch_tokens()
		.await
		.expect("Fetching through the cloned handle should succeed.")
		.expect("Cloned handle should observe the saved record.");

	assert_eq!(fetched.access_token.expose(), "shared-access");

	fs::remove_file(&path).expect("Removing the temporary store file should succeed.");
}

fn temp_path() -> PathBuf {
	let unique = format!(
		"connect_proxy_store_it_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	);

	env::temp_dir().join(unique)
}
