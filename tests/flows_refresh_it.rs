#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use connect_proxy::{
	error::{Error, RefreshError},
	flows::{Proxy, ReqwestProxy, ResolvedToken},
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	portal::PortalDescriptor,
	store::{MemoryStore, ProxyStore},
	token::TokenRecord,
};

fn build_descriptor(server: &MockServer) -> PortalDescriptor {
	PortalDescriptor::builder("slm")
		.token_endpoint(
			Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."),
		)
		.schedule_endpoint(
			Url::parse(&server.url("/schedule")).expect("Mock schedule endpoint should parse."),
		)
		.build()
		.expect("Portal descriptor should build successfully.")
}

fn build_proxy(server: &MockServer) -> (ReqwestProxy, Arc<MemoryStore>) {
	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn ProxyStore> = store_backend.clone();
	let proxy = Proxy::with_http_client(
		store,
		build_descriptor(server),
		ReqwestHttpClient::default(),
		Arc::new(ReqwestTransportErrorMapper),
	);

	(proxy, store_backend)
}

async fn seed_record(store: &MemoryStore, access: &str, refresh: &str, expires_in: Duration) {
	let issued = OffsetDateTime::now_utc() - Duration::minutes(5);
	let record = TokenRecord::builder()
		.access_token(access)
		.refresh_token(refresh)
		.issued_at(issued)
		.expires_at(issued + expires_in)
		.build()
		.expect("Token record fixture should build successfully.");

	store.save_tokens(record).await.expect("Failed to seed token record into the store.");
}

async fn seed_record_without_expiry(store: &MemoryStore, access: &str, refresh: &str) {
	let record = TokenRecord::builder()
		.access_token(access)
		.refresh_token(refresh)
		.build()
		.expect("Token record fixture should build successfully.");

	store.save_tokens(record).await.expect("Failed to seed token record into the store.");
}

#[tokio::test]
async fn valid_token_short_circuits_refresh() {
	let server = MockServer::start_async().await;
	let (proxy, store) = build_proxy(&server);

	seed_record(&store, "still-valid", "unused-refresh", Duration::hours(2)).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"never-used\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let resolved = proxy
		.ensure_valid_token(None)
		.await
		.expect("A valid stored token should resolve without refreshing.");

	assert!(matches!(resolved, ResolvedToken::Stored(_)));
	assert_eq!(resolved.secret().expose(), "still-valid");
	assert_eq!(proxy.refresh_metrics.attempts(), 0);
	assert_eq!(proxy.refresh_metrics.reuses(), 1);

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn expired_token_refreshes_once_and_persists_whole_record() {
	let server = MockServer::start_async().await;
	let (proxy, store) = build_proxy(&server);

	seed_record(&store, "expired-access", "old-refresh", Duration::seconds(30)).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"A2\",\"refresh_token\":\"R2\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let resolved = proxy
		.ensure_valid_token(None)
		.await
		.expect("An expired stored token should refresh successfully.");

	mock.assert_async().await;

	assert!(resolved.already_refreshed());
	assert_eq!(resolved.secret().expose(), "A2");

	let stored = store
		.fetch_tokens()
		.await
		.expect("Token store fetch should succeed.")
		.expect("Record should remain present after refresh.");

	assert_eq!(stored.access_token.expose(), "A2");
	assert_eq!(stored.refresh_token.expose(), "R2");

	let expires_at =
		stored.expires_at.expect("Refreshed record should carry a computed expiry.");
	let remaining = expires_at - OffsetDateTime::now_utc();

	assert!(remaining > Duration::minutes(55));
	assert!(remaining <= Duration::hours(1));
}

#[tokio::test]
async fn unknown_expiry_triggers_refresh() {
	let server = MockServer::start_async().await;
	let (proxy, store) = build_proxy(&server);

	seed_record_without_expiry(&store, "opaque-access", "opaque-refresh").await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"minted\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let resolved = proxy
		.ensure_valid_token(None)
		.await
		.expect("A record with unknown expiry should refresh eagerly.");

	mock.assert_async().await;

	assert_eq!(resolved.secret().expose(), "minted");
}

#[tokio::test]
async fn refresh_without_rotation_carries_refresh_token_forward() {
	let server = MockServer::start_async().await;
	let (proxy, store) = build_proxy(&server);

	seed_record(&store, "expired-access", "sticky-refresh", Duration::seconds(10)).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"fresh-access\",\"token_type\":\"bearer\",\"expires_in\":1800}",
			);
		})
		.await;
	proxy.ensure_valid_token(None).await.expect("Refresh without rotation should succeed.");

	let stored = store
		.fetch_tokens()
		.await
		.expect("Token store fetch should succeed.")
		.expect("Record should remain present after refresh.");

	assert_eq!(stored.access_token.expose(), "fresh-access");
	assert_eq!(stored.refresh_token.expose(), "sticky-refresh");
}

#[tokio::test]
async fn refresh_failure_leaves_stored_record_unchanged() {
	let server = MockServer::start_async().await;
	let (proxy, store) = build_proxy(&server);

	seed_record(&store, "stale-access", "rejected-refresh", Duration::seconds(10)).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"Session not active\"}");
		})
		.await;
	let err = proxy
		.ensure_valid_token(None)
		.await
		.expect_err("A rejected refresh token should surface a refresh failure.");

	mock.assert_async().await;

	assert!(matches!(err, Error::Refresh(RefreshError::Rejected { .. })));
	assert!(err.to_string().contains("Session not active"));

	// The stale record stays available for manual inspection or re-entry.
	let stored = store
		.fetch_tokens()
		.await
		.expect("Token store fetch should succeed.")
		.expect("Record should remain present after a failed refresh.");

	assert_eq!(stored.access_token.expose(), "stale-access");
	assert_eq!(stored.refresh_token.expose(), "rejected-refresh");
	assert_eq!(proxy.refresh_metrics.failures(), 1);
}

#[tokio::test]
async fn no_stored_record_fails_with_no_token_configured() {
	let server = MockServer::start_async().await;
	let (proxy, _store) = build_proxy(&server);
	let err = proxy
		.ensure_valid_token(None)
		.await
		.expect_err("An empty token slot should fail resolution.");

	assert!(matches!(err, Error::NoTokenConfigured));
}

#[tokio::test]
async fn explicit_token_bypasses_store_and_refresh() {
	let server = MockServer::start_async().await;
	let (proxy, _store) = build_proxy(&server);
	let resolved = proxy
		.ensure_valid_token(Some("caller-supplied"))
		.await
		.expect("An explicit token should resolve without any store access.");

	assert!(matches!(resolved, ResolvedToken::Explicit(_)));
	assert_eq!(resolved.secret().expose(), "caller-supplied");
	assert!(!resolved.already_refreshed());
}

#[tokio::test]
async fn concurrent_resolutions_refresh_once() {
	let server = MockServer::start_async().await;
	let (proxy, store) = build_proxy(&server);

	seed_record(&store, "soon-expiring", "shared-refresh", Duration::seconds(5)).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"coalesced\",\"refresh_token\":\"coalesced-refresh\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let (first, second) =
		tokio::join!(proxy.ensure_valid_token(None), proxy.ensure_valid_token(None));
	let first = first.expect("First concurrent resolution should succeed.");
	let second = second.expect("Second concurrent resolution should succeed.");

	assert_eq!(first.secret().expose(), "coalesced");
	assert_eq!(second.secret().expose(), "coalesced");

	mock.assert_calls_async(1).await;
}
