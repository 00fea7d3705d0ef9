// crates.io
use axum::{
	Form, Json,
	extract::{Query, Request, State},
	http::StatusCode,
	middleware::Next,
	response::{Html, IntoResponse, Response},
};
// self
use crate::{_prelude::*, server::AppState, token::TokenRecord};

/// Structured error body answered by every failing endpoint.
#[derive(Debug, Serialize)]
struct ErrorBody {
	success: bool,
	error: String,
	error_code: String,
	#[serde(with = "time::serde::timestamp")]
	timestamp: OffsetDateTime,
}

fn error_response(status: StatusCode, error: impl Into<String>, code: &str) -> Response {
	let body = ErrorBody {
		success: false,
		error: error.into(),
		error_code: code.into(),
		timestamp: OffsetDateTime::now_utc(),
	};

	(status, Json(body)).into_response()
}

#[derive(Debug, Deserialize)]
pub(super) struct GateQuery {
	password: Option<String>,
}

/// Rejects management requests whose `password` query parameter does not match the
/// configured gate secret.
pub(super) async fn password_gate(
	State(state): State<AppState>,
	Query(query): Query<GateQuery>,
	request: Request,
	next: Next,
) -> Response {
	if !state.gate.permits(query.password.as_deref()) {
		crate::obs::flow_warning("Rejected a management request without a valid gate password.");

		return error_response(
			StatusCode::UNAUTHORIZED,
			"Authentication failed",
			"PASSWORD_REQUIRED",
		);
	}

	next.run(request).await
}

pub(super) async fn index(State(state): State<AppState>) -> Html<String> {
	let uptime = state.started_at.elapsed().as_secs();
	let (hours, remainder) = (uptime / 3600, uptime % 3600);
	let (minutes, seconds) = (remainder / 60, remainder % 60);

	Html(format!(
		r#"<!doctype html>
<html>
	<head><title>Connect Schedule Proxy</title></head>
	<body>
		<h1>Connect Schedule Proxy</h1>
		<p>The proxy is running.</p>
		<ul>
			<li><a href="/raw-schedule">View schedule</a></li>
			<li><a href="/enter-tokens">Enter tokens</a></li>
			<li><a href="/mytokens">View stored tokens</a></li>
		</ul>
		<p>Uptime: {hours}h {minutes}m {seconds}s</p>
	</body>
</html>
"#
	))
}

#[derive(Debug, Deserialize)]
pub(super) struct RawScheduleQuery {
	access_token: Option<String>,
}

pub(super) async fn raw_schedule(
	State(state): State<AppState>,
	Query(query): Query<RawScheduleQuery>,
) -> Response {
	match state.proxy.get_schedule(query.access_token.as_deref()).await {
		Ok(result) => (StatusCode::OK, Json(result)).into_response(),
		Err(err @ Error::NoDataAvailable) =>
			error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string(), err.code()),
		Err(err) =>
			error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), err.code()),
	}
}

pub(super) async fn enter_tokens_form() -> Html<&'static str> {
	Html(
		r#"<!doctype html>
<html>
	<head><title>Enter Tokens</title></head>
	<body>
		<h2>Manually enter your tokens</h2>
		<form method="post">
			<label>Access token:</label><br>
			<textarea name="access_token" rows="4" cols="80" required></textarea><br>
			<label>Refresh token:</label><br>
			<textarea name="refresh_token" rows="4" cols="80" required></textarea><br>
			<button type="submit">Save tokens</button>
		</form>
	</body>
</html>
"#,
	)
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenEntry {
	access_token: String,
	refresh_token: String,
}

pub(super) async fn save_tokens(
	State(state): State<AppState>,
	Form(entry): Form<TokenEntry>,
) -> Response {
	// Expiry metadata comes from the access token's own claims when it is JWT-shaped;
	// otherwise the first schedule request refreshes eagerly.
	let record = match TokenRecord::builder()
		.access_token(entry.access_token)
		.refresh_token(entry.refresh_token)
		.build()
	{
		Ok(record) => record,
		Err(err) =>
			return error_response(
				StatusCode::UNPROCESSABLE_ENTITY,
				err.to_string(),
				"INVALID_TOKEN_ENTRY",
			),
	};

	if let Err(err) = state.proxy.store.save_tokens(record).await {
		return error_response(
			StatusCode::INTERNAL_SERVER_ERROR,
			err.to_string(),
			Error::from(err).code(),
		);
	}

	Html(
		r#"<!doctype html>
<html>
	<body>
		<h2>Tokens saved.</h2>
		<a href="/mytokens">View tokens</a>
	</body>
</html>
"#,
	)
	.into_response()
}

pub(super) async fn view_tokens(State(state): State<AppState>) -> Response {
	match state.proxy.store.fetch_tokens().await {
		Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
		Ok(None) => error_response(
			StatusCode::NOT_FOUND,
			Error::NoTokenConfigured.to_string(),
			Error::NoTokenConfigured.code(),
		),
		Err(err) => {
			let err = Error::from(err);

			error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), err.code())
		},
	}
}
