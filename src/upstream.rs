//! Schedule endpoint client mapping portal responses into proxy results.
//!
//! The schedule call rides the same instrumented transport handles as the refresh
//! exchange, so status capture and error classification stay uniform across both
//! portal endpoints.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{
		Method, StatusCode,
		header::{ACCEPT, AUTHORIZATION},
	},
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, UpstreamError},
	http::{PortalEndpointKind, PortalHttpClient, ResponseMetadataSlot},
	oauth::TransportErrorMapper,
	token::TokenSecret,
};

/// Calls the portal schedule endpoint with the provided bearer credential and returns
/// the parsed JSON document.
///
/// Responses are classified so callers can distinguish credential rejections (which
/// may warrant one refresh-and-retry cycle) from every other failure.
pub async fn fetch_schedule<C, M>(
	http_client: &C,
	mapper: &M,
	endpoint: &Url,
	bearer: &TokenSecret,
) -> Result<JsonValue>
where
	C: ?Sized + PortalHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let slot = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(slot.clone());
	let request: HttpRequest = oauth2::http::Request::builder()
		.method(Method::GET)
		.uri(endpoint.as_str())
		.header(AUTHORIZATION, format!("Bearer {}", bearer.expose()))
		.header(ACCEPT, "application/json")
		.body(Vec::new())
		.map_err(ConfigError::from)?;
	let response = handle.call(request).await.map_err(|err| {
		mapper.map_transport_error(PortalEndpointKind::Schedule, slot.take().as_ref(), err)
	})?;
	let status = response.status();

	if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
		return Err(UpstreamError::AuthRejected { status: status.as_u16() }.into());
	}
	if !status.is_success() {
		return Err(UpstreamError::Endpoint { status: status.as_u16() }.into());
	}

	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| {
			UpstreamError::ResponseParse { source, status: Some(status.as_u16()) }.into()
		})
}
