//! Refresh-grant facade over the `oauth2` client.
//!
//! The facade owns the configured token-endpoint client and turns a
//! `grant_type=refresh_token` exchange into a complete replacement [`TokenRecord`],
//! carrying the previous refresh secret forward when the portal does not rotate it.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RefreshToken, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, RefreshError, TransportError, UpstreamError},
	http::{PortalEndpointKind, PortalHttpClient, ResponseMetadata, ResponseMetadataSlot},
	portal::PortalDescriptor,
	token::TokenRecord,
};

type ConfiguredTokenClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeTokenResponse = oauth2::basic::BasicTokenResponse;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Maps HTTP transport failures into proxy [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a proxy error,
	/// classified by the endpoint the request targeted.
	fn map_transport_error(
		&self,
		endpoint: PortalEndpointKind,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: PortalEndpointKind,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(endpoint, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => route_transport(endpoint, TransportError::Io(inner)),
			HttpClientError::Other(message) => map_opaque_transport_error(endpoint, meta, message),
			_ => map_opaque_transport_error(endpoint, meta, "unknown transport failure"),
		}
	}
}

pub(crate) struct RefreshFacade<C, M>
where
	C: ?Sized + PortalHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredTokenClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> RefreshFacade<C, M>
where
	C: ?Sized + PortalHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &PortalDescriptor,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let oauth_client = BasicClient::new(ClientId::new(descriptor.client_id.clone()))
			.set_token_uri(token_url);
		// The Connect portal registers a public client, so credentials travel in the
		// request body; a confidential secret switches to HTTP Basic.
		let oauth_client = match &descriptor.client_secret {
			Some(secret) => oauth_client.set_client_secret(ClientSecret::new(secret.clone())),
			None => oauth_client.set_auth_type(AuthType::RequestBody),
		};

		Ok(Self {
			oauth_client,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
		})
	}

	/// Performs one `grant_type=refresh_token` exchange and maps the result into a
	/// replacement [`TokenRecord`].
	pub(crate) fn refresh_token<'a>(&'a self, refresh_secret: &'a str) -> FacadeFuture<'a, TokenRecord> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let refresh = RefreshToken::new(refresh_secret.to_owned());
			let response = self
				.oauth_client
				.exchange_refresh_token(&refresh)
				.request_async(&instrumented)
				.await
				.map_err(|err| {
					map_request_error(meta.take(), err, self.error_mapper.as_ref())
				})?;

			map_refresh_token_response(refresh_secret, response)
		})
	}
}

fn map_refresh_token_response(
	previous_refresh: &str,
	response: FacadeTokenResponse,
) -> Result<TokenRecord> {
	let expires_in = response.expires_in().ok_or(RefreshError::InvalidExpiry)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| RefreshError::InvalidExpiry)?;

	if expires_in <= 0 {
		return Err(RefreshError::InvalidExpiry.into());
	}

	// A missing refresh_token in the response means the portal kept the old one alive.
	let refresh_secret = response
		.refresh_token()
		.map(|token| token.secret().to_owned())
		.unwrap_or_else(|| previous_refresh.to_owned());

	TokenRecord::builder()
		.access_token(response.access_token().secret().to_owned())
		.refresh_token(refresh_secret)
		.issued_at(OffsetDateTime::now_utc())
		.expires_in(Duration::seconds(expires_in))
		.build()
		.map_err(|err| ConfigError::from(err).into())
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(response),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(PortalEndpointKind::Token, meta_ref, error),
		RequestTokenError::Parse(source, _body) =>
			RefreshError::ResponseParse { source, status: meta_status(meta_ref) }.into(),
		RequestTokenError::Other(message) =>
			RefreshError::Endpoint { message, status: meta_status(meta_ref) }.into(),
	}
}

fn map_server_response_error(response: BasicErrorResponse) -> Error {
	let reason = match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_string(),
	};

	RefreshError::Rejected { reason }.into()
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(endpoint: PortalEndpointKind, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	route_transport(endpoint, TransportError::from(err))
}

fn map_opaque_transport_error(
	endpoint: PortalEndpointKind,
	meta: Option<&ResponseMetadata>,
	message: impl Display,
) -> Error {
	match endpoint {
		PortalEndpointKind::Token => RefreshError::Endpoint {
			message: format!("HTTP client error occurred while calling the token endpoint: {message}"),
			status: meta_status(meta),
		}
		.into(),
		PortalEndpointKind::Schedule =>
			UpstreamError::Transport(TransportError::opaque(message.to_string())).into(),
	}
}

fn route_transport(endpoint: PortalEndpointKind, transport: TransportError) -> Error {
	match endpoint {
		PortalEndpointKind::Token => RefreshError::Transport(transport).into(),
		PortalEndpointKind::Schedule => UpstreamError::Transport(transport).into(),
	}
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::http::ReqwestHttpClient;

	fn descriptor(client_secret: Option<&str>) -> PortalDescriptor {
		let mut builder = PortalDescriptor::builder("slm")
			.token_endpoint(
				Url::parse("https://sso.example.edu/realms/demo/protocol/openid-connect/token")
					.expect("Failed to parse token endpoint URL."),
			)
			.schedule_endpoint(
				Url::parse("https://connect.example.edu/api/schedules")
					.expect("Failed to parse schedule endpoint URL."),
			);

		if let Some(secret) = client_secret {
			builder = builder.client_secret(secret);
		}

		builder.build().expect("Failed to build portal descriptor fixture.")
	}

	#[test]
	fn builds_public_client_facade() {
		let descriptor = descriptor(None);
		let result =
			<RefreshFacade<ReqwestHttpClient, ReqwestTransportErrorMapper>>::from_descriptor(
				&descriptor,
				Arc::new(ReqwestHttpClient::default()),
				Arc::new(ReqwestTransportErrorMapper),
			);

		assert!(result.is_ok());
	}

	#[test]
	fn builds_confidential_client_facade() {
		let descriptor = descriptor(Some("secret"));
		let result =
			<RefreshFacade<ReqwestHttpClient, ReqwestTransportErrorMapper>>::from_descriptor(
				&descriptor,
				Arc::new(ReqwestHttpClient::default()),
				Arc::new(ReqwestTransportErrorMapper),
			);

		assert!(result.is_ok());
	}

	#[test]
	fn transport_routing_respects_endpoint_kind() {
		let token_err = route_transport(PortalEndpointKind::Token, TransportError::Timeout);
		let schedule_err = route_transport(PortalEndpointKind::Schedule, TransportError::Timeout);

		assert!(matches!(token_err, Error::Refresh(RefreshError::Transport(_))));
		assert!(matches!(schedule_err, Error::Upstream(UpstreamError::Transport(_))));
	}
}
