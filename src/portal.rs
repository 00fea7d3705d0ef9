//! Portal descriptor describing the Connect endpoints the proxy talks to.
//!
//! The descriptor is validated once at construction so flows can assume well-formed
//! endpoints for every request.

// self
use crate::_prelude::*;

/// Endpoint set declared by a portal descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalEndpoints {
	/// Token endpoint used for `grant_type=refresh_token` exchanges.
	pub token: Url,
	/// Schedule endpoint answering bearer-authenticated GET requests.
	pub schedule: Url,
}

/// Immutable portal descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalDescriptor {
	/// Endpoint definitions exposed by the portal.
	pub endpoints: PortalEndpoints,
	/// OAuth 2.0 client identifier presented during refresh exchanges.
	pub client_id: String,
	/// Optional confidential client secret; the Connect portal uses a public client.
	pub client_secret: Option<String>,
}
impl PortalDescriptor {
	/// Creates a new builder for the provided client identifier.
	pub fn builder(client_id: impl Into<String>) -> PortalDescriptorBuilder {
		PortalDescriptorBuilder::new(client_id)
	}
}

/// Errors raised while validating a portal descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum PortalDescriptorError {
	/// A required endpoint was not supplied.
	#[error("Portal descriptor is missing the {endpoint} endpoint.")]
	MissingEndpoint {
		/// Endpoint label (token, schedule).
		endpoint: &'static str,
	},
	/// An endpoint URL uses a scheme other than HTTP(S).
	#[error("Portal {endpoint} endpoint uses unsupported scheme `{scheme}`.")]
	UnsupportedScheme {
		/// Endpoint label (token, schedule).
		endpoint: &'static str,
		/// Offending URL scheme.
		scheme: String,
	},
	/// An endpoint URL carries no host.
	#[error("Portal {endpoint} endpoint has no host.")]
	MissingHost {
		/// Endpoint label (token, schedule).
		endpoint: &'static str,
	},
	/// The client identifier was empty.
	#[error("Portal client identifier cannot be empty.")]
	EmptyClientId,
}

/// Builder validating portal descriptors before flows consume them.
#[derive(Clone, Debug)]
pub struct PortalDescriptorBuilder {
	client_id: String,
	client_secret: Option<String>,
	token: Option<Url>,
	schedule: Option<Url>,
}
impl PortalDescriptorBuilder {
	fn new(client_id: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: None, token: None, schedule: None }
	}

	/// Sets the token-refresh endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token = Some(url);

		self
	}

	/// Sets the schedule endpoint.
	pub fn schedule_endpoint(mut self, url: Url) -> Self {
		self.schedule = Some(url);

		self
	}

	/// Attaches a confidential client secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Consumes the builder and produces a validated [`PortalDescriptor`].
	pub fn build(self) -> Result<PortalDescriptor, PortalDescriptorError> {
		if self.client_id.trim().is_empty() {
			return Err(PortalDescriptorError::EmptyClientId);
		}

		let token = validate_endpoint("token", self.token)?;
		let schedule = validate_endpoint("schedule", self.schedule)?;

		Ok(PortalDescriptor {
			endpoints: PortalEndpoints { token, schedule },
			client_id: self.client_id,
			client_secret: self.client_secret,
		})
	}
}

fn validate_endpoint(
	endpoint: &'static str,
	url: Option<Url>,
) -> Result<Url, PortalDescriptorError> {
	let url = url.ok_or(PortalDescriptorError::MissingEndpoint { endpoint })?;

	if !matches!(url.scheme(), "http" | "https") {
		return Err(PortalDescriptorError::UnsupportedScheme {
			endpoint,
			scheme: url.scheme().to_owned(),
		});
	}
	if url.host_str().is_none() {
		return Err(PortalDescriptorError::MissingHost { endpoint });
	}

	Ok(url)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse portal test URL.")
	}

	#[test]
	fn builder_accepts_complete_descriptors() {
		let descriptor = PortalDescriptor::builder("slm")
			.token_endpoint(url("https://sso.example.edu/realms/demo/token"))
			.schedule_endpoint(url("https://connect.example.edu/api/schedules"))
			.build()
			.expect("Complete descriptor should build successfully.");

		assert_eq!(descriptor.client_id, "slm");
		assert!(descriptor.client_secret.is_none());
		assert_eq!(descriptor.endpoints.token.host_str(), Some("sso.example.edu"));
	}

	#[test]
	fn builder_rejects_missing_endpoints() {
		let err = PortalDescriptor::builder("slm")
			.token_endpoint(url("https://sso.example.edu/token"))
			.build()
			.expect_err("Descriptor builder should reject a missing schedule endpoint.");

		assert_eq!(err, PortalDescriptorError::MissingEndpoint { endpoint: "schedule" });
	}

	#[test]
	fn builder_rejects_non_http_schemes() {
		let err = PortalDescriptor::builder("slm")
			.token_endpoint(url("ftp://sso.example.edu/token"))
			.schedule_endpoint(url("https://connect.example.edu/api/schedules"))
			.build()
			.expect_err("Descriptor builder should reject non-HTTP schemes.");

		assert!(matches!(err, PortalDescriptorError::UnsupportedScheme { endpoint: "token", .. }));
	}

	#[test]
	fn builder_rejects_empty_client_id() {
		let err = PortalDescriptor::builder("  ")
			.token_endpoint(url("https://sso.example.edu/token"))
			.schedule_endpoint(url("https://connect.example.edu/api/schedules"))
			.build()
			.expect_err("Descriptor builder should reject an empty client identifier.");

		assert_eq!(err, PortalDescriptorError::EmptyClientId);
	}
}
