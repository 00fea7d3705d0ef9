//! Service configuration loaded from a TOML file with serde defaults.
//!
//! A missing configuration file is not an error; every section falls back to the
//! defaults the original deployment used, so `connect-proxy` starts with nothing but
//! a gate password to add.

// std
use std::{
	fs,
	io::ErrorKind,
	net::{IpAddr, SocketAddr},
	path::{Path, PathBuf},
};
// crates.io
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	portal::{PortalDescriptor, PortalDescriptorError},
};

/// Root service configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	/// HTTP listener settings.
	pub server: ServerConfig,
	/// Connect portal endpoints and client identity.
	pub portal: PortalConfig,
	/// Snapshot store settings.
	pub store: StoreConfig,
	/// Password gate settings for the token management endpoints.
	pub gate: GateConfig,
	/// Upstream call tuning.
	pub upstream: UpstreamConfig,
}
impl Config {
	/// Loads configuration from `path`, falling back to defaults when the file is
	/// missing.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
		let contents = match fs::read_to_string(path.as_ref()) {
			Ok(contents) => contents,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
			Err(e) => return Err(ConfigFileError::Io(e)),
		};

		toml::from_str(&contents).map_err(ConfigFileError::Parse)
	}
}

/// HTTP listener settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
	/// Listen address.
	pub host: String,
	/// Listen port.
	pub port: u16,
	/// Whole-request timeout in seconds.
	pub request_timeout_seconds: u64,
}
impl Default for ServerConfig {
	fn default() -> Self {
		Self { host: "0.0.0.0".into(), port: 8000, request_timeout_seconds: 30 }
	}
}
impl ServerConfig {
	/// Resolves the configured listen address.
	pub fn bind_addr(&self) -> Result<SocketAddr, ConfigFileError> {
		let ip: IpAddr = self.host.parse()?;

		Ok(SocketAddr::new(ip, self.port))
	}

	/// Returns the whole-request timeout.
	pub fn request_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.request_timeout_seconds)
	}
}

/// Connect portal endpoints and client identity.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
	/// Token endpoint performing `grant_type=refresh_token` exchanges.
	pub token_endpoint: String,
	/// Schedule endpoint answering bearer-authenticated GET requests.
	pub schedule_endpoint: String,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Optional confidential client secret.
	pub client_secret: Option<String>,
}
impl Default for PortalConfig {
	fn default() -> Self {
		Self {
			token_endpoint: "https://sso.bracu.ac.bd/realms/bracu/protocol/openid-connect/token"
				.into(),
			schedule_endpoint:
				"https://connect.bracu.ac.bd/api/adv/v1/advising/sections/student/42749/schedules"
					.into(),
			client_id: "slm".into(),
			client_secret: None,
		}
	}
}
impl PortalConfig {
	/// Builds the validated portal descriptor consumed by flows.
	pub fn descriptor(&self) -> Result<PortalDescriptor, ConfigFileError> {
		let token = Url::parse(&self.token_endpoint)
			.map_err(|source| ConfigFileError::InvalidUrl { field: "portal.token_endpoint", source })?;
		let schedule = Url::parse(&self.schedule_endpoint).map_err(|source| {
			ConfigFileError::InvalidUrl { field: "portal.schedule_endpoint", source }
		})?;
		let mut builder = PortalDescriptor::builder(self.client_id.clone())
			.token_endpoint(token)
			.schedule_endpoint(schedule);

		if let Some(secret) = &self.client_secret {
			builder = builder.client_secret(secret.clone());
		}

		Ok(builder.build()?)
	}
}

/// Snapshot store settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
	/// Path of the JSON snapshot file.
	pub path: PathBuf,
}
impl Default for StoreConfig {
	fn default() -> Self {
		Self { path: PathBuf::from("connect-proxy-store.json") }
	}
}

/// Password gate settings for the token management endpoints.
///
/// With no password configured the management endpoints reject every request; the
/// gate never silently opens.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct GateConfig {
	/// Shared secret expected in the `password` query parameter.
	pub password: Option<String>,
}
impl GateConfig {
	/// Compares the supplied password against the configured secret by SHA-256 digest.
	pub fn permits(&self, supplied: Option<&str>) -> bool {
		match (&self.password, supplied) {
			(Some(expected), Some(given)) =>
				Sha256::digest(expected.as_bytes()) == Sha256::digest(given.as_bytes()),
			_ => false,
		}
	}
}

/// Upstream call tuning.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
	/// Portal call timeout in seconds.
	pub timeout_seconds: u64,
	/// Seconds subtracted from the token expiry before a refresh is forced.
	pub safety_margin_seconds: i64,
}
impl Default for UpstreamConfig {
	fn default() -> Self {
		Self { timeout_seconds: 8, safety_margin_seconds: 60 }
	}
}
impl UpstreamConfig {
	/// Returns the portal call timeout.
	pub fn timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.timeout_seconds)
	}

	/// Returns the token validity safety margin.
	pub fn safety_margin(&self) -> Duration {
		Duration::seconds(self.safety_margin_seconds.max(0))
	}
}

/// Errors raised while loading or validating the configuration file.
#[derive(Debug, ThisError)]
pub enum ConfigFileError {
	/// Configuration file could not be read.
	#[error("Failed to read the configuration file.")]
	Io(#[from] std::io::Error),
	/// Configuration file could not be parsed.
	#[error("Failed to parse the configuration file.")]
	Parse(#[from] toml::de::Error),
	/// A configured URL is invalid.
	#[error("Configuration field `{field}` holds an invalid URL.")]
	InvalidUrl {
		/// Offending configuration field.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The configured listen host is not an IP address.
	#[error("Configured listen host is not a valid IP address.")]
	InvalidListenAddr(#[from] std::net::AddrParseError),
	/// The portal section does not form a valid descriptor.
	#[error(transparent)]
	Descriptor(#[from] PortalDescriptorError),
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_config(contents: &str) -> PathBuf {
		let unique = format!(
			"connect_proxy_config_{}_{}.toml",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);
		let path = env::temp_dir().join(unique);

		fs::write(&path, contents).expect("Failed to write temporary configuration fixture.");

		path
	}

	#[test]
	fn default_config_matches_original_deployment() {
		let config = Config::default();

		assert_eq!(config.server.host, "0.0.0.0");
		assert_eq!(config.server.port, 8000);
		assert_eq!(config.portal.client_id, "slm");
		assert_eq!(config.upstream.timeout_seconds, 8);
		assert_eq!(config.upstream.safety_margin_seconds, 60);
		assert!(config.gate.password.is_none());
		assert!(config.portal.descriptor().is_ok());
	}

	#[test]
	fn missing_file_falls_back_to_defaults() {
		let config = Config::load("/nonexistent/connect-proxy.toml")
			.expect("Missing configuration file should yield defaults.");

		assert_eq!(config.server.port, 8000);
	}

	#[test]
	fn partial_file_keeps_remaining_defaults() {
		let path = temp_config(
			r#"
[server]
port = 9000

[gate]
password = "hunter2"
"#,
		);
		let config = Config::load(&path).expect("Partial configuration should parse.");

		assert_eq!(config.server.port, 9000);
		assert_eq!(config.server.host, "0.0.0.0");
		assert_eq!(config.gate.password.as_deref(), Some("hunter2"));
		assert_eq!(config.portal.client_id, "slm");

		fs::remove_file(&path).expect("Failed to remove temporary configuration fixture.");
	}

	#[test]
	fn invalid_file_surfaces_parse_error() {
		let path = temp_config("server = [unclosed");
		let result = Config::load(&path);

		assert!(matches!(result, Err(ConfigFileError::Parse(_))));

		fs::remove_file(&path).expect("Failed to remove temporary configuration fixture.");
	}

	#[test]
	fn gate_requires_configured_password() {
		let closed = GateConfig::default();

		assert!(!closed.permits(Some("anything")));
		assert!(!closed.permits(None));

		let gate = GateConfig { password: Some("hunter2".into()) };

		assert!(gate.permits(Some("hunter2")));
		assert!(!gate.permits(Some("hunter3")));
		assert!(!gate.permits(None));
	}

	#[test]
	fn bind_addr_rejects_hostnames() {
		let server = ServerConfig { host: "localhost".into(), ..ServerConfig::default() };

		assert!(matches!(server.bind_addr(), Err(ConfigFileError::InvalidListenAddr(_))));
	}
}
