//! Startup configuration for the bridge service.
//!
//! Configuration is read from a TOML file, with a small set of environment overrides
//! for values that should not live on disk (`IDP_BRIDGE_HTTP_LISTEN`,
//! `IDP_BRIDGE_BROKER_ADMIN_URL`, `IDP_BRIDGE_PROVIDER_CLIENT_SECRET`). Validation
//! reports every problem at once so a broken deployment fails with the full list
//! instead of one key per restart.

// std
use std::{env, fs, path::Path};
// self
use crate::_prelude::*;

/// Root configuration document.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	/// Inbound HTTP server settings.
	#[serde(default)]
	pub http: HttpConfig,
	/// Authorization broker admin API settings.
	pub broker: BrokerConfig,
	/// Upstream identity provider settings.
	pub provider: ProviderConfig,
}
impl Config {
	/// Loads the TOML document at `path` and applies environment overrides.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let raw = fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
		let mut config: Self = toml::from_str(&raw)?;

		config.apply_env_overrides()?;
		config.validate()?;

		Ok(config)
	}

	fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
		if let Ok(listen) = env::var("IDP_BRIDGE_HTTP_LISTEN") {
			self.http.listen = listen;
		}
		if let Ok(admin_url) = env::var("IDP_BRIDGE_BROKER_ADMIN_URL") {
			self.broker.admin_url = Url::parse(&admin_url).map_err(|source| {
				ConfigError::InvalidOverride { variable: "IDP_BRIDGE_BROKER_ADMIN_URL", source }
			})?;
		}
		if let Ok(secret) = env::var("IDP_BRIDGE_PROVIDER_CLIENT_SECRET") {
			self.provider.client_secret = secret;
		}

		Ok(())
	}

	/// Checks every section, collecting all problems into a single error.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let mut problems = Vec::new();

		if self.http.listen.is_empty() {
			problems.push("http.listen must not be empty".to_owned());
		}
		if self.provider.client_id.is_empty() {
			problems.push("provider.client_id is required".to_owned());
		}
		if self.provider.client_secret.is_empty() {
			problems.push("provider.client_secret is required".to_owned());
		}
		if self.provider.scopes.is_empty() {
			problems.push("provider.scopes is required and must not be empty".to_owned());
		}

		if problems.is_empty() { Ok(()) } else { Err(ConfigError::Invalid { problems }) }
	}
}

/// Inbound HTTP server settings.
#[derive(Clone, Debug, Deserialize)]
pub struct HttpConfig {
	/// Socket address the server binds to.
	#[serde(default = "default_listen")]
	pub listen: String,
	/// Marks the session cookie `Secure`; disable only for local development.
	#[serde(default)]
	pub secure_cookies: bool,
}
impl Default for HttpConfig {
	fn default() -> Self {
		Self { listen: default_listen(), secure_cookies: false }
	}
}

/// Authorization broker admin API settings.
#[derive(Clone, Debug, Deserialize)]
pub struct BrokerConfig {
	/// Base URL of the broker's admin API.
	pub admin_url: Url,
}

/// Upstream identity provider settings.
///
/// Endpoint fields default to the Microsoft identity platform so a minimal document
/// only carries credentials; tests and other tenancies override them.
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
	/// OAuth client identifier registered with the provider.
	pub client_id: String,
	/// OAuth client secret.
	#[serde(default)]
	pub client_secret: String,
	/// Redirect URL pointing back at this service's callback endpoint.
	pub redirect_url: Url,
	/// Scopes requested during authorization.
	pub scopes: Vec<String>,
	/// Authorization endpoint.
	#[serde(default = "default_authorization_endpoint")]
	pub authorization_endpoint: Url,
	/// Token endpoint.
	#[serde(default = "default_token_endpoint")]
	pub token_endpoint: Url,
	/// Profile REST endpoint queried after the exchange.
	#[serde(default = "default_profile_endpoint")]
	pub profile_endpoint: Url,
}

fn default_listen() -> String {
	"127.0.0.1:8080".to_owned()
}

fn default_authorization_endpoint() -> Url {
	Url::parse("https://login.microsoftonline.com/common/oauth2/v2.0/authorize")
		.expect("Static endpoint URL should parse.")
}

fn default_token_endpoint() -> Url {
	Url::parse("https://login.microsoftonline.com/common/oauth2/v2.0/token")
		.expect("Static endpoint URL should parse.")
}

fn default_profile_endpoint() -> Url {
	Url::parse("https://graph.microsoft.com/v1.0/me").expect("Static endpoint URL should parse.")
}

/// Configuration loading and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// The configuration file could not be read.
	#[error("Configuration file `{path}` could not be read.")]
	Read {
		/// Path that failed to open.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The document is not valid TOML for the expected schema.
	#[error(transparent)]
	Parse(#[from] toml::de::Error),
	/// An environment override carried an unparsable value.
	#[error("Environment override `{variable}` is not a valid URL.")]
	InvalidOverride {
		/// Variable name.
		variable: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// One or more required values are missing or malformed.
	#[error("Invalid configuration: {}.", problems.join("; "))]
	Invalid {
		/// Every detected problem, reported together.
		problems: Vec<String>,
	},
}
