//! Upstream identity provider strategies.
//!
//! [`IdentityProvider`] is the seam between flows and concrete IdPs; flows only ever
//! see authorization URLs, [`UpstreamToken`]s and normalized
//! [`IdentityClaims`]. [`GraphProvider`] implements the contract against the
//! Microsoft identity platform and the Graph profile API.

// crates.io
use base64::Engine;
// self
use crate::{
	_prelude::*,
	auth::IdentityClaims,
	config::ProviderConfig,
	gateway::{GatewayError, GatewayFuture, decode_json, expect_success},
	nonce::FlowNonce,
};

/// Closed set of upstream providers the bridge can dispatch to.
///
/// Dispatch is by enum, not by free-form string; an unsupported name fails before any
/// network traffic happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProviderKind {
	/// Microsoft identity platform + Graph profile API.
	Microsoft,
}
impl ProviderKind {
	/// Canonical lowercase name used in URLs and stored flow state.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Microsoft => "microsoft",
		}
	}
}
impl Display for ProviderKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ProviderKind {
	type Err = UnknownProvider;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"microsoft" => Ok(Self::Microsoft),
			_ => Err(UnknownProvider { name: s.to_owned() }),
		}
	}
}
impl From<ProviderKind> for String {
	fn from(value: ProviderKind) -> Self {
		value.as_str().to_owned()
	}
}
impl TryFrom<String> for ProviderKind {
	type Error = UnknownProvider;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

/// Error produced when a provider name is not in the supported set.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown identity provider `{name}`.")]
pub struct UnknownProvider {
	/// The unrecognized name.
	pub name: String,
}

/// Strategy contract implemented by each upstream IdP integration.
pub trait IdentityProvider
where
	Self: Send + Sync,
{
	/// Which provider this strategy serves.
	fn kind(&self) -> ProviderKind;

	/// Builds the authorization URL the browser is sent to.
	///
	/// Both `state` and `nonce` are mandatory; an empty value is a bug upstream of
	/// this call and fails instead of producing a replayable URL.
	fn authorization_url(&self, state: &str, nonce: &FlowNonce) -> Result<Url, GatewayError>;

	/// Exchanges an authorization code for upstream tokens.
	fn exchange_code<'a>(&'a self, code: &'a str) -> GatewayFuture<'a, UpstreamToken>;

	/// Fetches the subject's profile using an upstream access token.
	fn fetch_profile<'a>(&'a self, access_token: &'a str) -> GatewayFuture<'a, IdentityClaims>;
}

/// Token material returned by an upstream token endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct UpstreamToken {
	/// Access token for the provider's own APIs.
	pub access_token: String,
	/// Refresh token, when the provider issued one.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// OIDC ID token, when `openid` was among the requested scopes.
	#[serde(default)]
	pub id_token: Option<String>,
}
impl UpstreamToken {
	/// Extracts the `nonce` claim from the ID token payload, if any.
	///
	/// The signature is not verified here; the token arrived over the direct TLS
	/// channel from the token endpoint, and only the nonce echo is of interest.
	pub fn nonce_claim(&self) -> Option<String> {
		let id_token = self.id_token.as_deref()?;
		let payload = id_token.split('.').nth(1)?;
		let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload).ok()?;
		let claims: serde_json::Value = serde_json::from_slice(&decoded).ok()?;

		claims.get("nonce").and_then(|v| v.as_str()).map(ToOwned::to_owned)
	}
}

/// Immutable lookup table from [`ProviderKind`] to strategy instances.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
	providers: HashMap<ProviderKind, Arc<dyn IdentityProvider>>,
}
impl ProviderRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a strategy, replacing any previous one of the same kind.
	pub fn register(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
		self.providers.insert(provider.kind(), provider);

		self
	}

	/// Resolves a raw provider name into a registered strategy.
	pub fn resolve(&self, name: &str) -> Result<&Arc<dyn IdentityProvider>, UnknownProvider> {
		let kind = name.parse::<ProviderKind>()?;

		self.get(kind).ok_or_else(|| UnknownProvider { name: name.to_owned() })
	}

	/// Looks up a registered strategy by kind.
	pub fn get(&self, kind: ProviderKind) -> Option<&Arc<dyn IdentityProvider>> {
		self.providers.get(&kind)
	}
}
impl Debug for ProviderRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderRegistry")
			.field("providers", &self.providers.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Microsoft identity platform strategy backed by the Graph profile API.
#[derive(Clone, Debug)]
pub struct GraphProvider {
	config: ProviderConfig,
	http_client: ReqwestClient,
}
impl GraphProvider {
	/// Creates a strategy from validated provider configuration.
	pub fn new(config: ProviderConfig, http_client: ReqwestClient) -> Self {
		Self { config, http_client }
	}
}
impl IdentityProvider for GraphProvider {
	fn kind(&self) -> ProviderKind {
		ProviderKind::Microsoft
	}

	fn authorization_url(&self, state: &str, nonce: &FlowNonce) -> Result<Url, GatewayError> {
		if state.is_empty() {
			return Err(GatewayError::MissingParameter { parameter: "state" });
		}
		if nonce.as_str().is_empty() {
			return Err(GatewayError::MissingParameter { parameter: "nonce" });
		}

		let mut url = self.config.authorization_endpoint.clone();

		url.query_pairs_mut()
			.append_pair("client_id", &self.config.client_id)
			.append_pair("response_type", "code")
			.append_pair("redirect_uri", self.config.redirect_url.as_str())
			.append_pair("response_mode", "query")
			.append_pair("scope", &self.config.scopes.join(" "))
			.append_pair("state", state)
			.append_pair("nonce", nonce.as_str());

		Ok(url)
	}

	fn exchange_code<'a>(&'a self, code: &'a str) -> GatewayFuture<'a, UpstreamToken> {
		Box::pin(async move {
			if code.is_empty() {
				return Err(GatewayError::MissingParameter { parameter: "code" });
			}

			let endpoint = self.config.token_endpoint.as_str();
			let form = [
				("client_id", self.config.client_id.as_str()),
				("client_secret", self.config.client_secret.as_str()),
				("code", code),
				("redirect_uri", self.config.redirect_url.as_str()),
				("grant_type", "authorization_code"),
				("scope", &self.config.scopes.join(" ")),
			];
			let response = self
				.http_client
				.post(self.config.token_endpoint.clone())
				.form(&form)
				.send()
				.await
				.map_err(|source| GatewayError::Transport { endpoint: endpoint.to_owned(), source })?;
			let status = response.status();

			if !status.is_success() {
				let body = response.text().await.unwrap_or_default();

				// Token endpoints report failures as structured OAuth documents;
				// surface those as such and keep the raw body otherwise.
				if let Ok(oauth) = serde_json::from_str::<OAuthErrorBody>(&body) {
					return Err(GatewayError::OAuth {
						endpoint: endpoint.to_owned(),
						error: oauth.error,
						description: oauth.error_description,
					});
				}

				return Err(GatewayError::Status {
					endpoint: endpoint.to_owned(),
					status: status.as_u16(),
					body,
				});
			}

			decode_json(endpoint, response).await
		})
	}

	fn fetch_profile<'a>(&'a self, access_token: &'a str) -> GatewayFuture<'a, IdentityClaims> {
		Box::pin(async move {
			if access_token.is_empty() {
				return Err(GatewayError::MissingParameter { parameter: "access_token" });
			}

			let endpoint = self.config.profile_endpoint.as_str();
			let response = self
				.http_client
				.get(self.config.profile_endpoint.clone())
				.bearer_auth(access_token)
				.send()
				.await
				.map_err(|source| GatewayError::Transport { endpoint: endpoint.to_owned(), source })?;
			let response = expect_success(endpoint, response).await?;
			let profile: GraphProfile = decode_json(endpoint, response).await?;

			Ok(profile.into())
		})
	}
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
	error: String,
	#[serde(default)]
	error_description: String,
}

#[derive(Debug, Deserialize)]
struct GraphProfile {
	id: String,
	#[serde(default, rename = "displayName")]
	display_name: String,
	#[serde(default)]
	mail: String,
	#[serde(default, rename = "userPrincipalName")]
	user_principal_name: String,
}
impl From<GraphProfile> for IdentityClaims {
	fn from(profile: GraphProfile) -> Self {
		let email = IdentityClaims::resolve_email(&profile.mail, &profile.user_principal_name);

		Self { subject: profile.id, display_name: profile.display_name, email }
	}
}
