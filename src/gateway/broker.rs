//! Admin API client for the authorization broker.

// self
use crate::{
	_prelude::*,
	auth::{ConsentChallenge, ConsentSessionClaims, LoginChallenge},
	gateway::{GatewayError, decode_json, expect_success},
};

const LOGIN_PATH: &str = "admin/oauth2/auth/requests/login";
const CONSENT_PATH: &str = "admin/oauth2/auth/requests/consent";
const INTROSPECT_PATH: &str = "admin/oauth2/introspect";

/// Client for the broker's admin API.
///
/// One instance is shared by every flow; the underlying [`ReqwestClient`] pools
/// connections internally.
#[derive(Clone, Debug)]
pub struct BrokerGateway {
	admin_url: Url,
	http_client: ReqwestClient,
}
impl BrokerGateway {
	/// Creates a gateway against the given admin API base URL.
	pub fn new(admin_url: Url, http_client: ReqwestClient) -> Self {
		Self { admin_url, http_client }
	}

	/// Fetches the pending login session referenced by a challenge.
	pub async fn login_session(
		&self,
		challenge: &LoginChallenge,
	) -> Result<LoginSession, GatewayError> {
		let endpoint = self.endpoint(LOGIN_PATH, &[("login_challenge", challenge.as_ref())])?;
		let response = self.get(&endpoint).await?;

		decode_json(endpoint.as_str(), response).await
	}

	/// Accepts the login request, binding the authenticated subject to it.
	///
	/// The reply's `redirect_to` continues the browser toward the broker, which then
	/// issues the consent challenge.
	pub async fn accept_login(
		&self,
		challenge: &LoginChallenge,
		acceptance: &LoginAcceptance,
	) -> Result<AcceptLoginReply, GatewayError> {
		let endpoint =
			self.endpoint(&format!("{LOGIN_PATH}/accept"), &[(
				"login_challenge",
				challenge.as_ref(),
			)])?;
		let response = self.put_json(&endpoint, acceptance).await?;

		decode_json(endpoint.as_str(), response).await
	}

	/// Rejects the login request with an OAuth error code.
	pub async fn reject_login(
		&self,
		challenge: &LoginChallenge,
		rejection: &FlowRejection,
	) -> Result<RejectReply, GatewayError> {
		let endpoint =
			self.endpoint(&format!("{LOGIN_PATH}/reject"), &[(
				"login_challenge",
				challenge.as_ref(),
			)])?;
		let response = self.put_json(&endpoint, rejection).await?;

		decode_json(endpoint.as_str(), response).await
	}

	/// Fetches the pending consent session referenced by a challenge.
	pub async fn consent_session(
		&self,
		challenge: &ConsentChallenge,
	) -> Result<ConsentSession, GatewayError> {
		let endpoint = self.endpoint(CONSENT_PATH, &[("consent_challenge", challenge.as_ref())])?;
		let response = self.get(&endpoint).await?;

		decode_json(endpoint.as_str(), response).await
	}

	/// Accepts the consent request with the granted scopes and claim bags.
	pub async fn accept_consent(
		&self,
		challenge: &ConsentChallenge,
		grant: &ConsentGrant,
	) -> Result<AcceptConsentReply, GatewayError> {
		let endpoint = self.endpoint(&format!("{CONSENT_PATH}/accept"), &[(
			"consent_challenge",
			challenge.as_ref(),
		)])?;
		let response = self.put_json(&endpoint, grant).await?;

		decode_json(endpoint.as_str(), response).await
	}

	/// Rejects the consent request with an OAuth error code.
	pub async fn reject_consent(
		&self,
		challenge: &ConsentChallenge,
		rejection: &FlowRejection,
	) -> Result<RejectReply, GatewayError> {
		let endpoint = self.endpoint(&format!("{CONSENT_PATH}/reject"), &[(
			"consent_challenge",
			challenge.as_ref(),
		)])?;
		let response = self.put_json(&endpoint, rejection).await?;

		decode_json(endpoint.as_str(), response).await
	}

	/// Introspects a broker-issued token.
	pub async fn introspect(&self, token: &str) -> Result<TokenIntrospection, GatewayError> {
		if token.is_empty() {
			return Err(GatewayError::MissingParameter { parameter: "token" });
		}

		let endpoint = self.endpoint(INTROSPECT_PATH, &[])?;
		let response = self
			.http_client
			.post(endpoint.clone())
			.form(&[("token", token)])
			.send()
			.await
			.map_err(|source| GatewayError::Transport {
				endpoint: endpoint.as_str().to_owned(),
				source,
			})?;
		let response = expect_success(endpoint.as_str(), response).await?;

		decode_json(endpoint.as_str(), response).await
	}

	fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, GatewayError> {
		let raw = format!("{}/{path}", self.admin_url.as_str().trim_end_matches('/'));
		let mut endpoint = Url::parse(&raw)
			.map_err(|source| GatewayError::InvalidEndpoint { endpoint: raw, source })?;

		if !query.is_empty() {
			endpoint.query_pairs_mut().extend_pairs(query);
		}

		Ok(endpoint)
	}

	async fn get(&self, endpoint: &Url) -> Result<reqwest::Response, GatewayError> {
		let response =
			self.http_client.get(endpoint.clone()).send().await.map_err(|source| {
				GatewayError::Transport { endpoint: endpoint.as_str().to_owned(), source }
			})?;

		expect_success(endpoint.as_str(), response).await
	}

	async fn put_json<B>(&self, endpoint: &Url, body: &B) -> Result<reqwest::Response, GatewayError>
	where
		B: Serialize,
	{
		let response =
			self.http_client.put(endpoint.clone()).json(body).send().await.map_err(|source| {
				GatewayError::Transport { endpoint: endpoint.as_str().to_owned(), source }
			})?;

		expect_success(endpoint.as_str(), response).await
	}
}

/// Pending login session as reported by the broker.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginSession {
	/// The challenge this session answers.
	pub challenge: LoginChallenge,
	/// OAuth client that initiated the flow.
	#[serde(default)]
	pub client: BrokerClient,
	/// Whether the broker remembers this subject and the UI may be skipped.
	#[serde(default)]
	pub skip: bool,
	/// Previously remembered subject, empty for first-time logins.
	#[serde(default)]
	pub subject: String,
	/// Scopes the client asked for.
	#[serde(default)]
	pub requested_scope: Vec<String>,
}

/// OAuth client metadata embedded in broker sessions.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BrokerClient {
	/// Registered client identifier.
	#[serde(default)]
	pub client_id: String,
}

/// Body sent when accepting a login request.
#[derive(Clone, Debug, Serialize)]
pub struct LoginAcceptance {
	/// Authenticated subject identifier.
	pub subject: String,
	/// Whether the broker should remember the subject.
	pub remember: bool,
	/// Remember duration in seconds.
	pub remember_for: i64,
}
impl LoginAcceptance {
	const REMEMBER_FOR_SECS: i64 = 3_600;

	/// Standard acceptance: remember the subject for one hour.
	pub fn remembered(subject: impl Into<String>) -> Self {
		Self { subject: subject.into(), remember: true, remember_for: Self::REMEMBER_FOR_SECS }
	}
}

/// Body sent when rejecting a login or consent request.
#[derive(Clone, Debug, Serialize)]
pub struct FlowRejection {
	/// Machine-readable OAuth error code, e.g. `access_denied`.
	pub error: String,
	/// Human-readable description forwarded to the client.
	pub error_description: String,
}
impl FlowRejection {
	/// The `access_denied` rejection with a description.
	pub fn access_denied(description: impl Into<String>) -> Self {
		Self { error: "access_denied".into(), error_description: description.into() }
	}
}

/// Broker reply after accepting a login request.
#[derive(Clone, Debug, Deserialize)]
pub struct AcceptLoginReply {
	/// URL the browser must be redirected to.
	pub redirect_to: String,
	/// Broker-issued access token, when the broker includes one in the acceptance.
	#[serde(default)]
	pub access_token: Option<String>,
	/// Broker-issued refresh token, when one accompanies the acceptance.
	#[serde(default)]
	pub refresh_token: Option<String>,
}

/// Broker reply after rejecting a login or consent request.
#[derive(Clone, Debug, Deserialize)]
pub struct RejectReply {
	/// URL the browser must be redirected to.
	pub redirect_to: String,
}

/// Pending consent session as reported by the broker.
#[derive(Clone, Debug, Deserialize)]
pub struct ConsentSession {
	/// The challenge this session answers.
	pub challenge: ConsentChallenge,
	/// Whether consent was previously remembered and the UI may be skipped.
	#[serde(default)]
	pub skip: bool,
	/// Subject established during the login step.
	#[serde(default)]
	pub subject: String,
	/// OAuth client asking for consent.
	#[serde(default)]
	pub client: BrokerClient,
	/// Scopes the client asked for.
	#[serde(default)]
	pub requested_scope: Vec<String>,
	/// Audiences the client asked access tokens to carry.
	#[serde(default)]
	pub requested_access_token_audience: Vec<String>,
}

/// Body sent when accepting a consent request.
#[derive(Clone, Debug, Serialize)]
pub struct ConsentGrant {
	/// Scopes actually granted.
	pub grant_scope: Vec<String>,
	/// Audiences actually granted.
	pub grant_access_token_audience: Vec<String>,
	/// Whether the broker should remember this consent.
	pub remember: bool,
	/// Remember duration in seconds.
	pub remember_for: i64,
	/// Claim bags embedded into the issued tokens.
	pub session: ConsentSessionClaims,
}

/// Broker reply after accepting a consent request.
#[derive(Clone, Debug, Deserialize)]
pub struct AcceptConsentReply {
	/// URL the browser must be redirected to.
	pub redirect_to: String,
}

/// Result of introspecting a broker-issued token.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenIntrospection {
	/// Whether the token is currently valid.
	pub active: bool,
	/// Subject the token was issued to.
	#[serde(default)]
	pub sub: String,
	/// Issued-at instant, seconds since the Unix epoch.
	#[serde(default)]
	pub iat: Option<i64>,
	/// Expiry instant, seconds since the Unix epoch.
	#[serde(default)]
	pub exp: Option<i64>,
	/// Space-delimited granted scopes.
	#[serde(default)]
	pub scope: String,
}
impl TokenIntrospection {
	/// Issued-at as an [`OffsetDateTime`], when the broker reported one.
	pub fn issued_at(&self) -> Option<OffsetDateTime> {
		self.iat.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
	}

	/// Expiry as an [`OffsetDateTime`], when the broker reported one.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.exp.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
	}
}
