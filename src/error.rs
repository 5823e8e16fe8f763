//! Closed authentication error taxonomy shared by flows, gateways, and handlers.
//!
//! Only [`AuthError::code`] is a contract for callers; `message` and `details` are
//! developer diagnostics and must never drive branching logic. Every code carries a
//! fixed transport status so handlers map failures uniformly.

// crates.io
use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
// self
use crate::_prelude::*;

/// Flow-level result alias returning [`AuthError`] by default.
pub type AuthResult<T, E = AuthError> = std::result::Result<T, E>;

/// Stable, closed set of authentication error codes.
///
/// The wire representation (`AUTH_INVALID_STATE`, ...) is the only part automated
/// callers may rely on; new codes may be added, but existing codes never change
/// meaning or status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AuthErrorCode {
	/// A required request parameter is missing or malformed.
	InvalidState,
	/// The broker's client identifier does not map to a registered provider.
	ProviderNotSupported,
	/// Broker challenge lookup failed, or no matching flow state exists.
	SessionNotFound,
	/// The authenticated-session check failed.
	SessionExpired,
	/// Token introspection reported an inactive or unknown token.
	InvalidToken,
	/// The upstream IdP refused the authorization-code exchange.
	UpstreamExchangeFailed,
	/// The upstream IdP profile fetch failed.
	UpstreamProfileFailed,
	/// The broker refused an accept-login or accept-consent call.
	BrokerAcceptFailed,
	/// Flow state could not be persisted.
	SessionCreateFailed,
	/// The broker's introspection endpoint failed.
	TokenIntrospectFailed,
}
impl AuthErrorCode {
	/// Returns the stable wire representation of the code.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthErrorCode::InvalidState => "AUTH_INVALID_STATE",
			AuthErrorCode::ProviderNotSupported => "AUTH_PROVIDER_NOT_SUPPORTED",
			AuthErrorCode::SessionNotFound => "AUTH_SESSION_NOT_FOUND",
			AuthErrorCode::SessionExpired => "AUTH_SESSION_EXPIRED",
			AuthErrorCode::InvalidToken => "AUTH_INVALID_TOKEN",
			AuthErrorCode::UpstreamExchangeFailed => "AUTH_UPSTREAM_EXCHANGE_FAILED",
			AuthErrorCode::UpstreamProfileFailed => "AUTH_UPSTREAM_PROFILE_FAILED",
			AuthErrorCode::BrokerAcceptFailed => "AUTH_BROKER_ACCEPT_FAILED",
			AuthErrorCode::SessionCreateFailed => "AUTH_SESSION_CREATE_FAILED",
			AuthErrorCode::TokenIntrospectFailed => "AUTH_TOKEN_INTROSPECT_FAILED",
		}
	}

	/// Maps the code to its transport status.
	pub const fn status(self) -> StatusCode {
		match self {
			AuthErrorCode::InvalidState | AuthErrorCode::ProviderNotSupported =>
				StatusCode::BAD_REQUEST,
			AuthErrorCode::SessionNotFound
			| AuthErrorCode::SessionExpired
			| AuthErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
			AuthErrorCode::UpstreamExchangeFailed
			| AuthErrorCode::UpstreamProfileFailed
			| AuthErrorCode::BrokerAcceptFailed => StatusCode::BAD_GATEWAY,
			AuthErrorCode::SessionCreateFailed | AuthErrorCode::TokenIntrospectFailed =>
				StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}
impl Display for AuthErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for AuthErrorCode {
	type Err = UnknownAuthCode;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let code = match s {
			"AUTH_INVALID_STATE" => AuthErrorCode::InvalidState,
			"AUTH_PROVIDER_NOT_SUPPORTED" => AuthErrorCode::ProviderNotSupported,
			"AUTH_SESSION_NOT_FOUND" => AuthErrorCode::SessionNotFound,
			"AUTH_SESSION_EXPIRED" => AuthErrorCode::SessionExpired,
			"AUTH_INVALID_TOKEN" => AuthErrorCode::InvalidToken,
			"AUTH_UPSTREAM_EXCHANGE_FAILED" => AuthErrorCode::UpstreamExchangeFailed,
			"AUTH_UPSTREAM_PROFILE_FAILED" => AuthErrorCode::UpstreamProfileFailed,
			"AUTH_BROKER_ACCEPT_FAILED" => AuthErrorCode::BrokerAcceptFailed,
			"AUTH_SESSION_CREATE_FAILED" => AuthErrorCode::SessionCreateFailed,
			"AUTH_TOKEN_INTROSPECT_FAILED" => AuthErrorCode::TokenIntrospectFailed,
			_ => return Err(UnknownAuthCode { value: s.to_owned() }),
		};

		Ok(code)
	}
}
impl From<AuthErrorCode> for String {
	fn from(code: AuthErrorCode) -> Self {
		code.as_str().to_owned()
	}
}
impl TryFrom<String> for AuthErrorCode {
	type Error = UnknownAuthCode;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

/// Error returned when parsing a string that is not part of the taxonomy.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("`{value}` is not a known authentication error code.")]
pub struct UnknownAuthCode {
	/// The rejected input.
	pub value: String,
}

/// Structured authentication failure reported to the caller as JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthError {
	/// Taxonomy code; the only field callers may branch on.
	pub code: AuthErrorCode,
	/// Developer-facing diagnostic, never a contract.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	/// Structured diagnostic context (step, challenge, ...), never a contract.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}
impl AuthError {
	/// Creates an error carrying only a taxonomy code.
	pub fn new(code: AuthErrorCode) -> Self {
		Self { code, message: None, details: None }
	}

	/// Attaches a diagnostic message.
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());

		self
	}

	/// Attaches structured diagnostic context.
	pub fn with_details(mut self, details: serde_json::Value) -> Self {
		self.details = Some(details);

		self
	}

	/// Transport status mapped from the taxonomy code.
	pub fn status(&self) -> StatusCode {
		self.code.status()
	}
}
impl Display for AuthError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match &self.message {
			Some(message) => write!(f, "{}: {message}", self.code),
			None => f.write_str(self.code.as_str()),
		}
	}
}
impl std::error::Error for AuthError {}
impl IntoResponse for AuthError {
	fn into_response(self) -> Response {
		(self.status(), Json(self)).into_response()
	}
}
