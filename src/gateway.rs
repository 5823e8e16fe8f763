//! Outbound HTTP gateways toward the authorization broker and upstream IdPs.
//!
//! `broker` talks to the broker's admin API (login/consent sessions, accept/reject,
//! introspection). `idp` defines the [`IdentityProvider`](idp::IdentityProvider)
//! strategy and the Microsoft Graph implementation. Both share one transport error
//! shape, [`GatewayError`], which always names the endpoint that failed and captures
//! the raw status and body of non-success replies.

pub mod broker;
pub mod idp;

pub use broker::BrokerGateway;
pub use idp::{GraphProvider, IdentityProvider, ProviderKind, ProviderRegistry, UpstreamToken};

// crates.io
use reqwest::{Response, redirect::Policy};
// self
use crate::_prelude::*;

const GATEWAY_TIMEOUT_SECS: u64 = 30;

/// Boxed future returned by gateway trait methods.
pub type GatewayFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, GatewayError>> + 'a + Send>>;

/// Failures crossing the outbound HTTP boundary.
///
/// Every variant carries the endpoint it happened against so flow-level logs can
/// point at the exact remote call without guessing from context.
#[derive(Debug, ThisError)]
pub enum GatewayError {
	/// The request never produced a usable response (DNS, connect, timeout).
	#[error("Request to `{endpoint}` failed in transport.")]
	Transport {
		/// Endpoint the request targeted.
		endpoint: String,
		/// Underlying transport failure.
		#[source]
		source: reqwest::Error,
	},
	/// The remote replied with a non-success status.
	#[error("`{endpoint}` replied with status {status}: {body}.")]
	Status {
		/// Endpoint the request targeted.
		endpoint: String,
		/// HTTP status code of the reply.
		status: u16,
		/// Raw response body, kept for diagnostics.
		body: String,
	},
	/// The response body did not decode into the expected shape.
	#[error("Response from `{endpoint}` could not be decoded.")]
	Decode {
		/// Endpoint the request targeted.
		endpoint: String,
		/// Underlying decoding failure with the path that failed.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The remote replied with a structured OAuth error document.
	#[error("`{endpoint}` rejected the request: {error}: {description}.")]
	OAuth {
		/// Endpoint the request targeted.
		endpoint: String,
		/// Machine-readable OAuth error code.
		error: String,
		/// Human-readable description, empty when the remote sent none.
		description: String,
	},
	/// A request parameter required by the remote was missing or empty.
	#[error("Cannot call the remote endpoint without `{parameter}`.")]
	MissingParameter {
		/// Name of the absent parameter.
		parameter: &'static str,
	},
	/// An endpoint URL could not be assembled.
	#[error("Endpoint URL `{endpoint}` is invalid.")]
	InvalidEndpoint {
		/// The malformed endpoint string.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Anything the variants above cannot express.
	#[error("Gateway call to `{endpoint}` failed: {message}.")]
	Other {
		/// Endpoint the request targeted.
		endpoint: String,
		/// Human-readable error payload.
		message: String,
	},
}

/// Builds the shared outbound HTTP client.
///
/// Redirects are disabled; every remote here replies with JSON documents and a 3xx
/// from the broker admin API or a token endpoint is always a misconfiguration.
pub fn gateway_http_client() -> Result<ReqwestClient, reqwest::Error> {
	ReqwestClient::builder()
		.timeout(std::time::Duration::from_secs(GATEWAY_TIMEOUT_SECS))
		.redirect(Policy::none())
		.build()
}

pub(crate) async fn expect_success(
	endpoint: &str,
	response: Response,
) -> Result<Response, GatewayError> {
	let status = response.status();

	if status.is_success() {
		return Ok(response);
	}

	let body = response.text().await.unwrap_or_default();

	Err(GatewayError::Status { endpoint: endpoint.to_owned(), status: status.as_u16(), body })
}

pub(crate) async fn decode_json<T>(endpoint: &str, response: Response) -> Result<T, GatewayError>
where
	T: serde::de::DeserializeOwned,
{
	let bytes = response
		.bytes()
		.await
		.map_err(|source| GatewayError::Transport { endpoint: endpoint.to_owned(), source })?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| GatewayError::Decode { endpoint: endpoint.to_owned(), source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn gateway_errors_name_the_endpoint() {
		let err = GatewayError::Status {
			endpoint: "http://broker.local/admin/oauth2/auth/requests/login".into(),
			status: 404,
			body: "not found".into(),
		};

		assert!(err.to_string().contains("/admin/oauth2/auth/requests/login"));
		assert!(err.to_string().contains("404"));

		let err = GatewayError::MissingParameter { parameter: "login_challenge" };

		assert!(err.to_string().contains("login_challenge"));
	}
}
