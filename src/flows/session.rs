//! Session endpoints: current user, logout, and token introspection.

// crates.io
use tracing::warn;
// self
use crate::{
	_prelude::*,
	auth::SessionId,
	error::AuthErrorCode,
	flows::Orchestrator,
	gateway::{ProviderKind, broker::TokenIntrospection},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Public view of an authenticated session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
	/// Upstream subject identifier.
	pub user_id: String,
	/// Resolved email address.
	pub email: String,
	/// Display name.
	pub name: String,
	/// Provider that authenticated the subject.
	pub provider: ProviderKind,
	/// Always `true`; present so callers can branch on one field.
	pub authenticated: bool,
}

impl Orchestrator {
	/// Resolves the authenticated user bound to a browser session.
	///
	/// An authenticated record missing its subject or email is treated the same as
	/// an expired session; a partially written record must never pass as logged in.
	pub async fn current_user(&self, session: &SessionId) -> AuthResult<CurrentUser> {
		let auth = self
			.store
			.fetch_auth(session)
			.await
			.map_err(|err| {
				warn!(error = %err, "Flow state read failed while resolving the current user.");

				AuthError::new(AuthErrorCode::SessionExpired)
					.with_message("No authenticated session exists.")
			})?
			.ok_or_else(|| {
				AuthError::new(AuthErrorCode::SessionExpired)
					.with_message("No authenticated session exists.")
			})?;

		if auth.subject.is_empty() || auth.email.is_empty() {
			return Err(AuthError::new(AuthErrorCode::SessionExpired)
				.with_message("The session record is incomplete.")
				.with_details(serde_json::json!({ "reason": "missing_user_data" })));
		}

		Ok(CurrentUser {
			user_id: auth.subject,
			email: auth.email,
			name: auth.name,
			provider: auth.provider,
			authenticated: true,
		})
	}

	/// Destroys all state held for a browser session.
	///
	/// Logout never fails the client-visible contract; a store failure is logged and
	/// swallowed, since the cookie is cleared either way.
	pub async fn logout(&self, session: &SessionId) {
		const KIND: FlowKind = FlowKind::Session;

		let span = FlowSpan::new(KIND, "logout");

		if let Err(err) = span.instrument(self.store.clear(session)).await {
			warn!(error = %err, "Flow state clear failed during logout.");
			obs::record_flow_outcome(KIND, FlowOutcome::Failure);
		} else {
			obs::record_flow_outcome(KIND, FlowOutcome::Success);
		}
	}

	/// Introspects a broker-issued token.
	///
	/// An inactive token is an authentication failure, not a gateway failure; only
	/// transport or broker-side errors surface as 500-class.
	pub async fn introspect(&self, token: &str) -> AuthResult<TokenIntrospection> {
		let introspection = self.broker.introspect(token).await.map_err(|err| {
			warn!(error = %err, "Broker token introspection failed.");

			AuthError::new(AuthErrorCode::TokenIntrospectFailed)
				.with_message("The broker could not introspect the token.")
		})?;

		if !introspection.active {
			return Err(AuthError::new(AuthErrorCode::InvalidToken)
				.with_message("The token is not active."));
		}

		Ok(introspection)
	}
}
