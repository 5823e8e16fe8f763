//! Login transition: broker challenge to upstream authorization redirect.

// crates.io
use tracing::warn;
// self
use crate::{
	_prelude::*,
	auth::{LoginChallenge, SessionId},
	error::AuthErrorCode,
	flows::Orchestrator,
	gateway::broker::FlowRejection,
	nonce::FlowNonce,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::PendingFlow,
};

impl Orchestrator {
	/// Handles an inbound login challenge and returns the upstream redirect target.
	///
	/// On success the browser session holds a fresh [`PendingFlow`] and the returned
	/// URL points at the provider's authorization endpoint with `state` set to the
	/// login challenge and a newly generated nonce.
	pub async fn login(
		&self,
		session: &SessionId,
		login_challenge: Option<&str>,
	) -> AuthResult<Url> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.login_inner(session, login_challenge)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn login_inner(
		&self,
		session: &SessionId,
		login_challenge: Option<&str>,
	) -> AuthResult<Url> {
		let challenge = login_challenge
			.filter(|c| !c.is_empty())
			.ok_or_else(|| {
				AuthError::new(AuthErrorCode::InvalidState)
					.with_message("The login_challenge query parameter is required.")
					.with_details(serde_json::json!({ "parameter": "login_challenge" }))
			})
			.and_then(|raw| {
				LoginChallenge::new(raw).map_err(|err| {
					AuthError::new(AuthErrorCode::InvalidState).with_message(err.to_string())
				})
			})?;
		let login_session = self.broker.login_session(&challenge).await.map_err(|err| {
			warn!(challenge = %challenge, error = %err, "Broker login session lookup failed.");

			AuthError::new(AuthErrorCode::SessionNotFound)
				.with_message("The login challenge is unknown to the broker.")
		})?;
		let provider = match self.providers.resolve(&login_session.client.client_id) {
			Ok(provider) => provider,
			Err(unknown) => {
				// The challenge was already fetched; tell the broker the flow is
				// over so it does not dangle until expiry.
				let rejection =
					FlowRejection::access_denied("The requesting client maps to no supported identity provider.");

				if let Err(err) = self.broker.reject_login(&challenge, &rejection).await {
					warn!(challenge = %challenge, error = %err, "Best-effort login rejection failed.");
				}

				return Err(AuthError::new(AuthErrorCode::ProviderNotSupported)
					.with_message(unknown.to_string())
					.with_details(serde_json::json!({ "provider": unknown.name })));
			},
		};
		let nonce = FlowNonce::generate();
		let pending = PendingFlow {
			login_challenge: challenge.clone(),
			provider: provider.kind(),
			nonce: nonce.clone(),
		};

		self.store.save_pending(session, pending).await.map_err(|err| {
			AuthError::new(AuthErrorCode::SessionCreateFailed).with_message(err.to_string())
		})?;

		match provider.authorization_url(challenge.as_ref(), &nonce) {
			Ok(url) => Ok(url),
			Err(err) => {
				// The handler only sends the session cookie on success, so a pending
				// record left behind here would be unreachable forever.
				if let Err(err) = self.store.discard_pending(session).await {
					warn!(session = %session, error = %err, "Discarding the orphaned pending flow failed.");
				}

				Err(AuthError::new(AuthErrorCode::SessionCreateFailed)
					.with_message(err.to_string()))
			},
		}
	}
}
