//! Consent transition: grant construction and broker acceptance.

// crates.io
use tracing::warn;
// self
use crate::{
	_prelude::*,
	auth::{ConsentChallenge, SessionId},
	error::AuthErrorCode,
	flows::Orchestrator,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl Orchestrator {
	/// Handles an inbound consent challenge and returns the relying-app redirect.
	///
	/// This is the flow's terminal success transition: the returned URL hands the
	/// browser back to the original relying application with broker-issued tokens.
	pub async fn consent(
		&self,
		session: &SessionId,
		consent_challenge: Option<&str>,
	) -> AuthResult<Url> {
		const KIND: FlowKind = FlowKind::Consent;

		let span = FlowSpan::new(KIND, "consent");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.consent_inner(session, consent_challenge)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn consent_inner(
		&self,
		session: &SessionId,
		consent_challenge: Option<&str>,
	) -> AuthResult<Url> {
		// Missing challenge fails before any broker traffic.
		let challenge = consent_challenge
			.filter(|c| !c.is_empty())
			.ok_or_else(|| {
				AuthError::new(AuthErrorCode::InvalidState)
					.with_message("The consent_challenge query parameter is required.")
					.with_details(serde_json::json!({ "parameter": "consent_challenge" }))
			})
			.and_then(|raw| {
				ConsentChallenge::new(raw).map_err(|err| {
					AuthError::new(AuthErrorCode::InvalidState).with_message(err.to_string())
				})
			})?;
		let consent_session = self.broker.consent_session(&challenge).await.map_err(|err| {
			warn!(challenge = %challenge, error = %err, "Broker consent session lookup failed.");

			AuthError::new(AuthErrorCode::SessionNotFound)
				.with_message("The consent challenge is unknown to the broker.")
		})?;
		// The auth record only enriches claims; the consent may legally arrive on a
		// session the store has never seen.
		let auth = match self.store.fetch_auth(session).await {
			Ok(auth) => auth,
			Err(err) => {
				warn!(error = %err, "Flow state read failed during consent; granting without enrichment.");

				None
			},
		};
		let grant = self.policy.build_grant(&consent_session, auth.as_ref());
		let reply = self.broker.accept_consent(&challenge, &grant).await.map_err(|err| {
			warn!(challenge = %challenge, error = %err, "Broker consent acceptance failed.");

			AuthError::new(AuthErrorCode::BrokerAcceptFailed)
				.with_message("The broker refused the consent acceptance.")
		})?;

		Url::parse(&reply.redirect_to).map_err(|err| {
			AuthError::new(AuthErrorCode::BrokerAcceptFailed)
				.with_message(format!("The broker returned an unusable redirect target: {err}."))
		})
	}
}
