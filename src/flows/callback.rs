//! Callback transition: upstream code exchange, profile fetch, login acceptance.

// crates.io
use tracing::warn;
// self
use crate::{
	_prelude::*,
	auth::SessionId,
	error::AuthErrorCode,
	flows::Orchestrator,
	gateway::broker::LoginAcceptance,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::AuthSession,
};

impl Orchestrator {
	/// Handles the upstream redirect back and returns the broker continuation URL.
	///
	/// Consumes the session's pending flow exactly once; a replayed or forged
	/// callback finds no pending state and is rejected.
	pub async fn callback(
		&self,
		session: &SessionId,
		code: Option<&str>,
		state: Option<&str>,
	) -> AuthResult<Url> {
		const KIND: FlowKind = FlowKind::Callback;

		let span = FlowSpan::new(KIND, "callback");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.callback_inner(session, code, state)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn callback_inner(
		&self,
		session: &SessionId,
		code: Option<&str>,
		state: Option<&str>,
	) -> AuthResult<Url> {
		let code = code.filter(|c| !c.is_empty()).ok_or_else(|| {
			AuthError::new(AuthErrorCode::InvalidState)
				.with_message("The code query parameter is required.")
				.with_details(serde_json::json!({ "parameter": "code" }))
		})?;
		// A store failure reads the same as absent state: the callback cannot be
		// correlated, so it is rejected rather than retried.
		let pending = self
			.store
			.fetch_pending(session)
			.await
			.map_err(|err| {
				warn!(error = %err, "Flow state read failed during callback.");

				AuthError::new(AuthErrorCode::SessionNotFound)
					.with_message("No pending login flow exists for this session.")
			})?
			.ok_or_else(|| {
				AuthError::new(AuthErrorCode::SessionNotFound)
					.with_message("No pending login flow exists for this session.")
			})?;

		if state.unwrap_or_default() != pending.login_challenge.as_ref() {
			return Err(AuthError::new(AuthErrorCode::InvalidState)
				.with_message("The returned state does not match the pending login flow.")
				.with_details(serde_json::json!({ "parameter": "state", "reason": "mismatch" })));
		}

		let provider = self.providers.get(pending.provider).ok_or_else(|| {
			AuthError::new(AuthErrorCode::ProviderNotSupported)
				.with_message("The pending flow references an unregistered provider.")
		})?;
		let token = provider.exchange_code(code).await.map_err(|err| {
			warn!(provider = %pending.provider, error = %err, "Upstream code exchange failed.");

			AuthError::new(AuthErrorCode::UpstreamExchangeFailed)
				.with_message("The upstream token exchange was refused.")
		})?;

		if let Some(returned) = token.nonce_claim()
			&& !pending.nonce.matches(&returned)
		{
			return Err(AuthError::new(AuthErrorCode::InvalidState)
				.with_message("The ID token nonce does not match the pending login flow.")
				.with_details(serde_json::json!({ "parameter": "nonce", "reason": "mismatch" })));
		}

		let claims = provider.fetch_profile(&token.access_token).await.map_err(|err| {
			warn!(provider = %pending.provider, error = %err, "Upstream profile fetch failed.");

			AuthError::new(AuthErrorCode::UpstreamProfileFailed)
				.with_message("The upstream profile could not be fetched.")
		})?;
		let acceptance = LoginAcceptance::remembered(claims.subject.clone());
		let reply =
			self.broker.accept_login(&pending.login_challenge, &acceptance).await.map_err(
				|err| {
					warn!(challenge = %pending.login_challenge, error = %err, "Broker login acceptance failed.");

					AuthError::new(AuthErrorCode::BrokerAcceptFailed)
						.with_message("The broker refused the login acceptance.")
				},
			)?;
		let auth = AuthSession {
			subject: claims.subject,
			email: claims.email,
			name: claims.display_name,
			provider: pending.provider,
			access_token: reply.access_token.clone(),
			refresh_token: reply.refresh_token.clone(),
			authenticated: OffsetDateTime::now_utc(),
		};

		self.store.promote(session, auth).await.map_err(|err| {
			AuthError::new(AuthErrorCode::SessionCreateFailed).with_message(err.to_string())
		})?;

		Url::parse(&reply.redirect_to).map_err(|err| {
			AuthError::new(AuthErrorCode::BrokerAcceptFailed)
				.with_message(format!("The broker returned an unusable redirect target: {err}."))
		})
	}
}
