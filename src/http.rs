//! Inbound HTTP surface.
//!
//! Thin axum layer over [`Orchestrator`]: handlers parse query parameters and the
//! session cookie, delegate, and translate results into redirects or JSON. All
//! policy and sequencing lives in the flows; nothing here talks to the network.

// crates.io
use axum::{
	Json, Router,
	extract::{Query, State},
	http::{StatusCode, header},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use axum_extra::extract::{
	CookieJar,
	cookie::{Cookie, SameSite},
};
// self
use crate::{
	_prelude::*,
	auth::SessionId,
	error::AuthErrorCode,
	flows::{CurrentUser, Orchestrator},
};

/// Name of the browser session cookie.
pub const SESSION_COOKIE: &str = "idp_bridge_sid";

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
	/// Flow orchestrator.
	pub orchestrator: Orchestrator,
	/// Marks the session cookie `Secure`.
	pub secure_cookies: bool,
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/auth/login", get(login))
		.route("/auth/callback", get(callback))
		.route("/auth/consent", get(consent))
		.route("/auth/logout", post(logout))
		.route("/auth/me", get(me))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
struct LoginParams {
	login_challenge: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
	code: Option<String>,
	state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConsentParams {
	consent_challenge: Option<String>,
}

#[derive(Debug, Serialize)]
struct LogoutReply {
	message: &'static str,
	authenticated: bool,
}

/// 302 redirect; the flow contract fixes the status, so axum's 303/307 helpers do
/// not apply here.
#[derive(Clone, Debug)]
struct Found(Url);
impl IntoResponse for Found {
	fn into_response(self) -> Response {
		(StatusCode::FOUND, [(header::LOCATION, self.0.to_string())]).into_response()
	}
}

async fn login(
	State(state): State<AppState>,
	Query(params): Query<LoginParams>,
	jar: CookieJar,
) -> Result<(CookieJar, Found), AuthError> {
	// Reuse the browser's session when it already has one; mint otherwise so the
	// pending flow has a home before the redirect leaves our control.
	let session = session_from(&jar).unwrap_or_else(SessionId::generate);
	let target =
		state.orchestrator.login(&session, params.login_challenge.as_deref()).await?;
	let jar = jar.add(session_cookie(&session, state.secure_cookies));

	Ok((jar, Found(target)))
}

async fn callback(
	State(state): State<AppState>,
	Query(params): Query<CallbackParams>,
	jar: CookieJar,
) -> Result<Found, AuthError> {
	let session = session_from(&jar).ok_or_else(|| {
		AuthError::new(AuthErrorCode::SessionNotFound)
			.with_message("No session cookie accompanies the callback.")
	})?;
	let target = state
		.orchestrator
		.callback(&session, params.code.as_deref(), params.state.as_deref())
		.await?;

	Ok(Found(target))
}

async fn consent(
	State(state): State<AppState>,
	Query(params): Query<ConsentParams>,
	jar: CookieJar,
) -> Result<Found, AuthError> {
	// Consent may arrive on a session the store has never seen; an ephemeral
	// identifier keeps the lookup well-typed and simply finds nothing.
	let session = session_from(&jar).unwrap_or_else(SessionId::generate);
	let target =
		state.orchestrator.consent(&session, params.consent_challenge.as_deref()).await?;

	Ok(Found(target))
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<LogoutReply>) {
	if let Some(session) = session_from(&jar) {
		state.orchestrator.logout(&session).await;
	}

	let jar = jar.remove(clear_session_cookie());

	(jar, Json(LogoutReply { message: "Logged out.", authenticated: false }))
}

async fn me(State(state): State<AppState>, jar: CookieJar) -> Result<Json<CurrentUser>, AuthError> {
	let session = session_from(&jar).ok_or_else(|| {
		AuthError::new(AuthErrorCode::SessionExpired)
			.with_message("No authenticated session exists.")
	})?;
	let user = state.orchestrator.current_user(&session).await?;

	Ok(Json(user))
}

fn session_from(jar: &CookieJar) -> Option<SessionId> {
	// A cookie value that fails validation is treated the same as no cookie.
	jar.get(SESSION_COOKIE).and_then(|cookie| SessionId::new(cookie.value()).ok())
}

fn session_cookie(session: &SessionId, secure: bool) -> Cookie<'static> {
	Cookie::build((SESSION_COOKIE, session.to_string()))
		.http_only(true)
		.secure(secure)
		.same_site(SameSite::Lax)
		.path("/")
		.build()
}

fn clear_session_cookie() -> Cookie<'static> {
	Cookie::build((SESSION_COOKIE, "")).path("/").max_age(Duration::ZERO).build()
}
