mod common;

// crates.io
use axum::http::StatusCode;
// self
use common::{body_json, bridge};
use idp_bridge::{
	auth::SessionId,
	gateway::ProviderKind,
	store::{AuthSession, FlowStateStore},
};

const SID: &str = "sidsession0000000000000000000001";

fn auth_record(subject: &str, email: &str) -> AuthSession {
	AuthSession {
		subject: subject.into(),
		email: email.into(),
		name: "Ada Lovelace".into(),
		provider: ProviderKind::Microsoft,
		access_token: Some("broker-at".into()),
		refresh_token: None,
		authenticated: time::OffsetDateTime::now_utc(),
	}
}

async fn seed_auth(bridge: &common::TestBridge, record: AuthSession) {
	bridge
		.store
		.promote(&SessionId::new(SID).expect("Session fixture should be valid."), record)
		.await
		.expect("Seeding the authenticated record should succeed.");
}

#[tokio::test]
async fn me_without_a_session_is_unauthorized() {
	let bridge = bridge().await;
	let response = bridge.get("/auth/me", None).await;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(body_json(response).await["code"], "AUTH_SESSION_EXPIRED");

	let unknown_cookie = bridge.get("/auth/me", Some("neverseen000000001")).await;

	assert_eq!(unknown_cookie.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_with_an_incomplete_record_reports_missing_user_data() {
	let bridge = bridge().await;

	seed_auth(&bridge, auth_record("u1", "")).await;

	let response = bridge.get("/auth/me", Some(SID)).await;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	let payload = body_json(response).await;

	assert_eq!(payload["code"], "AUTH_SESSION_EXPIRED");
	assert_eq!(payload["details"]["reason"], "missing_user_data");
}

#[tokio::test]
async fn me_returns_the_authenticated_view() {
	let bridge = bridge().await;

	seed_auth(&bridge, auth_record("u1", "u1@example.com")).await;

	let response = bridge.get("/auth/me", Some(SID)).await;

	assert_eq!(response.status(), StatusCode::OK);

	let payload = body_json(response).await;

	assert_eq!(payload["user_id"], "u1");
	assert_eq!(payload["email"], "u1@example.com");
	assert_eq!(payload["name"], "Ada Lovelace");
	assert_eq!(payload["provider"], "microsoft");
	assert_eq!(payload["authenticated"], true);
}

#[tokio::test]
async fn logout_always_succeeds_and_invalidates_the_session() {
	let bridge = bridge().await;

	// Without any prior session.
	let response = bridge.post("/auth/logout", None).await;

	assert_eq!(response.status(), StatusCode::OK);

	let payload = body_json(response).await;

	assert_eq!(payload["authenticated"], false);

	// With an authenticated session.
	seed_auth(&bridge, auth_record("u1", "u1@example.com")).await;

	let response = bridge.post("/auth/logout", Some(SID)).await;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(body_json(response).await["authenticated"], false);

	let me = bridge.get("/auth/me", Some(SID)).await;

	assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}
