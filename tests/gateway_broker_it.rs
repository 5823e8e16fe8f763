// crates.io
use httpmock::prelude::*;
use url::Url;
// self
use idp_bridge::{
	auth::{ConsentChallenge, LoginChallenge},
	gateway::{self, BrokerGateway, GatewayError, broker::FlowRejection},
};

fn gateway_for(server: &MockServer) -> BrokerGateway {
	BrokerGateway::new(
		Url::parse(&server.url("/")).expect("Mock broker URL should parse."),
		gateway::gateway_http_client().expect("Gateway HTTP client should build."),
	)
}

fn login_challenge(value: &str) -> LoginChallenge {
	LoginChallenge::new(value).expect("Challenge fixture should be valid.")
}

#[tokio::test]
async fn non_success_replies_preserve_status_and_body() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/admin/oauth2/auth/requests/login");
			then.status(410).body("challenge already handled");
		})
		.await;

	let err = gateway
		.login_session(&login_challenge("c1"))
		.await
		.expect_err("A 410 reply should surface as an error.");

	let GatewayError::Status { endpoint, status, body } = err else {
		panic!("A non-success reply should map to the status variant.");
	};

	assert!(endpoint.contains("/admin/oauth2/auth/requests/login"));
	assert_eq!(status, 410);
	assert_eq!(body, "challenge already handled");
}

#[tokio::test]
async fn malformed_replies_surface_as_decode_errors_with_a_path() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/admin/oauth2/auth/requests/login");
			// `challenge` must be a string; the decode path should say so.
			then.status(200).json_body(serde_json::json!({ "challenge": 42 }));
		})
		.await;

	let err = gateway
		.login_session(&login_challenge("c1"))
		.await
		.expect_err("A malformed reply should surface as an error.");

	let GatewayError::Decode { source, .. } = err else {
		panic!("A garbled body should map to the decode variant.");
	};

	assert_eq!(source.path().to_string(), "challenge");
}

#[tokio::test]
async fn accept_login_sends_the_remember_window() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server);
	let accept = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path("/admin/oauth2/auth/requests/login/accept")
				.query_param("login_challenge", "c1")
				.header("content-type", "application/json")
				.json_body(serde_json::json!({
					"subject": "u1",
					"remember": true,
					"remember_for": 3600,
				}));
			then.status(200).json_body(serde_json::json!({
				"redirect_to": "http://broker.test/continue",
			}));
		})
		.await;
	let reply = gateway
		.accept_login(
			&login_challenge("c1"),
			&idp_bridge::gateway::broker::LoginAcceptance::remembered("u1"),
		)
		.await
		.expect("The acceptance should succeed.");

	accept.assert_async().await;

	assert_eq!(reply.redirect_to, "http://broker.test/continue");
	assert_eq!(reply.access_token, None);
}

#[tokio::test]
async fn reject_consent_carries_the_oauth_error_document() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server);
	let reject = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path("/admin/oauth2/auth/requests/consent/reject")
				.query_param("consent_challenge", "cc1")
				.json_body(serde_json::json!({
					"error": "access_denied",
					"error_description": "The subject declined.",
				}));
			then.status(200).json_body(serde_json::json!({
				"redirect_to": "http://broker.test/rejected",
			}));
		})
		.await;
	let challenge = ConsentChallenge::new("cc1").expect("Challenge fixture should be valid.");
	let reply = gateway
		.reject_consent(&challenge, &FlowRejection::access_denied("The subject declined."))
		.await
		.expect("The rejection should succeed.");

	reject.assert_async().await;

	assert_eq!(reply.redirect_to, "http://broker.test/rejected");
}

#[tokio::test]
async fn introspection_posts_the_token_as_a_form() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server);
	let introspect = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/admin/oauth2/introspect")
				.header("content-type", "application/x-www-form-urlencoded")
				.body("token=broker-at");
			then.status(200).json_body(serde_json::json!({
				"active": true,
				"sub": "u1",
				"iat": 1_700_000_000,
				"exp": 1_700_003_600,
				"scope": "openid profile",
			}));
		})
		.await;
	let introspection =
		gateway.introspect("broker-at").await.expect("The introspection should succeed.");

	introspect.assert_async().await;

	assert!(introspection.active);
	assert_eq!(introspection.sub, "u1");
	assert_eq!(introspection.scope, "openid profile");

	let empty = gateway.introspect("").await.expect_err("An empty token should be rejected.");

	assert!(matches!(empty, GatewayError::MissingParameter { parameter: "token" }));
}
