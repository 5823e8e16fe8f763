//! Shared fixtures for the flow integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use axum::{
	Router,
	body::Body,
	http::{Request, Response, header},
};
use httpmock::MockServer;
use tower::ServiceExt;
use url::Url;
// self
use idp_bridge::{
	config::ProviderConfig,
	flows::Orchestrator,
	gateway::{self, BrokerGateway, GraphProvider, ProviderRegistry},
	http::{AppState, SESSION_COOKIE, router},
	store::{FlowStateStore, MemoryStore},
};

pub const CLIENT_ID: &str = "bridge-client";

/// A fully wired bridge pointed at two mock servers.
pub struct TestBridge {
	pub broker: MockServer,
	pub upstream: MockServer,
	pub store: Arc<MemoryStore>,
	pub app: Router,
}

pub async fn bridge() -> TestBridge {
	let broker = MockServer::start_async().await;
	let upstream = MockServer::start_async().await;
	let provider_config = ProviderConfig {
		client_id: CLIENT_ID.into(),
		client_secret: "s3cret".into(),
		redirect_url: Url::parse("http://bridge.test/auth/callback")
			.expect("Redirect URL fixture should parse."),
		scopes: vec!["openid".into(), "profile".into(), "email".into()],
		authorization_endpoint: Url::parse(&upstream.url("/authorize"))
			.expect("Mock authorization endpoint should parse."),
		token_endpoint: Url::parse(&upstream.url("/token"))
			.expect("Mock token endpoint should parse."),
		profile_endpoint: Url::parse(&upstream.url("/me"))
			.expect("Mock profile endpoint should parse."),
	};
	let http_client =
		gateway::gateway_http_client().expect("Gateway HTTP client should build.");
	let broker_gateway = Arc::new(BrokerGateway::new(
		Url::parse(&broker.url("/")).expect("Mock broker URL should parse."),
		http_client.clone(),
	));
	let providers = ProviderRegistry::new()
		.register(Arc::new(GraphProvider::new(provider_config, http_client)));
	let store = Arc::new(MemoryStore::new());
	let orchestrator =
		Orchestrator::new(broker_gateway, providers, store.clone() as Arc<dyn FlowStateStore>);
	let app = router(AppState { orchestrator, secure_cookies: false });

	TestBridge { broker, upstream, store, app }
}

impl TestBridge {
	pub async fn get(&self, uri: &str, sid: Option<&str>) -> Response<Body> {
		self.request("GET", uri, sid).await
	}

	pub async fn post(&self, uri: &str, sid: Option<&str>) -> Response<Body> {
		self.request("POST", uri, sid).await
	}

	async fn request(&self, method: &str, uri: &str, sid: Option<&str>) -> Response<Body> {
		let mut request = Request::builder().method(method).uri(uri);

		if let Some(sid) = sid {
			request = request.header(header::COOKIE, format!("{SESSION_COOKIE}={sid}"));
		}

		self.app
			.clone()
			.oneshot(request.body(Body::empty()).expect("Request fixture should build."))
			.await
			.expect("The router should always produce a response.")
	}
}

/// Reads the full body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("The response body should be readable.");

	serde_json::from_slice(&bytes).expect("The response body should be JSON.")
}

/// Extracts the session identifier minted by a `Set-Cookie` header.
pub fn minted_session(response: &Response<Body>) -> Option<String> {
	let cookie = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
	let (name, rest) = cookie.split_once('=')?;

	(name == SESSION_COOKIE).then(|| rest.split(';').next().unwrap_or(rest).to_owned())
}

/// Extracts the redirect target of a 302 response.
pub fn redirect_target(response: &Response<Body>) -> Url {
	let location = response
		.headers()
		.get(header::LOCATION)
		.expect("A redirect response should carry a Location header.")
		.to_str()
		.expect("The Location header should be valid UTF-8.");

	Url::parse(location).expect("The Location header should be an absolute URL.")
}
