//! Login, callback, consent, and session flow orchestration.
//!
//! [`Orchestrator`] owns handles to the broker gateway, the provider registry, and
//! the flow state store; the per-transition logic lives in the submodules as `impl`
//! blocks. Every transition is one inbound request's unit of work with no
//! cross-request locking; the store is the only shared mutable state.

pub mod callback;
pub mod consent;
pub mod login;
pub mod session;

pub use session::CurrentUser;

// self
use crate::{
	_prelude::*,
	auth::{AccessTokenClaims, ConsentSessionClaims, IdTokenClaims},
	gateway::{
		BrokerGateway, ProviderRegistry,
		broker::{ConsentGrant, ConsentSession},
	},
	store::{AuthSession, FlowStateStore},
};

/// Coordinates the three broker-driven transitions for a single provider set.
///
/// Gateway clients and the store are injected at construction and shared across
/// requests; the orchestrator itself keeps no per-flow state in process memory.
#[derive(Clone)]
pub struct Orchestrator {
	/// Broker admin API client.
	pub broker: Arc<BrokerGateway>,
	/// Registered upstream provider strategies.
	pub providers: ProviderRegistry,
	/// Flow state persistence backend.
	pub store: Arc<dyn FlowStateStore>,
	/// Policy deciding what an accepted consent grants.
	pub policy: Arc<dyn ConsentPolicy>,
}
impl Orchestrator {
	/// Creates an orchestrator with the default consent policy.
	pub fn new(
		broker: Arc<BrokerGateway>,
		providers: ProviderRegistry,
		store: Arc<dyn FlowStateStore>,
	) -> Self {
		Self { broker, providers, store, policy: Arc::new(DefaultConsentPolicy) }
	}

	/// Replaces the consent policy.
	pub fn with_policy(mut self, policy: Arc<dyn ConsentPolicy>) -> Self {
		self.policy = policy;

		self
	}
}
impl Debug for Orchestrator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Orchestrator").field("providers", &self.providers).finish()
	}
}

/// Extension point deciding what an accepted consent grants.
///
/// The state machine fixes when consent is accepted; what it grants (scopes,
/// audiences, claim bags) is policy.
pub trait ConsentPolicy
where
	Self: Send + Sync,
{
	/// Builds the grant body for a pending consent session.
	///
	/// `auth` is the browser session's authenticated record when one exists; the
	/// consent request may legally arrive on a different instance or session, so
	/// policies must tolerate its absence.
	fn build_grant(
		&self,
		session: &ConsentSession,
		auth: Option<&AuthSession>,
	) -> ConsentGrant;
}

/// Default policy: grant exactly what was requested, remember for one hour.
///
/// Access tokens carry a default role and permission set; ID tokens carry the
/// subject plus email and name when the authenticated record supplies them.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConsentPolicy;
impl ConsentPolicy for DefaultConsentPolicy {
	fn build_grant(
		&self,
		session: &ConsentSession,
		auth: Option<&AuthSession>,
	) -> ConsentGrant {
		const REMEMBER_FOR_SECS: i64 = 3_600;

		let access_token = AccessTokenClaims {
			roles: vec!["user".into()],
			permissions: vec!["read:profile".into(), "write:profile".into()],
			extra: BTreeMap::new(),
		};
		let id_token = IdTokenClaims {
			sub: session.subject.clone(),
			email: auth.map(|a| a.email.clone()).filter(|e| !e.is_empty()),
			name: auth.map(|a| a.name.clone()).filter(|n| !n.is_empty()),
			extra: BTreeMap::new(),
		};

		ConsentGrant {
			grant_scope: session.requested_scope.clone(),
			grant_access_token_audience: session.requested_access_token_audience.clone(),
			remember: true,
			remember_for: REMEMBER_FOR_SECS,
			session: ConsentSessionClaims { access_token, id_token },
		}
	}
}
