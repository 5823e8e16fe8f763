//! Flow state persistence contracts and built-in backends.
//!
//! The store keys everything by [`SessionId`]; each session holds at most one
//! pending flow (login issued, callback not yet seen) and at most one authenticated
//! record. Single-instance deployments use [`MemoryStore`]; shared backends plug in
//! behind [`FlowStateStore`].

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{LoginChallenge, SessionId},
	gateway::ProviderKind,
	nonce::FlowNonce,
};

/// Boxed future returned by store trait methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for browser session flow state.
pub trait FlowStateStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the pending flow for a session.
	fn save_pending<'a>(&'a self, session: &'a SessionId, flow: PendingFlow) -> StoreFuture<'a, ()>;

	/// Fetches the pending flow for a session, if one exists.
	fn fetch_pending<'a>(&'a self, session: &'a SessionId)
	-> StoreFuture<'a, Option<PendingFlow>>;

	/// Removes the pending flow while leaving any authenticated record in place.
	///
	/// Called when a login fails after the pending flow was written; the record must
	/// not outlive a flow that will never see its callback.
	fn discard_pending<'a>(&'a self, session: &'a SessionId) -> StoreFuture<'a, ()>;

	/// Atomically writes the authenticated record and clears the pending flow.
	///
	/// The pending state is single use; after promotion, a replayed callback finds
	/// nothing and fails.
	fn promote<'a>(&'a self, session: &'a SessionId, auth: AuthSession) -> StoreFuture<'a, ()>;

	/// Fetches the authenticated record for a session, if one exists.
	fn fetch_auth<'a>(&'a self, session: &'a SessionId) -> StoreFuture<'a, Option<AuthSession>>;

	/// Removes all state held for a session.
	fn clear<'a>(&'a self, session: &'a SessionId) -> StoreFuture<'a, ()>;
}

/// State written at login time and consumed exactly once at callback time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFlow {
	/// Broker challenge this flow answers; doubles as the outbound `state` value.
	pub login_challenge: LoginChallenge,
	/// Upstream provider the browser was sent to.
	pub provider: ProviderKind,
	/// Replay nonce threaded through the upstream round trip.
	pub nonce: FlowNonce,
}

/// Authenticated session record written by a successful callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
	/// Upstream subject identifier.
	pub subject: String,
	/// Resolved email address.
	pub email: String,
	/// Display name.
	pub name: String,
	/// Provider that authenticated the subject.
	pub provider: ProviderKind,
	/// Broker-issued access token from the login acceptance, when included.
	pub access_token: Option<String>,
	/// Broker-issued refresh token from the login acceptance, when included.
	pub refresh_token: Option<String>,
	/// Instant the callback completed.
	pub authenticated: OffsetDateTime,
}

/// Error type produced by [`FlowStateStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
