//! In-memory flow state store.

// self
use crate::{
	_prelude::*,
	auth::SessionId,
	store::{AuthSession, FlowStateStore, PendingFlow, StoreFuture},
};

// Pending state only has to survive one round trip through the upstream IdP;
// minutes-scale matches the broker's own challenge lifetime.
const PENDING_TTL: Duration = Duration::minutes(10);
// Authenticated records live as long as the broker's remember window.
const AUTH_TTL: Duration = Duration::hours(1);

#[derive(Clone, Debug)]
struct StampedPending {
	flow: PendingFlow,
	stored_at: OffsetDateTime,
}

#[derive(Clone, Debug, Default)]
struct SessionRecord {
	pending: Option<StampedPending>,
	auth: Option<AuthSession>,
}
impl SessionRecord {
	fn is_empty(&self) -> bool {
		self.pending.is_none() && self.auth.is_none()
	}
}

/// Process-local store backed by a [`RwLock`]ed map.
///
/// Suits single-instance deployments; the [`FlowStateStore`] seam exists so shared
/// backends can replace it without touching the flows. Expiry is lazy: reads treat
/// stale entries as absent, and writes sweep them out so abandoned flows cannot
/// grow the map without bound. Lock sections only move already-built values, so
/// nothing slow ever runs under the lock.
#[derive(Debug)]
pub struct MemoryStore {
	sessions: RwLock<HashMap<SessionId, SessionRecord>>,
	pending_ttl: Duration,
	auth_ttl: Duration,
}
impl MemoryStore {
	/// Creates an empty store with the default lifetimes.
	pub fn new() -> Self {
		Self::with_ttls(PENDING_TTL, AUTH_TTL)
	}

	/// Creates an empty store with explicit pending and authenticated lifetimes.
	pub fn with_ttls(pending_ttl: Duration, auth_ttl: Duration) -> Self {
		Self { sessions: RwLock::new(HashMap::new()), pending_ttl, auth_ttl }
	}

	fn expire(&self, record: &mut SessionRecord, now: OffsetDateTime) {
		if record.pending.as_ref().is_some_and(|p| now - p.stored_at >= self.pending_ttl) {
			record.pending = None;
		}
		if record.auth.as_ref().is_some_and(|a| now - a.authenticated >= self.auth_ttl) {
			record.auth = None;
		}
	}

	fn sweep(&self, sessions: &mut HashMap<SessionId, SessionRecord>, now: OffsetDateTime) {
		sessions.retain(|_, record| {
			self.expire(record, now);

			!record.is_empty()
		});
	}
}
impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}
impl FlowStateStore for MemoryStore {
	fn save_pending<'a>(&'a self, session: &'a SessionId, flow: PendingFlow) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let mut sessions = self.sessions.write();

			self.sweep(&mut sessions, now);
			sessions.entry(session.clone()).or_default().pending =
				Some(StampedPending { flow, stored_at: now });

			Ok(())
		})
	}

	fn fetch_pending<'a>(
		&'a self,
		session: &'a SessionId,
	) -> StoreFuture<'a, Option<PendingFlow>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let mut sessions = self.sessions.write();
			let Some(record) = sessions.get_mut(session.as_ref()) else {
				return Ok(None);
			};

			self.expire(record, now);

			let pending = record.pending.as_ref().map(|p| p.flow.clone());

			if record.is_empty() {
				sessions.remove(session.as_ref());
			}

			Ok(pending)
		})
	}

	fn discard_pending<'a>(&'a self, session: &'a SessionId) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut sessions = self.sessions.write();

			if let Some(record) = sessions.get_mut(session.as_ref()) {
				record.pending = None;

				if record.is_empty() {
					sessions.remove(session.as_ref());
				}
			}

			Ok(())
		})
	}

	fn promote<'a>(&'a self, session: &'a SessionId, auth: AuthSession) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut sessions = self.sessions.write();
			let record = sessions.entry(session.clone()).or_default();

			record.pending = None;
			record.auth = Some(auth);

			Ok(())
		})
	}

	fn fetch_auth<'a>(&'a self, session: &'a SessionId) -> StoreFuture<'a, Option<AuthSession>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let mut sessions = self.sessions.write();
			let Some(record) = sessions.get_mut(session.as_ref()) else {
				return Ok(None);
			};

			self.expire(record, now);

			let auth = record.auth.clone();

			if record.is_empty() {
				sessions.remove(session.as_ref());
			}

			Ok(auth)
		})
	}

	fn clear<'a>(&'a self, session: &'a SessionId) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.sessions.write().remove(session.as_ref());

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{auth::LoginChallenge, gateway::ProviderKind, nonce::FlowNonce};

	fn session_id(value: &str) -> SessionId {
		SessionId::new(value).expect("Session fixture should be valid.")
	}

	fn pending() -> PendingFlow {
		PendingFlow {
			login_challenge: LoginChallenge::new("lc-1")
				.expect("Challenge fixture should be valid."),
			provider: ProviderKind::Microsoft,
			nonce: FlowNonce::generate(),
		}
	}

	fn auth() -> AuthSession {
		AuthSession {
			subject: "u1".into(),
			email: "u1@corp.example".into(),
			name: "Ada".into(),
			provider: ProviderKind::Microsoft,
			access_token: Some("at".into()),
			refresh_token: None,
			authenticated: OffsetDateTime::now_utc(),
		}
	}

	#[tokio::test]
	async fn pending_state_round_trips_per_session() {
		let store = MemoryStore::new();
		let sid = session_id("sid-1");
		let other = session_id("sid-2");
		let flow = pending();

		store.save_pending(&sid, flow.clone()).await.expect("Save should succeed.");

		let fetched = store.fetch_pending(&sid).await.expect("Fetch should succeed.");

		assert_eq!(fetched, Some(flow));
		assert_eq!(store.fetch_pending(&other).await.expect("Fetch should succeed."), None);
	}

	#[tokio::test]
	async fn promote_clears_pending_and_installs_auth() {
		let store = MemoryStore::new();
		let sid = session_id("sid-1");

		store.save_pending(&sid, pending()).await.expect("Save should succeed.");
		store.promote(&sid, auth()).await.expect("Promote should succeed.");

		assert_eq!(store.fetch_pending(&sid).await.expect("Fetch should succeed."), None);

		let record = store
			.fetch_auth(&sid)
			.await
			.expect("Fetch should succeed.")
			.expect("Auth record should exist after promotion.");

		assert_eq!(record.subject, "u1");
	}

	#[tokio::test]
	async fn clear_removes_all_session_state() {
		let store = MemoryStore::new();
		let sid = session_id("sid-1");

		store.save_pending(&sid, pending()).await.expect("Save should succeed.");
		store.promote(&sid, auth()).await.expect("Promote should succeed.");
		store.clear(&sid).await.expect("Clear should succeed.");

		assert_eq!(store.fetch_pending(&sid).await.expect("Fetch should succeed."), None);
		assert_eq!(store.fetch_auth(&sid).await.expect("Fetch should succeed."), None);
	}

	#[tokio::test]
	async fn discard_pending_leaves_the_auth_record_in_place() {
		let store = MemoryStore::new();
		let sid = session_id("sid-1");

		store.promote(&sid, auth()).await.expect("Promote should succeed.");
		store.save_pending(&sid, pending()).await.expect("Save should succeed.");
		store.discard_pending(&sid).await.expect("Discard should succeed.");

		assert_eq!(store.fetch_pending(&sid).await.expect("Fetch should succeed."), None);
		assert!(
			store
				.fetch_auth(&sid)
				.await
				.expect("Fetch should succeed.")
				.is_some()
		);

		// Discarding the only state drops the whole entry.
		let orphan = session_id("sid-2");

		store.save_pending(&orphan, pending()).await.expect("Save should succeed.");
		store.discard_pending(&orphan).await.expect("Discard should succeed.");

		assert!(!store.sessions.read().contains_key("sid-2"));
	}

	#[tokio::test]
	async fn expired_pending_state_reads_as_absent() {
		let store = MemoryStore::with_ttls(Duration::ZERO, AUTH_TTL);
		let sid = session_id("sid-1");

		store.save_pending(&sid, pending()).await.expect("Save should succeed.");

		assert_eq!(store.fetch_pending(&sid).await.expect("Fetch should succeed."), None);
		assert!(!store.sessions.read().contains_key("sid-1"));
	}

	#[tokio::test]
	async fn expired_auth_reads_as_absent() {
		let store = MemoryStore::with_ttls(PENDING_TTL, Duration::ZERO);
		let sid = session_id("sid-1");

		store.promote(&sid, auth()).await.expect("Promote should succeed.");

		assert_eq!(store.fetch_auth(&sid).await.expect("Fetch should succeed."), None);
		assert!(!store.sessions.read().contains_key("sid-1"));
	}

	#[tokio::test]
	async fn writes_sweep_abandoned_sessions() {
		let store = MemoryStore::with_ttls(Duration::ZERO, Duration::ZERO);

		for n in 0..8 {
			let sid = session_id(&format!("abandoned-{n}"));

			store.save_pending(&sid, pending()).await.expect("Save should succeed.");
		}

		// Every earlier entry expired the moment it was written; each new write
		// sweeps them, so only the freshest record remains.
		assert_eq!(store.sessions.read().len(), 1);
	}
}
