//! Observability helpers for bridge flows.
//!
//! Every flow runs inside a structured span named `idp_bridge.flow` carrying the
//! `flow` (kind) and `stage` (call site) fields. Enable the `metrics` feature to also
//! increment the `idp_bridge_flow_total` counter for every attempt/success/failure,
//! labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Broker login challenge handling and upstream redirect.
	Login,
	/// Upstream callback: exchange, profile fetch, login acceptance.
	Callback,
	/// Broker consent challenge handling.
	Consent,
	/// Session introspection and termination endpoints.
	Session,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Login => "login",
			FlowKind::Callback => "callback",
			FlowKind::Consent => "consent",
			FlowKind::Session => "session",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow handler.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
