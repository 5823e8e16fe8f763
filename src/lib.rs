//! Browser sign-in bridge between an OAuth2/OIDC authorization broker and an upstream
//! identity provider: login, callback, and consent orchestration in one deployable service.
//!
//! The crate wires four collaborators together:
//!
//! - a [`gateway::BrokerGateway`] speaking the broker's admin API (login/consent
//!   challenges, token introspection),
//! - an [`gateway::IdentityProvider`] per upstream IdP, selected through a
//!   [`gateway::ProviderRegistry`] lookup table,
//! - a [`store::FlowStateStore`] that carries ephemeral flow state across the external
//!   redirect and owns the authenticated session afterwards,
//! - the [`flows::Orchestrator`], which sequences the three HTTP-triggered transitions
//!   (Login, Callback, Consent) and classifies every failure into the closed
//!   [`error::AuthErrorCode`] taxonomy.
//!
//! [`http::router`] exposes the whole machine as an axum service.

#![deny(clippy::all, missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod gateway;
pub mod http;
pub mod nonce;
pub mod obs;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{AuthError, AuthResult};
}

pub use url;
