//! Normalized identity claims and typed token claim bags.
//!
//! [`IdentityClaims`] is the only upstream-specific data that crosses into the
//! broker-facing steps. The token claim bags are tagged by destination (access token
//! vs ID token) with explicit fields; a generic `extra` map exists only at the edges
//! for policy extensions.

// self
use crate::_prelude::*;

/// Normalized profile returned by an upstream identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
	/// Stable subject identifier at the upstream IdP.
	pub subject: String,
	/// Human-readable display name.
	pub display_name: String,
	/// Best-effort email address, already resolved through the provider's fallback
	/// chain. Empty only when the provider exposed no usable address at all.
	pub email: String,
}
impl IdentityClaims {
	/// Applies the email fallback chain: prefer the organizational mail field, fall
	/// back to the principal-name-style identifier. Neither being non-empty leaves
	/// the email empty, which downstream session checks treat as incomplete data.
	pub fn resolve_email(mail: &str, principal_name: &str) -> String {
		if !mail.is_empty() { mail.to_owned() } else { principal_name.to_owned() }
	}
}

/// Claims destined for broker-issued access tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
	/// Roles granted to the subject.
	pub roles: Vec<String>,
	/// Fine-grained permissions granted to the subject.
	pub permissions: Vec<String>,
	/// Policy-defined extension claims.
	#[serde(default, flatten, skip_serializing_if = "BTreeMap::is_empty")]
	pub extra: BTreeMap<String, serde_json::Value>,
}

/// Claims destined for broker-issued ID tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
	/// Subject identifier, always present.
	pub sub: String,
	/// Email address, when known at consent time.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Display name, when known at consent time.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Policy-defined extension claims.
	#[serde(default, flatten, skip_serializing_if = "BTreeMap::is_empty")]
	pub extra: BTreeMap<String, serde_json::Value>,
}

/// The two independent claim bags attached to an accepted consent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSessionClaims {
	/// Claims embedded into the access token.
	pub access_token: AccessTokenClaims,
	/// Claims embedded into the ID token.
	pub id_token: IdTokenClaims,
}
