//! Strongly typed identifiers enforced across the bridge domain.

// std
use std::{borrow::Borrow, ops::Deref};
// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 256;
const SESSION_ID_LEN: usize = 32;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (session, login challenge, consent challenge).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (session, login challenge, consent challenge).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (session, login challenge, consent challenge).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { SessionId, "Key for one browser session in the flow state store.", "Session" }
def_id! { LoginChallenge, "Opaque broker-issued login challenge, single use.", "LoginChallenge" }
def_id! { ConsentChallenge, "Opaque broker-issued consent challenge, single use.", "ConsentChallenge" }

impl SessionId {
	/// Mints a fresh random session identifier for a browser without one.
	///
	/// The value is the cookie secret; the server-side store is the authority for
	/// everything referenced by it.
	pub fn generate() -> Self {
		let value: String =
			rand::rng().sample_iter(Alphanumeric).take(SESSION_ID_LEN).map(char::from).collect();

		Self(value)
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_empty_and_whitespace() {
		assert!(LoginChallenge::new("").is_err());
		assert!(LoginChallenge::new("challenge 1").is_err());
		assert!(ConsentChallenge::new(" c1").is_err());

		let challenge =
			LoginChallenge::new("c1").expect("Challenge fixture should be considered valid.");

		assert_eq!(challenge.as_ref(), "c1");
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let challenge: LoginChallenge = serde_json::from_str("\"challenge-42\"")
			.expect("Challenge should deserialize successfully.");

		assert_eq!(challenge.as_ref(), "challenge-42");
		assert!(serde_json::from_str::<LoginChallenge>("\"with space\"").is_err());
		assert!(serde_json::from_str::<ConsentChallenge>("\"\"").is_err());
	}

	#[test]
	fn length_limit_is_enforced() {
		let exact = "a".repeat(IDENTIFIER_MAX_LEN);

		SessionId::new(&exact).expect("Exact length should succeed.");

		let too_long = "a".repeat(IDENTIFIER_MAX_LEN + 1);

		assert!(SessionId::new(&too_long).is_err());
	}

	#[test]
	fn generated_session_ids_are_unique_and_sized() {
		let first = SessionId::generate();
		let second = SessionId::generate();

		assert_eq!(first.len(), SESSION_ID_LEN);
		assert_ne!(first, second);
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<SessionId, u8> = HashMap::from_iter([(
			SessionId::new("sid-123").expect("Session used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("sid-123"), Some(&7));
	}
}
