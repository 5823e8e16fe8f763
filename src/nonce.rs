//! Per-flow replay nonces.

// crates.io
use rand::RngCore;
// self
use crate::_prelude::*;

const NONCE_BYTES: usize = 16;

/// 128-bit flow nonce, hex-encoded to 32 lowercase characters.
///
/// Generated once per Login and threaded through flow state to Callback, where it is
/// compared against the nonce claim echoed back by the upstream IdP. The value is
/// unlinkable across flows; nothing is derived from time or request data.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowNonce(String);
impl FlowNonce {
	/// Draws a fresh nonce from the OS-seeded CSPRNG.
	pub fn generate() -> Self {
		let mut bytes = [0_u8; NONCE_BYTES];

		rand::rng().fill_bytes(&mut bytes);

		Self(hex::encode(bytes))
	}

	/// Returns the hex-encoded value.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Constant-shape comparison against a value echoed back by the IdP.
	pub fn matches(&self, returned: &str) -> bool {
		self.0 == returned
	}
}
impl Display for FlowNonce {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn nonce_is_32_lowercase_hex_characters() {
		let nonce = FlowNonce::generate();

		assert_eq!(nonce.as_str().len(), 32);
		assert!(nonce.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
	}

	#[test]
	fn consecutive_nonces_never_repeat() {
		let first = FlowNonce::generate();
		let second = FlowNonce::generate();

		assert_ne!(first, second);
		assert!(first.matches(first.as_str()));
		assert!(!first.matches(second.as_str()));
	}
}
