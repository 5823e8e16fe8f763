//! Auth-domain identifiers and claim models.

pub mod claims;
pub mod id;

pub use claims::*;
pub use id::*;
