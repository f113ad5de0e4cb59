//! Credential identifiers, redacted secrets, and session payloads.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
