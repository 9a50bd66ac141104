//! Bearer token models: redacted secrets and cached tokens with absolute expiry.

pub mod cached;
pub mod secret;
