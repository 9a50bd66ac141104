//! Extension contracts for attaching issued tokens to outbound requests.

pub mod request_signer;

pub use request_signer::*;
