//! Optional observability helpers for token operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `token_warden.op` with the `op` and
//!   `service` fields, plus the events emitted by the token manager and the verifier.
//! - Enable `metrics` to increment the `token_warden_op_total` counter for every recorded
//!   outcome, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Token operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenOp {
	/// `get_token` call.
	Acquire,
	/// Network exchange against the token endpoint.
	Refresh,
	/// `clear_token` call.
	Clear,
	/// Address verification request.
	Verify,
}
impl TokenOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenOp::Acquire => "acquire",
			TokenOp::Refresh => "refresh",
			TokenOp::Clear => "clear",
			TokenOp::Verify => "verify",
		}
	}
}
impl Display for TokenOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Served from the cache without a network call.
	CacheHit,
	/// Joined a refresh already in flight.
	Joined,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::CacheHit => "cache_hit",
			OpOutcome::Joined => "joined",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
