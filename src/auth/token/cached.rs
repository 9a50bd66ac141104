//! Cached bearer tokens and the expiry arithmetic applied on every refresh.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Margin subtracted from the issuer's lifetime so a token is never used as it expires
/// mid-flight.
pub const SAFETY_BUFFER: Duration = Duration::minutes(5);

/// Bearer token held by the cache together with its absolute expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
	/// Bearer credential; callers must avoid logging it.
	pub token: TokenSecret,
	/// Instant the token response was received.
	pub issued_at: OffsetDateTime,
	/// Instant at and after which the token is treated as invalid.
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Builds a cached token from an `expires_in` lifetime:
	/// `expires_at = issued_at + expires_in - safety_buffer`.
	///
	/// If that instant is out of the representable range the token expires at
	/// `issued_at`.
	pub fn from_lifetime(
		token: TokenSecret,
		issued_at: OffsetDateTime,
		expires_in: Duration,
		safety_buffer: Duration,
	) -> Self {
		let expires_at = issued_at
			.checked_add(expires_in)
			.and_then(|deadline| deadline.checked_sub(safety_buffer))
			.unwrap_or(issued_at);

		Self { token, issued_at, expires_at }
	}

	/// Returns `true` if the token can no longer be served at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` if the token can be served at `instant`.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		!self.is_expired_at(instant)
	}

	/// Remaining validity at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for CachedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedToken")
			.field("token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
