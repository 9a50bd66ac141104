//! In-process token slots: the cache of issued tokens and the in-flight refresh registry.
//!
//! Both maps are keyed by [`CacheKey`] and only ever see point lookups. They carry no
//! locking of their own; the token manager keeps them together behind a single mutex so
//! the "serve, join, or start" decision and refresh settlement are each atomic.

pub mod in_flight;
pub mod memory;

pub use in_flight::{InFlightRefreshes, RefreshOutcome, SharedRefresh};
pub use memory::TokenCache;

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ServiceName},
};

/// Identifies one credential's token slot: service name + client id.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
	/// External service the token is issued for.
	pub service: ServiceName,
	/// Client identifier of the credential.
	pub client_id: ClientId,
}
impl CacheKey {
	/// Builds a key from its two components.
	pub fn new(service: &ServiceName, client_id: &ClientId) -> Self {
		Self { service: service.clone(), client_id: client_id.clone() }
	}
}
impl Debug for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "CacheKey({self})")
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}_{}", self.service, self.client_id)
	}
}

/// The two per-key maps owned by a token manager.
#[derive(Debug, Default)]
pub struct TokenSlots {
	/// Issued tokens.
	pub cache: TokenCache,
	/// Refreshes currently in progress.
	pub in_flight: InFlightRefreshes,
}
