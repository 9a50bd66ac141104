//! In-flight refresh registry: at most one shared refresh per [`CacheKey`].

// crates.io
use futures::future::{BoxFuture, Shared};
// self
use crate::{_prelude::*, auth::TokenSecret, error::TokenRefreshError, store::CacheKey};

/// Value every caller of a shared refresh resolves to.
pub type RefreshOutcome = Result<TokenSecret, TokenRefreshError>;
/// Cloneable handle to a refresh; every clone observes the same outcome.
pub type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Map from cache key to the refresh currently running for it.
#[derive(Default)]
pub struct InFlightRefreshes(HashMap<CacheKey, SharedRefresh>);
impl InFlightRefreshes {
	/// Returns a handle to the refresh running for `key`, if any.
	pub fn join(&self, key: &CacheKey) -> Option<SharedRefresh> {
		self.0.get(key).cloned()
	}

	/// Records `refresh` as the refresh for `key`.
	///
	/// Callers must check [`join`](Self::join) under the same lock first; an existing
	/// registration is returned instead of being replaced.
	pub fn register(&mut self, key: CacheKey, refresh: SharedRefresh) -> SharedRefresh {
		self.0.entry(key).or_insert(refresh).clone()
	}

	/// Drops the registration for `key` once its refresh has settled.
	pub fn settle(&mut self, key: &CacheKey) {
		self.0.remove(key);
	}

	/// Returns true if a refresh is running for `key`.
	pub fn contains(&self, key: &CacheKey) -> bool {
		self.0.contains_key(key)
	}
}
impl Debug for InFlightRefreshes {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_set().entries(self.0.keys()).finish()
	}
}
