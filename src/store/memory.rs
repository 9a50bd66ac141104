//! Token cache store: one [`CachedToken`] per [`CacheKey`].

// self
use crate::{_prelude::*, auth::CachedToken, store::CacheKey};

/// In-memory map from cache key to the most recently issued token.
#[derive(Clone, Debug, Default)]
pub struct TokenCache(HashMap<CacheKey, CachedToken>);
impl TokenCache {
	/// Returns the token for `key` if it is still valid at `now`.
	pub fn get_valid(&self, key: &CacheKey, now: OffsetDateTime) -> Option<&CachedToken> {
		self.0.get(key).filter(|cached| cached.is_valid_at(now))
	}

	/// Returns the token for `key` regardless of expiry.
	pub fn get(&self, key: &CacheKey) -> Option<&CachedToken> {
		self.0.get(key)
	}

	/// Stores `token`, replacing any previous token for the key.
	pub fn insert(&mut self, key: CacheKey, token: CachedToken) {
		self.0.insert(key, token);
	}

	/// Removes the token for `key`; absent keys are a no-op.
	pub fn remove(&mut self, key: &CacheKey) -> Option<CachedToken> {
		self.0.remove(key)
	}

	/// Number of cached tokens, expired ones included.
	pub(crate) fn len(&self) -> usize {
		self.0.len()
	}
}
