// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing how token requests were served.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	refreshes: AtomicU64,
	cache_hits: AtomicU64,
	joins: AtomicU64,
	failures: AtomicU64,
	clears: AtomicU64,
}
impl RefreshMetrics {
	/// Number of refreshes started (one per token endpoint request).
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Number of requests served from the cache.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Number of requests that joined a refresh already in flight.
	pub fn joins(&self) -> u64 {
		self.joins.load(Ordering::Relaxed)
	}

	/// Number of refreshes that failed.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Number of `clear_token` calls.
	pub fn clears(&self) -> u64 {
		self.clears.load(Ordering::Relaxed)
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_join(&self) {
		self.joins.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_clear(&self) {
		self.clears.fetch_add(1, Ordering::Relaxed);
	}
}
