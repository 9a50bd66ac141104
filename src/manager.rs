//! Credential-scoped token manager.
//!
//! A [`TokenManager`] owns one cache slot and at most one in-flight refresh per
//! (service, client id) pair. [`TokenManager::get_token`] serves a cached token while it is
//! valid, joins a refresh that is already running, or starts a new one; every caller that
//! joins a refresh observes the same token or the same [`TokenRefreshError`]. Tokens are
//! treated as expired a fixed safety buffer before the issuer's `expires_in` elapses.
//!
//! The manager is an ordinary value. Wrap it in an [`Arc`] (or clone it; clones share
//! state) to use it from several tasks.

mod acquire;
mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{CachedToken, ClientId, SAFETY_BUFFER, ServiceName},
	clock::{Clock, SystemClock},
	error::ConfigError,
	http::TokenHttpClient,
	oauth::{MAX_EXPIRES_IN, TransportErrorMapper},
	obs::{self, OpOutcome, OpSpan, TokenOp, obs_event},
	store::{CacheKey, TokenSlots},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// USPS OAuth 2.0 token endpoint.
pub const USPS_TOKEN_ENDPOINT: &str = "https://apis.usps.com/oauth2/v3/token";
/// Largest accepted safety buffer; no issued lifetime can exceed it.
pub const MAX_SAFETY_BUFFER: Duration = Duration::seconds(MAX_EXPIRES_IN as i64);

#[cfg(feature = "reqwest")]
/// Token manager specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Settings fixed for the lifetime of a [`TokenManager`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenManagerConfig {
	/// Token endpoint every refresh is posted to.
	pub token_endpoint: Url,
	/// Margin subtracted from `expires_in` when computing expiry.
	pub safety_buffer: Duration,
	/// Overall timeout applied to the HTTP client built by [`TokenManager::new`].
	pub request_timeout: Option<std::time::Duration>,
}
impl TokenManagerConfig {
	/// Configuration for `token_endpoint` with the default safety buffer and no timeout.
	pub fn new(token_endpoint: Url) -> Self {
		Self { token_endpoint, safety_buffer: SAFETY_BUFFER, request_timeout: None }
	}

	/// Parses `token_endpoint` and builds a default configuration for it.
	pub fn from_endpoint(token_endpoint: &str) -> Result<Self, ConfigError> {
		ConfigError::parse_endpoint("token", token_endpoint).map(Self::new)
	}

	/// Default configuration pointed at [`USPS_TOKEN_ENDPOINT`].
	pub fn usps() -> Result<Self, ConfigError> {
		Self::from_endpoint(USPS_TOKEN_ENDPOINT)
	}

	/// Overrides the safety buffer, clamped to `0..=MAX_SAFETY_BUFFER`.
	pub fn with_safety_buffer(mut self, safety_buffer: Duration) -> Self {
		self.safety_buffer = safety_buffer.clamp(Duration::ZERO, MAX_SAFETY_BUFFER);

		self
	}

	/// Sets an overall request timeout for the default HTTP client.
	pub fn with_request_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}
}

/// Caches client-credentials tokens per service + client id and de-duplicates refreshes.
pub struct TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every token request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	config: TokenManagerConfig,
	clock: Arc<dyn Clock>,
	slots: Arc<Mutex<TokenSlots>>,
	metrics: Arc<RefreshMetrics>,
}
impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: TokenManagerConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			config,
			clock: Arc::new(SystemClock),
			slots: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Replaces the clock used for issue times and expiry checks.
	pub fn with_clock(mut self, clock: impl 'static + Clock) -> Self {
		self.clock = Arc::new(clock);

		self
	}

	/// Returns the manager's configuration.
	pub fn config(&self) -> &TokenManagerConfig {
		&self.config
	}

	/// Counters describing how requests were served.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Removes the cached token for `service` + `client_id`, if any.
	///
	/// Idempotent. A refresh already in flight for the key is not cancelled and will
	/// populate the cache when it succeeds.
	pub fn clear_token(&self, service: &ServiceName, client_id: &ClientId) {
		const OP: TokenOp = TokenOp::Clear;

		let _span = OpSpan::new(OP, service.as_ref()).entered();
		let key = CacheKey::new(service, client_id);

		if self.slots.lock().cache.remove(&key).is_some() {
			obs_event!(info, client_id = %client_id, "Cleared cached token.");
		} else {
			obs_event!(debug, client_id = %client_id, "No cached token to clear.");
		}

		self.metrics.record_clear();
		obs::record_op_outcome(OP, OpOutcome::Success);
	}

	/// Returns a copy of the cache entry for `service` + `client_id`, expired or not.
	pub fn cached(&self, service: &ServiceName, client_id: &ClientId) -> Option<CachedToken> {
		self.slots.lock().cache.get(&CacheKey::new(service, client_id)).cloned()
	}

	/// Returns `true` while a refresh is in flight for `service` + `client_id`.
	pub fn is_refreshing(&self, service: &ServiceName, client_id: &ClientId) -> bool {
		self.slots.lock().in_flight.contains(&CacheKey::new(service, client_id))
	}
}
#[cfg(feature = "reqwest")]
impl TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a manager with its own reqwest-backed transport.
	///
	/// The client disables redirects and applies
	/// [`TokenManagerConfig::request_timeout`] when set.
	pub fn new(config: TokenManagerConfig) -> Result<Self> {
		let http_client =
			ReqwestHttpClient::with_timeout(config.request_timeout).map_err(ConfigError::from)?;

		Ok(Self::with_http_client(config, http_client, ReqwestTransportErrorMapper))
	}
}
impl<C, M> Clone for TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: Arc::clone(&self.http_client),
			transport_mapper: Arc::clone(&self.transport_mapper),
			config: self.config.clone(),
			clock: Arc::clone(&self.clock),
			slots: Arc::clone(&self.slots),
			metrics: Arc::clone(&self.metrics),
		}
	}
}
impl<C, M> Debug for TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let slots = self.slots.lock();

		f.debug_struct("TokenManager")
			.field("config", &self.config)
			.field("clock", &self.clock)
			.field("cached", &slots.cache.len())
			.field("in_flight", &slots.in_flight)
			.finish()
	}
}
