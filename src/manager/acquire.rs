//! `get_token`: serve from cache, join the in-flight refresh, or start one.
//!
//! The cache check, the in-flight check, and registration of a new refresh run under a
//! single lock acquisition, so two callers can never both decide to start a refresh for
//! the same key. The refresh future itself settles the in-flight entry and writes the
//! cache under that same lock once the token endpoint answers.

// crates.io
use futures::FutureExt;
// self
use crate::{
	_prelude::*,
	auth::{CachedToken, ClientCredentials, ServiceName, TokenSecret},
	http::TokenHttpClient,
	manager::TokenManager,
	oauth::{self, TransportErrorMapper},
	obs::{self, OpOutcome, OpSpan, TokenOp, obs_event},
	store::{CacheKey, SharedRefresh},
};

enum Acquired {
	Cached(TokenSecret),
	Pending(SharedRefresh),
}

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a valid bearer token for `service` + `credentials.client_id`.
	///
	/// A cached token is returned without suspending while `now < expires_at`. Otherwise
	/// the caller awaits the single refresh for the key, starting it if none is running.
	/// A failed refresh is reported to every caller that awaited it and leaves the cache
	/// untouched, so the next call starts a fresh attempt.
	pub async fn get_token(
		&self,
		service: &ServiceName,
		credentials: &ClientCredentials,
	) -> Result<TokenSecret> {
		const OP: TokenOp = TokenOp::Acquire;

		let span = OpSpan::new(OP, service.as_ref());

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let key = CacheKey::new(service, &credentials.client_id);

				match self.serve_join_or_start(key, credentials) {
					Acquired::Cached(token) => Ok(token),
					Acquired::Pending(refresh) => refresh.await.map_err(Error::from),
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(OP, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OP, OpOutcome::Failure),
		}

		result
	}

	fn serve_join_or_start(&self, key: CacheKey, credentials: &ClientCredentials) -> Acquired {
		let mut slots = self.slots.lock();
		let now = self.clock.now();

		if let Some(cached) = slots.cache.get_valid(&key, now) {
			self.metrics.record_cache_hit();
			obs::record_op_outcome(TokenOp::Acquire, OpOutcome::CacheHit);
			obs_event!(
				debug,
				client_id = %key.client_id,
				remaining_secs = cached.remaining_at(now).whole_seconds(),
				"Serving cached token."
			);

			return Acquired::Cached(cached.token.clone());
		}
		if let Some(refresh) = slots.in_flight.join(&key) {
			self.metrics.record_join();
			obs::record_op_outcome(TokenOp::Acquire, OpOutcome::Joined);
			obs_event!(debug, client_id = %key.client_id, "Joining in-flight token refresh.");

			return Acquired::Pending(refresh);
		}

		let refresh = self.refresh_future(key.clone(), credentials.clone());

		Acquired::Pending(slots.in_flight.register(key, refresh))
	}

	// The returned future is lazy; it runs once the first caller polls it, after the slot
	// lock has been released.
	fn refresh_future(&self, key: CacheKey, credentials: ClientCredentials) -> SharedRefresh {
		const OP: TokenOp = TokenOp::Refresh;

		let http_client = Arc::clone(&self.http_client);
		let mapper = Arc::clone(&self.transport_mapper);
		let clock = Arc::clone(&self.clock);
		let slots = Arc::clone(&self.slots);
		let metrics = Arc::clone(&self.metrics);
		let token_endpoint = self.config.token_endpoint.clone();
		let safety_buffer = self.config.safety_buffer;
		let span = OpSpan::new(OP, key.service.as_ref());
		let refresh = async move {
			#[cfg(feature = "tracing")]
			let started = std::time::Instant::now();

			metrics.record_refresh();
			obs::record_op_outcome(OP, OpOutcome::Attempt);
			obs_event!(info, client_id = %key.client_id, "Refreshing access token.");

			let outcome =
				oauth::request_token(&*http_client, &*mapper, &token_endpoint, &credentials).await;
			let mut slots = slots.lock();

			slots.in_flight.settle(&key);

			match outcome {
				Ok(response) => {
					let cached = CachedToken::from_lifetime(
						response.access_token.clone(),
						clock.now(),
						response.expires_in,
						safety_buffer,
					);

					slots.cache.insert(key.clone(), cached);
					obs::record_op_outcome(OP, OpOutcome::Success);
					obs_event!(
						info,
						client_id = %key.client_id,
						elapsed_ms = started.elapsed().as_millis() as u64,
						expires_in = response.expires_in.whole_seconds(),
						"Access token refreshed."
					);

					Ok(response.access_token)
				},
				Err(e) => {
					metrics.record_failure();
					obs::record_op_outcome(OP, OpOutcome::Failure);
					obs_event!(
						error,
						client_id = %key.client_id,
						elapsed_ms = started.elapsed().as_millis() as u64,
						error = %e,
						"Access token refresh failed."
					);

					Err(e)
				},
			}
		};

		span.instrument(refresh).boxed().shared()
	}
}
