//! Credential-scoped OAuth 2.0 token cache: one cached bearer token per service + client id,
//! singleflight refreshes, and a USPS address-verification client that consumes it.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod ext;
pub mod http;
pub mod manager;
pub mod oauth;
pub mod obs;
pub mod store;
#[cfg(feature = "reqwest")] pub mod verify;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers shared by unit and integration tests; enabled via
	//! `cfg(test)` or the `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		io::Error as IoError,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// crates.io
	use futures::{
		FutureExt,
		channel::oneshot::{self, Receiver, Sender},
		future::Shared,
	};
	use oauth2::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode,
	};
	// self
	use crate::{
		auth::{ClientCredentials, ServiceName},
		http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
		manager::{TokenManager, TokenManagerConfig},
		oauth::{NetworkErrorMapper, ReqwestTransportErrorMapper},
	};

	/// Token manager type alias used by reqwest-backed integration tests.
	pub type ReqwestTestManager = TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;
	/// Token manager type alias driven by [`ScriptedTokenClient`].
	pub type ScriptedManager = TokenManager<ScriptedTokenClient, NetworkErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`TokenManager`] that talks to the provided token endpoint over reqwest.
	pub fn build_reqwest_test_manager(token_endpoint: &str) -> ReqwestTestManager {
		let config = TokenManagerConfig::from_endpoint(token_endpoint)
			.expect("Token endpoint fixture should parse.");

		TokenManager::with_http_client(
			config,
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		)
	}

	/// Constructs a [`TokenManager`] backed by a [`ScriptedTokenClient`].
	pub fn build_scripted_manager(client: &ScriptedTokenClient) -> ScriptedManager {
		let config = TokenManagerConfig::from_endpoint("https://auth.example.com/oauth2/v3/token")
			.expect("Token endpoint fixture should parse.");

		TokenManager::with_http_client(config, client.clone(), NetworkErrorMapper)
	}

	/// Service name fixture.
	pub fn usps() -> ServiceName {
		ServiceName::new("USPS").expect("Service fixture should be valid.")
	}

	/// Credentials fixture for the provided client id.
	pub fn credentials(client_id: &str) -> ClientCredentials {
		ClientCredentials::new(client_id, "consumer-secret", "addresses")
			.expect("Credentials fixture should be valid.")
	}

	/// Fake token transport that replays queued responses and counts requests.
	///
	/// A [`ScriptGate`] obtained from [`ScriptedTokenClient::hold`] parks every request until
	/// it is released, which lets tests pile callers onto a single in-flight refresh.
	#[derive(Clone, Default)]
	pub struct ScriptedTokenClient(Arc<ScriptState>);
	impl ScriptedTokenClient {
		/// Queues a raw response.
		pub fn push_response(&self, status: u16, body: impl Into<String>) -> &Self {
			self.0.responses.lock().push_back((status, body.into()));

			self
		}

		/// Queues a successful token response.
		pub fn push_token(&self, token: &str, expires_in: u64) -> &Self {
			self.push_response(
				200,
				format!(
					"{{\"access_token\":\"{token}\",\"token_type\":\"Bearer\",\"expires_in\":{expires_in}}}"
				),
			)
		}

		/// Queues a network failure.
		pub fn push_network_error(&self) -> &Self {
			self.push_response(0, String::new())
		}

		/// Parks subsequent requests until the returned gate is released.
		pub fn hold(&self) -> ScriptGate {
			let (tx, rx) = oneshot::channel();

			*self.0.gate.lock() = Some(rx.shared());

			ScriptGate(tx)
		}

		/// Number of requests that reached the transport.
		pub fn calls(&self) -> usize {
			self.0.calls.load(Ordering::SeqCst)
		}

		/// Form bodies of every request seen so far.
		pub fn bodies(&self) -> Vec<String> {
			self.0.bodies.lock().clone()
		}
	}
	impl TokenHttpClient for ScriptedTokenClient {
		type Handle = ScriptedHandle;
		type TransportError = IoError;

		fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
			ScriptedHandle { state: self.0.clone(), slot }
		}
	}

	#[derive(Default)]
	struct ScriptState {
		responses: Mutex<VecDeque<(u16, String)>>,
		bodies: Mutex<Vec<String>>,
		calls: AtomicUsize,
		gate: Mutex<Option<Shared<Receiver<()>>>>,
	}

	/// Releases requests parked by [`ScriptedTokenClient::hold`].
	pub struct ScriptGate(Sender<()>);
	impl ScriptGate {
		/// Lets parked requests proceed.
		pub fn release(self) {
			let _ = self.0.send(());
		}
	}

	/// Handle returned by [`ScriptedTokenClient`].
	pub struct ScriptedHandle {
		state: Arc<ScriptState>,
		slot: ResponseMetadataSlot,
	}
	impl<'c> AsyncHttpClient<'c> for ScriptedHandle {
		type Error = HttpClientError<IoError>;
		type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

		fn call(&'c self, request: HttpRequest) -> Self::Future {
			let state = self.state.clone();
			let slot = self.slot.clone();

			Box::pin(async move {
				slot.take();
				state.calls.fetch_add(1, Ordering::SeqCst);
				state.bodies.lock().push(String::from_utf8_lossy(request.body()).into_owned());

				let scripted = state.responses.lock().pop_front();
				let gate = state.gate.lock().clone();

				if let Some(gate) = gate {
					let _ = gate.await;
				}

				let (status, body) = scripted.unwrap_or_else(|| {
					(500, "{\"error\":\"server_error\",\"error_description\":\"No scripted response.\"}".into())
				});

				if status == 0 {
					return Err(HttpClientError::Io(IoError::other("Scripted connection reset.")));
				}

				slot.store(ResponseMetadata { status: Some(status), retry_after: None });

				let mut response = HttpResponse::new(body.into_bytes());

				*response.status_mut() =
					StatusCode::from_u16(status).expect("Scripted status should be valid.");

				Ok(response)
			})
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
