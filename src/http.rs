//! HTTP seam between the token manager and a concrete client.
//!
//! A refresh asks its [`TokenHttpClient`] for a one-shot handle bound to a fresh
//! [`ResponseMetadataSlot`]. The handle records the status and `Retry-After` hint of the
//! response it receives, so a transport failure that happens after the headers arrived
//! can still be reported with that context.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError,
	http::header::{HeaderMap, RETRY_AFTER},
};
#[cfg(feature = "reqwest")] use oauth2::{HttpRequest, HttpResponse};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Transport able to execute token requests.
///
/// Refresh futures are shared between tasks, so both the client and the handles it hands
/// out must be `Send + Sync + 'static`, and handle futures must be `Send`.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Error type of the underlying HTTP stack.
	type TransportError: 'static + Send + Sync + StdError;

	/// Per-request [`AsyncHttpClient`] handle.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Returns a handle that reports what it observes into `slot`.
	///
	/// Handles clear the slot before sending and store [`ResponseMetadata`] as soon as a
	/// status line is available.
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Status and retry hint of the last response seen by a handle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code.
	pub status: Option<u16>,
	/// Parsed `Retry-After` header.
	pub retry_after: Option<Duration>,
}
impl ResponseMetadata {
	/// Captures the status and `Retry-After` header of a response.
	pub fn from_parts(status: u16, headers: &HeaderMap) -> Self {
		Self { status: Some(status), retry_after: parse_retry_after(headers) }
	}
}

/// Shared cell a handle writes [`ResponseMetadata`] into.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Replaces the stored metadata.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Removes and returns the stored metadata.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// [`TokenHttpClient`] backed by `reqwest`.
///
/// Token endpoints answer directly; custom clients passed to
/// [`with_client`](Self::with_client) should not follow redirects.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Uses an existing client as-is.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a redirect-free client, optionally bounded by an overall request timeout.
	pub fn with_timeout(timeout: Option<std::time::Duration>) -> Result<Self, ReqwestError> {
		let builder = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none());
		let builder = match timeout {
			Some(timeout) => builder.timeout(timeout),
			None => builder,
		};

		builder.build().map(Self)
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ReqwestHandle { client: self.0.clone(), slot }
	}
}

/// Handle produced by [`ReqwestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.client.clone();
		let slot = self.slot.clone();

		Box::pin(async move {
			slot.take();

			let request = reqwest::Request::try_from(request).map_err(Box::new)?;
			let response = client.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().clone();

			slot.store(ResponseMetadata::from_parts(status.as_u16(), &headers));

			let body = response.bytes().await.map_err(Box::new)?;
			let mut converted = HttpResponse::new(body.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

/// Reads `Retry-After` as delta-seconds or as an RFC 2822 date in the future.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(secs.into()));
	}

	let until = OffsetDateTime::parse(raw, &Rfc2822).ok()? - OffsetDateTime::now_utc();

	until.is_positive().then_some(until)
}
