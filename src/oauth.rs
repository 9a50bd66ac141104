//! Client-credentials token exchange over a [`TokenHttpClient`].
//!
//! The exchange is a single form-encoded POST. Success bodies are parsed into a
//! [`TokenResponse`]; error bodies are reduced to the most specific upstream detail
//! available (`error_description`, then `error`, then a generic fallback).

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, TokenSecret},
	error::TokenRefreshError,
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient, parse_retry_after},
};

/// Upper bound accepted for `expires_in` (ten years, in seconds).
pub const MAX_EXPIRES_IN: u64 = 10 * 365 * 24 * 60 * 60;

const GRANT_TYPE: &str = "client_credentials";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";
const UNKNOWN_ERROR: &str = "Unknown error";

/// Maps HTTP transport failures into [`TokenRefreshError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a refresh error.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> TokenRefreshError;
}

/// Mapper usable with any transport; every failure is treated as a network failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct NetworkErrorMapper;
impl<E> TransportErrorMapper<E> for NetworkErrorMapper
where
	E: 'static + Send + Sync + StdError,
{
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<E>,
	) -> TokenRefreshError {
		match err {
			HttpClientError::Http(inner) => inner.into(),
			HttpClientError::Io(inner) => TokenRefreshError::network(inner),
			HttpClientError::Other(message) => map_generic_transport_error(meta, message),
			_ => map_unknown_transport_error(meta),
		}
	}
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> TokenRefreshError {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => inner.into(),
			HttpClientError::Io(inner) => TokenRefreshError::network(inner),
			HttpClientError::Other(message) => map_generic_transport_error(meta, message),
			_ => map_unknown_transport_error(meta),
		}
	}
}

/// Successful token endpoint answer.
#[derive(Clone, Debug)]
pub struct TokenResponse {
	/// Issued bearer token.
	pub access_token: TokenSecret,
	/// Lifetime reported by the issuer.
	pub expires_in: Duration,
}

#[derive(Deserialize)]
struct TokenBody {
	access_token: String,
	expires_in: u64,
}

#[derive(Default, Deserialize)]
struct ErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

/// Builds the form-encoded client-credentials request for `token_endpoint`.
pub fn build_token_request(
	token_endpoint: &Url,
	credentials: &ClientCredentials,
) -> Result<HttpRequest, TokenRefreshError> {
	let body = url::form_urlencoded::Serializer::new(String::new())
		.append_pair("grant_type", GRANT_TYPE)
		.append_pair("client_id", &credentials.client_id)
		.append_pair("client_secret", credentials.client_secret.expose())
		.append_pair("scope", &credentials.scope)
		.finish();
	let request = oauth2::http::Request::builder()
		.method(Method::POST)
		.uri(token_endpoint.as_str())
		.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
		.header(ACCEPT, JSON_CONTENT_TYPE)
		.body(body.into_bytes())?;

	Ok(request)
}

/// Performs one client-credentials exchange.
///
/// No retries are attempted; every failure is reported to the caller as-is.
pub async fn request_token<C, M>(
	http_client: &C,
	mapper: &M,
	token_endpoint: &Url,
	credentials: &ClientCredentials,
) -> Result<TokenResponse, TokenRefreshError>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let request = build_token_request(token_endpoint, credentials)?;
	let meta = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(meta.clone());
	let response = handle
		.call(request)
		.await
		.map_err(|err| mapper.map_transport_error(meta.take().as_ref(), err))?;

	parse_token_response(&response)
}

/// Interprets a token endpoint response.
pub fn parse_token_response(response: &HttpResponse) -> Result<TokenResponse, TokenRefreshError> {
	let status = response.status();

	if !status.is_success() {
		return Err(TokenRefreshError::Rejected {
			message: error_detail(response.body()),
			status: status.as_u16(),
			retry_after: parse_retry_after(response.headers()),
		});
	}

	let mut deserializer = serde_json::Deserializer::from_slice(response.body());
	let body: TokenBody =
		serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
			TokenRefreshError::MalformedResponse { source: Arc::new(source), status: status.as_u16() }
		})?;

	if body.expires_in > MAX_EXPIRES_IN {
		return Err(TokenRefreshError::ExpiresInOutOfRange { expires_in: body.expires_in });
	}

	let expires_in = i64::try_from(body.expires_in)
		.map_err(|_| TokenRefreshError::ExpiresInOutOfRange { expires_in: body.expires_in })?;

	Ok(TokenResponse {
		access_token: TokenSecret::new(body.access_token),
		expires_in: Duration::seconds(expires_in),
	})
}

fn error_detail(body: &[u8]) -> String {
	let parsed = serde_json::from_slice::<ErrorBody>(body).unwrap_or_default();

	[parsed.error_description, parsed.error]
		.into_iter()
		.flatten()
		.find(|detail| !detail.trim().is_empty())
		.unwrap_or_else(|| UNKNOWN_ERROR.into())
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> TokenRefreshError {
	if err.is_timeout() {
		return TokenRefreshError::Timeout;
	}
	if err.is_builder() {
		return TokenRefreshError::Transport {
			message: err.to_string(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
		};
	}

	TokenRefreshError::network(err)
}

fn map_generic_transport_error(
	meta: Option<&ResponseMetadata>,
	message: impl Display,
) -> TokenRefreshError {
	TokenRefreshError::Transport {
		message: format!("HTTP client error occurred while calling the token endpoint: {message}."),
		status: meta_status(meta),
	}
}

fn map_unknown_transport_error(meta: Option<&ResponseMetadata>) -> TokenRefreshError {
	TokenRefreshError::Transport {
		message: "HTTP client error occurred while calling the token endpoint.".into(),
		status: meta_status(meta),
	}
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}
