//! Crate-level error types shared by the token manager, transports, and the verifier.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token refresh failed; every caller sharing the refresh observes the same value.
	#[error(transparent)]
	Refresh(#[from] TokenRefreshError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Client credentials are missing a required field or are malformed.
	#[error(transparent)]
	Credentials(#[from] crate::auth::CredentialsError),
	/// Service or client identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// Address verification failed after a token was obtained.
	#[error(transparent)]
	Verification(#[from] VerificationError),
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured endpoint is not a valid URL.
	#[error("The {name} endpoint is not a valid URL: {value}.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		name: &'static str,
		/// Raw value that failed to parse.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Required environment variables are absent.
	#[error("Missing required environment variables: {}.", .names.join(", "))]
	MissingEnv {
		/// Names of the absent variables.
		names: Vec<&'static str>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Parses an endpoint URL, tagging failures with the endpoint's role.
	pub fn parse_endpoint(name: &'static str, value: &str) -> Result<Url, Self> {
		Url::parse(value).map_err(|source| Self::InvalidEndpoint {
			name,
			value: value.to_owned(),
			source,
		})
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failure of a single token refresh.
///
/// The value is cloneable because one refresh outcome fans out to every caller that joined
/// it while it was in flight.
#[derive(Clone, Debug, ThisError)]
pub enum TokenRefreshError {
	/// Token endpoint answered with a non-success status.
	#[error("Token refresh failed: {message}")]
	Rejected {
		/// Upstream `error_description`, `error`, or the generic fallback.
		message: String,
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint answered 2xx with a body that is not a token response.
	#[error("Token refresh failed: token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
		/// HTTP status code returned by the token endpoint.
		status: u16,
	},
	/// Token endpoint returned an `expires_in` that cannot be represented.
	#[error("Token refresh failed: expires_in value {expires_in} exceeds the supported range.")]
	ExpiresInOutOfRange {
		/// Raw `expires_in` value in seconds.
		expires_in: u64,
	},
	/// Token request could not be assembled.
	#[error("Token refresh failed: token request could not be built.")]
	Request {
		/// Underlying request builder failure.
		#[source]
		source: Arc<oauth2::http::Error>,
	},
	/// Transport timed out before the token endpoint answered.
	#[error("Token refresh failed: request to the token endpoint timed out.")]
	Timeout,
	/// Network failure (DNS, TCP, TLS, IO) while calling the token endpoint.
	#[error("Token refresh failed: network error while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Transport reported a failure that carries only a message.
	#[error("Token refresh failed: {message}")]
	Transport {
		/// Transport-supplied message.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl TokenRefreshError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Arc::new(src) }
	}

	/// Returns the HTTP status code associated with the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. } | Self::MalformedResponse { status, .. } => Some(*status),
			Self::Transport { status, .. } => *status,
			_ => None,
		}
	}

	/// Returns the upstream error detail for rejected refreshes.
	pub fn upstream_message(&self) -> Option<&str> {
		match self {
			Self::Rejected { message, .. } => Some(message),
			_ => None,
		}
	}
}
impl From<oauth2::http::Error> for TokenRefreshError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::Request { source: Arc::new(e) }
	}
}

/// Failures raised by the address-verification client.
#[derive(Debug, ThisError)]
pub enum VerificationError {
	/// The verification service still answered 401 after the token was cleared and
	/// re-acquired once.
	#[error("Address verification failed after token refresh (HTTP {status}).")]
	AuthorizationExpired {
		/// Status returned by the retried request.
		status: u16,
	},
	/// The verification service is throttling this client.
	#[error("Rate limit exceeded.")]
	RateLimited {
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Unexpected non-success response.
	#[error("Address verification failed: {message}.")]
	Upstream {
		/// HTTP status code returned by the verification service.
		status: u16,
		/// Upstream `error.message`, or a generic description.
		message: String,
	},
	/// Response body could not be parsed.
	#[error("Address verification returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Network failure while calling the verification service.
	#[error("Network error occurred while calling the verification service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl VerificationError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for VerificationError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
