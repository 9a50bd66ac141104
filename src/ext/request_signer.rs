//! Request signing contracts that attach manager-issued tokens to arbitrary HTTP clients.

// self
use crate::auth::TokenSecret;

/// Describes how to attach a [`TokenSecret`] to an outbound request without constraining
/// the HTTP client type.
pub trait RequestSignerExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the provided request and injects the bearer token.
	fn attach_token(&self, request: Request, token: &TokenSecret) -> Result<Request, Error>;
}

/// Signs `reqwest` requests with an `Authorization: Bearer` header.
#[cfg(feature = "reqwest")]
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
#[cfg(feature = "reqwest")]
impl RequestSignerExt<reqwest::RequestBuilder, std::convert::Infallible> for BearerSigner {
	fn attach_token(
		&self,
		request: reqwest::RequestBuilder,
		token: &TokenSecret,
	) -> Result<reqwest::RequestBuilder, std::convert::Infallible> {
		Ok(request.bearer_auth(token.expose()))
	}
}
