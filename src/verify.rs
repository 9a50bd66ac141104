//! USPS address verification on top of a shared [`TokenManager`].
//!
//! [`AddressVerifier::verify`] obtains a bearer token for its credential, calls
//! `GET {endpoint}/address`, and interprets the answer. A 401 means the cached token was
//! revoked or expired early: the verifier clears it, fetches a new one, and retries exactly
//! once.

pub mod address;
pub mod response;

pub use address::*;
pub use response::*;

// crates.io
use reqwest::header::ACCEPT;
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, ServiceName, TokenSecret},
	config::UspsConfig,
	error::{ConfigError, VerificationError},
	ext::{BearerSigner, RequestSignerExt},
	http::{ReqwestHttpClient, TokenHttpClient, parse_retry_after},
	manager::TokenManager,
	oauth::{ReqwestTransportErrorMapper, TransportErrorMapper},
	obs::{self, OpOutcome, OpSpan, TokenOp, obs_event},
};

/// Service name under which USPS tokens are cached.
pub const USPS_SERVICE: &str = "USPS";

const UNAUTHORIZED: u16 = 401;
const ONLY_US_REASON: &str = "Only US addresses can be verified";

/// Verifies US addresses against the USPS Addresses API.
pub struct AddressVerifier<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	tokens: Arc<TokenManager<C, M>>,
	http_client: ReqwestClient,
	signer: BearerSigner,
	service: ServiceName,
	credentials: ClientCredentials,
	address_url: Url,
}
impl<C, M> AddressVerifier<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a verifier that calls `{endpoint}/address` with tokens from `tokens`.
	pub fn new(
		tokens: Arc<TokenManager<C, M>>,
		http_client: ReqwestClient,
		service: ServiceName,
		credentials: ClientCredentials,
		endpoint: &Url,
	) -> Result<Self, ConfigError> {
		let address_url = ConfigError::parse_endpoint(
			"address",
			&format!("{}/address", endpoint.as_str().trim_end_matches('/')),
		)?;

		Ok(Self {
			tokens,
			http_client,
			signer: BearerSigner,
			service,
			credentials,
			address_url,
		})
	}

	/// Creates a verifier for the USPS service from loaded configuration.
	pub fn from_config(tokens: Arc<TokenManager<C, M>>, config: &UspsConfig) -> Result<Self> {
		let http_client = ReqwestClient::builder().build().map_err(ConfigError::from)?;
		let service = ServiceName::new(USPS_SERVICE)?;

		Ok(Self::new(tokens, http_client, service, config.credentials()?, &config.endpoint_url()?)?)
	}

	/// Token manager shared with other callers.
	pub fn tokens(&self) -> &Arc<TokenManager<C, M>> {
		&self.tokens
	}

	/// Verifies `address`.
	///
	/// Non-US addresses are reported as [`Verification::Unverifiable`] without any network
	/// traffic. 400 and 404 answers become [`Verification::Rejected`]; throttling, other
	/// upstream failures, and a 401 that survives one token refresh are errors.
	pub async fn verify(&self, address: &Address) -> Result<Verification> {
		const OP: TokenOp = TokenOp::Verify;

		if !address.is_us() {
			obs_event!(warn, country = %address.country, "Only US addresses can be verified.");

			return Ok(Verification::Unverifiable { reason: ONLY_US_REASON.into() });
		}

		let span = OpSpan::new(OP, self.service.as_ref());

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span.instrument(self.verify_us(address)).await;

		match &result {
			Ok(_) => obs::record_op_outcome(OP, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OP, OpOutcome::Failure),
		}

		result
	}

	async fn verify_us(&self, address: &Address) -> Result<Verification> {
		let url = self.request_url(address);
		let token = self.tokens.get_token(&self.service, &self.credentials).await?;
		let mut response = self.send(&url, &token).await?;

		if response.status().as_u16() == UNAUTHORIZED {
			obs_event!(
				warn,
				client_id = %self.credentials.client_id,
				"Address API rejected the token; clearing it and retrying once."
			);

			self.tokens.clear_token(&self.service, &self.credentials.client_id);

			let token = self.tokens.get_token(&self.service, &self.credentials).await?;

			response = self.send(&url, &token).await?;

			let status = response.status();

			if !status.is_success() {
				return Err(
					VerificationError::AuthorizationExpired { status: status.as_u16() }.into()
				);
			}
		}

		let status = response.status().as_u16();
		let retry_after = parse_retry_after(response.headers());
		let body = response.bytes().await.map_err(VerificationError::from)?;

		Ok(interpret_response(status, retry_after, &body)?)
	}

	fn request_url(&self, address: &Address) -> Url {
		let (zip, plus4) = address.zip_parts();
		let mut url = self.address_url.clone();

		url.query_pairs_mut()
			.append_pair("streetAddress", &address.street)
			.append_pair("secondaryAddress", address.unit.as_deref().unwrap_or_default())
			.append_pair("city", &address.city)
			.append_pair("state", &address.state)
			.append_pair("ZIPCode", zip)
			.append_pair("ZIPPlus4", plus4);

		url
	}

	async fn send(
		&self,
		url: &Url,
		token: &TokenSecret,
	) -> Result<reqwest::Response, VerificationError> {
		let request = self.http_client.get(url.clone()).header(ACCEPT, "application/json");
		let Ok(request) = self.signer.attach_token(request, token);

		Ok(request.send().await?)
	}
}
impl<C, M> Debug for AddressVerifier<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AddressVerifier")
			.field("service", &self.service)
			.field("credentials", &self.credentials)
			.field("address_url", &self.address_url)
			.finish()
	}
}
