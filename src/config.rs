//! USPS client configuration loaded from the process environment or a `.env` file.

// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, CredentialsError},
	error::ConfigError,
	manager::{TokenManagerConfig, USPS_TOKEN_ENDPOINT},
	obs::obs_event,
};

/// Consumer key variable (required).
pub const ENV_CONSUMER_KEY: &str = "USPS_CONSUMER_KEY";
/// Consumer secret variable (required).
pub const ENV_CONSUMER_SECRET: &str = "USPS_CONSUMER_SECRET";
/// Address API base URL variable (optional).
pub const ENV_API_ENDPOINT: &str = "USPS_API_ENDPOINT";
/// Token endpoint variable (optional).
pub const ENV_TOKEN_ENDPOINT: &str = "USPS_TOKEN_ENDPOINT";
/// Default base URL of the USPS Addresses API.
pub const USPS_API_ENDPOINT: &str = "https://apis.usps.com/addresses/v3";
/// Scope requested for the Addresses API.
pub const USPS_SCOPE: &str = "addresses";

/// Credentials and endpoints for the USPS Addresses API.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct UspsConfig {
	/// OAuth client id issued by the USPS developer portal.
	pub consumer_key: String,
	/// OAuth client secret paired with `consumer_key`.
	pub consumer_secret: String,
	/// Addresses API base URL.
	#[serde(default = "default_endpoint")]
	pub endpoint: String,
	/// OAuth token endpoint.
	#[serde(default = "default_token_endpoint")]
	pub token_endpoint: String,
	/// Scope requested with every token.
	#[serde(default = "default_scope")]
	pub scope: String,
}
impl UspsConfig {
	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads `.env` from the working directory (when present), then reads the environment.
	///
	/// Variables already set in the process take precedence over `.env` entries.
	pub fn from_dotenv() -> Result<Self, ConfigError> {
		// A missing `.env` is normal outside development.
		if let Err(err) = dotenvy::dotenv()
			&& !err.not_found()
		{
			obs_event!(warn, error = %err, "Failed to load `.env`; using the process environment only.");
		}

		Self::from_env()
	}

	/// Reads the configuration through `lookup`; empty values count as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
		let consumer_key = read(ENV_CONSUMER_KEY);
		let consumer_secret = read(ENV_CONSUMER_SECRET);
		let (Some(consumer_key), Some(consumer_secret)) = (consumer_key.clone(), consumer_secret.clone())
		else {
			let names = [(ENV_CONSUMER_KEY, consumer_key), (ENV_CONSUMER_SECRET, consumer_secret)]
				.into_iter()
				.filter_map(|(name, value)| value.is_none().then_some(name))
				.collect();

			return Err(ConfigError::MissingEnv { names });
		};

		Ok(Self {
			consumer_key,
			consumer_secret,
			endpoint: read(ENV_API_ENDPOINT).unwrap_or_else(default_endpoint),
			token_endpoint: read(ENV_TOKEN_ENDPOINT).unwrap_or_else(default_token_endpoint),
			scope: default_scope(),
		})
	}

	/// Builds the client credentials used for token requests.
	pub fn credentials(&self) -> Result<ClientCredentials, CredentialsError> {
		ClientCredentials::new(&self.consumer_key, self.consumer_secret.as_str(), self.scope.as_str())
	}

	/// Parses the Addresses API base URL.
	pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
		ConfigError::parse_endpoint("address", &self.endpoint)
	}

	/// Token manager configuration pointed at `token_endpoint`.
	pub fn manager_config(&self) -> Result<TokenManagerConfig, ConfigError> {
		TokenManagerConfig::from_endpoint(&self.token_endpoint)
	}
}
impl Debug for UspsConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UspsConfig")
			.field("consumer_key", &self.consumer_key)
			.field("consumer_secret", &"<redacted>")
			.field("endpoint", &self.endpoint)
			.field("token_endpoint", &self.token_endpoint)
			.field("scope", &self.scope)
			.finish()
	}
}

fn default_endpoint() -> String {
	USPS_API_ENDPOINT.into()
}

fn default_token_endpoint() -> String {
	USPS_TOKEN_ENDPOINT.into()
}

fn default_scope() -> String {
	USPS_SCOPE.into()
}
