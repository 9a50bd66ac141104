//! Client-credentials grant inputs, validated when they are built or deserialized.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ClientSecret, IdentifierError},
};

/// Errors produced while assembling [`ClientCredentials`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialsError {
	/// A required field was absent or blank.
	#[error("Client credentials are missing the `{field}` field.")]
	MissingField {
		/// Name of the missing field.
		field: &'static str,
	},
	/// The client identifier is malformed.
	#[error("Client credentials carry an invalid client id.")]
	InvalidClientId(#[from] IdentifierError),
}

/// Credential used for the `client_credentials` grant.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawCredentials")]
pub struct ClientCredentials {
	/// Client identifier; also the second half of the cache key.
	pub client_id: ClientId,
	/// Client secret posted in the form body.
	pub client_secret: ClientSecret,
	/// Scope string posted verbatim (e.g. `addresses`).
	pub scope: String,
}
impl ClientCredentials {
	/// Validates and assembles a credential.
	pub fn new(
		client_id: impl AsRef<str>,
		client_secret: impl Into<String>,
		scope: impl Into<String>,
	) -> Result<Self, CredentialsError> {
		let client_id = client_id.as_ref();

		if client_id.is_empty() {
			return Err(CredentialsError::MissingField { field: "client_id" });
		}

		let client_id = ClientId::new(client_id)?;
		let client_secret = client_secret.into();

		if client_secret.is_empty() {
			return Err(CredentialsError::MissingField { field: "client_secret" });
		}

		let scope = scope.into();

		if scope.trim().is_empty() {
			return Err(CredentialsError::MissingField { field: "scope" });
		}

		Ok(Self { client_id, client_secret: ClientSecret::new(client_secret), scope })
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("scope", &self.scope)
			.finish()
	}
}

#[derive(Deserialize)]
struct RawCredentials {
	#[serde(alias = "clientId")]
	client_id: Option<String>,
	#[serde(alias = "clientSecret")]
	client_secret: Option<String>,
	scope: Option<String>,
}
impl TryFrom<RawCredentials> for ClientCredentials {
	type Error = CredentialsError;

	fn try_from(raw: RawCredentials) -> Result<Self, Self::Error> {
		Self::new(
			raw.client_id.unwrap_or_default(),
			raw.client_secret.unwrap_or_default(),
			raw.scope.unwrap_or_default(),
		)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn missing_fields_fail_fast() {
		assert_eq!(
			ClientCredentials::new("", "secret", "addresses"),
			Err(CredentialsError::MissingField { field: "client_id" })
		);
		assert_eq!(
			ClientCredentials::new("key", "", "addresses"),
			Err(CredentialsError::MissingField { field: "client_secret" })
		);
		assert_eq!(
			ClientCredentials::new("key", "secret", "  "),
			Err(CredentialsError::MissingField { field: "scope" })
		);
		assert!(matches!(
			ClientCredentials::new("bad key", "secret", "addresses"),
			Err(CredentialsError::InvalidClientId(_))
		));
	}

	#[test]
	fn deserializes_camel_case_and_reports_missing_fields() {
		let credentials: ClientCredentials = serde_json::from_str(
			r#"{"clientId":"consumer-key","clientSecret":"consumer-secret","scope":"addresses"}"#,
		)
		.expect("Camel-case credentials should deserialize.");

		assert_eq!(credentials.client_id.as_ref(), "consumer-key");
		assert_eq!(credentials.client_secret.expose(), "consumer-secret");

		let err = serde_json::from_str::<ClientCredentials>(
			r#"{"client_id":"consumer-key","scope":"addresses"}"#,
		)
		.expect_err("Credentials without a secret must be rejected.");

		assert!(err.to_string().contains("client_secret"));
	}

	#[test]
	fn debug_redacts_the_secret() {
		let credentials = ClientCredentials::new("consumer-key", "hunter2", "addresses")
			.expect("Credentials fixture should be valid.");

		assert!(!format!("{credentials:?}").contains("hunter2"));
	}
}
