//! Secret wrappers that redact sensitive material in logs.

// self
use crate::_prelude::*;

macro_rules! def_secret {
	($name:ident, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(String);
		impl $name {
			/// Wraps a new secret string.
			pub fn new(value: impl Into<String>) -> Self {
				Self(value.into())
			}

			/// Returns the inner value. Callers must avoid logging this string.
			pub fn expose(&self) -> &str {
				&self.0
			}

			/// Returns true when the secret is empty.
			pub fn is_empty(&self) -> bool {
				self.0.is_empty()
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				self.expose()
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.debug_tuple(stringify!($name)).field(&"<redacted>").finish()
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str("<redacted>")
			}
		}
	};
}

def_secret! { TokenSecret, "Bearer token issued by an authorization server." }
def_secret! { ClientSecret, "OAuth 2.0 client secret paired with a [`ClientId`](crate::auth::ClientId)." }

impl TokenSecret {
	/// Formats the value for an `Authorization` header.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.0)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let token = TokenSecret::new("super-secret");
		let client = ClientSecret::new("client-secret");

		assert_eq!(format!("{token:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{token}"), "<redacted>");
		assert_eq!(format!("{client:?}"), "ClientSecret(\"<redacted>\")");
		assert_eq!(token.bearer_header(), "Bearer super-secret");
	}
}
