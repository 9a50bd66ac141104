//! Validated identifiers that make up token cache keys.
//!
//! [`ServiceName`] and [`ClientId`] share one representation, [`Identifier`], tagged with a
//! zero-sized kind so the two can never be swapped by accident.

// std
use std::{borrow::Borrow, marker::PhantomData, ops::Deref};
// crates.io
use serde::{Deserializer, Serializer, de::Error as _};
// self
use crate::_prelude::*;

/// Longest identifier accepted, in bytes.
pub const IDENTIFIER_MAX_LEN: usize = 256;

/// Marker describing one family of identifiers.
pub trait IdentifierKind {
	/// Human-readable label used in errors and `Debug` output.
	const LABEL: &'static str;
}

/// Kind of [`ServiceName`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceKind {}
impl IdentifierKind for ServiceKind {
	const LABEL: &'static str = "Service";
}

/// Kind of [`ClientId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClientKind {}
impl IdentifierKind for ClientKind {
	const LABEL: &'static str = "Client";
}

/// Name of the external service a token is issued for (e.g. `USPS`).
pub type ServiceName = Identifier<ServiceKind>;
/// OAuth 2.0 client identifier of a credential.
pub type ClientId = Identifier<ClientKind>;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// Nothing was supplied.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Identifier label (`Service`, `Client`).
		kind: &'static str,
	},
	/// Whitespace appeared somewhere in the value.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Identifier label (`Service`, `Client`).
		kind: &'static str,
	},
	/// The value is longer than [`IDENTIFIER_MAX_LEN`].
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Identifier label (`Service`, `Client`).
		kind: &'static str,
		/// Byte limit.
		max: usize,
	},
}

/// Non-empty, whitespace-free string of at most [`IDENTIFIER_MAX_LEN`] bytes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier<K> {
	value: String,
	kind: PhantomData<K>,
}
impl<K> Identifier<K>
where
	K: IdentifierKind,
{
	/// Validates and copies `value`.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		Self::try_from(value.as_ref().to_owned())
	}

	/// Consumes the identifier and returns the raw string.
	pub fn into_inner(self) -> String {
		self.value
	}
}
impl<K> TryFrom<String> for Identifier<K>
where
	K: IdentifierKind,
{
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		let kind = K::LABEL;

		if value.is_empty() {
			Err(IdentifierError::Empty { kind })
		} else if value.chars().any(char::is_whitespace) {
			Err(IdentifierError::ContainsWhitespace { kind })
		} else if value.len() > IDENTIFIER_MAX_LEN {
			Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN })
		} else {
			Ok(Self { value, kind: PhantomData })
		}
	}
}
impl<K> FromStr for Identifier<K>
where
	K: IdentifierKind,
{
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl<K> Deref for Identifier<K> {
	type Target = str;

	fn deref(&self) -> &str {
		&self.value
	}
}
impl<K> AsRef<str> for Identifier<K> {
	fn as_ref(&self) -> &str {
		&self.value
	}
}
impl<K> Borrow<str> for Identifier<K> {
	fn borrow(&self) -> &str {
		&self.value
	}
}
impl<K> Debug for Identifier<K>
where
	K: IdentifierKind,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}({})", K::LABEL, self.value)
	}
}
impl<K> Display for Identifier<K> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.value)
	}
}
impl<K> Serialize for Identifier<K> {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.value)
	}
}
impl<'de, K> Deserialize<'de> for Identifier<K>
where
	K: IdentifierKind,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		Self::try_from(String::deserialize(deserializer)?).map_err(D::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn blank_and_padded_values_are_rejected() {
		assert_eq!(ServiceName::new(""), Err(IdentifierError::Empty { kind: "Service" }));
		assert!(ServiceName::new(" USPS").is_err(), "Leading whitespace must be rejected.");
		assert_eq!(
			"client 1".parse::<ClientId>(),
			Err(IdentifierError::ContainsWhitespace { kind: "Client" })
		);

		let service = ServiceName::new("USPS").expect("Service fixture should be valid.");

		assert_eq!(service.as_ref(), "USPS");
		assert_eq!(format!("{service:?}"), "Service(USPS)");
		assert_eq!(service.to_string(), "USPS");
	}

	#[test]
	fn deserialization_validates() {
		let client: ClientId =
			serde_json::from_str("\"consumer-key\"").expect("Client id should deserialize.");

		assert_eq!(serde_json::to_string(&client).expect("Client id should serialize."), "\"consumer-key\"");
		assert!(serde_json::from_str::<ClientId>("\"\"").is_err());
		assert!(serde_json::from_str::<ClientId>("\"with space\"").is_err());
	}

	#[test]
	fn byte_limit_is_inclusive() {
		let exact = "a".repeat(IDENTIFIER_MAX_LEN);

		assert_eq!(ClientId::new(&exact).map(ClientId::into_inner), Ok(exact));
		assert_eq!(
			ClientId::new("a".repeat(IDENTIFIER_MAX_LEN + 1)),
			Err(IdentifierError::TooLong { kind: "Client", max: IDENTIFIER_MAX_LEN })
		);
	}

	#[test]
	fn maps_can_be_queried_by_str() {
		let map = HashMap::from([(
			ServiceName::new("USPS").expect("Service used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("USPS"), Some(&7));
	}
}
