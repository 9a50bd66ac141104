//! Postal address input and the local field validators applied before verification.

// self
use crate::_prelude::*;

const US_CODE: &str = "US";
const US_NAME: &str = "United States";
const STREET_MIN_LEN: usize = 5;
const CITY_MIN_LEN: usize = 2;
const STREET_EXTRA_CHARS: &[char] = &['#', '.', ',', '/', '&', '\'', '"', '(', ')', '-'];
const SANITIZED_CHARS: &[char] = &['#', '.', ',', '/', '&', '\'', '"'];
const STREET_TYPE_WORDS: &[&str] = &[
	"street", "st", "avenue", "ave", "road", "rd", "drive", "dr", "lane", "ln", "way", "circle",
	"cir", "court", "ct", "boulevard", "blvd", "place", "pl", "square", "sq", "suite", "ste",
	"apartment", "apt", "unit", "#",
];

/// Local validation failure for a single address field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum AddressFieldError {
	/// Street line has no digits.
	#[error("Address must include a street number")]
	MissingStreetNumber,
	/// Street line has no letters.
	#[error("Address must include street name")]
	MissingStreetName,
	/// Street line contains characters outside the accepted set.
	#[error("Address contains invalid characters")]
	InvalidCharacters,
	/// Street line is shorter than five characters.
	#[error("Address is too short")]
	TooShort,
	/// Street line names no recognizable street type or unit designator.
	#[error("Address must include a valid street type (St, Ave, Rd, etc.)")]
	MissingStreetType,
	/// City contains unsupported characters or is too short.
	#[error("Please enter a valid city name")]
	InvalidCity,
}

/// Address submitted for verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
	/// Primary street line, e.g. `1600 Pennsylvania Ave NW`.
	pub street: String,
	/// Secondary line (apartment, suite, unit).
	#[serde(default)]
	pub unit: Option<String>,
	/// City name.
	pub city: String,
	/// Two-letter state code.
	pub state: String,
	/// `12345` or `12345-6789`.
	pub zip_code: String,
	/// Country name or ISO code.
	pub country: String,
}
impl Address {
	/// Returns `true` for addresses the USPS can verify.
	pub fn is_us(&self) -> bool {
		let country = self.country.trim();

		country.eq_ignore_ascii_case(US_CODE) || country.eq_ignore_ascii_case(US_NAME)
	}

	/// Splits the ZIP code into its five-digit and plus-four parts.
	pub fn zip_parts(&self) -> (&str, &str) {
		let mut parts = self.zip_code.splitn(2, '-');
		let zip = parts.next().unwrap_or_default();
		let plus4 = parts.next().unwrap_or_default();

		(zip.trim(), plus4.trim())
	}

	/// Runs the street and city validators.
	pub fn validate(&self) -> Result<(), AddressFieldError> {
		validate_street_address(&self.street)?;
		validate_city(&self.city)
	}
}

/// Checks a street line: digits, letters, accepted punctuation, minimum length, and a
/// street-type or unit keyword.
pub fn validate_street_address(street: &str) -> Result<(), AddressFieldError> {
	if !street.chars().any(|c| c.is_ascii_digit()) {
		return Err(AddressFieldError::MissingStreetNumber);
	}
	if !street.chars().any(|c| c.is_ascii_alphabetic()) {
		return Err(AddressFieldError::MissingStreetName);
	}
	if !street
		.chars()
		.all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || STREET_EXTRA_CHARS.contains(&c))
	{
		return Err(AddressFieldError::InvalidCharacters);
	}
	if street.chars().count() < STREET_MIN_LEN {
		return Err(AddressFieldError::TooShort);
	}

	let lowered = street.to_ascii_lowercase();

	// Substring match: "st" also accepts "West" or "Eastern".
	if !STREET_TYPE_WORDS.iter().any(|word| lowered.contains(word)) {
		return Err(AddressFieldError::MissingStreetType);
	}

	Ok(())
}

/// Accepts letters, whitespace, hyphens, periods, and apostrophes; at least two characters.
pub fn validate_city(city: &str) -> Result<(), AddressFieldError> {
	let accepted = city
		.chars()
		.all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || matches!(c, '-' | '.' | '\''));

	if accepted && city.chars().count() >= CITY_MIN_LEN {
		Ok(())
	} else {
		Err(AddressFieldError::InvalidCity)
	}
}

/// Normalizes a US ZIP code to `12345` or `12345-6789`.
///
/// Everything except digits and hyphens is dropped first. Values that still do not look
/// like a ZIP or ZIP+4 are returned in that filtered form.
pub fn format_postal_code(postal_code: &str) -> String {
	let filtered = postal_code.chars().filter(|c| c.is_ascii_digit() || *c == '-').collect::<String>();
	let digits = filtered.chars().filter(char::is_ascii_digit).collect::<String>();
	let hyphens = filtered.len() - digits.len();
	let well_formed = match (digits.len(), hyphens) {
		(5, 0) | (9, 0) => true,
		(5, 1) => filtered.ends_with('-'),
		(9, 1) => filtered.find('-') == Some(5),
		_ => false,
	};

	match (well_formed, digits.len()) {
		(true, 9) => format!("{}-{}", &digits[..5], &digits[5..]),
		(true, _) => digits,
		(false, _) => filtered,
	}
}

/// Strips `# . , / & ' "` from an address line.
pub fn sanitize_address(line: &str) -> String {
	line.chars().filter(|c| !SANITIZED_CHARS.contains(c)).collect()
}
