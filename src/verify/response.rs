//! USPS Addresses API payloads and their interpretation.

// self
use crate::{
	_prelude::*,
	error::VerificationError,
	obs::obs_event,
};

const NOT_FOUND_MESSAGE: &str = "Address could not be found or verified";
const FALLBACK_MESSAGE: &str = "Address verification failed";
const STANDARDIZED_COUNTRY: &str = "United States";

/// Result of verifying one address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verification {
	/// The USPS recognized the address.
	Verified(VerifiedAddress),
	/// The USPS rejected the request or could not find the address.
	Rejected {
		/// Reason suitable for showing next to the address form.
		message: String,
	},
	/// The address is outside what the USPS can verify.
	Unverifiable {
		/// Reason suitable for showing next to the address form.
		reason: String,
	},
}
impl Verification {
	/// Returns `true` only for recognized, deliverable addresses.
	pub fn is_valid(&self) -> bool {
		matches!(self, Self::Verified(verified) if verified.deliverable)
	}
}

/// Address recognized by the USPS.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifiedAddress {
	/// `DPVConfirmation == "Y"`.
	pub deliverable: bool,
	/// Standardized form of the submitted address.
	pub standardized: StandardizedAddress,
	/// Delivery point details.
	pub details: DeliveryDetails,
	/// Corrections the USPS applied or suggests.
	pub corrections: Vec<AddressNote>,
	/// Match codes describing how the address was found.
	pub matches: Vec<AddressNote>,
	/// Free-form warnings returned with the result.
	pub warnings: Vec<String>,
}

/// Standardized address returned by the USPS.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StandardizedAddress {
	/// Street line, abbreviated when the USPS provides an abbreviation.
	pub street: String,
	/// Secondary line, empty when absent.
	pub unit: String,
	/// City, abbreviated when the USPS provides an abbreviation.
	pub city: String,
	/// Two-letter state code.
	pub state: String,
	/// `12345` or `12345-6789`.
	pub zip_code: String,
	/// Always `United States`.
	pub country: String,
}

/// Delivery point flags from `additionalInfo`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryDetails {
	/// Two-digit delivery point.
	pub delivery_point: Option<String>,
	/// Carrier route code.
	pub carrier_route: Option<String>,
	/// Business address.
	pub is_business: bool,
	/// Address flagged vacant.
	pub is_vacant: bool,
	/// Commercial mail receiving agency.
	pub is_cmra: bool,
	/// Central delivery point.
	pub is_central_delivery: bool,
}

/// Correction or match entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressNote {
	/// USPS code.
	#[serde(default)]
	pub code: String,
	/// Human-readable description.
	#[serde(default)]
	pub text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressResponse {
	address: UspsAddress,
	#[serde(default)]
	additional_info: UspsAdditionalInfo,
	#[serde(default)]
	corrections: Vec<AddressNote>,
	#[serde(default)]
	matches: Vec<AddressNote>,
	#[serde(default)]
	warnings: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UspsAddress {
	#[serde(default)]
	street_address: String,
	street_address_abbreviation: Option<String>,
	secondary_address: Option<String>,
	#[serde(default)]
	city: String,
	city_abbreviation: Option<String>,
	#[serde(default)]
	state: String,
	#[serde(rename = "ZIPCode", default)]
	zip_code: String,
	#[serde(rename = "ZIPPlus4")]
	zip_plus4: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UspsAdditionalInfo {
	delivery_point: Option<String>,
	carrier_route: Option<String>,
	#[serde(rename = "DPVConfirmation")]
	dpv_confirmation: Option<String>,
	#[serde(rename = "DPVCMRA")]
	dpv_cmra: Option<String>,
	business: Option<String>,
	central_delivery_point: Option<String>,
	vacant: Option<String>,
}

#[derive(Default, Deserialize)]
struct ErrorEnvelope {
	#[serde(default)]
	error: ErrorBody,
}

#[derive(Default, Deserialize)]
struct ErrorBody {
	message: Option<String>,
}

/// Interprets a (non-401) Addresses API response.
pub fn interpret_response(
	status: u16,
	retry_after: Option<Duration>,
	body: &[u8],
) -> Result<Verification, VerificationError> {
	if (200..300).contains(&status) {
		return parse_verified(body).map(Verification::Verified);
	}

	let message = serde_json::from_slice::<ErrorEnvelope>(body)
		.unwrap_or_default()
		.error
		.message
		.filter(|message| !message.trim().is_empty());

	match status {
		400 => {
			let message = message.unwrap_or_else(|| FALLBACK_MESSAGE.into());

			obs_event!(warn, status, message = %message, "Address rejected by USPS.");

			Ok(Verification::Rejected { message })
		},
		404 => {
			obs_event!(warn, status, upstream = ?message, "Address not found by USPS.");

			Ok(Verification::Rejected { message: NOT_FOUND_MESSAGE.into() })
		},
		429 => {
			obs_event!(warn, retry_after = ?retry_after, "USPS rate limit exceeded.");

			Err(VerificationError::RateLimited { retry_after })
		},
		_ => Err(VerificationError::Upstream {
			status,
			message: message.unwrap_or_else(|| FALLBACK_MESSAGE.into()),
		}),
	}
}

fn parse_verified(body: &[u8]) -> Result<VerifiedAddress, VerificationError> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let response: AddressResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| VerificationError::MalformedResponse { source })?;

	if !response.warnings.is_empty() {
		obs_event!(warn, warnings = ?response.warnings, "USPS returned address warnings.");
	}

	let AddressResponse { address, additional_info: info, corrections, matches, warnings } =
		response;
	let is_yes = |flag: &Option<String>| flag.as_deref() == Some("Y");
	let zip_code = match address.zip_plus4.as_deref().filter(|plus4| !plus4.is_empty()) {
		Some(plus4) => format!("{}-{plus4}", address.zip_code),
		None => address.zip_code.clone(),
	};

	Ok(VerifiedAddress {
		deliverable: is_yes(&info.dpv_confirmation),
		standardized: StandardizedAddress {
			street: non_empty(address.street_address_abbreviation)
				.unwrap_or(address.street_address),
			unit: address.secondary_address.unwrap_or_default(),
			city: non_empty(address.city_abbreviation).unwrap_or(address.city),
			state: address.state,
			zip_code,
			country: STANDARDIZED_COUNTRY.into(),
		},
		details: DeliveryDetails {
			is_business: is_yes(&info.business),
			is_vacant: is_yes(&info.vacant),
			is_cmra: is_yes(&info.dpv_cmra),
			is_central_delivery: is_yes(&info.central_delivery_point),
			delivery_point: info.delivery_point,
			carrier_route: info.carrier_route,
		},
		corrections,
		matches,
		warnings,
	})
}

fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const VERIFIED: &str = r#"{
		"firm": null,
		"address": {
			"streetAddress": "1600 PENNSYLVANIA AVENUE NW",
			"streetAddressAbbreviation": "1600 PENNSYLVANIA AVE NW",
			"secondaryAddress": "",
			"city": "WASHINGTON",
			"cityAbbreviation": "",
			"state": "DC",
			"ZIPCode": "20500",
			"ZIPPlus4": "0005"
		},
		"additionalInfo": {
			"deliveryPoint": "00",
			"carrierRoute": "C000",
			"DPVConfirmation": "Y",
			"DPVCMRA": "N",
			"business": "Y",
			"centralDeliveryPoint": "N",
			"vacant": "N"
		},
		"corrections": [{ "code": "", "text": "" }],
		"matches": [{ "code": "31", "text": "Single Response - exact match" }],
		"warnings": []
	}"#;

	#[test]
	fn verified_addresses_are_standardized() {
		let verification =
			interpret_response(200, None, VERIFIED.as_bytes()).expect("Payload should parse.");
		let Verification::Verified(verified) = &verification else {
			panic!("Expected a verified address, got {verification:?}.");
		};

		assert!(verification.is_valid());
		assert_eq!(verified.standardized.street, "1600 PENNSYLVANIA AVE NW");
		assert_eq!(verified.standardized.city, "WASHINGTON");
		assert_eq!(verified.standardized.zip_code, "20500-0005");
		assert_eq!(verified.standardized.country, "United States");
		assert!(verified.details.is_business);
		assert!(!verified.details.is_vacant);
		assert!(!verified.details.is_cmra);
		assert_eq!(verified.details.carrier_route.as_deref(), Some("C000"));
		assert_eq!(verified.matches[0].code, "31");
	}

	#[test]
	fn undeliverable_and_vacant_flags_follow_the_payload() {
		let body = VERIFIED
			.replace(r#""DPVConfirmation": "Y""#, r#""DPVConfirmation": "N""#)
			.replace(r#""vacant": "N""#, r#""vacant": "Y""#)
			.replace(r#""ZIPPlus4": "0005""#, r#""ZIPPlus4": null"#);
		let verification =
			interpret_response(200, None, body.as_bytes()).expect("Payload should parse.");
		let Verification::Verified(verified) = &verification else {
			panic!("Expected a verified address, got {verification:?}.");
		};

		assert!(!verification.is_valid());
		assert!(verified.details.is_vacant);
		assert_eq!(verified.standardized.zip_code, "20500");
	}

	#[test]
	fn client_errors_become_rejections() {
		let rejected = interpret_response(
			400,
			None,
			br#"{"apiVersion":"v3","error":{"code":"400","message":"Invalid ZIP Code."}}"#,
		)
		.expect("400 is a rejection, not an error.");

		assert_eq!(rejected, Verification::Rejected { message: "Invalid ZIP Code.".into() });

		let missing = interpret_response(404, None, br#"{"error":{"message":"Not found"}}"#)
			.expect("404 is a rejection, not an error.");

		assert_eq!(missing, Verification::Rejected {
			message: "Address could not be found or verified".into()
		});
	}

	#[test]
	fn throttling_and_server_errors_are_errors() {
		let throttled = interpret_response(429, Some(Duration::seconds(30)), b"{}")
			.expect_err("429 should fail.");

		assert!(matches!(
			throttled,
			VerificationError::RateLimited { retry_after: Some(delay) } if delay == Duration::seconds(30)
		));

		let upstream = interpret_response(503, None, b"<html>maintenance</html>")
			.expect_err("503 should fail.");

		assert!(matches!(
			upstream,
			VerificationError::Upstream { status: 503, ref message } if message == "Address verification failed"
		));
	}

	#[test]
	fn malformed_success_bodies_are_errors() {
		let err = interpret_response(200, None, br#"{"address":"nope"}"#)
			.expect_err("Malformed payload should fail.");

		assert!(matches!(err, VerificationError::MalformedResponse { .. }));
	}
}
