// crates.io
use httpmock::prelude::*;
// self
use token_warden::{
	_preludet::*,
	error::{TokenRefreshError, VerificationError},
	oauth::NetworkErrorMapper,
	verify::{Address, AddressVerifier, Verification},
};

const ADDRESS_PATH: &str = "/addresses/v3/address";
const VERIFIED_BODY: &str = r#"{
	"address": {
		"streetAddress": "1600 PENNSYLVANIA AVENUE NW",
		"streetAddressAbbreviation": "1600 PENNSYLVANIA AVE NW",
		"city": "WASHINGTON",
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
	"corrections": [],
	"matches": [{ "code": "31", "text": "Single Response - exact match" }],
	"warnings": ["Default address: a more specific address may be needed."]
}"#;

fn white_house() -> Address {
	Address {
		street: "1600 Pennsylvania Ave NW".into(),
		unit: None,
		city: "Washington".into(),
		state: "DC".into(),
		zip_code: "20500-0005".into(),
		country: "United States".into(),
	}
}

fn build_verifier(
	server: &MockServer,
	client: &ScriptedTokenClient,
) -> AddressVerifier<ScriptedTokenClient, NetworkErrorMapper> {
	let endpoint =
		Url::parse(&server.url("/addresses/v3")).expect("Mock address endpoint should parse.");

	AddressVerifier::new(
		Arc::new(build_scripted_manager(client)),
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests."),
		usps(),
		credentials("client-a"),
		&endpoint,
	)
	.expect("Verifier should build.")
}

#[tokio::test]
async fn verified_address_is_standardized() {
	let server = MockServer::start_async().await;
	let client = ScriptedTokenClient::default();
	let verifier = build_verifier(&server, &client);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(ADDRESS_PATH)
				.query_param("streetAddress", "1600 Pennsylvania Ave NW")
				.query_param("city", "Washington")
				.query_param("state", "DC")
				.query_param("ZIPCode", "20500")
				.query_param("ZIPPlus4", "0005")
				.header("authorization", "Bearer tok-A")
				.header("accept", "application/json");
			then.status(200).header("content-type", "application/json").body(VERIFIED_BODY);
		})
		.await;

	client.push_token("tok-A", 3600);

	let verification = verifier.verify(&white_house()).await.expect("Verification should succeed.");
	let Verification::Verified(verified) = &verification else {
		panic!("Expected a verified address, got {verification:?}.");
	};

	assert!(verification.is_valid());
	assert_eq!(verified.standardized.street, "1600 PENNSYLVANIA AVE NW");
	assert_eq!(verified.standardized.zip_code, "20500-0005");
	assert!(verified.details.is_business);
	assert_eq!(verified.warnings.len(), 1);

	mock.assert_async().await;
}

#[tokio::test]
async fn unauthorized_clears_token_and_retries_once() {
	let server = MockServer::start_async().await;
	let client = ScriptedTokenClient::default();
	let verifier = build_verifier(&server, &client);
	let revoked = server
		.mock_async(|when, then| {
			when.method(GET).path(ADDRESS_PATH).header("authorization", "Bearer tok-A");
			then.status(401).body("{\"error\":{\"message\":\"Token expired\"}}");
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path(ADDRESS_PATH).header("authorization", "Bearer tok-B");
			then.status(200).header("content-type", "application/json").body(VERIFIED_BODY);
		})
		.await;

	client.push_token("tok-A", 3600).push_token("tok-B", 3600);

	let verification = verifier.verify(&white_house()).await.expect("Retry should succeed.");

	assert!(verification.is_valid());
	assert_eq!(client.calls(), 2);
	assert_eq!(verifier.tokens().refresh_metrics().clears(), 1);

	revoked.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn second_unauthorized_is_authorization_expired() {
	let server = MockServer::start_async().await;
	let client = ScriptedTokenClient::default();
	let verifier = build_verifier(&server, &client);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(ADDRESS_PATH);
			then.status(401).body("{\"error\":{\"message\":\"Unauthorized\"}}");
		})
		.await;

	client.push_token("tok-A", 3600).push_token("tok-B", 3600);

	let err = verifier.verify(&white_house()).await.expect_err("Second 401 should fail.");

	assert!(matches!(
		err,
		Error::Verification(VerificationError::AuthorizationExpired { status: 401 })
	));
	assert_eq!(client.calls(), 2);

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn client_errors_and_throttling_are_reported() {
	let server = MockServer::start_async().await;
	let client = ScriptedTokenClient::default();
	let verifier = build_verifier(&server, &client);
	let mut invalid = server
		.mock_async(|when, then| {
			when.method(GET).path(ADDRESS_PATH);
			then.status(400).body("{\"error\":{\"code\":\"400\",\"message\":\"Invalid State Code.\"}}");
		})
		.await;

	client.push_token("tok-A", 3600);

	let rejected = verifier.verify(&white_house()).await.expect("400 is a rejection.");

	assert_eq!(rejected, Verification::Rejected { message: "Invalid State Code.".into() });
	assert!(!rejected.is_valid());

	invalid.delete_async().await;

	let _throttled = server
		.mock_async(|when, then| {
			when.method(GET).path(ADDRESS_PATH);
			then.status(429).header("retry-after", "30").body("{}");
		})
		.await;
	let err = verifier.verify(&white_house()).await.expect_err("429 should fail.");

	assert!(matches!(
		err,
		Error::Verification(VerificationError::RateLimited { retry_after: Some(delay) })
			if delay == Duration::seconds(30)
	));
	assert_eq!(client.calls(), 1, "The cached token should be reused.");
}

#[tokio::test]
async fn non_us_addresses_skip_the_network() {
	let server = MockServer::start_async().await;
	let client = ScriptedTokenClient::default();
	let verifier = build_verifier(&server, &client);
	let address = Address { country: "Canada".into(), ..white_house() };
	let verification = verifier.verify(&address).await.expect("Non-US input is not an error.");

	assert_eq!(verification, Verification::Unverifiable {
		reason: "Only US addresses can be verified".into()
	});
	assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn token_failures_propagate_without_calling_the_api() {
	let server = MockServer::start_async().await;
	let client = ScriptedTokenClient::default();
	let verifier = build_verifier(&server, &client);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(ADDRESS_PATH);
			then.status(200).body(VERIFIED_BODY);
		})
		.await;

	client.push_response(
		401,
		"{\"error\":\"invalid_client\",\"error_description\":\"Invalid client credentials\"}",
	);

	let err = verifier.verify(&white_house()).await.expect_err("Token failure should propagate.");

	assert!(matches!(err, Error::Refresh(TokenRefreshError::Rejected { status: 401, .. })));
	assert_eq!(err.to_string(), "Token refresh failed: Invalid client credentials");

	mock.assert_calls_async(0).await;
}
