//! Demonstrates sharing one token manager between concurrent callers and the USPS address
//! verifier, with both endpoints served by a local mock.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use token_warden::{
	auth::{ClientCredentials, ServiceName},
	manager::{TokenManager, TokenManagerConfig},
	reqwest::Client,
	url::Url,
	verify::{Address, AddressVerifier, Verification},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/v3/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(50))
				.body("{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":28800}");
		})
		.await;
	let address_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/addresses/v3/address")
				.header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body(
				r#"{
					"address": {
						"streetAddress": "475 L'ENFANT PLZ SW",
						"city": "WASHINGTON",
						"state": "DC",
						"ZIPCode": "20260",
						"ZIPPlus4": "0004"
					},
					"additionalInfo": { "DPVConfirmation": "Y", "business": "Y", "vacant": "N" }
				}"#,
			);
		})
		.await;
	let config = TokenManagerConfig::from_endpoint(&server.url("/oauth2/v3/token"))?
		.with_request_timeout(std::time::Duration::from_secs(10));
	let manager = Arc::new(TokenManager::new(config)?);
	let service = ServiceName::new("USPS")?;
	let credentials = ClientCredentials::new("demo-client", "super-secret", "addresses")?;
	let (first, second, third) = tokio::join!(
		manager.get_token(&service, &credentials),
		manager.get_token(&service, &credentials),
		manager.get_token(&service, &credentials),
	);

	println!(
		"Three concurrent callers share one token: {}.",
		[first?, second?, third?].iter().all(|token| token.expose() == "demo-access")
	);

	token_mock.assert_calls_async(1).await;

	let verifier = AddressVerifier::new(
		manager.clone(),
		Client::new(),
		service,
		credentials,
		&Url::parse(&server.url("/addresses/v3"))?,
	)?;
	let address = Address {
		street: "475 L'Enfant Plaza SW".into(),
		unit: None,
		city: "Washington".into(),
		state: "DC".into(),
		zip_code: "20260-0004".into(),
		country: "United States".into(),
	};

	match verifier.verify(&address).await? {
		Verification::Verified(verified) => println!(
			"Verified {} {}, {} {} (deliverable: {}).",
			verified.standardized.street,
			verified.standardized.city,
			verified.standardized.state,
			verified.standardized.zip_code,
			verified.deliverable
		),
		other => println!("Address not verified: {other:?}."),
	}

	address_mock.assert_async().await;
	token_mock.assert_calls_async(1).await;

	println!("Refresh metrics: {:?}.", manager.refresh_metrics());

	Ok(())
}
