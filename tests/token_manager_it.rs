// crates.io
use httpmock::prelude::*;
// self
use token_warden::{
	_preludet::*,
	auth::{ClientCredentials, TokenSecret},
	error::TokenRefreshError,
};

const TOKEN_PATH: &str = "/oauth2/v3/token";

fn token_body(token: &str, expires_in: u64) -> String {
	format!("{{\"access_token\":\"{token}\",\"token_type\":\"Bearer\",\"expires_in\":{expires_in}}}")
}

#[tokio::test]
async fn get_token_posts_form_and_reuses_cached_token() {
	let server = MockServer::start_async().await;
	let manager = build_reqwest_test_manager(&server.url(TOKEN_PATH));
	let credentials = credentials("client-cache");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("content-type", "application/x-www-form-urlencoded")
				.header("accept", "application/json");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("tok-A", 3600));
		})
		.await;
	let first = manager
		.get_token(&usps(), &credentials)
		.await
		.expect("Initial get_token should refresh successfully.");
	let second = manager
		.get_token(&usps(), &credentials)
		.await
		.expect("Second get_token should be served from the cache.");

	assert_eq!(first.expose(), "tok-A");
	assert_eq!(second, first);
	assert_eq!(manager.refresh_metrics().refreshes(), 1);
	assert_eq!(manager.refresh_metrics().cache_hits(), 1);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
	let server = MockServer::start_async().await;
	let manager = build_reqwest_test_manager(&server.url(TOKEN_PATH));
	let credentials = credentials("client-burst");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(200))
				.body(token_body("tok-shared", 3600));
		})
		.await;
	let service = usps();
	let (a, b, c, d, e): (
		Result<TokenSecret>,
		Result<TokenSecret>,
		Result<TokenSecret>,
		Result<TokenSecret>,
		Result<TokenSecret>,
	) = tokio::join!(
		manager.get_token(&service, &credentials),
		manager.get_token(&service, &credentials),
		manager.get_token(&service, &credentials),
		manager.get_token(&service, &credentials),
		manager.get_token(&service, &credentials),
	);

	for token in [a, b, c, d, e] {
		assert_eq!(token.expect("Every caller should receive the token.").expose(), "tok-shared");
	}

	assert_eq!(manager.refresh_metrics().joins(), 4);
	assert!(!manager.is_refreshing(&service, &credentials.client_id));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn failed_refresh_reaches_every_waiter_and_is_not_cached() {
	let server = MockServer::start_async().await;
	let manager = build_reqwest_test_manager(&server.url(TOKEN_PATH));
	let credentials = credentials("client-denied");
	let mut failing = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(100))
				.body(
					"{\"error\":\"invalid_client\",\"error_description\":\"Invalid client credentials\"}",
				);
		})
		.await;
	let service = usps();
	let (first, second, third) = tokio::join!(
		manager.get_token(&service, &credentials),
		manager.get_token(&service, &credentials),
		manager.get_token(&service, &credentials),
	);

	for result in [first, second, third] {
		let err = result.expect_err("Every waiter should observe the failure.");

		assert_eq!(err.to_string(), "Token refresh failed: Invalid client credentials");
		assert!(matches!(err, Error::Refresh(TokenRefreshError::Rejected { status: 401, .. })));
	}

	failing.assert_calls_async(1).await;

	assert_eq!(manager.refresh_metrics().failures(), 1);
	assert!(manager.cached(&service, &credentials.client_id).is_none());
	assert!(!manager.is_refreshing(&service, &credentials.client_id));

	failing.delete_async().await;

	let recovered = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("tok-recovered", 3600));
		})
		.await;
	let token = manager
		.get_token(&service, &credentials)
		.await
		.expect("A later call should start a fresh refresh.");

	assert_eq!(token.expose(), "tok-recovered");

	recovered.assert_calls_async(1).await;
}

#[tokio::test]
async fn opaque_error_bodies_fall_back_to_unknown_error() {
	let server = MockServer::start_async().await;
	let manager = build_reqwest_test_manager(&server.url(TOKEN_PATH));
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(503).header("retry-after", "7").body("<html>Service Unavailable</html>");
		})
		.await;
	let err = manager
		.get_token(&usps(), &credentials("client-opaque"))
		.await
		.expect_err("503 should fail.");

	assert_eq!(err.to_string(), "Token refresh failed: Unknown error");
	assert!(matches!(
		err,
		Error::Refresh(TokenRefreshError::Rejected { status: 503, retry_after: Some(delay), .. })
			if delay == Duration::seconds(7)
	));
}

#[tokio::test]
async fn clear_token_forces_refresh_and_is_idempotent() {
	let server = MockServer::start_async().await;
	let manager = build_reqwest_test_manager(&server.url(TOKEN_PATH));
	let credentials = credentials("client-clear");
	let service = usps();
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("tok-A", 3600));
		})
		.await;

	manager.clear_token(&service, &credentials.client_id);
	manager.get_token(&service, &credentials).await.expect("First refresh should succeed.");
	manager.clear_token(&service, &credentials.client_id);
	manager.clear_token(&service, &credentials.client_id);

	assert!(manager.cached(&service, &credentials.client_id).is_none());

	manager.get_token(&service, &credentials).await.expect("Second refresh should succeed.");

	assert_eq!(manager.refresh_metrics().clears(), 3);

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn credentials_are_cached_independently() {
	let server = MockServer::start_async().await;
	let manager = build_reqwest_test_manager(&server.url(TOKEN_PATH));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("tok-any", 3600));
		})
		.await;
	let service = usps();
	let alpha = credentials("client-alpha");
	let beta = ClientCredentials::new("client-beta", "other-secret", "addresses")
		.expect("Credentials fixture should be valid.");

	manager.get_token(&service, &alpha).await.expect("Alpha refresh should succeed.");
	manager.get_token(&service, &beta).await.expect("Beta refresh should succeed.");
	manager.get_token(&service, &alpha).await.expect("Alpha should be cached.");
	manager.clear_token(&service, &beta.client_id);

	assert!(manager.cached(&service, &alpha.client_id).is_some());
	assert!(manager.cached(&service, &beta.client_id).is_none());

	mock.assert_calls_async(2).await;
}
