#![cfg(feature = "reqwest")]

mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use common::{RecordingListener, build_reqwest_test_gateway};
use elearn_gateway::{
	api::{courses, student},
	auth::CredentialKey,
	error::{Error, RefreshError},
	gateway::RefreshSnapshot,
	http::{ApiBase, ApiRequest},
	store::MemoryStore,
};

const REFRESH_PATH: &str = "/auth/token/refresh/";

fn token(store: &MemoryStore, key: CredentialKey) -> Option<String> {
	store.snapshot(key).map(|secret| secret.expose().to_owned())
}

#[tokio::test]
async fn requests_without_401_leave_credentials_alone() {
	let server = MockServer::start_async().await;
	let dashboard = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/dashboard/").header("authorization", "Bearer A1");
			then.status(200).header("content-type", "application/json").body(r#"{"courses":3}"#);
		})
		.await;
	let broken = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/student/courses/");
			then.status(500).body("boom");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH_PATH);
			then.status(200).header("content-type", "application/json").body(r#"{"access":"A9"}"#);
		})
		.await;
	let store = MemoryStore::with_tokens("A1", "R1");
	let gateway = build_reqwest_test_gateway(&server.base_url(), store.clone());
	let body: serde_json::Value =
		gateway.fetch_json(student::dashboard()).await.expect("Dashboard should load.");

	assert_eq!(body, json!({ "courses": 3 }));

	let response =
		gateway.send(student::enrolled_courses()).await.expect("Non-401 errors should pass through.");

	assert_eq!(response.status.as_u16(), 500);
	assert_eq!(response.text(), "boom");
	assert_eq!(gateway.refresh_state(), RefreshSnapshot::Idle);
	assert_eq!(token(&store, CredentialKey::AccessToken).as_deref(), Some("A1"));
	assert_eq!(token(&store, CredentialKey::RefreshToken).as_deref(), Some("R1"));

	dashboard.assert_calls_async(1).await;
	broken.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn single_401_refreshes_once_and_replays() {
	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/content/courses/").header("authorization", "Bearer A1");
			then.status(401).body(r#"{"code":"token_not_valid"}"#);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/content/courses/").header("authorization", "Bearer A2");
			then.status(200).header("content-type", "application/json").body(r#"[{"id":1}]"#);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH_PATH).json_body(json!({ "refresh": "R1" }));
			then.status(200).header("content-type", "application/json").body(r#"{"access":"A2"}"#);
		})
		.await;
	let store = MemoryStore::with_tokens("A1", "R1");
	let gateway = build_reqwest_test_gateway(&server.base_url(), store.clone());
	let catalog: Vec<serde_json::Value> =
		gateway.fetch_json(courses::list()).await.expect("Replay should succeed.");

	assert_eq!(catalog, vec![json!({ "id": 1 })]);
	assert_eq!(token(&store, CredentialKey::AccessToken).as_deref(), Some("A2"));
	assert_eq!(token(&store, CredentialKey::RefreshToken).as_deref(), Some("R1"));
	assert_eq!(gateway.refresh_metrics().attempts(), 1);
	assert_eq!(gateway.refresh_metrics().successes(), 1);
	assert_eq!(gateway.refresh_state(), RefreshSnapshot::Idle);

	expired.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
	let server = MockServer::start_async().await;
	let paths = ["/api/v1/content/courses/", "/api/v1/student/courses/", "/api/v1/dashboard/"];
	let mut expired = Vec::new();
	let mut fresh = Vec::new();

	for path in paths {
		expired.push(
			server
				.mock_async(|when, then| {
					when.method(GET).path(path).header("authorization", "Bearer A1");
					then.status(401);
				})
				.await,
		);
		fresh.push(
			server
				.mock_async(|when, then| {
					when.method(GET).path(path).header("authorization", "Bearer A2");
					then.status(200).header("content-type", "application/json").body("{}");
				})
				.await,
		);
	}

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH_PATH).json_body(json!({ "refresh": "R1" }));
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access":"A2"}"#)
				.delay(std::time::Duration::from_millis(200));
		})
		.await;
	let store = MemoryStore::with_tokens("A1", "R1");
	let gateway = build_reqwest_test_gateway(&server.base_url(), store.clone());
	let (x, y, z) = tokio::join!(
		gateway.send(courses::list()),
		gateway.send(student::enrolled_courses()),
		gateway.send(student::dashboard()),
	);

	for response in [x, y, z] {
		assert_eq!(response.expect("Every request should recover.").status.as_u16(), 200);
	}

	assert_eq!(token(&store, CredentialKey::AccessToken).as_deref(), Some("A2"));
	assert_eq!(gateway.refresh_metrics().attempts(), 1);

	refresh.assert_calls_async(1).await;

	for mock in expired.iter().chain(fresh.iter()) {
		mock.assert_calls_async(1).await;
	}
}

#[tokio::test]
async fn second_401_fails_without_another_refresh() {
	let server = MockServer::start_async().await;
	let forbidden = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/dashboard/");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH_PATH);
			then.status(200).header("content-type", "application/json").body(r#"{"access":"A2"}"#);
		})
		.await;
	let gateway =
		build_reqwest_test_gateway(&server.base_url(), MemoryStore::with_tokens("A1", "R1"));
	let err =
		gateway.send(student::dashboard()).await.expect_err("Replayed 401 should be terminal.");

	match err {
		Error::Unauthorized { status, method, url } => {
			assert_eq!(status, 401);
			assert_eq!(method, "GET");
			assert!(url.ends_with("/api/v1/dashboard/"));
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	forbidden.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn failed_refresh_purges_credentials_and_signals_login() {
	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/dashboard/");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH_PATH);
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"code":"token_not_valid"}"#);
		})
		.await;
	let store = MemoryStore::with_tokens("A1", "R-expired");
	let listener = Arc::new(RecordingListener::default());
	let gateway = build_reqwest_test_gateway(&server.base_url(), store.clone())
		.with_listener(listener.clone());
	let err = gateway.send(student::dashboard()).await.expect_err("Refresh failure should surface.");

	assert!(matches!(err, Error::SessionExpired(RefreshError::Rejected { status: 401, .. })));
	assert_eq!(token(&store, CredentialKey::AccessToken), None);
	assert_eq!(token(&store, CredentialKey::RefreshToken), None);
	assert_eq!(listener.calls(), 1);
	assert_eq!(listener.last().expect("Listener should record the signal.").login_view, "/login");
	assert!(!gateway.is_authenticated().await.expect("Store should be readable."));

	for _ in 0..3 {
		let err = gateway
			.send(student::dashboard())
			.await
			.expect_err("Signed-out requests should not be sent.");

		assert!(matches!(err, Error::NotAuthenticated));
	}

	assert_eq!(listener.calls(), 1);
	assert_eq!(gateway.refresh_metrics().failures(), 1);
	assert_eq!(gateway.refresh_state(), RefreshSnapshot::Idle);

	expired.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn anonymous_requests_return_401_as_is() {
	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/dj-rest-auth/login/");
			then.status(401).body("bad credentials");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH_PATH);
			then.status(200).header("content-type", "application/json").body(r#"{"access":"A2"}"#);
		})
		.await;
	let gateway =
		build_reqwest_test_gateway(&server.base_url(), MemoryStore::with_tokens("A1", "R1"));
	let request = ApiRequest::post("auth/dj-rest-auth/login/")
		.on(ApiBase::Auth)
		.anonymous();
	let response = gateway.send(request).await.expect("Anonymous 401 is a plain response.");

	assert!(response.is_unauthorized());

	login.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}
