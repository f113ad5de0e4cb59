//! Walks through an expired-token session against a mock marketplace: the first catalog call is
//! rejected, the gateway refreshes once, and every concurrent call is replayed with the new token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use elearn_gateway::{
	api::{CourseId, courses, student},
	auth::CredentialKey,
	config::GatewayConfig,
	gateway::{Gateway, SessionExpired},
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token/refresh/");
			then.status(200).header("content-type", "application/json").body(r#"{"access":"A2"}"#);
		})
		.await;

	for path in ["/api/v1/content/courses/", "/api/v1/content/courses/1/", "/api/v1/dashboard/"] {
		server
			.mock_async(|when, then| {
				when.method(GET).path(path).header("authorization", "Bearer A1");
				then.status(401).body(r#"{"code":"token_not_valid"}"#);
			})
			.await;
		server
			.mock_async(|when, then| {
				when.method(GET).path(path).header("authorization", "Bearer A2");
				then.status(200).header("content-type", "application/json").body(r#"{"ok":true}"#);
			})
			.await;
	}

	let root = Url::parse(&server.base_url())?;
	let config =
		GatewayConfig::builder().api_base(root.join("/api/v1/")?).auth_base(root).build()?;
	let backend = MemoryStore::with_tokens("A1", "R1");
	let store: Arc<dyn CredentialStore> = Arc::new(backend.clone());
	let gateway = Gateway::new(config, store)?.with_listener(Arc::new(|event: &SessionExpired| {
		println!("session expired ({}), redirecting to {}", event.reason, event.login_view);
	}));
	let course = CourseId::from(1);
	let (list, detail, dashboard) = tokio::join!(
		gateway.fetch_json::<serde_json::Value>(courses::list()),
		gateway.fetch_json::<serde_json::Value>(courses::get(&course)),
		gateway.fetch_json::<serde_json::Value>(student::dashboard()),
	);

	println!("courses: {}", list?);
	println!("course {course}: {}", detail?);
	println!("dashboard: {}", dashboard?);
	println!(
		"refresh calls: {}, stored access token: {:?}",
		refresh.calls_async().await,
		backend.snapshot(CredentialKey::AccessToken)
	);

	Ok(())
}
