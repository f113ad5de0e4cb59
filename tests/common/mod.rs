#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use parking_lot::Mutex;
use url::Url;
// self
use elearn_gateway::{
	config::GatewayConfig,
	gateway::{Gateway, ReqwestGateway, SessionExpired, SessionListener},
	http::ReqwestTransport,
	store::{CredentialStore, MemoryStore},
};

/// Builds a reqwest transport that accepts the self-signed certificates produced by `httpmock`.
pub fn test_reqwest_transport() -> ReqwestTransport {
	let client = reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestTransport::with_client(client)
}

/// Builds a config whose auth base is the mock server root and whose API base is `/api/v1/`.
pub fn test_config(server_root: &str) -> GatewayConfig {
	let root = Url::parse(server_root).expect("Mock server root should parse.");
	let api = root.join("/api/v1/").expect("Mock API base should resolve.");

	GatewayConfig::builder()
		.api_base(api)
		.auth_base(root)
		.build()
		.expect("Mock gateway config should validate.")
}

/// Constructs a [`Gateway`] over `store` and the reqwest transport used across integration tests.
pub fn build_reqwest_test_gateway(server_root: &str, store: MemoryStore) -> ReqwestGateway {
	let store: Arc<dyn CredentialStore> = Arc::new(store);

	Gateway::with_transport(test_config(server_root), store, test_reqwest_transport())
		.expect("Mock gateway should build.")
}

/// Listener that records every session-loss signal.
#[derive(Default)]
pub struct RecordingListener {
	calls: AtomicUsize,
	last: Mutex<Option<SessionExpired>>,
}
impl RecordingListener {
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn last(&self) -> Option<SessionExpired> {
		self.last.lock().clone()
	}
}
impl SessionListener for RecordingListener {
	fn session_expired(&self, event: &SessionExpired) {
		self.calls.fetch_add(1, Ordering::SeqCst);
		*self.last.lock() = Some(event.clone());
	}
}
