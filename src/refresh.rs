//! Remote authentication service contract and the default HTTP implementation.
//!
//! The gateway never talks to the refresh endpoint directly; it goes through a
//! [`TokenRefresher`] so hosts can swap in their own service (or a test double) without
//! touching the single-flight coordination around it.

// crates.io
use ::http::{HeaderMap, HeaderValue, Method, header::CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::GatewayConfig,
	error::{RefreshError, body_preview},
	http::{HttpTransport, PreparedRequest},
};

/// Boxed future returned by [`TokenRefresher::refresh`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RefreshGrant, RefreshError>> + 'a + Send>>;

/// Issues new access tokens for a refresh token.
pub trait TokenRefresher
where
	Self: Send + Sync,
{
	/// Exchanges `refresh_token` for a new access token. Called at most once per refresh cycle.
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a>;
}

/// Credentials minted by a successful refresh.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RefreshGrant {
	/// New access token.
	pub access: TokenSecret,
	/// Rotated refresh token, when the service rotates on use.
	#[serde(default)]
	pub refresh: Option<TokenSecret>,
}
impl RefreshGrant {
	/// Grant carrying only a new access token.
	pub fn access(access: impl Into<TokenSecret>) -> Self {
		Self { access: access.into(), refresh: None }
	}
}

#[derive(Serialize)]
struct RefreshBody<'a> {
	refresh: &'a str,
}

/// [`TokenRefresher`] that posts `{"refresh": ..}` to the configured refresh route.
pub struct EndpointRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	endpoint: Url,
}
impl<T> EndpointRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a refresher that calls `endpoint` through `transport`.
	pub fn new(transport: Arc<T>, endpoint: Url) -> Self {
		Self { transport, endpoint }
	}

	/// Creates a refresher for the refresh route declared by `config`.
	pub fn from_config(transport: Arc<T>, config: &GatewayConfig) -> Result<Self> {
		Ok(Self::new(transport, config.refresh_endpoint()?))
	}

	/// Absolute refresh endpoint URL.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	fn request(&self, refresh_token: &TokenSecret) -> Result<PreparedRequest, RefreshError> {
		let body = serde_json::to_vec(&RefreshBody { refresh: refresh_token.expose() })
			.map_err(|e| RefreshError::MalformedResponse { message: e.to_string() })?;
		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(PreparedRequest {
			method: Method::POST,
			url: self.endpoint.clone(),
			headers,
			body: Some(body),
		})
	}
}
impl<T> TokenRefresher for EndpointRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a> {
		Box::pin(async move {
			let request = self.request(refresh_token)?;
			let response = self
				.transport
				.execute(request)
				.await
				.map_err(|e| RefreshError::Transport { message: e.to_string() })?;

			if !response.is_success() {
				return Err(RefreshError::Rejected {
					status: response.status.as_u16(),
					message: body_preview(&response.body),
				});
			}

			let mut de = serde_json::Deserializer::from_slice(&response.body);

			serde_path_to_error::deserialize(&mut de)
				.map_err(|e| RefreshError::MalformedResponse { message: e.to_string() })
		})
	}
}
impl<T> Debug for EndpointRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EndpointRefresher").field("endpoint", &self.endpoint.as_str()).finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use ::http::StatusCode;
	// self
	use super::*;
	use crate::{
		error::TransportError,
		http::{ApiResponse, TransportFuture},
	};

	struct CannedTransport {
		status: StatusCode,
		body: &'static str,
		seen: Mutex<Vec<PreparedRequest>>,
	}
	impl CannedTransport {
		fn new(status: StatusCode, body: &'static str) -> Arc<Self> {
			Arc::new(Self { status, body, seen: Mutex::new(Vec::new()) })
		}
	}
	impl HttpTransport for CannedTransport {
		fn execute(&self, request: PreparedRequest) -> TransportFuture<'_> {
			self.seen.lock().push(request);

			let response = ApiResponse::new(self.status, HeaderMap::new(), self.body);

			Box::pin(async move { Ok::<_, TransportError>(response) })
		}
	}

	fn refresher(transport: Arc<CannedTransport>) -> EndpointRefresher<CannedTransport> {
		EndpointRefresher::from_config(transport, &GatewayConfig::local())
			.expect("Local config should expose a refresh endpoint.")
	}

	#[tokio::test]
	async fn posts_refresh_token_and_reads_access() {
		let transport = CannedTransport::new(StatusCode::OK, r#"{"access":"A2"}"#);
		let grant = refresher(transport.clone())
			.refresh(&TokenSecret::new("R1"))
			.await
			.expect("Refresh should succeed.");

		assert_eq!(grant, RefreshGrant::access("A2"));

		let seen = transport.seen.lock();
		let request = seen.first().expect("Refresher should issue one request.");

		assert_eq!(request.method, Method::POST);
		assert_eq!(request.url.as_str(), "http://localhost:8000/auth/token/refresh/");
		assert_eq!(request.body.as_deref(), Some(br#"{"refresh":"R1"}"#.as_slice()));
		assert!(request.bearer().is_none());
	}

	#[tokio::test]
	async fn accepts_rotated_refresh_tokens() {
		let transport = CannedTransport::new(StatusCode::OK, r#"{"access":"A2","refresh":"R2"}"#);
		let grant = refresher(transport)
			.refresh(&TokenSecret::new("R1"))
			.await
			.expect("Refresh should succeed.");

		assert_eq!(grant.refresh.as_ref().map(TokenSecret::expose), Some("R2"));
	}

	#[tokio::test]
	async fn non_success_status_is_a_rejection() {
		let transport = CannedTransport::new(
			StatusCode::UNAUTHORIZED,
			r#"{"detail":"Token is invalid or expired","code":"token_not_valid"}"#,
		);
		let err = refresher(transport)
			.refresh(&TokenSecret::new("R-expired"))
			.await
			.expect_err("401 from the refresh endpoint should fail.");

		match err {
			RefreshError::Rejected { status, message } => {
				assert_eq!(status, 401);
				assert!(message.contains("token_not_valid"));
			},
			other => panic!("Unexpected refresh error: {other:?}."),
		}
	}

	#[tokio::test]
	async fn malformed_success_body_is_reported() {
		let transport = CannedTransport::new(StatusCode::OK, r#"{"token":"A2"}"#);
		let err = refresher(transport)
			.refresh(&TokenSecret::new("R1"))
			.await
			.expect_err("Missing access field should fail.");

		assert!(matches!(err, RefreshError::MalformedResponse { .. }));
	}
}
