//! Transport primitives for gateway requests.
//!
//! [`ApiRequest`] describes a call relative to one of the configured base URLs and carries its
//! authentication mode. The gateway resolves it into a [`PreparedRequest`] (absolute URL plus
//! headers, including the bearer credential) and hands that to an [`HttpTransport`]. Transports
//! return every HTTP status as an [`ApiResponse`]; only failures that never produced a response
//! surface as [`TransportError`].

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
};
use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::GatewayConfig,
	error::{ConfigError, TransportError},
};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing gateway requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared between the
/// gateway and its refresh endpoint client, and the futures they return must be `Send` so
/// gateway calls can hop executors.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes a fully prepared request. Non-success statuses are returned as responses.
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_>;
}

/// Which configured base URL a request path is resolved against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ApiBase {
	/// Versioned REST API (`…/api/v1/`).
	#[default]
	Api,
	/// Authentication service root (`…/`), home of `auth/…` routes.
	Auth,
}

/// How the gateway authenticates a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AuthMode {
	/// Attach the stored access token and recover from 401 via refresh-and-replay.
	#[default]
	Bearer,
	/// Never attach credentials; 401 responses are returned as-is.
	Anonymous,
}

/// Caller-facing request descriptor.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Base URL selector.
	pub base: ApiBase,
	/// Path relative to the selected base (a leading `/` is ignored).
	pub path: String,
	/// Query parameters appended in order.
	pub query: Vec<(String, String)>,
	/// Extra headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Option<Vec<u8>>,
	/// Authentication mode.
	pub auth: AuthMode,
}
impl ApiRequest {
	/// Creates a bearer-mode request against the API base.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			base: ApiBase::Api,
			path: path.into(),
			query: Vec::new(),
			headers: HeaderMap::new(),
			body: None,
			auth: AuthMode::Bearer,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Resolves the path against `base` instead of the API base.
	pub fn on(mut self, base: ApiBase) -> Self {
		self.base = base;

		self
	}

	/// Switches the request to [`AuthMode::Anonymous`].
	pub fn anonymous(mut self) -> Self {
		self.auth = AuthMode::Anonymous;

		self
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
		let invalid = || ConfigError::InvalidHeader { name: name.to_owned() };
		let name_parsed = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
		let value_parsed = HeaderValue::from_str(value).map_err(|_| invalid())?;

		self.headers.insert(name_parsed, value_parsed);

		Ok(self)
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<T>(mut self, body: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body).map_err(ConfigError::RequestBody)?;

		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		self.body = Some(bytes);

		Ok(self)
	}

	/// Resolves the descriptor into a transport-ready request carrying `bearer`, if any.
	pub fn prepare(
		&self,
		config: &GatewayConfig,
		bearer: Option<&TokenSecret>,
	) -> Result<PreparedRequest> {
		let mut url = config.resolve(self.base, &self.path)?;

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		let mut headers = self.headers.clone();

		headers.entry(ACCEPT).or_insert_with(|| HeaderValue::from_static("application/json"));

		if let (AuthMode::Bearer, Some(token)) = (self.auth, bearer) {
			let value = HeaderValue::from_str(&token.bearer())
				.map_err(|_| ConfigError::InvalidHeader { name: AUTHORIZATION.to_string() })?;

			headers.insert(AUTHORIZATION, value);
		}

		Ok(PreparedRequest { method: self.method.clone(), url, headers, body: self.body.clone() })
	}
}

/// Transport-ready request with an absolute URL and final headers.
#[derive(Clone)]
pub struct PreparedRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Final header set, including `Authorization` when a bearer token applies.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Option<Vec<u8>>,
}
impl PreparedRequest {
	/// Returns the bearer credential carried by the request, if any.
	pub fn bearer(&self) -> Option<&str> {
		self.headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
	}
}
impl Debug for PreparedRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PreparedRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("authorized", &self.headers.contains_key(AUTHORIZATION))
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.finish()
	}
}

/// HTTP response captured by a transport.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Builds a response from its parts.
	pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers, body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns `true` for 401 responses, the only status that triggers refresh-and-replay.
	pub fn is_unauthorized(&self) -> bool {
		self.status == StatusCode::UNAUTHORIZED
	}

	/// Lossy UTF-8 view of the body.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON regardless of status, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { status: self.status.as_u16(), source })
	}

	/// Requires a 2xx status, converting anything else into [`Error::Api`].
	pub fn error_for_status(self) -> Result<Self> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(Error::Api {
				status: self.status.as_u16(),
				body: crate::error::body_preview(&self.body),
			})
		}
	}

	/// Parses the upstream `Retry-After` hint as a relative duration.
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(&self.headers)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with a total per-request timeout.
	pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, ConfigError> {
		Ok(Self(ReqwestClient::builder().timeout(timeout).build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let PreparedRequest { method, url, headers, body } = request;
			let mut builder = client.request(method, url.clone()).headers(headers);

			if let Some(body) = body {
				builder = builder.body(body);
			}

			let response =
				builder.send().await.map_err(|e| TransportError::network(&url, e))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(|e| TransportError::network(&url, e))?;

			Ok(ApiResponse::new(status, headers, body.to_vec()))
		})
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
