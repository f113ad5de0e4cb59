//! Gateway-level error types shared across the transport, refresh, store, and session layers.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration or request-construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); surfaced unchanged and never retried.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// A bearer request was issued while no access token is stored; nothing was sent.
	#[error("No access token is stored; the user must log in.")]
	NotAuthenticated,
	/// The replayed request was still rejected with 401.
	#[error("{method} {url} was rejected as unauthorized after a credential refresh.")]
	Unauthorized {
		/// HTTP status returned by the replay.
		status: u16,
		/// Request method.
		method: String,
		/// Fully resolved request URL.
		url: String,
	},
	/// The refresh cycle failed; stored credentials were purged and the caller must log in again.
	#[error("Session expired: {0}")]
	SessionExpired(#[source] RefreshError),
	/// The request that was driving the refresh was cancelled before it settled.
	#[error("The in-flight credential refresh was interrupted before it settled.")]
	RefreshInterrupted,
	/// A typed helper received a non-success status.
	#[error("API responded with status {status}: {body}")]
	Api {
		/// HTTP status code.
		status: u16,
		/// Lossy UTF-8 preview of the response body.
		body: String,
	},
	/// A typed helper could not decode the response payload.
	#[error("Response body with status {status} could not be decoded.")]
	Decode {
		/// HTTP status code.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Configuration and request-construction failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Gateway config failed validation.
	#[error(transparent)]
	InvalidConfig(#[from] crate::config::GatewayConfigError),
	/// Request path could not be resolved against the configured base URL.
	#[error("Path `{path}` cannot be resolved against the configured base URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized to JSON.")]
	RequestBody(#[source] serde_json::Error),
	/// Header name or value is not valid HTTP.
	#[error("Header `{name}` is not a valid HTTP header.")]
	InvalidHeader {
		/// Header name as supplied by the caller.
		name: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Request URL.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: &Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: url.to_string(), source: Box::new(src) }
	}
}

/// Reasons a refresh cycle can settle with failure.
///
/// The type is `Clone` because a single outcome is delivered to the leader and every pending
/// request queued behind it.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// The credential store holds no refresh token; no network call was made.
	#[error("No refresh token is stored.")]
	MissingRefreshToken,
	/// The authentication service answered with a non-success status.
	#[error("Refresh endpoint rejected the refresh token with status {status}: {message}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Lossy preview of the response body.
		message: String,
	},
	/// The authentication service answered 2xx with an unusable body.
	#[error("Refresh endpoint returned a malformed response: {message}.")]
	MalformedResponse {
		/// Parser diagnostic including the failing JSON path.
		message: String,
	},
	/// The refresh call never produced an HTTP response.
	#[error("Refresh endpoint is unreachable: {message}.")]
	Transport {
		/// Rendered transport error.
		message: String,
	},
	/// Persisting the new credential failed.
	#[error("Refreshed credential could not be stored: {0}")]
	Storage(crate::store::StoreError),
	/// A login or logout replaced the session while the refresh was in flight; its result was
	/// discarded.
	#[error("Session changed while the refresh was in flight.")]
	Superseded,
	/// The leader future was dropped before the refresh settled.
	#[error("Refresh was abandoned before it settled.")]
	Abandoned,
}
impl From<RefreshError> for Error {
	fn from(e: RefreshError) -> Self {
		match e {
			RefreshError::Abandoned => Self::RefreshInterrupted,
			other => Self::SessionExpired(other),
		}
	}
}

/// Renders a bounded, lossy UTF-8 preview of a response body for error messages.
pub(crate) fn body_preview(body: &[u8]) -> String {
	const MAX_PREVIEW: usize = 512;

	let text = String::from_utf8_lossy(body);
	let trimmed = text.trim();

	if trimmed.len() <= MAX_PREVIEW {
		return trimmed.to_owned();
	}

	let mut end = MAX_PREVIEW;

	while !trimmed.is_char_boundary(end) {
		end -= 1;
	}

	format!("{}...", &trimmed[..end])
}
