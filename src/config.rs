//! Gateway configuration: base URLs, authentication routes, and the login view.
//!
//! Configs are immutable once built. [`GatewayConfigBuilder::build`] validates every URL and
//! route so the gateway never discovers a malformed endpoint mid-request.

pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError, http::ApiBase};

/// Authentication-service routes, relative to [`GatewayConfig::auth_base`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthRoutes {
	/// Refresh endpoint (`POST {refresh}` → `{access}`).
	pub refresh: String,
	/// Login endpoint.
	pub login: String,
	/// Logout endpoint.
	pub logout: String,
	/// Student registration endpoint.
	pub register: String,
	/// Profile endpoint (read + update).
	pub profile: String,
}
impl Default for AuthRoutes {
	fn default() -> Self {
		Self {
			refresh: "auth/token/refresh/".into(),
			login: "auth/dj-rest-auth/login/".into(),
			logout: "auth/dj-rest-auth/logout/".into(),
			register: "auth/register/student/".into(),
			profile: "auth/profile/".into(),
		}
	}
}

/// Immutable, validated gateway configuration.
///
/// Deserialization goes through [`GatewayConfigBuilder`], so loaded configs are normalized and
/// validated exactly like built ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GatewayConfigBuilder")]
pub struct GatewayConfig {
	/// Versioned REST API base (normalized to end with `/`).
	pub api_base: Url,
	/// Authentication service base (normalized to end with `/`).
	pub auth_base: Url,
	/// Authentication routes.
	pub routes: AuthRoutes,
	/// View the host should navigate to when the session cannot be recovered.
	pub login_view: String,
}
impl GatewayConfig {
	/// API base of a development backend.
	pub const LOCAL_API_BASE: &'static str = "http://localhost:8000/api/v1/";
	/// Auth base of a development backend.
	pub const LOCAL_AUTH_BASE: &'static str = "http://localhost:8000/";
	/// Default login view.
	pub const DEFAULT_LOGIN_VIEW: &'static str = "/login";

	/// Creates a new builder.
	pub fn builder() -> GatewayConfigBuilder {
		GatewayConfigBuilder::new()
	}

	/// Config pointing at a backend on `localhost:8000`.
	pub fn local() -> Self {
		Self {
			api_base: Url::parse(Self::LOCAL_API_BASE).expect("Static API base must parse."),
			auth_base: Url::parse(Self::LOCAL_AUTH_BASE).expect("Static auth base must parse."),
			routes: AuthRoutes::default(),
			login_view: Self::DEFAULT_LOGIN_VIEW.into(),
		}
	}

	/// Returns the base URL selected by `base`.
	pub fn base(&self, base: ApiBase) -> &Url {
		match base {
			ApiBase::Api => &self.api_base,
			ApiBase::Auth => &self.auth_base,
		}
	}

	/// Resolves `path` relative to the selected base, ignoring a leading `/`.
	pub fn resolve(&self, base: ApiBase, path: &str) -> Result<Url, ConfigError> {
		let relative = path.trim_start_matches('/');

		self.base(base)
			.join(relative)
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_endpoint(&self) -> Result<Url, ConfigError> {
		self.resolve(ApiBase::Auth, &self.routes.refresh)
	}
}
