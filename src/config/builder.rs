//! Validating builder for [`GatewayConfig`].

// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	config::{AuthRoutes, GatewayConfig},
};

/// Errors raised while constructing or validating gateway configs.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum GatewayConfigError {
	/// The API base URL is required.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// The auth base URL is required.
	#[error("Missing auth base URL.")]
	MissingAuthBase,
	/// Base URLs must be HTTP(S) URLs that can carry paths.
	#[error("The {base} base must be an absolute HTTP(S) URL: {url}.")]
	UnsupportedBase {
		/// Which base failed validation.
		base: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// Plain HTTP is only accepted for loopback hosts unless explicitly allowed.
	#[error("The {base} base must use HTTPS: {url}.")]
	InsecureBase {
		/// Which base failed validation.
		base: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// Routes must be non-empty relative paths.
	#[error("The {route} route must be a non-empty relative path, got `{value}`.")]
	InvalidRoute {
		/// Which route failed validation.
		route: &'static str,
		/// Supplied value.
		value: String,
	},
	/// The login view cannot be empty.
	#[error("Login view cannot be empty.")]
	EmptyLoginView,
}

/// Builder for [`GatewayConfig`] values.
///
/// Also the deserialization shape of [`GatewayConfig`]; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GatewayConfigBuilder {
	/// Versioned REST API base.
	pub api_base: Option<Url>,
	/// Authentication service base.
	pub auth_base: Option<Url>,
	/// Authentication routes.
	pub routes: AuthRoutes,
	/// Optional login view override.
	pub login_view: Option<String>,
	/// Accepts plain HTTP for non-loopback hosts.
	pub allow_insecure_http: bool,
}
impl GatewayConfigBuilder {
	/// Creates an empty builder with default routes.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the API base.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Sets the auth base.
	pub fn auth_base(mut self, url: Url) -> Self {
		self.auth_base = Some(url);

		self
	}

	/// Overrides every authentication route.
	pub fn routes(mut self, routes: AuthRoutes) -> Self {
		self.routes = routes;

		self
	}

	/// Overrides the refresh route.
	pub fn refresh_route(mut self, route: impl Into<String>) -> Self {
		self.routes.refresh = route.into();

		self
	}

	/// Overrides the login view signalled on unrecoverable session loss.
	pub fn login_view(mut self, view: impl Into<String>) -> Self {
		self.login_view = Some(view.into());

		self
	}

	/// Accepts plain HTTP for non-loopback hosts.
	pub fn allow_insecure_http(mut self, allow: bool) -> Self {
		self.allow_insecure_http = allow;

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<GatewayConfig, GatewayConfigError> {
		let api_base = self.api_base.ok_or(GatewayConfigError::MissingApiBase)?;
		let auth_base = self.auth_base.ok_or(GatewayConfigError::MissingAuthBase)?;
		let config = GatewayConfig {
			api_base: normalize_base("api", api_base, self.allow_insecure_http)?,
			auth_base: normalize_base("auth", auth_base, self.allow_insecure_http)?,
			routes: self.routes,
			login_view: self.login_view.unwrap_or_else(|| GatewayConfig::DEFAULT_LOGIN_VIEW.into()),
		};

		config.validate()?;

		Ok(config)
	}
}

impl TryFrom<GatewayConfigBuilder> for GatewayConfig {
	type Error = GatewayConfigError;

	fn try_from(builder: GatewayConfigBuilder) -> Result<Self, Self::Error> {
		builder.build()
	}
}

impl GatewayConfig {
	fn validate(&self) -> Result<(), GatewayConfigError> {
		let AuthRoutes { refresh, login, logout, register, profile } = &self.routes;

		validate_route("refresh", refresh)?;
		validate_route("login", login)?;
		validate_route("logout", logout)?;
		validate_route("register", register)?;
		validate_route("profile", profile)?;

		if self.login_view.trim().is_empty() {
			return Err(GatewayConfigError::EmptyLoginView);
		}

		Ok(())
	}
}

fn normalize_base(
	name: &'static str,
	mut url: Url,
	allow_insecure_http: bool,
) -> Result<Url, GatewayConfigError> {
	match url.scheme() {
		"https" => {},
		"http" if allow_insecure_http || is_loopback(&url) => {},
		"http" =>
			return Err(GatewayConfigError::InsecureBase { base: name, url: url.to_string() }),
		_ => return Err(GatewayConfigError::UnsupportedBase { base: name, url: url.to_string() }),
	}

	if url.cannot_be_a_base() || url.host().is_none() {
		return Err(GatewayConfigError::UnsupportedBase { base: name, url: url.to_string() });
	}
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url.set_query(None);
	url.set_fragment(None);

	Ok(url)
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(addr)) => addr.is_loopback(),
		Some(Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}

fn validate_route(name: &'static str, value: &str) -> Result<(), GatewayConfigError> {
	let trimmed = value.trim_start_matches('/');

	if trimmed.is_empty() || trimmed.contains("://") || trimmed.chars().any(char::is_whitespace) {
		Err(GatewayConfigError::InvalidRoute { route: name, value: value.to_owned() })
	} else {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::http::ApiBase;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse test URL.")
	}

	#[test]
	fn build_normalizes_trailing_slashes() {
		let config = GatewayConfig::builder()
			.api_base(url("https://learn.example.com/api/v1"))
			.auth_base(url("https://learn.example.com"))
			.build()
			.expect("Secure bases should validate.");

		assert_eq!(config.api_base.as_str(), "https://learn.example.com/api/v1/");
		assert_eq!(
			config.refresh_endpoint().expect("Refresh endpoint should resolve.").as_str(),
			"https://learn.example.com/auth/token/refresh/"
		);
		assert_eq!(config.login_view, "/login");
	}

	#[test]
	fn local_preset_matches_builder_output() {
		let built = GatewayConfig::builder()
			.api_base(url("http://localhost:8000/api/v1"))
			.auth_base(url("http://localhost:8000"))
			.build()
			.expect("Loopback HTTP should validate.");

		assert_eq!(built, GatewayConfig::local());
	}

	#[test]
	fn insecure_remote_hosts_require_opt_in() {
		let err = GatewayConfig::builder()
			.api_base(url("http://learn.example.com/api/v1/"))
			.auth_base(url("https://learn.example.com/"))
			.build()
			.expect_err("Plain HTTP on a remote host should be rejected.");

		assert!(matches!(err, GatewayConfigError::InsecureBase { base: "api", .. }));

		GatewayConfig::builder()
			.api_base(url("http://learn.example.com/api/v1/"))
			.auth_base(url("http://learn.example.com/"))
			.allow_insecure_http(true)
			.build()
			.expect("Explicit opt-in should accept plain HTTP.");
	}

	#[test]
	fn missing_bases_and_bad_routes_are_rejected() {
		assert_eq!(
			GatewayConfig::builder().build().expect_err("Empty builder should fail."),
			GatewayConfigError::MissingApiBase
		);

		let err = GatewayConfig::builder()
			.api_base(url("https://learn.example.com/api/v1/"))
			.auth_base(url("https://learn.example.com/"))
			.refresh_route("https://evil.example.com/refresh")
			.build()
			.expect_err("Absolute refresh routes should be rejected.");

		assert!(matches!(err, GatewayConfigError::InvalidRoute { route: "refresh", .. }));

		let err = GatewayConfig::builder()
			.api_base(url("mailto:ops@example.com"))
			.auth_base(url("https://learn.example.com/"))
			.build()
			.expect_err("Non-HTTP bases should be rejected.");

		assert!(matches!(err, GatewayConfigError::UnsupportedBase { base: "api", .. }));
	}

	#[test]
	fn deserialized_configs_are_normalized_and_validated() {
		let config: GatewayConfig = serde_json::from_value(json!({
			"api_base": "https://learn.example.com/api/v1",
			"auth_base": "https://learn.example.com",
		}))
		.expect("Secure bases should deserialize.");

		assert_eq!(
			config.resolve(ApiBase::Api, "dashboard/").expect("Path should resolve.").as_str(),
			"https://learn.example.com/api/v1/dashboard/"
		);
		assert_eq!(config.routes, AuthRoutes::default());

		let err = serde_json::from_value::<GatewayConfig>(json!({
			"api_base": "http://learn.example.com/api/v1/",
			"auth_base": "https://learn.example.com/",
		}))
		.expect_err("Plain HTTP on a remote host should be rejected.");

		assert!(err.to_string().contains("must use HTTPS"));

		let encoded = serde_json::to_string(&GatewayConfig::local()).expect("Config should encode.");
		let decoded: GatewayConfig = serde_json::from_str(&encoded).expect("Config should decode.");

		assert_eq!(decoded, GatewayConfig::local());
	}
}
