//! Credential store keys and the session payloads exchanged with the authentication service.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Keys under which the credential store persists the token pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CredentialKey {
	/// Short-lived bearer credential.
	#[serde(rename = "token")]
	AccessToken,
	/// Longer-lived credential used to mint new access tokens.
	#[serde(rename = "refreshToken")]
	RefreshToken,
}
impl CredentialKey {
	/// Every key, in purge order.
	pub const ALL: [Self; 2] = [Self::AccessToken, Self::RefreshToken];

	/// Returns the stable storage name for the key.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AccessToken => "token",
			Self::RefreshToken => "refreshToken",
		}
	}
}
impl Display for CredentialKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for CredentialKey {
	type Err = UnknownCredentialKey;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"token" => Ok(Self::AccessToken),
			"refreshToken" => Ok(Self::RefreshToken),
			other => Err(UnknownCredentialKey(other.to_owned())),
		}
	}
}

/// Error returned when parsing an unrecognized storage key.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown credential key `{0}`.")]
pub struct UnknownCredentialKey(pub String);

/// Username/email + password pair posted to the login endpoint.
#[derive(Clone, Serialize)]
pub struct LoginCredentials {
	/// Account username, when the backend authenticates by username.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	/// Account email, when the backend authenticates by email.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Plain-text password; never logged.
	pub password: String,
}
impl LoginCredentials {
	/// Builds email-based credentials.
	pub fn email(email: impl Into<String>, password: impl Into<String>) -> Self {
		Self { username: None, email: Some(email.into()), password: password.into() }
	}

	/// Builds username-based credentials.
	pub fn username(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self { username: Some(username.into()), email: None, password: password.into() }
	}
}
impl Debug for LoginCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginCredentials")
			.field("username", &self.username)
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Student profile fields submitted alongside a registration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
	/// ISO-8601 birth date (`YYYY-MM-DD`).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub birth_date: Option<String>,
	/// Free-form education summary.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub education: Option<String>,
	/// Contact phone number.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub phone_number: Option<String>,
}

/// Student registration payload.
#[derive(Clone, Serialize)]
pub struct StudentRegistration {
	/// Desired username.
	pub username: String,
	/// Account email.
	pub email: String,
	/// Password.
	pub password1: String,
	/// Password confirmation; must equal `password1`.
	pub password2: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
	/// Student-specific profile fields.
	pub student: StudentProfile,
}
impl Debug for StudentRegistration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StudentRegistration")
			.field("username", &self.username)
			.field("email", &self.email)
			.field("first_name", &self.first_name)
			.field("last_name", &self.last_name)
			.field("student", &self.student)
			.finish_non_exhaustive()
	}
}

/// Token pair returned by the login endpoint.
///
/// Older backend releases name the fields `access_token`/`refresh_token`; both spellings are
/// accepted.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginGrant {
	/// Newly issued access token.
	#[serde(alias = "access_token")]
	pub access: TokenSecret,
	/// Newly issued refresh token.
	#[serde(alias = "refresh_token")]
	pub refresh: TokenSecret,
	/// User payload echoed by the backend, if any.
	#[serde(default)]
	pub user: Option<serde_json::Value>,
}

/// Authenticated session returned by a successful login.
#[derive(Clone, Debug)]
pub struct Session {
	/// User payload echoed by the backend, if any.
	pub user: Option<serde_json::Value>,
	/// Instant at which the credentials were installed.
	pub established_at: OffsetDateTime,
}
