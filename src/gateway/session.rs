//! Session lifecycle: login, registration, logout, profile access, and the session-loss signal.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, LoginCredentials, LoginGrant, Session, StudentRegistration},
	error::RefreshError,
	gateway::Gateway,
	http::{ApiBase, ApiRequest, HttpTransport},
	obs::{self, GatewayOp, OpOutcome, OpSpan},
};

/// Signal raised when the session can no longer be recovered and the user must sign in again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionExpired {
	/// Why the refresh cycle failed.
	pub reason: RefreshError,
	/// Login view the host should navigate to.
	pub login_view: String,
	/// Instant at which the credentials were purged.
	pub at: OffsetDateTime,
}

/// Receives the unrecoverable-session signal.
///
/// Called once per failed refresh cycle, after the credentials are purged and every queued
/// request has been rejected. Implementations must not block.
pub trait SessionListener
where
	Self: Send + Sync,
{
	/// Handles a session loss.
	fn session_expired(&self, event: &SessionExpired);
}
impl<F> SessionListener for F
where
	F: Send + Sync + Fn(&SessionExpired),
{
	fn session_expired(&self, event: &SessionExpired) {
		self(event)
	}
}

/// Listener that drops the session-loss signal.
#[derive(Clone, Copy, Debug, Default)]
pub struct IgnoreSessionExpiry;
impl SessionListener for IgnoreSessionExpiry {
	fn session_expired(&self, _: &SessionExpired) {}
}

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Authenticates with the login route and installs the returned token pair.
	pub async fn login(&self, credentials: &LoginCredentials) -> Result<Session> {
		const OP: GatewayOp = GatewayOp::Login;

		let span = OpSpan::new(OP, "login");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				let request = ApiRequest::post(&self.config.routes.login)
					.on(ApiBase::Auth)
					.anonymous()
					.json(credentials)?;
				let grant = self.fetch_json::<LoginGrant>(request).await?;
				let _writes = self.coordinator.lock_credentials().await;

				self.store.set(CredentialKey::AccessToken, grant.access.clone()).await?;
				self.store.set(CredentialKey::RefreshToken, grant.refresh).await?;
				self.coordinator.install(Some(grant.access));

				let session =
					Session { user: grant.user, established_at: OffsetDateTime::now_utc() };

				Ok::<_, Error>(session)
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(OP, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OP, OpOutcome::Failure),
		}

		result
	}

	/// Creates a student account. Registration does not sign the user in.
	pub async fn register(&self, registration: &StudentRegistration) -> Result<serde_json::Value> {
		let request = ApiRequest::post(&self.config.routes.register)
			.on(ApiBase::Auth)
			.anonymous()
			.json(registration)?;

		self.fetch_json(request).await
	}

	/// Ends the session server-side and purges local credentials.
	///
	/// Credentials are purged even when the server call fails; that failure is still returned.
	/// Without a stored access token the server is not called and only the local purge runs.
	pub async fn logout(&self) -> Result<()> {
		const OP: GatewayOp = GatewayOp::Logout;

		let span = OpSpan::new(OP, "logout");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				let request = ApiRequest::post(&self.config.routes.logout).on(ApiBase::Auth);
				let remote = match self.send_ok(request).await {
					Err(Error::NotAuthenticated) => Ok(()),
					other => other.map(|_| ()),
				};
				let _writes = self.coordinator.lock_credentials().await;

				self.coordinator.install(None);
				self.store.clear().await?;

				remote
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(OP, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OP, OpOutcome::Failure),
		}

		result
	}

	/// Fetches the signed-in user's profile.
	pub async fn profile<R>(&self) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.fetch_json(ApiRequest::get(&self.config.routes.profile).on(ApiBase::Auth)).await
	}

	/// Replaces the signed-in user's profile and returns the stored version.
	pub async fn update_profile<B, R>(&self, profile: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		let request = ApiRequest::put(&self.config.routes.profile).on(ApiBase::Auth).json(profile)?;

		self.fetch_json(request).await
	}

	/// Returns `true` while an access token is stored.
	pub async fn is_authenticated(&self) -> Result<bool> {
		Ok(self.store.get(CredentialKey::AccessToken).await?.is_some())
	}

	/// Removes both tokens. Failures are logged, never surfaced.
	pub(crate) async fn purge_credentials(&self) {
		if let Err(e) = self.store.clear().await {
			obs::cleanup_failed("purge", &e);
		}
	}

	pub(crate) fn signal_session_expired(&self, reason: &RefreshError) {
		self.listener.session_expired(&SessionExpired {
			reason: reason.clone(),
			login_view: self.config.login_view.clone(),
			at: OffsetDateTime::now_utc(),
		});
	}
}
