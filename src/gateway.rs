//! Authenticated API gateway client.
//!
//! [`Gateway`] attaches the stored access token to outbound requests and recovers from
//! access-token expiry: the first 401 starts a single refresh cycle, requests that hit 401 while
//! it is in flight queue behind it, and every rejected request is replayed exactly once with the
//! new credential. A failed refresh purges the stored tokens, rejects the whole queue, and
//! notifies the host's [`SessionListener`].
//! Until the user logs in again, bearer requests fail with [`Error::NotAuthenticated`] without
//! touching the network.

pub mod coordinator;
pub mod metrics;
pub mod send;
pub mod session;

pub use coordinator::*;
pub use metrics::RefreshMetrics;
pub use session::*;

// self
use crate::{
	_prelude::*,
	config::GatewayConfig,
	http::HttpTransport,
	refresh::{EndpointRefresher, TokenRefresher},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport.
pub type ReqwestGateway = Gateway<ReqwestTransport>;

/// Authenticated client for the marketplace REST API.
///
/// The gateway owns its refresh state, so two gateways never share a refresh cycle even when
/// they share a credential store.
pub struct Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport used for every outbound request.
	pub transport: Arc<T>,
	/// Credential store holding the access/refresh token pair.
	pub store: Arc<dyn CredentialStore>,
	/// Remote authentication service used to mint new access tokens.
	pub refresher: Arc<dyn TokenRefresher>,
	/// Validated endpoint configuration.
	pub config: Arc<GatewayConfig>,
	/// Receiver of the unrecoverable-session signal.
	pub listener: Arc<dyn SessionListener>,
	refresh_metrics: Arc<RefreshMetrics>,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a gateway that refreshes through the config's refresh route using `transport`.
	pub fn with_transport(
		config: GatewayConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Result<Self> {
		let transport = transport.into();
		let refresher = EndpointRefresher::from_config(transport.clone(), &config)?;

		Ok(Self::with_refresher(config, store, transport, Arc::new(refresher)))
	}

	/// Creates a gateway with a caller-provided authentication service.
	pub fn with_refresher(
		config: GatewayConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
		refresher: Arc<dyn TokenRefresher>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			refresher,
			config: Arc::new(config),
			listener: Arc::new(IgnoreSessionExpiry),
			refresh_metrics: Default::default(),
			coordinator: Default::default(),
		}
	}

	/// Sets the receiver of the unrecoverable-session signal.
	pub fn with_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
		self.listener = listener;

		self
	}

	/// Returns the current refresh lifecycle.
	pub fn refresh_state(&self) -> RefreshSnapshot {
		self.coordinator.snapshot()
	}

	/// Returns the refresh counters shared by every clone of this gateway.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.refresh_metrics
	}
}
#[cfg(feature = "reqwest")]
impl Gateway<ReqwestTransport> {
	/// Creates a gateway backed by a default reqwest client.
	pub fn new(config: GatewayConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
		Self::with_transport(config, store, ReqwestTransport::default())
	}
}
impl<T> Clone for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			refresher: self.refresher.clone(),
			config: self.config.clone(),
			listener: self.listener.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("api_base", &self.config.api_base.as_str())
			.field("auth_base", &self.config.auth_base.as_str())
			.field("refresh_state", &self.coordinator.snapshot())
			.finish()
	}
}
