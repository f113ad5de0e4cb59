//! Request dispatch with refresh-and-replay recovery.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, TokenSecret},
	error::RefreshError,
	gateway::{Admission, Gateway, LeaderGuard, RefreshOutcome},
	http::{ApiRequest, ApiResponse, AuthMode, HttpTransport},
	obs::{self, GatewayOp, OpOutcome, OpSpan},
};

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Dispatches `request`, recovering once from access-token expiry.
	///
	/// Non-401 responses are returned unchanged, whatever their status. A 401 on a bearer request
	/// joins (or starts) the gateway's single refresh cycle and the request is replayed once with
	/// the resulting token; a second 401 surfaces as [`Error::Unauthorized`]. If the refresh
	/// fails, stored credentials are purged and [`Error::SessionExpired`] is returned.
	///
	/// Bearer requests are not sent at all while no access token is stored; they fail with
	/// [`Error::NotAuthenticated`] until the user logs in again.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const OP: GatewayOp = GatewayOp::Send;

		let span = OpSpan::new(OP, "send");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span.instrument(self.send_once_with_recovery(&request)).await;

		match &result {
			Ok(_) => obs::record_op_outcome(OP, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OP, OpOutcome::Failure),
		}

		result
	}

	/// [`send`](Self::send), then require a 2xx status.
	pub async fn send_ok(&self, request: ApiRequest) -> Result<ApiResponse> {
		self.send(request).await?.error_for_status()
	}

	/// [`send`](Self::send), then require a 2xx status and decode the JSON body.
	pub async fn fetch_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.send_ok(request).await?.json()
	}

	async fn send_once_with_recovery(&self, request: &ApiRequest) -> Result<ApiResponse> {
		if request.auth == AuthMode::Anonymous {
			return self.dispatch(request, None).await;
		}

		let sent_with =
			self.store.get(CredentialKey::AccessToken).await?.ok_or(Error::NotAuthenticated)?;
		let response = self.dispatch(request, Some(&sent_with)).await?;

		if !response.is_unauthorized() {
			return Ok(response);
		}

		let (fresh, reused) = self.recover(&sent_with).await?;

		obs::replaying(reused);

		let replay = request.prepare(&self.config, Some(&fresh))?;
		let (method, url) = (replay.method.to_string(), replay.url.to_string());
		let replayed = self.transport.execute(replay).await?;

		if replayed.is_unauthorized() {
			return Err(Error::Unauthorized { status: replayed.status.as_u16(), method, url });
		}

		Ok(replayed)
	}

	async fn dispatch(
		&self,
		request: &ApiRequest,
		bearer: Option<&TokenSecret>,
	) -> Result<ApiResponse> {
		let prepared = request.prepare(&self.config, bearer)?;

		Ok(self.transport.execute(prepared).await?)
	}

	/// Resolves the token a rejected request is replayed with. The flag reports whether an
	/// already refreshed token was reused instead of waiting on a refresh.
	async fn recover(&self, sent_with: &TokenSecret) -> Result<(TokenSecret, bool)> {
		match self.coordinator.admit(Some(sent_with)) {
			Admission::Reuse(token) => {
				self.refresh_metrics.record_reuse();

				Ok((token, true))
			},
			Admission::Leader(guard) => {
				let outcome = self.lead_refresh(&guard).await;
				let settlement = guard.settle(&outcome);

				self.refresh_metrics.record_settlement(&settlement, outcome.is_ok());
				obs::refresh_settled(&settlement, outcome.as_ref().map(|_| ()));

				match outcome {
					Ok(token) => Ok((token, false)),
					Err(RefreshError::Superseded) => Err(RefreshError::Superseded.into()),
					Err(err) => {
						self.signal_session_expired(&err);

						Err(err.into())
					},
				}
			},
			Admission::Follower(ticket) => Ok((ticket.wait().await?, false)),
		}
	}

	async fn lead_refresh(&self, guard: &LeaderGuard<'_>) -> RefreshOutcome {
		const OP: GatewayOp = GatewayOp::Refresh;

		let span = OpSpan::new(OP, "lead_refresh");

		obs::record_op_outcome(OP, OpOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let outcome: RefreshOutcome = span
			.instrument(async {
				let refresh_token = self
					.store
					.get(CredentialKey::RefreshToken)
					.await
					.map_err(RefreshError::Storage)?
					.ok_or(RefreshError::MissingRefreshToken)?;
				let grant = self.refresher.refresh(&refresh_token).await?;
				let _writes = self.coordinator.lock_credentials().await;

				if !guard.is_current() {
					return Err(RefreshError::Superseded);
				}

				self.store
					.set(CredentialKey::AccessToken, grant.access.clone())
					.await
					.map_err(RefreshError::Storage)?;

				if let Some(rotated) = grant.refresh {
					self.store
						.set(CredentialKey::RefreshToken, rotated)
						.await
						.map_err(RefreshError::Storage)?;
				}

				Ok::<_, RefreshError>(grant.access)
			})
			.await;
		let outcome = match outcome {
			Err(err) if !matches!(err, RefreshError::Superseded) => {
				let _writes = self.coordinator.lock_credentials().await;

				// Only purge while this leader still refreshes the current session.
				if guard.is_current() {
					self.purge_credentials().await;

					Err(err)
				} else {
					Err(RefreshError::Superseded)
				}
			},
			other => other,
		};

		match &outcome {
			Ok(_) => {
				self.refresh_metrics.record_success();
				obs::record_op_outcome(OP, OpOutcome::Success);
			},
			Err(_) => {
				self.refresh_metrics.record_failure();
				obs::record_op_outcome(OP, OpOutcome::Failure);
			},
		}

		outcome
	}
}
