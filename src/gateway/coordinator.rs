//! Single-flight refresh coordination.
//!
//! A [`RefreshCoordinator`] owns the refresh state of one gateway. The first request that
//! observes a 401 while the coordinator is idle becomes the leader and performs the refresh;
//! requests that arrive while it is in flight are queued as [`PendingRequest`]s and receive the
//! leader's outcome through a one-shot channel, in arrival order.
//!
//! Every login or logout starts a new session epoch. A leader admitted under an older epoch may
//! not persist its token, so a refresh that races a logout cannot bring the session back.

// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::TokenSecret, error::RefreshError};

/// Shared result of one refresh cycle.
pub type RefreshOutcome = Result<TokenSecret, RefreshError>;

/// Refresh lifecycle of a gateway.
#[derive(Debug, Default)]
pub enum RefreshState {
	/// No refresh is in flight.
	#[default]
	Idle,
	/// A leader is refreshing; followers wait in arrival order.
	Refreshing {
		/// Followers queued behind the leader.
		pending: Vec<PendingRequest>,
	},
}

/// Follower suspended until the in-flight refresh settles.
#[derive(Debug)]
pub struct PendingRequest {
	completion: oneshot::Sender<RefreshOutcome>,
	enqueued_at: OffsetDateTime,
}

/// Point-in-time view of a coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshSnapshot {
	/// No refresh is in flight.
	Idle,
	/// A refresh is in flight with `pending` followers queued.
	Refreshing {
		/// Queue length.
		pending: usize,
	},
}

/// Decision taken for a request that just observed a 401.
#[derive(Debug)]
pub enum Admission<'a> {
	/// A newer token than the rejected one is already known; replay with it.
	Reuse(TokenSecret),
	/// The caller must perform the refresh and settle the guard.
	Leader(LeaderGuard<'a>),
	/// The caller must wait for the in-flight refresh.
	Follower(PendingTicket),
}

#[derive(Debug, Default)]
struct Inner {
	state: RefreshState,
	current: Option<TokenSecret>,
	epoch: u64,
}

/// Owned single-flight state for one gateway.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	inner: Mutex<Inner>,
	writes: tokio::sync::Mutex<()>,
}
impl RefreshCoordinator {
	/// Decides how a request rejected while carrying `sent_with` recovers.
	///
	/// The state check and transition happen under one lock with no suspension point.
	pub fn admit(&self, sent_with: Option<&TokenSecret>) -> Admission<'_> {
		let mut inner = self.inner.lock();
		let Inner { state, current, epoch } = &mut *inner;

		match state {
			RefreshState::Idle => {
				if let Some(newer) = current.as_ref().filter(|token| Some(*token) != sent_with) {
					return Admission::Reuse(newer.clone());
				}

				*state = RefreshState::Refreshing { pending: Vec::new() };

				Admission::Leader(LeaderGuard { coordinator: self, epoch: *epoch, settled: false })
			},
			RefreshState::Refreshing { pending } => {
				let (completion, receiver) = oneshot::channel();

				pending.push(PendingRequest { completion, enqueued_at: OffsetDateTime::now_utc() });

				Admission::Follower(PendingTicket { receiver })
			},
		}
	}

	/// Records the token installed outside a refresh cycle (login) or forgets it (logout).
	///
	/// Starts a new session epoch: an in-flight leader can no longer persist its result.
	pub fn install(&self, token: Option<TokenSecret>) {
		let mut inner = self.inner.lock();

		inner.current = token;
		inner.epoch = inner.epoch.wrapping_add(1);
	}

	/// Serializes credential-store writes between refresh leaders, login, and logout.
	///
	/// Hold the returned guard across the epoch check and the store writes it protects.
	pub async fn lock_credentials(&self) -> tokio::sync::MutexGuard<'_, ()> {
		self.writes.lock().await
	}

	/// Returns the current refresh lifecycle.
	pub fn snapshot(&self) -> RefreshSnapshot {
		match &self.inner.lock().state {
			RefreshState::Idle => RefreshSnapshot::Idle,
			RefreshState::Refreshing { pending } =>
				RefreshSnapshot::Refreshing { pending: pending.len() },
		}
	}

	fn settle(&self, epoch: u64, outcome: &RefreshOutcome) -> Settlement {
		let pending = {
			let mut inner = self.inner.lock();

			if inner.epoch == epoch {
				inner.current = outcome.as_ref().ok().cloned();
			}

			match std::mem::take(&mut inner.state) {
				RefreshState::Refreshing { pending } => pending,
				RefreshState::Idle => Vec::new(),
			}
		};
		let mut settlement = Settlement::default();

		for request in pending {
			settlement.longest_wait = settlement
				.longest_wait
				.max(OffsetDateTime::now_utc() - request.enqueued_at);

			if request.completion.send(outcome.clone()).is_ok() {
				settlement.released += 1;
			} else {
				settlement.dropped += 1;
			}
		}

		settlement
	}
}

/// Summary of a settled refresh cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Settlement {
	/// Followers that received the outcome.
	pub released: usize,
	/// Followers whose callers were already gone.
	pub dropped: usize,
	/// Longest time a follower spent queued.
	pub longest_wait: Duration,
}

/// Leadership over the in-flight refresh.
///
/// Dropping the guard without calling [`LeaderGuard::settle`] settles the cycle with
/// [`RefreshError::Abandoned`], so followers are never stranded by a cancelled leader.
#[derive(Debug)]
pub struct LeaderGuard<'a> {
	coordinator: &'a RefreshCoordinator,
	epoch: u64,
	settled: bool,
}
impl LeaderGuard<'_> {
	/// Returns `false` once a login or logout has replaced the session this leader refreshes.
	pub fn is_current(&self) -> bool {
		self.coordinator.inner.lock().epoch == self.epoch
	}

	/// Returns the coordinator to idle and delivers `outcome` to every follower in FIFO order.
	pub fn settle(mut self, outcome: &RefreshOutcome) -> Settlement {
		self.settled = true;

		self.coordinator.settle(self.epoch, outcome)
	}
}
impl Drop for LeaderGuard<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.settle(self.epoch, &Err(RefreshError::Abandoned));
		}
	}
}

/// Completion handle held by a follower.
#[derive(Debug)]
pub struct PendingTicket {
	receiver: oneshot::Receiver<RefreshOutcome>,
}
impl PendingTicket {
	/// Waits for the leader's outcome.
	pub async fn wait(self) -> RefreshOutcome {
		self.receiver.await.unwrap_or(Err(RefreshError::Abandoned))
	}
}
