//! Refresh-cycle counters exposed on every gateway.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::gateway::Settlement;

/// Thread-safe counters for refresh cycles and the requests queued behind them.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	reused: AtomicU64,
	released: AtomicU64,
	rejected: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of refresh cycles led.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh cycles that minted a new access token.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh cycles that ended the session.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of stale 401s replayed with an already refreshed token.
	pub fn reused(&self) -> u64 {
		self.reused.load(Ordering::Relaxed)
	}

	/// Returns the number of queued requests released with a new token.
	pub fn released(&self) -> u64 {
		self.released.load(Ordering::Relaxed)
	}

	/// Returns the number of queued requests rejected by a failed cycle.
	pub fn rejected(&self) -> u64 {
		self.rejected.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_reuse(&self) {
		self.reused.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_settlement(&self, settlement: &Settlement, success: bool) {
		let counter = if success { &self.released } else { &self.rejected };

		counter.fetch_add(settlement.released as u64, Ordering::Relaxed);
	}
}
