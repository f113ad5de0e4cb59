// self
use crate::{
	_prelude::*,
	error::RefreshError,
	gateway::Settlement,
	obs::GatewayOp,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by gateway operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(op: GatewayOp, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("elearn_gateway.op", op = op.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (op, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits the settlement of a refresh cycle.
pub(crate) fn refresh_settled(settlement: &Settlement, outcome: Result<(), &RefreshError>) {
	#[cfg(feature = "tracing")]
	{
		match outcome {
			Ok(()) => tracing::debug!(
				released = settlement.released,
				dropped = settlement.dropped,
				longest_wait_ms = settlement.longest_wait.whole_milliseconds() as i64,
				"refresh cycle settled"
			),
			Err(error) => tracing::warn!(
				rejected = settlement.released,
				dropped = settlement.dropped,
				%error,
				"refresh cycle failed"
			),
		}
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (settlement, outcome);
	}
}

/// Emits a best-effort cleanup failure that is not surfaced to the caller.
pub(crate) fn cleanup_failed(what: &'static str, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(what, %error, "credential cleanup failed");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (what, error);
	}
}

/// Emits a request replay after a recovered 401.
pub(crate) fn replaying(reused: bool) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(reused, "replaying request with refreshed credential");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = reused;
	}
}
