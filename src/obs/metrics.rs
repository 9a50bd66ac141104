// self
use crate::obs::{OpOutcome, TokenOp};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(op: TokenOp, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"token_warden_op_total",
			"op" => op.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (op, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_op_outcome_is_infallible() {
		record_op_outcome(TokenOp::Refresh, OpOutcome::Failure);
		record_op_outcome(TokenOp::Acquire, OpOutcome::CacheHit);
	}
}
