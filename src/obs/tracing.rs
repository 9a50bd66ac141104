//! `token_warden.op` spans and the [`obs_event!`] macro.
//!
//! Without the `tracing` feature every type here is zero-sized and every call is a no-op,
//! so call sites never need their own `cfg` gates.

// self
use crate::{_prelude::*, obs::TokenOp};

/// Emits a `tracing` event when the feature is enabled and compiles to nothing otherwise.
///
/// Arguments are forwarded verbatim to the named `tracing` macro.
macro_rules! obs_event {
	($level:ident, $($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		{
			::tracing::$level!($($arg)+);
		}
	}};
}
pub(crate) use obs_event;

#[cfg(feature = "tracing")]
pub use enabled::*;
#[cfg(not(feature = "tracing"))]
pub use disabled::*;

#[cfg(feature = "tracing")]
mod enabled {
	// crates.io
	use tracing::{Instrument, Span, instrument::Instrumented, span::EnteredSpan};
	// self
	use super::*;

	/// Future wrapped in its operation span.
	pub type InstrumentedOp<F> = Instrumented<F>;

	/// Span covering one token operation against one service.
	#[derive(Clone, Debug)]
	pub struct OpSpan(Span);
	impl OpSpan {
		/// Opens an info-level span carrying `op` and `service`.
		pub fn new(op: TokenOp, service: &str) -> Self {
			Self(tracing::info_span!("token_warden.op", op = op.as_str(), service))
		}

		/// Enters the span until the returned guard drops; for synchronous code only.
		pub fn entered(self) -> OpSpanEntered {
			OpSpanEntered(self.0.entered())
		}

		/// Attaches the span to `fut` so it is entered on every poll.
		pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
		where
			Fut: Future,
		{
			fut.instrument(self.0.clone())
		}
	}

	/// Guard returned by [`OpSpan::entered`].
	#[derive(Debug)]
	pub struct OpSpanEntered(#[allow(dead_code)] EnteredSpan);
}

#[cfg(not(feature = "tracing"))]
mod disabled {
	// self
	use super::*;

	/// Futures pass through untouched.
	pub type InstrumentedOp<F> = F;

	/// Zero-sized stand-in for the operation span.
	#[derive(Clone, Debug)]
	pub struct OpSpan;
	impl OpSpan {
		/// Discards its arguments.
		pub fn new(_op: TokenOp, _service: &str) -> Self {
			Self
		}

		/// Returns an empty guard.
		pub fn entered(self) -> OpSpanEntered {
			OpSpanEntered
		}

		/// Returns `fut` unchanged.
		pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
		where
			Fut: Future,
		{
			fut
		}
	}

	/// Guard returned by [`OpSpan::entered`].
	#[derive(Debug)]
	pub struct OpSpanEntered;
}
