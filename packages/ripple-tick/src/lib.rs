pub mod error;
pub mod local;
pub mod primitive;
pub mod queue;
#[cfg(feature = "tokio")]
pub mod tokio_host;

/// A host mechanism for running work once the current synchronous execution unwinds.
/// Each strategy wraps one such mechanism (microtask, observer, immediate, timer) so the
/// queue can be driven by a browser-like loop, a tokio `LocalSet`, or a test harness.
pub trait AsyncPrimitive {
    /// Which class of primitive this is. Selection prefers lower kinds.
    fn kind(&self) -> PrimitiveKind;

    /// Whether the host actually offers this primitive.
    fn is_available(&self) -> bool;

    /// Arrange for `f` to run after the current synchronous stretch finishes.
    fn schedule_async(&self, f: Box<dyn FnOnce()>);
}

pub use error::{CallbackError, ErrorHandler, TickError, guard};
pub use local::{HostCapabilities, LocalEventLoop};
pub use primitive::{
    ImmediatePrimitive, MicrotaskPrimitive, ObserverPrimitive, PrimitiveKind, TimerPrimitive,
    select_primitive,
};
pub use queue::{NextTick, TickFuture};
#[cfg(feature = "tokio")]
pub use tokio_host::TokioPrimitive;
