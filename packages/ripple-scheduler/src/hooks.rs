use crate::owner::OwnerId;
use crate::report::FlushReport;
use ripple_tick::NextTick;

/// Lifecycle hook invokers supplied by the framework.
pub trait LifecycleHooks {
    /// An owner's canonical subscriber settled during the last flush.
    fn updated(&self, owner: OwnerId);

    /// An owner came back from a suspended subtree.
    fn activated(&self, owner: OwnerId);

    fn deactivated(&self, _owner: OwnerId) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl LifecycleHooks for NoopHooks {
    fn updated(&self, _owner: OwnerId) {}
    fn activated(&self, _owner: OwnerId) {}
}

/// Told about every completed flush when `devtools` is enabled.
pub trait FlushObserver {
    fn flushed(&self, report: &FlushReport);
}

/// Runs one lifecycle hook, reporting a failure instead of letting it skip the
/// hooks still to come.
pub(crate) fn invoke_hook(tick: &NextTick, hook: &str, call: impl FnOnce()) {
    let context = format!("{hook} hook");
    let outcome = ripple_tick::guard(
        || {
            call();
            Ok(())
        },
        &context,
    );
    if let Err(error) = outcome {
        tick.report(&error);
    }
}
