use crate::AsyncPrimitive;
use crate::primitive::PrimitiveKind;
use std::rc::Rc;
use tokio::task::LocalSet;

/// Runs batches as tasks on a tokio [`LocalSet`]. Tasks only make progress while the
/// set is being driven (`LocalSet::run_until` or awaiting the set itself).
pub struct TokioPrimitive {
    local: Rc<LocalSet>,
}

impl TokioPrimitive {
    pub fn new(local: Rc<LocalSet>) -> Self {
        Self { local }
    }
}

impl AsyncPrimitive for TokioPrimitive {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Immediate
    }

    fn is_available(&self) -> bool {
        tokio::runtime::Handle::try_current().is_ok()
    }

    fn schedule_async(&self, f: Box<dyn FnOnce()>) {
        drop(self.local.spawn_local(async move { f() }));
    }
}
