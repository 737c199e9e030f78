use crate::AsyncPrimitive;
use crate::error::TickError;
use crate::local::LocalEventLoop;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Primitive classes in selection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveKind {
    Microtask,
    Observer,
    Immediate,
    Timer,
}

impl PrimitiveKind {
    /// Whether callbacks land in the host's microtask queue.
    pub fn uses_microtask(self) -> bool {
        matches!(self, Self::Microtask | Self::Observer)
    }
}

/// Picks the highest-priority available primitive. The order of `candidates` is
/// irrelevant; ties keep their given order.
pub fn select_primitive(
    mut candidates: Vec<Rc<dyn AsyncPrimitive>>,
) -> Result<Rc<dyn AsyncPrimitive>, TickError> {
    candidates.sort_by_key(|primitive| primitive.kind());
    let selected = candidates
        .into_iter()
        .find(|primitive| primitive.is_available())
        .ok_or(TickError::NoPrimitive)?;
    tracing::debug!(kind = ?selected.kind(), "selected async primitive");
    Ok(selected)
}

/// Native microtasks.
pub struct MicrotaskPrimitive {
    host: Rc<LocalEventLoop>,
    stall_nudge: bool,
}

impl MicrotaskPrimitive {
    pub fn new(host: Rc<LocalEventLoop>) -> Self {
        Self {
            host,
            stall_nudge: false,
        }
    }

    /// For hosts whose microtask queue can stall until some macrotask runs: every
    /// request is followed by an empty timer.
    pub fn with_stall_nudge(host: Rc<LocalEventLoop>) -> Self {
        Self {
            host,
            stall_nudge: true,
        }
    }
}

impl AsyncPrimitive for MicrotaskPrimitive {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Microtask
    }

    fn is_available(&self) -> bool {
        self.host.capabilities().microtask
    }

    fn schedule_async(&self, f: Box<dyn FnOnce()>) {
        self.host.queue_microtask(f);
        if self.stall_nudge {
            self.host.set_timeout(Box::new(|| {}));
        }
    }
}

/// Change-observation repurposed as a microtask: each request flips an observed
/// value between 0 and 1, and the change record is delivered as a microtask.
pub struct ObserverPrimitive {
    host: Rc<LocalEventLoop>,
    target: Rc<ObservedCell>,
    counter: Cell<u8>,
}

#[derive(Default)]
struct ObservedCell {
    data: Cell<u8>,
    records: RefCell<Vec<Box<dyn FnOnce()>>>,
    delivery_queued: Cell<bool>,
}

impl ObservedCell {
    fn deliver(&self) {
        self.delivery_queued.set(false);
        let records = std::mem::take(&mut *self.records.borrow_mut());
        for record in records {
            record();
        }
    }
}

impl ObserverPrimitive {
    pub fn new(host: Rc<LocalEventLoop>) -> Self {
        Self {
            host,
            target: Rc::new(ObservedCell::default()),
            counter: Cell::new(1),
        }
    }

    /// Current value of the observed cell.
    pub fn observed_value(&self) -> u8 {
        self.target.data.get()
    }
}

impl AsyncPrimitive for ObserverPrimitive {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Observer
    }

    fn is_available(&self) -> bool {
        self.host.capabilities().observer
    }

    fn schedule_async(&self, f: Box<dyn FnOnce()>) {
        let next = (self.counter.get() + 1) % 2;
        self.counter.set(next);
        self.target.records.borrow_mut().push(f);
        self.target.data.set(next);

        if !self.target.delivery_queued.replace(true) {
            let target = Rc::clone(&self.target);
            self.host.queue_microtask(Box::new(move || target.deliver()));
        }
    }
}

/// Immediate macrotasks.
pub struct ImmediatePrimitive {
    host: Rc<LocalEventLoop>,
}

impl ImmediatePrimitive {
    pub fn new(host: Rc<LocalEventLoop>) -> Self {
        Self { host }
    }
}

impl AsyncPrimitive for ImmediatePrimitive {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Immediate
    }

    fn is_available(&self) -> bool {
        self.host.capabilities().immediate
    }

    fn schedule_async(&self, f: Box<dyn FnOnce()>) {
        self.host.set_immediate(f);
    }
}

/// Zero-delay timers. Always available, coarsest granularity.
pub struct TimerPrimitive {
    host: Rc<LocalEventLoop>,
}

impl TimerPrimitive {
    pub fn new(host: Rc<LocalEventLoop>) -> Self {
        Self { host }
    }
}

impl AsyncPrimitive for TimerPrimitive {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Timer
    }

    fn is_available(&self) -> bool {
        true
    }

    fn schedule_async(&self, f: Box<dyn FnOnce()>) {
        self.host.set_timeout(f);
    }
}

impl LocalEventLoop {
    /// Every strategy this loop can back, for [`select_primitive`].
    pub fn candidates(self: &Rc<Self>, stall_nudge: bool) -> Vec<Rc<dyn AsyncPrimitive>> {
        let microtask = if stall_nudge {
            MicrotaskPrimitive::with_stall_nudge(Rc::clone(self))
        } else {
            MicrotaskPrimitive::new(Rc::clone(self))
        };
        vec![
            Rc::new(microtask),
            Rc::new(ObserverPrimitive::new(Rc::clone(self))),
            Rc::new(ImmediatePrimitive::new(Rc::clone(self))),
            Rc::new(TimerPrimitive::new(Rc::clone(self))),
        ]
    }
}
