use crate::AsyncPrimitive;
use crate::error::{CallbackError, ErrorHandler, TickError, guard, log_error};
use crate::primitive::{PrimitiveKind, select_primitive};
use futures::channel::oneshot;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

const DEFAULT_CONTEXT: &str = "nextTick";

type Callback = Box<dyn FnOnce() -> Result<(), CallbackError>>;

struct Inner {
    callbacks: RefCell<Vec<Callback>>,
    pending: Cell<bool>,
    primitive: Rc<dyn AsyncPrimitive>,
    error_handler: RefCell<ErrorHandler>,
}

/// Deferred-callback queue.
///
/// Every callback scheduled before the host fires the pending trigger runs in one
/// batch. At most one trigger is outstanding with the host at any time.
#[derive(Clone)]
pub struct NextTick {
    inner: Rc<Inner>,
}

impl NextTick {
    pub fn new(primitive: Rc<dyn AsyncPrimitive>) -> Self {
        let error_handler: ErrorHandler = Rc::new(log_error);
        Self {
            inner: Rc::new(Inner {
                callbacks: RefCell::new(Vec::new()),
                pending: Cell::new(false),
                primitive,
                error_handler: RefCell::new(error_handler),
            }),
        }
    }

    /// Builds the queue over the best available candidate.
    pub fn with_candidates(candidates: Vec<Rc<dyn AsyncPrimitive>>) -> Result<Self, TickError> {
        Ok(Self::new(select_primitive(candidates)?))
    }

    pub fn set_error_handler(&self, handler: ErrorHandler) {
        *self.inner.error_handler.borrow_mut() = handler;
    }

    pub fn primitive_kind(&self) -> PrimitiveKind {
        self.inner.primitive.kind()
    }

    /// True while a trigger is outstanding with the host.
    pub fn is_pending(&self) -> bool {
        self.inner.pending.get()
    }

    pub fn len(&self) -> usize {
        self.inner.callbacks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queues `thunk` for the next batch. A panic inside it is reported to the
    /// error handler under `context`.
    pub fn schedule<F>(&self, thunk: F, context: Option<&str>)
    where
        F: FnOnce() + 'static,
    {
        self.try_schedule(
            move || {
                thunk();
                Ok(())
            },
            context,
        );
    }

    /// Like [`schedule`](Self::schedule) for thunks that can fail.
    pub fn try_schedule<F>(&self, thunk: F, context: Option<&str>)
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        let context = context.unwrap_or(DEFAULT_CONTEXT).to_owned();
        self.push(Box::new(move || guard(thunk, &context)));
    }

    /// Resolves once the batch this call joined has drained.
    pub fn next_tick(&self) -> TickFuture {
        let (sender, receiver) = oneshot::channel();
        self.push(Box::new(move || {
            // The receiver may have been dropped; nothing to resolve then.
            let _ = sender.send(());
            Ok(())
        }));
        TickFuture { receiver }
    }

    /// Routes `error` to the installed handler.
    pub fn report(&self, error: &CallbackError) {
        let handler = Rc::clone(&*self.inner.error_handler.borrow());
        handler(error);
    }

    /// Runs the current batch by hand. Returns how many callbacks ran.
    ///
    /// An outstanding host trigger stays outstanding, so callbacks scheduled
    /// afterwards join it instead of arming a second one.
    pub fn drain(&self) -> usize {
        self.run_batch()
    }

    /// Host side of the trigger. The pending flag is cleared before anything runs,
    /// so callbacks queued by the batch arm the next trigger.
    fn fire(&self) {
        self.inner.pending.set(false);
        self.run_batch();
    }

    fn run_batch(&self) -> usize {
        let copies = std::mem::take(&mut *self.inner.callbacks.borrow_mut());
        let count = copies.len();
        tracing::trace!(count, "draining deferred callbacks");

        for callback in copies {
            if let Err(error) = callback() {
                self.report(&error);
            }
        }
        count
    }

    fn push(&self, callback: Callback) {
        self.inner.callbacks.borrow_mut().push(callback);
        if self.inner.pending.replace(true) {
            return;
        }

        let weak = Rc::downgrade(&self.inner);
        self.inner.primitive.schedule_async(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                NextTick { inner }.fire();
            }
        }));
    }
}

impl fmt::Debug for NextTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NextTick")
            .field("kind", &self.primitive_kind())
            .field("pending", &self.is_pending())
            .field("len", &self.len())
            .finish()
    }
}

/// Future returned by [`NextTick::next_tick`].
#[must_use = "futures do nothing unless polled"]
pub struct TickFuture {
    receiver: oneshot::Receiver<()>,
}

impl Future for TickFuture {
    type Output = Result<(), TickError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| TickError::Dropped))
    }
}
