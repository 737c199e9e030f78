use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// A simple FIFO queue for tasks.
/// Since the local loop is single-threaded, we use RefCell<VecDeque>.
#[derive(Default)]
struct TaskQueue {
    queue: RefCell<VecDeque<Box<dyn FnOnce()>>>,
}

impl TaskQueue {
    fn push(&self, task: Box<dyn FnOnce()>) {
        self.queue.borrow_mut().push_back(task);
    }

    fn pop(&self) -> Option<Box<dyn FnOnce()>> {
        self.queue.borrow_mut().pop_front()
    }

    fn len(&self) -> usize {
        self.queue.borrow().len()
    }
}

/// Which primitives the modelled host exposes. Timers are always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    pub microtask: bool,
    pub observer: bool,
    pub immediate: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            microtask: true,
            observer: true,
            immediate: true,
        }
    }
}

/// An in-process, single-threaded host event loop.
///
/// Microtasks run at every checkpoint until the microtask queue is empty, so
/// microtasks queued by microtasks run in the same checkpoint. Macrotasks run one
/// per [`tick`](Self::tick): immediates first, then timers.
#[derive(Default)]
pub struct LocalEventLoop {
    capabilities: HostCapabilities,
    microtasks: TaskQueue,
    immediates: TaskQueue,
    timers: TaskQueue,
    timers_armed: Cell<usize>,
}

impl LocalEventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: HostCapabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    pub fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    pub fn queue_microtask(&self, task: Box<dyn FnOnce()>) {
        self.microtasks.push(task);
    }

    pub fn set_immediate(&self, task: Box<dyn FnOnce()>) {
        self.immediates.push(task);
    }

    /// Arms a zero-delay timer.
    pub fn set_timeout(&self, task: Box<dyn FnOnce()>) {
        self.timers_armed.set(self.timers_armed.get() + 1);
        self.timers.push(task);
    }

    /// Total number of timers ever armed on this loop.
    pub fn timers_armed(&self) -> usize {
        self.timers_armed.get()
    }

    pub fn pending_microtasks(&self) -> usize {
        self.microtasks.len()
    }

    pub fn pending_macrotasks(&self) -> usize {
        self.immediates.len() + self.timers.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending_microtasks() == 0 && self.pending_macrotasks() == 0
    }

    /// Microtask checkpoint. Returns the number of microtasks run.
    pub fn run_microtasks(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.microtasks.pop() {
            task();
            ran += 1;
        }
        ran
    }

    /// Runs pending microtasks, then one macrotask followed by another checkpoint.
    /// Returns true if work remains.
    pub fn tick(&self) -> bool {
        self.run_microtasks();
        if let Some(task) = self.immediates.pop().or_else(|| self.timers.pop()) {
            task();
            self.run_microtasks();
        }
        !self.is_idle()
    }

    /// Ticks until every queue is empty. Returns the number of ticks taken.
    pub fn run_until_idle(&self) -> usize {
        let mut ticks = 0;
        while !self.is_idle() {
            self.tick();
            ticks += 1;
        }
        ticks
    }
}
