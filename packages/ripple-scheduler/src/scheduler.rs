use crate::activation::{ActivationQueue, flush_activations};
use crate::clock::{Clock, MonotonicClock};
use crate::config::SchedulerConfig;
use crate::error::{RunawayUpdate, SchedulerError};
use crate::hooks::{FlushObserver, LifecycleHooks, NoopHooks, invoke_hook};
use crate::owner::{OwnerId, Owners};
use crate::report::FlushReport;
use crate::subscriber::{Subscriber, SubscriberBuilder, SubscriberId, SubscriberIds};
use ripple_tick::NextTick;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Re-entries allowed per subscriber per flush before the flush is aborted.
pub const MAX_UPDATE_COUNT: u32 = 100;

#[derive(Default)]
struct QueueState {
    queue: Vec<Rc<Subscriber>>,
    has: FxHashSet<SubscriberId>,
    circular: FxHashMap<SubscriberId, u32>,
    activated: ActivationQueue,
    /// Cursor of the drain. Everything before it has been processed.
    index: usize,
    waiting: bool,
    flushing: bool,
}

impl QueueState {
    fn reset(&mut self) {
        self.queue.clear();
        self.activated.clear();
        self.has.clear();
        self.circular.clear();
        self.index = 0;
        self.waiting = false;
        self.flushing = false;
    }

    /// Mid-drain insert: keep the unprocessed tail sorted by id, never landing at
    /// or before the cursor.
    fn insert_sorted(&mut self, subscriber: Rc<Subscriber>) {
        let id = subscriber.id();
        let mut at = self.queue.len();
        while at > self.index + 1 && self.queue[at - 1].id() > id {
            at -= 1;
        }
        self.queue.insert(at, subscriber);
    }
}

struct Inner {
    state: RefCell<QueueState>,
    config: SchedulerConfig,
    tick: NextTick,
    owners: Owners,
    hooks: Rc<dyn LifecycleHooks>,
    clock: Rc<dyn Clock>,
    ids: SubscriberIds,
    flush_timestamp: Cell<f64>,
    observer: RefCell<Option<Rc<dyn FlushObserver>>>,
}

/// The scheduler queue. Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<Inner>,
}

pub struct SchedulerBuilder {
    tick: NextTick,
    config: SchedulerConfig,
    owners: Owners,
    hooks: Rc<dyn LifecycleHooks>,
    clock: Rc<dyn Clock>,
    observer: Option<Rc<dyn FlushObserver>>,
}

impl SchedulerBuilder {
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn owners(mut self, owners: Owners) -> Self {
        self.owners = owners;
        self
    }

    pub fn hooks(mut self, hooks: Rc<dyn LifecycleHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn observer(mut self, observer: Rc<dyn FlushObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Scheduler {
        Scheduler {
            inner: Rc::new(Inner {
                state: RefCell::new(QueueState::default()),
                config: self.config,
                tick: self.tick,
                owners: self.owners,
                hooks: self.hooks,
                clock: self.clock,
                ids: SubscriberIds::new(),
                flush_timestamp: Cell::new(0.0),
                observer: RefCell::new(self.observer),
            }),
        }
    }
}

impl Scheduler {
    pub fn builder(tick: NextTick) -> SchedulerBuilder {
        SchedulerBuilder {
            tick,
            config: SchedulerConfig::default(),
            owners: Owners::new(),
            hooks: Rc::new(NoopHooks),
            clock: Rc::new(MonotonicClock::new()),
            observer: None,
        }
    }

    pub fn new(tick: NextTick) -> Self {
        Self::builder(tick).build()
    }

    /// Starts a subscriber with the next creation-order id of this scheduler.
    pub fn subscriber<F>(&self, run: F) -> SubscriberBuilder
    where
        F: Fn() + 'static,
    {
        Subscriber::builder(self.inner.ids.next(), run)
    }

    pub fn fallible_subscriber<F>(&self, run: F) -> SubscriberBuilder
    where
        F: Fn() -> anyhow::Result<()> + 'static,
    {
        Subscriber::fallible_builder(self.inner.ids.next(), run)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn owners(&self) -> &Owners {
        &self.inner.owners
    }

    pub fn tick(&self) -> &NextTick {
        &self.inner.tick
    }

    pub fn set_flush_observer(&self, observer: Option<Rc<dyn FlushObserver>>) {
        *self.inner.observer.borrow_mut() = observer;
    }

    /// Timestamp taken at the start of the latest flush.
    pub fn current_flush_timestamp(&self) -> f64 {
        self.inner.flush_timestamp.get()
    }

    pub fn is_flushing(&self) -> bool {
        self.inner.state.borrow().flushing
    }

    /// True from the first enqueue of a cycle until its flush resets state.
    pub fn is_waiting(&self) -> bool {
        self.inner.state.borrow().waiting
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.inner.state.borrow().has.contains(&id)
    }

    /// Entry point for the reactivity layer.
    pub fn notify_dirty(&self, subscriber: &Rc<Subscriber>) {
        self.enqueue(subscriber);
    }

    /// Queues a dirty subscriber. Repeats within one cycle collapse into one re-run.
    pub fn enqueue(&self, subscriber: &Rc<Subscriber>) {
        let request_flush = {
            let mut state = self.inner.state.borrow_mut();
            if !state.has.insert(subscriber.id()) {
                return;
            }
            if state.flushing {
                state.insert_sorted(Rc::clone(subscriber));
            } else {
                state.queue.push(Rc::clone(subscriber));
            }
            !std::mem::replace(&mut state.waiting, true)
        };
        if !request_flush {
            return;
        }

        if self.inner.config.sync {
            self.flush_logged();
            return;
        }

        let weak = Rc::downgrade(&self.inner);
        self.inner.tick.schedule(
            move || {
                if let Some(inner) = weak.upgrade() {
                    Scheduler { inner }.flush_logged();
                }
            },
            Some("flush scheduler queue"),
        );
    }

    /// Removes a queued subscriber the cursor has not reached yet.
    pub fn cancel(&self, id: SubscriberId) -> bool {
        let mut state = self.inner.state.borrow_mut();
        let start = if state.flushing { state.index + 1 } else { 0 };
        let Some(offset) = state.queue[start.min(state.queue.len())..]
            .iter()
            .position(|subscriber| subscriber.id() == id)
        else {
            return false;
        };
        state.queue.remove(start + offset);
        state.has.remove(&id);
        true
    }

    /// Queues an owner brought back from a suspended subtree; its `activated` hooks
    /// fire after the current drain.
    pub fn queue_activated(&self, owner: OwnerId) {
        self.inner
            .state
            .borrow_mut()
            .activated
            .record(owner, &self.inner.owners);
    }

    /// Sorts and drains the queue, then fires activation and settle hooks.
    pub fn flush(&self) -> Result<FlushReport, SchedulerError> {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.flushing {
                return Err(SchedulerError::AlreadyFlushing);
            }
            if state.queue.is_empty() && state.activated.is_empty() {
                state.waiting = false;
                return Ok(FlushReport {
                    timestamp: self.inner.flush_timestamp.get(),
                    ..FlushReport::default()
                });
            }
            self.inner.flush_timestamp.set(self.inner.clock.now());
            state.flushing = true;
            state.index = 0;
            // Ascending creation order runs parents before children and an owner's
            // user subscribers before its render subscriber.
            state.queue.sort_by_key(|subscriber| subscriber.id());
        }

        let timestamp = self.inner.flush_timestamp.get();
        tracing::debug!(len = self.len(), timestamp, "flushing scheduler queue");

        let mut report = FlushReport {
            timestamp,
            ..FlushReport::default()
        };

        loop {
            // The queue can grow while draining; re-read its length every step.
            let subscriber = {
                let state = self.inner.state.borrow();
                match state.queue.get(state.index) {
                    Some(subscriber) => Rc::clone(subscriber),
                    None => break,
                }
            };
            let id = subscriber.id();

            if self.is_stale(&subscriber) {
                self.inner.state.borrow_mut().has.remove(&id);
                report.skipped.push(id);
            } else {
                if let Err(error) = subscriber.run_before() {
                    self.inner.tick.report(&error);
                }
                self.inner.state.borrow_mut().has.remove(&id);
                if let Err(error) = subscriber.run() {
                    self.inner.tick.report(&error);
                }
                report.ran.push(id);
                report.runaway = self.check_circular(&subscriber);
            }

            self.inner.state.borrow_mut().index += 1;
            if report.runaway.is_some() {
                break;
            }
        }

        let (activated, processed) = {
            let mut state = self.inner.state.borrow_mut();
            let activated = state.activated.take();
            let mut processed = std::mem::take(&mut state.queue);
            processed.truncate(state.index);
            state.reset();
            (activated, processed)
        };

        flush_activations(
            &activated,
            &self.inner.owners,
            &*self.inner.hooks,
            &self.inner.tick,
        );
        self.call_updated_hooks(&processed);

        if self.inner.config.devtools {
            let observer = self.inner.observer.borrow().clone();
            if let Some(observer) = observer {
                observer.flushed(&report);
            }
        }
        Ok(report)
    }

    fn flush_logged(&self) {
        if let Err(error) = self.flush() {
            tracing::warn!("scheduled flush skipped: {}", error);
        }
    }

    fn is_stale(&self, subscriber: &Subscriber) -> bool {
        !subscriber.is_active()
            || subscriber
                .owner()
                .is_some_and(|owner| !self.inner.owners.is_live(owner))
    }

    fn check_circular(&self, subscriber: &Subscriber) -> Option<RunawayUpdate> {
        let id = subscriber.id();
        let mut state = self.inner.state.borrow_mut();
        if !state.has.contains(&id) {
            return None;
        }
        let count = state.circular.entry(id).or_insert(0);
        *count += 1;
        if *count <= self.inner.config.max_update_count {
            return None;
        }

        let runaway = RunawayUpdate {
            id,
            owner: subscriber.owner(),
            description: subscriber.describe(),
            count: *count,
        };
        tracing::warn!(subscriber = id.0, count = runaway.count, "{}", runaway);
        Some(runaway)
    }

    /// Last-created first, so descendants settle before their ancestors.
    fn call_updated_hooks(&self, processed: &[Rc<Subscriber>]) {
        for subscriber in processed.iter().rev() {
            let Some(owner) = subscriber.owner() else {
                continue;
            };
            if self.inner.owners.settles(owner, subscriber.id()) {
                invoke_hook(&self.inner.tick, "updated", || self.inner.hooks.updated(owner));
            }
        }
    }
}
