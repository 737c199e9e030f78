use crate::owner::OwnerId;
use ripple_tick::CallbackError;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Creation-order identity. Lower ids were created earlier, so an owner's
/// subscribers always sort before those of its descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber #{}", self.0)
    }
}

/// Hands out strictly increasing ids, never reused.
#[derive(Debug, Default)]
pub struct SubscriberIds {
    last: Cell<u64>,
}

impl SubscriberIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> SubscriberId {
        let id = self.last.get() + 1;
        self.last.set(id);
        SubscriberId(id)
    }
}

type RunFn = Box<dyn Fn() -> anyhow::Result<()>>;

/// A unit of reactive computation the scheduler re-runs when it becomes dirty.
pub struct Subscriber {
    id: SubscriberId,
    run: RunFn,
    before: Option<Box<dyn Fn()>>,
    user: bool,
    expression: Option<String>,
    owner: Option<OwnerId>,
    active: Cell<bool>,
}

impl Subscriber {
    pub fn builder<F>(id: SubscriberId, run: F) -> SubscriberBuilder
    where
        F: Fn() + 'static,
    {
        Self::fallible_builder(id, move || {
            run();
            Ok(())
        })
    }

    pub fn fallible_builder<F>(id: SubscriberId, run: F) -> SubscriberBuilder
    where
        F: Fn() -> anyhow::Result<()> + 'static,
    {
        SubscriberBuilder {
            subscriber: Subscriber {
                id,
                run: Box::new(run),
                before: None,
                user: false,
                expression: None,
                owner: None,
                active: Cell::new(true),
            },
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    pub fn is_user(&self) -> bool {
        self.user
    }

    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Stops future re-runs. A run already in progress is not affected.
    pub fn teardown(&self) {
        self.active.set(false);
    }

    /// Where a runaway loop lives, for diagnostics.
    pub fn describe(&self) -> String {
        match (self.user, self.expression()) {
            (true, Some(expression)) => format!("in watcher with expression \"{expression}\""),
            (true, None) => format!("in watcher {}", self.id),
            (false, _) => "in a component render function".to_owned(),
        }
    }

    pub(crate) fn run_before(&self) -> Result<(), CallbackError> {
        let Some(before) = &self.before else {
            return Ok(());
        };
        let context = format!("before hook of {}", self.id);
        ripple_tick::guard(
            || {
                before();
                Ok(())
            },
            &context,
        )
    }

    pub(crate) fn run(&self) -> Result<(), CallbackError> {
        ripple_tick::guard(|| (self.run)(), &self.id)
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("user", &self.user)
            .field("expression", &self.expression)
            .field("owner", &self.owner)
            .field("active", &self.active.get())
            .finish_non_exhaustive()
    }
}

#[must_use]
pub struct SubscriberBuilder {
    subscriber: Subscriber,
}

impl SubscriberBuilder {
    /// Hook run right before every re-run.
    pub fn before<F>(mut self, before: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.subscriber.before = Some(Box::new(before));
        self
    }

    /// Marks the subscriber as user-authored.
    pub fn user(mut self, expression: impl Into<String>) -> Self {
        self.subscriber.user = true;
        self.subscriber.expression = Some(expression.into());
        self
    }

    pub fn owner(mut self, owner: OwnerId) -> Self {
        self.subscriber.owner = Some(owner);
        self
    }

    pub fn build(self) -> Rc<Subscriber> {
        Rc::new(self.subscriber)
    }
}
