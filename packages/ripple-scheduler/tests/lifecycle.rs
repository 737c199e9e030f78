use ripple_scheduler::{LifecycleHooks, OwnerId, Owners, Scheduler};
use ripple_tick::{LocalEventLoop, MicrotaskPrimitive, NextTick};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct RecordingHooks {
    log: RefCell<Vec<(&'static str, OwnerId)>>,
}

impl LifecycleHooks for RecordingHooks {
    fn updated(&self, owner: OwnerId) {
        self.log.borrow_mut().push(("updated", owner));
    }

    fn activated(&self, owner: OwnerId) {
        self.log.borrow_mut().push(("activated", owner));
    }

    fn deactivated(&self, owner: OwnerId) {
        self.log.borrow_mut().push(("deactivated", owner));
    }
}

struct Fixture {
    host: Rc<LocalEventLoop>,
    owners: Owners,
    hooks: Rc<RecordingHooks>,
    scheduler: Scheduler,
}

fn fixture() -> Fixture {
    let host = Rc::new(LocalEventLoop::new());
    let tick = NextTick::new(Rc::new(MicrotaskPrimitive::new(host.clone())));
    let owners = Owners::new();
    let hooks = Rc::new(RecordingHooks::default());
    let scheduler = Scheduler::builder(tick)
        .owners(owners.clone())
        .hooks(hooks.clone())
        .build();
    Fixture {
        host,
        owners,
        hooks,
        scheduler,
    }
}

#[test]
fn test_destroyed_owner_subscriber_is_skipped_at_run_time() {
    let f = fixture();
    let owner = f.owners.create(None);
    let ran = Rc::new(RefCell::new(false));
    let subscriber = {
        let ran = ran.clone();
        f.scheduler
            .subscriber(move || *ran.borrow_mut() = true)
            .owner(owner)
            .build()
    };
    f.owners.set_render_subscriber(owner, subscriber.id());
    f.owners.mark_mounted(owner);

    f.scheduler.enqueue(&subscriber);
    f.owners.destroy(owner);
    let report = f.scheduler.flush().unwrap();

    assert!(!*ran.borrow());
    assert_eq!(report.skipped, vec![subscriber.id()]);
    assert!(report.ran.is_empty());
    assert!(f.hooks.log.borrow().is_empty());
    assert!(!f.scheduler.contains(subscriber.id()));
}

#[test]
fn test_owner_destroyed_mid_drain_is_skipped() {
    let f = fixture();
    let parent = f.owners.create(None);
    let child = f.owners.create(Some(parent));
    let log = Rc::new(RefCell::new(Vec::new()));

    let parent_render = {
        let log = log.clone();
        let owners = f.owners.clone();
        f.scheduler
            .subscriber(move || {
                log.borrow_mut().push("parent");
                owners.destroy(child);
            })
            .owner(parent)
            .build()
    };
    let child_render = {
        let log = log.clone();
        f.scheduler
            .subscriber(move || log.borrow_mut().push("child"))
            .owner(child)
            .build()
    };

    f.scheduler.enqueue(&child_render);
    f.scheduler.enqueue(&parent_render);
    f.host.run_until_idle();

    assert_eq!(*log.borrow(), vec!["parent"]);
    assert!(!f.owners.is_live(child));
    assert!(f.owners.is_live(parent));
}

#[test]
fn test_torn_down_subscriber_is_skipped() {
    let f = fixture();
    let ran = Rc::new(RefCell::new(false));
    let subscriber = {
        let ran = ran.clone();
        f.scheduler.subscriber(move || *ran.borrow_mut() = true).build()
    };

    f.scheduler.enqueue(&subscriber);
    subscriber.teardown();
    f.host.run_until_idle();

    assert!(!*ran.borrow());
    assert!(!subscriber.is_active());
}

#[test]
fn test_updated_requires_canonical_mounted_subscriber() {
    let f = fixture();
    let mounted = f.owners.create(None);
    let unmounted = f.owners.create(None);

    let render = f.scheduler.subscriber(|| {}).owner(mounted).build();
    let watcher = f
        .scheduler
        .subscriber(|| {})
        .owner(mounted)
        .user("items.length")
        .build();
    let other = f.scheduler.subscriber(|| {}).owner(unmounted).build();

    f.owners.set_render_subscriber(mounted, render.id());
    f.owners.mark_mounted(mounted);
    f.owners.set_render_subscriber(unmounted, other.id());

    for subscriber in [&render, &watcher, &other] {
        f.scheduler.enqueue(subscriber);
    }
    f.host.run_until_idle();

    assert_eq!(*f.hooks.log.borrow(), vec![("updated", mounted)]);
}

#[test]
fn test_queued_activation_fires_after_drain_children_first() {
    let f = fixture();
    let cached = f.owners.create(None);
    let inner = f.owners.create(Some(cached));
    f.owners.deactivate(cached, true, &*f.hooks);
    assert_eq!(
        *f.hooks.log.borrow(),
        vec![("deactivated", inner), ("deactivated", cached)]
    );
    f.hooks.log.borrow_mut().clear();

    let seen_inactive = Rc::new(RefCell::new(None));
    let render = {
        let scheduler = f.scheduler.clone();
        let owners = f.owners.clone();
        let seen = seen_inactive.clone();
        f.scheduler
            .subscriber(move || {
                scheduler.queue_activated(cached);
                *seen.borrow_mut() = owners.inactive(cached);
            })
            .build()
    };

    f.scheduler.enqueue(&render);
    f.host.run_until_idle();

    assert_eq!(*seen_inactive.borrow(), Some(false));
    assert_eq!(
        *f.hooks.log.borrow(),
        vec![("activated", inner), ("activated", cached)]
    );
    assert_eq!(f.owners.inactive(cached), Some(false));
    assert_eq!(f.owners.inactive(inner), Some(false));
}

#[test]
fn test_activation_inside_inactive_tree_is_deferred() {
    let f = fixture();
    let outer = f.owners.create(None);
    let nested = f.owners.create(Some(outer));

    f.owners.deactivate(outer, true, &*f.hooks);
    f.owners.deactivate(nested, true, &*f.hooks);
    f.hooks.log.borrow_mut().clear();

    f.owners.activate(nested, true, &*f.hooks);
    assert!(f.hooks.log.borrow().is_empty());
    assert!(f.owners.is_in_inactive_tree(nested));

    f.owners.activate(outer, true, &*f.hooks);
    assert_eq!(
        *f.hooks.log.borrow(),
        vec![("activated", nested), ("activated", outer)]
    );
}

#[test]
fn test_directly_deactivated_child_stays_inactive_when_parent_activates() {
    let f = fixture();
    let parent = f.owners.create(None);
    let child = f.owners.create(Some(parent));

    f.owners.deactivate(child, true, &*f.hooks);
    f.owners.deactivate(parent, true, &*f.hooks);
    f.hooks.log.borrow_mut().clear();

    f.owners.activate(parent, true, &*f.hooks);

    assert_eq!(*f.hooks.log.borrow(), vec![("activated", parent)]);
    assert_eq!(f.owners.inactive(child), Some(true));
}
