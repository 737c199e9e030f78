use ripple_scheduler::{MAX_UPDATE_COUNT, Scheduler, Subscriber, SubscriberId};
use ripple_tick::{LocalEventLoop, MicrotaskPrimitive, NextTick};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

fn setup() -> (Rc<LocalEventLoop>, Scheduler) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let host = Rc::new(LocalEventLoop::new());
    let tick = NextTick::new(Rc::new(MicrotaskPrimitive::new(host.clone())));
    (host, Scheduler::new(tick))
}

/// A subscriber that re-dirties itself on every run.
fn self_dirtying(
    scheduler: &Scheduler,
    runs: Rc<Cell<u32>>,
    expression: Option<&str>,
) -> Rc<Subscriber> {
    let scheduler = scheduler.clone();
    let this: Rc<RefCell<Weak<Subscriber>>> = Rc::new(RefCell::new(Weak::new()));
    let handle = this.clone();
    let builder = Subscriber::builder(SubscriberId(1), move || {
        runs.set(runs.get() + 1);
        if let Some(me) = handle.borrow().upgrade() {
            scheduler.enqueue(&me);
        }
    });
    let subscriber = match expression {
        Some(expression) => builder.user(expression).build(),
        None => builder.build(),
    };
    *this.borrow_mut() = Rc::downgrade(&subscriber);
    subscriber
}

#[test]
fn test_runaway_subscriber_aborts_flush_after_bound() {
    let (_host, scheduler) = setup();
    let runs = Rc::new(Cell::new(0));
    let looping = self_dirtying(&scheduler, runs.clone(), Some("count"));

    let bystander_ran = Rc::new(Cell::new(false));
    let bystander = {
        let ran = bystander_ran.clone();
        Subscriber::builder(SubscriberId(2), move || ran.set(true)).build()
    };

    scheduler.enqueue(&looping);
    scheduler.enqueue(&bystander);
    let report = scheduler.flush().unwrap();

    assert_eq!(runs.get(), MAX_UPDATE_COUNT + 1);
    assert_eq!(report.ran.len() as u32, MAX_UPDATE_COUNT + 1);
    let runaway = report.runaway.expect("flush should report the runaway subscriber");
    assert_eq!(runaway.id, SubscriberId(1));
    assert_eq!(runaway.count, MAX_UPDATE_COUNT + 1);
    assert_eq!(
        runaway.to_string(),
        "you may have an infinite update loop in watcher with expression \"count\""
    );

    // The bystander was queued behind the loop and is dropped, not retried.
    assert!(!bystander_ran.get());
    assert!(scheduler.is_empty());
    assert!(!scheduler.is_waiting());
    assert!(!scheduler.contains(SubscriberId(2)));
}

#[test]
fn test_render_loop_diagnostic_names_render_function() {
    let (_host, scheduler) = setup();
    let runs = Rc::new(Cell::new(0));
    let looping = self_dirtying(&scheduler, runs, None);

    scheduler.enqueue(&looping);
    let runaway = scheduler.flush().unwrap().runaway.unwrap();

    assert_eq!(runaway.description, "in a component render function");
}

#[test]
fn test_scheduler_recovers_after_runaway() {
    let (host, scheduler) = setup();
    let runs = Rc::new(Cell::new(0));
    let looping = self_dirtying(&scheduler, runs.clone(), None);

    scheduler.enqueue(&looping);
    host.run_until_idle();
    assert_eq!(runs.get(), MAX_UPDATE_COUNT + 1);

    let ran = Rc::new(Cell::new(false));
    let next = {
        let ran = ran.clone();
        Subscriber::builder(SubscriberId(9), move || ran.set(true)).build()
    };
    scheduler.enqueue(&next);
    host.run_until_idle();
    assert!(ran.get());
}
