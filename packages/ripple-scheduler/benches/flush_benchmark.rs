use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ripple_scheduler::{Scheduler, Subscriber, SubscriberId};
use ripple_tick::{LocalEventLoop, MicrotaskPrimitive, NextTick};
use std::rc::Rc;

fn scheduler() -> (Rc<LocalEventLoop>, Scheduler) {
    let host = Rc::new(LocalEventLoop::new());
    let tick = NextTick::new(Rc::new(MicrotaskPrimitive::new(host.clone())));
    (host, Scheduler::new(tick))
}

fn benchmark_flush(c: &mut Criterion) {
    let subscribers: Vec<_> = (0..1000u64)
        .rev()
        .map(|id| {
            Subscriber::builder(SubscriberId(id), || {
                black_box(1 + 1);
            })
            .build()
        })
        .collect();

    c.bench_function("enqueue + flush 1000 reversed", |b| {
        b.iter(|| {
            let (host, scheduler) = scheduler();
            for subscriber in &subscribers {
                scheduler.enqueue(subscriber);
            }
            host.run_until_idle();
        })
    });

    c.bench_function("duplicate enqueue 1000", |b| {
        b.iter(|| {
            let (host, scheduler) = scheduler();
            for _ in 0..1000 {
                scheduler.enqueue(&subscribers[0]);
            }
            host.run_until_idle();
        })
    });
}

criterion_group!(benches, benchmark_flush);
criterion_main!(benches);
