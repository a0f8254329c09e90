//! Benchmarks for the dispatch hot paths: channel transfer, registry
//! fan-out, and the full publish-to-delivery cycle.
//!
//! Run with: cargo bench -p hud-core --bench dispatch_bench

use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use criterion::{Criterion, criterion_group, criterion_main};
use hud_core::channel::{BlockingChannel, MainChannel};
use hud_core::dispatch::Dispatcher;
use hud_core::registry::{EventRegistry, Subscriber, SubscriberId};

struct Counter {
    hits: AtomicUsize,
}

impl Counter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            hits: AtomicUsize::new(0),
        })
    }
}

impl Subscriber<u64> for Counter {
    fn on_event(&self, event: &u64) {
        self.hits.fetch_add(*event as usize & 1, Ordering::Relaxed);
    }
}

// =============================================================================
// Channel transfer
// =============================================================================

fn bench_channel(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel");

    group.bench_function("push_pop", |b| {
        let channel = BlockingChannel::new();
        b.iter(|| {
            channel.push(black_box(1u64));
            black_box(channel.pop())
        })
    });

    group.bench_function("post_drain_64", |b| {
        let channel = MainChannel::new();
        b.iter(|| {
            for i in 0..64u64 {
                channel.post(move || {
                    black_box(i);
                });
            }
            while let Some(task) = channel.try_pop() {
                task();
            }
        })
    });

    group.finish();
}

// =============================================================================
// Registry fan-out (synchronous inner loop)
// =============================================================================

fn bench_registry_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    for subscribers in [1usize, 8, 64] {
        let mut registry = EventRegistry::new();
        let handles: Vec<_> = (0..subscribers)
            .map(|_| {
                let counter = Counter::new();
                registry.subscribe("bench", &counter);
                counter
            })
            .collect();

        group.bench_function(format!("fanout_{subscribers}"), |b| {
            b.iter(|| registry.publish_local("bench", black_box(&7u64)))
        });
        drop(handles);
    }

    group.bench_function("subscribe_unsubscribe", |b| {
        let mut registry = EventRegistry::new();
        let counter = Counter::new();
        let id = SubscriberId::of(&counter);
        b.iter(|| {
            registry.subscribe("bench", &counter);
            registry.unsubscribe("bench", id);
        })
    });

    group.finish();
}

// =============================================================================
// Full publish-to-delivery cycle through the dispatcher
// =============================================================================

fn bench_dispatch_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    group.bench_function("publish_deliver", |b| {
        let channel = MainChannel::new();
        let dispatcher = Dispatcher::new(channel.clone());
        let counter = Counter::new();
        dispatcher.subscribe("bench", &counter);
        b.iter(|| {
            dispatcher.publish("bench", black_box(7u64));
            while let Some(task) = channel.try_pop() {
                task();
            }
        })
    });

    group.bench_function("publish_deliver_batch_32", |b| {
        let channel = MainChannel::new();
        let dispatcher = Dispatcher::new(channel.clone());
        let counter = Counter::new();
        dispatcher.subscribe("bench", &counter);
        b.iter(|| {
            for i in 0..32u64 {
                dispatcher.publish("bench", black_box(i));
            }
            while let Some(task) = channel.try_pop() {
                task();
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_channel,
    bench_registry_fanout,
    bench_dispatch_cycle,
);
criterion_main!(benches);
