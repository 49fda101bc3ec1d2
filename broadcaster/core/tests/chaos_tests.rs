//! Chaos Tests for Registry Resilience
//!
//! These tests hammer the registry from many tasks at once:
//! - Subscribers joining and leaving while events are broadcast
//! - Stalled subscribers next to fast ones
//! - Handles dropped mid-broadcast
//!
//! They are short enough to run with the normal suite.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use broadcaster_core::{Event, Registry, Subscriber};

/// Configuration for chaos test scenarios
#[derive(Clone, Debug)]
struct ChaosConfig {
    /// Number of concurrent churn tasks
    concurrency: usize,
    /// Registrations performed by each churn task
    iterations: usize,
    /// Events published by the broadcaster task
    events: usize,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            concurrency: 16,
            iterations: 50,
            events: 500,
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn chaos_churn_during_broadcast() {
    let config = ChaosConfig::default();
    let registry = Registry::new();
    let stop = Arc::new(AtomicBool::new(false));
    let received = Arc::new(AtomicUsize::new(0));

    let mut churners = JoinSet::new();
    for _ in 0..config.concurrency {
        let registry = registry.clone();
        let received = Arc::clone(&received);
        let iterations = config.iterations;
        churners.spawn(async move {
            for _ in 0..iterations {
                let (subscriber, mut stream) = Subscriber::channel(8, Vec::new());
                let registration = registry.register(subscriber);
                tokio::task::yield_now().await;
                while stream.try_recv().is_some() {
                    received.fetch_add(1, Ordering::Relaxed);
                }
                registration.release();
                assert!(!registry.contains(registration.id()));
            }
        });
    }

    let publisher = {
        let registry = registry.clone();
        let stop = Arc::clone(&stop);
        let events = config.events;
        tokio::spawn(async move {
            let mut published = 0;
            while published < events && !stop.load(Ordering::Relaxed) {
                registry.broadcast(&Event::new(format!("event-{published}")));
                published += 1;
                tokio::task::yield_now().await;
            }
            published
        })
    };

    while let Some(result) = churners.join_next().await {
        result.unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    let published = publisher.await.unwrap();

    assert!(published > 0);
    assert_eq!(registry.count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn chaos_stalled_subscriber_does_not_block_others() {
    let registry = Registry::new();

    // Never read from.
    let (stalled, _stalled_stream) = Subscriber::channel(4, Vec::new());
    let _stalled_registration = registry.register(stalled);

    let (fast, mut fast_stream) = Subscriber::channel(1_000, Vec::new());
    let _fast_registration = registry.register(fast);

    let publisher = {
        let registry = registry.clone();
        tokio::spawn(async move {
            let mut dropped = 0;
            for i in 0..1_000 {
                dropped += registry.broadcast(&Event::new(i.to_string())).dropped;
            }
            dropped
        })
    };

    let dropped = tokio::time::timeout(Duration::from_secs(5), publisher)
        .await
        .expect("broadcast blocked on a stalled subscriber")
        .unwrap();
    assert_eq!(dropped, 1_000 - 4);

    let mut expected = 0;
    while let Some(event) = fast_stream.try_recv() {
        assert_eq!(event.payload(), expected.to_string());
        expected += 1;
    }
    assert_eq!(expected, 1_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn chaos_drop_handles_while_broadcasting() {
    let registry = Registry::new();
    let mut handles = Vec::new();
    let mut streams = Vec::new();
    for _ in 0..64 {
        let (subscriber, stream) = Subscriber::channel(16, Vec::new());
        handles.push(registry.register(subscriber));
        streams.push(stream);
    }

    let publisher = {
        let registry = registry.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                registry.broadcast(&Event::new(i.to_string()));
                tokio::task::yield_now().await;
            }
        })
    };

    let dropper = tokio::spawn(async move {
        while let Some(handle) = handles.pop() {
            drop(handle);
            tokio::task::yield_now().await;
        }
    });

    publisher.await.unwrap();
    dropper.await.unwrap();
    drop(streams);

    assert_eq!(registry.count(), 0);
    assert_eq!(registry.broadcast(&Event::new("late")).recipients, 0);
}
