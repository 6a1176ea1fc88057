//! Multi-threaded delivery and query tests.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use topic_history::{Context, LocalBus, ManualClock, Message, Subscriber, Timestamp};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Seq {
    n: i64,
}

impl Message for Seq {
    const DATATYPE: &'static str = "test_msgs/Seq";
}

#[test]
fn test_concurrent_subscribers_share_one_shadow() {
    let bus = LocalBus::new();
    let context = Context::new(Arc::new(bus.clone()));
    let threads = 12;
    let barrier = Arc::new(Barrier::new(threads));

    let subs: Vec<Subscriber> = (0..threads)
        .map(|_| {
            let context = context.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                context.subscribe("/race", 1, |_| {}).unwrap()
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    let first = subs[0].shadow().unwrap();
    assert!(subs.iter().all(|s| Arc::ptr_eq(s.shadow().unwrap(), first)));
    // Every user subscription plus exactly one shadow
    assert_eq!(bus.num_subscriptions("/race"), threads + 1);
}

#[test]
fn test_spinner_thread_keeps_consistent_events() {
    let clock = Arc::new(ManualClock::new(Timestamp(0)));
    let bus = LocalBus::with_clock(clock.clone());
    let context = Context::new(Arc::new(bus.clone()));
    let topics = ["/a", "/b", "/c", "/d"];

    let subs: Vec<Subscriber> = topics
        .iter()
        .map(|t| context.subscribe(t, 1, |_| {}).unwrap())
        .collect();

    let done = Arc::new(AtomicBool::new(false));

    // A single spinner keeps per-topic delivery in publish order
    let spinner = {
        let bus = bus.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                bus.spin_once();
                thread::yield_now();
            }
        })
    };

    // One publisher per topic
    let publishers: Vec<_> = topics
        .iter()
        .map(|t| {
            let publisher = bus.advertise::<Seq>(t).unwrap();
            thread::spawn(move || {
                for n in 1..=500 {
                    publisher.publish(&Seq { n }).unwrap();
                }
            })
        })
        .collect();

    // Readers poll concurrently; every event they see must be whole
    let readers: Vec<_> = subs
        .iter()
        .cloned()
        .map(|sub| {
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    let event = sub.last_receive();
                    if !event.is_empty() {
                        let seq = event.message::<Seq>().expect("payload decodes");
                        assert!((1..=500).contains(&seq.n));
                    }
                }
            })
        })
        .collect();

    for handle in publishers {
        handle.join().unwrap();
    }
    done.store(true, Ordering::Release);
    spinner.join().unwrap();
    for handle in readers {
        handle.join().unwrap();
    }
    bus.spin_once();

    // Shadow queues hold one message, so the last published is what remains
    for sub in &subs {
        assert_eq!(sub.last_message::<Seq>(), Some(Seq { n: 500 }));
    }
}

#[test]
fn test_drop_subscribers_while_delivering() {
    let bus = LocalBus::new();
    let context = Context::new(Arc::new(bus.clone()));
    let publisher = bus.advertise::<Seq>("/churn").unwrap();

    let churn = {
        let context = context.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                let sub = context.subscribe("/churn", 1, |_| {}).unwrap();
                let _ = sub.last_receive();
            }
        })
    };

    for n in 0..200 {
        publisher.publish(&Seq { n }).unwrap();
        bus.spin_once();
    }
    churn.join().unwrap();

    assert!(!context.history().is_tracked("/churn"));
    assert_eq!(bus.num_subscriptions("/churn"), 0);
}
