//! Property tests for history semantics.

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use topic_history::{Context, DynMessage, LocalBus, ManualClock, Message, Timestamp};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Value {
    v: u32,
}

impl Message for Value {
    const DATATYPE: &'static str = "test_msgs/Value";
}

const TOPICS: [&str; 3] = ["/alpha", "/beta", "/gamma"];

proptest! {
    /// After any sequence of deliveries, each topic reports exactly the last
    /// message delivered on it, stamped with the clock at delivery.
    #[test]
    fn last_write_wins_per_topic(
        deliveries in prop::collection::vec((0usize..TOPICS.len(), any::<u32>()), 0..64)
    ) {
        let clock = Arc::new(ManualClock::new(Timestamp(0)));
        let bus = LocalBus::with_clock(clock.clone());
        let context = Context::new(Arc::new(bus.clone()));
        let subs: Vec<_> = TOPICS
            .iter()
            .map(|t| context.subscribe(t, 1, |_| {}).unwrap())
            .collect();

        let mut expected: HashMap<usize, (Timestamp, u32)> = HashMap::new();
        for (i, (topic, v)) in deliveries.iter().enumerate() {
            let stamp = clock.advance(1 + i as i64);
            let msg = DynMessage::from_message(&Value { v: *v }).unwrap();
            bus.publish(TOPICS[*topic], Arc::new(msg));
            bus.spin_once();
            expected.insert(*topic, (stamp, *v));
        }

        for (index, sub) in subs.iter().enumerate() {
            let event = sub.last_receive();
            match expected.get(&index) {
                Some((stamp, v)) => {
                    prop_assert_eq!(event.timestamp(), *stamp);
                    prop_assert_eq!(event.message::<Value>(), Some(Value { v: *v }));
                }
                None => {
                    prop_assert!(event.is_empty());
                    prop_assert_eq!(event.timestamp(), Timestamp::ZERO);
                }
            }
        }
    }

    /// Timestamps observed on one topic never go backwards.
    #[test]
    fn timestamps_non_decreasing(steps in prop::collection::vec(0i64..1_000, 1..32)) {
        let clock = Arc::new(ManualClock::new(Timestamp(0)));
        let bus = LocalBus::with_clock(clock.clone());
        let context = Context::new(Arc::new(bus.clone()));
        let sub = context.subscribe("/mono", 1, |_| {}).unwrap();
        let publisher = bus.advertise::<Value>("/mono").unwrap();

        let mut last = Timestamp::ZERO;
        for (i, step) in steps.iter().enumerate() {
            clock.advance(*step);
            publisher.publish(&Value { v: i as u32 }).unwrap();
            bus.spin_once();

            let stamp = sub.last_receive().timestamp();
            prop_assert!(stamp >= last);
            last = stamp;
        }
    }
}
