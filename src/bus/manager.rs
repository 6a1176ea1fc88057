//! Topic registry and dispatch for the local bus.

use crate::error::Result;
use crate::message::{DynMessage, Message};
use crate::middleware::{validate_topic, Callback, Middleware, Subscription, SubscriptionLink};
use crate::types::{Clock, SubscriptionId, SystemClock, Timestamp};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

use super::types::{BusConfig, Publisher, PublisherInner};

/// Internal subscription state.
struct Slot {
    sender: Sender<Arc<DynMessage>>,
    /// Kept so a full queue can discard its oldest entry.
    receiver: Receiver<Arc<DynMessage>>,
    callback: Callback,
    active: Arc<AtomicBool>,
}

impl Slot {
    /// Enqueue, evicting the oldest message if full. Returns the number of
    /// messages evicted.
    fn push(&self, mut msg: Arc<DynMessage>) -> u64 {
        let mut evicted = 0;
        loop {
            match self.sender.try_send(msg) {
                Ok(()) => return evicted,
                Err(TrySendError::Full(back)) => {
                    if self.receiver.try_recv().is_ok() {
                        evicted += 1;
                    }
                    msg = back;
                }
                Err(TrySendError::Disconnected(_)) => return evicted,
            }
        }
    }
}

#[derive(Default)]
struct TopicState {
    publishers: usize,
    slots: HashMap<SubscriptionId, Slot>,
}

impl TopicState {
    fn is_unused(&self) -> bool {
        self.publishers == 0 && self.slots.is_empty()
    }
}

/// State shared by the bus, its subscriptions and its publishers.
pub(super) struct BusShared {
    topics: RwLock<HashMap<String, TopicState>>,
    next_id: AtomicU64,
    dropped: AtomicU64,
    clock: Arc<dyn Clock>,
    config: BusConfig,
}

impl BusShared {
    pub(super) fn publish(&self, topic: &str, msg: Arc<DynMessage>) -> usize {
        let topics = self.topics.read();
        let Some(state) = topics.get(topic) else {
            trace!(topic, "publish with no subscribers");
            return 0;
        };

        let mut reached = 0;
        for slot in state.slots.values() {
            if !slot.active.load(Ordering::Acquire) {
                continue;
            }
            let evicted = slot.push(Arc::clone(&msg));
            if evicted > 0 {
                self.dropped.fetch_add(evicted, Ordering::Relaxed);
                trace!(topic, evicted, "queue full, dropped oldest");
            }
            reached += 1;
        }

        trace!(topic, reached, datatype = msg.datatype(), "published");
        reached
    }

    pub(super) fn unadvertise(&self, topic: &str) {
        let mut topics = self.topics.write();
        if let Some(state) = topics.get_mut(topic) {
            state.publishers = state.publishers.saturating_sub(1);
            if state.is_unused() {
                topics.remove(topic);
            }
        }
        debug!(topic, "publisher removed");
    }

    fn unsubscribe(&self, topic: &str, id: SubscriptionId) {
        let removed = {
            let mut topics = self.topics.write();
            let removed = topics.get_mut(topic).and_then(|state| state.slots.remove(&id));
            if topics.get(topic).is_some_and(TopicState::is_unused) {
                topics.remove(topic);
            }
            removed
        };
        // The callback may own subscription handles; drop it unlocked.
        drop(removed);
        debug!(topic, %id, "unsubscribed");
    }

    fn num_publishers(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, |s| s.publishers)
    }
}

/// Middleware-side handle for one local subscription.
struct LocalLink {
    id: SubscriptionId,
    topic: String,
    shared: Weak<BusShared>,
    active: Arc<AtomicBool>,
}

impl SubscriptionLink for LocalLink {
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn num_publishers(&self) -> usize {
        self.shared
            .upgrade()
            .map_or(0, |shared| shared.num_publishers(&self.topic))
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && self.shared.strong_count() > 0
    }

    fn shutdown(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            if let Some(shared) = self.shared.upgrade() {
                shared.unsubscribe(&self.topic, self.id);
            }
        }
    }
}

impl Drop for LocalLink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// In-process bus. Clones share the same topics.
#[derive(Clone)]
pub struct LocalBus {
    shared: Arc<BusShared>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Self {
        Self::with_clock_and_config(Arc::new(SystemClock), config)
    }

    /// Bus stamping messages from `clock` instead of the wall clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_clock_and_config(clock, BusConfig::default())
    }

    pub fn with_clock_and_config(clock: Arc<dyn Clock>, config: BusConfig) -> Self {
        Self {
            shared: Arc::new(BusShared {
                topics: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                dropped: AtomicU64::new(0),
                clock,
                config,
            }),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.shared.config
    }

    /// Register a publisher for `topic`.
    pub fn advertise<M: Message>(&self, topic: &str) -> Result<Publisher<M>> {
        validate_topic(topic)?;

        self.shared
            .topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .publishers += 1;
        debug!(topic, datatype = M::DATATYPE, "advertised");

        Ok(Publisher {
            inner: Arc::new(PublisherInner {
                topic: topic.to_string(),
                shared: Arc::downgrade(&self.shared),
            }),
            encoding: self.shared.config.encoding,
            _marker: PhantomData,
        })
    }

    /// Enqueue a message for every subscription on `topic`. Returns how many
    /// subscriptions it reached.
    pub fn publish(&self, topic: &str, msg: Arc<DynMessage>) -> usize {
        self.shared.publish(topic, msg)
    }

    /// Deliver everything queued so far on the calling thread. Returns the
    /// number of callbacks invoked.
    ///
    /// Messages published by a callback during this call wait for the next
    /// spin.
    pub fn spin_once(&self) -> usize {
        // Callbacks may subscribe or publish, so run them without the lock.
        let pending: Vec<(Receiver<Arc<DynMessage>>, Callback, Arc<AtomicBool>)> = {
            let topics = self.shared.topics.read();
            topics
                .values()
                .flat_map(|state| state.slots.values())
                .filter(|slot| !slot.receiver.is_empty())
                .map(|slot| {
                    (
                        slot.receiver.clone(),
                        Arc::clone(&slot.callback),
                        Arc::clone(&slot.active),
                    )
                })
                .collect()
        };

        let mut invoked = 0;
        for (receiver, callback, active) in pending {
            for _ in 0..receiver.len() {
                if !active.load(Ordering::Acquire) {
                    break;
                }
                match receiver.try_recv() {
                    Ok(msg) => {
                        callback(&msg);
                        invoked += 1;
                    }
                    Err(_) => break,
                }
            }
        }
        invoked
    }

    pub fn num_subscriptions(&self, topic: &str) -> usize {
        self.shared
            .topics
            .read()
            .get(topic)
            .map_or(0, |s| s.slots.len())
    }

    pub fn num_publishers(&self, topic: &str) -> usize {
        self.shared.num_publishers(topic)
    }

    /// Topics with at least one publisher or subscription, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.topics.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Messages evicted from full queues since the bus was created.
    pub fn dropped_messages(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for LocalBus {
    fn subscribe(
        &self,
        topic: &str,
        queue_size: usize,
        callback: Callback,
    ) -> Result<Subscription> {
        validate_topic(topic)?;

        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));
        let capacity = if queue_size == 0 {
            self.shared.config.unbounded_queue_size.max(1)
        } else {
            queue_size
        };
        let (sender, receiver) = bounded(capacity);
        let active = Arc::new(AtomicBool::new(true));

        let slot = Slot {
            sender,
            receiver,
            callback,
            active: Arc::clone(&active),
        };

        self.shared
            .topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .slots
            .insert(id, slot);
        debug!(topic, %id, capacity, "subscribed");

        Ok(Subscription::new(Arc::new(LocalLink {
            id,
            topic: topic.to_string(),
            shared: Arc::downgrade(&self.shared),
            active,
        })))
    }

    fn now(&self) -> Timestamp {
        self.shared.clock.now()
    }
}
