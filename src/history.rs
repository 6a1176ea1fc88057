//! Per-topic cache of the last received message.
//!
//! A [`History`] keeps one entry per topic name. Each entry is fed by a
//! shadow subscription that the history installs through the middleware the
//! first time someone asks for the topic. The shadow subscription is owned by
//! the callers of [`History::subscribe`] (normally [`Subscriber`] copies); the
//! history only keeps a weak reference, so the shadow goes away with its last
//! owner while the cached event stays.
//!
//! All operations share one lock. Reads copy the event out.
//!
//! [`Subscriber`]: crate::Subscriber

use crate::config::HistoryConfig;
use crate::error::Result;
use crate::event::MessageEvent;
use crate::message::DynMessage;
use crate::middleware::{Callback, Middleware, Subscription};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// Internal subscription that keeps one topic's entry current.
pub struct ShadowSubscription {
    topic: String,
    subscription: Subscription,
}

impl ShadowSubscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl Drop for ShadowSubscription {
    fn drop(&mut self) {
        debug!(topic = %self.topic, "shadow subscription released");
    }
}

impl fmt::Debug for ShadowSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowSubscription")
            .field("topic", &self.topic)
            .field("subscription", &self.subscription)
            .finish()
    }
}

#[derive(Default)]
struct Entry {
    /// Liveness only; never upgraded to keep the shadow alive.
    shadow: Weak<ShadowSubscription>,
    event: MessageEvent,
}

/// Shared, thread-safe table of the latest event per topic.
pub struct History {
    middleware: Arc<dyn Middleware>,
    config: HistoryConfig,
    entries: Mutex<HashMap<String, Entry>>,
    /// Handed to shadow callbacks so the middleware never owns the history.
    this: Weak<History>,
}

impl History {
    pub fn new(middleware: Arc<dyn Middleware>) -> Arc<Self> {
        Self::with_config(middleware, HistoryConfig::default())
    }

    pub fn with_config(middleware: Arc<dyn Middleware>, config: HistoryConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            middleware,
            config,
            entries: Mutex::new(HashMap::new()),
            this: this.clone(),
        })
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn middleware(&self) -> &Arc<dyn Middleware> {
        &self.middleware
    }

    /// Make sure a shadow subscription exists for `topic` and return it.
    ///
    /// Every caller asking for the same topic while a shadow is alive gets
    /// that same shadow. A middleware rejection is returned as is and not
    /// retried.
    pub fn subscribe(&self, topic: &str, queue_size: usize) -> Result<Arc<ShadowSubscription>> {
        let mut entries = self.entries.lock();

        if let Some(shadow) = entries.get(topic).and_then(|e| e.shadow.upgrade()) {
            return Ok(shadow);
        }

        let history = self.this.clone();
        let name = topic.to_string();
        let callback: Callback = Arc::new(move |msg: &Arc<DynMessage>| {
            if let Some(history) = history.upgrade() {
                history.receive(&name, msg);
            }
        });

        let subscription = self
            .middleware
            .subscribe(topic, queue_size, callback)
            .map_err(|e| {
                warn!(topic, error = %e, "shadow subscription rejected");
                e
            })?;

        let shadow = Arc::new(ShadowSubscription {
            topic: topic.to_string(),
            subscription,
        });
        entries.entry(topic.to_string()).or_default().shadow = Arc::downgrade(&shadow);
        debug!(topic, queue_size, "shadow subscription created");

        Ok(shadow)
    }

    /// Latest event recorded for `topic`, or the empty event.
    pub fn last_receive(&self, topic: &str) -> MessageEvent {
        self.entries
            .lock()
            .get(topic)
            .map(|e| e.event.clone())
            .unwrap_or_default()
    }

    /// Shadow callback: stamp and store `msg` as the latest on `topic`.
    pub(crate) fn receive(&self, topic: &str, msg: &Arc<DynMessage>) {
        let mut entries = self.entries.lock();
        let stamp = self.middleware.now();
        entries.entry(topic.to_string()).or_default().event =
            MessageEvent::new(stamp, Arc::clone(msg));
        trace!(topic, %stamp, datatype = msg.datatype(), "recorded");
    }

    /// Whether a live shadow subscription feeds `topic`.
    pub fn is_tracked(&self, topic: &str) -> bool {
        self.entries
            .lock()
            .get(topic)
            .is_some_and(|e| e.shadow.strong_count() > 0)
    }

    /// Topics with an entry, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop the cached entry for `topic`. Refused while a shadow subscription
    /// still feeds it.
    pub fn forget(&self, topic: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(topic) {
            Some(entry) if entry.shadow.strong_count() == 0 => {
                entries.remove(topic);
                debug!(topic, "history entry forgotten");
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("config", &self.config)
            .field("topics", &self.topics())
            .finish()
    }
}
