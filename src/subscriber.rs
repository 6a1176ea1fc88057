//! Subscriber handle that can answer "what was the last message?".

use crate::error::Result;
use crate::event::MessageEvent;
use crate::history::{History, ShadowSubscription};
use crate::message::Message;
use crate::middleware::Subscription;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;

/// A middleware subscription paired with its topic's history.
///
/// Clones share the user subscription and the shadow subscription. The
/// shadow ends when the last Subscriber (of any clone family) on the topic
/// goes away; the cached event stays in the [`History`].
#[derive(Clone, Default)]
pub struct Subscriber {
    subscription: Subscription,
    shadow: Option<Arc<ShadowSubscription>>,
    history: Option<Arc<History>>,
}

impl Subscriber {
    /// Wrap `subscription`, joining or creating the shadow subscription for
    /// its topic.
    ///
    /// An invalid handle gives a placeholder that always reports the empty
    /// event.
    pub fn new(subscription: Subscription, history: &Arc<History>) -> Result<Self> {
        if !subscription.is_valid() {
            debug!("placeholder subscriber for invalid subscription");
            return Ok(Self {
                subscription,
                shadow: None,
                history: None,
            });
        }

        let topic = subscription.topic().unwrap_or_default();
        let shadow = history.subscribe(topic, history.config().default_queue_size)?;

        Ok(Self {
            subscription,
            shadow: Some(shadow),
            history: Some(Arc::clone(history)),
        })
    }

    /// Latest event on this subscriber's topic.
    pub fn last_receive(&self) -> MessageEvent {
        match (&self.history, self.subscription.topic()) {
            (Some(history), Some(topic)) => history.last_receive(topic),
            _ => MessageEvent::default(),
        }
    }

    /// Latest message as `M`, if any and if it is an `M`.
    pub fn last_message<M: Message>(&self) -> Option<M> {
        self.last_receive().message()
    }

    /// End the user subscription (for every clone) and release this
    /// clone's share of the shadow subscription.
    pub fn shutdown(&mut self) {
        self.subscription.shutdown();
        self.shadow = None;
    }

    pub fn topic(&self) -> Option<&str> {
        self.subscription.topic()
    }

    pub fn num_publishers(&self) -> usize {
        self.subscription.num_publishers()
    }

    pub fn is_valid(&self) -> bool {
        self.subscription.is_valid()
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn shadow(&self) -> Option<&Arc<ShadowSubscription>> {
        self.shadow.as_ref()
    }
}

impl AsRef<Subscription> for Subscriber {
    fn as_ref(&self) -> &Subscription {
        &self.subscription
    }
}

impl From<Subscriber> for Subscription {
    fn from(subscriber: Subscriber) -> Self {
        subscriber.subscription
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("subscription", &self.subscription)
            .field("shadowed", &self.shadow.is_some())
            .finish()
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.subscription == other.subscription
    }
}

impl Eq for Subscriber {}

impl PartialEq<Subscription> for Subscriber {
    fn eq(&self, other: &Subscription) -> bool {
        &self.subscription == other
    }
}

impl PartialEq<Subscriber> for Subscription {
    fn eq(&self, other: &Subscriber) -> bool {
        self == &other.subscription
    }
}

impl PartialOrd for Subscriber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Subscriber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.subscription.cmp(&other.subscription)
    }
}

impl PartialOrd<Subscription> for Subscriber {
    fn partial_cmp(&self, other: &Subscription) -> Option<Ordering> {
        Some(self.subscription.cmp(other))
    }
}

impl PartialOrd<Subscriber> for Subscription {
    fn partial_cmp(&self, other: &Subscriber) -> Option<Ordering> {
        Some(self.cmp(&other.subscription))
    }
}

impl Hash for Subscriber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.subscription.hash(state);
    }
}
