//! Contract with the publish/subscribe middleware.
//!
//! The history never talks to a transport directly. It needs three things
//! from whatever carries the messages:
//! - subscribe to a topic by name with a queue depth and a callback
//! - a clock for receipt timestamps
//! - reference-counted subscription handles that unsubscribe when the last
//!   copy goes away
//!
//! [`LocalBus`](crate::bus::LocalBus) is the in-process implementation.

use crate::error::{HistoryError, Result};
use crate::message::DynMessage;
use crate::types::{SubscriptionId, Timestamp};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Delivery callback. Invoked on whichever thread drives the middleware.
pub type Callback = Arc<dyn Fn(&Arc<DynMessage>) + Send + Sync>;

/// A publish/subscribe middleware.
pub trait Middleware: Send + Sync {
    /// Subscribe `callback` to `topic`.
    ///
    /// Implementations must not invoke `callback` on the calling thread before
    /// this returns; callers may hold locks that the callback also takes.
    fn subscribe(&self, topic: &str, queue_size: usize, callback: Callback)
        -> Result<Subscription>;

    /// Current time, used to stamp received messages.
    fn now(&self) -> Timestamp;
}

/// Middleware-side state of one subscription.
///
/// Dropping the last reference must end the subscription.
pub trait SubscriptionLink: Send + Sync {
    fn id(&self) -> SubscriptionId;

    fn topic(&self) -> &str;

    fn num_publishers(&self) -> usize;

    fn is_active(&self) -> bool;

    /// End the subscription now. Idempotent.
    fn shutdown(&self);
}

/// Handle to a middleware subscription.
///
/// Clones share the same underlying subscription. The default value is the
/// "not subscribed" sentinel.
#[derive(Clone, Default)]
pub struct Subscription {
    link: Option<Arc<dyn SubscriptionLink>>,
}

impl Subscription {
    pub fn new(link: Arc<dyn SubscriptionLink>) -> Self {
        Self { link: Some(link) }
    }

    pub fn id(&self) -> Option<SubscriptionId> {
        self.link.as_ref().map(|l| l.id())
    }

    pub fn topic(&self) -> Option<&str> {
        self.link.as_deref().map(|l| l.topic())
    }

    pub fn num_publishers(&self) -> usize {
        self.link.as_ref().map_or(0, |l| l.num_publishers())
    }

    /// Whether this handle refers to a live subscription.
    pub fn is_valid(&self) -> bool {
        self.link.as_ref().is_some_and(|l| l.is_active())
    }

    /// Unsubscribe, for this handle and every clone of it.
    ///
    /// This handle forgets its topic afterwards; other clones keep reporting
    /// the topic but are no longer valid.
    pub fn shutdown(&mut self) {
        if let Some(link) = self.link.take() {
            link.shutdown();
        }
    }

    /// Identity of the underlying subscription (0 for the sentinel).
    fn key(&self) -> usize {
        self.link
            .as_ref()
            .map_or(0, |l| Arc::as_ptr(l) as *const () as usize)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.link {
            Some(link) => f
                .debug_struct("Subscription")
                .field("id", &link.id())
                .field("topic", &link.topic())
                .field("active", &link.is_active())
                .finish(),
            None => write!(f, "Subscription(None)"),
        }
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Subscription {}

impl PartialOrd for Subscription {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Subscription {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for Subscription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Check a topic name.
///
/// Valid names are non-empty, start with an ASCII letter, `/` or `~`, and
/// otherwise contain only ASCII alphanumerics, `_` and `/`, with no empty
/// path segments and no trailing `/`.
pub fn validate_topic(topic: &str) -> Result<()> {
    let invalid = || Err(HistoryError::InvalidTopic(topic.to_string()));

    let mut chars = topic.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '~' => {}
        _ => return invalid(),
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '/') {
        return invalid();
    }

    if topic.contains("//") || topic.ends_with('/') {
        return invalid();
    }

    Ok(())
}
