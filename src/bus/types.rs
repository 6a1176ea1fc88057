//! Bus configuration and publisher handles.

use crate::error::{HistoryError, Result};
use crate::message::{DynMessage, Message, PayloadEncoding};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use super::manager::BusShared;

/// Configuration for a [`LocalBus`](super::LocalBus).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Encoding used by typed publishers.
    /// Default: MessagePack
    pub encoding: PayloadEncoding,

    /// Queue depth used when a subscriber asks for 0.
    /// Default: 1000
    pub unbounded_queue_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            encoding: PayloadEncoding::default(),
            unbounded_queue_size: 1000,
        }
    }
}

/// Shared part of a publisher; the last clone to go decrements the count.
pub(super) struct PublisherInner {
    pub(super) topic: String,
    pub(super) shared: Weak<BusShared>,
}

impl Drop for PublisherInner {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.unadvertise(&self.topic);
        }
    }
}

/// Typed publisher on one topic.
pub struct Publisher<M> {
    pub(super) inner: Arc<PublisherInner>,
    pub(super) encoding: PayloadEncoding,
    pub(super) _marker: PhantomData<fn(&M)>,
}

impl<M: Message> Publisher<M> {
    pub fn topic(&self) -> &str {
        &self.inner.topic
    }

    /// Encode and enqueue a message. Returns the number of subscriptions
    /// reached.
    pub fn publish(&self, msg: &M) -> Result<usize> {
        let payload = DynMessage::encode(msg, self.encoding)?;
        self.publish_dyn(Arc::new(payload))
    }

    /// Enqueue an already type-erased message.
    pub fn publish_dyn(&self, payload: Arc<DynMessage>) -> Result<usize> {
        let shared = self.inner.shared.upgrade().ok_or(HistoryError::BusClosed)?;
        Ok(shared.publish(&self.inner.topic, payload))
    }
}

impl<M> Clone for Publisher<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            encoding: self.encoding,
            _marker: PhantomData,
        }
    }
}

impl<M> fmt::Debug for Publisher<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("topic", &self.inner.topic)
            .field("encoding", &self.encoding)
            .finish()
    }
}
