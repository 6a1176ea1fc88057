//! Received message plus the time it was recorded.

use crate::error::{HistoryError, Result};
use crate::message::{DynMessage, Message};
use crate::types::Timestamp;
use std::sync::Arc;

/// An immutable record of one received message.
///
/// The default value means "nothing received yet": no payload and
/// [`Timestamp::ZERO`]. Clones share the payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageEvent {
    timestamp: Timestamp,
    payload: Option<Arc<DynMessage>>,
}

impl MessageEvent {
    pub fn new(timestamp: Timestamp, payload: Arc<DynMessage>) -> Self {
        Self {
            timestamp,
            payload: Some(payload),
        }
    }

    /// When the history recorded the message (not when it was published).
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }

    pub fn payload(&self) -> Option<&Arc<DynMessage>> {
        self.payload.as_ref()
    }

    pub fn datatype(&self) -> Option<&str> {
        self.payload.as_deref().map(DynMessage::datatype)
    }

    /// The payload as `M`, or `None` if empty or not an `M`.
    pub fn message<M: Message>(&self) -> Option<M> {
        self.try_message().ok()
    }

    /// Like [`message`](Self::message), but says why the read failed.
    pub fn try_message<M: Message>(&self) -> Result<M> {
        match &self.payload {
            Some(payload) => payload.instantiate(),
            None => Err(HistoryError::NoMessage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Range {
        meters: f32,
    }

    impl Message for Range {
        const DATATYPE: &'static str = "sensor_msgs/Range";
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Flag {
        data: bool,
    }

    impl Message for Flag {
        const DATATYPE: &'static str = "std_msgs/Bool";
    }

    #[test]
    fn test_default_is_empty() {
        let event = MessageEvent::default();

        assert!(event.is_empty());
        assert_eq!(event.timestamp(), Timestamp::ZERO);
        assert!(event.datatype().is_none());
        assert!(event.message::<Range>().is_none());
        assert!(matches!(
            event.try_message::<Range>(),
            Err(HistoryError::NoMessage)
        ));
    }

    #[test]
    fn test_message_roundtrip() {
        let payload = Arc::new(DynMessage::from_message(&Range { meters: 1.5 }).unwrap());
        let event = MessageEvent::new(Timestamp(10), payload);

        assert!(!event.is_empty());
        assert_eq!(event.timestamp(), Timestamp(10));
        assert_eq!(event.datatype(), Some("sensor_msgs/Range"));
        assert_eq!(event.message::<Range>(), Some(Range { meters: 1.5 }));
        assert!(event.message::<Flag>().is_none());
    }

    #[test]
    fn test_clone_shares_payload() {
        let payload = Arc::new(DynMessage::from_message(&Flag { data: true }).unwrap());
        let event = MessageEvent::new(Timestamp(1), payload.clone());
        let copy = event.clone();

        assert_eq!(event, copy);
        assert!(Arc::ptr_eq(
            event.payload().unwrap(),
            copy.payload().unwrap()
        ));
        assert_eq!(Arc::strong_count(&payload), 3);
    }
}
