//! Application-level entry point tying a middleware to its history.

use crate::config::HistoryConfig;
use crate::error::Result;
use crate::event::MessageEvent;
use crate::history::History;
use crate::message::{DynMessage, Message};
use crate::middleware::{Callback, Middleware};
use crate::subscriber::Subscriber;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Owns the one [`History`] an application shares between its Subscribers.
///
/// Create it once at startup and hand clones around; clones share the
/// history.
#[derive(Clone)]
pub struct Context {
    history: Arc<History>,
}

impl Context {
    pub fn new(middleware: Arc<dyn Middleware>) -> Self {
        Self::with_config(middleware, HistoryConfig::default())
    }

    pub fn with_config(middleware: Arc<dyn Middleware>, config: HistoryConfig) -> Self {
        Self {
            history: History::with_config(middleware, config),
        }
    }

    pub fn history(&self) -> &Arc<History> {
        &self.history
    }

    pub fn middleware(&self) -> &Arc<dyn Middleware> {
        self.history.middleware()
    }

    /// Subscribe `callback` to `topic` and track the topic's history.
    pub fn subscribe<F>(&self, topic: &str, queue_size: usize, callback: F) -> Result<Subscriber>
    where
        F: Fn(&Arc<DynMessage>) + Send + Sync + 'static,
    {
        let subscription = self
            .middleware()
            .subscribe(topic, queue_size, Arc::new(callback))?;
        Subscriber::new(subscription, &self.history)
    }

    /// Like [`subscribe`](Self::subscribe), decoding each message as `M`.
    ///
    /// Messages that are not an `M` are logged and skipped.
    pub fn subscribe_typed<M, F>(
        &self,
        topic: &str,
        queue_size: usize,
        callback: F,
    ) -> Result<Subscriber>
    where
        M: Message + 'static,
        F: Fn(M) + Send + Sync + 'static,
    {
        let name = topic.to_string();
        let decode: Callback = Arc::new(move |msg: &Arc<DynMessage>| match msg.instantiate::<M>() {
            Ok(decoded) => callback(decoded),
            Err(e) => {
                warn!(topic = %name, error = %e, "skipping undecodable message");
            }
        });

        let subscription = self.middleware().subscribe(topic, queue_size, decode)?;
        Subscriber::new(subscription, &self.history)
    }

    /// Latest event on `topic`, whether or not anything here subscribed to it.
    pub fn last_receive(&self, topic: &str) -> MessageEvent {
        self.history.last_receive(topic)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("history", &self.history)
            .finish()
    }
}
