//! # Topic History
//!
//! A "last received message per topic" cache for publish/subscribe
//! subscribers. Application code asks a [`Subscriber`] for the most recent
//! message on its topic instead of keeping its own callback state.
//!
//! ## Core Concepts
//!
//! - **Middleware**: whatever delivers messages; see [`Middleware`] and the
//!   in-process [`LocalBus`]
//! - **History**: one shared table of the latest [`MessageEvent`] per topic,
//!   fed by shadow subscriptions
//! - **Subscriber**: a subscription handle that can also answer
//!   `last_receive()` / `last_message()`
//! - **Context**: owns the history for the whole application
//!
//! ## Example
//!
//! ```ignore
//! use topic_history::{Context, LocalBus};
//!
//! let bus = LocalBus::new();
//! let context = Context::new(Arc::new(bus.clone()));
//!
//! let scan = context.subscribe_typed::<LaserScan, _>("/scan", 10, |scan| {
//!     // regular callback work
//! })?;
//!
//! bus.spin_once();
//!
//! if let Some(latest) = scan.last_message::<LaserScan>() {
//!     // use the most recent scan
//! }
//! ```

pub mod bus;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod history;
pub mod message;
pub mod middleware;
pub mod subscriber;
pub mod types;

// Re-exports
pub use bus::{BusConfig, LocalBus, Publisher};
pub use config::HistoryConfig;
pub use context::Context;
pub use error::{HistoryError, Result};
pub use event::MessageEvent;
pub use history::{History, ShadowSubscription};
pub use message::{schema_hash, DynMessage, Message, PayloadEncoding, ANY_SCHEMA};
pub use middleware::{validate_topic, Callback, Middleware, Subscription, SubscriptionLink};
pub use subscriber::Subscriber;
pub use types::{Clock, ManualClock, SubscriptionId, SystemClock, Timestamp};
