//! In-process publish/subscribe bus.
//!
//! `LocalBus` implements [`Middleware`](crate::Middleware) without any
//! transport: publishing enqueues into each subscriber's bounded queue, and
//! callbacks run when some thread calls [`LocalBus::spin_once`].
//!
//! - Queue overflow drops the oldest queued message
//! - Queue depth 0 means "large" ([`BusConfig::unbounded_queue_size`])
//! - Several threads may spin at once
//!
//! # Example
//!
//! ```ignore
//! let bus = LocalBus::new();
//! let publisher = bus.advertise::<Text>("/chatter")?;
//!
//! let sub = bus.subscribe("/chatter", 10, Arc::new(|msg| println!("{:?}", msg)))?;
//! publisher.publish(&Text { data: "hi".into() })?;
//!
//! bus.spin_once();
//! ```

mod manager;
mod types;

pub use manager::LocalBus;
pub use types::{BusConfig, Publisher};
