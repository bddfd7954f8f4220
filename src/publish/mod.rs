//! Publish module - Output side of the scan loop.
//!
//! - [`PublishSink`]: The single capability the scan loop needs, `publish(message)`.
//!   Fire-and-forget: no acknowledgment, no error path back into the loop.
//! - [`BroadcastPublisher`]: In-process topic (`rfid/tags` by default) over
//!   `tokio::sync::broadcast`; any number of downstream consumers can subscribe.
//! - [`spawn_echo`]: Consumer task that prints each message to stdout.
//!
//! All publishes come from the same sequential tick, so sinks only need to
//! support a single producer.

pub mod broadcast;

pub use broadcast::{BroadcastPublisher, spawn_echo};

use crate::models::OutboundMessage;

/// Destination for scan messages
pub trait PublishSink: Send {
    fn publish(&mut self, message: OutboundMessage);
}

impl<S: PublishSink + ?Sized> PublishSink for Box<S> {
    fn publish(&mut self, message: OutboundMessage) {
        (**self).publish(message)
    }
}
