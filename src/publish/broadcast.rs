// In-process topic backed by a tokio broadcast channel
//
// Publishing never blocks and never fails from the scan loop's point of view:
// with no subscribers the message is dropped, and slow subscribers lose the
// oldest messages once `queue_depth` is exceeded.

use super::PublishSink;
use crate::models::{OutboundMessage, PublisherConfig};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Fire-and-forget publisher for one topic
///
/// Cloning shares the underlying channel, so clones publish to the same
/// subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    topic: String,
    tx: broadcast::Sender<OutboundMessage>,
}

impl BroadcastPublisher {
    /// Create a publisher for `topic` buffering `queue_depth` messages per subscriber.
    ///
    /// # Panics
    /// If `queue_depth` is zero (rejected earlier by config validation).
    pub fn new(topic: impl Into<String>, queue_depth: usize) -> Self {
        let (tx, _) = broadcast::channel(queue_depth);
        Self {
            topic: topic.into(),
            tx,
        }
    }

    pub fn from_config(config: &PublisherConfig) -> Self {
        Self::new(config.topic.clone(), config.queue_depth)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Receive every message published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl PublishSink for BroadcastPublisher {
    fn publish(&mut self, message: OutboundMessage) {
        tracing::trace!("[{}] {}", self.topic, message);

        // Ignore send errors - it's OK if no one is listening
        let _ = self.tx.send(message);
    }
}

/// Print every message on `rx` to stdout until the channel closes.
pub fn spawn_echo(
    mut rx: broadcast::Receiver<OutboundMessage>,
    topic: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Echoing topic {}", topic);
        loop {
            match rx.recv().await {
                Ok(message) => println!("{}", message),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Echo on {} lagged, {} messages dropped", topic, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("Echo on {} stopped", topic);
    })
}
