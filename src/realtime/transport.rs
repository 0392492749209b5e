//! Push transports that deliver change events to the reconciler.

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::realtime::ChangeEvent;

/// Source of an ordered event stream.
///
/// The transport owns its connection lifecycle and any reconnection policy;
/// the reconciler only consumes what a successful `connect` yields. The
/// stream ending means the connection closed.
#[async_trait]
pub trait EventTransport: Send {
    async fn connect(&mut self) -> Result<BoxStream<'static, ChangeEvent>>;
}

/// Sending half of a [`ChannelTransport`].
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<ChangeEvent>,
}

impl EventPublisher {
    /// Enqueues an event, waiting if the queue is full.
    pub async fn publish(&self, event: ChangeEvent) -> Result<()> {
        debug!(%event, "Change event enqueued");
        self.tx
            .send(event)
            .await
            .map_err(|_| CacheError::Transport("event channel closed".to_string()))
    }
}

/// In-process transport backed by a bounded channel.
///
/// Connects once; the stream ends when every publisher is dropped.
#[derive(Debug)]
pub struct ChannelTransport {
    rx: Option<mpsc::Receiver<ChangeEvent>>,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> (EventPublisher, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (EventPublisher { tx }, Self { rx: Some(rx) })
    }
}

#[async_trait]
impl EventTransport for ChannelTransport {
    async fn connect(&mut self) -> Result<BoxStream<'static, ChangeEvent>> {
        let mut rx = self
            .rx
            .take()
            .ok_or_else(|| CacheError::Transport("channel transport already connected".to_string()))?;
        Ok(Box::pin(stream::poll_fn(move |cx| rx.poll_recv(cx))))
    }
}
