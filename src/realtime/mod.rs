//! Realtime Module
//!
//! Keeps the cache coherent with server-side mutations delivered by a push
//! channel.

mod event;
mod reconciler;
mod transport;

pub use event::{ChangeEvent, Operation, ResourceRoute, ResourceRoutes};
pub use reconciler::{ConnectionState, Reconciler, Reconciliation};
pub use transport::{ChannelTransport, EventPublisher, EventTransport};
