//! Abstract live feed connection used by the session.
//!
//! The session never talks to an exchange directly. A `FeedConnector` opens a
//! connection for one instrument and pushes `FeedEvent`s through the
//! `FeedEventSender` it was given. Reconnect and backoff are the connector's
//! business; after a reconnect the owner is expected to request a fresh
//! backfill, because gapped updates are dropped as stale.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::object::Instrument;

/// Lifecycle status of the feed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Error,
}

/// Event delivered by a feed connection
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Connected,
    /// Raw text frame, parsed by the reconciler
    Message(String),
    Disconnected,
    Error(String),
}

/// Feed event tagged with the connection generation it came from
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEnvelope {
    pub generation: u64,
    pub event: FeedEvent,
}

/// Sender handed to a feed connection.
///
/// Every event is stamped with the generation of the connection, so the
/// session can drop anything still in flight from a previous instrument.
#[derive(Debug, Clone)]
pub struct FeedEventSender {
    generation: u64,
    sender: mpsc::UnboundedSender<FeedEnvelope>,
}

impl FeedEventSender {
    /// Create a new event sender
    pub fn new(generation: u64, sender: mpsc::UnboundedSender<FeedEnvelope>) -> Self {
        Self { generation, sender }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Push an event. Returns false once the session is gone.
    pub fn send(&self, event: FeedEvent) -> bool {
        self.sender
            .send(FeedEnvelope {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    pub fn on_connected(&self) -> bool {
        self.send(FeedEvent::Connected)
    }

    pub fn on_message(&self, text: impl Into<String>) -> bool {
        self.send(FeedEvent::Message(text.into()))
    }

    pub fn on_disconnected(&self) -> bool {
        self.send(FeedEvent::Disconnected)
    }

    pub fn on_error(&self, msg: impl Into<String>) -> bool {
        self.send(FeedEvent::Error(msg.into()))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Handle to an open feed connection
#[async_trait]
pub trait FeedConnection: Send + Sync {
    /// Close the connection. No further events may be sent afterwards.
    async fn close(&self);
}

/// Opens live feed connections for an instrument.
///
/// Implementations should:
/// - deliver messages in the order received
/// - report Connected, Disconnected and Error through the sender
/// - never block the caller on message delivery
#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn open(
        &self,
        instrument: &Instrument,
        sender: FeedEventSender,
    ) -> Result<Box<dyn FeedConnection>, String>;
}
