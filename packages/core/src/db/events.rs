//! Model Events
//!
//! Each model owns a tokio broadcast channel. Successful writes outside a
//! transaction send their event immediately; writes inside a transaction
//! queue a [`PendingEvent`] on it, and the transaction owner flushes the queue
//! after a successful commit.
//!
//! Sending never fails the write: events with no subscribers are dropped.

use crate::models::Node;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

/// Change notification for one model
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ModelEvent {
    /// A node was created
    Created { node: Node },

    /// A node was updated; `updates` holds the changes actually applied
    /// (`null` means the property was removed)
    Updated {
        node: Node,
        updates: Map<String, Value>,
    },

    /// A node was removed
    Removed { id: i64 },
}

impl ModelEvent {
    pub fn event_type(&self) -> &str {
        match self {
            ModelEvent::Created { .. } => "create",
            ModelEvent::Updated { .. } => "update",
            ModelEvent::Removed { .. } => "remove",
        }
    }
}

/// An event waiting for its transaction to commit
#[derive(Debug, Clone)]
pub struct PendingEvent {
    sender: broadcast::Sender<ModelEvent>,
    event: ModelEvent,
}

impl PendingEvent {
    pub fn new(sender: broadcast::Sender<ModelEvent>, event: ModelEvent) -> Self {
        Self { sender, event }
    }

    pub fn event(&self) -> &ModelEvent {
        &self.event
    }

    /// Deliver to the owning model's subscribers
    pub fn emit(self) {
        let _ = self.sender.send(self.event);
    }
}
