//! Ambient Transactions
//!
//! A [`Transaction`] threads several model operations through one open
//! database transaction. Operations given a transaction append their statement
//! to it instead of auto-committing, and queue their events on it instead of
//! sending them. The owner decides when to commit:
//!
//! ```rust,ignore
//! let tx = Transaction::new(channel);
//! let story = stories.create(data, CreateOptions::new().transaction(&tx)).await?;
//! tags.update(&tag, updates, WriteOptions::transaction(&tx)).await?;
//! tx.commit().await?; // events are sent only now
//! ```
//!
//! When an operation fails inside a transaction it rolls the transaction back
//! before returning its error, so the handle is closed afterwards.

use super::error::TransportError;
use super::events::PendingEvent;
use super::transport::QueryResult;
use crate::query::Statement;
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Driver side of one open database transaction
#[async_trait]
pub trait TransactionChannel: Send + Sync {
    /// Run one statement inside the open transaction
    async fn execute(&self, statement: Statement) -> Result<QueryResult, TransportError>;

    async fn commit(&self) -> Result<(), TransportError>;

    async fn rollback(&self) -> Result<(), TransportError>;
}

/// Handle correlating statements and deferred events
pub struct Transaction {
    id: Uuid,
    channel: Box<dyn TransactionChannel>,
    events: Mutex<Vec<PendingEvent>>,
    closed: AtomicBool,
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("pending_events", &self.pending_events())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Transaction {
    pub fn new(channel: impl TransactionChannel + 'static) -> Self {
        Self::from_boxed(Box::new(channel))
    }

    pub fn from_boxed(channel: Box<dyn TransactionChannel>) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            events: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Correlation id, recorded on every operation span
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn events(&self) -> MutexGuard<'_, Vec<PendingEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run a statement inside this transaction
    pub async fn append(&self, statement: Statement) -> Result<QueryResult, TransportError> {
        if self.is_closed() {
            return Err(TransportError::TransactionClosed);
        }
        tracing::debug!(transaction = %self.id, "Appending statement: {}", statement.text());
        self.channel.execute(statement).await
    }

    pub(crate) fn queue(&self, event: PendingEvent) {
        self.events().push(event);
    }

    /// Number of events waiting for commit
    pub fn pending_events(&self) -> usize {
        self.events().len()
    }

    /// Remove the queued events without sending them
    pub fn take_events(&self) -> Vec<PendingEvent> {
        std::mem::take(&mut *self.events())
    }

    /// Send every queued event, for owners that commit through their own driver
    pub fn flush_events(&self) -> usize {
        let events = self.take_events();
        let count = events.len();
        for event in events {
            event.emit();
        }
        count
    }

    /// Commit and then send the queued events
    ///
    /// A failed commit closes the handle and drops the queued events.
    pub async fn commit(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(TransportError::TransactionClosed);
        }
        match self.channel.commit().await {
            Ok(()) => {
                let sent = self.flush_events();
                tracing::debug!(transaction = %self.id, "Committed, sent {} event(s)", sent);
                Ok(())
            }
            Err(e) => {
                let dropped = self.take_events().len();
                tracing::warn!(
                    transaction = %self.id,
                    "Commit failed, dropped {} event(s): {}",
                    dropped,
                    e
                );
                Err(e)
            }
        }
    }

    /// Roll back and drop the queued events; a closed handle is left alone
    pub async fn rollback(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.take_events();
        self.channel.rollback().await
    }

    /// Roll back after a failed operation, keeping the operation's error
    pub(crate) async fn release(&self) {
        if let Err(e) = self.rollback().await {
            tracing::warn!(transaction = %self.id, "Rollback after failure failed: {}", e);
        }
    }
}
