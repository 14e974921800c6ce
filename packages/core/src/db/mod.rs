//! Database Layer
//!
//! Everything between the model façade and the database endpoint:
//!
//! - [`Transport`]: the driver contract (statement batches in, row results out)
//! - [`Transaction`]: ambient transactions with deferred events
//! - [`Reconciler`]: one-time constraint and index creation per model
//! - [`ModelEvent`]: change notifications over tokio broadcast channels
//!
//! The crate ships no HTTP client; applications implement [`Transport`] and
//! [`TransactionChannel`] over their driver of choice.

mod error;
pub mod events;
pub mod reconciler;
mod transaction;
mod transport;

pub use error::{DatabaseError, IndexError, TransportError};
pub use events::{ModelEvent, PendingEvent};
pub use reconciler::{Conflict, IndexState, Reconciler};
pub use transaction::{Transaction, TransactionChannel};
pub use transport::{QueryResult, ResultRow, RowStream, Transport};
