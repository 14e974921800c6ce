//! Database and Transport Error Types
//!
//! The HTTP endpoint reports failures as an `errors` array of
//! `{code, message}` objects, one batch at a time. These types keep that shape
//! so the upstream code survives all the way to the caller.

use crate::query::QueryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One error reported by the database
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct DatabaseError {
    pub code: String,
    pub message: String,
}

impl DatabaseError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Failures submitting statements
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The database rejected the batch
    #[error("Database returned {} error(s): {}", .0.len(), first_message(.0))]
    Database(Vec<DatabaseError>),

    /// The endpoint could not be reached or answered with something unreadable
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Statement appended to a transaction that was already committed or rolled back
    #[error("Transaction is already closed")]
    TransactionClosed,
}

fn first_message(errors: &[DatabaseError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown error".to_string())
}

impl TransportError {
    /// Single database error
    pub fn database(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database(vec![DatabaseError::new(code, message)])
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// First database error of a failed batch
    pub fn first(&self) -> Option<&DatabaseError> {
        match self {
            TransportError::Database(errors) => errors.first(),
            _ => None,
        }
    }
}

/// Failures applying a model's constraints and indexes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("Error applying indexes: {0}")]
    Rejected(#[source] TransportError),

    #[error("Error building index statement: {0}")]
    Query(#[from] QueryError),
}
