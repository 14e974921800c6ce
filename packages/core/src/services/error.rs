//! Model Error Types
//!
//! `ModelError` is the single error type returned by model operations. Usage
//! and validation errors are raised before anything is submitted; database
//! errors keep the upstream code and message untouched.

use crate::db::{IndexError, TransportError};
use crate::models::ValidationError;
use crate::query::QueryError;
use thiserror::Error;

/// Hint returned when a node cannot be deleted because it still has relationships
pub const REMOVE_BLOCKED_HINT: &str =
    "Failed to delete node due to relationships. Try again with force: true option.";

/// Model operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Missing or unusable arguments; never reaches the database
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The schema rejected the data
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The statement could not be built or its result could not be read
    #[error("Query error: {0}")]
    Query(QueryError),

    /// First error reported by the database, verbatim
    #[error("{code}: {message}")]
    Database { code: String, message: String },

    /// The database could not be reached
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transaction is already closed")]
    TransactionClosed,

    /// Plain delete refused because of existing relationships
    #[error("{}", REMOVE_BLOCKED_HINT)]
    RemoveBlocked,

    #[error(transparent)]
    IndexApplication(#[from] IndexError),

    #[error("Node not found: {id}")]
    NodeNotFound { id: i64 },

    /// `find_one_and_update` matched nothing
    #[error("No node matched: {0}")]
    NoMatch(String),
}

impl ModelError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn node_not_found(id: i64) -> Self {
        Self::NodeNotFound { id }
    }

    /// Upstream error code, for database errors
    pub fn code(&self) -> Option<&str> {
        match self {
            ModelError::Database { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<QueryError> for ModelError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Validation(e) => ModelError::Validation(e),
            other => ModelError::Query(other),
        }
    }
}

impl From<TransportError> for ModelError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Database(errors) => match errors.into_iter().next() {
                Some(first) => ModelError::Database {
                    code: first.code,
                    message: first.message,
                },
                None => ModelError::Transport("database reported an empty error list".into()),
            },
            TransportError::Connection(msg) => ModelError::Transport(msg),
            TransportError::TransactionClosed => ModelError::TransactionClosed,
        }
    }
}
