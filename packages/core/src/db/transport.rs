//! Transport Trait - Database Endpoint Abstraction
//!
//! The mapper never talks HTTP itself. It hands batches of [`Statement`]s to a
//! [`Transport`] and receives one [`QueryResult`] per statement, in order.
//! A batch either succeeds as a whole or fails with the database's error list.
//!
//! # Result Shape
//!
//! Results mirror the transactional endpoint's JSON:
//!
//! ```json
//! { "columns": ["id(n)", "n"],
//!   "data": [ { "row": [4, {"name": "fiction"}] } ] }
//! ```

use super::error::TransportError;
use crate::query::Statement;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use tokio_stream::Stream;

/// One row of column values, in `RETURN` order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub row: Vec<Value>,
}

/// Rows returned for one statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<ResultRow>,
}

impl QueryResult {
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            data: rows.into_iter().map(|row| ResultRow { row }).collect(),
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        self.data.iter().map(|r| r.row.as_slice())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Rows delivered one at a time
pub type RowStream = Pin<Box<dyn Stream<Item = Result<Vec<Value>, TransportError>> + Send>>;

/// Submission contract the mapper requires from a database driver
///
/// Implementations must be `Send + Sync`; a single transport is shared by every
/// model created from one holder.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit a batch of statements in one request
    ///
    /// With `commit` set the batch runs in its own transaction that is
    /// committed before returning. Results come back in statement order.
    async fn submit(
        &self,
        statements: Vec<Statement>,
        commit: bool,
    ) -> Result<Vec<QueryResult>, TransportError>;

    /// Run one auto-committed statement and deliver its rows incrementally
    ///
    /// The default buffers the whole result through [`Transport::submit`].
    async fn stream(&self, statement: Statement) -> Result<RowStream, TransportError> {
        let mut results = self.submit(vec![statement], true).await?;
        let rows: Vec<Result<Vec<Value>, TransportError>> = if results.is_empty() {
            Vec::new()
        } else {
            results
                .swap_remove(0)
                .data
                .into_iter()
                .map(|r| Ok(r.row))
                .collect()
        };
        Ok(Box::pin(tokio_stream::iter(rows)))
    }
}
