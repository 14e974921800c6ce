//! Constraint and Index Reconciliation
//!
//! A model's schema declares unique fields (constraints) and indexed fields.
//! Before the first create, the reconciler submits one statement per pending
//! field as a single batch. The database reports an existing constraint or
//! index as an error, so on a conflict the named field is moved to the applied
//! list and the smaller batch is resubmitted:
//!
//! ```text
//! pending ──submit──> ok ─────────────> everything pending becomes applied
//!           │
//!           ├─> "Already constrained ... ASSERT x.f IS UNIQUE"  f: constraint -> applied, retry
//!           ├─> "Already indexed :Label(f)"                      f: index (or constraint) -> applied, retry
//!           └─> anything else                                    fatal, nothing moves
//! ```
//!
//! Every retry removes one field, so the loop ends. The state sits behind an
//! async mutex held for the whole loop; concurrent creates on a fresh model
//! wait for one reconciliation instead of racing.

use super::error::{DatabaseError, IndexError};
use super::transport::Transport;
use crate::models::Schema;
use crate::query::{builder, QueryError, Statement};
use regex::Regex;
use std::sync::OnceLock;
use tokio::sync::Mutex;

const CONSTRAINT_CONFLICT: &str = "Already constrained";
const INDEX_CONFLICT: &str = "Already indexed";

fn constrained_field(message: &str) -> Option<&str> {
    static CONSTRAINED_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = CONSTRAINED_REGEX
        .get_or_init(|| Regex::new(r"ASSERT\s+\w+\.(\w+)\s+IS\s+UNIQUE").unwrap());
    regex
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn indexed_field(message: &str) -> Option<&str> {
    static INDEXED_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = INDEXED_REGEX.get_or_init(|| Regex::new(r":\s*\w+\s*\(\s*(\w+)\s*\)").unwrap());
    regex
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// A conflict that was resolved by moving a field to its applied list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    Constraint(String),
    Index(String),
}

/// Pending and applied constraint/index fields of one model
///
/// A field is never both pending and applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexState {
    pub constraints: Vec<String>,
    pub indexes: Vec<String>,
    pub applied_constraints: Vec<String>,
    pub applied_indexes: Vec<String>,
}

impl IndexState {
    pub fn from_schema(schema: &Schema) -> Self {
        Self {
            constraints: schema.constraint_fields(),
            indexes: schema.index_fields(),
            ..Default::default()
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.constraints.is_empty() || !self.indexes.is_empty()
    }

    /// Constraint statements first, then index statements
    pub fn statements(&self, label: &str) -> Result<Vec<Statement>, QueryError> {
        self.constraints
            .iter()
            .map(|field| builder::constraint(label, field))
            .chain(self.indexes.iter().map(|field| builder::index(label, field)))
            .collect()
    }

    /// Move everything pending to applied
    pub fn mark_applied(&mut self) {
        self.applied_constraints.append(&mut self.constraints);
        self.applied_indexes.append(&mut self.indexes);
    }

    /// Interpret a batch error as an existing constraint or index
    ///
    /// Returns `None`, leaving the state unchanged, when the error is not a
    /// conflict or names a field that is not pending.
    pub fn resolve_conflict(&mut self, error: &DatabaseError) -> Option<Conflict> {
        let message = error.message.as_str();
        if message.contains(CONSTRAINT_CONFLICT) {
            let field = constrained_field(message)?;
            return take(&mut self.constraints, field).map(|field| {
                self.applied_constraints.push(field.clone());
                Conflict::Constraint(field)
            });
        }
        if message.contains(INDEX_CONFLICT) {
            let field = indexed_field(message)?;
            if let Some(field) = take(&mut self.indexes, field) {
                self.applied_indexes.push(field.clone());
                return Some(Conflict::Index(field));
            }
            // constraints are backed by indexes and reported the same way
            return take(&mut self.constraints, field).map(|field| {
                self.applied_constraints.push(field.clone());
                Conflict::Constraint(field)
            });
        }
        None
    }
}

fn take(fields: &mut Vec<String>, field: &str) -> Option<String> {
    let position = fields.iter().position(|f| f == field)?;
    Some(fields.remove(position))
}

/// Applies one model's constraints and indexes, at most once each
#[derive(Debug)]
pub struct Reconciler {
    label: String,
    state: Mutex<IndexState>,
}

impl Reconciler {
    pub fn new(schema: &Schema) -> Self {
        Self {
            label: schema.label().to_string(),
            state: Mutex::new(IndexState::from_schema(schema)),
        }
    }

    pub async fn snapshot(&self) -> IndexState {
        self.state.lock().await.clone()
    }

    /// Submit pending statements until none remain or a non-conflict error occurs
    pub async fn apply(&self, transport: &dyn Transport) -> Result<(), IndexError> {
        let mut state = self.state.lock().await;

        while state.is_pending() {
            let statements = state.statements(&self.label)?;
            tracing::debug!(
                "Applying {} constraint(s) and {} index(es) on {}",
                state.constraints.len(),
                state.indexes.len(),
                self.label
            );

            match transport.submit(statements, true).await {
                Ok(_) => {
                    state.mark_applied();
                    tracing::info!(
                        "Indexes applied on {}: constraints {:?}, indexes {:?}",
                        self.label,
                        state.applied_constraints,
                        state.applied_indexes
                    );
                }
                Err(err) => match err.first().and_then(|e| state.resolve_conflict(e)) {
                    Some(conflict) => {
                        tracing::info!("{} already exists on {}, retrying", describe(&conflict), self.label);
                    }
                    None => {
                        tracing::warn!("Applying indexes on {} failed: {}", self.label, err);
                        return Err(IndexError::Rejected(err));
                    }
                },
            }
        }

        Ok(())
    }
}

fn describe(conflict: &Conflict) -> String {
    match conflict {
        Conflict::Constraint(field) => format!("Constraint on '{}'", field),
        Conflict::Index(field) => format!("Index on '{}'", field),
    }
}
