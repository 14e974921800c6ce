//! Query Building Errors
//!
//! Raised while turning conditions, updates and schema data into statements,
//! or while decoding result rows. None of these reach the transport.

use crate::models::ValidationError;
use thiserror::Error;

/// Errors produced by the statement builders, the expander and the parser
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Label, field or relationship type that cannot be interpolated safely
    #[error("Invalid identifier '{0}': only letters, digits and underscores are allowed")]
    InvalidIdentifier(String),

    /// A find condition without a value
    #[error("Invalid find condition: field '{field}' has no value")]
    UndefinedCondition { field: String },

    /// A condition value that cannot be bound for the field's declared type
    #[error("Invalid value for condition '{field}': {reason}")]
    InvalidCondition { field: String, reason: String },

    /// A node or relationship id that is not a non-negative integer
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// Sub-schema field holding something other than objects
    #[error("Sub-schema field '{0}' must hold an object or a list of objects")]
    InvalidSubSchemaValue(String),

    /// Merged update data rejected by the schema
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Result row that does not have the expected column layout
    #[error("Unexpected result row: {0}")]
    UnexpectedRow(String),
}

impl QueryError {
    pub fn invalid_condition(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCondition {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn unexpected_row(msg: impl Into<String>) -> Self {
        Self::UnexpectedRow(msg.into())
    }
}
