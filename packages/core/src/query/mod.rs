//! Query generation and result decoding
//!
//! Everything in this module is pure: builders produce [`Statement`]s from
//! schemas and options, and the parser turns returned rows back into nodes and
//! relationships.

pub mod builder;
pub mod clause;
mod error;
pub mod expander;
pub mod parser;
mod statement;

pub use builder::{UpdatePlan, ROOT_ALIAS};
pub use clause::{check_identifier, QueryAst};
pub use error::QueryError;
pub use expander::{expand, Expansion, Fragment};
pub use statement::Statement;
