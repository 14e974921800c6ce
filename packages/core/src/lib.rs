//! GraphModel Core
//!
//! Object-graph mapping over a graph database's transactional HTTP query
//! endpoint. Models bind a label to a validated schema and turn
//! create/find/update/remove calls into parameterised statements, then decode
//! the returned rows into nodes and relationships.
//!
//! # Architecture
//!
//! - **Statements as data**: queries are assembled as clause lists and rendered
//!   once; values are always bound parameters
//! - **Nested models**: sub-schema objects become linked nodes created in the
//!   same statement as their parent
//! - **Pluggable transport**: the crate defines the driver contract and ships
//!   no HTTP client
//! - **Ambient transactions**: operations can share one open transaction, with
//!   events held back until commit
//!
//! # Modules
//!
//! - [`models`] - Nodes, relationships and schemas
//! - [`query`] - Statement builders, sub-schema expansion and result parsing
//! - [`db`] - Transport contract, transactions, events and index reconciliation
//! - [`services`] - The `ModelHolder` / `Model` façade
//! - [`options`] - Per-operation option structs
//! - [`config`] / [`telemetry`] - Configuration and logging setup

pub mod config;
pub mod db;
pub mod models;
pub mod options;
pub mod query;
pub mod services;
pub mod telemetry;

// Re-export commonly used types
pub use config::MapperConfig;
pub use db::{ModelEvent, QueryResult, Transaction, TransactionChannel, Transport, TransportError};
pub use models::*;
pub use query::Statement;
pub use services::*;
