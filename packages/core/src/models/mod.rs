//! Data Models
//!
//! This module contains the data structures shared by every layer:
//!
//! - `Node` / `NodeRecord` - nodes decoded from result rows
//! - `Relationship` / `RelatedNode` / `Relationships` - relationship traversal results
//! - `Schema` - field rules, nested sub-schemas and validation

mod node;
pub mod schema;

pub use node::{
    CreatedRelationship, Direction, Node, NodeRecord, RelatedNode, Relationship, Relationships,
    RowRelationship,
};
pub use schema::{FieldDef, FieldType, Schema, SubSchema, ValidationError};
