//! Operation Options
//!
//! Every model operation takes one of these structs instead of positional
//! optional arguments. All of them implement `Default`, so the common case is
//! `FindOptions::default()` or `..Default::default()`.
//!
//! ```rust
//! use graphmodel_core::options::{FindOptions, OrderBy};
//!
//! let options = FindOptions::new()
//!     .fields("first_name email")
//!     .order_by(OrderBy::desc("age").nulls_first())
//!     .skip(10)
//!     .limit(5);
//! assert_eq!(options.fields, vec!["first_name", "email"]);
//! ```

use crate::db::Transaction;
use crate::models::Direction;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One ordering key for `find`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub desc: bool,
    /// Sort nodes missing the field ahead of the others
    #[serde(default)]
    pub nulls: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            desc: false,
            nulls: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            desc: true,
            ..Self::asc(field)
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = true;
        self
    }
}

/// Options for `find`, `find_one`, `find_by_id` and `find_stream`
#[derive(Debug, Clone, Default)]
pub struct FindOptions<'a> {
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    pub order_by: Vec<OrderBy>,
    /// Index hints, one `USING INDEX` per field
    pub using: Vec<String>,
    /// Property allowlist for returned nodes; empty returns everything
    pub fields: Vec<String>,
    pub transaction: Option<&'a Transaction>,
}

impl<'a> FindOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn using(mut self, field: impl Into<String>) -> Self {
        self.using.push(field.into());
        self
    }

    /// Space-delimited list of fields to return, e.g. `"first_name email"`
    pub fn fields(mut self, fields: &str) -> Self {
        self.fields = fields.split_whitespace().map(str::to_string).collect();
        self
    }

    pub fn transaction(mut self, transaction: &'a Transaction) -> Self {
        self.transaction = Some(transaction);
        self
    }
}

/// Relationship to an existing node, created together with a new node
///
/// The other endpoint is located by `index_field` on nodes labelled
/// `node_label`; the field `_id` matches the internal id instead of a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSpec {
    /// `To`: the relationship points at the new node. `From`: it starts there.
    pub direction: Direction,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub index_field: String,
    pub index_value: Value,
    pub node_label: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl RelationshipSpec {
    pub fn new(
        direction: Direction,
        rel_type: impl Into<String>,
        node_label: impl Into<String>,
        index_field: impl Into<String>,
        index_value: impl Into<Value>,
    ) -> Self {
        Self {
            direction,
            rel_type: rel_type.into(),
            index_field: index_field.into(),
            index_value: index_value.into(),
            node_label: node_label.into(),
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateOptions<'a> {
    pub relationships: Vec<RelationshipSpec>,
    pub transaction: Option<&'a Transaction>,
}

impl<'a> CreateOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relationship(mut self, spec: RelationshipSpec) -> Self {
        self.relationships.push(spec);
        self
    }

    pub fn transaction(mut self, transaction: &'a Transaction) -> Self {
        self.transaction = Some(transaction);
        self
    }
}

/// Options for updates and relationship writes
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions<'a> {
    pub transaction: Option<&'a Transaction>,
}

impl<'a> WriteOptions<'a> {
    pub fn transaction(transaction: &'a Transaction) -> Self {
        Self {
            transaction: Some(transaction),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOptions<'a> {
    /// Delete the node's relationships along with it
    pub force: bool,
    pub transaction: Option<&'a Transaction>,
}

impl<'a> RemoveOptions<'a> {
    pub fn force() -> Self {
        Self {
            force: true,
            transaction: None,
        }
    }

    pub fn transaction(mut self, transaction: &'a Transaction) -> Self {
        self.transaction = Some(transaction);
        self
    }
}

/// A directed relationship between two existing nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRelationship {
    pub from: i64,
    pub to: i64,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl NewRelationship {
    pub fn new(from: i64, to: i64, rel_type: impl Into<String>) -> Self {
        Self {
            from,
            to,
            rel_type: rel_type.into(),
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }
}

/// Narrows a relationship traversal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipFilter {
    /// Relationship types to follow; empty follows all
    pub types: Vec<String>,
    /// Direction relative to the anchor node; `None` follows both
    pub direction: Option<Direction>,
    /// Label required on the node at the other end
    pub node_label: Option<String>,
}

impl RelationshipFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rel_type(mut self, rel_type: impl Into<String>) -> Self {
        self.types.push(rel_type.into());
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn node_label(mut self, label: impl Into<String>) -> Self {
        self.node_label = Some(label.into());
        self
    }
}
