//! Node and Relationship Result Types
//!
//! These are the shapes the result parser produces from the endpoint's tabular
//! rows. A node is identified only by the database's internal integer id, which
//! is surfaced as `_id` next to the node's own properties.
//!
//! # Serialized Shape
//!
//! ```json
//! { "_id": 42, "first_name": "Rory", "last_name": "madden" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A node read back from the database
///
/// `id` is assigned by the database when the node is created and never changes.
/// Properties keep the column order the database returned them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "_id")]
    pub id: i64,

    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Node {
    /// Create a node from its internal id and property map
    pub fn new(id: i64, properties: Map<String, Value>) -> Self {
        Self { id, properties }
    }

    /// Get a property value by field name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.properties.get(field)
    }

    /// Get a string property
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.properties.get(field).and_then(Value::as_str)
    }

    /// Keep only the listed fields (the id is always kept)
    pub fn retain_fields(&mut self, fields: &[String]) {
        self.properties.retain(|key, _| fields.iter().any(|f| f == key));
    }
}

/// Relationship columns that accompany a node row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRelationship {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub data: Map<String, Value>,
}

/// One decoded node row
///
/// Rows that carry relationship columns decode to `WithRelationship`; plain
/// rows decode to the bare node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeRecord {
    WithRelationship { node: Node, rel: RowRelationship },
    Node(Node),
}

impl NodeRecord {
    /// Borrow the node regardless of shape
    pub fn node(&self) -> &Node {
        match self {
            NodeRecord::Node(node) => node,
            NodeRecord::WithRelationship { node, .. } => node,
        }
    }

    /// Take the node, dropping any relationship columns
    pub fn into_node(self) -> Node {
        match self {
            NodeRecord::Node(node) => node,
            NodeRecord::WithRelationship { node, .. } => node,
        }
    }

    /// The relationship columns, if the row carried any
    pub fn relationship(&self) -> Option<&RowRelationship> {
        match self {
            NodeRecord::Node(_) => None,
            NodeRecord::WithRelationship { rel, .. } => Some(rel),
        }
    }
}

/// Direction of a relationship relative to an anchor node
///
/// `From` means the relationship starts at the anchor; `To` means it points at
/// the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    To,
    From,
}

/// A relationship found by traversing from an anchor node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub direction: Direction,
    pub data: Map<String, Value>,
}

/// The node at the other end of a traversed relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedNode {
    #[serde(rename = "_id")]
    pub id: i64,

    /// First label of the node, if it has any
    #[serde(rename = "_nodeType", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// Result of a relationship traversal
///
/// `nodes[i]` is the node at the far end of `rels[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    pub nodes: Vec<RelatedNode>,
    pub rels: Vec<Relationship>,
}

impl Relationships {
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Iterate relationship/node pairs
    pub fn iter(&self) -> impl Iterator<Item = (&Relationship, &RelatedNode)> {
        self.rels.iter().zip(self.nodes.iter())
    }
}

/// A relationship created between two existing nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedRelationship {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub rel: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_serializes_flat_with_underscore_id() {
        let mut props = Map::new();
        props.insert("name".to_string(), json!("fiction"));
        let node = Node::new(7, props);

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value, json!({"_id": 7, "name": "fiction"}));
    }

    #[test]
    fn test_retain_fields_keeps_only_listed_properties() {
        let props = json!({"first": "Rory", "last": "Madden", "email": "r@x.io"});
        let mut node = Node::new(1, props.as_object().unwrap().clone());

        node.retain_fields(&["first".to_string(), "email".to_string()]);

        assert_eq!(node.id, 1);
        assert_eq!(node.properties.len(), 2);
        assert!(node.get("last").is_none());
        assert_eq!(node.get_str("first"), Some("Rory"));
    }

    #[test]
    fn test_record_with_relationship_serializes_wrapped() {
        let record = NodeRecord::WithRelationship {
            node: Node::new(3, Map::new()),
            rel: RowRelationship {
                id: 9,
                rel_type: "FRIEND".to_string(),
                data: Map::new(),
            },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["node"]["_id"], 3);
        assert_eq!(value["rel"]["type"], "FRIEND");
        assert_eq!(record.relationship().map(|r| r.id), Some(9));
    }

    #[test]
    fn test_direction_lowercase_wire_names() {
        assert_eq!(serde_json::to_value(Direction::From).unwrap(), json!("from"));
        assert_eq!(serde_json::to_value(Direction::To).unwrap(), json!("to"));
    }
}
