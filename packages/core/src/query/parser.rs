//! Result Parsing
//!
//! Decodes the endpoint's row-oriented results. Node statements return
//! `[id, properties]` rows, optionally followed by
//! `[relType, relProperties, relId]`. Relationship traversals return
//! `[relId, startId, relProperties, relType, otherId, otherProperties, otherLabels]`.

use super::error::QueryError;
use crate::db::QueryResult;
use crate::models::{
    CreatedRelationship, Direction, Node, NodeRecord, RelatedNode, Relationship, Relationships,
    RowRelationship,
};
use serde_json::{Map, Value};

fn column<'a>(row: &'a [Value], index: usize) -> Result<&'a Value, QueryError> {
    row.get(index)
        .ok_or_else(|| QueryError::unexpected_row(format!("missing column {}", index)))
}

fn id_column(row: &[Value], index: usize) -> Result<i64, QueryError> {
    column(row, index)?
        .as_i64()
        .ok_or_else(|| QueryError::unexpected_row(format!("column {} is not an id", index)))
}

fn map_column(row: &[Value], index: usize) -> Result<Map<String, Value>, QueryError> {
    match row.get(index) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(QueryError::unexpected_row(format!(
            "column {} is not a property map: {}",
            index, other
        ))),
    }
}

fn string_column(row: &[Value], index: usize) -> Result<String, QueryError> {
    column(row, index)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| QueryError::unexpected_row(format!("column {} is not a string", index)))
}

/// Decode one node row, filtering properties to `fields` when it is non-empty
pub fn parse_node_row(row: &[Value], fields: &[String]) -> Result<NodeRecord, QueryError> {
    let mut node = Node::new(id_column(row, 0)?, map_column(row, 1)?);
    if !fields.is_empty() {
        node.retain_fields(fields);
    }

    match row.get(2) {
        Some(rel_type) if !rel_type.is_null() => {
            let rel = RowRelationship {
                id: id_column(row, 4)?,
                rel_type: string_column(row, 2)?,
                data: map_column(row, 3)?,
            };
            Ok(NodeRecord::WithRelationship { node, rel })
        }
        _ => Ok(NodeRecord::Node(node)),
    }
}

/// Decode every row of a node statement
pub fn parse_records(result: &QueryResult, fields: &[String]) -> Result<Vec<NodeRecord>, QueryError> {
    result
        .rows()
        .map(|row| parse_node_row(row, fields))
        .collect()
}

/// Decode every row of a node statement, dropping relationship columns
pub fn parse_nodes(result: &QueryResult, fields: &[String]) -> Result<Vec<Node>, QueryError> {
    Ok(parse_records(result, fields)?
        .into_iter()
        .map(NodeRecord::into_node)
        .collect())
}

/// Decode the first row of a node statement, if any
pub fn parse_single(result: &QueryResult, fields: &[String]) -> Result<Option<Node>, QueryError> {
    result
        .rows()
        .next()
        .map(|row| parse_node_row(row, fields).map(NodeRecord::into_node))
        .transpose()
}

/// Decode a relationship traversal anchored on node `anchor`
///
/// A relationship whose start node is the anchor is `From`; anything else
/// points `To` it.
pub fn parse_relationships(result: &QueryResult, anchor: i64) -> Result<Relationships, QueryError> {
    let mut relationships = Relationships::default();
    for row in result.rows() {
        let start = id_column(row, 1)?;
        relationships.rels.push(Relationship {
            id: id_column(row, 0)?,
            rel_type: string_column(row, 3)?,
            direction: if start == anchor {
                Direction::From
            } else {
                Direction::To
            },
            data: map_column(row, 2)?,
        });

        let node_type = column(row, 6)?
            .as_array()
            .and_then(|labels| labels.first())
            .and_then(Value::as_str)
            .map(str::to_string);
        relationships.nodes.push(RelatedNode {
            id: id_column(row, 4)?,
            node_type,
            properties: map_column(row, 5)?,
        });
    }
    Ok(relationships)
}

/// Decode the `[id, type, properties]` row of a relationship creation
pub fn parse_created_relationship(result: &QueryResult) -> Result<CreatedRelationship, QueryError> {
    let row = result
        .rows()
        .next()
        .ok_or_else(|| QueryError::unexpected_row("no relationship was created"))?;
    Ok(CreatedRelationship {
        id: id_column(row, 0)?,
        rel_type: string_column(row, 1)?,
        rel: map_column(row, 2)?,
    })
}
