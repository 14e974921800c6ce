//! Sub-Schema Expansion
//!
//! Splits validated node data into the root node's own properties and one
//! linked node pattern per embedded object. Each embedded object becomes
//!
//! ```text
//! (alias:Label $element_alias)<-[:REL]-(parent)
//! ```
//!
//! where `alias` is `s{slot}_{parent}_{index}` and `slot` is the position of
//! the sub-schema among its schema's declared sub-schemas. The root node is
//! always `n`, so if `tags` is a story's first sub-schema, its second tag is
//! `s0_n_1`, and that tag's first note (the tag schema's first sub-schema) is
//! `s0_s0_n_1_0`. An alias decodes back to exactly one path (leading slot,
//! trailing index, parent in between), so aliases never collide, even when
//! field names contain underscores, and no counter is shared between branches.
//!
//! Nodes are emitted parent first, so every alias is bound before a child
//! pattern refers to it. An embedded object left with no properties after
//! `null`s are stripped is still emitted (without a property map) when it has
//! children of its own; otherwise it is skipped. Nested uniqueness is left to
//! the database's constraints.

use super::clause::{check_identifier, Arrow, NodePattern, Pattern, RelPattern};
use super::error::QueryError;
use crate::models::Schema;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Patterns and parameters contributed by embedded objects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub patterns: Vec<Pattern>,
    pub parameters: Map<String, Value>,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Result of expanding one root object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    /// Root properties with sub-schema fields and `null`s removed
    pub data: Map<String, Value>,
    pub fragment: Fragment,
}

/// Link from an embedded node back to the node that holds it
struct Link<'a> {
    parent: &'a str,
    relationship: &'a str,
}

struct Child {
    slot: usize,
    schema: Arc<Schema>,
    relationship: String,
    items: Vec<Map<String, Value>>,
}

/// Expand `data` against `schema`, rooted at the alias `n`
pub fn expand(data: Map<String, Value>, schema: &Schema) -> Result<Expansion, QueryError> {
    let mut fragment = Fragment::default();
    let data = expand_node(data, schema, super::builder::ROOT_ALIAS, None, &mut fragment)?;
    Ok(Expansion { data, fragment })
}

fn expand_node(
    mut data: Map<String, Value>,
    schema: &Schema,
    alias: &str,
    link: Option<Link<'_>>,
    fragment: &mut Fragment,
) -> Result<Map<String, Value>, QueryError> {
    let mut children = Vec::new();
    for (slot, field) in schema.sub_schema_names().into_iter().enumerate() {
        let Some(value) = data.remove(&field) else {
            continue;
        };
        let Some(sub) = schema.sub_schema_def(&field) else {
            continue;
        };
        children.push(Child {
            slot,
            items: nested_items(&field, value)?,
            schema: Arc::clone(&sub.schema),
            relationship: sub.relationship.clone(),
        });
    }

    data.retain(|_, value| !value.is_null());

    if let Some(link) = link {
        let has_children = children.iter().any(|c| !c.items.is_empty());
        if data.is_empty() && !has_children {
            tracing::debug!("Skipping empty embedded {} at {}", schema.label(), alias);
            return Ok(data);
        }

        let mut node = NodePattern::labelled(alias, check_identifier(schema.label())?);
        if !data.is_empty() {
            let param = format!("element_{}", alias);
            fragment
                .parameters
                .insert(param.clone(), Value::Object(data.clone()));
            node = node.with_properties(param);
        }
        fragment.patterns.push(Pattern::Path {
            left: node,
            rel: RelPattern::typed(check_identifier(link.relationship)?),
            arrow: Arrow::Incoming,
            right: NodePattern::bound(link.parent),
        });
    }

    for child in children {
        for (count, item) in child.items.into_iter().enumerate() {
            let child_alias = format!("s{}_{}_{}", child.slot, alias, count);
            expand_node(
                item,
                &child.schema,
                &child_alias,
                Some(Link {
                    parent: alias,
                    relationship: &child.relationship,
                }),
                fragment,
            )?;
        }
    }

    Ok(data)
}

/// An object or a list of objects; `null` holds nothing
fn nested_items(field: &str, value: Value) -> Result<Vec<Map<String, Value>>, QueryError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(vec![map]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                _ => Err(QueryError::InvalidSubSchemaValue(field.to_string())),
            })
            .collect(),
        _ => Err(QueryError::InvalidSubSchemaValue(field.to_string())),
    }
}
