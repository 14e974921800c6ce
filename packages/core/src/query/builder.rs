//! Statement Builders
//!
//! Pure functions from model operations to [`Statement`]s. Nothing here
//! performs I/O. Every statement anchors the model's node on the alias `n`
//! and every caller-supplied value is bound as a parameter; labels, fields and
//! relationship types are checked with [`check_identifier`] before they are
//! written into query text.
//!
//! Clause order for `find` is fixed:
//! `MATCH -> WHERE -> RETURN -> ORDER BY -> SKIP -> LIMIT -> USING INDEX`.

use super::clause::{
    check_identifier, Arrow, Clause, NodePattern, OrderItem, Pattern, Predicate, QueryAst,
    RelPattern,
};
use super::error::QueryError;
use super::expander::expand;
use super::statement::Statement;
use crate::models::{Direction, FieldType, Node, Schema};
use crate::options::{FindOptions, NewRelationship, OrderBy, RelationshipFilter, RelationshipSpec};
use serde_json::{Map, Value};

/// Alias of the model's own node in every statement
pub const ROOT_ALIAS: &str = "n";

/// Alias of the far node in relationship traversals
pub const OTHER_ALIAS: &str = "other";

const ID_FIELD: &str = "_id";

fn node_returns() -> Vec<String> {
    vec![format!("id({})", ROOT_ALIAS), ROOT_ALIAS.to_string()]
}

fn anchor_by_id(ast: &mut QueryAst, param: &str) {
    ast.push(Clause::Match(vec![Pattern::Node(NodePattern::bound(ROOT_ALIAS))]))
        .push(Clause::Where(vec![Predicate::IdEquals {
            alias: ROOT_ALIAS.to_string(),
            param: param.to_string(),
        }]));
}

/// Integer value of a number or numeric string, truncating fractions
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

/// Parse an internal node or relationship id
///
/// Accepts integers, floats (truncated) and numeric strings; negative values
/// are rejected.
pub fn parse_id(value: &Value) -> Result<i64, QueryError> {
    match as_integer(value) {
        Some(id) if id >= 0 => Ok(id),
        _ => Err(QueryError::InvalidId(value.to_string())),
    }
}

fn check_id(id: i64) -> Result<i64, QueryError> {
    if id < 0 {
        return Err(QueryError::InvalidId(id.to_string()));
    }
    Ok(id)
}

/// Bind a condition value, truncating to an integer for number fields
fn condition_value(schema: &Schema, field: &str, value: &Value) -> Result<Value, QueryError> {
    if value.is_null() {
        return Err(QueryError::UndefinedCondition {
            field: field.to_string(),
        });
    }
    if schema.field_type(field) != Some(FieldType::Number) {
        return Ok(value.clone());
    }
    as_integer(value)
        .map(Value::from)
        .ok_or_else(|| QueryError::invalid_condition(field, "expected a number"))
}

fn order_items(alias: &str, order_by: &[OrderBy]) -> Result<Vec<OrderItem>, QueryError> {
    order_by
        .iter()
        .map(|order| {
            Ok(OrderItem {
                alias: alias.to_string(),
                field: check_identifier(&order.field)?.to_string(),
                descending: order.desc,
                nulls_first: order.nulls,
            })
        })
        .collect()
}

/// Find nodes of `schema`'s label matching every condition
///
/// A condition on `_id` anchors on that node directly and all other
/// conditions are ignored.
pub fn find(
    schema: &Schema,
    conditions: &Map<String, Value>,
    options: &FindOptions<'_>,
) -> Result<Statement, QueryError> {
    let label = check_identifier(schema.label())?;
    let mut ast = QueryAst::new();
    let mut parameters = Map::new();

    if let Some(id) = conditions.get(ID_FIELD) {
        if conditions.len() > 1 {
            tracing::debug!(
                "find on {} by _id ignores {} other condition(s)",
                label,
                conditions.len() - 1
            );
        }
        parameters.insert("id".to_string(), Value::from(parse_id(id)?));
        anchor_by_id(&mut ast, "id");
    } else {
        let mut predicates = Vec::with_capacity(conditions.len());
        for (field, value) in conditions {
            let field = check_identifier(field)?;
            parameters.insert(field.to_string(), condition_value(schema, field, value)?);
            predicates.push(Predicate::PropertyEquals {
                alias: ROOT_ALIAS.to_string(),
                field: field.to_string(),
                param: field.to_string(),
            });
        }
        ast.push(Clause::Match(vec![Pattern::Node(NodePattern::labelled(
            ROOT_ALIAS, label,
        ))]))
        .push(Clause::Where(predicates));
    }

    ast.push(Clause::Return(node_returns()))
        .push(Clause::OrderBy(order_items(ROOT_ALIAS, &options.order_by)?));
    if let Some(skip) = options.skip {
        ast.push(Clause::Skip(skip));
    }
    if let Some(limit) = options.limit {
        ast.push(Clause::Limit(limit));
    }
    let hints = options
        .using
        .iter()
        .map(|field| {
            Ok((
                ROOT_ALIAS.to_string(),
                label.to_string(),
                check_identifier(field)?.to_string(),
            ))
        })
        .collect::<Result<Vec<_>, QueryError>>()?;
    ast.push(Clause::UsingIndex(hints));

    Ok(Statement::with_parameters(ast.render(), parameters))
}

/// A built update and the updates it actually applies
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    pub statement: Statement,
    /// Requested updates plus every field validation changed; `null` values
    /// are property removals
    pub updates: Map<String, Value>,
}

/// Update an existing node
///
/// The updates are merged onto the node and the result validated as a whole.
/// Fields validated to `null` are removed from the node rather than set.
pub fn update(
    schema: &Schema,
    node: &Node,
    updates: &Map<String, Value>,
) -> Result<UpdatePlan, QueryError> {
    let id = check_id(node.id)?;

    let mut merged = node.properties.clone();
    let mut effective = Map::new();
    for (key, value) in updates {
        if key == ID_FIELD {
            continue;
        }
        if schema.sub_schema_def(key).is_some() {
            tracing::debug!("update on {} skips sub-schema field '{}'", schema.label(), key);
            continue;
        }
        merged.insert(key.clone(), value.clone());
        effective.insert(key.clone(), value.clone());
    }
    let submitted = merged.clone();
    let validated = schema.validate(merged)?;

    for (key, value) in &validated {
        if schema.sub_schema_def(key).is_some() {
            continue;
        }
        if value.is_null() || submitted.get(key) != Some(value) {
            effective.insert(key.clone(), value.clone());
        }
    }
    effective.retain(|key, _| validated.contains_key(key));

    let mut parameters = Map::new();
    parameters.insert("nodeId".to_string(), Value::from(id));
    let mut sets = Vec::new();
    let mut removes = Vec::new();
    for key in effective.keys() {
        let field = check_identifier(key)?;
        match validated.get(field) {
            Some(Value::Null) => removes.push((ROOT_ALIAS.to_string(), field.to_string())),
            Some(value) => {
                let param = format!("{}_NEW", field);
                parameters.insert(param.clone(), value.clone());
                sets.push((ROOT_ALIAS.to_string(), field.to_string(), param));
            }
            None => {}
        }
    }
    for (key, value) in effective.iter_mut() {
        if let Some(v) = validated.get(key) {
            *value = v.clone();
        }
    }

    let mut ast = QueryAst::new();
    anchor_by_id(&mut ast, "nodeId");
    ast.push(Clause::Set(sets))
        .push(Clause::Remove(removes))
        .push(Clause::Return(node_returns()));

    Ok(UpdatePlan {
        statement: Statement::with_parameters(ast.render(), parameters),
        updates: effective,
    })
}

/// Delete a node; `force` also deletes its relationships
pub fn remove(id: i64, force: bool) -> Result<Statement, QueryError> {
    let id = check_id(id)?;
    let mut ast = QueryAst::new();
    anchor_by_id(&mut ast, "nodeId");
    ast.push(Clause::Delete {
        detach: force,
        targets: vec![ROOT_ALIAS.to_string()],
    });

    let mut parameters = Map::new();
    parameters.insert("nodeId".to_string(), Value::from(id));
    Ok(Statement::with_parameters(ast.render(), parameters))
}

/// Create a node from validated data, with its sub-schema nodes and any
/// relationships to existing nodes, in a single statement
pub fn create(
    schema: &Schema,
    data: Map<String, Value>,
    relationships: &[RelationshipSpec],
) -> Result<Statement, QueryError> {
    let label = check_identifier(schema.label())?;
    let expansion = expand(data, schema)?;

    let mut parameters = Map::new();
    let mut matches = Vec::new();
    let mut predicates = Vec::new();
    let mut creates = vec![Pattern::Node(
        NodePattern::labelled(ROOT_ALIAS, label).with_properties("props"),
    )];

    for (i, spec) in relationships.iter().enumerate() {
        let other = format!("relNode{}", i);
        let value_param = format!("indexValue{}", i);
        let data_param = format!("relData{}", i);

        matches.push(Pattern::Node(NodePattern::labelled(
            other.as_str(),
            check_identifier(&spec.node_label)?,
        )));
        if spec.index_field == ID_FIELD {
            parameters.insert(value_param.clone(), Value::from(parse_id(&spec.index_value)?));
            predicates.push(Predicate::IdEquals {
                alias: other.clone(),
                param: value_param,
            });
        } else {
            if spec.index_value.is_null() {
                return Err(QueryError::UndefinedCondition {
                    field: spec.index_field.clone(),
                });
            }
            predicates.push(Predicate::PropertyEquals {
                alias: other.clone(),
                field: check_identifier(&spec.index_field)?.to_string(),
                param: value_param.clone(),
            });
            parameters.insert(value_param, spec.index_value.clone());
        }

        parameters.insert(data_param.clone(), Value::Object(spec.data.clone()));
        creates.push(Pattern::Path {
            left: NodePattern::bound(ROOT_ALIAS),
            rel: RelPattern::typed(check_identifier(&spec.rel_type)?)
                .alias(format!("rel{}", i))
                .with_properties(data_param),
            arrow: match spec.direction {
                Direction::To => Arrow::Incoming,
                Direction::From => Arrow::Outgoing,
            },
            right: NodePattern::bound(other),
        });
    }

    parameters.insert("props".to_string(), Value::Object(expansion.data));
    creates.extend(expansion.fragment.patterns);
    parameters.extend(expansion.fragment.parameters);

    let mut ast = QueryAst::new();
    ast.push(Clause::Match(matches))
        .push(Clause::Where(predicates))
        .push(Clause::Create(creates))
        .push(Clause::Return(node_returns()));

    Ok(Statement::with_parameters(ast.render(), parameters))
}

/// Create one directed relationship between two existing nodes
pub fn create_relationship(relationship: &NewRelationship) -> Result<Statement, QueryError> {
    let from = check_id(relationship.from)?;
    let to = check_id(relationship.to)?;
    let rel_type = check_identifier(&relationship.rel_type)?;

    let mut ast = QueryAst::new();
    ast.push(Clause::Match(vec![
        Pattern::Node(NodePattern::bound("source")),
        Pattern::Node(NodePattern::bound("target")),
    ]))
    .push(Clause::Where(vec![
        Predicate::IdEquals {
            alias: "source".into(),
            param: "from".into(),
        },
        Predicate::IdEquals {
            alias: "target".into(),
            param: "to".into(),
        },
    ]))
    .push(Clause::Create(vec![Pattern::Path {
        left: NodePattern::bound("source"),
        rel: RelPattern::typed(rel_type).alias("rel").with_properties("data"),
        arrow: Arrow::Outgoing,
        right: NodePattern::bound("target"),
    }]))
    .push(Clause::Return(vec![
        "id(rel)".into(),
        "type(rel)".into(),
        "rel".into(),
    ]));

    let mut parameters = Map::new();
    parameters.insert("from".to_string(), Value::from(from));
    parameters.insert("to".to_string(), Value::from(to));
    parameters.insert("data".to_string(), Value::Object(relationship.data.clone()));
    Ok(Statement::with_parameters(ast.render(), parameters))
}

pub fn remove_relationship(rel_id: i64) -> Result<Statement, QueryError> {
    let rel_id = check_id(rel_id)?;
    let mut ast = QueryAst::new();
    ast.push(Clause::Match(vec![Pattern::Path {
        left: NodePattern::bound(""),
        rel: RelPattern::aliased("rel"),
        arrow: Arrow::Outgoing,
        right: NodePattern::bound(""),
    }]))
    .push(Clause::Where(vec![Predicate::IdEquals {
        alias: "rel".into(),
        param: "relId".into(),
    }]))
    .push(Clause::Delete {
        detach: false,
        targets: vec!["rel".into()],
    });

    let mut parameters = Map::new();
    parameters.insert("relId".to_string(), Value::from(rel_id));
    Ok(Statement::with_parameters(ast.render(), parameters))
}

/// Traverse the relationships of one node
///
/// Rows come back as
/// `[relId, startId, relProps, relType, otherId, otherProps, otherLabels]`.
/// `order_by` sorts on properties of the far node; `using` is not applied.
pub fn relationships(
    id: i64,
    filter: &RelationshipFilter,
    options: &FindOptions<'_>,
) -> Result<Statement, QueryError> {
    let id = check_id(id)?;
    let mut parameters = Map::new();
    parameters.insert("nodeId".to_string(), Value::from(id));

    let mut predicates = vec![Predicate::IdEquals {
        alias: ROOT_ALIAS.to_string(),
        param: "nodeId".to_string(),
    }];
    if !filter.types.is_empty() {
        let types = filter
            .types
            .iter()
            .map(|t| check_identifier(t).map(Value::from))
            .collect::<Result<Vec<_>, _>>()?;
        parameters.insert("types".to_string(), Value::Array(types));
        predicates.push(Predicate::TypeIn {
            alias: "r".into(),
            param: "types".into(),
        });
    }
    if let Some(label) = &filter.node_label {
        predicates.push(Predicate::HasLabel {
            alias: OTHER_ALIAS.to_string(),
            label: check_identifier(label)?.to_string(),
        });
    }

    let arrow = match filter.direction {
        Some(Direction::From) => Arrow::Outgoing,
        Some(Direction::To) => Arrow::Incoming,
        None => Arrow::Either,
    };

    let mut ast = QueryAst::new();
    ast.push(Clause::Match(vec![Pattern::Path {
        left: NodePattern::bound(ROOT_ALIAS),
        rel: RelPattern::aliased("r"),
        arrow,
        right: NodePattern::bound(OTHER_ALIAS),
    }]))
    .push(Clause::Where(predicates))
    .push(Clause::Return(vec![
        "id(r)".into(),
        "id(startNode(r))".into(),
        "r".into(),
        "type(r)".into(),
        format!("id({})", OTHER_ALIAS),
        OTHER_ALIAS.to_string(),
        format!("labels({})", OTHER_ALIAS),
    ]))
    .push(Clause::OrderBy(order_items(OTHER_ALIAS, &options.order_by)?));
    if let Some(skip) = options.skip {
        ast.push(Clause::Skip(skip));
    }
    if let Some(limit) = options.limit {
        ast.push(Clause::Limit(limit));
    }

    Ok(Statement::with_parameters(ast.render(), parameters))
}

/// Uniqueness constraint on `label.field`
pub fn constraint(label: &str, field: &str) -> Result<Statement, QueryError> {
    let label = check_identifier(label)?;
    let field = check_identifier(field)?;
    Ok(Statement::new(format!(
        "CREATE CONSTRAINT ON (node:{}) ASSERT node.{} IS UNIQUE",
        label, field
    )))
}

/// Lookup index on `label.field`
pub fn index(label: &str, field: &str) -> Result<Statement, QueryError> {
    let label = check_identifier(label)?;
    let field = check_identifier(field)?;
    Ok(Statement::new(format!("CREATE INDEX ON :{}({})", label, field)))
}
