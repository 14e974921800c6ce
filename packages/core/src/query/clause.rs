//! Query Clause AST
//!
//! Statements are assembled as a list of clauses and rendered to text in one
//! pass. Identifiers (labels, property keys, relationship types) are checked
//! when a builder accepts them; every value travels as a `$parameter`.

use super::error::QueryError;
use regex::Regex;
use std::fmt::{self, Write};
use std::sync::OnceLock;

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// Check that a name can be interpolated into query text
pub fn check_identifier(name: &str) -> Result<&str, QueryError> {
    static IDENTIFIER_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = IDENTIFIER_REGEX.get_or_init(|| Regex::new(IDENTIFIER_PATTERN).unwrap());
    if regex.is_match(name) {
        Ok(name)
    } else {
        Err(QueryError::InvalidIdentifier(name.to_string()))
    }
}

/// `(alias:Label $props)`, any part optional except the alias
#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub alias: String,
    pub label: Option<String>,
    pub properties: Option<String>,
}

impl NodePattern {
    /// Reference to an alias bound earlier in the statement
    pub fn bound(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            label: None,
            properties: None,
        }
    }

    pub fn labelled(alias: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            label: Some(label.into()),
            properties: None,
        }
    }

    pub fn with_properties(mut self, param: impl Into<String>) -> Self {
        self.properties = Some(param.into());
        self
    }
}

impl fmt::Display for NodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.alias)?;
        if let Some(label) = &self.label {
            write!(f, ":{}", label)?;
        }
        if let Some(param) = &self.properties {
            write!(f, " ${}", param)?;
        }
        f.write_char(')')
    }
}

/// `[alias:TYPE $props]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelPattern {
    pub alias: Option<String>,
    pub rel_type: Option<String>,
    pub properties: Option<String>,
}

impl RelPattern {
    pub fn typed(rel_type: impl Into<String>) -> Self {
        Self {
            rel_type: Some(rel_type.into()),
            ..Default::default()
        }
    }

    pub fn aliased(alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Default::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_properties(mut self, param: impl Into<String>) -> Self {
        self.properties = Some(param.into());
        self
    }
}

impl fmt::Display for RelPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        if let Some(alias) = &self.alias {
            f.write_str(alias)?;
        }
        if let Some(rel_type) = &self.rel_type {
            write!(f, ":{}", rel_type)?;
        }
        if let Some(param) = &self.properties {
            write!(f, " ${}", param)?;
        }
        f.write_char(']')
    }
}

/// Arrow direction between the left and right node of a path pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrow {
    /// `(left)<-[..]-(right)`
    Incoming,
    /// `(left)-[..]->(right)`
    Outgoing,
    /// `(left)-[..]-(right)`
    Either,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Node(NodePattern),
    Path {
        left: NodePattern,
        rel: RelPattern,
        arrow: Arrow,
        right: NodePattern,
    },
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Node(node) => fmt::Display::fmt(node, f),
            Pattern::Path {
                left,
                rel,
                arrow,
                right,
            } => match arrow {
                Arrow::Incoming => write!(f, "{}<-{}-{}", left, rel, right),
                Arrow::Outgoing => write!(f, "{}-{}->{}", left, rel, right),
                Arrow::Either => write!(f, "{}-{}-{}", left, rel, right),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `id(alias) = $param`
    IdEquals { alias: String, param: String },
    /// `alias.field = $param`
    PropertyEquals {
        alias: String,
        field: String,
        param: String,
    },
    /// `type(alias) IN $param`
    TypeIn { alias: String, param: String },
    /// `alias:Label`
    HasLabel { alias: String, label: String },
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::IdEquals { alias, param } => write!(f, "id({}) = ${}", alias, param),
            Predicate::PropertyEquals { alias, field, param } => {
                write!(f, "{}.{} = ${}", alias, field, param)
            }
            Predicate::TypeIn { alias, param } => write!(f, "type({}) IN ${}", alias, param),
            Predicate::HasLabel { alias, label } => write!(f, "{}:{}", alias, label),
        }
    }
}

/// One `ORDER BY` item
///
/// `nulls_first` adds a leading `alias.field IS NOT NULL` key so rows missing
/// the property sort ahead of the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub alias: String,
    pub field: String,
    pub descending: bool,
    pub nulls_first: bool,
}

impl fmt::Display for OrderItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nulls_first {
            write!(f, "{}.{} IS NOT NULL, ", self.alias, self.field)?;
        }
        write!(f, "{}.{}", self.alias, self.field)?;
        if self.descending {
            f.write_str(" DESC")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match(Vec<Pattern>),
    Where(Vec<Predicate>),
    Create(Vec<Pattern>),
    /// `SET alias.field = $param, ...` as (alias, field, param)
    Set(Vec<(String, String, String)>),
    /// `REMOVE alias.field, ...` as (alias, field)
    Remove(Vec<(String, String)>),
    Delete { detach: bool, targets: Vec<String> },
    Return(Vec<String>),
    OrderBy(Vec<OrderItem>),
    Skip(u64),
    Limit(u64),
    /// `USING INDEX alias:Label(field)` as (alias, label, field)
    UsingIndex(Vec<(String, String, String)>),
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Match(patterns) => write!(f, "MATCH {}", join(patterns, ", ")),
            Clause::Where(predicates) => write!(f, "WHERE {}", join(predicates, " AND ")),
            Clause::Create(patterns) => write!(f, "CREATE {}", join(patterns, ", ")),
            Clause::Set(assignments) => {
                let items: Vec<String> = assignments
                    .iter()
                    .map(|(alias, field, param)| format!("{}.{} = ${}", alias, field, param))
                    .collect();
                write!(f, "SET {}", items.join(", "))
            }
            Clause::Remove(properties) => {
                let items: Vec<String> = properties
                    .iter()
                    .map(|(alias, field)| format!("{}.{}", alias, field))
                    .collect();
                write!(f, "REMOVE {}", items.join(", "))
            }
            Clause::Delete { detach, targets } => {
                if *detach {
                    f.write_str("DETACH ")?;
                }
                write!(f, "DELETE {}", targets.join(", "))
            }
            Clause::Return(items) => write!(f, "RETURN {}", items.join(", ")),
            Clause::OrderBy(items) => write!(f, "ORDER BY {}", join(items, ", ")),
            Clause::Skip(n) => write!(f, "SKIP {}", n),
            Clause::Limit(n) => write!(f, "LIMIT {}", n),
            Clause::UsingIndex(hints) => {
                let items: Vec<String> = hints
                    .iter()
                    .map(|(alias, label, field)| format!("USING INDEX {}:{}({})", alias, label, field))
                    .collect();
                f.write_str(&items.join(" "))
            }
        }
    }
}

/// Ordered list of clauses making up one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryAst {
    clauses: Vec<Clause>,
}

impl QueryAst {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause; empty list clauses are skipped
    pub fn push(&mut self, clause: Clause) -> &mut Self {
        let empty = match &clause {
            Clause::Match(p) | Clause::Create(p) => p.is_empty(),
            Clause::Where(p) => p.is_empty(),
            Clause::Set(s) => s.is_empty(),
            Clause::Remove(r) => r.is_empty(),
            Clause::Return(r) => r.is_empty(),
            Clause::OrderBy(o) => o.is_empty(),
            Clause::UsingIndex(u) => u.is_empty(),
            Clause::Delete { targets, .. } => targets.is_empty(),
            Clause::Skip(_) | Clause::Limit(_) => false,
        };
        if !empty {
            self.clauses.push(clause);
        }
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn render(&self) -> String {
        join(&self.clauses, " ")
    }
}
