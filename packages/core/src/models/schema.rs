//! Model Schema and Validation
//!
//! A `Schema` describes the properties a labelled node may carry and how raw
//! input is coerced before any statement is built. Schemas may embed other
//! schemas ("sub-schemas") on a field; at creation time each embedded object
//! becomes its own node linked back to its parent by the declared relationship.
//!
//! ## Field Rules
//!
//! - `required`: the field must be present and non-null after defaults apply
//! - `unique`: the field gets a uniqueness constraint in the database
//! - `index`: the field gets a lookup index in the database
//! - `trim` / `lowercase`: string normalisation applied during validation
//! - `pattern`: the (string) value must match a regular expression
//! - `default`: value used when the field is absent
//!
//! ## Example
//!
//! ```rust
//! use graphmodel_core::models::{FieldDef, Schema};
//! use serde_json::json;
//!
//! let tag = Schema::new("Tag").field("tag", FieldDef::string().required());
//! let story = Schema::new("Story")
//!     .field("name", FieldDef::string().required())
//!     .sub_schema("tags", tag, "TAGGED");
//!
//! let data = json!({"name": "Story", "tags": [{"tag": "fiction"}]});
//! let validated = story.validate(data.as_object().unwrap().clone()).unwrap();
//! assert_eq!(validated["tags"][0]["tag"], "fiction");
//! ```

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use std::sync::Arc;
use thiserror::Error;

/// Validation failures raised before any statement is built
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for field '{field}': expected {expected}")]
    InvalidType { field: String, expected: String },

    #[error("Value of field '{field}' does not match pattern {pattern}")]
    PatternMismatch { field: String, pattern: String },

    #[error("Node data must be a JSON object")]
    NotAnObject,

    #[error("Sub-schema field '{0}' must hold an object or a list of objects")]
    InvalidSubSchema(String),

    #[error("Invalid schema definition: {0}")]
    InvalidDefinition(String),
}

impl ValidationError {
    pub fn invalid_type(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidType {
            field: field.into(),
            expected: expected.into(),
        }
    }
}

/// Declared type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    #[default]
    Any,
}

impl FieldType {
    /// Type name used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Any => "any",
        }
    }
}

/// Definition of a single schema field
#[derive(Debug, Clone, Default)]
pub struct FieldDef {
    pub field_type: FieldType,
    pub required: bool,
    pub unique: bool,
    pub index: bool,
    pub trim: bool,
    pub lowercase: bool,
    pub pattern: Option<Regex>,
    pub default: Option<Value>,
}

impl FieldDef {
    pub fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Default::default()
        }
    }

    pub fn string() -> Self {
        Self::of(FieldType::String)
    }

    pub fn number() -> Self {
        Self::of(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::of(FieldType::Boolean)
    }

    pub fn any() -> Self {
        Self::of(FieldType::Any)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Coerce and normalise one value according to this definition
    ///
    /// `null` passes through untouched; required-ness is checked by the caller.
    fn coerce(&self, field: &str, value: Value) -> Result<Value, ValidationError> {
        if value.is_null() {
            return Ok(value);
        }

        let value = match self.field_type {
            FieldType::Any => value,
            FieldType::String => match value {
                Value::String(s) => Value::String(self.normalise(s)),
                Value::Number(n) => Value::String(self.normalise(n.to_string())),
                Value::Bool(b) => Value::String(self.normalise(b.to_string())),
                _ => return Err(ValidationError::invalid_type(field, "string")),
            },
            FieldType::Number => match value {
                Value::Number(n) => Value::Number(n),
                Value::String(s) => parse_number(s.trim())
                    .ok_or_else(|| ValidationError::invalid_type(field, "number"))?,
                _ => return Err(ValidationError::invalid_type(field, "number")),
            },
            FieldType::Boolean => match value {
                Value::Bool(b) => Value::Bool(b),
                Value::String(s) if s == "true" => Value::Bool(true),
                Value::String(s) if s == "false" => Value::Bool(false),
                _ => return Err(ValidationError::invalid_type(field, "boolean")),
            },
        };

        if let (Some(pattern), Value::String(s)) = (&self.pattern, &value) {
            if !pattern.is_match(s) {
                return Err(ValidationError::PatternMismatch {
                    field: field.to_string(),
                    pattern: pattern.as_str().to_string(),
                });
            }
        }

        Ok(value)
    }

    fn normalise(&self, mut s: String) -> String {
        if self.trim {
            s = s.trim().to_string();
        }
        if self.lowercase {
            s = s.to_lowercase();
        }
        s
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// A nested model definition attached to a field of a parent schema
#[derive(Debug, Clone)]
pub struct SubSchema {
    pub schema: Arc<Schema>,
    /// Relationship type linking the parent node to each nested node
    pub relationship: String,
}

/// Serde shape of a field in a JSON schema definition
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldSpec {
    Short(FieldType),
    Full {
        #[serde(rename = "type", default)]
        field_type: FieldType,
        #[serde(default)]
        required: bool,
        #[serde(default)]
        unique: bool,
        #[serde(default)]
        index: bool,
        #[serde(default)]
        trim: bool,
        #[serde(default)]
        lowercase: bool,
        #[serde(rename = "match", default)]
        pattern: Option<String>,
        #[serde(default)]
        default: Option<Value>,
    },
}

/// Schema of a labelled node model
#[derive(Debug, Clone)]
pub struct Schema {
    label: String,
    fields: Vec<(String, FieldDef)>,
    sub_schemas: Vec<(String, SubSchema)>,
    strict: bool,
}

impl Schema {
    /// Create an empty strict schema for a label
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            fields: Vec::new(),
            sub_schemas: Vec::new(),
            strict: true,
        }
    }

    /// Schema that accepts any properties (used when a model has no schema)
    pub fn empty(label: impl Into<String>) -> Self {
        Self::new(label).strict(false)
    }

    /// Build a schema from a JSON definition
    ///
    /// Each entry is either a bare type name (`"string"`) or an object with
    /// `type`, `required`, `unique`, `index`, `trim`, `lowercase`, `match` and
    /// `default` keys.
    pub fn from_definition(
        label: impl Into<String>,
        definition: &Value,
    ) -> Result<Self, ValidationError> {
        let entries = definition
            .as_object()
            .ok_or_else(|| ValidationError::InvalidDefinition("expected an object".into()))?;

        let mut schema = Schema::new(label);
        for (name, spec) in entries {
            let spec: FieldSpec = serde_json::from_value(spec.clone())
                .map_err(|e| ValidationError::InvalidDefinition(format!("{}: {}", name, e)))?;
            let def = match spec {
                FieldSpec::Short(field_type) => FieldDef::of(field_type),
                FieldSpec::Full {
                    field_type,
                    required,
                    unique,
                    index,
                    trim,
                    lowercase,
                    pattern,
                    default,
                } => {
                    let pattern = pattern
                        .map(|p| Regex::new(&p))
                        .transpose()
                        .map_err(|e| {
                            ValidationError::InvalidDefinition(format!("{}: {}", name, e))
                        })?;
                    FieldDef {
                        field_type,
                        required,
                        unique,
                        index,
                        trim,
                        lowercase,
                        pattern,
                        default,
                    }
                }
            };
            schema = schema.field(name.clone(), def);
        }
        Ok(schema)
    }

    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        let name = name.into();
        self.fields.retain(|(n, _)| n != &name);
        self.fields.push((name, def));
        self
    }

    /// Embed another schema on `field`, linked by `relationship`
    pub fn sub_schema(
        mut self,
        field: impl Into<String>,
        schema: impl Into<Arc<Schema>>,
        relationship: impl Into<String>,
    ) -> Self {
        let field = field.into();
        self.sub_schemas.retain(|(n, _)| n != &field);
        self.sub_schemas.push((
            field,
            SubSchema {
                schema: schema.into(),
                relationship: relationship.into(),
            },
        ));
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.field_def(name).map(|d| d.field_type)
    }

    pub fn sub_schema_def(&self, field: &str) -> Option<&SubSchema> {
        self.sub_schemas
            .iter()
            .find(|(n, _)| n == field)
            .map(|(_, s)| s)
    }

    /// Names of fields that hold nested models, in declaration order
    pub fn sub_schema_names(&self) -> Vec<String> {
        self.sub_schemas.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn has_sub_schemas(&self) -> bool {
        !self.sub_schemas.is_empty()
    }

    /// Fields that need a uniqueness constraint
    pub fn constraint_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, d)| d.unique)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Fields that need a plain index (unique fields are covered by their constraint)
    pub fn index_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, d)| d.index && !d.unique)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Validate and coerce node data
    ///
    /// Keys keep the caller's order. Unknown keys are dropped when the schema
    /// is strict. A `null` on an optional field is kept so updates can turn it
    /// into a property removal.
    pub fn validate(&self, data: Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
        let mut validated = Map::new();

        for (key, value) in data {
            if let Some(def) = self.field_def(&key) {
                let value = def.coerce(&key, value)?;
                validated.insert(key, value);
            } else if let Some(sub) = self.sub_schema_def(&key) {
                if let Some(value) = sub.validate_value(&key, value)? {
                    validated.insert(key, value);
                }
            } else if !self.strict {
                validated.insert(key, value);
            } else {
                tracing::debug!("Dropping field '{}' not declared on {}", key, self.label);
            }
        }

        for (name, def) in &self.fields {
            match validated.get(name) {
                None => {
                    if let Some(default) = &def.default {
                        validated.insert(name.clone(), default.clone());
                    } else if def.required {
                        return Err(ValidationError::MissingField(name.clone()));
                    }
                }
                Some(Value::Null) if def.required => {
                    return Err(ValidationError::MissingField(name.clone()));
                }
                Some(_) => {}
            }
        }

        Ok(validated)
    }
}

impl SubSchema {
    /// Validate the value of a sub-schema field; `None` drops the field
    fn validate_value(&self, field: &str, value: Value) -> Result<Option<Value>, ValidationError> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) => Ok(Some(Value::Object(self.schema.validate(map)?))),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(map) => out.push(Value::Object(self.schema.validate(map)?)),
                        _ => return Err(ValidationError::InvalidSubSchema(field.to_string())),
                    }
                }
                Ok(Some(Value::Array(out)))
            }
            _ => Err(ValidationError::InvalidSubSchema(field.to_string())),
        }
    }
}
