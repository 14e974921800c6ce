//! Statements
//!
//! A statement is query text plus its bound parameters. It serializes to the
//! shape the transactional HTTP endpoint expects inside its `statements` array:
//!
//! ```json
//! { "statement": "MATCH (n:User) WHERE n.name = $name RETURN id(n), n",
//!   "parameters": { "name": "Rory" } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub statement: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            statement: text.into(),
            parameters: Map::new(),
        }
    }

    pub fn with_parameters(text: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            statement: text.into(),
            parameters,
        }
    }

    pub fn text(&self) -> &str {
        &self.statement
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Parameter names, for logging without leaking values
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.keys().map(String::as_str).collect()
    }
}
