//! Model Façade
//!
//! A [`Model`] binds one label and schema to a [`Transport`] and exposes the
//! create/read/update/remove API. Every operation follows the same shape:
//!
//! 1. reject unusable arguments before anything is built
//! 2. build a statement (validation happens here)
//! 3. submit it auto-committed, or append it to the caller's transaction
//! 4. parse the rows and emit (or queue) the model event
//!
//! A failure after step 1 inside a transaction rolls the transaction back
//! before the error is returned.
//!
//! # Examples
//!
//! ```rust,no_run
//! use graphmodel_core::models::{FieldDef, Schema};
//! use graphmodel_core::options::{CreateOptions, FindOptions};
//! use graphmodel_core::{ModelHolder, Transport};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn demo(transport: Arc<dyn Transport>) -> Result<(), graphmodel_core::ModelError> {
//! let holder = ModelHolder::new(transport);
//! let schema = Schema::new("User").field("email", FieldDef::string().required().unique());
//! let users = holder.model("User", Some(schema))?;
//!
//! let user = users.create(json!({"email": "rory@example.com"}), CreateOptions::default()).await?;
//! let found = users.find_by_id(user.id, FindOptions::default()).await?;
//! assert_eq!(found, user);
//! # Ok(())
//! # }
//! ```

use super::error::ModelError;
use crate::config::MapperConfig;
use crate::db::{
    IndexState, ModelEvent, PendingEvent, QueryResult, Reconciler, RowStream, Transaction,
    Transport, TransportError,
};
use crate::models::{CreatedRelationship, Node, Relationships, Schema, ValidationError};
use crate::options::{
    CreateOptions, FindOptions, NewRelationship, RelationshipFilter, RemoveOptions, WriteOptions,
};
use crate::query::{builder, check_identifier, parser, QueryError, Statement};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt};

/// Nodes delivered one row at a time
pub type NodeStream = Pin<Box<dyn Stream<Item = Result<Node, ModelError>> + Send>>;

/// Creates models that share one transport and configuration
#[derive(Clone)]
pub struct ModelHolder {
    transport: Arc<dyn Transport>,
    config: MapperConfig,
}

impl fmt::Debug for ModelHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHolder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ModelHolder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: MapperConfig::default(),
        }
    }

    pub fn with_config(
        transport: Arc<dyn Transport>,
        config: MapperConfig,
    ) -> Result<Self, ModelError> {
        config.validate().map_err(ModelError::InvalidRequest)?;
        Ok(Self { transport, config })
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Create the model for `label`
    ///
    /// Without a schema the model accepts any properties. A schema must carry
    /// the same label.
    pub fn model(&self, label: &str, schema: Option<Schema>) -> Result<Model, ModelError> {
        check_identifier(label)?;
        let schema = match schema {
            Some(schema) if schema.label() != label => {
                return Err(ModelError::invalid_request(format!(
                    "Schema label '{}' does not match model label '{}'",
                    schema.label(),
                    label
                )))
            }
            Some(schema) => schema,
            None => Schema::empty(label),
        };

        let (event_tx, _) = broadcast::channel(self.config.event_channel_capacity);
        tracing::debug!(
            "Model {} defined with {} sub-schema(s)",
            label,
            schema.sub_schema_names().len()
        );
        Ok(Model {
            inner: Arc::new(ModelInner {
                reconciler: Reconciler::new(&schema),
                schema,
                transport: Arc::clone(&self.transport),
                event_tx,
                config: self.config.clone(),
            }),
        })
    }
}

struct ModelInner {
    schema: Schema,
    transport: Arc<dyn Transport>,
    reconciler: Reconciler,
    event_tx: broadcast::Sender<ModelEvent>,
    config: MapperConfig,
}

/// One labelled node type; cheap to clone
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("label", &self.label())
            .field("sub_schemas", &self.inner.schema.sub_schema_names())
            .finish_non_exhaustive()
    }
}

const CREATE_MISSING: &str = "Invalid create request. You must provide node details.";

fn object(value: Value, missing: &str) -> Result<Map<String, Value>, ModelError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Err(ModelError::invalid_request(missing)),
        _ => Err(ValidationError::NotAnObject.into()),
    }
}

/// Whether a failed delete was refused because the node is still linked
fn still_has_relationships(message: &str) -> bool {
    message.to_ascii_lowercase().contains("relationship")
}

fn tx_id(tx: Option<&Transaction>) -> Option<String> {
    tx.map(|t| t.id().to_string())
}

impl Model {
    pub fn label(&self) -> &str {
        self.inner.schema.label()
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Names of the fields holding nested models
    pub fn sub_schema_names(&self) -> Vec<String> {
        self.inner.schema.sub_schema_names()
    }

    /// Receive this model's create/update/remove events
    pub fn subscribe(&self) -> broadcast::Receiver<ModelEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Current pending/applied constraint and index fields
    pub async fn index_state(&self) -> IndexState {
        self.inner.reconciler.snapshot().await
    }

    /// Apply pending constraints and indexes now
    ///
    /// `create` does this automatically unless disabled in the config.
    pub async fn apply_indexes(&self) -> Result<(), ModelError> {
        self.inner
            .reconciler
            .apply(self.inner.transport.as_ref())
            .await?;
        Ok(())
    }

    /// Create a node, its embedded sub-schema nodes and any requested
    /// relationships in one statement
    ///
    /// A list creates every item as its own root (see [`Model::create_many`])
    /// and returns the first node.
    #[tracing::instrument(skip_all, fields(label = %self.label(), transaction = ?tx_id(options.transaction)))]
    pub async fn create(&self, data: Value, options: CreateOptions<'_>) -> Result<Node, ModelError> {
        let data = match data {
            Value::Array(items) => {
                let nodes = self.create_many(items, options).await?;
                return nodes.into_iter().next().ok_or_else(|| {
                    ModelError::Query(QueryError::unexpected_row("create returned no node"))
                });
            }
            data => object(data, CREATE_MISSING)?,
        };
        self.check_relationships(&options)?;
        let tx = options.transaction;

        self.guarded(tx, async {
            if self.inner.config.auto_apply_indexes {
                self.apply_indexes().await?;
            }

            let statement = self.create_statement(data, &options)?;
            let result = self.run(statement, tx).await?;
            let node = self.created_node(&result, &options)?;

            tracing::debug!("Created {} {}", self.label(), node.id);
            self.notify(ModelEvent::Created { node: node.clone() }, tx);
            Ok(node)
        })
        .await
    }

    /// Create several independent root nodes
    ///
    /// Each item gets its own statement, sub-schema nodes and copy of the
    /// requested relationships. All items are validated before anything is
    /// sent. Without a transaction the statements go out as one committed
    /// batch.
    #[tracing::instrument(skip_all, fields(label = %self.label(), count = items.len(), transaction = ?tx_id(options.transaction)))]
    pub async fn create_many(
        &self,
        items: Vec<Value>,
        options: CreateOptions<'_>,
    ) -> Result<Vec<Node>, ModelError> {
        if items.is_empty() {
            return Err(ModelError::invalid_request(CREATE_MISSING));
        }
        let items = items
            .into_iter()
            .map(|item| object(item, CREATE_MISSING))
            .collect::<Result<Vec<_>, _>>()?;
        self.check_relationships(&options)?;
        let tx = options.transaction;

        self.guarded(tx, async {
            if self.inner.config.auto_apply_indexes {
                self.apply_indexes().await?;
            }

            let statements = items
                .into_iter()
                .map(|data| self.create_statement(data, &options))
                .collect::<Result<Vec<_>, _>>()?;
            let expected = statements.len();

            let results = match tx {
                Some(tx) => {
                    let mut results = Vec::with_capacity(expected);
                    for statement in statements {
                        results.push(self.run(statement, Some(tx)).await?);
                    }
                    results
                }
                None => {
                    statements.iter().for_each(|s| self.log_statement(s));
                    self.inner.transport.submit(statements, true).await?
                }
            };
            if results.len() != expected {
                return Err(ModelError::Query(QueryError::unexpected_row(format!(
                    "expected {} create result(s), got {}",
                    expected,
                    results.len()
                ))));
            }

            let nodes = results
                .iter()
                .map(|result| self.created_node(result, &options))
                .collect::<Result<Vec<_>, _>>()?;
            tracing::debug!("Created {} {} node(s)", nodes.len(), self.label());
            for node in &nodes {
                self.notify(ModelEvent::Created { node: node.clone() }, tx);
            }
            Ok(nodes)
        })
        .await
    }

    fn check_relationships(&self, options: &CreateOptions<'_>) -> Result<(), ModelError> {
        for spec in &options.relationships {
            if spec.rel_type.is_empty()
                || spec.index_field.is_empty()
                || spec.node_label.is_empty()
                || spec.index_value.is_null()
            {
                return Err(ModelError::invalid_request(format!(
                    "Create {}: Invalid relationship details",
                    self.label()
                )));
            }
        }
        Ok(())
    }

    fn create_statement(
        &self,
        data: Map<String, Value>,
        options: &CreateOptions<'_>,
    ) -> Result<Statement, ModelError> {
        let data = self.inner.schema.validate(data)?;
        Ok(builder::create(&self.inner.schema, data, &options.relationships)?)
    }

    fn created_node(
        &self,
        result: &QueryResult,
        options: &CreateOptions<'_>,
    ) -> Result<Node, ModelError> {
        parser::parse_single(result, &[])?.ok_or_else(|| {
            if options.relationships.is_empty() {
                ModelError::Query(QueryError::unexpected_row("create returned no node"))
            } else {
                ModelError::NoMatch("relationship endpoint not found".to_string())
            }
        })
    }

    /// Apply `updates` to an existing node; `null` removes a property
    #[tracing::instrument(skip_all, fields(label = %self.label(), id = node.id, transaction = ?tx_id(options.transaction)))]
    pub async fn update(
        &self,
        node: &Node,
        updates: Value,
        options: WriteOptions<'_>,
    ) -> Result<Node, ModelError> {
        let updates = object(updates, "Invalid update request. You must provide updates.")?;
        let tx = options.transaction;

        self.guarded(tx, async {
            let plan = builder::update(&self.inner.schema, node, &updates)?;
            let result = self.run(plan.statement, tx).await?;
            let updated = parser::parse_single(&result, &[])?
                .ok_or_else(|| ModelError::node_not_found(node.id))?;

            self.notify(
                ModelEvent::Updated {
                    node: updated.clone(),
                    updates: plan.updates,
                },
                tx,
            );
            Ok(updated)
        })
        .await
    }

    /// Delete a node
    ///
    /// Without `force` the database refuses to delete a node that still has
    /// relationships, which surfaces as [`ModelError::RemoveBlocked`].
    #[tracing::instrument(skip_all, fields(label = %self.label(), id = id, force = options.force))]
    pub async fn remove(&self, id: i64, options: RemoveOptions<'_>) -> Result<(), ModelError> {
        let tx = options.transaction;

        self.guarded(tx, async {
            let statement = builder::remove(id, options.force)?;
            match self.run(statement, tx).await {
                Ok(_) => {}
                Err(ModelError::Database { code, message })
                    if !options.force && still_has_relationships(&message) =>
                {
                    tracing::debug!("Remove of {} refused: {}: {}", id, code, message);
                    return Err(ModelError::RemoveBlocked);
                }
                Err(e) => return Err(e),
            }

            self.notify(ModelEvent::Removed { id }, tx);
            Ok(())
        })
        .await
    }

    /// Create a directed relationship between two existing nodes
    #[tracing::instrument(skip_all, fields(label = %self.label(), rel_type = %relationship.rel_type))]
    pub async fn create_relationship(
        &self,
        relationship: NewRelationship,
        options: WriteOptions<'_>,
    ) -> Result<CreatedRelationship, ModelError> {
        if relationship.rel_type.is_empty() || relationship.from < 0 || relationship.to < 0 {
            return Err(ModelError::invalid_request(
                "Invalid relationship creation request. Relationship details must include from, to and type.",
            ));
        }
        let tx = options.transaction;

        self.guarded(tx, async {
            let statement = builder::create_relationship(&relationship)?;
            let result = self.run(statement, tx).await?;
            if result.is_empty() {
                return Err(ModelError::NoMatch(format!(
                    "nodes {} and {} must both exist",
                    relationship.from, relationship.to
                )));
            }
            Ok(parser::parse_created_relationship(&result)?)
        })
        .await
    }

    /// Delete one relationship by its internal id
    #[tracing::instrument(skip_all, fields(label = %self.label(), rel_id = rel_id))]
    pub async fn remove_relationship(
        &self,
        rel_id: i64,
        options: WriteOptions<'_>,
    ) -> Result<(), ModelError> {
        if rel_id < 0 {
            return Err(ModelError::invalid_request(
                "Invalid remove relationship request. You need to supply a relationship id.",
            ));
        }
        let tx = options.transaction;

        self.guarded(tx, async {
            self.run(builder::remove_relationship(rel_id)?, tx).await?;
            Ok(())
        })
        .await
    }

    /// Find every node matching all `conditions`
    ///
    /// `{"_id": n}` looks the node up by internal id and ignores any other
    /// condition. An empty object matches every node of the label.
    #[tracing::instrument(skip_all, fields(label = %self.label()))]
    pub async fn find(
        &self,
        conditions: Value,
        options: FindOptions<'_>,
    ) -> Result<Vec<Node>, ModelError> {
        let conditions = object(
            conditions,
            "Invalid find. You must provide some conditions in your query",
        )?;
        let tx = options.transaction;

        self.guarded(tx, async {
            let statement = builder::find(&self.inner.schema, &conditions, &options)?;
            let result = self.run(statement, tx).await?;
            Ok(parser::parse_nodes(&result, &options.fields)?)
        })
        .await
    }

    /// First node matching `conditions`, if any
    pub async fn find_one(
        &self,
        conditions: Value,
        options: FindOptions<'_>,
    ) -> Result<Option<Node>, ModelError> {
        let nodes = self.find(conditions, options.limit(1)).await?;
        Ok(nodes.into_iter().next())
    }

    /// Node with internal id `id`
    pub async fn find_by_id(&self, id: i64, options: FindOptions<'_>) -> Result<Node, ModelError> {
        let mut conditions = Map::new();
        conditions.insert("_id".to_string(), Value::from(id));
        self.find_one(Value::Object(conditions), options)
            .await?
            .ok_or_else(|| ModelError::node_not_found(id))
    }

    /// Look up a node by id, then update it
    pub async fn find_by_id_and_update(
        &self,
        id: i64,
        updates: Value,
        options: WriteOptions<'_>,
    ) -> Result<Node, ModelError> {
        if updates.is_null() {
            return Err(ModelError::invalid_request(
                "Invalid Update. You must provide some updates.",
            ));
        }
        let tx = options.transaction;
        let node = self.guarded(tx, self.find_by_id(id, find_in(tx))).await?;
        self.update(&node, updates, options).await
    }

    /// Look up the first node matching `conditions`, then update it
    pub async fn find_one_and_update(
        &self,
        conditions: Value,
        updates: Value,
        options: WriteOptions<'_>,
    ) -> Result<Node, ModelError> {
        if updates.is_null() {
            return Err(ModelError::invalid_request(
                "Invalid Update. You must provide some updates.",
            ));
        }
        let tx = options.transaction;
        let description = conditions.to_string();

        let node = self
            .guarded(tx, async {
                self.find_one(conditions, find_in(tx))
                    .await?
                    .ok_or(ModelError::NoMatch(description))
            })
            .await?;
        self.update(&node, updates, options).await
    }

    /// Relationships of node `id` and the nodes at their other ends
    ///
    /// `nodes[i]` is the far end of `rels[i]`. `skip`, `limit` and
    /// `order_by` (on the far node's properties) are honoured.
    #[tracing::instrument(skip_all, fields(label = %self.label(), id = id))]
    pub async fn get_relationships(
        &self,
        id: i64,
        filter: RelationshipFilter,
        options: FindOptions<'_>,
    ) -> Result<Relationships, ModelError> {
        let tx = options.transaction;

        self.guarded(tx, async {
            let statement = builder::relationships(id, &filter, &options)?;
            let result = self.run(statement, tx).await?;
            Ok(parser::parse_relationships(&result, id)?)
        })
        .await
    }

    /// Like [`Model::find`], decoding rows as they arrive
    ///
    /// Inside a transaction the rows are read in one go and then replayed.
    pub async fn find_stream(
        &self,
        conditions: Value,
        options: FindOptions<'_>,
    ) -> Result<NodeStream, ModelError> {
        let conditions = object(
            conditions,
            "Invalid find. You must provide some conditions in your query",
        )?;
        let fields = options.fields.clone();

        let rows: RowStream = match options.transaction {
            Some(tx) => {
                let result = self
                    .guarded(Some(tx), async {
                        let statement = builder::find(&self.inner.schema, &conditions, &options)?;
                        self.run(statement, Some(tx)).await
                    })
                    .await?;
                let rows: Vec<Result<Vec<Value>, TransportError>> =
                    result.data.into_iter().map(|r| Ok(r.row)).collect();
                Box::pin(tokio_stream::iter(rows))
            }
            None => {
                let statement = builder::find(&self.inner.schema, &conditions, &options)?;
                self.log_statement(&statement);
                self.inner.transport.stream(statement).await?
            }
        };

        Ok(Box::pin(rows.map(move |row| -> Result<Node, ModelError> {
            let row = row?;
            Ok(parser::parse_node_row(&row, &fields)?.into_node())
        })))
    }

    async fn run(
        &self,
        statement: Statement,
        tx: Option<&Transaction>,
    ) -> Result<QueryResult, ModelError> {
        self.log_statement(&statement);
        match tx {
            Some(tx) => Ok(tx.append(statement).await?),
            None => {
                let mut results = self.inner.transport.submit(vec![statement], true).await?;
                if results.is_empty() {
                    return Ok(QueryResult::default());
                }
                Ok(results.swap_remove(0))
            }
        }
    }

    /// Run `op`, rolling back `tx` if it fails
    async fn guarded<T, F>(&self, tx: Option<&Transaction>, op: F) -> Result<T, ModelError>
    where
        F: Future<Output = Result<T, ModelError>>,
    {
        let result = op.await;
        if let (Err(e), Some(tx)) = (&result, tx) {
            tracing::debug!(transaction = %tx.id(), "Rolling back after error: {}", e);
            tx.release().await;
        }
        result
    }

    fn notify(&self, event: ModelEvent, tx: Option<&Transaction>) {
        match tx {
            Some(tx) => tx.queue(PendingEvent::new(self.inner.event_tx.clone(), event)),
            None => {
                let _ = self.inner.event_tx.send(event);
            }
        }
    }

    fn log_statement(&self, statement: &Statement) {
        if self.inner.config.log_statements {
            tracing::debug!(
                parameters = ?statement.parameters,
                "Submitting statement: {}",
                statement.text()
            );
        } else {
            tracing::debug!(
                parameters = ?statement.parameter_names(),
                "Submitting statement: {}",
                statement.text()
            );
        }
    }
}

fn find_in(tx: Option<&Transaction>) -> FindOptions<'_> {
    FindOptions {
        transaction: tx,
        ..Default::default()
    }
}
