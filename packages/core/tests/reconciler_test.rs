//! Index Reconciliation Tests
//!
//! Constraints and indexes are applied in one batch before the first create.
//! Existing ones are recognised from the database's conflict messages and the
//! batch is retried without them.

mod common;

#[cfg(test)]
mod reconciler_tests {
    use crate::common::{self, db_error, node_rows, MockTransport};
    use anyhow::Result;
    use graphmodel_core::db::{IndexError, QueryResult};
    use graphmodel_core::models::{FieldDef, Schema};
    use graphmodel_core::options::CreateOptions;
    use graphmodel_core::{MapperConfig, ModelError, ModelHolder};
    use serde_json::json;

    fn user_schema() -> Schema {
        Schema::new("User")
            .field("email", FieldDef::string().required().unique())
            .field("age", FieldDef::number().index())
    }

    fn texts(statements: &[graphmodel_core::Statement]) -> Vec<&str> {
        statements.iter().map(|s| s.text()).collect()
    }

    #[tokio::test]
    async fn test_first_create_applies_indexes_once() -> Result<()> {
        let (holder, transport) = common::holder();
        let users = holder.model("User", Some(user_schema()))?;
        transport.respond(vec![QueryResult::default(), QueryResult::default()]);
        transport.respond_with(node_rows(vec![(1, json!({"email": "a@b.c"}))]));
        transport.respond_with(node_rows(vec![(2, json!({"email": "d@e.f"}))]));

        users.create(json!({"email": "a@b.c"}), CreateOptions::default()).await?;
        users.create(json!({"email": "d@e.f"}), CreateOptions::default()).await?;

        let batches = transport.batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(
            texts(&batches[0]),
            vec![
                "CREATE CONSTRAINT ON (node:User) ASSERT node.email IS UNIQUE",
                "CREATE INDEX ON :User(age)",
            ]
        );

        let state = users.index_state().await;
        assert!(!state.is_pending());
        assert_eq!(state.applied_constraints, vec!["email".to_string()]);
        assert_eq!(state.applied_indexes, vec!["age".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_constraint_is_skipped_on_retry() -> Result<()> {
        let (holder, transport) = common::holder();
        let users = holder.model("User", Some(user_schema()))?;
        transport.fail(db_error(
            "Neo.ClientError.Schema.ConstraintAlreadyExists",
            "Already constrained CONSTRAINT ON ( user:User ) ASSERT user.email IS UNIQUE",
        ));
        transport.respond(vec![QueryResult::default()]);
        transport.respond_with(node_rows(vec![(1, json!({"email": "a@b.c"}))]));

        users.create(json!({"email": "a@b.c"}), CreateOptions::default()).await?;

        let batches = transport.batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(texts(&batches[1]), vec!["CREATE INDEX ON :User(age)"]);
        assert_eq!(users.index_state().await.applied_constraints, vec!["email".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_index_is_skipped_on_retry() -> Result<()> {
        let (holder, transport) = common::holder();
        let users = holder.model("User", Some(user_schema()))?;
        transport.fail(db_error(
            "Neo.ClientError.Schema.IndexAlreadyExists",
            "Already indexed :User(age)",
        ));

        users.apply_indexes().await?;

        let batches = transport.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(
            texts(&batches[1]),
            vec!["CREATE CONSTRAINT ON (node:User) ASSERT node.email IS UNIQUE"]
        );
        let state = users.index_state().await;
        assert_eq!(state.applied_indexes, vec!["age".to_string()]);
        assert_eq!(state.applied_constraints, vec!["email".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_other_errors_abort_the_create() -> Result<()> {
        let (holder, transport) = common::holder();
        let users = holder.model("User", Some(user_schema()))?;
        transport.fail(db_error("Neo.DatabaseError.General.UnknownError", "disk full"));

        let err = users
            .create(json!({"email": "a@b.c"}), CreateOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ModelError::IndexApplication(IndexError::Rejected(_))));
        assert!(err.to_string().starts_with("Error applying indexes"));
        assert_eq!(transport.submissions(), 1);
        assert!(users.index_state().await.is_pending());

        // the next create tries again
        transport.respond(vec![QueryResult::default(), QueryResult::default()]);
        transport.respond_with(node_rows(vec![(1, json!({"email": "a@b.c"}))]));
        users.create(json!({"email": "a@b.c"}), CreateOptions::default()).await?;
        assert!(!users.index_state().await.is_pending());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_creates_reconcile_once() -> Result<()> {
        let (holder, transport) = common::holder();
        let users = holder.model("User", Some(user_schema()))?;
        transport.respond(vec![QueryResult::default(), QueryResult::default()]);
        transport.respond_with(node_rows(vec![(1, json!({"email": "a@b.c"}))]));
        transport.respond_with(node_rows(vec![(2, json!({"email": "d@e.f"}))]));

        let other = users.clone();
        let (a, b) = tokio::join!(
            users.create(json!({"email": "a@b.c"}), CreateOptions::default()),
            other.create(json!({"email": "d@e.f"}), CreateOptions::default()),
        );
        a?;
        b?;

        let index_batches = transport
            .statements()
            .iter()
            .filter(|s| s.text().starts_with("CREATE CONSTRAINT"))
            .count();
        assert_eq!(index_batches, 1);
        assert_eq!(transport.submissions(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_auto_apply_can_be_disabled() -> Result<()> {
        let transport = MockTransport::new();
        let config = MapperConfig {
            auto_apply_indexes: false,
            ..Default::default()
        };
        let holder = ModelHolder::with_config(transport.clone(), config)?;
        let users = holder.model("User", Some(user_schema()))?;
        transport.respond_with(node_rows(vec![(1, json!({"email": "a@b.c"}))]));

        users.create(json!({"email": "a@b.c"}), CreateOptions::default()).await?;

        assert_eq!(transport.submissions(), 1);
        assert!(users.index_state().await.is_pending());
        Ok(())
    }

    #[tokio::test]
    async fn test_schema_without_indexes_submits_nothing() -> Result<()> {
        let (holder, transport) = common::holder();
        let notes = holder.model("Note", None)?;

        notes.apply_indexes().await?;

        assert_eq!(transport.submissions(), 0);
        Ok(())
    }
}
