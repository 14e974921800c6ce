//! Sub-schema Tests
//!
//! Nested model data is validated against the nested schema and created as
//! linked nodes in the same statement as the parent.

mod common;

#[cfg(test)]
mod sub_schema_tests {
    use crate::common::{self, node_rows};
    use anyhow::Result;
    use graphmodel_core::models::{FieldDef, Node, Schema, ValidationError};
    use graphmodel_core::options::{CreateOptions, WriteOptions};
    use graphmodel_core::{Model, ModelError};
    use serde_json::json;
    use std::sync::Arc;

    fn stories() -> (Model, Arc<common::MockTransport>) {
        let comment = Schema::new("Comment").field("text", FieldDef::string().required());
        let tag = Schema::new("Tag")
            .field("tag", FieldDef::string().required().lowercase())
            .sub_schema("comments", comment, "COMMENT");
        let story = Schema::new("Story")
            .field("title", FieldDef::string().required())
            .sub_schema("tags", tag, "TAGGED");

        let (holder, transport) = common::holder();
        (holder.model("Story", Some(story)).unwrap(), transport)
    }

    #[tokio::test]
    async fn test_nested_nodes_created_in_one_statement() -> Result<()> {
        let (stories, transport) = stories();
        transport.respond_with(node_rows(vec![(1, json!({"title": "Dune"}))]));

        let node = stories
            .create(
                json!({
                    "title": "Dune",
                    "tags": [
                        {"tag": "SciFi", "comments": {"text": "classic"}},
                        {"tag": "desert"}
                    ]
                }),
                CreateOptions::default(),
            )
            .await?;

        assert_eq!(node, Node::new(1, json!({"title": "Dune"}).as_object().cloned().unwrap()));
        assert_eq!(transport.submissions(), 1);

        let statement = transport.last_statement();
        assert_eq!(
            statement.text(),
            "CREATE (n:Story $props), \
             (s0_n_0:Tag $element_s0_n_0)<-[:TAGGED]-(n), \
             (s0_s0_n_0_0:Comment $element_s0_s0_n_0_0)<-[:COMMENT]-(s0_n_0), \
             (s0_n_1:Tag $element_s0_n_1)<-[:TAGGED]-(n) \
             RETURN id(n), n"
        );
        assert_eq!(statement.param("props"), Some(&json!({"title": "Dune"})));
        assert_eq!(statement.param("element_s0_n_0"), Some(&json!({"tag": "scifi"})));
        assert_eq!(
            statement.param("element_s0_s0_n_0_0"),
            Some(&json!({"text": "classic"}))
        );
        assert_eq!(statement.param("element_s0_n_1"), Some(&json!({"tag": "desert"})));
        Ok(())
    }

    #[tokio::test]
    async fn test_nested_validation_failure_never_submits() -> Result<()> {
        let (stories, transport) = stories();

        let err = stories
            .create(
                json!({"title": "Dune", "tags": [{"tag": "ok"}, {"comments": []}]}),
                CreateOptions::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ModelError::Validation(ValidationError::MissingField("tag".into()))
        );
        assert_eq!(transport.submissions(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_scalar_sub_schema_value_is_rejected() -> Result<()> {
        let (stories, transport) = stories();

        let err = stories
            .create(json!({"title": "Dune", "tags": "scifi"}), CreateOptions::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ModelError::Validation(ValidationError::InvalidSubSchema("tags".into()))
        );
        assert_eq!(transport.submissions(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_ignores_sub_schema_fields() -> Result<()> {
        let (stories, transport) = stories();
        let node = Node::new(1, json!({"title": "Dune"}).as_object().cloned().unwrap());
        transport.respond_with(node_rows(vec![(1, json!({"title": "Dune Messiah"}))]));

        stories
            .update(
                &node,
                json!({"title": "Dune Messiah", "tags": [{"tag": "sequel"}]}),
                WriteOptions::default(),
            )
            .await?;

        let statement = transport.last_statement();
        assert_eq!(
            statement.text(),
            "MATCH (n) WHERE id(n) = $nodeId SET n.title = $title_NEW RETURN id(n), n"
        );
        assert!(statement.param("tags_NEW").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_sub_schema_names() {
        let (stories, _transport) = stories();
        assert_eq!(stories.sub_schema_names(), vec!["tags".to_string()]);
        assert!(stories.schema().has_sub_schemas());
    }
}
