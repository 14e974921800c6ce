//! Relationship and Streaming Tests

mod common;

#[cfg(test)]
mod relationship_tests {
    use crate::common::{self, node_rows, rows};
    use anyhow::Result;
    use graphmodel_core::models::Direction;
    use graphmodel_core::options::{
        CreateOptions, FindOptions, NewRelationship, OrderBy, RelationshipFilter,
        RelationshipSpec, WriteOptions,
    };
    use graphmodel_core::{Model, ModelError};
    use serde_json::json;
    use std::sync::Arc;
    use tokio_stream::StreamExt;

    fn users() -> (Model, Arc<common::MockTransport>) {
        let (holder, transport) = common::holder();
        (holder.model("User", None).unwrap(), transport)
    }

    #[tokio::test]
    async fn test_create_relationship_between_existing_nodes() -> Result<()> {
        let (users, transport) = users();
        transport.respond_with(rows(vec![vec![json!(11), json!("LIKES"), json!({"since": 2014})]]));

        let rel = users
            .create_relationship(
                NewRelationship::new(1, 2, "LIKES")
                    .with_data(json!({"since": 2014}).as_object().cloned().unwrap()),
                WriteOptions::default(),
            )
            .await?;

        assert_eq!(rel.id, 11);
        assert_eq!(rel.rel_type, "LIKES");
        assert_eq!(rel.rel.get("since"), Some(&json!(2014)));

        let statement = transport.last_statement();
        assert_eq!(statement.param("from"), Some(&json!(1)));
        assert_eq!(statement.param("to"), Some(&json!(2)));
        assert_eq!(statement.param("data"), Some(&json!({"since": 2014})));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_relationship_with_missing_endpoint() -> Result<()> {
        let (users, _transport) = users();

        let err = users
            .create_relationship(NewRelationship::new(1, 99, "LIKES"), WriteOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ModelError::NoMatch(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_relationship_requires_type() -> Result<()> {
        let (users, transport) = users();

        let err = users
            .create_relationship(NewRelationship::new(1, 2, ""), WriteOptions::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ModelError::invalid_request(
                "Invalid relationship creation request. Relationship details must include from, to and type."
            )
        );
        assert_eq!(transport.submissions(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_relationship() -> Result<()> {
        let (users, transport) = users();

        users.remove_relationship(8, WriteOptions::default()).await?;
        assert_eq!(
            transport.last_statement().text(),
            "MATCH ()-[rel]->() WHERE id(rel) = $relId DELETE rel"
        );

        let err = users
            .remove_relationship(-1, WriteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidRequest(_)));
        assert_eq!(transport.submissions(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_relationships_pairs_nodes_with_rels() -> Result<()> {
        let (users, transport) = users();
        transport.respond_with(rows(vec![
            vec![
                json!(20),
                json!(1),
                json!({"since": 2014}),
                json!("FRIEND"),
                json!(2),
                json!({"name": "Bob"}),
                json!(["User"]),
            ],
            vec![
                json!(21),
                json!(3),
                json!({}),
                json!("FOLLOWS"),
                json!(3),
                json!({"name": "Cat"}),
                json!(["Admin", "User"]),
            ],
        ]));

        let found = users
            .get_relationships(
                1,
                RelationshipFilter::new(),
                FindOptions::new().order_by(OrderBy::asc("name")).limit(2),
            )
            .await?;

        assert_eq!(found.len(), 2);
        assert_eq!(found.rels[0].direction, Direction::From);
        assert_eq!(found.rels[1].direction, Direction::To);
        assert_eq!(found.nodes[1].node_type.as_deref(), Some("Admin"));
        assert_eq!(found.nodes[0].properties.get("name"), Some(&json!("Bob")));

        assert_eq!(
            transport.last_statement().text(),
            "MATCH (n)-[r]-(other) WHERE id(n) = $nodeId \
             RETURN id(r), id(startNode(r)), r, type(r), id(other), other, labels(other) \
             ORDER BY other.name LIMIT 2"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_create_with_relationship_to_existing_node() -> Result<()> {
        let (users, transport) = users();
        transport.respond_with(node_rows(vec![(30, json!({"name": "Dee"}))]));

        users
            .create(
                json!({"name": "Dee"}),
                CreateOptions::new().relationship(RelationshipSpec::new(
                    Direction::To,
                    "FRIEND",
                    "User",
                    "_id",
                    json!(21),
                )),
            )
            .await?;

        let statement = transport.last_statement();
        assert_eq!(
            statement.text(),
            "MATCH (relNode0:User) WHERE id(relNode0) = $indexValue0 \
             CREATE (n:User $props), (n)<-[rel0:FRIEND $relData0]-(relNode0) RETURN id(n), n"
        );
        assert_eq!(statement.param("indexValue0"), Some(&json!(21)));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_with_unmatched_relationship_node() -> Result<()> {
        let (users, _transport) = users();

        let err = users
            .create(
                json!({"name": "Dee"}),
                CreateOptions::new().relationship(RelationshipSpec::new(
                    Direction::From,
                    "MEMBER_OF",
                    "Team",
                    "name",
                    json!("nobody"),
                )),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ModelError::NoMatch(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_with_incomplete_relationship_details() -> Result<()> {
        let (users, transport) = users();

        let err = users
            .create(
                json!({"name": "Dee"}),
                CreateOptions::new().relationship(RelationshipSpec::new(
                    Direction::To,
                    "",
                    "User",
                    "_id",
                    json!(1),
                )),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ModelError::invalid_request("Create User: Invalid relationship details")
        );
        assert_eq!(transport.submissions(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_find_stream_decodes_each_row() -> Result<()> {
        let (users, transport) = users();
        transport.respond_with(node_rows(vec![
            (1, json!({"name": "Ann", "age": 30})),
            (2, json!({"name": "Bob", "age": 31})),
            (3, json!({"name": "Cat", "age": 32})),
        ]));

        let stream = users
            .find_stream(json!({}), FindOptions::new().fields("name"))
            .await?;
        let nodes: Vec<_> = stream.collect::<Result<Vec<_>, _>>().await?;

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[2].id, 3);
        assert!(nodes.iter().all(|n| n.get("age").is_none()));
        Ok(())
    }

    #[tokio::test]
    async fn test_find_stream_inside_transaction() -> Result<()> {
        let (users, transport) = users();
        let (tx, log) = common::transaction();
        log.respond_with(node_rows(vec![(5, json!({"name": "Eve"}))]));

        let mut stream = users
            .find_stream(json!({"name": "Eve"}), FindOptions::new().transaction(&tx))
            .await?;

        let first = stream.next().await.transpose()?;
        assert_eq!(first.map(|n| n.id), Some(5));
        assert!(stream.next().await.is_none());
        assert_eq!(transport.submissions(), 0);
        assert_eq!(log.executed().len(), 1);
        Ok(())
    }
}
