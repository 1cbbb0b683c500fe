//! Write operations for the graph: loading and removing test fixtures.
//!
//! Control-path analysis never writes to the store. These operations exist so
//! integration tests and demos can seed a Neo4j instance with a known graph.
//! Every node and relation created here is tagged, and only tagged data is
//! ever deleted.

use neo4rs::query;

use crate::client::{GraphClient, GraphError};
use crate::fixture::{is_identifier, Fixture};

impl GraphClient {
    /// Create every fixture node and relation in a single transaction.
    /// Returns `(nodes, relations)` created.
    pub async fn load_fixture(&self, fixture: &Fixture) -> Result<(usize, usize), GraphError> {
        let mut txn = self.start_txn().await?;

        for node in &fixture.nodes {
            let label = checked(&node.label)?;
            let cypher = format!("CREATE (n:{label} {{name: $name, is_test_node: true}})");
            txn.run(query(&cypher).param("name", node.name.clone()))
                .await?;
        }

        for rel in &fixture.relations {
            let kind = checked(&rel.kind)?;
            let cypher = format!(
                "MATCH (a {{name: $source, is_test_node: true}}),
                       (b {{name: $target, is_test_node: true}})
                 CREATE (a)-[:{kind} {{is_test_relation: true}}]->(b)"
            );
            let q = query(&cypher)
                .param("source", rel.source.clone())
                .param("target", rel.target.clone());
            txn.run(q).await?;
        }

        txn.commit().await?;
        tracing::info!(
            nodes = fixture.nodes.len(),
            relations = fixture.relations.len(),
            "Fixture loaded"
        );
        Ok((fixture.nodes.len(), fixture.relations.len()))
    }

    /// Delete every tagged fixture node and its relations.
    pub async fn delete_fixture(&self) -> Result<i64, GraphError> {
        let q = query(
            "MATCH (n) WHERE n.is_test_node
             DETACH DELETE n
             RETURN count(n) AS cnt",
        );

        let deleted = match self.query_one(q).await? {
            Some(row) => row.get::<i64>("cnt").unwrap_or(0),
            None => 0,
        };
        tracing::info!(deleted, "Fixture removed");
        Ok(deleted)
    }
}

fn checked(identifier: &str) -> Result<&str, GraphError> {
    if is_identifier(identifier) {
        Ok(identifier)
    } else {
        Err(GraphError::Fixture(format!("invalid identifier {identifier}")))
    }
}
