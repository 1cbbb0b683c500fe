//! Read operations against Neo4j: the `NeighborSource` implementation.

use std::collections::HashSet;

use async_trait::async_trait;
use neo4rs::query;

use adcp_core::{Direction, Identity, NodeKey, RelationKind};

use crate::client::{GraphClient, GraphError};
use crate::source::{NeighborRecord, NeighborSource, SearchMode};

const NEIGHBOR_RETURN: &str = "RETURN id(n) AS n_id, n.name AS n_name, labels(n) AS n_labels,
            id(m) AS m_id, m.name AS m_name, labels(m) AS m_labels,
            type(r) AS kind";

#[async_trait]
impl NeighborSource for GraphClient {
    async fn relation_kinds(&self) -> Result<Vec<RelationKind>, GraphError> {
        let q = query("CALL db.relationshipTypes() YIELD relationshipType RETURN relationshipType");

        let rows = self.query_rows(q).await?;
        let mut kinds = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: String = row.get("relationshipType").map_err(|e| {
                GraphError::Serialization(format!("Failed to read relationship type: {e}"))
            })?;
            kinds.push(RelationKind::new(kind));
        }
        Ok(kinds)
    }

    async fn neighbors(
        &self,
        frontier: &[NodeKey],
        excluding: &HashSet<NodeKey>,
        direction: Direction,
        allowed: &[RelationKind],
    ) -> Result<Vec<NeighborRecord>, GraphError> {
        if frontier.is_empty() || allowed.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = match direction {
            Direction::Forward => "(n)-[r]->(m)",
            Direction::Reverse => "(n)<-[r]-(m)",
        };
        let cypher = format!(
            "MATCH {pattern}
             WHERE id(n) IN $frontier AND NOT id(m) IN $excluding AND type(r) IN $kinds
             {NEIGHBOR_RETURN}"
        );

        let q = query(&cypher)
            .param("frontier", frontier.iter().map(|k| k.0).collect::<Vec<i64>>())
            .param("excluding", excluding.iter().map(|k| k.0).collect::<Vec<i64>>())
            .param(
                "kinds",
                allowed
                    .iter()
                    .map(|k| k.as_str().to_string())
                    .collect::<Vec<String>>(),
            );

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let near = row_identity(&row, "n")?;
            let far = row_identity(&row, "m")?;
            let kind: String = row
                .get("kind")
                .map_err(|e| GraphError::Serialization(format!("Failed to read relation: {e}")))?;

            // Records are oriented as stored, whichever way they were walked.
            let (source, target) = match direction {
                Direction::Forward => (near, far),
                Direction::Reverse => (far, near),
            };
            results.push(NeighborRecord {
                source,
                target,
                kind: RelationKind::new(kind),
            });
        }

        Ok(results)
    }

    async fn search(&self, term: &str, mode: SearchMode) -> Result<Vec<Identity>, GraphError> {
        let (operator, value) = match mode {
            SearchMode::Exact => ("=", term.to_string()),
            SearchMode::StartsWith => ("STARTS WITH", term.to_string()),
            SearchMode::Contains => ("CONTAINS", term.to_string()),
            // `=~` matches the whole string.
            SearchMode::Pattern => ("=~", format!("{term}.*")),
        };
        let cypher = format!(
            "MATCH (n) WHERE n.name {operator} $name
             RETURN DISTINCT id(n) AS id, n.name AS name, labels(n) AS labels
             ORDER BY name"
        );

        let q = query(&cypher).param("name", value);

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(row_identity(&row, "")?);
        }
        Ok(results)
    }

    async fn identity(&self, key: NodeKey) -> Result<Option<Identity>, GraphError> {
        let q = query(
            "MATCH (n) WHERE id(n) = $id
             RETURN id(n) AS id, n.name AS name, labels(n) AS labels",
        )
        .param("id", key.0);

        match self.query_one(q).await? {
            Some(row) => Ok(Some(row_identity(&row, "")?)),
            None => Ok(None),
        }
    }
}

/// Read `<prefix>_id`, `<prefix>_name`, `<prefix>_labels` (or the bare column
/// names when `prefix` is empty) into an `Identity`.
fn row_identity(row: &neo4rs::Row, prefix: &str) -> Result<Identity, GraphError> {
    let column = |field: &str| {
        if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}_{field}")
        }
    };

    let key: i64 = row
        .get(&column("id"))
        .map_err(|e| GraphError::Serialization(format!("Failed to read node id: {e}")))?;
    let name: String = row.get(&column("name")).unwrap_or_default();
    let labels: Vec<String> = row.get(&column("labels")).unwrap_or_default();

    Ok(Identity::new(key, name, labels))
}
