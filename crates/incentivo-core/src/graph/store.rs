//! Graph store seam and its Neo4j implementation

use std::collections::BTreeMap;

use async_trait::async_trait;
use neo4rs::{Graph, query};
use tracing::{debug, info};

use crate::config::GraphConfig;
use crate::error::{Error, Result};

/// A parameterized read-only Cypher query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQuery {
    cypher: String,
    params: Vec<(String, String)>,
    columns: Vec<String>,
}

impl GraphQuery {
    pub fn new(cypher: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            params: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Bind a string parameter (`$key` in the query text)
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Request a returned column to be read from every row
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    pub fn cypher(&self) -> &str {
        &self.cypher
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// One result row: requested columns by name, `None` for nulls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphRow {
    fields: BTreeMap<String, Option<String>>,
}

impl GraphRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: Option<String>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Option<String>) {
        self.fields.insert(column.into(), value);
    }

    /// Value of a column; `None` when absent or null
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).and_then(|v| v.as_deref())
    }
}

/// Read-only access to a graph database
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run a read query and return its rows in store order
    async fn run_read(&self, query: &GraphQuery) -> Result<Vec<GraphRow>>;
}

/// Neo4j-backed graph store
///
/// Owns the driver's connection pool for the process lifetime. Every query
/// borrows a pooled connection that is returned once its row stream has been
/// drained or dropped.
pub struct Neo4jGraphStore {
    graph: Graph,
    uri: String,
}

impl std::fmt::Debug for Neo4jGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jGraphStore")
            .field("uri", &self.uri)
            .finish()
    }
}

impl Neo4jGraphStore {
    /// Open the driver against `uri` with the given credentials
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        debug!(uri = %uri, user = %user, "Connecting to graph store");
        let graph = Graph::new(uri, user, password).await?;
        info!(uri = %uri, "Graph store driver ready");
        Ok(Self {
            graph,
            uri: uri.to_string(),
        })
    }

    /// Open the driver from configuration, resolving `NEO4J_*` variables
    pub async fn from_config(config: &GraphConfig) -> Result<Self> {
        let password = config
            .resolved_password()
            .map_err(|e| Error::ConfigError(e.to_string()))?
            .unwrap_or_default();
        Self::connect(&config.resolved_uri(), &config.resolved_user(), &password).await
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Round-trip a trivial query to prove the server is reachable
    pub async fn verify_connectivity(&self) -> Result<()> {
        self.graph.run(query("RETURN 1")).await?;
        debug!(uri = %self.uri, "Graph store connectivity verified");
        Ok(())
    }

    /// Release the driver and its pooled connections
    pub fn close(self) {
        debug!(uri = %self.uri, "Closing graph store driver");
        drop(self.graph);
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn run_read(&self, graph_query: &GraphQuery) -> Result<Vec<GraphRow>> {
        let mut cypher = query(graph_query.cypher());
        for (key, value) in graph_query.params() {
            cypher = cypher.param(key.as_str(), value.clone());
        }

        let mut stream = self.graph.execute(cypher).await?;
        let mut rows = Vec::new();

        while let Some(row) = stream.next().await? {
            let mut out = GraphRow::new();
            for column in graph_query.columns() {
                let value: Option<String> = row
                    .get(column)
                    .map_err(|e| Error::GraphRow(format!("column '{}': {}", column, e)))?;
                out.insert(column.as_str(), value);
            }
            rows.push(out);
        }

        debug!(rows = rows.len(), "Graph query completed");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_query_builder() {
        let q = GraphQuery::new("MATCH (b:Beneficio) RETURN b.descricao AS beneficio")
            .param("termo", "IRPJ")
            .column("beneficio");

        assert_eq!(q.param_value("termo"), Some("IRPJ"));
        assert_eq!(q.param_value("missing"), None);
        assert_eq!(q.columns(), ["beneficio".to_string()]);
        assert!(q.cypher().starts_with("MATCH"));
    }

    #[test]
    fn test_graph_row_null_and_missing() {
        let row = GraphRow::new()
            .with("beneficio", Some("Dedução de IRPJ".to_string()))
            .with("nulo", None);

        assert_eq!(row.get("beneficio"), Some("Dedução de IRPJ"));
        assert_eq!(row.get("nulo"), None);
        assert_eq!(row.get("inexistente"), None);
    }
}
