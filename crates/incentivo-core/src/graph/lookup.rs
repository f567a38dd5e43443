//! Benefit lookup with an unfiltered fallback

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;

use super::store::{GraphQuery, GraphStore};

/// Maximum number of benefits returned by one lookup
pub const MAX_MATCHES: usize = 5;

/// Column every benefit query returns
const BENEFIT_COLUMN: &str = "beneficio";

/// Parameter carrying the search term
pub const TERM_PARAM: &str = "termo";

/// Looks up `Beneficio` nodes whose description mentions a term
#[derive(Clone)]
pub struct GraphContextLookup {
    store: Arc<dyn GraphStore>,
}

impl GraphContextLookup {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Case-insensitive substring search; falls back to any benefits when
    /// nothing matches. Each entry reads `"Benefício identificado: ..."`.
    pub async fn lookup(&self, term: &str) -> Result<Vec<String>> {
        let matching = self.store.run_read(&matching_query(term)).await?;
        let mut benefits = format_rows(&matching);

        if benefits.is_empty() {
            debug!(term = %term, "No benefit matched the term, using fallback sample");
            let sample = self.store.run_read(&fallback_query()).await?;
            benefits = format_rows(&sample);
        }

        debug!(count = benefits.len(), "Graph context gathered");
        Ok(benefits)
    }

    /// Lookup result as one newline-separated block
    pub async fn context(&self, term: &str) -> Result<String> {
        Ok(self.lookup(term).await?.join("\n"))
    }
}

pub fn matching_query(term: &str) -> GraphQuery {
    GraphQuery::new(format!(
        "MATCH (b:Beneficio)\n\
         WHERE toLower(b.descricao) CONTAINS toLower(${})\n\
         RETURN b.descricao AS {}\n\
         LIMIT {}",
        TERM_PARAM, BENEFIT_COLUMN, MAX_MATCHES
    ))
    .param(TERM_PARAM, term)
    .column(BENEFIT_COLUMN)
}

pub fn fallback_query() -> GraphQuery {
    GraphQuery::new(format!(
        "MATCH (b:Beneficio)\n\
         WHERE b.descricao IS NOT NULL\n\
         RETURN b.descricao AS {}\n\
         LIMIT {}",
        BENEFIT_COLUMN, MAX_MATCHES
    ))
    .column(BENEFIT_COLUMN)
}

// Null descriptions are skipped
fn format_rows(rows: &[super::store::GraphRow]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get(BENEFIT_COLUMN))
        .take(MAX_MATCHES)
        .map(|description| format!("Benefício identificado: {}", description))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphRow;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves benefit descriptions and records every query it receives
    struct FakeStore {
        descriptions: Vec<Option<String>>,
        seen: Mutex<Vec<GraphQuery>>,
    }

    impl FakeStore {
        fn new(descriptions: &[&str]) -> Self {
            Self {
                descriptions: descriptions.iter().map(|d| Some(d.to_string())).collect(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GraphStore for FakeStore {
        async fn run_read(&self, query: &GraphQuery) -> Result<Vec<GraphRow>> {
            self.seen.lock().unwrap().push(query.clone());
            let term = query.param_value(TERM_PARAM).map(str::to_lowercase);
            // Deliberately unlimited so the lookup's own cap is exercised
            Ok(self
                .descriptions
                .iter()
                .filter(|d| match (&term, d) {
                    (Some(t), Some(d)) => d.to_lowercase().contains(t.as_str()),
                    (Some(_), None) => false,
                    (None, _) => true,
                })
                .map(|d| GraphRow::new().with(BENEFIT_COLUMN, d.clone()))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_matches_case_insensitively() {
        let store = Arc::new(FakeStore::new(&[
            "Dedução de 20,4% a 34% do IRPJ e CSLL",
            "Redução de 50% do IPI",
            "Depreciação acelerada",
        ]));
        let lookup = GraphContextLookup::new(store.clone());

        let result = lookup.lookup("irpj").await.unwrap();

        assert_eq!(
            result,
            vec!["Benefício identificado: Dedução de 20,4% a 34% do IRPJ e CSLL"]
        );
        assert_eq!(store.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_when_nothing_matches() {
        let descriptions: Vec<String> = (1..=8).map(|i| format!("Benefício {}", i)).collect();
        let refs: Vec<&str> = descriptions.iter().map(String::as_str).collect();
        let store = Arc::new(FakeStore::new(&refs));
        let lookup = GraphContextLookup::new(store.clone());

        let result = lookup.lookup("O que é a Lei do Bem?").await.unwrap();

        assert_eq!(result.len(), MAX_MATCHES);
        assert_eq!(result[0], "Benefício identificado: Benefício 1");
        let seen = store.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].param_value(TERM_PARAM).is_none());
    }

    #[tokio::test]
    async fn test_matches_are_capped() {
        let descriptions: Vec<String> = (1..=7).map(|i| format!("IRPJ item {}", i)).collect();
        let refs: Vec<&str> = descriptions.iter().map(String::as_str).collect();
        let lookup = GraphContextLookup::new(Arc::new(FakeStore::new(&refs)));

        let result = lookup.lookup("irpj").await.unwrap();

        assert_eq!(result.len(), MAX_MATCHES);
        assert!(result.iter().all(|r| r.to_lowercase().contains("irpj")));
    }

    #[tokio::test]
    async fn test_empty_store_yields_empty_context() {
        let lookup = GraphContextLookup::new(Arc::new(FakeStore::new(&[])));
        assert!(lookup.lookup("qualquer").await.unwrap().is_empty());
        assert_eq!(lookup.context("qualquer").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_null_descriptions_are_skipped() {
        let store = FakeStore {
            descriptions: vec![None, Some("Isenção de IR em patentes".to_string())],
            seen: Mutex::new(Vec::new()),
        };
        let lookup = GraphContextLookup::new(Arc::new(store));

        let result = lookup.context("nada").await.unwrap();
        assert_eq!(result, "Benefício identificado: Isenção de IR em patentes");
    }

    /// Applies the query's null filter and `LIMIT` the way Neo4j would
    struct LimitingStore {
        descriptions: Vec<Option<String>>,
    }

    #[async_trait]
    impl GraphStore for LimitingStore {
        async fn run_read(&self, query: &GraphQuery) -> Result<Vec<GraphRow>> {
            let skip_nulls = query.cypher().contains("IS NOT NULL");
            let term = query.param_value(TERM_PARAM).map(str::to_lowercase);
            Ok(self
                .descriptions
                .iter()
                .filter(|d| !(skip_nulls && d.is_none()))
                .filter(|d| match (&term, d) {
                    (Some(t), Some(d)) => d.to_lowercase().contains(t.as_str()),
                    (Some(_), None) => false,
                    (None, _) => true,
                })
                .take(MAX_MATCHES)
                .map(|d| GraphRow::new().with(BENEFIT_COLUMN, d.clone()))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_fallback_reaches_described_nodes_behind_nulls() {
        let mut descriptions = vec![None; 5];
        descriptions.push(Some("Redução de IPI".to_string()));
        let lookup = GraphContextLookup::new(Arc::new(LimitingStore { descriptions }));

        let result = lookup.lookup("x").await.unwrap();

        assert_eq!(result, vec!["Benefício identificado: Redução de IPI"]);
    }

    #[test]
    fn test_queries_bind_term_instead_of_interpolating() {
        let q = matching_query("x' OR 1=1");
        assert!(!q.cypher().contains("x' OR 1=1"));
        assert!(q.cypher().contains("$termo"));
        assert!(q.cypher().contains("LIMIT 5"));
        assert!(fallback_query().params().is_empty());
        assert!(fallback_query().cypher().contains("b.descricao IS NOT NULL"));
    }
}
