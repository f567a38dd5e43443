//! Graph context lookup
//!
//! Queries `Beneficio` nodes in Neo4j for descriptions containing a search
//! term, with an unfiltered sample as fallback.

mod lookup;
mod store;

pub use lookup::{GraphContextLookup, MAX_MATCHES, TERM_PARAM, fallback_query, matching_query};
pub use store::{GraphQuery, GraphRow, GraphStore, Neo4jGraphStore};
