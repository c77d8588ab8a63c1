//! Neo4j connection management and the store contract shared by every backend.

use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Query};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use insight_core::config::GraphConfig;

use crate::lifecycle::Connector;
use crate::queries::{CatalogQuery, Param, Statement};

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Connection attempts exhausted after {attempts} tries: {last_error}")]
    ConnectionExhausted { attempts: u32, last_error: String },

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Invalid hop limit {0}: must be between 1 and {max}", max = insight_core::HopLimit::MAX)]
    InvalidHopLimit(u32),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<neo4rs::Error> for GraphError {
    fn from(e: neo4rs::Error) -> Self {
        match &e {
            neo4rs::Error::IOError { .. } | neo4rs::Error::ConnectionError => {
                Self::StoreUnavailable(e.to_string())
            }
            _ => Self::QueryFailed(e.to_string()),
        }
    }
}

/// One result row: column alias → value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.0.insert(column.to_string(), value.into());
        self
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Decode a column. A missing column decodes as `null`.
    pub fn get<T: DeserializeOwned>(&self, column: &str) -> Result<T, GraphError> {
        let raw = self.0.get(column).cloned().unwrap_or(Value::Null);
        serde_json::from_value(raw)
            .map_err(|e| GraphError::Serialization(format!("column `{column}`: {e}")))
    }
}

/// Read access to a catalog graph.
///
/// Implementations must bind every value in the query as a parameter; the
/// only text spliced into query templates comes from [`CatalogQuery`] itself.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn execute(&self, query: &CatalogQuery) -> Result<Vec<Record>, GraphError>;
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Open the connection pool. Liveness is verified by the caller.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::StoreUnavailable(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::StoreUnavailable(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Get a reference to the underlying neo4rs Graph for direct operations.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }

    /// Execute a rendered statement and decode the declared columns of every row.
    pub async fn execute_statement(&self, statement: &Statement) -> Result<Vec<Record>, GraphError> {
        let mut stream = self.graph.execute(to_neo4j_query(statement)).await?;
        let mut records = Vec::new();
        while let Some(row) = stream.next().await? {
            let mut record = Record::new();
            for column in statement.columns {
                let value: Value = row.get(column).map_err(|e| {
                    GraphError::Serialization(format!("Failed to decode column `{column}`: {e}"))
                })?;
                record = record.with(column, value);
            }
            records.push(record);
        }
        Ok(records)
    }
}

#[async_trait]
impl GraphStore for GraphClient {
    async fn execute(&self, query: &CatalogQuery) -> Result<Vec<Record>, GraphError> {
        let statement = query.statement();
        let records = self.execute_statement(&statement).await?;
        tracing::debug!(query = query.name(), rows = records.len(), "Query executed");
        Ok(records)
    }
}

fn to_neo4j_query(statement: &Statement) -> Query {
    let mut q = query(&statement.cypher);
    for (key, param) in &statement.params {
        q = match param {
            Param::Text(s) => q.param(key, s.clone()),
        };
    }
    q
}

/// Opens [`GraphClient`] pools for the connection manager.
pub struct Neo4jConnector {
    config: GraphConfig,
}

impl Neo4jConnector {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for Neo4jConnector {
    async fn connect(&self) -> Result<Arc<dyn GraphStore>, GraphError> {
        let client = GraphClient::connect(&self.config).await?;
        Ok(Arc::new(client))
    }
}
