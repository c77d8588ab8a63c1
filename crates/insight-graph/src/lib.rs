//! Insight Graph — Neo4j access for the metrics catalog.
//!
//! Every read of the catalog graph flows through a [`GraphStore`]. The
//! production store is the neo4rs-backed [`GraphClient`], reached through the
//! [`ConnectionManager`] which owns the retry-guarded connection lifecycle.
//! [`MemoryGraph`] evaluates the same queries in-process.

pub mod catalog;
pub mod client;
pub mod deadline;
pub mod lifecycle;
pub mod memory;
pub mod queries;

pub use catalog::Catalog;
pub use client::{GraphClient, GraphError, GraphStore, Neo4jConnector, Record};
pub use deadline::with_deadline;
pub use insight_core::config::GraphConfig;
pub use lifecycle::{ConnectionManager, ConnectionState, Connector, RetryPolicy};
pub use memory::MemoryGraph;
pub use queries::{CatalogQuery, Param, Statement};
