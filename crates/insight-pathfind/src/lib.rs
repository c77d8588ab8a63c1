//! insight-pathfind: path resolution for the Insight metrics catalog.
//!
//! Resolves bounded shortest paths between named catalog entities and
//! aggregates paths across the members of two domains. [`CatalogApi`] exposes
//! the catalog and the engine behind one JSON request contract.

pub mod api;
pub mod engine;
pub mod error;

pub use api::{read_request, CatalogApi, CatalogRequest};
pub use engine::{DomainPathOptions, PathEngine};
pub use error::PathfindError;
