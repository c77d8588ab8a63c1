//! insight-core: Shared types, configuration, and error handling for the
//! Insight catalog.
//!
//! This crate provides the foundational pieces used by every other crate:
//! - Entity, path and hop-limit types for the catalog graph
//! - Configuration loading (file + environment)
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use error::InsightError;
pub use types::{
    DashboardMetrics, DomainMetrics, EntityDetail, EntityKind, EntitySummary, GraphPath,
    HopLimit, Metric, PathRelationship,
};
