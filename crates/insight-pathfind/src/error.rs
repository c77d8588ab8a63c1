//! Error types for the insight-pathfind crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathfindError {
    /// Store conditions surface unchanged.
    #[error(transparent)]
    Graph(#[from] insight_graph::GraphError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Path task failed: {0}")]
    TaskFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PathfindError>;
