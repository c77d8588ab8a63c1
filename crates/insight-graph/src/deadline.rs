//! Caller-supplied deadlines for store operations.

use std::future::Future;
use std::time::Duration;

use crate::client::GraphError;

/// Run `fut` to completion, or drop it and fail with [`GraphError::Timeout`]
/// once `deadline` elapses.
///
/// Dropping the future cancels every store call it has in flight, including
/// tasks owned by a `JoinSet` inside it, so nothing partial escapes.
pub async fn with_deadline<T, E, F>(deadline: Option<Duration>, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<GraphError>,
{
    match deadline {
        None => fut.await,
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(deadline_ms = limit.as_millis() as u64, "Deadline exceeded");
                Err(GraphError::Timeout {
                    millis: limit.as_millis() as u64,
                }
                .into())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let result: Result<u32, GraphError> =
            with_deadline(Some(Duration::from_secs(1)), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_no_deadline_passes_errors_through() {
        let result: Result<u32, GraphError> = with_deadline(None, async {
            Err(GraphError::QueryFailed("syntax".to_string()))
        })
        .await;
        assert!(matches!(result, Err(GraphError::QueryFailed(_))));
    }

    #[tokio::test]
    async fn test_elapsed_deadline_is_timeout() {
        let result: Result<(), GraphError> = with_deadline(Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(GraphError::Timeout { millis: 10 })));
    }
}
