//! Deadline enforcement for repository calls.

use std::future::Future;
use std::time::Duration;

/// Runs `operation` and maps an elapsed deadline onto the caller's error.
///
/// A timed-out call never reports partial success: the future is dropped
/// and `on_timeout` decides the error value.
pub(crate) async fn within<T, E, F>(
    limit: Duration,
    operation: F,
    on_timeout: impl FnOnce(Duration) -> E,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = limit.as_millis(), "repository call timed out");
            Err(on_timeout(limit))
        }
    }
}
