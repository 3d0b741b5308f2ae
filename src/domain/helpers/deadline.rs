use std::{future::Future, time::Duration};

use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

use crate::domain::cart::CartError;

/// Attempts made for an operation that keeps losing optimistic concurrency checks.
const MAX_CONFLICT_RETRIES: usize = 3;

/// Fails with [`CartError::Timeout`] if `operation` has not finished within `deadline`.
pub async fn with_deadline<T, F>(deadline: Duration, operation: F) -> Result<T, CartError>
where
    F: Future<Output = Result<T, CartError>>,
{
    tokio::time::timeout(deadline, operation)
        .await
        .map_err(|_| CartError::Timeout)?
}

/// Re-runs the whole read-modify-write operation when a concurrent writer got in first.
pub async fn retry_on_conflict<T, F, Fut>(operation: F) -> Result<T, CartError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CartError>>,
{
    operation
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(10))
                .with_max_delay(Duration::from_millis(200))
                .with_max_times(MAX_CONFLICT_RETRIES)
                .with_jitter(),
        )
        .when(CartError::is_retryable)
        .sleep(tokio::time::sleep)
        .notify(|err, dur| warn!("Retrying cart operation after {dur:?}: {err}"))
        .await
}
