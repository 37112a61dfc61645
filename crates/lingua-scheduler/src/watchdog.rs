use std::future::Future;
use std::time::Duration;

use crate::TaskError;

/// Await `fut` for at most `timeout`.
///
/// On expiry the future is dropped, which cancels whatever it was doing at its next
/// suspension point, and [`TaskError::DeadlineExceeded`] is returned.
pub async fn run_with_timeout<F, T>(timeout: Duration, fut: F) -> Result<T, TaskError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| TaskError::DeadlineExceeded(timeout))
}
