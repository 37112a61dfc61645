use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task cancelled")]
    Cancelled,
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
}

/// Run `fut` as its own Tokio task and wait for it.
///
/// A panic inside `fut` is contained and reported as [`TaskError::Panicked`] instead of
/// unwinding through the caller.
pub async fn run_isolated<F, T>(fut: F) -> Result<T, TaskError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(value) => Ok(value),
        Err(err) if err.is_cancelled() => Err(TaskError::Cancelled),
        Err(err) => {
            let message = panic_message(err.into_panic());
            tracing::error!(target: "lingua.scheduler", panic = %message, "task panicked");
            Err(TaskError::Panicked(message))
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_owned()
    }
}
