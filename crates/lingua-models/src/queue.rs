//! Single-flight execution queue.
//!
//! Submissions run strictly one at a time, in submission order, across every resource. A
//! task is popped, its resource is loaded, its operation runs, and its caller is resolved
//! before the next task is popped.

use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use lingua_scheduler::{run_isolated, TaskError};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::loader::BoxFuture;
use crate::{ResourceError, ResourceId, ResourceLease, ResourceManager};

type Job = Box<dyn FnOnce(Result<ResourceLease, ResourceError>) -> BoxFuture<'static, ()> + Send>;

struct QueuedTask {
    resource_id: ResourceId,
    job: Job,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedTask>,
    draining: bool,
    closed: bool,
}

struct Inner {
    manager: ResourceManager,
    state: Mutex<QueueState>,
}

/// FIFO queue guaranteeing at most one resource-bound operation in flight process-wide.
#[derive(Clone)]
pub struct ExecutionQueue {
    inner: Arc<Inner>,
}

impl ExecutionQueue {
    pub fn new(manager: ResourceManager) -> Self {
        Self {
            inner: Arc::new(Inner {
                manager,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn manager(&self) -> &ResourceManager {
        &self.inner.manager
    }

    /// Queue `op` to run against `resource_id` once every earlier submission has resolved.
    ///
    /// The operation receives a lease on the loaded resource. Its error, or a panic inside
    /// it, is reported to this caller only as [`ResourceError::OperationFailure`]; the queue
    /// moves on to the next task either way. Outside a Tokio runtime nothing is queued and
    /// the submission resolves to [`ResourceError::NoAsyncRuntime`].
    pub fn submit<F, Fut, T, E>(&self, resource_id: impl Into<ResourceId>, op: F) -> Submission<T>
    where
        F: FnOnce(ResourceLease) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let resource_id = resource_id.into();
        let (sender, receiver) = oneshot::channel();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(
                target: "lingua.models",
                resource = %resource_id,
                "submission outside a tokio runtime rejected"
            );
            let _ = sender.send(Err(ResourceError::NoAsyncRuntime(resource_id)));
            return Submission { receiver };
        };

        let job: Job = Box::new(
            move |lease: Result<ResourceLease, ResourceError>| -> BoxFuture<'static, ()> {
                Box::pin(async move {
                    let outcome = match lease {
                        Ok(lease) => run_operation(op, lease).await,
                        Err(err) => Err(err),
                    };
                    // The caller may have stopped waiting; that is not an error for the queue.
                    let _ = sender.send(outcome);
                })
            },
        );

        let start_drain = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Submission { receiver };
            }
            state.pending.push_back(QueuedTask { resource_id, job });
            !std::mem::replace(&mut state.draining, true)
        };

        if start_drain {
            runtime.spawn(Arc::clone(&self.inner).drain());
        }
        Submission { receiver }
    }

    /// Number of tasks waiting to be popped. The task currently executing is not counted.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    pub fn is_draining(&self) -> bool {
        self.inner.state.lock().draining
    }

    /// Reject new submissions and drop every task not yet popped; their callers observe
    /// [`ResourceError::QueueClosed`]. The task in flight, if any, still completes.
    pub fn close(&self) -> usize {
        let dropped = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            std::mem::take(&mut state.pending)
        };
        if !dropped.is_empty() {
            tracing::info!(target: "lingua.models", dropped = dropped.len(), "execution queue closed");
        }
        dropped.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }
}

impl std::fmt::Debug for ExecutionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ExecutionQueue")
            .field("pending", &state.pending.len())
            .field("draining", &state.draining)
            .field("closed", &state.closed)
            .finish()
    }
}

impl Inner {
    async fn drain(self: Arc<Self>) {
        loop {
            let task = {
                let mut state = self.state.lock();
                match state.pending.pop_front() {
                    Some(task) => task,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };

            tracing::trace!(target: "lingua.models", resource = %task.resource_id, "running queued task");
            let lease = self.manager.ensure_loaded(&task.resource_id).await;
            (task.job)(lease).await;
        }
    }
}

async fn run_operation<F, Fut, T, E>(op: F, lease: ResourceLease) -> Result<T, ResourceError>
where
    F: FnOnce(ResourceLease) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    let resource = lease.id().clone();
    match run_isolated(async move { op(lease).await }).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            let message = err.to_string();
            tracing::debug!(target: "lingua.models", %resource, error = %message, "operation failed");
            Err(ResourceError::OperationFailure(message))
        }
        Err(TaskError::Panicked(message)) => Err(ResourceError::OperationFailure(format!(
            "operation panicked: {message}"
        ))),
        Err(err) => Err(ResourceError::OperationFailure(err.to_string())),
    }
}

/// Pending result of [`ExecutionQueue::submit`]. Resolves exactly once.
#[must_use = "the operation result is lost unless the submission is awaited"]
pub struct Submission<T> {
    receiver: oneshot::Receiver<Result<T, ResourceError>>,
}

impl<T> Future for Submission<T> {
    type Output = Result<T, ResourceError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(ResourceError::QueueClosed)))
    }
}

impl<T> std::fmt::Debug for Submission<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submission").finish_non_exhaustive()
    }
}
