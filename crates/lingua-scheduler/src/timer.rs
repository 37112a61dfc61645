use std::time::Duration;

use tokio::time::Instant;

use crate::CancellationToken;

struct ArmedTimer {
    token: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// A single-shot timer that is owned by whoever schedules it.
///
/// Arming always cancels the previous handle first, so at most one callback is pending.
/// A callback whose sleep already elapsed may still be running when `cancel` is called;
/// callbacks that mutate shared state must carry their own staleness check.
#[derive(Default)]
pub struct CancellableTimer {
    armed: Option<ArmedTimer>,
}

impl CancellableTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `f` to run after `delay`, replacing any pending callback.
    ///
    /// A delay too large to represent as a deadline never fires. Returns `false` when
    /// called outside a Tokio runtime (the timer then stays disarmed).
    pub fn arm<F>(&mut self, delay: Duration, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                target: "lingua.scheduler",
                ?delay,
                "cannot arm timer outside a tokio runtime"
            );
            return false;
        };

        let token = CancellationToken::new();
        let deadline = Instant::now().checked_add(delay);

        let token_for_task = token.clone();
        let handle = runtime.spawn(async move {
            let Some(deadline) = deadline else {
                token_for_task.cancelled().await;
                return;
            };
            tokio::select! {
                biased;
                _ = token_for_task.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => f(),
            }
        });

        self.armed = Some(ArmedTimer { token, handle });
        true
    }

    /// Cancel the pending callback, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        let Some(armed) = self.armed.take() else {
            return false;
        };
        armed.token.cancel();
        let pending = !armed.handle.is_finished();
        armed.handle.abort();
        pending
    }

    /// Whether a callback is scheduled and has not fired yet.
    pub fn is_armed(&self) -> bool {
        self.armed
            .as_ref()
            .is_some_and(|armed| !armed.handle.is_finished() && !armed.token.is_cancelled())
    }
}

impl std::fmt::Debug for CancellableTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellableTimer")
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl Drop for CancellableTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
