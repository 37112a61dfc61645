use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::CancellationToken;

/// A background loop that invokes a closure on a fixed interval until stopped.
///
/// The first tick happens one full `period` after spawning. Dropping the task stops it.
pub struct PeriodicTask {
    name: &'static str,
    token: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn onto the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn spawn<F>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let token = CancellationToken::new();
        let token_for_task = token.clone();

        let handle = tokio::spawn(async move {
            let Some(start) = tokio::time::Instant::now().checked_add(period) else {
                token_for_task.cancelled().await;
                return;
            };
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token_for_task.cancelled() => break,
                    _ = interval.tick() => tick(),
                }
            }
            tracing::debug!(target: "lingua.scheduler", task = name, "periodic task stopped");
        });

        Self {
            name,
            token,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled() || self.handle.is_finished()
    }
}

impl std::fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("name", &self.name)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
