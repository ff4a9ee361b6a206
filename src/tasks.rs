//! Fire-and-forget side work.
//!
//! Used for writes whose failure must never fail the operation that triggered
//! them (driven-distance totals, memo writes). Failures are logged and dropped.

use std::fmt::Display;
use std::future::Future;
use tokio::task::JoinHandle;

/// Handle to a best-effort task. Dropping it detaches the task.
#[derive(Debug)]
pub struct BestEffort {
    label: &'static str,
    handle: JoinHandle<()>,
}

impl BestEffort {
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Waits for the task to finish. Never surfaces the task's error.
    pub async fn settled(self) {
        if let Err(e) = self.handle.await {
            tracing::warn!(task = self.label, "Best-effort task did not complete: {}", e);
        }
    }
}

/// Spawns `fut` on the runtime and logs its error, if any, at warn level.
pub fn spawn_best_effort<F, E>(label: &'static str, fut: F) -> BestEffort
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let handle = tokio::spawn(async move {
        if let Err(e) = fut.await {
            tracing::warn!(task = label, "Best-effort task failed: {}", e);
        }
    });
    BestEffort { label, handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_successful_task_runs() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let task = spawn_best_effort("flag", async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<(), String>(())
        });
        assert_eq!(task.label(), "flag");
        task.settled().await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let task = spawn_best_effort("failing", async { Err::<(), _>("store unavailable") });
        // settles without propagating the error
        task.settled().await;
    }
}
