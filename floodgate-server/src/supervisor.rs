//! Fire-and-forget background task execution with failure isolation.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Runs detached units of work off the request path.
///
/// Every unit of work is counted while outstanding, and its failure -- an
/// `Err` return or a panic -- is logged and contained rather than propagated.
/// The supervisor never retries; retry policy, if any, belongs to the unit of
/// work itself.
///
/// Cloning is cheap; all clones share one outstanding count, which is what
/// the lifecycle coordinator drains during shutdown.
#[derive(Clone)]
pub struct TaskSupervisor {
    inner: Arc<Inner>,
}

struct Inner {
    outstanding: AtomicUsize,
    // Signalled on every decrement so wait_idle never has to poll.
    drained: Notify,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            inner: Arc::new(Inner {
                outstanding: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
        }
    }

    /// Schedule `work` to run independently of the caller's lifetime.
    ///
    /// Returns immediately and never blocks on previously scheduled work.
    /// The outstanding count is incremented before the work starts and
    /// decremented exactly once when it ends, on every exit path including
    /// a panic inside the work. The panic recovery wraps the unit of work's
    /// entire execution.
    pub fn spawn<F>(&self, name: &'static str, work: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        inner.outstanding.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            match AssertUnwindSafe(work).catch_unwind().await {
                Ok(Ok(())) => {
                    tracing::debug!(task = name, "background task finished");
                }
                Ok(Err(err)) => {
                    tracing::error!(task = name, error = %err, "background task failed");
                }
                Err(panic) => {
                    tracing::error!(
                        task = name,
                        panic = panic_message(&panic),
                        "background task panicked"
                    );
                }
            }

            inner.outstanding.fetch_sub(1, Ordering::SeqCst);
            inner.drained.notify_waiters();
        });
    }

    /// Number of scheduled units of work that have not yet finished
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    /// Block until the outstanding count reaches zero or `deadline` passes.
    ///
    /// Returns `true` if the supervisor drained, `false` on timeout. Used
    /// only by the lifecycle coordinator; scheduling is never gated on this.
    pub async fn wait_idle(&self, deadline: Duration) -> bool {
        tokio::time::timeout(deadline, async {
            loop {
                // Register the waiter before re-checking the count, or a
                // decrement landing between the two is a lost wakeup.
                let notified = self.inner.drained.notified();
                if self.inner.outstanding.load(Ordering::SeqCst) == 0 {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
