//! Production implementation of ReplayContext using Tokio.

use crate::{EnvError, ReplayContext, TaskHandle};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Production context backed by Tokio and the system clock.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplayContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn timeout<F>(&self, budget: Duration, future: F) -> Result<F::Output, EnvError>
    where
        F: Future + Send,
        F::Output: Send,
    {
        tokio::time::timeout(budget, future)
            .await
            .map_err(|_| EnvError::timeout(budget))
    }

    fn spawn<F>(&self, _name: &str, future: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(future).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_context_time() {
        let ctx = TokioContext::new();
        let t1 = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;
        let t2 = ctx.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_timeout_expires() {
        let ctx = TokioContext::new();
        let result = ctx
            .timeout(Duration::from_millis(10), tokio::time::sleep(Duration::from_secs(5)))
            .await;

        assert_eq!(result, Err(EnvError::Timeout(10)));
    }

    #[tokio::test]
    async fn test_timeout_passes_through_result() {
        let ctx = TokioContext::new();
        let result = ctx.timeout(Duration::from_secs(5), async { 7 }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_spawn_runs_detached() {
        let ctx = TokioContext::new();
        let (tx, rx) = tokio::sync::oneshot::channel();
        ctx.spawn("ping", async move {
            let _ = tx.send(42u32);
        });
        assert_eq!(rx.await.ok(), Some(42));
    }

    #[tokio::test]
    async fn test_abort_drops_task() {
        let ctx = TokioContext::new();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let task = ctx.spawn("slow", async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            let _ = tx.send(1u32);
        });

        task.abort();
        // the sender is dropped with the aborted future
        assert!(rx.await.is_err());
        assert!(task.is_finished());
    }
}
