//! Simulation context implementing ReplayContext for deterministic runs.

use async_trait::async_trait;
use skyreplay_env::{EnvError, ReplayContext, TaskHandle};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Simulation context backed by a virtual clock.
///
/// - Time only moves when the driver calls [`SimContext::advance_time`] or a
///   task calls `sleep`, which advances it instantly
/// - `timeout` measures the virtual time a future consumed, so a slow
///   collaborator times out identically on every run
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<Mutex<u64>>,
}

impl SimContext {
    /// Creates a new SimContext with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            virtual_time_ns: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        *self.clock() += duration.as_nanos() as u64;
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        *self.clock()
    }

    fn clock(&self) -> MutexGuard<'_, u64> {
        self.virtual_time_ns.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
        }
    }
}

#[async_trait]
impl ReplayContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    async fn sleep(&self, duration: Duration) {
        // In simulation, sleep advances virtual time
        self.advance_time(duration);
    }

    async fn timeout<F>(&self, budget: Duration, future: F) -> Result<F::Output, EnvError>
    where
        F: Future + Send,
        F::Output: Send,
    {
        let started = self.now();
        let output = future.await;
        if self.now().saturating_sub(started) > budget {
            return Err(EnvError::timeout(budget));
        }
        Ok(output)
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

    #[test]
    fn test_sim_context_time() {
        let ctx = SimContext::new(42);
        assert_eq!(ctx.now(), Duration::ZERO);

        ctx.advance_time(Duration::from_secs(1));
        assert_eq!(ctx.now(), Duration::from_secs(1));

        ctx.advance_time(Duration::from_millis(500));
        assert_eq!(ctx.now(), Duration::from_millis(1500));
    }

    #[test]
    fn test_sim_context_clone_shares_time() {
        let ctx1 = SimContext::new(42);
        let ctx2 = ctx1.clone();

        ctx1.advance_time(Duration::from_secs(5));

        // Both should see the same time
        assert_eq!(ctx1.now(), ctx2.now());
        assert_eq!(ctx2.seed(), 42);
    }

    #[tokio::test]
    async fn test_virtual_timeout() {
        let ctx = SimContext::new(7);

        let fast = ctx.timeout(Duration::from_secs(1), async { 5 }).await;
        assert_eq!(fast, Ok(5));

        let slow = ctx
            .timeout(Duration::from_secs(1), async {
                ctx.sleep(Duration::from_secs(2)).await;
            })
            .await;
        assert_eq!(slow, Err(EnvError::Timeout(1000)));
        assert_eq!(ctx.now(), Duration::from_secs(2));
    }
}
