//! Core environment context trait for the replay engine.

use async_trait::async_trait;
use crate::{EnvError, TaskHandle};
use std::future::Future;
use std::time::Duration;

/// The central interface for environment interaction.
///
/// Abstracts the "real world" so the replay engine can run under a browser-like
/// animation loop in production or under a virtual clock in simulation.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time` and `tokio::spawn`
/// - **Simulation**: `SimContext` (in `skyreplay_sim`) - manually advanced clock
#[async_trait]
pub trait ReplayContext: Send + Sync + 'static {
    /// Returns the monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    async fn sleep(&self, duration: Duration);

    /// Runs `future` to completion unless `budget` elapses first.
    ///
    /// Used for the one-shot basemap bake; on expiry the future is dropped and
    /// `EnvError::Timeout` is returned.
    async fn timeout<F>(&self, budget: Duration, future: F) -> Result<F::Output, EnvError>
    where
        F: Future + Send,
        F::Output: Send;

    /// Spawns a background task.
    ///
    /// The task runs detached unless the returned handle is used to abort it.
    fn spawn<F>(&self, name: &str, future: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static;
}
