//! SkyReplay Environment Abstraction Layer
//!
//! The replay engine itself is synchronous and driven once per rendered
//! frame. The few things it needs from the outside world are routed through
//! [`ReplayContext`] so the same engine runs against:
//! - **Production**: [`TokioContext`] (wall clock, `tokio::spawn`)
//! - **Simulation**: a virtual clock owned by the driver (see `skyreplay_sim`)
//!
//! Only the basemap bake is asynchronous; it needs `spawn` and `timeout`.
//!
//! # Example
//!
//! ```ignore
//! use skyreplay_env::{ReplayContext, TokioContext};
//!
//! let ctx = TokioContext::shared();
//! let task = ctx.spawn("basemap-bake", async move {
//!     let raster = ctx.timeout(Duration::from_secs(8), source.bake(bbox, 10)).await;
//!     // ...
//! });
//! ```

mod context;
mod error;
mod task;
mod tokio_impl;

pub use context::ReplayContext;
pub use error::EnvError;
pub use task::TaskHandle;
pub use tokio_impl::TokioContext;
