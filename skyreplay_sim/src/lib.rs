//! SkyReplay Simulation Harness
//!
//! Drives the replay engine the way a render loop would, but on a virtual
//! clock so every run is reproducible:
//! - **Time**: frames advance a manually stepped clock; the basemap bake's
//!   latency and timeout are measured on the same clock
//! - **Tracks**: demo scenarios are flown from seeded ChaCha8 noise, or loaded
//!   from JSON through the engine's ingestion path
//! - **Output**: frames are exported as JSON for external viewers
//!
//! # Usage
//!
//! ```ignore
//! use skyreplay_sim::{ReplayRunner, SimConfig};
//! use skyreplay_sim::scenarios::ScenarioId;
//!
//! let runner = ReplayRunner::new(SimConfig::default(), Default::default());
//! let scenario = ScenarioId::NearMiss.build(42)?;
//! let (result, export) = runner.run(&scenario, Some(ScenarioId::NearMiss)).await?;
//! ```

mod basemap;
mod context;
mod error;
mod exporter;
mod runner;
pub mod scenarios;

pub use basemap::SyntheticBasemap;
pub use context::SimContext;
pub use error::SimError;
pub use exporter::{CameraRecord, PosePoint, ProximityRecord, ReplayExport, ReplayFrame};
pub use runner::{ReplayRunner, RunResult, SimConfig};
