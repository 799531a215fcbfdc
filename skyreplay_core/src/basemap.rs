//! The Basemap Texture Bridge: one-shot raster bake for the ground plane.
//!
//! The bake runs detached on the [`ReplayContext`] under a timeout. Each
//! request bumps a generation counter; a result is applied only if its
//! generation is still current, so a bake that lands after the primary track
//! changed (or the view closed) is dropped instead of painting the wrong
//! ground. Failure or timeout degrades to an untextured grid and never blocks
//! the replay.

use crate::bounds::BoundingBox;
use crate::config::BasemapConfig;
use async_trait::async_trait;
use serde::Serialize;
use skyreplay_env::{EnvError, ReplayContext, TaskHandle};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Baked RGBA raster covering exactly the requested bbox.
#[derive(Debug, Clone, PartialEq)]
pub struct BasemapRaster {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl BasemapRaster {
    /// Fails when the buffer doesn't hold `width * height` RGBA pixels.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, EnvError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(EnvError::decode(format!(
                "raster {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                rgba.len()
            )));
        }
        Ok(Self { width, height, rgba })
    }
}

/// The external raster baker.
#[async_trait]
pub trait BasemapSource: Send + Sync + 'static {
    async fn bake(&self, bbox: BoundingBox, zoom: u8) -> Result<BasemapRaster, EnvError>;
}

/// What the renderer draws under the scene.
#[derive(Debug, Clone, Default)]
pub enum GroundPlane {
    /// Bake in flight; draw the grid meanwhile
    #[default]
    Pending,
    Textured {
        bbox: BoundingBox,
        raster: Arc<BasemapRaster>,
    },
    /// Untextured fallback
    Grid,
}

impl GroundPlane {
    pub fn is_textured(&self) -> bool {
        matches!(self, GroundPlane::Textured { .. })
    }

    pub fn summary(&self) -> GroundSummary {
        match self {
            GroundPlane::Pending => GroundSummary::Pending,
            GroundPlane::Textured { raster, .. } => GroundSummary::Textured {
                width: raster.width,
                height: raster.height,
            },
            GroundPlane::Grid => GroundSummary::Grid,
        }
    }
}

/// Serializable view of a [`GroundPlane`] without the pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum GroundSummary {
    Pending,
    Textured { width: u32, height: u32 },
    Grid,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    plane: GroundPlane,

    /// Bake of the current generation, if one is running
    task: Option<TaskHandle>,
}

impl Slot {
    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

type SharedSlot = Arc<Mutex<Slot>>;

fn lock(slot: &SharedSlot) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// Bridge from the session to a [`BasemapSource`], driven by a context.
pub struct BasemapBridge<Ctx: ReplayContext, S: BasemapSource> {
    ctx: Arc<Ctx>,
    source: Arc<S>,
    config: BasemapConfig,
    slot: SharedSlot,
}

impl<Ctx: ReplayContext, S: BasemapSource> BasemapBridge<Ctx, S> {
    pub fn new(ctx: Arc<Ctx>, source: S, config: BasemapConfig) -> Self {
        Self {
            ctx,
            source: Arc::new(source),
            config,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Wraps the bridge into the non-generic handle the session holds.
    pub fn into_handle(self) -> BasemapHandle {
        BasemapHandle {
            inner: Arc::new(self),
        }
    }

    pub fn generation(&self) -> u64 {
        lock(&self.slot).generation
    }

    /// Starts a bake for `bbox`, superseding any bake in flight.
    pub fn request(&self, bbox: BoundingBox) -> u64 {
        let generation = {
            let mut slot = lock(&self.slot);
            slot.generation += 1;
            slot.plane = GroundPlane::Pending;
            slot.abort_task();
            slot.generation
        };

        let ctx = Arc::clone(&self.ctx);
        let source = Arc::clone(&self.source);
        let slot = Arc::clone(&self.slot);
        let budget = self.config.timeout();
        let zoom = self.config.zoom;

        debug!("Basemap bake #{} requested (zoom {})", generation, zoom);
        let task = self.ctx.spawn("basemap-bake", async move {
            let outcome = ctx.timeout(budget, source.bake(bbox, zoom)).await.and_then(|r| r);

            let mut slot = lock(&slot);
            if slot.generation != generation {
                debug!(
                    "Discarding stale basemap bake #{} (current #{})",
                    generation, slot.generation
                );
                return;
            }
            slot.plane = match outcome {
                Ok(raster) => {
                    info!("Basemap bake #{} ready: {}x{}", generation, raster.width, raster.height);
                    GroundPlane::Textured {
                        bbox,
                        raster: Arc::new(raster),
                    }
                }
                Err(e) => {
                    warn!("Basemap bake #{} failed, using grid ground: {}", generation, e);
                    GroundPlane::Grid
                }
            };
            slot.task = None;
        });

        let mut slot = lock(&self.slot);
        if slot.generation == generation && !task.is_finished() {
            slot.task = Some(task);
        }
        generation
    }

    /// Aborts any bake in flight and releases the current texture.
    pub fn cancel(&self) {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        slot.plane = GroundPlane::Grid;
        slot.abort_task();
    }

    pub fn ground_plane(&self) -> GroundPlane {
        lock(&self.slot).plane.clone()
    }
}

/// Object-safe surface of [`BasemapBridge`].
pub trait GroundPlaneProvider: Send + Sync {
    fn request(&self, bbox: BoundingBox) -> u64;
    fn cancel(&self);
    fn ground_plane(&self) -> GroundPlane;
}

impl<Ctx: ReplayContext, S: BasemapSource> GroundPlaneProvider for BasemapBridge<Ctx, S> {
    fn request(&self, bbox: BoundingBox) -> u64 {
        BasemapBridge::request(self, bbox)
    }

    fn cancel(&self) {
        BasemapBridge::cancel(self)
    }

    fn ground_plane(&self) -> GroundPlane {
        BasemapBridge::ground_plane(self)
    }
}

/// Cloneable, type-erased bridge handle.
#[derive(Clone)]
pub struct BasemapHandle {
    inner: Arc<dyn GroundPlaneProvider>,
}

impl BasemapHandle {
    pub fn request(&self, bbox: BoundingBox) -> u64 {
        self.inner.request(bbox)
    }

    pub fn cancel(&self) {
        self.inner.cancel()
    }

    pub fn ground_plane(&self) -> GroundPlane {
        self.inner.ground_plane()
    }
}

impl std::fmt::Debug for BasemapHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasemapHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyreplay_env::TokioContext;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    /// Returns a 1-pixel-high raster whose width is the call number; the first
    /// call can be made slow.
    struct CountingSource {
        calls: AtomicU32,
        first_delay: Duration,
    }

    impl CountingSource {
        fn new(first_delay: Duration) -> Self {
            Self {
                calls: AtomicU32::new(0),
                first_delay,
            }
        }
    }

    #[async_trait]
    impl BasemapSource for CountingSource {
        async fn bake(&self, _bbox: BoundingBox, _zoom: u8) -> Result<BasemapRaster, EnvError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == 1 {
                tokio::time::sleep(self.first_delay).await;
            }
            BasemapRaster::new(call, 1, vec![0; call as usize * 4])
        }
    }

    struct FailingSource;

    #[async_trait]
    impl BasemapSource for FailingSource {
        async fn bake(&self, _bbox: BoundingBox, _zoom: u8) -> Result<BasemapRaster, EnvError> {
            Err(EnvError::source("tile server returned 503"))
        }
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(29.5, 33.5, 34.0, 36.0)
    }

    fn config(timeout_ms: u64) -> BasemapConfig {
        BasemapConfig { zoom: 9, timeout_ms }
    }

    async fn settle(handle: &BasemapHandle) -> GroundPlane {
        for _ in 0..200 {
            let plane = handle.ground_plane();
            if !matches!(plane, GroundPlane::Pending) {
                return plane;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handle.ground_plane()
    }

    #[test]
    fn test_raster_size_check() {
        assert!(BasemapRaster::new(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            BasemapRaster::new(2, 2, vec![0; 15]),
            Err(EnvError::DecodeError(_))
        ));
    }

    #[tokio::test]
    async fn test_successful_bake_textures_ground() {
        let ctx = TokioContext::shared();
        let handle = BasemapBridge::new(ctx, CountingSource::new(Duration::ZERO), config(1000)).into_handle();

        handle.request(bbox());
        match settle(&handle).await {
            GroundPlane::Textured { bbox: b, raster } => {
                assert_eq!(b, bbox());
                assert_eq!(raster.width, 1);
            }
            other => panic!("expected texture, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_grid() {
        let ctx = TokioContext::shared();
        let source = CountingSource::new(Duration::from_secs(10));
        let handle = BasemapBridge::new(ctx, source, config(20)).into_handle();

        handle.request(bbox());
        assert!(matches!(settle(&handle).await, GroundPlane::Grid));
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_grid() {
        let ctx = TokioContext::shared();
        let handle = BasemapBridge::new(ctx, FailingSource, config(1000)).into_handle();

        handle.request(bbox());
        assert!(matches!(settle(&handle).await, GroundPlane::Grid));
    }

    #[tokio::test]
    async fn test_superseded_bake_never_lands() {
        let ctx = TokioContext::shared();
        let source = CountingSource::new(Duration::from_millis(100));
        let bridge = BasemapBridge::new(ctx, source, config(1000));

        let first = bridge.request(bbox());
        // let the slow first bake start
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = bridge.request(bbox());
        assert!(second > first);

        // the fast second bake lands, the slow first one must not overwrite it
        tokio::time::sleep(Duration::from_millis(250)).await;
        match bridge.ground_plane() {
            GroundPlane::Textured { raster, .. } => assert_eq!(raster.width, 2),
            other => panic!("expected second bake, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight_bake() {
        let ctx = TokioContext::shared();
        let source = CountingSource::new(Duration::from_millis(50));
        let bridge = BasemapBridge::new(ctx, source, config(1000));

        bridge.request(bbox());
        bridge.cancel();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(matches!(bridge.ground_plane(), GroundPlane::Grid));
        assert_eq!(bridge.generation(), 2);
    }

    struct ReleaseFlag(Arc<AtomicBool>);

    impl Drop for ReleaseFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Never finishes on its own; records when its bake future is dropped.
    #[derive(Default)]
    struct HangingSource {
        started: Arc<AtomicBool>,
        released: Arc<AtomicBool>,
    }

    #[async_trait]
    impl BasemapSource for HangingSource {
        async fn bake(&self, _bbox: BoundingBox, _zoom: u8) -> Result<BasemapRaster, EnvError> {
            let _guard = ReleaseFlag(Arc::clone(&self.released));
            self.started.store(true, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(EnvError::source("hung"))
        }
    }

    #[tokio::test]
    async fn test_cancel_aborts_running_bake() {
        let ctx = TokioContext::shared();
        let source = HangingSource::default();
        let started = Arc::clone(&source.started);
        let released = Arc::clone(&source.released);
        let bridge = BasemapBridge::new(ctx, source, config(120_000));

        bridge.request(bbox());
        for _ in 0..200 {
            if started.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(started.load(Ordering::SeqCst));
        assert!(!released.load(Ordering::SeqCst));

        bridge.cancel();
        for _ in 0..200 {
            if released.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(released.load(Ordering::SeqCst));
        assert!(matches!(bridge.ground_plane(), GroundPlane::Grid));
    }
}
