//! Synthetic basemap source: a checkerboard raster with virtual latency.

use crate::context::SimContext;
use async_trait::async_trait;
use skyreplay_core::{BasemapRaster, BasemapSource, BoundingBox};
use skyreplay_env::{EnvError, ReplayContext};
use std::sync::Arc;
use std::time::Duration;

/// Pixels per degree at zoom 8; doubles per zoom level.
const PIXELS_PER_DEG_Z8: f64 = 64.0;

const MAX_EDGE_PX: u32 = 1024;

pub struct SyntheticBasemap {
    ctx: Arc<SimContext>,
    latency: Duration,
    fail: bool,
}

impl SyntheticBasemap {
    pub fn new(ctx: Arc<SimContext>, latency: Duration) -> Self {
        Self {
            ctx,
            latency,
            fail: false,
        }
    }

    /// Every bake fails with a source error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Raster size for `bbox` at `zoom`, clamped to `[1, MAX_EDGE_PX]`.
    pub fn raster_size(bbox: &BoundingBox, zoom: u8) -> (u32, u32) {
        let ppd = PIXELS_PER_DEG_Z8 * 2f64.powi(i32::from(zoom) - 8);
        let edge = |deg: f64| ((deg * ppd).round() as u32).clamp(1, MAX_EDGE_PX);
        (edge(bbox.width()), edge(bbox.height()))
    }
}

#[async_trait]
impl BasemapSource for SyntheticBasemap {
    async fn bake(&self, bbox: BoundingBox, zoom: u8) -> Result<BasemapRaster, EnvError> {
        self.ctx.sleep(self.latency).await;
        if self.fail {
            return Err(EnvError::source("synthetic tile server unavailable"));
        }

        let (width, height) = Self::raster_size(&bbox, zoom);
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let shade = if (x / 16 + y / 16) % 2 == 0 { 0x2a } else { 0x3b };
                rgba.extend_from_slice(&[shade, shade + 0x10, shade + 0x20, 0xff]);
            }
        }
        BasemapRaster::new(width, height, rgba)
    }
}
