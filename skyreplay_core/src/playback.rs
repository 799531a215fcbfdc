//! The Playback Controller: a two-state machine over the primary track index.
//!
//! Pure and synchronous. The driver calls [`PlaybackController::tick`] once
//! per rendered frame with the elapsed wall time; no timers live here.

use crate::config::PlaybackConfig;
use serde::{Deserialize, Serialize};

/// Absorbs float drift when fractional advances sum to a whole step.
const STEP_EPSILON: f64 = 1e-9;

/// Snapshot of the replay cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayState {
    pub primary_track_id: String,
    pub current_index: usize,
    pub is_playing: bool,
    pub speed_multiplier: f64,
}

/// Owns and mutates [`ReplayState`]; nothing else does.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    state: ReplayState,
    len: usize,
    samples_per_second: f64,

    /// Fractional samples accumulated but not yet applied
    progress: f64,
}

impl PlaybackController {
    /// Creates a stopped controller at index 0 for a track of `len` samples.
    pub fn new(primary_track_id: impl Into<String>, len: usize, config: PlaybackConfig) -> Self {
        let speed = if config.initial_speed.is_finite() && config.initial_speed > 0.0 {
            config.initial_speed
        } else {
            1.0
        };
        Self {
            state: ReplayState {
                primary_track_id: primary_track_id.into(),
                current_index: 0,
                is_playing: false,
                speed_multiplier: speed,
            },
            len,
            samples_per_second: config.samples_per_second.max(0.0),
            progress: 0.0,
        }
    }

    pub fn state(&self) -> &ReplayState {
        &self.state
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Scrub-slider range is `[0, last_index]`.
    pub fn last_index(&self) -> usize {
        self.len.saturating_sub(1)
    }

    /// Seeking needs somewhere to go: at least two samples.
    pub fn can_seek(&self) -> bool {
        self.len >= 2
    }

    /// stopped -> playing. At the end of the track, rewinds to the start first.
    pub fn play(&mut self) {
        if !self.can_seek() {
            return;
        }
        if self.state.current_index >= self.last_index() {
            self.state.current_index = 0;
            self.progress = 0.0;
        }
        self.state.is_playing = true;
    }

    /// playing -> stopped, index retained.
    pub fn pause(&mut self) {
        self.state.is_playing = false;
    }

    pub fn toggle(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jumps to `index`, clamped. Landing on the last sample stops playback.
    pub fn seek(&mut self, index: usize) {
        if self.is_empty() {
            return;
        }
        self.state.current_index = index.min(self.last_index());
        self.progress = 0.0;
        if self.state.current_index == self.last_index() {
            self.state.is_playing = false;
        }
    }

    /// Applies on the next tick; non-positive or non-finite speeds are ignored.
    pub fn set_speed(&mut self, multiplier: f64) {
        if multiplier.is_finite() && multiplier > 0.0 {
            self.state.speed_multiplier = multiplier;
        }
    }

    /// Advances by `delta_time_sec * speed * samples_per_second` samples.
    ///
    /// Fractions carry over between ticks, so many short frames add up to the
    /// same index as one long frame. Returns the number of samples advanced.
    pub fn tick(&mut self, delta_time_sec: f64) -> usize {
        if !self.state.is_playing || !(delta_time_sec > 0.0) || !delta_time_sec.is_finite() {
            return 0;
        }

        self.progress += delta_time_sec * self.state.speed_multiplier * self.samples_per_second;
        let whole = (self.progress + STEP_EPSILON).floor();
        if whole < 1.0 {
            return 0;
        }
        self.progress = (self.progress - whole).max(0.0);

        let remaining = self.last_index() - self.state.current_index;
        let step = if whole >= remaining as f64 { remaining } else { whole as usize };
        self.state.current_index += step;

        if self.state.current_index >= self.last_index() {
            self.state.is_playing = false;
            self.progress = 0.0;
        }
        step
    }

    /// Points the controller at a different primary track, stopped at index 0.
    pub fn reset(&mut self, primary_track_id: impl Into<String>, len: usize) {
        self.state.primary_track_id = primary_track_id.into();
        self.state.current_index = 0;
        self.state.is_playing = false;
        self.len = len;
        self.progress = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn controller(len: usize) -> PlaybackController {
        PlaybackController::new("primary", len, PlaybackConfig::default())
    }

    #[test]
    fn test_play_pause() {
        let mut pc = controller(10);
        assert!(!pc.is_playing());
        pc.play();
        assert!(pc.is_playing());
        pc.tick(3.0);
        pc.pause();
        assert!(!pc.is_playing());
        assert_eq!(pc.current_index(), 3);
    }

    #[test]
    fn test_ten_x_for_one_second_single_tick() {
        let mut pc = controller(100);
        pc.seek(0);
        pc.set_speed(10.0);
        pc.play();
        assert_eq!(pc.tick(1.0), 10);
        assert_eq!(pc.current_index(), 10);
    }

    #[test]
    fn test_ten_x_for_one_second_at_sixty_fps() {
        let mut pc = controller(100);
        pc.seek(0);
        pc.set_speed(10.0);
        pc.play();
        for _ in 0..60 {
            pc.tick(1.0 / 60.0);
        }
        assert_eq!(pc.current_index(), 10);
        assert!(pc.is_playing());
    }

    #[test]
    fn test_tick_ignored_when_stopped() {
        let mut pc = controller(100);
        assert_eq!(pc.tick(5.0), 0);
        assert_eq!(pc.current_index(), 0);
    }

    #[test]
    fn test_reaching_end_stops() {
        let mut pc = controller(5);
        pc.play();
        pc.tick(100.0);
        assert_eq!(pc.current_index(), 4);
        assert!(!pc.is_playing());
    }

    #[test]
    fn test_seek_clamps_and_end_stops() {
        let mut pc = controller(20);
        pc.play();
        pc.seek(500);
        assert_eq!(pc.current_index(), 19);
        assert!(!pc.is_playing());

        pc.seek(3);
        assert_eq!(pc.current_index(), 3);
    }

    #[test]
    fn test_play_at_end_rewinds() {
        let mut pc = controller(20);
        pc.seek(19);
        pc.play();
        assert!(pc.is_playing());
        assert_eq!(pc.current_index(), 0);
    }

    #[test]
    fn test_set_speed_applies_next_tick_only() {
        let mut pc = controller(100);
        pc.play();
        pc.tick(2.0);
        pc.set_speed(4.0);
        assert_eq!(pc.current_index(), 2);
        pc.tick(1.0);
        assert_eq!(pc.current_index(), 6);

        pc.set_speed(-1.0);
        pc.set_speed(f64::NAN);
        assert_eq!(pc.state().speed_multiplier, 4.0);
    }

    #[test]
    fn test_seek_discards_fraction() {
        let mut pc = controller(100);
        pc.play();
        pc.tick(0.9);
        pc.seek(10);
        pc.tick(0.2);
        assert_eq!(pc.current_index(), 10);
    }

    #[test]
    fn test_empty_and_single_sample_disable_seeking() {
        let mut empty = controller(0);
        empty.play();
        empty.seek(4);
        assert!(!empty.is_playing());
        assert_eq!(empty.current_index(), 0);
        assert!(!empty.can_seek());

        let mut single = controller(1);
        single.play();
        assert!(!single.is_playing());
        assert!(!single.can_seek());
    }

    proptest! {
        #[test]
        fn prop_seek_to_end_always_stops(len in 1usize..5000, playing in any::<bool>(), start in 0usize..5000) {
            let mut pc = controller(len);
            pc.seek(start);
            if playing { pc.play(); }
            pc.seek(len - 1);
            prop_assert!(!pc.state().is_playing);
            prop_assert_eq!(pc.current_index(), len - 1);
        }

        #[test]
        fn prop_index_stays_in_bounds(
            len in 1usize..200,
            speed in 0.1f64..50.0,
            dts in prop::collection::vec(0.0f64..2.0, 0..100),
        ) {
            let mut pc = controller(len);
            pc.set_speed(speed);
            pc.play();
            for dt in dts {
                pc.tick(dt);
                prop_assert!(pc.current_index() < len);
            }
        }
    }
}
