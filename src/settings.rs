//! Simulation settings
//!
//! Tuning that is not part of a stage: playfield bounds, frame clamp and the
//! player's fire cadence. Loaded from JSON; missing fields use defaults.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Playfield rectangle, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Playfield {
    pub width: f32,
    pub height: f32,
}

impl Default for Playfield {
    fn default() -> Self {
        Self {
            width: PLAYFIELD_WIDTH,
            height: PLAYFIELD_HEIGHT,
        }
    }
}

impl Playfield {
    /// Clamp a center position so a body of `size` stays fully inside
    pub fn clamp_body(&self, pos: Vec2, size: Vec2) -> Vec2 {
        let half = size / 2.0;
        Vec2::new(
            pos.x.clamp(half.x, (self.width - half.x).max(half.x)),
            pos.y.clamp(half.y, (self.height - half.y).max(half.y)),
        )
    }

    /// True while a body of `size` overlaps the playfield expanded by `margin`
    /// times its own size on every side
    pub fn contains_expanded(&self, pos: Vec2, size: Vec2, margin: f32) -> bool {
        let pad = size * margin;
        pos.x >= -pad.x
            && pos.x <= self.width + pad.x
            && pos.y >= -pad.y
            && pos.y <= self.height + pad.y
    }
}

/// Simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rate that one unit of velocity per frame is defined against
    pub nominal_fps: f32,
    /// Bounds for player clamping and bullet culling
    pub playfield: Playfield,
    /// Largest accepted frame step in seconds
    pub max_frame_dt: f32,
    /// Frames between player shots while firing
    pub fire_interval_frames: u32,
    /// Player bullet spawn point relative to the player center
    pub muzzle_offset: Vec2,
    /// Bullets are culled once outside the playfield by this many bullet sizes
    pub cull_margin: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            nominal_fps: NOMINAL_FPS,
            playfield: Playfield::default(),
            max_frame_dt: MAX_FRAME_DT,
            fire_interval_frames: 6,
            muzzle_offset: Vec2::new(0.0, -16.0),
            cull_margin: 1.0,
        }
    }
}

impl Settings {
    /// Parse settings from JSON. Out-of-range timing values are replaced by
    /// their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    fn sanitized(mut self) -> Self {
        if !self.nominal_fps.is_finite() || self.nominal_fps <= 0.0 {
            log::warn!("Invalid nominal_fps {}, using {NOMINAL_FPS}", self.nominal_fps);
            self.nominal_fps = NOMINAL_FPS;
        }
        if !self.max_frame_dt.is_finite() || self.max_frame_dt < 0.0 {
            log::warn!("Invalid max_frame_dt {}, using {MAX_FRAME_DT}", self.max_frame_dt);
            self.max_frame_dt = MAX_FRAME_DT;
        }
        self
    }

    /// Load settings from a file, falling back to defaults on any failure
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let result = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|json| Self::from_json(&json));

        match result {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Using default settings: {e}");
                Self::default()
            }
        }
    }

    /// Clamp a raw frame step and express it as a multiple of the nominal frame
    pub fn dt_scale(&self, dt: f32) -> f32 {
        // Fields are public, so the bound may not have gone through `from_json`
        let dt = if dt.is_finite() { dt.max(0.0).min(self.max_frame_dt.max(0.0)) } else { 0.0 };
        dt * self.nominal_fps
    }

    /// Frames in `seconds` at the nominal rate (minimum 1)
    pub fn frames(&self, seconds: f32) -> u32 {
        crate::seconds_to_frames(seconds, self.nominal_fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(r#"{ "fire_interval_frames": 3 }"#).unwrap();
        assert_eq!(settings.fire_interval_frames, 3);
        assert_eq!(settings.playfield, Playfield::default());
        assert_eq!(settings.nominal_fps, NOMINAL_FPS);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(Settings::from_json("{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::load("/nonexistent/danmaku-settings.json");
        assert_eq!(settings.fire_interval_frames, 6);
    }

    #[test]
    fn test_dt_scale_clamps_stalls() {
        let settings = Settings::default();
        assert!((settings.dt_scale(NOMINAL_DT) - 1.0).abs() < 1e-5);
        assert!((settings.dt_scale(2.0) - MAX_FRAME_DT * NOMINAL_FPS).abs() < 1e-4);
        assert_eq!(settings.dt_scale(-1.0), 0.0);
        assert_eq!(settings.dt_scale(f32::NAN), 0.0);
    }

    #[test]
    fn test_out_of_range_timing_falls_back() {
        let settings = Settings::from_json(r#"{ "max_frame_dt": -0.5, "nominal_fps": 0.0 }"#).unwrap();
        assert_eq!(settings.max_frame_dt, MAX_FRAME_DT);
        assert_eq!(settings.nominal_fps, NOMINAL_FPS);

        let settings = Settings::from_json(r#"{ "max_frame_dt": 0.0, "nominal_fps": 30.0 }"#).unwrap();
        assert_eq!(settings.max_frame_dt, 0.0);
        assert_eq!(settings.nominal_fps, 30.0);
    }

    #[test]
    fn test_dt_scale_with_negative_bound_is_zero() {
        let settings = Settings {
            max_frame_dt: -1.0,
            ..Settings::default()
        };
        assert_eq!(settings.dt_scale(NOMINAL_DT), 0.0);
        assert_eq!(settings.dt_scale(-1.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_dt_scale_in_range(dt in proptest::num::f32::ANY, bound in proptest::num::f32::ANY) {
            let settings = Settings {
                max_frame_dt: bound,
                ..Settings::default()
            };
            let scale = settings.dt_scale(dt);
            if bound.is_finite() {
                prop_assert!(scale >= 0.0);
                prop_assert!(scale <= bound.max(0.0) * NOMINAL_FPS);
            }
        }
    }

    #[test]
    fn test_clamp_body() {
        let field = Playfield::default();
        let size = Vec2::new(20.0, 30.0);
        let p = field.clamp_body(Vec2::new(-50.0, 900.0), size);
        assert_eq!(p, Vec2::new(10.0, PLAYFIELD_HEIGHT - 15.0));
    }

    #[test]
    fn test_contains_expanded() {
        let field = Playfield::default();
        let size = Vec2::new(10.0, 10.0);
        assert!(field.contains_expanded(Vec2::new(-9.0, 5.0), size, 1.0));
        assert!(!field.contains_expanded(Vec2::new(-11.0, 5.0), size, 1.0));
        assert!(!field.contains_expanded(Vec2::new(5.0, PLAYFIELD_HEIGHT + 11.0), size, 1.0));
    }
}
