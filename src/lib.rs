//! Danmaku - simulation core for a vertically-scrolling bullet-hell shooter
//!
//! Core modules:
//! - `sim`: Deterministic per-frame simulation (director, patterns, collisions)
//! - `config`: Already-parsed stage configuration consumed by the director
//! - `assets`: Image lookup seam (the core never owns images)
//! - `settings`: Simulation tuning (playfield, frame clamp, fire rate)
//! - `autopilot`: Seeded scripted input for headless runs

pub mod assets;
pub mod autopilot;
pub mod config;
pub mod error;
pub mod settings;
pub mod sim;

pub use assets::{ImageHandle, ImageLookup, ImageRegistry};
pub use config::StageConfig;
pub use error::{ConfigError, PatternError};
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Nominal simulation rate; delta-time is scaled against this
    pub const NOMINAL_FPS: f32 = 60.0;
    /// Nominal frame duration in seconds
    pub const NOMINAL_DT: f32 = 1.0 / NOMINAL_FPS;

    /// Playfield dimensions
    pub const PLAYFIELD_WIDTH: f32 = 600.0;
    pub const PLAYFIELD_HEIGHT: f32 = 800.0;

    /// Largest frame step accepted after a stall (3 nominal frames)
    pub const MAX_FRAME_DT: f32 = 0.05;

    /// Invulnerability window after a hit, in frames
    pub const INVULNERABILITY_FRAMES: u32 = 60;

    /// Active time of a pattern with no configured duration
    pub const DEFAULT_PATTERN_SECONDS: f32 = 3.0;

    /// Default bullet hitbox radius
    pub const BULLET_HITBOX_RADIUS: f32 = 5.0;
    /// Default player hitbox radius
    pub const PLAYER_HITBOX_RADIUS: f32 = 5.0;

    /// Points per non-finishing hit
    pub const GRUNT_POINTS: u64 = 100;
    pub const MIDBOSS_POINTS: u64 = 1_000;
    pub const BOSS_POINTS: u64 = 10_000;
}

/// Degrees to radians
#[inline]
pub fn deg_to_rad(deg: f32) -> f32 {
    deg.to_radians()
}

/// Radians to degrees
#[inline]
pub fn rad_to_deg(rad: f32) -> f32 {
    rad.to_degrees()
}

/// Decompose a heading in degrees and a speed into a velocity vector.
///
/// Screen coordinates: +y points down, so 90 degrees travels straight down.
#[inline]
pub fn velocity_from_degrees(degrees: f32, speed: f32) -> Vec2 {
    let rad = deg_to_rad(degrees);
    Vec2::new(rad.cos() * speed, rad.sin() * speed)
}

/// Heading in degrees from `from` toward `to`
#[inline]
pub fn aim_degrees(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    rad_to_deg(d.y.atan2(d.x))
}

/// Convert seconds to a whole frame count at the nominal rate (minimum 1)
#[inline]
pub fn seconds_to_frames(seconds: f32, fps: f32) -> u32 {
    ((seconds * fps).round() as u32).max(1)
}
