//! Stage configuration
//!
//! The parsed shape of a stage file. The director reads these to build
//! entities; nothing here changes once the frame loop starts.

use std::collections::HashMap;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// One strip of a sprite sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub sprite: String,
    /// Sheet origin of frame 0
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    /// Size of one frame on the sheet
    pub width: f32,
    pub height: f32,
    #[serde(default = "one_frame")]
    pub frames: u32,
    /// Seconds per frame
    #[serde(default = "default_frame_seconds")]
    pub speed: f32,
    #[serde(default = "unit_scale")]
    pub scale: f32,
}

fn one_frame() -> u32 {
    1
}

fn default_frame_seconds() -> f32 {
    0.1
}

fn unit_scale() -> f32 {
    1.0
}

impl AnimationClip {
    /// On-screen size after scaling
    pub fn scaled_size(&self) -> Vec2 {
        Vec2::new(self.width * self.scale, self.height * self.scale)
    }
}

/// Visual and collision setup shared by every bullet an owner fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletConfig {
    pub animation: AnimationClip,
    /// Speed of forward shots (player only; patterns carry their own)
    #[serde(default)]
    pub speed: f32,
    #[serde(default = "bullet_radius")]
    pub hitbox_radius: f32,
}

fn bullet_radius() -> f32 {
    BULLET_HITBOX_RADIUS
}

fn player_radius() -> f32 {
    PLAYER_HITBOX_RADIUS
}

/// Player animation per facing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAnimations {
    pub idle: AnimationClip,
    pub up: AnimationClip,
    pub down: AnimationClip,
    pub left: AnimationClip,
    pub right: AnimationClip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub speed: f32,
    pub x: f32,
    pub y: f32,
    pub initial_lives: u32,
    #[serde(default)]
    pub initial_bombs: u32,
    #[serde(default = "player_radius")]
    pub hitbox_radius: f32,
    pub animation: PlayerAnimations,
    pub bullet: BulletConfig,
}

/// Grunt stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyConfig {
    /// Horizontal patrol speed per nominal frame
    pub speed: f32,
    pub hp: i32,
    pub hitbox_radius: f32,
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Pause between consecutive patterns
    #[serde(default)]
    pub pattern_gap_seconds: f32,
    /// Patrol bounds [min_x, max_x]; defaults to the playfield width
    #[serde(default)]
    pub lane: Option<[f32; 2]>,
    pub animation: AnimationClip,
    pub bullet: BulletConfig,
}

/// One phase of a midboss or boss
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossPhaseConfig {
    pub speed: f32,
    pub hp: i32,
    pub hitbox_radius: f32,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub pattern_gap_seconds: f32,
    #[serde(default)]
    pub spellcard: Option<String>,
    pub animation: AnimationClip,
    pub bullet: BulletConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossConfig {
    pub phases: Vec<BossPhaseConfig>,
}

/// A default configuration plus named variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster<T> {
    pub default: T,
    #[serde(default = "HashMap::new")]
    pub variants: HashMap<String, T>,
}

impl<T> Roster<T> {
    pub fn new(default: T) -> Self {
        Self {
            default,
            variants: HashMap::new(),
        }
    }

    /// Named variant, or the default when unnamed or unknown
    pub fn resolve(&self, variant: Option<&str>) -> &T {
        match variant {
            None => &self.default,
            Some(name) => self.variants.get(name).unwrap_or_else(|| {
                log::warn!("Unknown variant `{name}`, using default");
                &self.default
            }),
        }
    }
}

/// Spawn descriptor inside a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnDescriptor {
    /// `LOSER`, `MIDBOSS` or `BOSS`; anything else is skipped at spawn time
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub variant: Option<String>,
}

/// Enemies spawned together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub spawns: Vec<SpawnDescriptor>,
}

/// A whole stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub background: String,
    pub player: PlayerConfig,
    pub loser: Roster<EnemyConfig>,
    pub midboss: Roster<BossConfig>,
    pub boss: Roster<BossConfig>,
    pub scenes: Vec<SceneConfig>,
    /// Pattern files to load for this stage
    #[serde(default)]
    pub pattern_index: Vec<String>,
}

impl StageConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let stage = Self::from_json(&json)?;
        log::info!(
            "Loaded stage {} ({} scenes, {} pattern files)",
            path.display(),
            stage.scenes.len(),
            stage.pattern_index.len()
        );
        Ok(stage)
    }

    /// Every sprite id the stage references, for hosts that pre-load images
    pub fn sprites(&self) -> Vec<&str> {
        let mut sprites = vec![self.background.as_str()];
        let anims = &self.player.animation;
        for clip in [&anims.idle, &anims.up, &anims.down, &anims.left, &anims.right] {
            sprites.push(&clip.sprite);
        }
        sprites.push(&self.player.bullet.animation.sprite);
        for loser in std::iter::once(&self.loser.default).chain(self.loser.variants.values()) {
            sprites.push(&loser.animation.sprite);
            sprites.push(&loser.bullet.animation.sprite);
        }
        for roster in [&self.midboss, &self.boss] {
            for boss in std::iter::once(&roster.default).chain(roster.variants.values()) {
                for phase in &boss.phases {
                    sprites.push(&phase.animation.sprite);
                    sprites.push(&phase.bullet.animation.sprite);
                }
            }
        }
        sprites.sort_unstable();
        sprites.dedup();
        sprites
    }
}
