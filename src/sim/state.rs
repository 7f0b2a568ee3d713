//! Game state and core simulation types
//!
//! The single mutable root every pipeline stage reads and writes in turn.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::animator::Animator;
use super::hitbox::HitBox;
use super::pattern::{PatternCycle, PatternLibrary};
use crate::assets::{ImageHandle, ImageLookup, resolve_image};
use crate::config::{BulletConfig, StageConfig};
use crate::consts::*;

/// Arena-wide entity identifier; bullets refer to their owner by id
pub type EntityId = u32;

/// Stage progress label shown on the HUD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Losers,
    MidBoss,
    Boss,
    /// Every scene has been cleared
    Clear,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Losers => "LOSERS",
            Phase::MidBoss => "MIDBOSS",
            Phase::Boss => "BOSS",
            Phase::Clear => "CLEAR",
        }
    }
}

/// Whether the frame loop is still running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Running,
    GameOver,
    Victory,
}

/// Player animation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Idle,
    Up,
    Down,
    Left,
    Right,
}

/// Resolved bullet look and collision size for one owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletSkin {
    pub sprite: String,
    pub size: Vec2,
    pub hitbox_radius: f32,
    pub image: ImageHandle,
}

impl BulletSkin {
    pub fn from_config(config: &BulletConfig, images: &dyn ImageLookup) -> Self {
        Self {
            sprite: config.animation.sprite.clone(),
            size: config.animation.scaled_size(),
            hitbox_radius: config.hitbox_radius,
            image: resolve_image(images, &config.animation.sprite),
        }
    }

    /// Same geometry, different sprite
    pub fn with_sprite(&self, sprite: &str, image: ImageHandle) -> Self {
        Self {
            sprite: sprite.to_string(),
            image,
            ..self.clone()
        }
    }
}

/// A bullet in flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    /// Firing entity (attribution only)
    pub owner: EntityId,
    pub pos: Vec2,
    /// Displacement per nominal frame
    pub vel: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub hitbox: HitBox,
    pub skin: String,
    pub image: ImageHandle,
}

impl Bullet {
    pub fn new(owner: EntityId, pos: Vec2, vel: Vec2, skin: &BulletSkin) -> Self {
        Self {
            owner,
            pos,
            vel,
            size: skin.size,
            speed: vel.length(),
            hitbox: HitBox::new(pos, skin.hitbox_radius),
            skin: skin.sprite.clone(),
            image: skin.image,
        }
    }

    /// Move by velocity scaled to this frame's length
    pub fn integrate(&mut self, dt_scale: f32) {
        self.pos += self.vel * dt_scale;
    }
}

/// Kind-specific entity data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Player {
        facing: Facing,
    },
    Grunt {
        /// Patrol bounds [min_x, max_x]
        lane: [f32; 2],
        /// Signed horizontal speed per nominal frame
        vx: f32,
    },
    MidBoss {
        phase: usize,
    },
    Boss {
        phase: usize,
        spellcard: Option<String>,
        spellcard_on: bool,
    },
}

/// Anything that moves, collides and owns bullets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Center position
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub hitbox: HitBox,
    pub bullets: Vec<Bullet>,
    pub skin: BulletSkin,
    pub animator: Animator,
    pub cycle: Option<PatternCycle>,
}

impl Entity {
    pub fn is_dead(&self) -> bool {
        self.hp <= 0
    }

    /// Points for a hit that leaves this entity alive
    pub fn points(&self) -> u64 {
        match self.kind {
            EntityKind::Player { .. } => 0,
            EntityKind::Grunt { .. } => GRUNT_POINTS,
            EntityKind::MidBoss { .. } => MIDBOSS_POINTS,
            EntityKind::Boss { .. } => BOSS_POINTS,
        }
    }

    /// Fraction of health left, for health bars
    pub fn health_ratio(&self) -> f32 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        (self.hp as f32 / self.max_hp as f32).clamp(0.0, 1.0)
    }

    pub fn refresh_hitbox(&mut self, frame: u64) {
        self.hitbox.update_hitbox(self.pos, frame);
    }
}

/// Complete simulation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub phase: Phase,
    pub status: GameStatus,
    pub player: Entity,
    pub grunts: Vec<Entity>,
    pub midboss: Option<Entity>,
    pub boss: Option<Entity>,
    pub score: u64,
    pub lives: u32,
    pub bombs: u32,
    /// Lives lost so far
    pub deaths: u32,
    /// Simulation frame counter
    pub frame: u64,
    /// This frame's length relative to a nominal frame
    pub dt_scale: f32,
    /// Background sprite for the renderer
    pub background: String,
    /// Pattern definitions for this stage
    #[serde(skip)]
    pub patterns: PatternLibrary,
    next_id: EntityId,
}

impl GameState {
    /// Fresh state for a stage, with the player placed and nothing spawned
    pub fn new(stage: &StageConfig, patterns: PatternLibrary, images: &dyn ImageLookup) -> Self {
        let mut state = Self {
            phase: Phase::Losers,
            status: GameStatus::Running,
            // Replaced below once an id is allocated
            player: super::director::create_player(0, stage, images),
            grunts: Vec::new(),
            midboss: None,
            boss: None,
            score: 0,
            lives: stage.player.initial_lives,
            bombs: stage.player.initial_bombs,
            deaths: 0,
            frame: 0,
            dt_scale: 1.0,
            background: stage.background.clone(),
            patterns,
            next_id: 1,
        };
        state.player.id = state.next_entity_id();
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Grunts, then midboss, then boss
    pub fn enemies(&self) -> impl Iterator<Item = &Entity> {
        self.grunts
            .iter()
            .chain(self.midboss.iter())
            .chain(self.boss.iter())
    }

    pub fn enemies_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.grunts
            .iter_mut()
            .chain(self.midboss.iter_mut())
            .chain(self.boss.iter_mut())
    }

    /// Look up any live entity by id
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        if self.player.id == id {
            return Some(&self.player);
        }
        self.enemies().find(|e| e.id == id)
    }

    /// Total enemy bullets in flight
    pub fn enemy_bullet_count(&self) -> usize {
        self.enemies().map(|e| e.bullets.len()).sum()
    }

    pub fn is_running(&self) -> bool {
        self.status == GameStatus::Running
    }
}
