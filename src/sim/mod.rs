//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Frame length is the only outside input besides player controls
//! - Stable iteration order (grunts, midboss, boss)
//! - No rendering, audio or platform dependencies

pub mod animator;
pub mod collision;
pub mod director;
pub mod hitbox;
pub mod pattern;
pub mod state;
pub mod tick;

pub use animator::{Animator, SourceRect};
pub use collision::{CollisionReport, resolve_collisions};
pub use director::{Director, SceneQueue, SpawnKind, create_boss, create_grunt, create_player};
pub use hitbox::HitBox;
pub use pattern::{
    Aim, BulletPatternDef, BulletPatternInstance, CycleState, EmitContext, Origin, PatternConfig,
    PatternCycle, PatternLibrary, PatternParams, parse_pattern_file,
};
pub use state::{
    Bullet, BulletSkin, Entity, EntityId, EntityKind, Facing, GameState, GameStatus, Phase,
};
pub use tick::{GameEvent, Simulation, TickInput};
