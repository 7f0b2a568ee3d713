//! Variable-timestep simulation tick
//!
//! One call runs the whole frame pipeline: player input, director, bullet
//! integration, collisions, cleanup, animation and the end-of-game checks.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{CollisionReport, resolve_collisions};
use super::director::Director;
use super::pattern::PatternLibrary;
use super::state::{Bullet, EntityKind, Facing, GameState, GameStatus, Phase};
use crate::assets::ImageLookup;
use crate::config::{PlayerAnimations, StageConfig};
use crate::settings::Settings;
use crate::velocity_from_degrees;

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Toggles auto-fire on press
    pub shoot: bool,
    pub bomb: bool,
}

/// Edge-triggered outcomes reported by [`Simulation::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    GameOver,
    Victory,
}

/// Input state carried between frames
#[derive(Debug, Clone, Copy, Default)]
struct FrameContext {
    prev_input: TickInput,
    shooting: bool,
    fire_cooldown: u32,
}

type StateCallback = Box<dyn FnMut(&GameState)>;

/// The game state plus everything needed to advance it
pub struct Simulation {
    pub state: GameState,
    pub director: Director,
    pub settings: Settings,
    ctx: FrameContext,
    collisions: CollisionReport,
    on_game_over: Option<StateCallback>,
    on_victory: Option<StateCallback>,
}

impl Simulation {
    pub fn new(
        stage: StageConfig,
        patterns: PatternLibrary,
        settings: Settings,
        images: &dyn ImageLookup,
    ) -> Self {
        let state = GameState::new(&stage, patterns, images);
        log::info!(
            "Simulation ready: {} scenes, {} patterns",
            stage.scenes.len(),
            state.patterns.len()
        );
        Self {
            state,
            director: Director::new(stage),
            settings,
            ctx: FrameContext::default(),
            collisions: CollisionReport::default(),
            on_game_over: None,
            on_victory: None,
        }
    }

    /// Invoked once when the player runs out of lives
    pub fn on_game_over(&mut self, callback: impl FnMut(&GameState) + 'static) {
        self.on_game_over = Some(Box::new(callback));
    }

    /// Invoked once when the last scene is cleared
    pub fn on_victory(&mut self, callback: impl FnMut(&GameState) + 'static) {
        self.on_victory = Some(Box::new(callback));
    }

    pub fn is_shooting(&self) -> bool {
        self.ctx.shooting
    }

    /// What the collision pass did on the last tick
    pub fn last_collisions(&self) -> CollisionReport {
        self.collisions
    }

    /// Advance the game by one frame of `dt` seconds.
    ///
    /// Does nothing once the game has ended.
    pub fn tick(&mut self, input: &TickInput, dt: f32, images: &dyn ImageLookup) -> Vec<GameEvent> {
        if !self.state.is_running() {
            return Vec::new();
        }

        let state = &mut self.state;
        state.frame += 1;
        state.dt_scale = self.settings.dt_scale(dt);

        move_player(state, input, &self.settings, &self.director.stage().player.animation, images);
        fire_player(state, input, &mut self.ctx, &self.settings, self.director.stage());
        drop_bomb(state, input, &self.ctx);
        self.ctx.prev_input = *input;

        self.director.update(state, &self.settings, images);

        integrate_bullets(state, &self.settings);
        refresh_hitboxes(state);
        let report = resolve_collisions(state);
        self.collisions = report;
        if report != CollisionReport::default() {
            log::debug!(
                "Frame {}: {} player hits, {} enemy hits, {} points",
                state.frame,
                report.player_hits,
                report.enemy_hits,
                report.points
            );
        }
        // Countdowns already stepped this frame; this only repositions
        refresh_hitboxes(state);
        cleanup(state, &self.director, &self.settings, images);
        animate(state, &self.settings);

        let events = check_end(state);
        for event in &events {
            let callback = match event {
                GameEvent::GameOver => self.on_game_over.as_mut(),
                GameEvent::Victory => self.on_victory.as_mut(),
            };
            if let Some(callback) = callback {
                callback(&self.state);
            }
        }
        events
    }
}

fn move_player(
    state: &mut GameState,
    input: &TickInput,
    settings: &Settings,
    clips: &PlayerAnimations,
    images: &dyn ImageLookup,
) {
    let mut dir = Vec2::ZERO;
    if input.up {
        dir.y -= 1.0;
    }
    if input.down {
        dir.y += 1.0;
    }
    if input.left {
        dir.x -= 1.0;
    }
    if input.right {
        dir.x += 1.0;
    }

    let player = &mut state.player;
    player.pos += dir * player.speed * state.dt_scale;
    player.pos = settings.playfield.clamp_body(player.pos, player.size);

    let facing = if input.up {
        Facing::Up
    } else if input.down {
        Facing::Down
    } else if input.left {
        Facing::Left
    } else if input.right {
        Facing::Right
    } else {
        Facing::Idle
    };
    let clip = match facing {
        Facing::Idle => &clips.idle,
        Facing::Up => &clips.up,
        Facing::Down => &clips.down,
        Facing::Left => &clips.left,
        Facing::Right => &clips.right,
    };
    player.animator.switch_clip(clip, images);
    player.kind = EntityKind::Player { facing };
}

fn fire_player(
    state: &mut GameState,
    input: &TickInput,
    ctx: &mut FrameContext,
    settings: &Settings,
    stage: &StageConfig,
) {
    if input.shoot && !ctx.prev_input.shoot {
        ctx.shooting = !ctx.shooting;
        log::debug!("Auto-fire {}", if ctx.shooting { "on" } else { "off" });
    }

    ctx.fire_cooldown = ctx.fire_cooldown.saturating_sub(1);
    if !ctx.shooting || ctx.fire_cooldown > 0 {
        return;
    }

    let player = &mut state.player;
    let vel = velocity_from_degrees(-90.0, stage.player.bullet.speed);
    let bullet = Bullet::new(player.id, player.pos + settings.muzzle_offset, vel, &player.skin);
    player.bullets.push(bullet);
    ctx.fire_cooldown = settings.fire_interval_frames;
}

fn drop_bomb(state: &mut GameState, input: &TickInput, ctx: &FrameContext) {
    if !input.bomb || ctx.prev_input.bomb || state.bombs == 0 {
        return;
    }
    let cleared: usize = state.enemies_mut().map(|e| e.bullets.drain(..).count()).sum();
    state.bombs -= 1;
    state.player.hitbox.start_invulnerability();
    log::info!("Bomb cleared {cleared} bullets, {} bombs left", state.bombs);
}

/// Move every bullet and drop the ones well outside the playfield
fn integrate_bullets(state: &mut GameState, settings: &Settings) {
    let dt_scale = state.dt_scale;
    let field = settings.playfield;
    let margin = settings.cull_margin;
    let GameState {
        player,
        grunts,
        midboss,
        boss,
        ..
    } = state;

    let owners = std::iter::once(player)
        .chain(grunts.iter_mut())
        .chain(midboss.iter_mut())
        .chain(boss.iter_mut());
    for owner in owners {
        for bullet in &mut owner.bullets {
            bullet.integrate(dt_scale);
        }
        owner
            .bullets
            .retain(|b| field.contains_expanded(b.pos, b.size, margin));
    }
}

fn refresh_hitboxes(state: &mut GameState) {
    let frame = state.frame;
    let GameState {
        player,
        grunts,
        midboss,
        boss,
        ..
    } = state;

    let owners = std::iter::once(player)
        .chain(grunts.iter_mut())
        .chain(midboss.iter_mut())
        .chain(boss.iter_mut());
    for owner in owners {
        owner.refresh_hitbox(frame);
        for bullet in &mut owner.bullets {
            bullet.hitbox.update_hitbox(bullet.pos, frame);
        }
    }
}

/// Remove dead grunts; move depleted bosses to their next phase or remove them
fn cleanup(state: &mut GameState, director: &Director, settings: &Settings, images: &dyn ImageLookup) {
    let GameState {
        grunts,
        midboss,
        boss,
        patterns,
        ..
    } = state;

    grunts.retain(|g| {
        if g.is_dead() {
            log::debug!("Removing grunt {}", g.id);
        }
        !g.is_dead()
    });

    for slot in [midboss, boss] {
        let Some(entity) = slot.as_mut() else {
            continue;
        };
        if entity.is_dead() && !director.advance_boss_phase(entity, settings, images, patterns) {
            log::info!("Entity {} defeated", entity.id);
            *slot = None;
        }
    }
}

fn animate(state: &mut GameState, settings: &Settings) {
    let seconds = state.dt_scale / settings.nominal_fps;
    state.player.animator.advance(seconds);
    for enemy in state.enemies_mut() {
        enemy.animator.advance(seconds);
    }
}

/// Flip the status once and report the transition
fn check_end(state: &mut GameState) -> Vec<GameEvent> {
    if state.lives == 0 {
        state.status = GameStatus::GameOver;
        log::info!("Game over at frame {} with score {}", state.frame, state.score);
        return vec![GameEvent::GameOver];
    }
    if state.phase == Phase::Clear && state.enemies().next().is_none() {
        state.status = GameStatus::Victory;
        log::info!("Victory at frame {} with score {}", state.frame, state.score);
        return vec![GameEvent::Victory];
    }
    Vec::new()
}
