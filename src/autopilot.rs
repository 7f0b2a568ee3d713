//! Scripted player for headless runs and demos
//!
//! Reads the game state and produces a [`TickInput`] each frame. All
//! randomness comes from a seeded PCG so runs are reproducible.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::sim::{GameState, TickInput};

/// Bullets closer than this are dodged
const DANGER_RADIUS: f32 = 60.0;
/// Bullets closer than this trigger a bomb when one is available
const PANIC_RADIUS: f32 = 14.0;
/// Horizontal slack when lining up under a target
const AIM_SLACK: f32 = 8.0;

#[derive(Debug, Clone)]
pub struct Autopilot {
    rng: Pcg32,
    /// Auto-fire is a toggle; press it once
    fire_pressed: bool,
    /// Random sidestep held for a few frames
    wander: Option<(bool, u32)>,
}

impl Autopilot {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            fire_pressed: false,
            wander: None,
        }
    }

    pub fn next_input(&mut self, state: &GameState) -> TickInput {
        let mut input = TickInput::default();
        if !self.fire_pressed {
            self.fire_pressed = true;
            input.shoot = true;
        }

        let me = state.player.pos;
        let threat = state
            .enemies()
            .flat_map(|e| e.bullets.iter())
            .map(|b| b.pos)
            .filter(|p| p.distance(me) < DANGER_RADIUS)
            .min_by(|a, b| a.distance(me).total_cmp(&b.distance(me)));

        if let Some(bullet) = threat {
            let away = me - bullet;
            input.left = away.x < 0.0;
            input.right = away.x >= 0.0;
            input.down = away.y > 0.0;
            input.up = away.y <= 0.0;
            input.bomb = state.bombs > 0 && bullet.distance(me) < PANIC_RADIUS;
            return input;
        }

        if let Some((left, frames)) = self.wander.as_mut() {
            input.left = *left;
            input.right = !*left;
            *frames -= 1;
            if *frames == 0 {
                self.wander = None;
            }
            return input;
        }
        if self.rng.random_bool(0.02) {
            let left = self.rng.random_bool(0.5);
            self.wander = Some((left, self.rng.random_range(5..20)));
        }

        // Line up under the nearest living enemy
        let target = state
            .enemies()
            .filter(|e| !e.is_dead())
            .map(|e| e.pos)
            .min_by(|a, b| a.distance(me).total_cmp(&b.distance(me)));
        if let Some(Vec2 { x, .. }) = target {
            input.left = x < me.x - AIM_SLACK;
            input.right = x > me.x + AIM_SLACK;
        }
        input
    }
}
