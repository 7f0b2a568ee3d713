//! Circular hitbox with a transient invulnerability window

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::INVULNERABILITY_FRAMES;

/// Collision circle mirrored from its owner every frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitBox {
    pub pos: Vec2,
    pub radius: f32,
    invulnerable: bool,
    invulnerable_frames: u32,
    /// Set once this box has been consumed by a collision in the current frame
    resolved: bool,
    /// Frame of the last countdown step; guards against double decay
    last_frame: Option<u64>,
}

impl HitBox {
    pub fn new(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            radius,
            invulnerable: false,
            invulnerable_frames: 0,
            resolved: false,
            last_frame: None,
        }
    }

    /// Circle overlap test that ignores an invulnerable `other`.
    ///
    /// Only the box being tested against is checked for invulnerability, so a
    /// bullet simply misses an invulnerable player.
    pub fn intersects(&self, other: &HitBox) -> bool {
        if other.invulnerable {
            return false;
        }
        self.pos.distance(other.pos) < self.radius + other.radius
    }

    /// Arm the invulnerability window. No effect while already invulnerable.
    pub fn start_invulnerability(&mut self) {
        if !self.invulnerable {
            self.invulnerable = true;
            self.invulnerable_frames = INVULNERABILITY_FRAMES;
        }
    }

    /// Move to `pos` and step the countdown once for `frame`.
    ///
    /// Further calls within the same frame only reposition.
    pub fn update_hitbox(&mut self, pos: Vec2, frame: u64) {
        self.pos = pos;
        if self.last_frame == Some(frame) {
            return;
        }
        self.last_frame = Some(frame);
        self.resolved = false;

        if self.invulnerable_frames > 0 {
            self.invulnerable_frames -= 1;
            if self.invulnerable_frames == 0 {
                self.invulnerable = false;
            }
        }
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable
    }

    /// Frames of invulnerability left
    pub fn invulnerable_frames(&self) -> u32 {
        self.invulnerable_frames
    }

    pub fn mark_resolved(&mut self) {
        self.resolved = true;
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}
