//! Sprite-sheet frame timing
//!
//! Drawing is the renderer's job; this only tracks which frame of a clip is
//! current.

use serde::{Deserialize, Serialize};

use crate::assets::{ImageHandle, ImageLookup, resolve_image};
use crate::config::AnimationClip;

/// Source rectangle of the current frame on the sheet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animator {
    pub clip: AnimationClip,
    pub image: ImageHandle,
    elapsed: f32,
}

impl Animator {
    pub fn new(clip: AnimationClip, image: ImageHandle) -> Self {
        Self {
            clip,
            image,
            elapsed: 0.0,
        }
    }

    fn total_time(&self) -> f32 {
        self.clip.frames as f32 * self.clip.speed
    }

    /// Advance by `dt` seconds, wrapping at the end of the clip
    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
        let total = self.total_time();
        if total > 0.0 && self.elapsed >= total {
            self.elapsed %= total;
        }
    }

    pub fn current_frame(&self) -> u32 {
        if self.clip.speed <= 0.0 {
            return 0;
        }
        (self.elapsed / self.clip.speed).floor() as u32
    }

    pub fn is_done(&self) -> bool {
        self.current_frame() >= self.clip.frames
    }

    /// Horizontal strip layout: frame N sits N widths right of the origin
    pub fn source_rect(&self) -> SourceRect {
        let frame = self.current_frame().min(self.clip.frames.saturating_sub(1));
        SourceRect {
            x: self.clip.x + frame as f32 * self.clip.width,
            y: self.clip.y,
            width: self.clip.width,
            height: self.clip.height,
        }
    }

    /// Switch to another clip, restarting its timing. Same clip keeps running
    /// and its image is not looked up again.
    pub fn switch_clip(&mut self, clip: &AnimationClip, images: &dyn ImageLookup) {
        if self.clip == *clip {
            return;
        }
        self.image = resolve_image(images, &clip.sprite);
        self.clip = clip.clone();
        self.elapsed = 0.0;
    }
}
