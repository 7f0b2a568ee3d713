//! Image lookup seam
//!
//! The host loads and owns every image before the frame loop starts. The core
//! only asks for opaque handles by sprite id and stores them on entities so a
//! renderer can draw them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Opaque drawable handle issued by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHandle(pub u32);

impl ImageHandle {
    /// Stand-in for a missing image; entities using it are invisible but still collide
    pub const PLACEHOLDER: ImageHandle = ImageHandle(u32::MAX);

    pub fn is_placeholder(&self) -> bool {
        *self == Self::PLACEHOLDER
    }
}

/// Maps a sprite id to a drawable handle
pub trait ImageLookup {
    fn image(&self, sprite: &str) -> Option<ImageHandle>;
}

/// Lookup that knows no images; everything resolves to the placeholder
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImages;

impl ImageLookup for NoImages {
    fn image(&self, _sprite: &str) -> Option<ImageHandle> {
        None
    }
}

/// Simple in-memory registry for hosts that pre-load by name
#[derive(Debug, Clone, Default)]
pub struct ImageRegistry {
    handles: HashMap<String, ImageHandle>,
    next: u32,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sprite id, returning its handle (existing ids keep theirs)
    pub fn register(&mut self, sprite: impl Into<String>) -> ImageHandle {
        let next = &mut self.next;
        *self.handles.entry(sprite.into()).or_insert_with(|| {
            let handle = ImageHandle(*next);
            *next += 1;
            handle
        })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl ImageLookup for ImageRegistry {
    fn image(&self, sprite: &str) -> Option<ImageHandle> {
        self.handles.get(sprite).copied()
    }
}

/// Resolve a sprite, logging and substituting the placeholder when it is missing
pub fn resolve_image(images: &dyn ImageLookup, sprite: &str) -> ImageHandle {
    match images.image(sprite) {
        Some(handle) => handle,
        None => {
            log::warn!("Asset not found: {sprite}");
            ImageHandle::PLACEHOLDER
        }
    }
}
