//! Bullet patterns
//!
//! A [`BulletPatternDef`] is an immutable, shared description loaded once per
//! stage. Activating it for an owner creates a [`BulletPatternInstance`] that
//! carries the running counters and drifting offsets. [`PatternCycle`] rotates
//! an entity through its assigned pattern names.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{Bullet, BulletSkin, EntityId};
use crate::assets::{ImageLookup, resolve_image};
use crate::consts::DEFAULT_PATTERN_SECONDS;
use crate::error::PatternError;
use crate::{aim_degrees, seconds_to_frames, velocity_from_degrees};

/// Raw numeric value meaning "use the owner / aim at the player"
pub const SENTINEL: f32 = -1.0;

/// Pattern parameters as written in pattern files or tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternParams {
    pub origin_x: f32,
    pub origin_y: f32,
    pub frequency: f32,
    pub burst_count: f32,
    pub burst_size: f32,
    pub burst_size_change: f32,
    pub direction: f32,
    pub direction_change: f32,
    pub spawn_direction: f32,
    pub spawn_direction_change: f32,
    pub velocity: f32,
    pub velocity_change: f32,
    #[serde(default)]
    pub duration_seconds: Option<f32>,
    #[serde(default)]
    pub blink_seconds: Option<f32>,
    #[serde(default)]
    pub bullet_type: Option<String>,
}

/// Emission origin; `None` on an axis follows the owner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    pub x: Option<f32>,
    pub y: Option<f32>,
}

impl Origin {
    pub fn resolve(&self, owner: Vec2) -> Vec2 {
        Vec2::new(self.x.unwrap_or(owner.x), self.y.unwrap_or(owner.y))
    }
}

/// Base direction of a burst
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Aim {
    /// Toward the player's position at the moment of firing
    AtPlayer,
    /// Fixed heading in degrees
    Degrees(f32),
}

/// Validated pattern configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    pub origin: Origin,
    /// Frames between bursts
    pub frequency: f32,
    /// Total bursts; 0 = unlimited
    pub burst_count: u32,
    pub burst_size: f32,
    pub burst_size_change: f32,
    pub aim: Aim,
    pub direction_change: f32,
    /// Degrees between consecutive bullets in a burst
    pub spawn_step: f32,
    pub spawn_step_change: f32,
    pub velocity: f32,
    pub velocity_change: f32,
    pub duration_seconds: Option<f32>,
    pub blink_seconds: Option<f32>,
    /// Bullet sprite override; `None` uses the owner's skin
    pub bullet_type: Option<String>,
}

fn finite(field: &'static str, value: f32) -> Result<f32, PatternError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PatternError::NonFinite { field })
    }
}

fn positive_seconds(field: &'static str, value: Option<f32>) -> Result<Option<f32>, PatternError> {
    match value {
        Some(v) => Ok(Some(finite(field, v)?).filter(|v| *v > 0.0)),
        None => Ok(None),
    }
}

fn axis(value: f32) -> Option<f32> {
    (value != SENTINEL).then_some(value)
}

impl TryFrom<PatternParams> for PatternConfig {
    type Error = PatternError;

    fn try_from(p: PatternParams) -> Result<Self, Self::Error> {
        let burst_count = finite("burst_count", p.burst_count)?;
        if burst_count < 0.0 {
            return Err(PatternError::NegativeBurstCount(burst_count));
        }
        let direction = finite("direction", p.direction)?;

        Ok(Self {
            origin: Origin {
                x: axis(finite("origin_x", p.origin_x)?),
                y: axis(finite("origin_y", p.origin_y)?),
            },
            frequency: finite("frequency", p.frequency)?,
            burst_count: burst_count as u32,
            burst_size: finite("burst_size", p.burst_size)?,
            burst_size_change: finite("burst_size_change", p.burst_size_change)?,
            aim: if direction == SENTINEL {
                Aim::AtPlayer
            } else {
                Aim::Degrees(direction)
            },
            direction_change: finite("direction_change", p.direction_change)?,
            spawn_step: finite("spawn_direction", p.spawn_direction)?,
            spawn_step_change: finite("spawn_direction_change", p.spawn_direction_change)?,
            velocity: finite("velocity", p.velocity)?,
            velocity_change: finite("velocity_change", p.velocity_change)?,
            duration_seconds: positive_seconds("duration_seconds", p.duration_seconds)?,
            blink_seconds: positive_seconds("blink_seconds", p.blink_seconds)?,
            bullet_type: p.bullet_type.filter(|t| !t.is_empty() && t != "-1"),
        })
    }
}

/// Named, immutable pattern shared by every instance created from it
#[derive(Debug, Clone)]
pub struct BulletPatternDef {
    pub name: String,
    config: Arc<PatternConfig>,
}

impl BulletPatternDef {
    pub fn new(name: impl Into<String>, config: PatternConfig) -> Self {
        Self {
            name: name.into(),
            config: Arc::new(config),
        }
    }

    pub fn from_params(name: impl Into<String>, params: PatternParams) -> Result<Self, PatternError> {
        Ok(Self::new(name, PatternConfig::try_from(params)?))
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// Fresh instance with zeroed counters; `fps` converts second-based timers
    pub fn create_instance(&self, fps: f32) -> BulletPatternInstance {
        BulletPatternInstance::new(Arc::clone(&self.config), fps)
    }
}

/// Per-frame inputs for a pattern emission
pub struct EmitContext<'a> {
    pub owner: EntityId,
    pub owner_pos: Vec2,
    pub player_pos: Vec2,
    pub skin: &'a BulletSkin,
    pub images: &'a dyn ImageLookup,
}

/// Running state of one activated pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletPatternInstance {
    config: Arc<PatternConfig>,
    frame_counter: u32,
    bursts_fired: u32,
    direction_offset: f32,
    spawn_step_offset: f32,
    velocity_offset: f32,
    burst_size: f32,
    duration_frames: Option<u32>,
    blink_frames: Option<u32>,
    /// Owner skin with the bullet-type override applied, built on first emission
    #[serde(default)]
    override_skin: Option<BulletSkin>,
}

impl BulletPatternInstance {
    fn new(config: Arc<PatternConfig>, fps: f32) -> Self {
        let duration_frames = config.duration_seconds.map(|s| seconds_to_frames(s, fps));
        let blink_frames = config.blink_seconds.map(|s| seconds_to_frames(s, fps));
        Self {
            burst_size: config.burst_size,
            config,
            frame_counter: 0,
            bursts_fired: 0,
            direction_offset: 0.0,
            spawn_step_offset: 0.0,
            velocity_offset: 0.0,
            duration_frames,
            blink_frames,
            override_skin: None,
        }
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    pub fn bursts_fired(&self) -> u32 {
        self.bursts_fired
    }

    pub fn duration_frames(&self) -> Option<u32> {
        self.duration_frames
    }

    /// Burst size the next emission will use
    pub fn next_burst_size(&self) -> usize {
        (self.burst_size.round() as i64).max(1) as usize
    }

    /// True once the configured duration has run out
    pub fn is_expired(&self) -> bool {
        self.duration_frames.is_some_and(|d| self.frame_counter > d)
    }

    /// Advance one frame, returning any bullets emitted on it
    pub fn update(&mut self, ctx: &EmitContext<'_>) -> Vec<Bullet> {
        self.frame_counter += 1;
        if self.is_expired() {
            return Vec::new();
        }
        if let Some(blink) = self.blink_frames {
            if (self.frame_counter / blink) % 2 == 1 {
                return Vec::new();
            }
        }
        let cfg = &self.config;
        if cfg.burst_count > 0 && self.bursts_fired >= cfg.burst_count {
            return Vec::new();
        }
        let frequency = (cfg.frequency.floor() as i64).max(1) as u32;
        if self.frame_counter % frequency != 0 {
            return Vec::new();
        }

        let origin = cfg.origin.resolve(ctx.owner_pos);
        let base_aim = match cfg.aim {
            Aim::AtPlayer => aim_degrees(origin, ctx.player_pos),
            Aim::Degrees(deg) => deg,
        };

        let burst_size = self.next_burst_size();
        let direction = base_aim + self.direction_offset;
        let spawn_step = cfg.spawn_step + self.spawn_step_offset;
        let velocity = cfg.velocity + self.velocity_offset;

        let skin = match &cfg.bullet_type {
            Some(sprite) => &*self
                .override_skin
                .get_or_insert_with(|| ctx.skin.with_sprite(sprite, resolve_image(ctx.images, sprite))),
            None => ctx.skin,
        };

        let bullets = (0..burst_size)
            .map(|i| {
                let vel = velocity_from_degrees(direction + i as f32 * spawn_step, velocity);
                Bullet::new(ctx.owner, origin, vel, skin)
            })
            .collect();

        self.bursts_fired += 1;
        self.direction_offset += cfg.direction_change;
        self.spawn_step_offset += cfg.spawn_step_change;
        self.velocity_offset += cfg.velocity_change;
        self.burst_size += cfg.burst_size_change;

        bullets
    }
}

/// Where a [`PatternCycle`] is on a given frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Running,
    Gap,
    Ready,
}

/// Round-robin scheduler over an entity's pattern names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCycle {
    names: Vec<String>,
    gap_frames: u32,
    index: usize,
    active: Option<BulletPatternInstance>,
    /// Last frame the active instance runs on
    active_until: u64,
    /// First frame after the gap
    gap_until: u64,
}

impl PatternCycle {
    pub fn new(names: Vec<String>, gap_frames: u32) -> Self {
        Self {
            names,
            gap_frames,
            index: 0,
            active: None,
            active_until: 0,
            gap_until: 0,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn active(&self) -> Option<&BulletPatternInstance> {
        self.active.as_ref()
    }

    pub fn state(&self, frame: u64) -> CycleState {
        match self.active {
            Some(_) if frame <= self.active_until => CycleState::Running,
            Some(_) => CycleState::Gap,
            None if frame < self.gap_until => CycleState::Gap,
            None => CycleState::Ready,
        }
    }

    /// Run the schedule for `frame`: retire, start the next pattern, emit
    pub fn step(
        &mut self,
        frame: u64,
        library: &PatternLibrary,
        fps: f32,
        ctx: &EmitContext<'_>,
    ) -> Vec<Bullet> {
        if self.active.is_some() && frame > self.active_until {
            self.active = None;
            self.gap_until = frame + self.gap_frames as u64;
        }
        if self.active.is_none() && frame >= self.gap_until {
            self.start_next(frame, library, fps);
        }
        match self.active.as_mut() {
            Some(instance) => instance.update(ctx),
            None => Vec::new(),
        }
    }

    fn start_next(&mut self, frame: u64, library: &PatternLibrary, fps: f32) {
        if self.names.is_empty() {
            return;
        }
        let name = &self.names[self.index % self.names.len()];
        self.index = (self.index + 1) % self.names.len();

        // Unknown names leave the cycle idle; the next name is tried next frame
        if let Some(def) = library.get(name) {
            let instance = def.create_instance(fps);
            let frames = instance
                .duration_frames()
                .unwrap_or_else(|| seconds_to_frames(DEFAULT_PATTERN_SECONDS, fps));
            self.active_until = frame + frames as u64 - 1;
            self.active = Some(instance);
        }
    }
}

/// Pattern definitions keyed by name
#[derive(Debug, Clone, Default)]
pub struct PatternLibrary {
    defs: HashMap<String, BulletPatternDef>,
}

impl PatternLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, def: BulletPatternDef) {
        self.defs.insert(def.name.clone(), def);
    }

    pub fn get(&self, name: &str) -> Option<&BulletPatternDef> {
        self.defs.get(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Bullet sprite overrides named by any pattern, sorted and deduplicated
    pub fn sprites(&self) -> Vec<&str> {
        let mut sprites: Vec<&str> = self
            .defs
            .values()
            .filter_map(|def| def.config().bullet_type.as_deref())
            .collect();
        sprites.sort_unstable();
        sprites.dedup();
        sprites
    }

    /// Warn about names that will never resolve
    pub fn check_names(&self, names: &[String]) {
        for name in names {
            if !self.defs.contains_key(name) {
                log::warn!("Pattern not found: {name}");
            }
        }
    }

    /// Build from a parsed table, skipping malformed entries
    pub fn from_params(table: HashMap<String, PatternParams>) -> Self {
        let mut library = Self::new();
        for (name, params) in table {
            match BulletPatternDef::from_params(name.clone(), params) {
                Ok(def) => library.insert(def),
                Err(e) => log::warn!("Skipping pattern `{name}`: {e}"),
            }
        }
        library
    }

    /// Parse one pattern file and add its definitions
    pub fn load_file(&mut self, file_name: &str, text: &str) -> usize {
        let defs = parse_pattern_file(file_name, text);
        let count = defs.len();
        for def in defs {
            self.insert(def);
        }
        count
    }

    /// Load every file of a stage's pattern index from `dir`
    pub fn load_index(dir: impl AsRef<Path>, files: &[String]) -> Self {
        let dir = dir.as_ref();
        let mut library = Self::new();
        for file in files {
            let path = dir.join(file);
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    let count = library.load_file(file, &text);
                    log::info!("Loaded {count} patterns from {}", path.display());
                }
                Err(e) => log::error!("Failed to load patterns from {}: {e}", path.display()),
            }
        }
        library
    }
}

fn number_token(token: &str) -> Option<f32> {
    token.parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Parse a whitespace-separated pattern file, one pattern per line.
///
/// Columns: originX originY frequency burstCount burstSize burstSizeChange
/// direction directionChange spawnDirection spawnDirectionChange velocity
/// velocityChange [durationSeconds] [blinkSeconds] [bulletType]
pub fn parse_pattern_file(file_name: &str, text: &str) -> Vec<BulletPatternDef> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    let mut parsed = Vec::new();
    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 12 {
            log::warn!("{file_name}:{}: expected 12 numbers, found {}", line_no + 1, tokens.len());
            continue;
        }
        let numbers: Option<Vec<f32>> = tokens[..12].iter().map(|t| number_token(t)).collect();
        let Some(n) = numbers else {
            log::warn!("{file_name}:{}: non-numeric pattern parameter", line_no + 1);
            continue;
        };

        let mut rest = tokens[12..].iter().peekable();
        let duration_seconds = rest.next_if(|t| number_token(t).is_some()).and_then(|t| number_token(t));
        let blink_seconds = rest.next_if(|t| number_token(t).is_some()).and_then(|t| number_token(t));
        let bullet_type = rest.next().map(|t| t.to_string());

        let params = PatternParams {
            origin_x: n[0],
            origin_y: n[1],
            frequency: n[2],
            burst_count: n[3],
            burst_size: n[4],
            burst_size_change: n[5],
            direction: n[6],
            direction_change: n[7],
            spawn_direction: n[8],
            spawn_direction_change: n[9],
            velocity: n[10],
            velocity_change: n[11],
            duration_seconds,
            blink_seconds,
            bullet_type,
        };
        match PatternConfig::try_from(params) {
            Ok(config) => parsed.push(config),
            Err(e) => log::warn!("{file_name}:{}: {e}", line_no + 1),
        }
    }

    let single = parsed.len() == 1;
    parsed
        .into_iter()
        .enumerate()
        .map(|(i, config)| {
            let name = if single {
                stem.to_string()
            } else {
                format!("{stem}_{}", i + 1)
            };
            BulletPatternDef::new(name, config)
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::assets::{ImageHandle, NoImages};
    use proptest::prelude::*;

    const FPS: f32 = 60.0;

    fn skin() -> BulletSkin {
        BulletSkin {
            sprite: "bullet.png".to_string(),
            size: Vec2::new(8.0, 8.0),
            hitbox_radius: 5.0,
            image: ImageHandle(3),
        }
    }

    fn run(instance: &mut BulletPatternInstance, frames: u32) -> Vec<usize> {
        let skin = skin();
        let ctx = EmitContext {
            owner: 1,
            owner_pos: Vec2::new(100.0, 100.0),
            player_pos: Vec2::new(100.0, 500.0),
            skin: &skin,
            images: &NoImages,
        };
        (0..frames).map(|_| instance.update(&ctx).len()).collect()
    }

    #[test]
    fn test_fires_every_frequency_frames() {
        let mut inst = def("p", params(3.0, 0.0, 1.0, 90.0, 2.0)).create_instance(FPS);
        assert_eq!(run(&mut inst, 6), vec![0, 0, 1, 0, 0, 1]);
    }

    #[test]
    fn test_burst_count_exhausts() {
        let mut inst = def("p", params(1.0, 2.0, 1.0, 90.0, 2.0)).create_instance(FPS);
        assert_eq!(run(&mut inst, 4), vec![1, 1, 0, 0]);
        assert_eq!(inst.bursts_fired(), 2);
    }

    #[test]
    fn test_fan_and_velocity() {
        let mut p = params(1.0, 0.0, 3.0, 90.0, 2.0);
        p.spawn_direction = 90.0;
        let mut inst = def("fan", p).create_instance(FPS);
        let skin = skin();
        let ctx = EmitContext {
            owner: 7,
            owner_pos: Vec2::new(100.0, 100.0),
            player_pos: Vec2::ZERO,
            skin: &skin,
            images: &NoImages,
        };
        let bullets = inst.update(&ctx);
        assert_eq!(bullets.len(), 3);
        // 90, 180, 270 degrees
        assert!((bullets[0].vel - Vec2::new(0.0, 2.0)).length() < 1e-4);
        assert!((bullets[1].vel - Vec2::new(-2.0, 0.0)).length() < 1e-4);
        assert!((bullets[2].vel - Vec2::new(0.0, -2.0)).length() < 1e-4);
        assert!(bullets.iter().all(|b| b.owner == 7 && b.pos == Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn test_offsets_accumulate() {
        let mut p = params(1.0, 0.0, 1.0, 0.0, 1.0);
        p.direction_change = 90.0;
        p.velocity_change = 1.0;
        let mut inst = def("spiral", p).create_instance(FPS);
        let skin = skin();
        let ctx = EmitContext {
            owner: 1,
            owner_pos: Vec2::ZERO,
            player_pos: Vec2::ZERO,
            skin: &skin,
            images: &NoImages,
        };
        let first = inst.update(&ctx);
        let second = inst.update(&ctx);
        assert!((first[0].vel - Vec2::new(1.0, 0.0)).length() < 1e-4);
        assert!((second[0].vel - Vec2::new(0.0, 2.0)).length() < 1e-4);
    }

    #[test]
    fn test_aim_at_player() {
        let mut inst = def("aim", params(1.0, 0.0, 1.0, SENTINEL, 3.0)).create_instance(FPS);
        let skin = skin();
        let ctx = EmitContext {
            owner: 1,
            owner_pos: Vec2::new(0.0, 0.0),
            player_pos: Vec2::new(10.0, 0.0),
            skin: &skin,
            images: &NoImages,
        };
        let bullets = inst.update(&ctx);
        assert!((bullets[0].vel - Vec2::new(3.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_fixed_origin_axis() {
        let mut p = params(1.0, 0.0, 1.0, 90.0, 1.0);
        p.origin_x = 42.0;
        let mut inst = def("o", p).create_instance(FPS);
        let skin = skin();
        let ctx = EmitContext {
            owner: 1,
            owner_pos: Vec2::new(100.0, 200.0),
            player_pos: Vec2::ZERO,
            skin: &skin,
            images: &NoImages,
        };
        assert_eq!(inst.update(&ctx)[0].pos, Vec2::new(42.0, 200.0));
    }

    #[test]
    fn test_bullet_type_override() {
        let mut p = params(1.0, 0.0, 1.0, 90.0, 1.0);
        p.bullet_type = Some("star.png".to_string());
        let mut inst = def("s", p).create_instance(FPS);
        let skin = skin();
        let ctx = EmitContext {
            owner: 1,
            owner_pos: Vec2::ZERO,
            player_pos: Vec2::ZERO,
            skin: &skin,
            images: &NoImages,
        };
        let bullets = inst.update(&ctx);
        assert_eq!(bullets[0].skin, "star.png");
        assert!(bullets[0].image.is_placeholder());

        let mut p = params(1.0, 0.0, 1.0, 90.0, 1.0);
        p.bullet_type = Some("-1".to_string());
        let mut inst = def("d", p).create_instance(FPS);
        assert_eq!(inst.update(&ctx)[0].skin, "bullet.png");
    }

    #[derive(Default)]
    struct CountingImages(std::cell::Cell<u32>);

    impl ImageLookup for CountingImages {
        fn image(&self, _sprite: &str) -> Option<ImageHandle> {
            self.0.set(self.0.get() + 1);
            None
        }
    }

    #[test]
    fn test_override_image_resolved_once_per_instance() {
        let mut p = params(1.0, 0.0, 3.0, 90.0, 1.0);
        p.bullet_type = Some("missing.png".to_string());
        let mut inst = def("m", p).create_instance(FPS);
        let skin = skin();
        let images = CountingImages::default();
        let ctx = EmitContext {
            owner: 1,
            owner_pos: Vec2::ZERO,
            player_pos: Vec2::ZERO,
            skin: &skin,
            images: &images,
        };
        let mut fired = 0;
        for _ in 0..50 {
            for bullet in inst.update(&ctx) {
                assert_eq!(bullet.skin, "missing.png");
                assert!(bullet.image.is_placeholder());
                fired += 1;
            }
        }
        assert_eq!(fired, 150);
        assert_eq!(images.0.get(), 1);
    }

    #[test]
    fn test_library_sprites() {
        let mut library = PatternLibrary::new();
        let entries = [
            ("a", Some("spark.png")),
            ("b", None),
            ("c", Some("ring.png")),
            ("d", Some("spark.png")),
        ];
        for (name, sprite) in entries {
            let mut p = params(1.0, 0.0, 1.0, 90.0, 1.0);
            p.bullet_type = sprite.map(str::to_string);
            library.insert(def(name, p));
        }
        assert_eq!(library.sprites(), vec!["ring.png", "spark.png"]);
        assert!(PatternLibrary::new().sprites().is_empty());
    }

    #[test]
    fn test_malformed_params_rejected() {
        let mut p = params(1.0, 0.0, 1.0, 90.0, 1.0);
        p.velocity = f32::NAN;
        assert_eq!(
            PatternConfig::try_from(p).unwrap_err(),
            PatternError::NonFinite { field: "velocity" }
        );
        let p = params(1.0, -2.0, 1.0, 90.0, 1.0);
        assert_eq!(PatternConfig::try_from(p).unwrap_err(), PatternError::NegativeBurstCount(-2.0));
    }

    #[test]
    fn test_library_skips_malformed() {
        let mut table = HashMap::new();
        table.insert("ok".to_string(), params(1.0, 0.0, 1.0, 90.0, 1.0));
        table.insert("bad".to_string(), params(f32::INFINITY, 0.0, 1.0, 90.0, 1.0));
        let library = PatternLibrary::from_params(table);
        assert_eq!(library.len(), 1);
        assert!(library.get("ok").is_some());
        assert!(library.get("bad").is_none());
    }

    #[test]
    fn test_parse_pattern_file() {
        let text = "\
# ring patterns
-1 -1 10 0 12 0 0 5 30 0 2 0
// aimed, 4 seconds, blinking
-1 -1 5 0 1 0 -1 0 0 0 3 0.1 4 0.5 red.png
too few tokens 1 2 3
-1 -1 x 0 1 0 0 0 0 0 1 0
300 50 2 20 3 0.5 90 0 10 0 4 0 needle
";
        let defs = parse_pattern_file("rings.txt", text);
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["rings_1", "rings_2", "rings_3"]);

        let ring = defs[0].config();
        assert_eq!(ring.origin, Origin { x: None, y: None });
        assert_eq!(ring.aim, Aim::Degrees(0.0));
        assert_eq!(ring.duration_seconds, None);
        assert_eq!(ring.bullet_type, None);

        let aimed = defs[1].config();
        assert_eq!(aimed.aim, Aim::AtPlayer);
        assert_eq!(aimed.duration_seconds, Some(4.0));
        assert_eq!(aimed.blink_seconds, Some(0.5));
        assert_eq!(aimed.bullet_type.as_deref(), Some("red.png"));

        let needle = defs[2].config();
        assert_eq!(needle.origin, Origin { x: Some(300.0), y: Some(50.0) });
        assert_eq!(needle.burst_count, 20);
        assert_eq!(needle.duration_seconds, None);
        assert_eq!(needle.bullet_type.as_deref(), Some("needle"));
    }

    #[test]
    fn test_single_pattern_file_uses_stem() {
        let defs = parse_pattern_file("patterns/straight.txt", "-1 -1 1 0 1 0 90 0 0 0 2 0\n\n");
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "straight");
    }

    #[test]
    fn test_cycle_round_robin_with_gap() {
        let mut library = PatternLibrary::new();
        let mut a = params(1.0, 0.0, 1.0, 90.0, 1.0);
        a.duration_seconds = Some(2.0 / FPS);
        let mut b = params(1.0, 0.0, 2.0, 90.0, 1.0);
        b.duration_seconds = Some(1.0 / FPS);
        library.insert(def("a", a));
        library.insert(def("b", b));

        let mut cycle = PatternCycle::new(vec!["a".into(), "b".into()], 1);
        let skin = skin();
        let ctx = EmitContext {
            owner: 1,
            owner_pos: Vec2::ZERO,
            player_pos: Vec2::ZERO,
            skin: &skin,
            images: &NoImages,
        };
        let emitted: Vec<usize> = (1..=8u64)
            .map(|frame| cycle.step(frame, &library, FPS, &ctx).len())
            .collect();
        // a: frames 1-2, gap 3, b: frame 4, gap 5, a: 6-7, gap 8
        assert_eq!(emitted, vec![1, 1, 0, 2, 0, 1, 1, 0]);
    }

    #[test]
    fn test_cycle_skips_unknown_names() {
        let mut library = PatternLibrary::new();
        library.insert(def("known", params(1.0, 0.0, 1.0, 90.0, 1.0)));
        let mut cycle = PatternCycle::new(vec!["missing".into(), "known".into()], 0);
        let skin = skin();
        let ctx = EmitContext {
            owner: 1,
            owner_pos: Vec2::ZERO,
            player_pos: Vec2::ZERO,
            skin: &skin,
            images: &NoImages,
        };
        assert_eq!(cycle.step(1, &library, FPS, &ctx).len(), 0);
        assert_eq!(cycle.state(1), CycleState::Ready);
        assert_eq!(cycle.step(2, &library, FPS, &ctx).len(), 1);
        assert_eq!(cycle.state(2), CycleState::Running);
    }

    #[test]
    fn test_cycle_default_duration() {
        let mut library = PatternLibrary::new();
        library.insert(def("x", params(1.0, 0.0, 1.0, 90.0, 1.0)));
        let mut cycle = PatternCycle::new(vec!["x".into()], 10);
        let skin = skin();
        let ctx = EmitContext {
            owner: 1,
            owner_pos: Vec2::ZERO,
            player_pos: Vec2::ZERO,
            skin: &skin,
            images: &NoImages,
        };
        cycle.step(1, &library, FPS, &ctx);
        assert_eq!(cycle.state(180), CycleState::Running);
        assert_eq!(cycle.state(181), CycleState::Gap);
        cycle.step(181, &library, FPS, &ctx);
        assert!(cycle.active().is_none());
        assert_eq!(cycle.state(190), CycleState::Gap);
        assert_eq!(cycle.state(191), CycleState::Ready);
    }

    proptest! {
        #[test]
        fn prop_fires_iff_frame_divisible(freq in 1.0f32..20.0, frames in 1u32..200) {
            let mut inst = def("p", params(freq, 0.0, 1.0, 90.0, 1.0)).create_instance(FPS);
            let counts = run(&mut inst, frames);
            let f = freq.floor() as u32;
            for (i, count) in counts.iter().enumerate() {
                let n = i as u32 + 1;
                prop_assert_eq!(*count == 1, n % f == 0);
            }
        }

        #[test]
        fn prop_nothing_after_duration(seconds in 0.01f32..2.0) {
            let mut p = params(1.0, 0.0, 1.0, 90.0, 1.0);
            p.duration_seconds = Some(seconds);
            let mut inst = def("p", p).create_instance(FPS);
            let limit = seconds_to_frames(seconds, FPS);
            let counts = run(&mut inst, limit + 30);
            for (i, count) in counts.iter().enumerate() {
                let n = i as u32 + 1;
                prop_assert_eq!(*count == 1, n <= limit);
            }
        }

        #[test]
        fn prop_blink_alternates(seconds in 0.02f32..0.5) {
            let mut p = params(1.0, 0.0, 1.0, 90.0, 1.0);
            p.blink_seconds = Some(seconds);
            let mut inst = def("p", p).create_instance(FPS);
            let window = seconds_to_frames(seconds, FPS);
            let counts = run(&mut inst, window * 6);
            for (i, count) in counts.iter().enumerate() {
                let n = i as u32 + 1;
                let on = (n / window) % 2 == 0;
                prop_assert_eq!(*count == 1, on);
            }
        }

        #[test]
        fn prop_burst_size_floor(start in 0.0f32..5.0, change in -3.0f32..0.0, bursts in 1usize..100) {
            let mut p = params(1.0, 0.0, start, 90.0, 1.0);
            p.burst_size_change = change;
            let mut inst = def("p", p).create_instance(FPS);
            let counts = run(&mut inst, bursts as u32);
            prop_assert!(counts.iter().all(|c| *c >= 1));
        }
    }
}
