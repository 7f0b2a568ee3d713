//! Scene director
//!
//! Walks the stage's scene queue: batch-spawns each scene, waits for it to be
//! cleared, then moves on. Also owns the entity factories, grunt patrol
//! movement and per-frame pattern scheduling for every enemy.

use glam::Vec2;

use super::animator::Animator;
use super::hitbox::HitBox;
use super::pattern::{EmitContext, PatternCycle, PatternLibrary};
use super::state::{BulletSkin, Entity, EntityId, EntityKind, Facing, GameState, Phase};
use crate::assets::{ImageLookup, resolve_image};
use crate::config::{BossConfig, BossPhaseConfig, EnemyConfig, SceneConfig, StageConfig};
use crate::settings::Settings;

/// Spawn descriptor tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnKind {
    Loser,
    MidBoss,
    Boss,
}

impl SpawnKind {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "LOSER" => Some(SpawnKind::Loser),
            "MIDBOSS" | "MID_BOSS" => Some(SpawnKind::MidBoss),
            "BOSS" => Some(SpawnKind::Boss),
            _ => None,
        }
    }
}

/// Ordered scenes, consumed one at a time
#[derive(Debug, Clone, Default)]
pub struct SceneQueue {
    scenes: Vec<SceneConfig>,
    index: usize,
}

impl SceneQueue {
    pub fn new(scenes: Vec<SceneConfig>) -> Self {
        Self { scenes, index: 0 }
    }

    pub fn current(&self) -> Option<&SceneConfig> {
        self.scenes.get(self.index)
    }

    pub fn advance(&mut self) {
        self.index = (self.index + 1).min(self.scenes.len());
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn remaining(&self) -> usize {
        self.scenes.len() - self.index
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.scenes.len()
    }
}

/// Scene/phase state machine
#[derive(Debug, Clone)]
pub struct Director {
    stage: StageConfig,
    queue: SceneQueue,
    scene_active: bool,
    /// Enemies spawned by the active scene
    spawned: Vec<EntityId>,
    midboss_config: Option<BossConfig>,
    boss_config: Option<BossConfig>,
}

impl Director {
    pub fn new(stage: StageConfig) -> Self {
        let queue = SceneQueue::new(stage.scenes.clone());
        Self {
            stage,
            queue,
            scene_active: false,
            spawned: Vec::new(),
            midboss_config: None,
            boss_config: None,
        }
    }

    pub fn stage(&self) -> &StageConfig {
        &self.stage
    }

    pub fn queue(&self) -> &SceneQueue {
        &self.queue
    }

    pub fn scene_active(&self) -> bool {
        self.scene_active
    }

    /// One director tick: scenes, movement, then pattern scheduling
    pub fn update(&mut self, state: &mut GameState, settings: &Settings, images: &dyn ImageLookup) {
        self.advance_scenes(state, settings, images);
        move_grunts(&mut state.grunts, state.dt_scale);
        run_patterns(state, settings, images);
    }

    fn advance_scenes(&mut self, state: &mut GameState, settings: &Settings, images: &dyn ImageLookup) {
        if !self.scene_active {
            match self.queue.current().cloned() {
                Some(scene) => {
                    self.spawn_scene(&scene, state, settings, images);
                    self.scene_active = true;
                }
                None => {
                    if state.phase != Phase::Clear {
                        state.phase = Phase::Clear;
                        log::info!("Stage has no scenes left, phase CLEAR");
                    }
                    return;
                }
            }
        }

        if self.scene_cleared(state) {
            log::info!("Scene {} cleared", self.queue.index() + 1);
            self.scene_active = false;
            self.spawned.clear();
            self.queue.advance();
            if self.queue.is_finished() {
                state.phase = Phase::Clear;
                log::info!("All scenes cleared, phase CLEAR");
            }
        }
    }

    /// True when every enemy spawned by the active scene is dead or gone
    pub fn scene_cleared(&self, state: &GameState) -> bool {
        self.spawned.iter().all(|id| {
            state
                .enemies()
                .find(|e| e.id == *id)
                .is_none_or(|e| e.is_dead())
        })
    }

    fn spawn_scene(
        &mut self,
        scene: &SceneConfig,
        state: &mut GameState,
        settings: &Settings,
        images: &dyn ImageLookup,
    ) {
        let mut phase = Phase::Losers;
        for spawn in &scene.spawns {
            let Some(kind) = SpawnKind::parse(&spawn.kind) else {
                log::warn!("Unknown spawn type: {}", spawn.kind);
                continue;
            };
            let pos = Vec2::new(spawn.x, spawn.y);
            let variant = spawn.variant.as_deref();
            let id = state.next_entity_id();

            match kind {
                SpawnKind::Loser => {
                    let config = self.stage.loser.resolve(variant);
                    let grunt = create_grunt(id, config, pos, settings, images, &state.patterns);
                    state.grunts.push(grunt);
                }
                SpawnKind::MidBoss => {
                    let config = self.stage.midboss.resolve(variant).clone();
                    let Some(midboss) =
                        create_boss(id, kind, &config, pos, settings, images, &state.patterns)
                    else {
                        continue;
                    };
                    if state.midboss.replace(midboss).is_some() {
                        log::warn!("Replacing an existing midboss");
                    }
                    self.midboss_config = Some(config);
                    if phase == Phase::Losers {
                        phase = Phase::MidBoss;
                    }
                }
                SpawnKind::Boss => {
                    let config = self.stage.boss.resolve(variant).clone();
                    let Some(boss) =
                        create_boss(id, kind, &config, pos, settings, images, &state.patterns)
                    else {
                        continue;
                    };
                    if state.boss.replace(boss).is_some() {
                        log::warn!("Replacing an existing boss");
                    }
                    self.boss_config = Some(config);
                    phase = Phase::Boss;
                }
            }
            log::info!("Spawned {} at {}, {}", spawn.kind, spawn.x, spawn.y);
            self.spawned.push(id);
        }

        if state.phase != phase {
            log::info!("Phase {} -> {}", state.phase.label(), phase.label());
        }
        state.phase = phase;
    }

    /// Move a depleted midboss/boss into its next phase.
    ///
    /// Returns false when it has no phase left and should be removed.
    pub fn advance_boss_phase(
        &self,
        entity: &mut Entity,
        settings: &Settings,
        images: &dyn ImageLookup,
        patterns: &PatternLibrary,
    ) -> bool {
        let (config, current) = match entity.kind {
            EntityKind::MidBoss { phase } => (self.midboss_config.as_ref(), phase),
            EntityKind::Boss { phase, .. } => (self.boss_config.as_ref(), phase),
            _ => return false,
        };
        let Some(next) = config.and_then(|c| c.phases.get(current + 1)) else {
            return false;
        };
        apply_boss_phase(entity, next, current + 1, settings, images, patterns);
        log::info!("Entity {} entered phase {}", entity.id, current + 2);
        true
    }
}

fn pattern_cycle(
    names: &[String],
    gap_seconds: f32,
    settings: &Settings,
    patterns: &PatternLibrary,
) -> Option<PatternCycle> {
    if names.is_empty() {
        return None;
    }
    patterns.check_names(names);
    let gap_frames = if gap_seconds > 0.0 { settings.frames(gap_seconds) } else { 0 };
    Some(PatternCycle::new(names.to_vec(), gap_frames))
}

/// Build the player from the stage's player block
pub fn create_player(id: EntityId, stage: &StageConfig, images: &dyn ImageLookup) -> Entity {
    let config = &stage.player;
    let clip = &config.animation.idle;
    let pos = Vec2::new(config.x, config.y);
    Entity {
        id,
        kind: EntityKind::Player {
            facing: Facing::Idle,
        },
        pos,
        size: clip.scaled_size(),
        speed: config.speed,
        // The player's health is tracked as lives on the state
        hp: 1,
        max_hp: 1,
        hitbox: HitBox::new(pos, config.hitbox_radius),
        bullets: Vec::new(),
        skin: BulletSkin::from_config(&config.bullet, images),
        animator: Animator::new(clip.clone(), resolve_image(images, &clip.sprite)),
        cycle: None,
    }
}

/// Build a grunt from its (default or variant) config
pub fn create_grunt(
    id: EntityId,
    config: &EnemyConfig,
    pos: Vec2,
    settings: &Settings,
    images: &dyn ImageLookup,
    patterns: &PatternLibrary,
) -> Entity {
    let size = config.animation.scaled_size();
    let lane = config
        .lane
        .unwrap_or([size.x / 2.0, settings.playfield.width - size.x / 2.0]);
    Entity {
        id,
        kind: EntityKind::Grunt {
            lane,
            vx: config.speed,
        },
        pos,
        size,
        speed: config.speed,
        hp: config.hp,
        max_hp: config.hp,
        hitbox: HitBox::new(pos, config.hitbox_radius),
        bullets: Vec::new(),
        skin: BulletSkin::from_config(&config.bullet, images),
        animator: Animator::new(
            config.animation.clone(),
            resolve_image(images, &config.animation.sprite),
        ),
        cycle: pattern_cycle(&config.patterns, config.pattern_gap_seconds, settings, patterns),
    }
}

/// Build a midboss or boss in its first phase; `None` if it has no phases
pub fn create_boss(
    id: EntityId,
    kind: SpawnKind,
    config: &BossConfig,
    pos: Vec2,
    settings: &Settings,
    images: &dyn ImageLookup,
    patterns: &PatternLibrary,
) -> Option<Entity> {
    let Some(first) = config.phases.first() else {
        log::warn!("{kind:?} has no phases, not spawned");
        return None;
    };
    let kind = match kind {
        SpawnKind::Boss => EntityKind::Boss {
            phase: 0,
            spellcard: None,
            spellcard_on: false,
        },
        _ => EntityKind::MidBoss { phase: 0 },
    };
    let mut entity = Entity {
        id,
        kind,
        pos,
        size: first.animation.scaled_size(),
        speed: first.speed,
        hp: first.hp,
        max_hp: first.hp,
        hitbox: HitBox::new(pos, first.hitbox_radius),
        bullets: Vec::new(),
        skin: BulletSkin::from_config(&first.bullet, images),
        animator: Animator::new(
            first.animation.clone(),
            resolve_image(images, &first.animation.sprite),
        ),
        cycle: None,
    };
    apply_boss_phase(&mut entity, first, 0, settings, images, patterns);
    Some(entity)
}

fn apply_boss_phase(
    entity: &mut Entity,
    phase: &BossPhaseConfig,
    index: usize,
    settings: &Settings,
    images: &dyn ImageLookup,
    patterns: &PatternLibrary,
) {
    entity.speed = phase.speed;
    entity.hp = phase.hp;
    entity.max_hp = phase.hp;
    entity.size = phase.animation.scaled_size();
    entity.hitbox = HitBox::new(entity.pos, phase.hitbox_radius);
    entity.skin = BulletSkin::from_config(&phase.bullet, images);
    entity.animator.switch_clip(&phase.animation, images);
    entity.cycle = pattern_cycle(&phase.patterns, phase.pattern_gap_seconds, settings, patterns);

    match &mut entity.kind {
        EntityKind::MidBoss { phase: current } => *current = index,
        EntityKind::Boss {
            phase: current,
            spellcard,
            spellcard_on,
        } => {
            *current = index;
            *spellcard = phase.spellcard.clone();
            *spellcard_on = phase.spellcard.is_some();
        }
        _ => {}
    }
}

/// Patrol every grunt between its lane bounds
pub fn move_grunts(grunts: &mut [Entity], dt_scale: f32) {
    for grunt in grunts {
        let EntityKind::Grunt { lane, vx } = &mut grunt.kind else {
            continue;
        };
        grunt.pos.x += *vx * dt_scale;
        if grunt.pos.x <= lane[0] {
            grunt.pos.x = lane[0];
            *vx = vx.abs();
        } else if grunt.pos.x >= lane[1] {
            grunt.pos.x = lane[1];
            *vx = -vx.abs();
        }
    }
}

/// Step every enemy's pattern cycle and collect the bullets it fires
pub fn run_patterns(state: &mut GameState, settings: &Settings, images: &dyn ImageLookup) {
    let GameState {
        player,
        grunts,
        midboss,
        boss,
        patterns,
        frame,
        ..
    } = state;
    let player_pos = player.pos;
    let frame = *frame;

    let enemies = grunts
        .iter_mut()
        .chain(midboss.iter_mut())
        .chain(boss.iter_mut());
    for enemy in enemies {
        if enemy.is_dead() {
            continue;
        }
        let Entity {
            id,
            pos,
            skin,
            bullets,
            cycle,
            ..
        } = enemy;
        let Some(cycle) = cycle else {
            continue;
        };
        let ctx = EmitContext {
            owner: *id,
            owner_pos: *pos,
            player_pos,
            skin,
            images,
        };
        bullets.extend(cycle.step(frame, patterns, settings.nominal_fps, &ctx));
    }
}
