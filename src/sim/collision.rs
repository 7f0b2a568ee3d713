//! Bullet collision detection and response
//!
//! Runs once per frame after every hitbox has been refreshed. Enemy bullets
//! are tested against the player, then player bullets against enemies in
//! grunt, midboss, boss order.

use super::state::{Entity, GameState};

/// What the collision pass did this frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionReport {
    /// Lives the player lost
    pub player_hits: u32,
    /// Player bullets that struck an enemy
    pub enemy_hits: u32,
    pub points: u64,
}

/// Resolve all bullet collisions for the current frame
pub fn resolve_collisions(state: &mut GameState) -> CollisionReport {
    let mut report = CollisionReport::default();
    enemy_bullets_vs_player(state, &mut report);
    player_bullets_vs_enemies(state, &mut report);
    report
}

fn enemy_bullets_vs_player(state: &mut GameState, report: &mut CollisionReport) {
    let GameState {
        player,
        grunts,
        midboss,
        boss,
        lives,
        deaths,
        ..
    } = state;

    let enemies = grunts
        .iter_mut()
        .chain(midboss.iter_mut())
        .chain(boss.iter_mut());
    for enemy in enemies {
        for bullet in &mut enemy.bullets {
            // An invulnerable player is missed, so one frame costs at most one life
            if bullet.hitbox.intersects(&player.hitbox) {
                player.hitbox.start_invulnerability();
                *lives = lives.saturating_sub(1);
                *deaths += 1;
                report.player_hits += 1;
                bullet.hitbox.mark_resolved();
                log::info!("Player hit by entity {}, {} lives left", bullet.owner, lives);
            }
        }
        enemy.bullets.retain(|b| !b.hitbox.is_resolved());
    }
}

fn player_bullets_vs_enemies(state: &mut GameState, report: &mut CollisionReport) {
    let GameState {
        player,
        grunts,
        midboss,
        boss,
        score,
        ..
    } = state;

    for bullet in &mut player.bullets {
        let target = grunts
            .iter_mut()
            .chain(midboss.iter_mut())
            .chain(boss.iter_mut())
            .find(|e| !e.is_dead() && bullet.hitbox.intersects(&e.hitbox));
        let Some(target) = target else {
            continue;
        };

        let points = damage(target);
        *score += points;
        report.points += points;
        report.enemy_hits += 1;
        bullet.hitbox.mark_resolved();
    }
    player.bullets.retain(|b| !b.hitbox.is_resolved());
}

/// One point of damage; returns the points earned. The finishing blow scores nothing.
fn damage(target: &mut Entity) -> u64 {
    target.hp -= 1;
    if target.is_dead() {
        log::debug!("Entity {} destroyed", target.id);
        0
    } else {
        target.points()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{ImageHandle, NoImages};
    use crate::config::fixtures;
    use crate::settings::Settings;
    use crate::sim::director::create_grunt;
    use crate::sim::pattern::PatternLibrary;
    use crate::sim::state::{Bullet, BulletSkin};
    use glam::Vec2;

    fn skin() -> BulletSkin {
        BulletSkin {
            sprite: "b".to_string(),
            size: Vec2::splat(8.0),
            hitbox_radius: 5.0,
            image: ImageHandle::PLACEHOLDER,
        }
    }

    fn state_with_grunt(hp: i32, pos: Vec2) -> GameState {
        let stage = fixtures::stage(Vec::new());
        let mut state = GameState::new(&stage, PatternLibrary::new(), &NoImages);
        let id = state.next_entity_id();
        let grunt = create_grunt(
            id,
            &fixtures::loser(&[], hp, 0.0),
            pos,
            &Settings::default(),
            &NoImages,
            &state.patterns,
        );
        state.grunts.push(grunt);
        state
    }

    fn enemy_bullet(state: &GameState, pos: Vec2) -> Bullet {
        Bullet::new(state.grunts[0].id, pos, Vec2::ZERO, &skin())
    }

    fn player_bullet(state: &GameState, pos: Vec2) -> Bullet {
        Bullet::new(state.player.id, pos, Vec2::ZERO, &skin())
    }

    #[test]
    fn test_enemy_bullet_costs_one_life_per_frame() {
        let mut state = state_with_grunt(3, Vec2::new(100.0, 100.0));
        let at_player = state.player.pos;
        let first = enemy_bullet(&state, at_player);
        let second = enemy_bullet(&state, at_player + Vec2::new(1.0, 0.0));
        state.grunts[0].bullets.extend([first, second]);

        let report = resolve_collisions(&mut state);
        assert_eq!(report.player_hits, 1);
        assert_eq!(state.lives, 2);
        assert_eq!(state.deaths, 1);
        assert!(state.player.hitbox.is_invulnerable());
        // The second bullet missed the now-invulnerable player and keeps flying
        assert_eq!(state.grunts[0].bullets.len(), 1);
    }

    #[test]
    fn test_invulnerable_player_not_hit() {
        let mut state = state_with_grunt(3, Vec2::new(100.0, 100.0));
        state.player.hitbox.start_invulnerability();
        let bullet = enemy_bullet(&state, state.player.pos);
        state.grunts[0].bullets.push(bullet);

        let report = resolve_collisions(&mut state);
        assert_eq!(report.player_hits, 0);
        assert_eq!(state.lives, 3);
        assert_eq!(state.grunts[0].bullets.len(), 1);
    }

    #[test]
    fn test_player_bullet_damages_and_scores() {
        let target = Vec2::new(100.0, 100.0);
        let mut state = state_with_grunt(3, target);
        let bullet = player_bullet(&state, target);
        state.player.bullets.push(bullet);

        let report = resolve_collisions(&mut state);
        assert_eq!(report.enemy_hits, 1);
        assert_eq!(state.grunts[0].hp, 2);
        assert_eq!(state.score, 100);
        assert!(state.player.bullets.is_empty());
    }

    #[test]
    fn test_finishing_blow_scores_nothing() {
        let target = Vec2::new(100.0, 100.0);
        let mut state = state_with_grunt(1, target);
        let bullet = player_bullet(&state, target);
        state.player.bullets.push(bullet);

        resolve_collisions(&mut state);
        assert_eq!(state.grunts[0].hp, 0);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_dead_targets_are_skipped() {
        let target = Vec2::new(100.0, 100.0);
        let mut state = state_with_grunt(1, target);
        let first = player_bullet(&state, target);
        let second = player_bullet(&state, target);
        state.player.bullets.extend([first, second]);

        let report = resolve_collisions(&mut state);
        assert_eq!(report.enemy_hits, 1);
        assert_eq!(state.grunts[0].hp, 0);
        assert_eq!(state.player.bullets.len(), 1);
    }

    #[test]
    fn test_one_bullet_hits_one_enemy() {
        let target = Vec2::new(100.0, 100.0);
        let mut state = state_with_grunt(3, target);
        let id = state.next_entity_id();
        let twin = create_grunt(
            id,
            &fixtures::loser(&[], 3, 0.0),
            target,
            &Settings::default(),
            &NoImages,
            &state.patterns,
        );
        state.grunts.push(twin);
        let bullet = player_bullet(&state, target);
        state.player.bullets.push(bullet);

        resolve_collisions(&mut state);
        assert_eq!(state.grunts[0].hp, 2);
        assert_eq!(state.grunts[1].hp, 3);
    }

    #[test]
    fn test_miss_leaves_everything() {
        let mut state = state_with_grunt(3, Vec2::new(100.0, 100.0));
        let bullet = player_bullet(&state, Vec2::new(400.0, 100.0));
        state.player.bullets.push(bullet);
        let report = resolve_collisions(&mut state);
        assert_eq!(report, CollisionReport::default());
        assert_eq!(state.player.bullets.len(), 1);
    }
}
