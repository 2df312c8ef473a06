//! Combat entities: physics body, animation cursor and the attack / hurt /
//! death state machine shared by the player, allies and enemies.

use crate::ai::AiPolicy;
use crate::anim::AnimCursor;
use crate::catalog::{AttackEffect, CharacterDef, TargetMask};
use crate::config::WorldConfig;
use crate::geom::{Rect, Vec2};
use crate::physics::PhysicsBody;
use crate::tiles::SpatialGrid;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Idle,
    Walk,
    Run,
    Jump,
    Falling,
    Attack1,
    Attack2,
    Attack3,
    Hurt,
    Dead,
    /// Death by petrification.
    Petrified,
}

impl EntityState {
    pub const COUNT: usize = 11;

    pub const fn slot(self) -> usize {
        self as usize
    }

    pub fn attack(tier: u8) -> Self {
        match tier {
            2 => EntityState::Attack2,
            3 => EntityState::Attack3,
            _ => EntityState::Attack1,
        }
    }

    pub fn is_dead(self) -> bool {
        matches!(self, EntityState::Dead | EntityState::Petrified)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Player,
    Ally,
    Enemy,
}

impl Faction {
    /// Who this side's attacks and effects may damage.
    pub fn hostile_mask(self) -> TargetMask {
        match self {
            Faction::Player | Faction::Ally => TargetMask::ENEMIES,
            Faction::Enemy => TargetMask::PLAYER_SIDE,
        }
    }
}

/// Held movement input, written by the player's actions or by AI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Controls {
    pub left: bool,
    pub right: bool,
    pub running: bool,
    /// Facing left.
    pub flip: bool,
}

impl Controls {
    pub fn stop(&mut self) {
        self.left = false;
        self.right = false;
        self.running = false;
    }

    pub fn head(&mut self, left: bool) {
        self.left = left;
        self.right = !left;
        self.flip = left;
    }

    fn direction(&self) -> f32 {
        (self.right as i8 - self.left as i8) as f32
    }
}

/// An attack whose damage lands some ticks after the attack started.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledAttack {
    pub effect: AttackEffect,
    pub ticks_remaining: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttackStart {
    /// Cooldown, state or energy did not allow it. Not an error.
    Rejected,
    /// Started; the effect must be resolved now.
    Immediate(AttackEffect),
    /// Started; the effect fires from a later `update`.
    Scheduled,
}

impl AttackStart {
    pub fn started(&self) -> bool {
        !matches!(self, AttackStart::Rejected)
    }
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub def: Arc<CharacterDef>,
    pub faction: Faction,
    pub body: PhysicsBody,
    pub controls: Controls,
    pub state: EntityState,
    pub anim: AnimCursor,

    pub hp: u32,
    pub max_hp: u32,
    pub energy: u32,
    pub max_energy: u32,

    pub attacking: bool,
    pub attack_tier: u8,
    pub attack_timer: u32,
    pub hurting: u32,
    pub dead: bool,
    /// Ticks spent dead.
    pub dying: u32,
    /// State shown once dead.
    pub death_state: EntityState,

    pub jumps: u8,
    pub jumping: bool,
    pub time_in_air: u32,

    pub scheduled: Option<ScheduledAttack>,
    pub ai: AiPolicy,
}

impl Entity {
    pub fn spawn(def: Arc<CharacterDef>, faction: Faction, pos: Vec2, ai: AiPolicy) -> Self {
        let max_energy = def.max_energy();
        Self {
            faction,
            body: PhysicsBody::new(pos, def.body),
            controls: Controls::default(),
            state: EntityState::Idle,
            anim: AnimCursor::default(),
            hp: def.max_hp,
            max_hp: def.max_hp,
            energy: if def.start_full_energy { max_energy } else { 0 },
            max_energy,
            attacking: false,
            attack_tier: 1,
            attack_timer: 0,
            hurting: 0,
            dead: false,
            dying: 0,
            death_state: EntityState::Dead,
            jumps: 0,
            jumping: false,
            time_in_air: 0,
            scheduled: None,
            ai,
            def,
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn pos(&self) -> Vec2 {
        self.body.pos
    }

    pub fn rect(&self) -> Rect {
        self.body.rect()
    }

    pub fn flip(&self) -> bool {
        self.controls.flip
    }

    pub fn airborne(&self) -> bool {
        self.jumping || !self.body.grounded()
    }

    /// Dead long enough to be removed from its collection.
    pub fn expired(&self) -> bool {
        self.dead && self.dying > self.def.died_time
    }

    /// Advance timers, physics and the state machine by one tick. Returns a
    /// scheduled attack whose countdown reached zero this tick.
    pub fn update(&mut self, grid: &SpatialGrid, cfg: &WorldConfig) -> Option<AttackEffect> {
        self.attack_timer = self.attack_timer.saturating_sub(1);
        self.energy = (self.energy + 1).min(self.max_energy);
        self.hurting = self.hurting.saturating_sub(1);
        let fired = self.tick_scheduled();

        let state = if self.dead {
            self.dying += 1;
            self.controls.stop();
            self.body.vel.x = 0.0;
            self.body.step(grid, cfg);
            self.death_state
        } else if self.attacking {
            if self.anim.finished() {
                self.attacking = false;
            }
            EntityState::attack(self.attack_tier)
        } else if self.hurting > 0 {
            if self.anim.finished() {
                self.hurting = 0;
            }
            EntityState::Hurt
        } else {
            self.locomotion(grid, cfg)
        };

        self.enter(state);
        self.anim.update(self.def.animations.get(self.state));
        fired
    }

    fn tick_scheduled(&mut self) -> Option<AttackEffect> {
        let pending = self.scheduled.as_mut()?;
        pending.ticks_remaining = pending.ticks_remaining.saturating_sub(1);
        if pending.ticks_remaining > 0 {
            return None;
        }
        self.scheduled.take().map(|s| s.effect)
    }

    fn locomotion(&mut self, grid: &SpatialGrid, cfg: &WorldConfig) -> EntityState {
        let speed = if self.controls.running {
            cfg.run_speed
        } else {
            cfg.walk_speed
        };
        self.body.vel.x = self.controls.direction() * speed;
        self.body.step(grid, cfg);

        if self.body.collisions.bottom {
            self.jumps = 0;
            self.jumping = false;
            self.time_in_air = 0;
        }

        let mut state = EntityState::Idle;
        if self.body.vel.x != 0.0 {
            state = if self.controls.running {
                EntityState::Run
            } else {
                EntityState::Walk
            };
        }
        if self.body.vel.y != 0.0 {
            self.time_in_air += 1;
        }
        if self.time_in_air > cfg.air_ticks_before_falling
            && self.body.vel.y > 0.0
            && self.def.animations.has(EntityState::Falling)
        {
            state = EntityState::Falling;
        }
        if self.jumping {
            state = EntityState::Jump;
        }
        state
    }

    fn enter(&mut self, state: EntityState) {
        if self.state != state {
            self.state = state;
            self.anim.reset();
        }
    }

    pub fn jump(&mut self, cfg: &WorldConfig) -> bool {
        if self.dead || self.jumps >= cfg.max_jumps {
            return false;
        }
        self.jumps += 1;
        self.body.vel.y = -cfg.jump_speed;
        self.jumping = true;
        true
    }

    /// Try to start attack `tier` (1-based). On success the energy cost is
    /// deducted and the attack animation starts immediately.
    pub fn try_attack(&mut self, tier: u8) -> AttackStart {
        if self.dead
            || self.attacking
            || self.attack_timer > 0
            || self.hurting > 0
            || self.airborne()
        {
            return AttackStart::Rejected;
        }
        let def = Arc::clone(&self.def);
        let Some(attack) = def.attack(tier) else {
            return AttackStart::Rejected;
        };
        if self.energy < attack.cost {
            return AttackStart::Rejected;
        }

        self.energy -= attack.cost;
        self.attacking = true;
        self.attack_tier = tier;
        self.attack_timer = def.attack_period;
        self.enter(EntityState::attack(tier));

        if attack.delay > 0 {
            self.scheduled = Some(ScheduledAttack {
                effect: attack.effect.clone(),
                ticks_remaining: attack.delay,
            });
            AttackStart::Scheduled
        } else {
            AttackStart::Immediate(attack.effect.clone())
        }
    }

    /// Apply damage and restart the stagger. Returns true if this hit killed.
    /// Hits on the dead are ignored.
    pub fn hurt(&mut self, damage: u32, cfg: &WorldConfig) -> bool {
        if self.dead {
            return false;
        }
        self.hurting = cfg.hurt_ticks;
        self.hp = self.hp.saturating_sub(damage);
        if self.hp == 0 {
            self.die();
            return true;
        }
        if !self.attacking {
            self.state = EntityState::Hurt;
            self.anim.reset();
        }
        false
    }

    fn die(&mut self) {
        self.dead = true;
        self.attacking = false;
        self.hurting = 0;
        self.scheduled = None;
        self.controls.stop();
        self.enter(self.death_state);
    }

    /// Switch a dead entity to the petrified death.
    pub fn petrify(&mut self) {
        self.death_state = EntityState::Petrified;
        if self.dead {
            self.enter(EntityState::Petrified);
        }
    }

    pub fn heal(&mut self, amount: u32) {
        if !self.dead {
            self.hp = (self.hp + amount).min(self.max_hp);
        }
    }

    pub fn restore_energy(&mut self, amount: u32) {
        self.energy = (self.energy + amount).min(self.max_energy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{AnimationDef, AnimationSet};
    use crate::catalog::AttackDef;
    use crate::config::Shake;
    use crate::geom::Size;
    use crate::tiles::{ResourceTable, Tile};

    const TS: f32 = 32.0;

    fn grid() -> SpatialGrid {
        let mut res = ResourceTable::new();
        res.register_with_info("ground", 1, "solid").unwrap();
        let mut g = SpatialGrid::new(TS, Arc::new(res));
        for x in -5..30 {
            g.insert((x, 10), Tile::new("ground", 0));
        }
        g
    }

    fn cfg() -> WorldConfig {
        WorldConfig {
            tile_size: TS,
            ..WorldConfig::default()
        }
    }

    fn def(delay: u32) -> Arc<CharacterDef> {
        let melee = AttackEffect::Melee {
            damage: 20,
            reach: 30.0,
        };
        Arc::new(CharacterDef {
            name: "tester".into(),
            body: Size::new(20.0, 40.0),
            max_hp: 100,
            attacks: vec![
                AttackDef {
                    cost: 60,
                    effect: melee.clone(),
                    delay: 0,
                },
                AttackDef {
                    cost: 200,
                    effect: melee,
                    delay,
                },
            ],
            attack_period: 10,
            start_full_energy: true,
            died_time: 20,
            vision_width: 100.0,
            attack_distance: TS,
            shake: Shake::default(),
            animations: AnimationSet::new(AnimationDef::looping(4, 5))
                .with(EntityState::Attack1, AnimationDef::looping(3, 4))
                .with(EntityState::Attack2, AnimationDef::looping(3, 4))
                .with(EntityState::Hurt, AnimationDef::looping(3, 10))
                .with(EntityState::Falling, AnimationDef::once(2, 0)),
        })
    }

    fn grounded(delay: u32) -> (Entity, SpatialGrid, WorldConfig) {
        let grid = grid();
        let cfg = cfg();
        let mut e = Entity::spawn(def(delay), Faction::Enemy, Vec2::new(64.0, 10.0 * TS - 40.0), AiPolicy::None);
        e.update(&grid, &cfg);
        assert!(e.body.grounded());
        (e, grid, cfg)
    }

    #[test]
    fn energy_is_deducted_only_when_attack_starts() {
        let (mut e, grid, cfg) = grounded(0);
        assert_eq!(e.energy, 200);
        assert!(e.try_attack(1).started());
        assert_eq!(e.energy, 140);
        assert_eq!(e.state, EntityState::Attack1);

        // Already attacking.
        assert_eq!(e.try_attack(1), AttackStart::Rejected);
        assert_eq!(e.energy, 140);

        // Undefined tier.
        for _ in 0..30 {
            e.update(&grid, &cfg);
        }
        assert!(!e.attacking);
        let before = e.energy;
        assert_eq!(e.try_attack(3), AttackStart::Rejected);
        assert_eq!(e.energy, before);

        // Not enough energy for tier 2.
        e.energy = 199;
        assert_eq!(e.try_attack(2), AttackStart::Rejected);
        assert_eq!(e.energy, 199);
    }

    #[test]
    fn attack_lock_lasts_one_cycle() {
        let (mut e, grid, cfg) = grounded(0);
        e.controls.head(false);
        assert!(e.try_attack(1).started());
        let x = e.pos().x;
        let mut ticks = 0;
        while e.attacking {
            e.update(&grid, &cfg);
            ticks += 1;
            assert!(ticks < 100);
        }
        // 3 frames of 4 ticks, released on the tick after the finish.
        assert_eq!(ticks, 13);
        assert_eq!(e.pos().x, x);
        e.update(&grid, &cfg);
        assert_eq!(e.pos().x, x + cfg.walk_speed);
        assert_eq!(e.state, EntityState::Walk);
    }

    #[test]
    fn cooldown_blocks_next_attack() {
        let (mut e, grid, cfg) = grounded(0);
        let def = Arc::make_mut(&mut e.def);
        def.attack_period = 50;
        assert!(e.try_attack(1).started());
        for _ in 0..20 {
            e.update(&grid, &cfg);
        }
        assert!(!e.attacking);
        assert!(e.attack_timer > 0);
        assert_eq!(e.try_attack(1), AttackStart::Rejected);
    }

    #[test]
    fn airborne_entities_cannot_attack() {
        let (mut e, _grid, cfg) = grounded(0);
        assert!(e.jump(&cfg));
        assert_eq!(e.try_attack(1), AttackStart::Rejected);
        assert_eq!(e.energy, 200);
    }

    #[test]
    fn hp_reaches_zero_and_death_is_final() {
        let (mut e, grid, cfg) = grounded(0);
        let mut seen = Vec::new();
        for _ in 0..3 {
            assert!(!e.hurt(30, &cfg));
            seen.push(e.hp);
            e.update(&grid, &cfg);
        }
        assert_eq!(seen, vec![70, 40, 10]);
        assert!(e.hurt(30, &cfg));
        assert_eq!(e.hp, 0);
        assert!(e.dead);
        assert_eq!(e.state, EntityState::Dead);

        assert!(!e.hurt(30, &cfg));
        e.heal(50);
        assert_eq!(e.hp, 0);
        for _ in 0..5 {
            e.update(&grid, &cfg);
            assert_eq!(e.state, EntityState::Dead);
        }
        assert_eq!(e.try_attack(1), AttackStart::Rejected);
        assert!(!e.jump(&cfg));
    }

    #[test]
    fn overkill_clamps_to_zero() {
        let (mut e, _grid, cfg) = grounded(0);
        assert!(e.hurt(1000, &cfg));
        assert_eq!(e.hp, 0);
    }

    #[test]
    fn hurt_freezes_movement_and_blocks_attacks() {
        let (mut e, grid, cfg) = grounded(0);
        e.controls.head(true);
        e.hurt(10, &cfg);
        assert_eq!(e.state, EntityState::Hurt);
        assert_eq!(e.try_attack(1), AttackStart::Rejected);
        let x = e.pos().x;
        for _ in 1..cfg.hurt_ticks {
            e.update(&grid, &cfg);
            assert_eq!(e.state, EntityState::Hurt);
        }
        assert_eq!(e.pos().x, x);
        e.update(&grid, &cfg);
        assert_eq!(e.hurting, 0);
        assert_eq!(e.state, EntityState::Walk);
        assert_eq!(e.pos().x, x - cfg.walk_speed);
    }

    #[test]
    fn attack_lock_outranks_hurt() {
        let (mut e, grid, cfg) = grounded(0);
        assert!(e.try_attack(1).started());
        e.hurt(10, &cfg);
        e.update(&grid, &cfg);
        assert_eq!(e.state, EntityState::Attack1);
    }

    #[test]
    fn scheduled_attack_fires_once() {
        let (mut e, grid, cfg) = grounded(30);
        assert_eq!(e.try_attack(2), AttackStart::Scheduled);
        let mut fired = Vec::new();
        for tick in 1..=100 {
            if e.update(&grid, &cfg).is_some() {
                fired.push(tick);
            }
        }
        assert_eq!(fired, vec![30]);
        assert!(e.scheduled.is_none());
    }

    #[test]
    fn scheduled_attack_is_cancelled_by_death() {
        let (mut e, grid, cfg) = grounded(30);
        assert_eq!(e.try_attack(2), AttackStart::Scheduled);
        e.hurt(1000, &cfg);
        for _ in 0..40 {
            assert!(e.update(&grid, &cfg).is_none());
        }
    }

    #[test]
    fn corpse_expires_after_died_time() {
        let (mut e, grid, cfg) = grounded(0);
        e.hurt(1000, &cfg);
        for _ in 0..20 {
            e.update(&grid, &cfg);
            assert!(!e.expired());
        }
        e.update(&grid, &cfg);
        assert!(e.expired());
    }

    #[test]
    fn long_fall_switches_to_falling() {
        let grid = grid();
        let cfg = cfg();
        let mut e = Entity::spawn(def(0), Faction::Ally, Vec2::new(64.0, 0.0), AiPolicy::None);
        let mut states = Vec::new();
        for _ in 0..15 {
            e.update(&grid, &cfg);
            states.push(e.state);
        }
        assert_eq!(states[9], EntityState::Idle);
        assert_eq!(states[10], EntityState::Falling);
    }

    #[test]
    fn landing_resets_jumps() {
        let (mut e, grid, cfg) = grounded(0);
        assert!(e.jump(&cfg));
        assert!(!e.jump(&cfg));
        e.update(&grid, &cfg);
        assert_eq!(e.state, EntityState::Jump);
        for _ in 0..60 {
            e.update(&grid, &cfg);
        }
        assert!(e.body.grounded());
        assert_eq!(e.jumps, 0);
        assert!(e.jump(&cfg));
    }

    #[test]
    fn petrify_changes_the_death_state() {
        let (mut e, _grid, cfg) = grounded(0);
        e.hurt(1000, &cfg);
        e.petrify();
        assert_eq!(e.state, EntityState::Petrified);
        assert!(e.state.is_dead());
    }
}
