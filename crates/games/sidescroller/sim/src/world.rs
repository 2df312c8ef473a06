use crate::ai::{AiPolicy, AllyBrain, PatrolBrain, VisionAnchor, VisionArea};
use crate::catalog::{AttackEffect, Catalog, TargetMask};
use crate::config::{Shake, WorldConfig};
use crate::effects::{Effect, EffectFactory, EffectKind};
use crate::entity::{Entity, Faction};
use crate::error::LoadError;
use crate::events::ScrollerEvent;
use crate::geom::{Rect, Size, Vec2};
use crate::level::Level;
use crate::pickups::{Pickup, PickupKind};
use crate::portal::Portal;
use crate::tiles::{GridPos, ResourceTable, SpatialGrid};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sim_core::{TerminalOutcome, Tick};
use slotmap::{new_key_type, SlotMap};
use std::sync::Arc;

new_key_type! { pub struct EntityId; }
new_key_type! { pub struct EffectId; }
new_key_type! { pub struct PickupId; }

/// Tiles of this resource spawn allies; variant i is `Catalog::allies[i]`.
pub const ALLY_SPAWN: &str = "npc";
/// Tiles of this resource spawn enemies; variant i is `Catalog::enemies[i]`.
pub const ENEMY_SPAWN: &str = "entities";
pub const COINS: &str = "coins";

/// Separates the ambient particle stream from the gameplay stream.
const AMBIENT_STREAM: u64 = 0x5eed_a4b1_e47f_0001;

/// Decaying screen shake. Visual only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShakeState {
    pub remaining: u32,
    pub total: u32,
    pub intensity: u32,
    pub offset: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    pub target: EntityId,
    pub killed: bool,
}

#[derive(Clone, Debug)]
pub struct World {
    pub grid: SpatialGrid,
    pub entities: SlotMap<EntityId, Entity>,
    pub player: EntityId,
    /// Update and targeting order.
    pub allies: Vec<EntityId>,
    pub enemies: Vec<EntityId>,
    pub effects: SlotMap<EffectId, Effect>,
    pub finishing: Vec<EffectId>,
    pub rigid: Vec<EffectId>,
    pub pickups: SlotMap<PickupId, Pickup>,
    pub portal: Option<Portal>,
    pub shake: ShakeState,
}

impl World {
    /// A world holding only the main player.
    pub fn new(grid: SpatialGrid, player: Entity) -> Self {
        let mut entities = SlotMap::with_key();
        let player = entities.insert(player);
        Self {
            grid,
            entities,
            player,
            allies: Vec::new(),
            enemies: Vec::new(),
            effects: SlotMap::with_key(),
            finishing: Vec::new(),
            rigid: Vec::new(),
            pickups: SlotMap::with_key(),
            portal: None,
            shake: ShakeState::default(),
        }
    }

    /// Build the grid and consume every spawn and coin tile of `level`.
    pub fn from_level(
        level: &Level,
        resources: Arc<ResourceTable>,
        catalog: &Catalog,
        cfg: &WorldConfig,
    ) -> Result<Self, LoadError> {
        let mut grid = level.grid(resources);
        let hero = catalog.character(&catalog.player)?;
        let player = Entity::spawn(hero, Faction::Player, level.camera, AiPolicy::None);

        let mut spawns = Vec::new();
        for (variant, name) in catalog.allies.iter().enumerate() {
            let def = catalog.character(name)?;
            for (pos, _) in grid.extract_tiles(ALLY_SPAWN, variant, false) {
                let vision = VisionArea::new(
                    Size::new(def.vision_width, cfg.tile_size),
                    VisionAnchor::Centered,
                );
                let brain = AllyBrain::new(vision, cfg.ally_near_distance, cfg, def.attack_distance);
                let at = standing_on_tile(&grid, pos, def.body);
                spawns.push(Entity::spawn(
                    Arc::clone(&def),
                    Faction::Ally,
                    at,
                    AiPolicy::AllyFollow(brain),
                ));
            }
        }
        for (variant, name) in catalog.enemies.iter().enumerate() {
            let def = catalog.character(name)?;
            for (pos, _) in grid.extract_tiles(ENEMY_SPAWN, variant, false) {
                let vision = VisionArea::new(
                    Size::new(def.vision_width, cfg.tile_size),
                    VisionAnchor::Facing,
                );
                let at = standing_on_tile(&grid, pos, def.body);
                spawns.push(Entity::spawn(
                    Arc::clone(&def),
                    Faction::Enemy,
                    at,
                    AiPolicy::LocalPatrol(PatrolBrain::new(vision)),
                ));
            }
        }

        let scale = level.scale();
        let mut coins = Vec::new();
        for variant in 0..2 {
            let Some(kind) = PickupKind::from_variant(variant) else {
                continue;
            };
            for (pos, _) in grid.extract_tiles(COINS, variant, false) {
                coins.push(Pickup::new(kind, grid.tile_origin(pos), cfg.pickup_radius));
            }
            for tile in grid.extract_offgrid(COINS, variant, false) {
                let corner = Vec2::new(tile.pos.x * scale, tile.pos.y * scale);
                coins.push(Pickup::new(kind, corner, cfg.pickup_radius));
            }
        }

        let mut world = World::new(grid, player);
        for entity in spawns {
            world.add_entity(entity);
        }
        for coin in coins {
            world.pickups.insert(coin);
        }
        tracing::info!(
            allies = world.allies.len(),
            enemies = world.enemies.len(),
            pickups = world.pickups.len(),
            "world built from level"
        );
        Ok(world)
    }

    /// Insert an ally or enemy at the end of its group's order.
    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        let faction = entity.faction;
        let id = self.entities.insert(entity);
        match faction {
            Faction::Ally => self.allies.push(id),
            Faction::Enemy => self.enemies.push(id),
            Faction::Player => {}
        }
        id
    }

    /// Draw each ally's follow distances.
    pub fn randomize(&mut self, cfg: &WorldConfig, rng: &mut impl Rng) {
        for id in &self.allies {
            let Some(ally) = self.entities.get_mut(*id) else {
                continue;
            };
            if let AiPolicy::AllyFollow(brain) = &mut ally.ai {
                brain.near = cfg.ally_near_distance + rng.gen::<f32>() * cfg.ally_near_jitter;
                brain.panic = brain.near + cfg.ally_panic_margin;
            }
        }
    }

    pub fn player(&self) -> Option<&Entity> {
        self.entities.get(self.player)
    }

    pub fn player_mut(&mut self) -> Option<&mut Entity> {
        self.entities.get_mut(self.player)
    }

    /// Damage the first living entity of the masked groups, enumerated
    /// player, enemies, allies, whose body intersects `rect`. At most one
    /// target is hit. A hit on the main player shakes the screen.
    pub fn attack(
        &mut self,
        cfg: &WorldConfig,
        rect: &Rect,
        damage: u32,
        mask: TargetMask,
        shake: Shake,
        events: &mut Vec<ScrollerEvent>,
    ) -> Option<Hit> {
        let player = mask.player.then_some(self.player);
        let enemies = self.enemies.iter().filter(|_| mask.enemies);
        let allies = self.allies.iter().filter(|_| mask.allies);
        let target = player
            .into_iter()
            .chain(enemies.chain(allies).copied())
            .find(|id| {
                self.entities
                    .get(*id)
                    .is_some_and(|e| !e.dead && e.rect().intersects(rect))
            })?;

        let entity = self.entities.get_mut(target)?;
        let killed = entity.hurt(damage, cfg);
        events.push(ScrollerEvent::Hurt {
            id: target,
            damage,
            hp: entity.hp,
        });
        if killed {
            tracing::debug!(name = entity.name(), "entity died");
            events.push(ScrollerEvent::Died { id: target });
        }
        if target == self.player {
            self.shake_screen(shake.delay, shake.intensity, events);
        }
        Some(Hit { target, killed })
    }

    pub fn shake_screen(&mut self, delay: u32, intensity: u32, events: &mut Vec<ScrollerEvent>) {
        self.shake = ShakeState {
            remaining: delay,
            total: delay,
            intensity,
            offset: Vec2::ZERO,
        };
        events.push(ScrollerEvent::ScreenShake { delay, intensity });
    }

    /// Offset decays linearly over the request's duration.
    pub fn update_shake(&mut self, rng: &mut impl Rng) {
        let shake = &mut self.shake;
        if shake.remaining == 0 {
            shake.offset = Vec2::ZERO;
            return;
        }
        shake.remaining -= 1;
        let amplitude = shake.intensity as f32 * shake.remaining as f32 / shake.total as f32;
        shake.offset = Vec2::new(
            rng.gen_range(-1.0..=1.0) * amplitude,
            rng.gen_range(-1.0..=1.0) * amplitude,
        );
    }

    pub fn spawn_effect(
        &mut self,
        effect: Effect,
        kind: EffectKind,
        events: &mut Vec<ScrollerEvent>,
    ) -> EffectId {
        let name = effect.name().to_string();
        let id = self.effects.insert(effect);
        match kind {
            EffectKind::Finishing => self.finishing.push(id),
            EffectKind::Rigid => self.rigid.push(id),
        }
        events.push(ScrollerEvent::EffectSpawned { id, name, kind });
        id
    }

    /// Apply one attack of `owner` in front of its body.
    pub fn resolve_attack(
        &mut self,
        cfg: &WorldConfig,
        effects: &EffectFactory,
        owner: EntityId,
        attack: &AttackEffect,
        events: &mut Vec<ScrollerEvent>,
    ) {
        let Some(me) = self.entities.get(owner) else {
            return;
        };
        let body = me.rect();
        let flip = me.flip();
        let mask = me.faction.hostile_mask();
        let shake = me.def.shake;
        let effect_size = |name: &str| effects.template(name).map(|t| t.size);

        match attack {
            AttackEffect::Melee { damage, reach } => {
                let x = if flip { body.left() - reach } else { body.right() };
                let area = Rect::new(x, body.top(), *reach, body.h);
                self.attack(cfg, &area, *damage, mask, shake, events);
            }
            AttackEffect::FootMelee {
                damage,
                size,
                petrify,
            } => {
                let x = if flip { body.right() - size.w } else { body.left() };
                let area = Rect::new(x, body.bottom() - size.h, size.w, size.h);
                let hit = self.attack(cfg, &area, *damage, mask, shake, events);
                if let Some(Hit { target, killed: true }) = hit {
                    if *petrify && target == self.player {
                        if let Some(player) = self.entities.get_mut(target) {
                            player.petrify();
                            events.push(ScrollerEvent::Petrified { id: target });
                        }
                    }
                }
            }
            AttackEffect::Projectile { effect, speed } => {
                let Some(size) = effect_size(effect) else {
                    tracing::error!(effect = effect.as_str(), "unknown effect template");
                    return;
                };
                let x = if flip { body.left() - 1.5 * size.w } else { body.right() };
                let y = ((body.center_y() + body.top()) / 2.0).floor();
                let vel = Vec2::new(if flip { -speed } else { *speed }, 0.0);
                if let Some(e) = effects.spawn(effect, Vec2::new(x, y), vel, None, flip) {
                    self.spawn_effect(e.with_mask(mask).with_shake(shake), EffectKind::Rigid, events);
                }
            }
            AttackEffect::Strike { effect, distance } => {
                let Some(size) = effect_size(effect) else {
                    tracing::error!(effect = effect.as_str(), "unknown effect template");
                    return;
                };
                let ahead = body.w * distance;
                let x = if flip {
                    body.left() - ahead - size.w
                } else {
                    body.right() + ahead
                };
                let y = body.bottom() - size.h + 5.0;
                if let Some(e) = effects.spawn(effect, Vec2::new(x, y), Vec2::ZERO, None, flip) {
                    self.spawn_effect(e.with_mask(mask).with_shake(shake), EffectKind::Finishing, events);
                }
            }
            AttackEffect::Breath { effect, damage } => {
                let Some(size) = effect_size(effect) else {
                    tracing::error!(effect = effect.as_str(), "unknown effect template");
                    return;
                };
                let x = if flip { body.left() - size.w } else { body.right() };
                let pos = Vec2::new(x, body.top());
                if let Some(e) = effects.spawn(effect, pos, Vec2::ZERO, None, flip) {
                    self.spawn_effect(e.with_mask(mask).with_shake(shake), EffectKind::Finishing, events);
                }
                self.attack(cfg, &Rect::at(pos, size), *damage, mask, shake, events);
            }
            AttackEffect::Orb { effect, speed } => {
                let Some(size) = effect_size(effect) else {
                    tracing::error!(effect = effect.as_str(), "unknown effect template");
                    return;
                };
                let x = if flip {
                    body.left() - size.w / 2.0
                } else {
                    body.right() + size.w / 2.0
                };
                let vel = Vec2::new(if flip { -speed } else { *speed }, 0.0);
                let pos = Vec2::new(x, body.center_y());
                if let Some(e) = effects.spawn(effect, pos, vel, None, flip) {
                    self.spawn_effect(e.with_mask(mask).with_shake(shake), EffectKind::Finishing, events);
                }
            }
        }
    }
}

/// Top-left that puts a body of `size` on the bottom edge of tile `pos`.
fn standing_on_tile(grid: &SpatialGrid, pos: GridPos, size: Size) -> Vec2 {
    let origin = grid.tile_origin(pos);
    Vec2::new(origin.x, origin.y + grid.tile_size() - size.h)
}

/// The whole mutable state of one match.
#[derive(Clone, Debug)]
pub struct ScrollerState {
    pub config: WorldConfig,
    pub catalog: Arc<Catalog>,
    pub tick: Tick,
    pub world: World,
    /// Gameplay decisions: ally distances, patrol starts.
    pub rng: StdRng,
    /// Particles and shake; never affects gameplay.
    pub ambient: StdRng,
    pub run_held: bool,
    pub power_held: bool,
    pub rally: bool,
    pub mark_hostile: bool,
    pub light_on: bool,
    /// Ticks until the world is rebuilt after the main player died.
    pub restart_in: Option<u32>,
    pub outcome: Option<TerminalOutcome>,
}

impl ScrollerState {
    pub fn new(config: WorldConfig, catalog: Arc<Catalog>, mut world: World, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        world.randomize(&config, &mut rng);
        Self {
            config,
            catalog,
            tick: 0,
            world,
            rng,
            ambient: StdRng::seed_from_u64(seed ^ AMBIENT_STREAM),
            run_held: false,
            power_held: false,
            rally: false,
            mark_hostile: false,
            light_on: false,
            restart_in: None,
            outcome: None,
        }
    }

    /// Replace the world with a fresh copy of the level. Toggles and held
    /// modifiers are cleared; the random streams carry on.
    pub fn restart(&mut self, world: World, events: &mut Vec<ScrollerEvent>) {
        self.world = world;
        self.world.randomize(&self.config, &mut self.rng);
        self.run_held = false;
        self.power_held = false;
        self.rally = false;
        self.mark_hostile = false;
        self.light_on = false;
        self.restart_in = None;
        tracing::info!(tick = self.tick, "world restarted");
        events.push(ScrollerEvent::Restarted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{AnimationDef, AnimationSet};
    use crate::catalog::{AttackDef, CharacterDef};
    use crate::level::LevelBuilder;
    use crate::tiles::Tile;

    const TS: f32 = 32.0;

    fn dummy(name: &str, hp: u32) -> CharacterDef {
        CharacterDef {
            name: name.into(),
            body: Size::new(20.0, 40.0),
            max_hp: hp,
            attacks: vec![AttackDef::now(
                10,
                AttackEffect::Melee {
                    damage: 5,
                    reach: 30.0,
                },
            )],
            attack_period: 10,
            start_full_energy: true,
            died_time: 5,
            vision_width: 300.0,
            attack_distance: 20.0,
            shake: Shake {
                delay: 10,
                intensity: 20,
            },
            animations: AnimationSet::new(AnimationDef::looping(1, 1)),
        }
    }

    fn catalog() -> Catalog {
        let mut c = Catalog::new("hero");
        c.insert(dummy("hero", 100));
        c.insert(dummy("buddy", 50));
        c.insert(dummy("brute", 100));
        c.insert(dummy("imp", 30));
        c.allies = vec!["buddy".into()];
        c.enemies = vec!["brute".into(), "imp".into()];
        c
    }

    fn resources() -> Arc<ResourceTable> {
        let mut r = ResourceTable::new();
        r.register_with_info("ground", 1, "solid").unwrap();
        r.register("npc", 1);
        r.register("entities", 2);
        r.register("coins", 2);
        Arc::new(r)
    }

    fn cfg() -> WorldConfig {
        WorldConfig {
            tile_size: TS,
            ..WorldConfig::default()
        }
    }

    fn world() -> World {
        let level = LevelBuilder::new(TS)
            .base_tile_size(16.0)
            .camera(0.0, 0.0)
            .row(10, -5..=40, "ground", 0)
            .tile(5, 9, "npc", 0)
            .tile(10, 9, "entities", 0)
            .tile(20, 9, "entities", 1)
            .tile(3, 9, "coins", 1)
            .offgrid(40.0, 100.0, "coins", 0)
            .build();
        World::from_level(&level, resources(), &catalog(), &cfg()).unwrap()
    }

    #[test]
    fn spawn_tiles_are_consumed() {
        let w = world();
        assert_eq!(w.allies.len(), 1);
        assert_eq!(w.enemies.len(), 2);
        assert_eq!(w.pickups.len(), 2);
        assert!(!w.grid.has_tile((5, 9)));
        assert!(!w.grid.has_tile((3, 9)));
        assert!(w.grid.offgrid().is_empty());
        assert_eq!(w.grid.tile((0, 10)), Some(&Tile::new("ground", 0)));

        let brute = &w.entities[w.enemies[0]];
        assert_eq!(brute.name(), "brute");
        // Feet on the bottom edge of the spawn tile.
        assert_eq!(brute.rect().bottom(), 10.0 * TS);
        assert_eq!(w.entities[w.enemies[1]].name(), "imp");

        // Off-grid coins are scaled from base-tile pixels.
        let energy = w
            .pickups
            .values()
            .find(|p| p.kind == PickupKind::Energy)
            .unwrap();
        assert_eq!(energy.center, Vec2::new(80.0 + 10.0, 200.0 + 10.0));
    }

    #[test]
    fn unknown_character_fails_the_load() {
        let mut c = catalog();
        c.enemies.push("ghost".into());
        let level = LevelBuilder::new(TS).build();
        let err = World::from_level(&level, resources(), &c, &cfg()).unwrap_err();
        assert!(matches!(err, LoadError::UnknownCharacter(name) if name == "ghost"));
    }

    #[test]
    fn arbiter_hits_one_target_in_group_order() {
        let mut w = world();
        let cfg = cfg();
        let mut events = Vec::new();
        let brute = w.enemies[0];
        let imp = w.enemies[1];
        // Stack the imp onto the brute: one attack, one victim.
        let at = w.entities[brute].pos();
        w.entities[imp].body.pos = at;

        let area = w.entities[brute].rect();
        let hit = w.attack(&cfg, &area, 30, TargetMask::ENEMIES, Shake::default(), &mut events);
        assert_eq!(hit, Some(Hit { target: brute, killed: false }));
        assert_eq!(w.entities[brute].hp, 70);
        assert_eq!(w.entities[imp].hp, 30);

        // Player-side mask ignores enemies entirely.
        let hit = w.attack(&cfg, &area, 30, TargetMask::PLAYER_SIDE, Shake::default(), &mut events);
        assert_eq!(hit, None);
    }

    #[test]
    fn arbiter_skips_the_dead() {
        let mut w = world();
        let cfg = cfg();
        let mut events = Vec::new();
        let brute = w.enemies[0];
        let imp = w.enemies[1];
        w.entities[imp].body.pos = w.entities[brute].pos();
        let area = w.entities[brute].rect();

        w.attack(&cfg, &area, 100, TargetMask::ENEMIES, Shake::default(), &mut events);
        assert!(w.entities[brute].dead);
        assert!(events.contains(&ScrollerEvent::Died { id: brute }));

        let hit = w.attack(&cfg, &area, 10, TargetMask::ENEMIES, Shake::default(), &mut events);
        assert_eq!(hit, Some(Hit { target: imp, killed: false }));
    }

    #[test]
    fn hitting_the_player_shakes_the_screen() {
        let mut w = world();
        let cfg = cfg();
        let mut events = Vec::new();
        let area = w.player().unwrap().rect();
        let shake = Shake {
            delay: 4,
            intensity: 40,
        };
        w.attack(&cfg, &area, 10, TargetMask::PLAYER_SIDE, shake, &mut events);
        assert!(events.contains(&ScrollerEvent::ScreenShake {
            delay: 4,
            intensity: 40
        }));

        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..4 {
            w.update_shake(&mut rng);
            assert!(w.shake.offset.x.abs() <= 40.0);
        }
        w.update_shake(&mut rng);
        assert_eq!(w.shake.offset, Vec2::ZERO);
        assert_eq!(w.shake.remaining, 0);
    }

    #[test]
    fn melee_lands_in_front_of_the_body() {
        let mut w = world();
        let cfg = cfg();
        let factory = EffectFactory::new();
        let mut events = Vec::new();
        let player = w.player;
        let brute = w.enemies[0];
        let body = w.entities[player].rect();
        w.entities[brute].body.pos = Vec2::new(body.right() + 10.0, body.top());

        let melee = AttackEffect::Melee {
            damage: 5,
            reach: 30.0,
        };
        w.entities[player].controls.flip = true;
        w.resolve_attack(&cfg, &factory, player, &melee, &mut events);
        assert_eq!(w.entities[brute].hp, 100);

        w.entities[player].controls.flip = false;
        w.resolve_attack(&cfg, &factory, player, &melee, &mut events);
        assert_eq!(w.entities[brute].hp, 95);
    }

    #[test]
    fn randomize_keeps_the_panic_margin() {
        let mut w = world();
        let cfg = cfg();
        let mut rng = StdRng::seed_from_u64(9);
        w.randomize(&cfg, &mut rng);
        let AiPolicy::AllyFollow(brain) = &w.entities[w.allies[0]].ai else {
            panic!("ally without follow policy");
        };
        assert!(brain.near >= cfg.ally_near_distance);
        assert!(brain.near < cfg.ally_near_distance + cfg.ally_near_jitter);
        assert_eq!(brain.panic, brain.near + cfg.ally_panic_margin);
    }
}
