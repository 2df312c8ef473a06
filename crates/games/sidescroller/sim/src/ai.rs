//! Decision policies for allies and enemies.
//!
//! A policy reads the world and its own brain, and answers with an
//! [`Intent`]: the controls to hold and whether to jump or attack. The
//! systems apply the intent to the entity afterwards.

use crate::config::WorldConfig;
use crate::entity::{Controls, Entity};
use crate::geom::{Rect, Size};
use crate::tiles::SpatialGrid;
use crate::world::{EntityId, World};
use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisionAnchor {
    /// Centred horizontally on the body, top at the body's top.
    Centered,
    /// In front of the body, on the side it faces.
    Facing,
}

/// Rectangle an AI uses to notice hostiles.
#[derive(Clone, Debug, PartialEq)]
pub struct VisionArea {
    pub size: Size,
    pub anchor: VisionAnchor,
    saved: Option<Size>,
}

impl VisionArea {
    pub fn new(size: Size, anchor: VisionAnchor) -> Self {
        Self {
            size,
            anchor,
            saved: None,
        }
    }

    pub fn rect(&self, me: &Entity) -> Rect {
        let body = me.rect();
        let x = match self.anchor {
            VisionAnchor::Centered => body.center_x() - self.size.w / 2.0,
            VisionAnchor::Facing if me.flip() => body.left() - self.size.w,
            VisionAnchor::Facing => body.right(),
        };
        Rect::new(x, body.top(), self.size.w, self.size.h)
    }

    pub fn searching(&self) -> bool {
        self.saved.is_some()
    }

    /// Enlarge both dimensions by `scale`. Repeated calls do not compound.
    pub fn search(&mut self, scale: f32) {
        if self.saved.is_some() {
            return;
        }
        self.saved = Some(self.size);
        self.size = Size::new(self.size.w * scale, self.size.h * scale);
    }

    /// Return to the area in use before [`VisionArea::search`].
    pub fn restore(&mut self) {
        if let Some(size) = self.saved.take() {
            self.size = size;
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AllyBrain {
    pub vision: VisionArea,
    /// Stop following inside this horizontal distance.
    pub near: f32,
    /// Start following beyond this one.
    pub panic: f32,
    /// Idle instead of following beyond this one.
    pub far: f32,
    pub attack_distance: f32,
    /// Summoned: follow the player at a run, ignoring hostiles.
    pub come: bool,
    pub target: Option<EntityId>,
}

impl AllyBrain {
    pub fn new(vision: VisionArea, near: f32, cfg: &WorldConfig, attack_distance: f32) -> Self {
        Self {
            vision,
            near,
            panic: near + cfg.ally_panic_margin,
            far: cfg.ally_far_distance,
            attack_distance,
            come: false,
            target: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatrolBrain {
    pub vision: VisionArea,
    /// Ticks of patrol walk left.
    pub walking: u32,
    pub target: Option<EntityId>,
}

impl PatrolBrain {
    pub fn new(vision: VisionArea) -> Self {
        Self {
            vision,
            walking: 0,
            target: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum AiPolicy {
    /// Driven by player input.
    #[default]
    None,
    AllyFollow(AllyBrain),
    LocalPatrol(PatrolBrain),
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Intent {
    pub controls: Controls,
    pub jump: bool,
    pub attack: bool,
}

impl Intent {
    fn hold(controls: Controls) -> Self {
        Self {
            controls,
            jump: false,
            attack: false,
        }
    }
}

/// True when no tile at all (solid or not) exists in the `depth` rows
/// starting half a tile below the feet, across `length` columns starting
/// half a tile ahead of the leading edge.
pub fn is_cliff(grid: &SpatialGrid, body: &Rect, flip: bool, depth: i32, length: i32) -> bool {
    let ts = grid.tile_size();
    let ahead = (ts / 2.0).floor();
    let y = ((body.bottom() + ahead) / ts).floor() as i32;
    let columns = if flip {
        let x = ((body.left() - ahead) / ts).floor() as i32;
        (x - length + 1)..=x
    } else {
        let x = ((body.right() + ahead) / ts).floor() as i32;
        x..=(x + length - 1)
    };
    columns
        .into_iter()
        .all(|tx| (y..y + depth).all(|ty| !grid.has_tile((tx, ty))))
}

/// Living entity among `candidates` inside `area`, nearest by horizontal
/// distance to `me`. Ties go to the earlier candidate.
fn nearest_hostile(
    world: &World,
    me: &Entity,
    area: &Rect,
    candidates: impl IntoIterator<Item = EntityId>,
) -> Option<EntityId> {
    let mut best: Option<(f32, EntityId)> = None;
    for id in candidates {
        let Some(other) = world.entities.get(id) else {
            continue;
        };
        if other.dead || !other.rect().intersects(area) {
            continue;
        }
        let dx = (other.pos().x - me.pos().x).abs();
        if best.map_or(true, |(d, _)| dx < d) {
            best = Some((dx, id));
        }
    }
    best.map(|(_, id)| id)
}

fn living(world: &World, id: Option<EntityId>) -> Option<EntityId> {
    id.filter(|id| world.entities.get(*id).is_some_and(|e| !e.dead))
}

pub fn ally_intent(world: &World, cfg: &WorldConfig, me_id: EntityId, brain: &mut AllyBrain) -> Intent {
    let Some(me) = world.entities.get(me_id) else {
        return Intent::default();
    };
    let mut intent = Intent::hold(me.controls);
    if me.dead {
        return intent;
    }
    let Some(player) = world.player() else {
        return intent;
    };

    if brain.come {
        follow(world, cfg, me, player, brain, true, &mut intent);
        return intent;
    }

    let area = brain.vision.rect(me);
    brain.target = living(world, brain.target)
        .or_else(|| nearest_hostile(world, me, &area, world.enemies.iter().copied()));

    if let Some(target) = brain.target.and_then(|id| world.entities.get(id)) {
        let theirs = target.rect();
        let mine = me.rect();
        if !theirs.intersects(&area) {
            brain.target = None;
            return intent;
        }
        if theirs.right() + brain.attack_distance < mine.left() {
            intent.controls.head(true);
        } else if theirs.left() - brain.attack_distance > mine.right() {
            intent.controls.head(false);
        } else {
            if me.attacking {
                return intent;
            }
            intent.controls.stop();
            intent.controls.flip = target.pos().x < me.pos().x;
            intent.attack = true;
        }
    } else if (me.pos().x - player.pos().x).abs() > brain.far {
        intent.controls.stop();
        return intent;
    } else {
        follow(world, cfg, me, player, brain, false, &mut intent);
    }

    if me.body.collisions.wall() {
        intent.jump = true;
    }
    intent
}

/// Follow the main player with hysteresis: stop inside `near`, set off
/// beyond `panic`, and keep doing whatever it was doing in between.
fn follow(
    world: &World,
    cfg: &WorldConfig,
    me: &Entity,
    player: &Entity,
    brain: &AllyBrain,
    force_run: bool,
    intent: &mut Intent,
) {
    let theirs = player.rect();
    let dx = (theirs.x - me.pos().x).abs();
    if dx < brain.near {
        intent.controls.stop();
        return;
    }
    if dx > brain.panic {
        intent.controls.head(theirs.x < me.pos().x);
        intent.controls.running = force_run || player.controls.running;
    }
    if me.body.collisions.wall() {
        intent.jump = true;
    }

    // Only mind the ground when the player is not far below.
    if theirs.top() > me.pos().y + 2.0 * cfg.tile_size {
        return;
    }
    let body = me.rect();
    let flip = intent.controls.flip;
    if is_cliff(&world.grid, &body, flip, 3, 3) {
        intent.controls.stop();
    } else if is_cliff(&world.grid, &body, flip, 3, 1) {
        intent.jump = true;
    }
}

/// Enemy patrol. Call after the entity's own update for the tick. The
/// caller must apply `attack` before the controls, and stop the entity
/// (clearing `walking`) if it ends up attacking.
pub fn patrol_intent(
    world: &World,
    cfg: &WorldConfig,
    rng: &mut impl Rng,
    me_id: EntityId,
    brain: &mut PatrolBrain,
) -> Intent {
    let Some(me) = world.entities.get(me_id) else {
        return Intent::default();
    };
    let mut intent = Intent::hold(me.controls);
    if me.dead {
        return intent;
    }
    brain.walking = brain.walking.saturating_sub(1);

    let area = brain.vision.rect(me);
    brain.target = living(world, brain.target).or_else(|| {
        let candidates = std::iter::once(world.player).chain(world.allies.iter().copied());
        nearest_hostile(world, me, &area, candidates)
    });
    if let Some(target) = brain.target.and_then(|id| world.entities.get(id)) {
        intent.attack = target.rect().intersects(&area);
    }

    if me.attacking {
        brain.walking = 0;
        intent.controls.stop();
        return intent;
    }
    if brain.walking > 0 {
        let blocked = me.body.collisions.wall();
        if blocked || is_cliff(&world.grid, &me.rect(), me.flip(), 1, 1) {
            intent.controls.flip = !intent.controls.flip;
        }
        let flip = intent.controls.flip;
        intent.controls.head(flip);
    } else if rng.gen_bool(cfg.patrol_start_chance.clamp(0.0, 1.0)) {
        brain.walking = cfg.patrol_ticks;
    } else {
        intent.controls.left = false;
        intent.controls.right = false;
    }
    intent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{AnimationDef, AnimationSet};
    use crate::catalog::CharacterDef;
    use crate::config::Shake;
    use crate::entity::Faction;
    use crate::geom::Vec2;
    use crate::tiles::{ResourceTable, Tile};
    use std::sync::Arc;

    fn body_def(name: &str) -> Arc<CharacterDef> {
        Arc::new(CharacterDef {
            name: name.into(),
            body: Size::new(20.0, 40.0),
            max_hp: 50,
            attacks: Vec::new(),
            attack_period: 10,
            start_full_energy: false,
            died_time: 5,
            vision_width: 900.0,
            attack_distance: 20.0,
            shake: Shake {
                delay: 0,
                intensity: 0,
            },
            animations: AnimationSet::new(AnimationDef::looping(1, 1)),
        })
    }

    fn grid() -> SpatialGrid {
        let mut res = ResourceTable::new();
        res.register_with_info("ground", 1, "solid").unwrap();
        res.register("grass", 1);
        let mut g = SpatialGrid::new(32.0, Arc::new(res));
        for x in 0..10 {
            g.insert((x, 10), Tile::new("ground", 0));
        }
        // Non-solid decoration still counts as ground for cliff probing.
        g.insert((12, 11), Tile::new("grass", 0));
        g
    }

    #[test]
    fn cliff_probe_looks_ahead_of_the_leading_edge() {
        let g = grid();
        // Standing on the floor, feet at y = 320.
        let inside = Rect::new(100.0, 280.0, 20.0, 40.0);
        assert!(!is_cliff(&g, &inside, false, 3, 1));
        assert!(!is_cliff(&g, &inside, true, 3, 1));

        // Right edge at 300: probe column (300 + 16) / 32 = 9, still floor.
        let near_edge = Rect::new(280.0, 280.0, 20.0, 40.0);
        assert!(!is_cliff(&g, &near_edge, false, 3, 1));
        // Three columns ahead reach 10 and 11, but 9 is floor.
        assert!(!is_cliff(&g, &near_edge, false, 3, 3));

        // Past the edge: columns 10.. are empty except grass at (12, 11).
        let over = Rect::new(300.0, 280.0, 20.0, 40.0);
        assert!(is_cliff(&g, &over, false, 3, 1));
        assert!(!is_cliff(&g, &over, false, 3, 3));
        assert!(is_cliff(&g, &over, false, 1, 3));
    }

    #[test]
    fn search_scales_and_restores() {
        let mut v = VisionArea::new(Size::new(900.0, 48.0), VisionAnchor::Centered);
        v.search(10.0);
        v.search(10.0);
        assert_eq!(v.size, Size::new(9000.0, 480.0));
        assert!(v.searching());
        v.restore();
        assert_eq!(v.size, Size::new(900.0, 48.0));
        v.restore();
        assert_eq!(v.size, Size::new(900.0, 48.0));
    }

    #[test]
    fn ally_locks_onto_the_nearest_hostile_until_it_leaves_sight() {
        let cfg = WorldConfig {
            tile_size: 32.0,
            ..WorldConfig::default()
        };
        let at = |x: f32| Vec2::new(x, 280.0);
        let player = Entity::spawn(body_def("hero"), Faction::Player, at(0.0), AiPolicy::None);
        let mut world = World::new(grid(), player);
        let me = world.add_entity(Entity::spawn(body_def("buddy"), Faction::Ally, at(500.0), AiPolicy::None));
        let far = world.add_entity(Entity::spawn(body_def("brute"), Faction::Enemy, at(700.0), AiPolicy::None));
        let near = world.add_entity(Entity::spawn(body_def("imp"), Faction::Enemy, at(350.0), AiPolicy::None));

        let vision = VisionArea::new(Size::new(900.0, 48.0), VisionAnchor::Centered);
        let mut brain = AllyBrain::new(vision, 100.0, &cfg, 20.0);

        let intent = ally_intent(&world, &cfg, me, &mut brain);
        assert_eq!(brain.target, Some(near));
        assert!(intent.controls.left && !intent.attack);

        if let Some(imp) = world.entities.get_mut(near) {
            imp.hp = 0;
            imp.dead = true;
        }
        let intent = ally_intent(&world, &cfg, me, &mut brain);
        assert_eq!(brain.target, Some(far));
        assert!(intent.controls.right);

        if let Some(brute) = world.entities.get_mut(far) {
            brute.body.pos.x = 3000.0;
        }
        ally_intent(&world, &cfg, me, &mut brain);
        assert_eq!(brain.target, None);
    }
}
