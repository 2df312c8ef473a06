//! Content: character definitions, their attacks, and the effect templates
//! those attacks spawn.

use crate::anim::{AnimationDef, AnimationSet};
use crate::config::{Shake, WorldConfig};
use crate::effects::{EffectFactory, EffectTemplate, FinishRule};
use crate::entity::EntityState;
use crate::error::LoadError;
use crate::geom::Size;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Target groups an attack may damage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetMask {
    pub player: bool,
    pub enemies: bool,
    pub allies: bool,
}

impl TargetMask {
    pub const NONE: TargetMask = TargetMask {
        player: false,
        enemies: false,
        allies: false,
    };
    pub const ENEMIES: TargetMask = TargetMask {
        player: false,
        enemies: true,
        allies: false,
    };
    pub const PLAYER_SIDE: TargetMask = TargetMask {
        player: true,
        enemies: false,
        allies: true,
    };
}

/// What an attack does when it lands. Geometry is relative to the attacker's
/// body and facing.
#[derive(Clone, Debug, PartialEq)]
pub enum AttackEffect {
    /// Strike the full-height area directly in front of the body.
    Melee { damage: u32, reach: f32 },
    /// Strike an area standing on the body's feet, flush with its back edge.
    /// `petrify` turns a killed main player to stone.
    FootMelee {
        damage: u32,
        size: Size,
        petrify: bool,
    },
    /// Rigid projectile launched from the front edge at mid-upper height.
    Projectile { effect: String, speed: f32 },
    /// Finishing effect dropped `distance` body widths ahead, standing on the
    /// attacker's feet line.
    Strike { effect: String, distance: f32 },
    /// Visual effect in front of the body plus an immediate area attack the
    /// size of that effect.
    Breath { effect: String, damage: u32 },
    /// Slow centred orb travelling forward from mid-body.
    Orb { effect: String, speed: f32 },
}

impl AttackEffect {
    pub fn effect_name(&self) -> Option<&str> {
        match self {
            AttackEffect::Melee { .. } | AttackEffect::FootMelee { .. } => None,
            AttackEffect::Projectile { effect, .. }
            | AttackEffect::Strike { effect, .. }
            | AttackEffect::Breath { effect, .. }
            | AttackEffect::Orb { effect, .. } => Some(effect),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttackDef {
    pub cost: u32,
    pub effect: AttackEffect,
    /// Ticks between starting the attack and applying `effect`.
    pub delay: u32,
}

impl AttackDef {
    pub fn now(cost: u32, effect: AttackEffect) -> Self {
        Self {
            cost,
            effect,
            delay: 0,
        }
    }
}

/// Immutable per-character data shared by every instance.
#[derive(Clone, Debug)]
pub struct CharacterDef {
    pub name: String,
    pub body: Size,
    pub max_hp: u32,
    /// Tier 1 first.
    pub attacks: Vec<AttackDef>,
    /// Cooldown ticks after an attack starts.
    pub attack_period: u32,
    pub start_full_energy: bool,
    /// Ticks a corpse stays before removal.
    pub died_time: u32,
    pub vision_width: f32,
    /// Ally range at which it stops approaching and attacks.
    pub attack_distance: f32,
    /// Shake requested when one of this character's direct attacks hits the
    /// main player.
    pub shake: Shake,
    pub animations: AnimationSet,
}

impl CharacterDef {
    pub fn attack(&self, tier: u8) -> Option<&AttackDef> {
        let idx = (tier as usize).checked_sub(1)?;
        self.attacks.get(idx)
    }

    /// Energy pool: the most expensive attack.
    pub fn max_energy(&self) -> u32 {
        self.attacks.iter().map(|a| a.cost).max().unwrap_or(0)
    }
}

/// Every character and effect the world can spawn, plus the mapping from
/// spawn tile variants to characters.
#[derive(Clone, Debug)]
pub struct Catalog {
    characters: BTreeMap<String, Arc<CharacterDef>>,
    pub effects: EffectFactory,
    pub player: String,
    /// `npc` tile variant i spawns `allies[i]`.
    pub allies: Vec<String>,
    /// `entities` tile variant i spawns `enemies[i]`.
    pub enemies: Vec<String>,
}

impl Catalog {
    pub fn new(player: &str) -> Self {
        Self {
            characters: BTreeMap::new(),
            effects: EffectFactory::new(),
            player: player.to_string(),
            allies: Vec::new(),
            enemies: Vec::new(),
        }
    }

    pub fn insert(&mut self, def: CharacterDef) {
        self.characters.insert(def.name.clone(), Arc::new(def));
    }

    pub fn character(&self, name: &str) -> Result<Arc<CharacterDef>, LoadError> {
        self.characters
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::UnknownCharacter(name.to_string()))
    }

    /// Every referenced character and effect must exist.
    pub fn validate(&self) -> Result<(), LoadError> {
        self.effects.validate()?;
        let names = std::iter::once(&self.player)
            .chain(&self.allies)
            .chain(&self.enemies);
        for name in names {
            self.character(name)?;
        }
        for def in self.characters.values() {
            for attack in &def.attacks {
                if let Some(effect) = attack.effect.effect_name() {
                    if !self.effects.contains(effect) {
                        return Err(LoadError::UnknownEffect(effect.to_string()));
                    }
                }
            }
        }
        Ok(())
    }

    /// The standard roster, sized for `cfg.tile_size`.
    pub fn standard(cfg: &WorldConfig) -> Self {
        let ts = cfg.tile_size;
        let mut catalog = Catalog::new("wizard");
        catalog.effects = standard_effects(ts);

        let died_time = cfg.death_display_ticks();
        let heroes = [wizard(ts), swordsman(), archer()];
        let monsters = [
            demon(),
            dragon(),
            jinn(),
            lizard(),
            medusa(),
            small_dragon(),
        ];
        for mut def in heroes {
            def.died_time = died_time;
            catalog.allies.push(def.name.clone());
            catalog.insert(def);
        }
        for mut def in monsters {
            if def.died_time == 0 {
                def.died_time = died_time;
            }
            catalog.enemies.push(def.name.clone());
            catalog.insert(def);
        }
        catalog.allies.sort();
        catalog.enemies.sort();
        catalog
    }
}

pub const WIZARD_FIREBALL: &str = "wizard attack 1";
pub const RED_EXPLOSION: &str = "red explosion 1";
pub const BLUE_EXPLOSION: &str = "blue explosion 8";
pub const LIGHTNING: &str = "lightning 1";
pub const ARROW: &str = "arrow";
pub const DRAGON_FIRE: &str = "dragon_fire";
pub const SMALL_DRAGON_FIRE: &str = "small_dragon_fire";
pub const JINN_BALL: &str = "jinn_ball";

fn standard_effects(ts: f32) -> EffectFactory {
    let mut f = EffectFactory::new();
    f.insert(
        EffectTemplate::new(WIZARD_FIREBALL, AnimationDef::looping(4, 7), Size::square(ts / 2.0))
            .repeat(None)
            .damage(20)
            .finish(FinishRule::BurstAtCenter {
                effect: RED_EXPLOSION.into(),
            }),
    );
    f.insert(EffectTemplate::new(
        RED_EXPLOSION,
        AnimationDef::looping(8, 2),
        Size::square(ts * 2.0),
    ));
    f.insert(
        EffectTemplate::new(BLUE_EXPLOSION, AnimationDef::looping(10, 3), Size::square(ts * 3.0))
            .damage(80),
    );
    f.insert(
        EffectTemplate::new(LIGHTNING, AnimationDef::looping(8, 5), Size::new(ts * 1.5, ts * 4.0))
            .finish(FinishRule::GroundImpact {
                effect: BLUE_EXPLOSION.into(),
            }),
    );
    f.insert(
        EffectTemplate::new(ARROW, AnimationDef::looping(1, 100), Size::new(ts / 2.0, ts / 4.0))
            .repeat(None)
            .damage(20),
    );
    f.insert(EffectTemplate::new(
        DRAGON_FIRE,
        AnimationDef::looping(6, 10),
        Size::new(ts * 2.0, ts),
    ));
    f.insert(EffectTemplate::new(
        SMALL_DRAGON_FIRE,
        AnimationDef::looping(6, 10),
        Size::new(ts * 1.5, ts * 0.75),
    ));
    f.insert(
        EffectTemplate::new(JINN_BALL, AnimationDef::looping(6, 8), Size::square(ts * 0.75))
            .centered()
            .damage(30),
    );
    f
}

const STONE: AnimationDef = AnimationDef::once(8, 12);

/// Strips shared by the three heroes.
struct HeroStrips {
    idle: AnimationDef,
    walk: AnimationDef,
    run: AnimationDef,
    jump_frames: u32,
    hurt_frames: u32,
    dead_frames: u32,
    attacks: [AnimationDef; 3],
}

fn hero_animations(s: HeroStrips) -> AnimationSet {
    AnimationSet::new(s.idle)
        .with(EntityState::Walk, s.walk)
        .with(EntityState::Run, s.run)
        .with(EntityState::Jump, AnimationDef::once(s.jump_frames, 5))
        .with(EntityState::Falling, AnimationDef::once(s.jump_frames, 0))
        .with(EntityState::Hurt, AnimationDef::looping(s.hurt_frames, 10))
        .with(EntityState::Dead, AnimationDef::once(s.dead_frames, 25))
        .with(EntityState::Petrified, STONE)
        .with(EntityState::Attack1, s.attacks[0])
        .with(EntityState::Attack2, s.attacks[1])
        .with(EntityState::Attack3, s.attacks[2])
}

fn hero(name: &str, hp: u32, attacks: Vec<AttackDef>, animations: AnimationSet) -> CharacterDef {
    CharacterDef {
        name: name.to_string(),
        body: Size::new(40.0, 80.0),
        max_hp: hp,
        attacks,
        attack_period: 0,
        start_full_energy: true,
        died_time: 0,
        vision_width: 900.0,
        attack_distance: 0.0,
        shake: Shake::default(),
        animations,
    }
}

fn wizard(ts: f32) -> CharacterDef {
    let mut def = hero(
        "wizard",
        100,
        vec![
            AttackDef::now(
                120,
                AttackEffect::Melee {
                    damage: 20,
                    reach: 70.0,
                },
            ),
            AttackDef::now(
                480,
                AttackEffect::Projectile {
                    effect: WIZARD_FIREBALL.into(),
                    speed: 10.0,
                },
            ),
            AttackDef::now(
                1800,
                AttackEffect::Strike {
                    effect: LIGHTNING.into(),
                    distance: 4.0,
                },
            ),
        ],
        hero_animations(HeroStrips {
            idle: AnimationDef::looping(6, 10),
            walk: AnimationDef::looping(7, 7),
            run: AnimationDef::looping(8, 7),
            jump_frames: 11,
            hurt_frames: 4,
            dead_frames: 4,
            attacks: [
                AnimationDef::looping(7, 4),
                AnimationDef::looping(4, 4),
                AnimationDef::looping(10, 3),
            ],
        }),
    );
    def.attack_distance = ts;
    def
}

fn swordsman() -> CharacterDef {
    let slash = |damage| AttackEffect::Melee {
        damage,
        reach: 80.0,
    };
    let mut def = hero(
        "swordsman",
        100,
        vec![
            AttackDef::now(60, slash(20)),
            AttackDef::now(480, slash(40)),
            AttackDef::now(1800, slash(100)),
        ],
        hero_animations(HeroStrips {
            idle: AnimationDef::looping(8, 10),
            walk: AnimationDef::looping(8, 7),
            run: AnimationDef::looping(8, 7),
            jump_frames: 8,
            hurt_frames: 3,
            dead_frames: 3,
            attacks: [
                AnimationDef::looping(4, 4),
                AnimationDef::looping(3, 5),
                AnimationDef::looping(6, 4),
            ],
        }),
    );
    def.attack_period = 40;
    def.vision_width = 800.0;
    def.attack_distance = 50.0;
    def
}

fn archer() -> CharacterDef {
    let shot = || {
        AttackDef::now(
            60,
            AttackEffect::Projectile {
                effect: ARROW.into(),
                speed: 10.0,
            },
        )
    };
    let draw = AnimationDef::looping(4, 6);
    let mut def = hero(
        "archer",
        100,
        vec![shot(), shot(), shot()],
        hero_animations(HeroStrips {
            idle: AnimationDef::looping(6, 8),
            walk: AnimationDef::looping(8, 5),
            run: AnimationDef::looping(8, 7),
            jump_frames: 9,
            hurt_frames: 3,
            dead_frames: 3,
            attacks: [draw, draw, draw],
        }),
    );
    def.vision_width = 900.0;
    def.attack_distance = 900.0;
    def
}

/// Strips of a monster: idle, walk, attack; hurt and death play once.
fn monster_animations(
    idle: AnimationDef,
    walk: AnimationDef,
    attack: AnimationDef,
    hurt_frames: u32,
    death_frames: u32,
) -> AnimationSet {
    AnimationSet::new(idle)
        .with(EntityState::Walk, walk)
        .with(EntityState::Attack1, attack)
        .with(EntityState::Hurt, AnimationDef::once(hurt_frames, 7))
        .with(EntityState::Dead, AnimationDef::once(death_frames, 10))
}

fn monster(
    name: &str,
    body: Size,
    hp: u32,
    vision_width: f32,
    attack: AttackDef,
    shake: Shake,
    animations: AnimationSet,
) -> CharacterDef {
    CharacterDef {
        name: name.to_string(),
        body,
        max_hp: hp,
        attacks: vec![attack],
        attack_period: 0,
        start_full_energy: false,
        died_time: 0,
        vision_width,
        attack_distance: 0.0,
        shake,
        animations,
    }
}

fn demon() -> CharacterDef {
    let shake = Shake {
        delay: 50,
        intensity: 100,
    };
    monster(
        "demon",
        Size::new(64.0, 96.0),
        200,
        70.0,
        AttackDef::now(
            60,
            AttackEffect::FootMelee {
                damage: 20,
                size: Size::new(128.0, 96.0),
                petrify: false,
            },
        ),
        shake,
        monster_animations(
            AnimationDef::looping(6, 15),
            AnimationDef::looping(12, 7),
            AnimationDef::looping(15, 7),
            5,
            22,
        ),
    )
}

fn dragon() -> CharacterDef {
    monster(
        "dragon",
        Size::new(96.0, 80.0),
        500,
        110.0,
        AttackDef::now(
            180,
            AttackEffect::Breath {
                effect: DRAGON_FIRE.into(),
                damage: 50,
            },
        ),
        Shake {
            delay: 50,
            intensity: 140,
        },
        monster_animations(
            AnimationDef::looping(3, 30),
            AnimationDef::looping(5, 15),
            AnimationDef::looping(4, 15),
            2,
            5,
        ),
    )
}

fn jinn() -> CharacterDef {
    let mut def = monster(
        "jinn",
        Size::new(48.0, 64.0),
        120,
        200.0,
        AttackDef::now(
            360,
            AttackEffect::Orb {
                effect: JINN_BALL.into(),
                speed: 3.0,
            },
        ),
        Shake::default(),
        monster_animations(
            AnimationDef::looping(3, 14),
            AnimationDef::looping(4, 7),
            AnimationDef::looping(4, 15),
            4,
            6,
        ),
    );
    def.died_time = 60;
    def
}

fn lizard() -> CharacterDef {
    monster(
        "lizard",
        Size::new(48.0, 64.0),
        100,
        70.0,
        AttackDef::now(
            180,
            AttackEffect::FootMelee {
                damage: 20,
                size: Size::new(96.0, 64.0),
                petrify: false,
            },
        ),
        Shake {
            delay: 50,
            intensity: 60,
        },
        monster_animations(
            AnimationDef::looping(3, 14),
            AnimationDef::looping(6, 7),
            AnimationDef::looping(5, 15),
            2,
            6,
        ),
    )
}

fn medusa() -> CharacterDef {
    let gaze = AnimationDef::looping(6, 10);
    monster(
        "medusa",
        Size::new(48.0, 72.0),
        100,
        70.0,
        AttackDef {
            cost: 180,
            effect: AttackEffect::FootMelee {
                damage: 70,
                size: Size::new(120.0, 72.0),
                petrify: true,
            },
            // Lands on the fourth frame of the gaze.
            delay: gaze.frame_duration * 3,
        },
        Shake {
            delay: 50,
            intensity: 150,
        },
        monster_animations(
            AnimationDef::looping(3, 14),
            AnimationDef::looping(4, 7),
            gaze,
            2,
            6,
        ),
    )
}

fn small_dragon() -> CharacterDef {
    monster(
        "small_dragon",
        Size::new(64.0, 56.0),
        60,
        110.0,
        AttackDef::now(
            180,
            AttackEffect::Breath {
                effect: SMALL_DRAGON_FIRE.into(),
                damage: 10,
            },
        ),
        Shake {
            delay: 30,
            intensity: 40,
        },
        monster_animations(
            AnimationDef::looping(3, 14),
            AnimationDef::looping(4, 7),
            AnimationDef::looping(3, 10),
            2,
            5,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_consistent() {
        let catalog = Catalog::standard(&WorldConfig::default());
        catalog.validate().unwrap();
        assert_eq!(catalog.allies, vec!["archer", "swordsman", "wizard"]);
        assert_eq!(
            catalog.enemies,
            vec!["demon", "dragon", "jinn", "lizard", "medusa", "small_dragon"]
        );
    }

    #[test]
    fn energy_pool_is_the_costliest_attack() {
        let catalog = Catalog::standard(&WorldConfig::default());
        let wizard = catalog.character("wizard").unwrap();
        assert_eq!(wizard.max_energy(), 1800);
        assert_eq!(wizard.attack(2).unwrap().cost, 480);
        assert!(wizard.attack(0).is_none());
        assert!(wizard.attack(4).is_none());
        assert_eq!(catalog.character("archer").unwrap().max_energy(), 60);
    }

    #[test]
    fn died_time_defaults_to_death_display() {
        let catalog = Catalog::standard(&WorldConfig::default());
        assert_eq!(catalog.character("demon").unwrap().died_time, 600);
        assert_eq!(catalog.character("jinn").unwrap().died_time, 60);
        assert_eq!(catalog.character("swordsman").unwrap().died_time, 600);
    }

    #[test]
    fn unknown_names_fail_validation() {
        let mut catalog = Catalog::standard(&WorldConfig::default());
        assert!(matches!(
            catalog.character("goblin"),
            Err(LoadError::UnknownCharacter(_))
        ));
        catalog.enemies.push("goblin".into());
        assert!(catalog.validate().is_err());
    }
}
