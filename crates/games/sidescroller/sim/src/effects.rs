//! Explosions and projectiles: templates, the spawning factory and the
//! per-instance lifecycle.

use crate::anim::{AnimCursor, AnimationDef};
use crate::catalog::TargetMask;
use crate::config::Shake;
use crate::error::LoadError;
use crate::geom::{Rect, Size, Vec2};
use crate::tiles::SpatialGrid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// What `pos` refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    TopLeft,
    Center,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageMode {
    /// The first hit consumes the damage.
    OneShot,
    /// Keeps damaging every tick it overlaps a target.
    Continuous,
}

/// Follow-up effect spawned when an effect ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinishRule {
    /// Centred on the ending effect.
    BurstAtCenter { effect: String },
    /// Where a thin vertical probe through the ending effect meets the
    /// ground. Nothing spawns if the probe hits no solid tile.
    GroundImpact { effect: String },
}

impl FinishRule {
    pub fn effect(&self) -> &str {
        match self {
            FinishRule::BurstAtCenter { effect } | FinishRule::GroundImpact { effect } => effect,
        }
    }
}

const GROUND_PROBE_WIDTH: f32 = 4.0;

#[derive(Clone, Debug, PartialEq)]
pub struct EffectTemplate {
    pub name: String,
    pub animation: AnimationDef,
    pub size: Size,
    pub anchor: Anchor,
    /// Full animation cycles before the effect disables itself. `None`
    /// repeats forever and relies on collision or the lifetime cap.
    pub repeat_count: Option<u32>,
    pub damage: u32,
    pub damage_mode: DamageMode,
    pub finish: Option<FinishRule>,
}

impl EffectTemplate {
    pub fn new(name: &str, animation: AnimationDef, size: Size) -> Self {
        Self {
            name: name.to_string(),
            animation,
            size,
            anchor: Anchor::TopLeft,
            repeat_count: Some(1),
            damage: 0,
            damage_mode: DamageMode::OneShot,
            finish: None,
        }
    }

    pub fn centered(mut self) -> Self {
        self.anchor = Anchor::Center;
        self
    }

    pub fn repeat(mut self, count: Option<u32>) -> Self {
        self.repeat_count = count;
        self
    }

    pub fn damage(mut self, damage: u32) -> Self {
        self.damage = damage;
        self
    }

    pub fn continuous(mut self) -> Self {
        self.damage_mode = DamageMode::Continuous;
        self
    }

    pub fn finish(mut self, rule: FinishRule) -> Self {
        self.finish = Some(rule);
        self
    }
}

/// Which per-tick pass drives an effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Lives out its animation budget, then may chain a finish effect.
    Finishing,
    /// Dies on the first solid tile or hit.
    Rigid,
}

#[derive(Clone, Debug)]
pub struct Effect {
    pub template: Arc<EffectTemplate>,
    pub pos: Vec2,
    pub vel: Vec2,
    pub cursor: AnimCursor,
    pub damage: u32,
    pub flip: bool,
    pub mask: TargetMask,
    /// Owner's shake, requested when this effect hits the main player.
    pub shake: Shake,
    /// Completed animation cycles.
    pub cycles: u32,
    pub age: u32,
    pub disabled: bool,
}

impl Effect {
    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn with_mask(mut self, mask: TargetMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_shake(mut self, shake: Shake) -> Self {
        self.shake = shake;
        self
    }

    pub fn rect(&self) -> Rect {
        match self.template.anchor {
            Anchor::TopLeft => Rect::at(self.pos, self.template.size),
            Anchor::Center => Rect::centered(self.pos, self.template.size),
        }
    }

    /// Advance animation and position; disable after the repeat budget or
    /// once `max_age` ticks have passed.
    pub fn update(&mut self, max_age: u32) {
        self.cursor.update(&self.template.animation);
        self.pos = self.pos + self.vel;
        self.age += 1;
        if self.cursor.finished() {
            self.cycles += 1;
            if self.template.repeat_count == Some(self.cycles) {
                self.disabled = true;
            }
        }
        if self.age >= max_age {
            self.disabled = true;
        }
    }

    pub fn register_hit(&mut self) {
        if self.template.damage_mode == DamageMode::OneShot {
            self.damage = 0;
        }
    }
}

/// Named effect templates. Every spawn is a fresh instance built from an
/// immutable template.
#[derive(Clone, Debug, Default)]
pub struct EffectFactory {
    templates: BTreeMap<String, Arc<EffectTemplate>>,
}

impl EffectFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: EffectTemplate) {
        self.templates
            .insert(template.name.clone(), Arc::new(template));
    }

    pub fn template(&self, name: &str) -> Option<&EffectTemplate> {
        self.templates.get(name).map(Arc::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Every finish rule must name a known template.
    pub fn validate(&self) -> Result<(), LoadError> {
        for template in self.templates.values() {
            if let Some(rule) = &template.finish {
                if !self.contains(rule.effect()) {
                    return Err(LoadError::UnknownEffect(rule.effect().to_string()));
                }
            }
        }
        Ok(())
    }

    /// New instance of `name`. The template damage applies unless
    /// `damage_override` is given. Unknown names are reported and skipped;
    /// a validated catalog never produces them.
    pub fn spawn(
        &self,
        name: &str,
        pos: Vec2,
        vel: Vec2,
        damage_override: Option<u32>,
        flip: bool,
    ) -> Option<Effect> {
        let Some(template) = self.templates.get(name) else {
            tracing::error!(effect = name, "unknown effect template");
            return None;
        };
        Some(Effect {
            template: Arc::clone(template),
            pos,
            vel,
            cursor: AnimCursor::default(),
            damage: damage_override.unwrap_or(template.damage),
            flip,
            mask: TargetMask::NONE,
            shake: Shake::default(),
            cycles: 0,
            age: 0,
            disabled: false,
        })
    }

    /// Follow-up of an ending effect, if its template has one. The child
    /// inherits the parent's target mask and shake.
    pub fn finish(&self, parent: &Effect, grid: &SpatialGrid) -> Option<Effect> {
        let rule = parent.template.finish.as_ref()?;
        let child = match rule {
            FinishRule::BurstAtCenter { effect } => {
                let center = parent.rect().center();
                let mut child = self.spawn(effect, Vec2::ZERO, Vec2::ZERO, None, false)?;
                child.pos = match child.template.anchor {
                    Anchor::Center => center,
                    Anchor::TopLeft => Vec2::new(
                        center.x - child.template.size.w / 2.0,
                        center.y - child.template.size.h / 2.0,
                    ),
                };
                child
            }
            FinishRule::GroundImpact { effect } => {
                let size = self.template(effect)?.size;
                let outer = parent.rect();
                let probe = Rect::new(
                    outer.center_x() - GROUND_PROBE_WIDTH / 2.0,
                    outer.top(),
                    GROUND_PROBE_WIDTH,
                    outer.h,
                );
                let ground = grid
                    .solid_intersections(&probe)
                    .iter()
                    .map(Rect::top)
                    .reduce(f32::min)?;
                let pos = Vec2::new(
                    outer.center_x() - size.w / 2.0,
                    ground - size.h + size.w / 3.0,
                );
                self.spawn(effect, pos, Vec2::ZERO, None, false)?
            }
        };
        Some(child.with_mask(parent.mask).with_shake(parent.shake))
    }
}
