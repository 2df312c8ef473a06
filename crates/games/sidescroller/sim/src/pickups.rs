//! Coins that restore energy or health when the main player touches them.

use crate::entity::Entity;
use crate::geom::{Rect, Vec2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupKind {
    Energy,
    Health,
}

impl PickupKind {
    /// Kind spawned by `coins` tile variant `variant`.
    pub fn from_variant(variant: usize) -> Option<Self> {
        match variant {
            0 => Some(PickupKind::Energy),
            1 => Some(PickupKind::Health),
            _ => None,
        }
    }
}

/// Ambient spark; drawn only, never collides.
#[derive(Clone, Debug, PartialEq)]
pub struct Spark {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: u8,
    pub ttl: i32,
}

const SPARK_CHANCE: f64 = 0.2;

#[derive(Clone, Debug, PartialEq)]
pub struct Pickup {
    pub kind: PickupKind,
    pub center: Vec2,
    pub radius: f32,
    pub sparks: Vec<Spark>,
}

impl Pickup {
    /// `corner` is the top-left of the tile the coin was placed on.
    pub fn new(kind: PickupKind, corner: Vec2, radius: f32) -> Self {
        Self {
            kind,
            center: Vec2::new(corner.x + radius, corner.y + radius),
            radius,
            sparks: Vec::new(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(
            self.center.x - self.radius,
            self.center.y - self.radius,
            2.0 * self.radius,
            2.0 * self.radius,
        )
    }

    pub fn update_sparks(&mut self, rng: &mut impl Rng) {
        for spark in &mut self.sparks {
            spark.pos = spark.pos + spark.vel;
            spark.ttl -= 1;
        }
        self.sparks.retain(|s| s.ttl >= 0);
        if rng.gen_bool(SPARK_CHANCE) {
            let angle = rng.gen::<f32>() * TAU;
            self.sparks.push(Spark {
                pos: self.center,
                vel: Vec2::new(angle.cos(), angle.sin()),
                radius: rng.gen_range(1..=3),
                ttl: rng.gen_range(1..=60),
            });
        }
    }

    /// Restore half of the matching pool, capped at its maximum.
    pub fn apply(&self, player: &mut Entity) {
        match self.kind {
            PickupKind::Energy => player.restore_energy(player.max_energy / 2),
            PickupKind::Health => player.heal(player.max_hp / 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn coin_sits_in_the_tile_corner() {
        let p = Pickup::new(PickupKind::Energy, Vec2::new(96.0, 48.0), 10.0);
        assert_eq!(p.center, Vec2::new(106.0, 58.0));
        assert_eq!(p.rect(), Rect::new(96.0, 48.0, 20.0, 20.0));
    }

    #[test]
    fn sparks_expire() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = Pickup::new(PickupKind::Health, Vec2::ZERO, 10.0);
        for _ in 0..500 {
            p.update_sparks(&mut rng);
            assert!(p.sparks.iter().all(|s| s.ttl >= 0 && s.ttl <= 60));
        }
        assert!(p.sparks.len() < 60);
    }

    #[test]
    fn unknown_coin_variant() {
        assert_eq!(PickupKind::from_variant(1), Some(PickupKind::Health));
        assert_eq!(PickupKind::from_variant(2), None);
    }
}
