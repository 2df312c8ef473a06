//! The player's single teleport anchor.

use crate::geom::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

const PARTICLE_CHANCE: f64 = 0.1;
const SPIN: f32 = 0.01;
const DECAY: f32 = 0.1;

/// Ambient particle spiralling into the portal.
#[derive(Clone, Debug, PartialEq)]
pub struct Orbiter {
    pub angle: f32,
    pub distance: f32,
    pub radius: f32,
}

impl Orbiter {
    pub fn pos(&self, center: Vec2) -> Vec2 {
        Vec2::new(
            center.x + self.distance * self.angle.cos(),
            center.y + self.distance * self.angle.sin(),
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Portal {
    pub center: Vec2,
    pub radius: f32,
    pub orbiters: Vec<Orbiter>,
}

impl Portal {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self {
            center,
            radius,
            orbiters: Vec::new(),
        }
    }

    /// Where a teleporting body's top-left lands.
    pub fn arrival(&self) -> Vec2 {
        Vec2::new(self.center.x - self.radius, self.center.y - self.radius)
    }

    pub fn update(&mut self, rng: &mut impl Rng) {
        if rng.gen_bool(PARTICLE_CHANCE) {
            let reach = self.radius * 4.0;
            self.orbiters.push(Orbiter {
                angle: 0.0,
                distance: self.radius + rng.gen::<f32>() * (reach - self.radius),
                radius: rng.gen::<f32>() * 4.0,
            });
        }
        for o in &mut self.orbiters {
            o.angle += SPIN;
            if o.angle > TAU {
                o.angle = 0.0;
            }
            o.distance -= DECAY;
        }
        self.orbiters.retain(|o| o.distance >= 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn orbiters_spiral_in_and_vanish() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut portal = Portal::new(Vec2::new(100.0, 100.0), 40.0);
        for _ in 0..3000 {
            portal.update(&mut rng);
            assert!(portal
                .orbiters
                .iter()
                .all(|o| o.distance >= 0.0 && o.distance <= 160.0));
        }
        assert!(!portal.orbiters.is_empty());
        assert_eq!(portal.arrival(), Vec2::new(60.0, 60.0));
    }
}
