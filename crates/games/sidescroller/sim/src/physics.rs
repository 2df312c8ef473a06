//! Axis-separated movement against the static tile grid.
//!
//! Each step applies horizontal velocity and resolves it, then adds gravity,
//! applies vertical velocity and resolves that. Resolution snaps the leading
//! edge to the first colliding tile in scan order and zeroes the velocity on
//! that axis, so later tiles in the same scan are never used for correction.

use crate::config::WorldConfig;
use crate::geom::{Rect, Size, Vec2};
use crate::tiles::SpatialGrid;
use serde::{Deserialize, Serialize};

/// Contacts found during the most recent step. Never accumulated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collisions {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl Collisions {
    pub fn wall(&self) -> bool {
        self.left || self.right
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsBody {
    /// Top-left corner.
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Size,
    pub collisions: Collisions,
}

impl PhysicsBody {
    pub fn new(pos: Vec2, size: Size) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            size,
            collisions: Collisions::default(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::at(self.pos, self.size)
    }

    pub fn grounded(&self) -> bool {
        self.collisions.bottom
    }

    pub fn step(&mut self, grid: &SpatialGrid, cfg: &WorldConfig) {
        self.move_x(grid);
        self.move_y(grid, cfg);
        self.settle(grid);
    }

    fn move_x(&mut self, grid: &SpatialGrid) {
        self.collisions.left = false;
        self.collisions.right = false;
        self.pos.x += self.vel.x;
        let mut rect = self.rect();
        for tile in grid.solid_intersections(&rect) {
            if self.vel.x > 0.0 {
                self.collisions.right = true;
                rect.set_right(tile.left());
            } else if self.vel.x < 0.0 {
                self.collisions.left = true;
                rect.x = tile.right();
            }
            self.vel.x = 0.0;
        }
        self.pos.x = rect.x;
    }

    fn move_y(&mut self, grid: &SpatialGrid, cfg: &WorldConfig) {
        self.collisions.top = false;
        self.collisions.bottom = false;
        self.vel.y = (self.vel.y + cfg.gravity).min(cfg.max_fall_speed);
        self.pos.y += self.vel.y;
        let mut rect = self.rect();
        for tile in grid.solid_intersections(&rect) {
            if self.vel.y > 0.0 {
                self.collisions.bottom = true;
                rect.set_bottom(tile.top());
            } else if self.vel.y < 0.0 {
                self.collisions.top = true;
                rect.y = tile.bottom();
            }
            self.vel.y = 0.0;
        }
        self.pos.y = rect.y;
    }

    /// Containment check. A body still overlapping solid tiles after both
    /// axes (it was resting inside one with zero velocity, or a correction
    /// left it in a second tile) is lifted onto the highest tile it overlaps
    /// and counts as standing on it.
    fn settle(&mut self, grid: &SpatialGrid) {
        let rect = self.rect();
        let hits = grid.solid_intersections(&rect);
        let Some(top) = hits.iter().map(Rect::top).reduce(f32::min) else {
            return;
        };
        self.pos.y = top - self.size.h;
        self.vel.y = 0.0;
        self.collisions.bottom = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::{ResourceTable, Tile};
    use std::sync::Arc;

    const TS: f32 = 32.0;

    fn grid() -> SpatialGrid {
        let mut res = ResourceTable::new();
        res.register_with_info("ground", 1, "solid").unwrap();
        let mut g = SpatialGrid::new(TS, Arc::new(res));
        for x in -2..12 {
            g.insert((x, 10), Tile::new("ground", 0));
        }
        // A wall on the right.
        for y in 5..10 {
            g.insert((8, y), Tile::new("ground", 0));
        }
        g
    }

    fn cfg() -> WorldConfig {
        WorldConfig {
            tile_size: TS,
            ..WorldConfig::default()
        }
    }

    #[test]
    fn falling_body_lands_on_floor_without_tunneling() {
        let grid = grid();
        let cfg = cfg();
        let floor = 10.0 * TS;
        let mut body = PhysicsBody::new(Vec2::new(40.0, 0.0), Size::new(20.0, 40.0));
        for _ in 0..200 {
            body.step(&grid, &cfg);
            assert!(body.rect().bottom() <= floor);
        }
        assert_eq!(body.rect().bottom(), floor);
        assert!(body.collisions.bottom);
        assert_eq!(body.vel.y, 0.0);
    }

    #[test]
    fn resting_body_reports_ground_every_tick() {
        let grid = grid();
        let cfg = cfg();
        let mut body = PhysicsBody::new(Vec2::new(40.0, 10.0 * TS - 40.0), Size::new(20.0, 40.0));
        for _ in 0..5 {
            body.step(&grid, &cfg);
            assert!(body.grounded());
            assert_eq!(body.pos.y, 10.0 * TS - 40.0);
        }
    }

    #[test]
    fn wall_blocks_horizontal_motion() {
        let grid = grid();
        let cfg = cfg();
        let mut body = PhysicsBody::new(Vec2::new(200.0, 10.0 * TS - 40.0), Size::new(20.0, 40.0));
        for _ in 0..60 {
            body.vel.x = 5.0;
            body.step(&grid, &cfg);
        }
        assert_eq!(body.rect().right(), 8.0 * TS);
        assert!(body.collisions.right);
        assert!(!body.collisions.left);
        assert_eq!(body.vel.x, 0.0);
    }

    #[test]
    fn jumping_into_ceiling_sets_top() {
        let mut res = ResourceTable::new();
        res.register_with_info("ground", 1, "solid").unwrap();
        let mut g = SpatialGrid::new(TS, Arc::new(res));
        g.insert((0, 0), Tile::new("ground", 0));
        let cfg = cfg();
        let mut body = PhysicsBody::new(Vec2::new(4.0, 34.0), Size::new(20.0, 20.0));
        body.vel.y = -10.0;
        body.step(&g, &cfg);
        assert!(body.collisions.top);
        assert_eq!(body.pos.y, TS);
        assert_eq!(body.vel.y, 0.0);
    }

    #[test]
    fn zero_gravity_overlap_is_lifted_out() {
        let grid = grid();
        let cfg = WorldConfig {
            gravity: 0.0,
            ..cfg()
        };
        // Sunk 10px into the floor, no velocity at all.
        let mut body = PhysicsBody::new(Vec2::new(40.0, 10.0 * TS - 30.0), Size::new(20.0, 40.0));
        body.step(&grid, &cfg);
        assert_eq!(body.rect().bottom(), 10.0 * TS);
        assert!(body.collisions.bottom);

        // Stays put afterwards.
        body.step(&grid, &cfg);
        assert_eq!(body.rect().bottom(), 10.0 * TS);
        assert!(grid.solid_intersections(&body.rect()).is_empty());
    }

    #[test]
    fn flags_are_recomputed_each_step() {
        let grid = grid();
        let cfg = cfg();
        let mut body = PhysicsBody::new(Vec2::new(8.0 * TS - 20.0, 10.0 * TS - 40.0), Size::new(20.0, 40.0));
        body.vel.x = 3.0;
        body.step(&grid, &cfg);
        assert!(body.collisions.right);
        body.vel.x = -3.0;
        body.step(&grid, &cfg);
        assert!(!body.collisions.right);
        assert!(!body.collisions.left);
    }
}
