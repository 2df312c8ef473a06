use serde::{Deserialize, Serialize};
use sim_core::Micros;

/// Shake request issued with an attack that lands on the main player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shake {
    /// Ticks the shake lasts.
    pub delay: u32,
    /// Peak offset in pixels.
    pub intensity: u32,
}

impl Default for Shake {
    fn default() -> Self {
        Self {
            delay: 60,
            intensity: 80,
        }
    }
}

/// Every tunable of the world. Passed by reference into the grid, the
/// physics step and the systems; there are no global constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub tick_hz: u32,
    /// Rendered tile edge in pixels. Overwritten by the level's `tile_size`.
    pub tile_size: f32,

    // Physics (pixels per tick)
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub walk_speed: f32,
    pub run_speed: f32,
    pub jump_speed: f32,
    pub max_jumps: u8,
    /// Airborne ticks before a descending entity counts as falling.
    pub air_ticks_before_falling: u32,

    // Combat
    pub hurt_ticks: u32,
    pub death_display: Micros,

    // Match flow
    pub restart_on_death: bool,
    pub restart_delay: Micros,

    // Pickups and portals
    pub pickup_radius: f32,
    pub portal_radius: f32,

    /// Upper bound on how long any effect may live.
    pub effect_lifetime: Micros,

    // Ally AI (pixels)
    pub ally_near_distance: f32,
    /// Uniform random extra added to each ally's near distance at spawn.
    pub ally_near_jitter: f32,
    pub ally_panic_margin: f32,
    pub ally_far_distance: f32,

    // Enemy AI
    pub patrol_start_chance: f64,
    pub patrol_ticks: u32,

    /// Area multiplier for "search" vision, applied to width and height.
    pub search_scale: f32,
}

impl WorldConfig {
    pub fn duration_to_ticks(&self, d: Micros) -> u64 {
        d.to_ticks(self.tick_hz)
    }

    pub fn death_display_ticks(&self) -> u32 {
        self.duration_to_ticks(self.death_display) as u32
    }

    pub fn restart_delay_ticks(&self) -> u32 {
        self.duration_to_ticks(self.restart_delay) as u32
    }

    pub fn effect_lifetime_ticks(&self) -> u32 {
        self.duration_to_ticks(self.effect_lifetime) as u32
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            tile_size: 48.0,

            gravity: 0.5,
            max_fall_speed: 8.0,
            walk_speed: 3.0,
            run_speed: 5.0,
            jump_speed: 10.0,
            max_jumps: 1,
            air_ticks_before_falling: 10,

            hurt_ticks: 30,
            death_display: Micros::from_secs(10),

            restart_on_death: true,
            restart_delay: Micros::from_secs(5),

            pickup_radius: 10.0,
            portal_radius: 40.0,

            effect_lifetime: Micros::from_secs(20),

            ally_near_distance: 400.0,
            ally_near_jitter: 200.0,
            ally_panic_margin: 100.0,
            ally_far_distance: 1000.0,

            patrol_start_chance: 0.01,
            patrol_ticks: 90,

            search_scale: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_durations_in_ticks() {
        let cfg = WorldConfig::default();
        assert_eq!(cfg.death_display_ticks(), 600);
        assert_eq!(cfg.restart_delay_ticks(), 300);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: WorldConfig = serde_json::from_str(r#"{"gravity": 0.25}"#).unwrap();
        assert_eq!(cfg.gravity, 0.25);
        assert_eq!(cfg.tick_hz, 60);
        assert_eq!(cfg.hurt_ticks, 30);
    }
}
