//! Deterministic core of a tile-based side-scrolling action game: the tile
//! grid, axis-separated physics, the combat state machine, ally and enemy AI,
//! effects, pickups and portals, driven one fixed tick at a time through
//! [`sim_core::Game`].

pub mod actions;
pub mod ai;
pub mod anim;
pub mod catalog;
pub mod config;
pub mod effects;
pub mod entity;
pub mod error;
pub mod events;
pub mod game;
pub mod geom;
pub mod level;
pub mod observe;
pub mod physics;
pub mod pickups;
pub mod portal;
pub mod systems;
pub mod tiles;
pub mod world;

pub use actions::ScrollerAction;
pub use catalog::{AttackDef, AttackEffect, Catalog, CharacterDef, TargetMask};
pub use config::{Shake, WorldConfig};
pub use effects::{Effect, EffectFactory, EffectKind, EffectTemplate};
pub use entity::{Entity, EntityState, Faction};
pub use error::LoadError;
pub use events::ScrollerEvent;
pub use game::{GameSetup, ScrollerGame};
pub use geom::{Rect, Size, Vec2};
pub use level::{Level, LevelBuilder};
pub use observe::ScrollerObservation;
pub use tiles::{ResourceTable, SpatialGrid, Tile};
pub use world::{EffectId, EntityId, PickupId, ScrollerState, World};
