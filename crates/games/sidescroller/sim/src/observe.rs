use crate::effects::EffectKind;
use crate::entity::{Entity, EntityState, Faction};
use crate::geom::{Rect, Vec2};
use crate::pickups::PickupKind;
use crate::world::{EntityId, ScrollerState};
use serde::{Deserialize, Serialize};
use sim_core::Tick;
use slotmap::Key;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObsEntity {
    pub id: u64,
    pub name: String,
    pub faction: Faction,
    pub rect: Rect,
    pub state: EntityState,
    pub frame: u32,
    pub flip: bool,
    pub hp: u32,
    pub max_hp: u32,
    pub energy: u32,
    pub max_energy: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObsEffect {
    pub id: u64,
    pub name: String,
    pub kind: EffectKind,
    pub rect: Rect,
    pub frame: u32,
    pub flip: bool,
    pub damage: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObsPickup {
    pub id: u64,
    pub kind: PickupKind,
    pub center: Vec2,
    pub radius: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObsPortal {
    pub center: Vec2,
    pub radius: f32,
}

/// Snapshot handed to renderers and tools.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScrollerObservation {
    pub tick: Tick,
    pub ticks_per_second: u32,
    pub tile_size: f32,
    pub player: Option<ObsEntity>,
    pub allies: Vec<ObsEntity>,
    pub enemies: Vec<ObsEntity>,
    pub effects: Vec<ObsEffect>,
    pub pickups: Vec<ObsPickup>,
    pub portal: Option<ObsPortal>,
    pub rally: bool,
    pub mark_hostile: bool,
    pub light_on: bool,
    pub shake_offset: Vec2,
    pub restart_in: Option<u32>,
}

pub fn entity_id_to_u64(id: EntityId) -> u64 {
    id.data().as_ffi()
}

fn obs_entity(id: EntityId, e: &Entity) -> ObsEntity {
    ObsEntity {
        id: entity_id_to_u64(id),
        name: e.name().to_string(),
        faction: e.faction,
        rect: e.rect(),
        state: e.state,
        frame: e.anim.frame(),
        flip: e.flip(),
        hp: e.hp,
        max_hp: e.max_hp,
        energy: e.energy,
        max_energy: e.max_energy,
    }
}

pub fn build_observation(state: &ScrollerState, tick: Tick) -> ScrollerObservation {
    let world = &state.world;
    let group = |ids: &[EntityId]| -> Vec<ObsEntity> {
        ids.iter()
            .filter_map(|id| world.entities.get(*id).map(|e| obs_entity(*id, e)))
            .collect()
    };

    let kinds = world
        .finishing
        .iter()
        .map(|id| (*id, EffectKind::Finishing))
        .chain(world.rigid.iter().map(|id| (*id, EffectKind::Rigid)));
    let effects = kinds
        .filter_map(|(id, kind)| {
            let e = world.effects.get(id)?;
            Some(ObsEffect {
                id: id.data().as_ffi(),
                name: e.name().to_string(),
                kind,
                rect: e.rect(),
                frame: e.cursor.frame(),
                flip: e.flip,
                damage: e.damage,
            })
        })
        .collect();

    let pickups = world
        .pickups
        .iter()
        .map(|(id, p)| ObsPickup {
            id: id.data().as_ffi(),
            kind: p.kind,
            center: p.center,
            radius: p.radius,
        })
        .collect();

    ScrollerObservation {
        tick,
        ticks_per_second: state.config.tick_hz,
        tile_size: state.config.tile_size,
        player: world.player().map(|p| obs_entity(world.player, p)),
        allies: group(&world.allies),
        enemies: group(&world.enemies),
        effects,
        pickups,
        portal: world.portal.as_ref().map(|p| ObsPortal {
            center: p.center,
            radius: p.radius,
        }),
        rally: state.rally,
        mark_hostile: state.mark_hostile,
        light_on: state.light_on,
        shake_offset: world.shake.offset,
        restart_in: state.restart_in,
    }
}
