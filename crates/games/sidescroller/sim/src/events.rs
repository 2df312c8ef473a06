use crate::effects::EffectKind;
use crate::geom::Vec2;
use crate::pickups::PickupKind;
use crate::world::{EffectId, EntityId, PickupId};

#[derive(Clone, Debug, PartialEq)]
pub enum ScrollerEvent {
    AttackStarted {
        id: EntityId,
        tier: u8,
    },
    Hurt {
        id: EntityId,
        damage: u32,
        hp: u32,
    },
    Died {
        id: EntityId,
    },
    /// The main player was turned to stone by the killing blow.
    Petrified {
        id: EntityId,
    },
    /// A corpse left the world after its death display time.
    Removed {
        id: EntityId,
    },
    EffectSpawned {
        id: EffectId,
        name: String,
        kind: EffectKind,
    },
    EffectExpired {
        id: EffectId,
        name: String,
    },
    PickupCollected {
        id: PickupId,
        kind: PickupKind,
    },
    PortalOpened {
        center: Vec2,
    },
    Teleported {
        to: Vec2,
    },
    RallyToggled {
        on: bool,
    },
    MarkHostileToggled {
        on: bool,
    },
    LightToggled {
        on: bool,
    },
    ScreenShake {
        delay: u32,
        intensity: u32,
    },
    Restarted,
}
