use crate::actions::ScrollerAction;
use crate::ai::{self, AiPolicy, Intent};
use crate::effects::EffectKind;
use crate::entity::{AttackStart, Entity};
use crate::events::ScrollerEvent;
use crate::portal::Portal;
use crate::world::{EffectId, EntityId, PickupId, ScrollerState};
use sim_core::TerminalOutcome;
use slotmap::SlotMap;
use std::sync::Arc;

/// Tier picked by the held modifiers.
pub fn attack_tier(state: &ScrollerState) -> u8 {
    if state.power_held {
        2
    } else if state.run_held {
        3
    } else {
        1
    }
}

/// Start attack `tier` for `id`, resolving it now unless it is delayed.
pub fn start_attack(
    state: &mut ScrollerState,
    id: EntityId,
    tier: u8,
    events: &mut Vec<ScrollerEvent>,
) -> bool {
    let Some(entity) = state.world.entities.get_mut(id) else {
        return false;
    };
    let start = entity.try_attack(tier);
    if !start.started() {
        return false;
    }
    events.push(ScrollerEvent::AttackStarted { id, tier });
    if let AttackStart::Immediate(effect) = start {
        let catalog = Arc::clone(&state.catalog);
        state
            .world
            .resolve_attack(&state.config, &catalog.effects, id, &effect, events);
    }
    true
}

/// One tick of timers, physics and animation, plus a delayed attack that
/// came due.
fn update_entity(state: &mut ScrollerState, id: EntityId, events: &mut Vec<ScrollerEvent>) {
    let Some(entity) = state.world.entities.get_mut(id) else {
        return;
    };
    let Some(effect) = entity.update(&state.world.grid, &state.config) else {
        return;
    };
    let catalog = Arc::clone(&state.catalog);
    state
        .world
        .resolve_attack(&state.config, &catalog.effects, id, &effect, events);
}

fn apply_intent(state: &mut ScrollerState, id: EntityId, intent: Intent, events: &mut Vec<ScrollerEvent>) {
    let Some(entity) = state.world.entities.get_mut(id) else {
        return;
    };
    entity.controls = intent.controls;
    if intent.jump {
        entity.jump(&state.config);
    }
    if intent.attack {
        start_attack(state, id, 1, events);
    }
}

/// Drop corpses whose display time ran out. Ids are only removed here, after
/// the pass over the group is over.
fn sweep(ids: &mut Vec<EntityId>, entities: &mut SlotMap<EntityId, Entity>, events: &mut Vec<ScrollerEvent>) {
    ids.retain(|id| {
        let expired = entities.get(*id).map_or(true, Entity::expired);
        if expired {
            if let Some(entity) = entities.remove(*id) {
                tracing::debug!(name = entity.name(), "corpse removed");
                events.push(ScrollerEvent::Removed { id: *id });
            }
        }
        !expired
    });
}

pub fn update_allies(state: &mut ScrollerState, events: &mut Vec<ScrollerEvent>) {
    let ids = state.world.allies.clone();
    for id in ids {
        let Some(entity) = state.world.entities.get_mut(id) else {
            continue;
        };
        let mut policy = std::mem::take(&mut entity.ai);
        if let AiPolicy::AllyFollow(brain) = &mut policy {
            if !entity.dead {
                let intent = ai::ally_intent(&state.world, &state.config, id, brain);
                apply_intent(state, id, intent, events);
            }
        }
        if let Some(entity) = state.world.entities.get_mut(id) {
            entity.ai = policy;
        }
        update_entity(state, id, events);
    }
    sweep(&mut state.world.allies, &mut state.world.entities, events);
}

pub fn update_enemies(state: &mut ScrollerState, events: &mut Vec<ScrollerEvent>) {
    let ids = state.world.enemies.clone();
    for id in ids {
        update_entity(state, id, events);

        let Some(entity) = state.world.entities.get_mut(id) else {
            continue;
        };
        if entity.dead {
            continue;
        }
        let mut policy = std::mem::take(&mut entity.ai);
        if let AiPolicy::LocalPatrol(brain) = &mut policy {
            let intent = ai::patrol_intent(&state.world, &state.config, &mut state.rng, id, brain);
            if intent.attack {
                start_attack(state, id, 1, events);
            }
            if let Some(entity) = state.world.entities.get_mut(id) {
                if entity.attacking {
                    brain.walking = 0;
                    entity.controls.stop();
                } else {
                    entity.controls = intent.controls;
                }
            }
        }
        if let Some(entity) = state.world.entities.get_mut(id) {
            entity.ai = policy;
        }
    }
    sweep(&mut state.world.enemies, &mut state.world.entities, events);
}

pub fn update_player(state: &mut ScrollerState, events: &mut Vec<ScrollerEvent>) {
    let id = state.world.player;
    update_entity(state, id, events);
}

/// Sparks always move; a living main player touching a coin collects it.
pub fn update_pickups(state: &mut ScrollerState, events: &mut Vec<ScrollerEvent>) {
    for pickup in state.world.pickups.values_mut() {
        pickup.update_sparks(&mut state.ambient);
    }

    let Some(player) = state.world.player().filter(|p| !p.dead) else {
        return;
    };
    let body = player.rect();
    let touched: Vec<PickupId> = state
        .world
        .pickups
        .iter()
        .filter(|(_, p)| p.rect().intersects(&body))
        .map(|(id, _)| id)
        .collect();

    for id in touched {
        let Some(pickup) = state.world.pickups.remove(id) else {
            continue;
        };
        if let Some(player) = state.world.player_mut() {
            pickup.apply(player);
        }
        events.push(ScrollerEvent::PickupCollected {
            id,
            kind: pickup.kind,
        });
    }
}

fn retire_effect(
    state: &mut ScrollerState,
    id: EffectId,
    chain: bool,
    events: &mut Vec<ScrollerEvent>,
) {
    let Some(effect) = state.world.effects.remove(id) else {
        return;
    };
    events.push(ScrollerEvent::EffectExpired {
        id,
        name: effect.name().to_string(),
    });
    if !chain {
        return;
    }
    let catalog = Arc::clone(&state.catalog);
    if let Some(child) = catalog.effects.finish(&effect, &state.world.grid) {
        state.world.spawn_effect(child, EffectKind::Finishing, events);
    }
}

/// Attack with the effect's area if it still carries damage.
fn effect_attack(state: &mut ScrollerState, id: EffectId, events: &mut Vec<ScrollerEvent>) -> bool {
    let Some(effect) = state.world.effects.get(id) else {
        return false;
    };
    if effect.damage == 0 {
        return false;
    }
    let (rect, damage, mask, shake) = (effect.rect(), effect.damage, effect.mask, effect.shake);
    let hit = state
        .world
        .attack(&state.config, &rect, damage, mask, shake, events)
        .is_some();
    if hit {
        if let Some(effect) = state.world.effects.get_mut(id) {
            effect.register_hit();
        }
    }
    hit
}

/// Effects spawned during this pass, including finish effects, first update
/// on the next tick.
pub fn update_effects(state: &mut ScrollerState, events: &mut Vec<ScrollerEvent>) {
    let max_age = state.config.effect_lifetime_ticks();

    let finishing = state.world.finishing.clone();
    for id in finishing {
        let Some(effect) = state.world.effects.get_mut(id) else {
            continue;
        };
        effect.update(max_age);
        effect_attack(state, id, events);
        if state.world.effects.get(id).is_some_and(|e| e.disabled) {
            retire_effect(state, id, true, events);
        }
    }

    let rigid = state.world.rigid.clone();
    for id in rigid {
        let Some(effect) = state.world.effects.get_mut(id) else {
            continue;
        };
        effect.update(max_age);
        let rect = effect.rect();
        let disabled = effect.disabled;
        let blocked = !state.world.grid.solid_intersections(&rect).is_empty();
        let hit = effect_attack(state, id, events);
        if blocked || hit {
            retire_effect(state, id, true, events);
        } else if disabled {
            retire_effect(state, id, false, events);
        }
    }

    let effects = &state.world.effects;
    state.world.finishing.retain(|id| effects.contains_key(*id));
    state.world.rigid.retain(|id| effects.contains_key(*id));
}

/// Portal particles and screen shake.
pub fn update_ambient(state: &mut ScrollerState) {
    if let Some(portal) = &mut state.world.portal {
        portal.update(&mut state.ambient);
    }
    state.world.update_shake(&mut state.ambient);
}

fn set_ally_search(state: &mut ScrollerState, on: bool) {
    let scale = state.config.search_scale;
    for id in &state.world.allies {
        let Some(ally) = state.world.entities.get_mut(*id) else {
            continue;
        };
        if let AiPolicy::AllyFollow(brain) = &mut ally.ai {
            if on {
                brain.vision.search(scale);
            } else {
                brain.vision.restore();
            }
        }
    }
}

pub fn apply_action(state: &mut ScrollerState, action: ScrollerAction, events: &mut Vec<ScrollerEvent>) {
    let cfg = &state.config;
    let player_id = state.world.player;
    match action {
        ScrollerAction::Left { held } => {
            if let Some(player) = state.world.player_mut() {
                player.controls.left = held;
                if held {
                    player.controls.flip = true;
                }
            }
        }
        ScrollerAction::Right { held } => {
            if let Some(player) = state.world.player_mut() {
                player.controls.right = held;
                if held {
                    player.controls.flip = false;
                }
            }
        }
        ScrollerAction::Jump => {
            if let Some(player) = state.world.entities.get_mut(player_id) {
                player.jump(cfg);
            }
        }
        ScrollerAction::Attack => {
            let tier = attack_tier(state);
            start_attack(state, player_id, tier, events);
        }
        ScrollerAction::Run { held } => {
            state.run_held = held;
            if let Some(player) = state.world.player_mut() {
                player.controls.running = held;
            }
        }
        ScrollerAction::Power { held } => state.power_held = held,
        ScrollerAction::OpenPortal => {
            let radius = cfg.portal_radius;
            let Some(player) = state.world.player_mut() else {
                return;
            };
            if player.dead || player.energy < player.max_energy {
                return;
            }
            player.energy = 0;
            let center = player.rect().center();
            state.world.portal = Some(Portal::new(center, radius));
            events.push(ScrollerEvent::PortalOpened { center });
        }
        ScrollerAction::Teleport => {
            let Some(to) = state.world.portal.as_ref().map(Portal::arrival) else {
                return;
            };
            let Some(player) = state.world.player_mut() else {
                return;
            };
            let cost = player.max_energy / 3;
            if player.dead || player.energy <= cost {
                return;
            }
            player.energy -= cost;
            player.body.pos = to;
            events.push(ScrollerEvent::Teleported { to });
        }
        ScrollerAction::ToggleRally => {
            state.rally = !state.rally;
            let rally = state.rally;
            for id in &state.world.allies {
                if let Some(ally) = state.world.entities.get_mut(*id) {
                    if let AiPolicy::AllyFollow(brain) = &mut ally.ai {
                        brain.come = rally;
                        brain.target = None;
                    }
                }
            }
            state.mark_hostile = false;
            set_ally_search(state, rally);
            events.push(ScrollerEvent::RallyToggled { on: rally });
        }
        ScrollerAction::ToggleMarkHostile => {
            if state.rally {
                return;
            }
            state.mark_hostile = !state.mark_hostile;
            let on = state.mark_hostile;
            set_ally_search(state, on);
            events.push(ScrollerEvent::MarkHostileToggled { on });
        }
        ScrollerAction::ToggleLight => {
            state.light_on = !state.light_on;
            events.push(ScrollerEvent::LightToggled {
                on: state.light_on,
            });
        }
        ScrollerAction::Quit => {
            tracing::info!(tick = state.tick, "quit requested");
            state.outcome = Some(TerminalOutcome::Quit);
        }
    }
}

/// Count down after the main player died. Returns true when the world must
/// be rebuilt; ends the match with `Lose` instead when restarting is off.
pub fn update_restart(state: &mut ScrollerState) -> bool {
    if state.outcome.is_some() {
        return false;
    }
    let dead = state.world.player().map_or(true, |p| p.dead);
    if !dead {
        return false;
    }
    let remaining = match state.restart_in {
        None => {
            tracing::info!(tick = state.tick, "main player died");
            state.config.restart_delay_ticks()
        }
        Some(n) => n.saturating_sub(1),
    };
    state.restart_in = Some(remaining);
    if remaining > 0 {
        return false;
    }
    if state.config.restart_on_death {
        true
    } else {
        state.outcome = Some(TerminalOutcome::Lose);
        false
    }
}
