//! Single-threaded, fixed-timestep driver for any [`Game`].
//!
//! The host owns the game, the tick counter and the queue of scheduled input.
//! Every tick it hands the game the actions addressed to that tick, sorted by
//! `(player_id, action_id)`, so replays with the same seed are identical.

use sim_core::{ActionEnvelope, ActionId, Game, PlayerId, TerminalOutcome, Tick};
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct RunResult<G: Game> {
    pub outcome: Option<TerminalOutcome>,
    pub final_tick: Tick,
    pub events: Vec<(Tick, G::Event)>,
}

pub struct MatchHost<G: Game> {
    game: G,
    current_tick: Tick,
    tick_hz: u32,
    next_player_id: PlayerId,
    next_action_id: ActionId,
    pending_actions: BTreeMap<Tick, Vec<ActionEnvelope<G::Action>>>,
}

impl<G: Game> MatchHost<G> {
    pub fn new(config: G::Config, seed: u64, tick_hz: u32) -> Self {
        Self {
            game: G::new(config, seed),
            current_tick: 0,
            tick_hz,
            next_player_id: 0,
            next_action_id: 0,
            pending_actions: BTreeMap::new(),
        }
    }

    pub fn join_player(&mut self) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        id
    }

    /// Schedule an action. Actions aimed at the current tick or the past are
    /// moved to the next tick. Returns the tick the action will run on.
    pub fn submit(&mut self, mut action: ActionEnvelope<G::Action>) -> Tick {
        let scheduled_tick = action.intended_tick.max(self.current_tick + 1);
        action.intended_tick = scheduled_tick;
        self.pending_actions
            .entry(scheduled_tick)
            .or_default()
            .push(action);
        scheduled_tick
    }

    /// Schedule `payload` for the next tick with a host-assigned action id.
    pub fn submit_next(&mut self, player_id: PlayerId, payload: G::Action) -> Tick {
        let action_id = self.next_action_id;
        self.next_action_id += 1;
        self.submit(ActionEnvelope::new(
            player_id,
            action_id,
            self.current_tick + 1,
            payload,
        ))
    }

    /// Advance until the game is terminal or `max_ticks` ticks have run.
    pub fn run_for_ticks(&mut self, max_ticks: Tick) -> RunResult<G> {
        let mut events = Vec::new();
        for _ in 0..max_ticks {
            let Some(tick_events) = self.step_one_tick() else {
                break;
            };
            let tick = self.current_tick;
            events.extend(tick_events.into_iter().map(|e| (tick, e)));
        }

        RunResult {
            outcome: self.game.is_terminal(),
            final_tick: self.current_tick,
            events,
        }
    }

    /// Advance by one tick. Returns `None` if the game was already terminal,
    /// otherwise the events emitted during this tick.
    pub fn step_one_tick(&mut self) -> Option<Vec<G::Event>> {
        if let Some(outcome) = self.game.is_terminal() {
            tracing::debug!(tick = self.current_tick, ?outcome, "match already terminal");
            return None;
        }

        self.current_tick += 1;

        let mut actions = self
            .pending_actions
            .remove(&self.current_tick)
            .unwrap_or_default();
        actions.sort_by_key(|a| a.order_key());

        let mut tick_events = Vec::new();
        self.game
            .step(self.current_tick, &actions, &mut tick_events);
        Some(tick_events)
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut G {
        &mut self.game
    }

    pub fn observe(&self, player: PlayerId) -> G::Observation {
        self.game.observe(self.current_tick, player)
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn tick_hz(&self) -> u32 {
        self.tick_hz
    }

    pub fn is_terminal(&self) -> Option<TerminalOutcome> {
        self.game.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the order in which actions reach the game.
    struct Recorder {
        seen: Vec<(Tick, PlayerId, u32)>,
        stop_at: Tick,
        tick: Tick,
    }

    impl Game for Recorder {
        type Config = Tick;
        type Action = u32;
        type Observation = usize;
        type Event = u32;

        fn new(stop_at: Tick, _seed: u64) -> Self {
            Self {
                seen: Vec::new(),
                stop_at,
                tick: 0,
            }
        }

        fn step(
            &mut self,
            tick: Tick,
            actions: &[ActionEnvelope<u32>],
            out_events: &mut Vec<u32>,
        ) {
            self.tick = tick;
            for a in actions {
                self.seen.push((tick, a.player_id, a.payload));
                out_events.push(a.payload);
            }
        }

        fn observe(&self, _tick: Tick, _player: PlayerId) -> usize {
            self.seen.len()
        }

        fn is_terminal(&self) -> Option<TerminalOutcome> {
            (self.tick >= self.stop_at).then_some(TerminalOutcome::Win)
        }
    }

    #[test]
    fn past_actions_run_next_tick() {
        let mut host = MatchHost::<Recorder>::new(100, 0, 60);
        let p = host.join_player();
        host.run_for_ticks(5);
        let scheduled = host.submit(ActionEnvelope::new(p, 0, 2, 7));
        assert_eq!(scheduled, 6);
        host.step_one_tick();
        assert_eq!(host.game().seen, vec![(6, p, 7)]);
    }

    #[test]
    fn actions_are_sorted_by_player_then_id() {
        let mut host = MatchHost::<Recorder>::new(100, 0, 60);
        let a = host.join_player();
        let b = host.join_player();
        host.submit(ActionEnvelope::new(b, 0, 1, 30));
        host.submit(ActionEnvelope::new(a, 1, 1, 20));
        host.submit(ActionEnvelope::new(a, 0, 1, 10));
        let events = host.step_one_tick().unwrap();
        assert_eq!(events, vec![10, 20, 30]);
    }

    #[test]
    fn run_stops_at_terminal() {
        let mut host = MatchHost::<Recorder>::new(3, 0, 60);
        let p = host.join_player();
        host.submit_next(p, 1);
        let result = host.run_for_ticks(10);
        assert_eq!(result.outcome, Some(TerminalOutcome::Win));
        assert_eq!(result.final_tick, 3);
        assert_eq!(result.events, vec![(1, 1)]);
        assert!(host.step_one_tick().is_none());
    }
}
