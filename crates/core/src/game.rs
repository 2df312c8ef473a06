use crate::envelope::ActionEnvelope;
use crate::types::{PlayerId, Tick};

/// How a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalOutcome {
    Win,
    Lose,
    /// The player asked to leave.
    Quit,
}

/// A deterministic, fixed-timestep simulation.
///
/// `step` must run to completion synchronously and must produce the same
/// state and events for the same `(config, seed, actions)` history.
pub trait Game: Sized {
    type Config: Clone + Send + Sync + 'static;
    type Action: Clone + Send + Sync + 'static;
    type Observation: Clone + Send + Sync + 'static;
    type Event: Clone + Send + Sync + 'static;

    fn new(config: Self::Config, seed: u64) -> Self;

    /// Advance the world by exactly one tick. `actions` are already sorted by
    /// [`ActionEnvelope::order_key`].
    fn step(
        &mut self,
        tick: Tick,
        actions: &[ActionEnvelope<Self::Action>],
        out_events: &mut Vec<Self::Event>,
    );

    fn observe(&self, tick: Tick, player: PlayerId) -> Self::Observation;

    fn is_terminal(&self) -> Option<TerminalOutcome>;
}
