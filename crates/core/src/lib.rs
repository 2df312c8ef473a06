//! Engine-agnostic contracts shared by every simulation in the workspace.
//!
//! A game implements [`Game`]; a driver such as `sim_host::MatchHost` feeds it
//! [`ActionEnvelope`]s tick by tick and collects the events it emits.

pub mod envelope;
pub mod game;
pub mod time;
pub mod types;

pub use envelope::ActionEnvelope;
pub use game::{Game, TerminalOutcome};
pub use time::Micros;
pub use types::{ActionId, PlayerId, Tick};
