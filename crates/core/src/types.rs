/// Monotonic simulation step counter. Tick 0 is the state right after `Game::new`.
pub type Tick = u64;

/// Identifies an input source (a local controller, a scripted bot, ...).
pub type PlayerId = u8;

/// Per-player action sequence number, used to order actions within a tick.
pub type ActionId = u64;
