/// Player input. Held keys arrive as press/release pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollerAction {
    Left { held: bool },
    Right { held: bool },
    Jump,
    /// Attack with the tier selected by the held modifiers: tier 1 by
    /// default, tier 2 with `Power`, tier 3 with `Run`.
    Attack,
    /// Run, and select the third attack tier.
    Run { held: bool },
    /// Select the second attack tier.
    Power { held: bool },
    /// Needs a full energy pool, which it empties.
    OpenPortal,
    /// Jump to the open portal for a third of the energy pool.
    Teleport,
    /// Summon every ally to follow at a run.
    ToggleRally,
    /// Let allies look for hostiles far and wide. Ignored while rallying.
    ToggleMarkHostile,
    ToggleLight,
    Quit,
}
