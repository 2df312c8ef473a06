/// A wall-clock duration in whole microseconds, convertible to ticks.
///
/// Simulation code never reads the clock; configuration states durations in
/// human units and converts them once with [`Micros::to_ticks`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Micros(u64);

impl Micros {
    const PER_SEC: u64 = 1_000_000;

    pub const fn from_secs(secs: u32) -> Self {
        Self(secs as u64 * Self::PER_SEC)
    }

    pub const fn from_millis(millis: u32) -> Self {
        Self(millis as u64 * 1_000)
    }

    /// Number of whole ticks that fit in this duration at `tick_hz`.
    ///
    /// Rounds down; uses a 128-bit intermediate so long durations at high
    /// tick rates cannot overflow.
    pub const fn to_ticks(self, tick_hz: u32) -> u64 {
        ((self.0 as u128 * tick_hz as u128) / Self::PER_SEC as u128) as u64
    }

    /// Duration of a single tick at `tick_hz`.
    pub const fn per_tick(tick_hz: u32) -> Self {
        if tick_hz == 0 {
            return Self(0);
        }
        Self(Self::PER_SEC / tick_hz as u64)
    }

    pub const fn as_micros(self) -> u64 {
        self.0
    }
}
