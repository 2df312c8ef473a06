//! Frame cursors and the per-character state → animation table.

use crate::entity::EntityState;
use serde::{Deserialize, Serialize};

/// Timing of one animation strip. Images are the renderer's concern; the
/// simulation only needs to know when a strip completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationDef {
    pub frames: u32,
    /// Ticks each frame is shown. Zero advances one frame per tick.
    pub frame_duration: u32,
    /// Wrap to the first frame after the last one, or hold the last frame.
    pub repeat: bool,
}

impl AnimationDef {
    pub const fn looping(frames: u32, frame_duration: u32) -> Self {
        Self {
            frames,
            frame_duration,
            repeat: true,
        }
    }

    pub const fn once(frames: u32, frame_duration: u32) -> Self {
        Self {
            frames,
            frame_duration,
            repeat: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimCursor {
    frame: u32,
    timer: u32,
    finished: bool,
}

impl AnimCursor {
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// True on a tick where the last frame completed. A held strip keeps
    /// completing its last frame, so it reports again every `frame_duration`
    /// ticks.
    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn update(&mut self, def: &AnimationDef) {
        self.finished = false;
        self.timer += 1;
        if self.timer < def.frame_duration {
            return;
        }
        self.timer = 0;
        self.frame += 1;
        if self.frame >= def.frames {
            self.frame = if def.repeat {
                0
            } else {
                def.frames.saturating_sub(1)
            };
            self.finished = true;
        }
    }
}

/// Animation table of one character, indexed by logical state. Only `idle`
/// is mandatory; states without a strip of their own fall back to it.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationSet {
    strips: [Option<AnimationDef>; EntityState::COUNT],
}

impl AnimationSet {
    pub fn new(idle: AnimationDef) -> Self {
        let mut strips = [None; EntityState::COUNT];
        strips[EntityState::Idle.slot()] = Some(idle);
        Self { strips }
    }

    pub fn with(mut self, state: EntityState, def: AnimationDef) -> Self {
        self.strips[state.slot()] = Some(def);
        self
    }

    pub fn has(&self, state: EntityState) -> bool {
        self.strips[state.slot()].is_some()
    }

    pub fn get(&self, state: EntityState) -> &AnimationDef {
        match &self.strips[state.slot()] {
            Some(def) => def,
            None => self.idle(),
        }
    }

    fn idle(&self) -> &AnimationDef {
        match &self.strips[EntityState::Idle.slot()] {
            Some(def) => def,
            None => &FALLBACK,
        }
    }
}

const FALLBACK: AnimationDef = AnimationDef::looping(1, 1);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looping_strip_reports_finish_once_per_cycle() {
        let def = AnimationDef::looping(3, 2);
        let mut cursor = AnimCursor::default();
        let mut finishes = Vec::new();
        for tick in 1..=12 {
            cursor.update(&def);
            if cursor.finished() {
                finishes.push(tick);
            }
        }
        assert_eq!(finishes, vec![6, 12]);
        assert_eq!(cursor.frame(), 0);
    }

    #[test]
    fn one_shot_strip_holds_last_frame() {
        let def = AnimationDef::once(4, 2);
        let mut cursor = AnimCursor::default();
        for _ in 0..8 {
            cursor.update(&def);
        }
        assert!(cursor.finished());
        assert_eq!(cursor.frame(), 3);

        // Held on the last frame: silent for a frame's duration, then again.
        cursor.update(&def);
        assert!(!cursor.finished());
        assert_eq!(cursor.frame(), 3);
        cursor.update(&def);
        assert!(cursor.finished());
        assert_eq!(cursor.frame(), 3);
    }

    #[test]
    fn zero_duration_advances_every_tick() {
        let def = AnimationDef::once(2, 0);
        let mut cursor = AnimCursor::default();
        cursor.update(&def);
        assert_eq!(cursor.frame(), 1);
        cursor.update(&def);
        assert!(cursor.finished());
    }

    #[test]
    fn missing_states_fall_back_to_idle() {
        let idle = AnimationDef::looping(6, 10);
        let hurt = AnimationDef::looping(3, 10);
        let set = AnimationSet::new(idle).with(EntityState::Hurt, hurt);
        assert_eq!(set.get(EntityState::Hurt), &hurt);
        assert_eq!(set.get(EntityState::Run), &idle);
        assert!(!set.has(EntityState::Falling));
    }
}
