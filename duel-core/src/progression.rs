//! Level curve: experience thresholds, level-ups and level-derived hit points.
//!
//! Experience is stored as "progress into the current level". Resolving level-ups
//! consumes `threshold(level)` per level gained and keeps the remainder, so the
//! carry is exact:
//!
//! ```text
//! experience_in = Σ threshold(l) for l in start_level..end_level  +  experience_out
//! ```

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::constants::{BASE_MAX_HP, MAX_HP_PER_LEVEL, THRESHOLD_BASE, THRESHOLD_PER_LEVEL};

/// Experience needed to leave `level`
pub fn threshold(level: u32) -> u64 {
    THRESHOLD_BASE + u64::from(level) * THRESHOLD_PER_LEVEL
}

/// Hit points a player of `level` enters a battle with
pub fn max_hp(level: u32) -> u32 {
    BASE_MAX_HP.saturating_add(level.saturating_sub(1).saturating_mul(MAX_HP_PER_LEVEL))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub level: u32,
    pub experience: u64,
}

/// Outcome of resolving level-ups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelResolution {
    pub before: Progress,
    pub after: Progress,
}

impl LevelResolution {
    pub fn levels_gained(&self) -> u32 {
        self.after.level - self.before.level
    }

    pub fn leveled_up(&self) -> bool {
        self.after.level > self.before.level
    }

    /// Levels whose threshold was paid for
    pub fn consumed_levels(&self) -> Range<u32> {
        self.before.level..self.after.level
    }
}

impl Progress {
    pub fn new(level: u32, experience: u64) -> Self {
        Self { level, experience }
    }

    /// Add experience and resolve every level-up it pays for.
    ///
    /// Terminates because every threshold is positive and strictly increasing. Stops
    /// at `u32::MAX` rather than overflowing the level.
    pub fn gain(self, experience: u64) -> LevelResolution {
        let mut after = Progress {
            level: self.level,
            experience: self.experience.saturating_add(experience),
        };

        while after.level < u32::MAX && after.experience >= threshold(after.level) {
            after.experience -= threshold(after.level);
            after.level += 1;
        }

        LevelResolution { before: self, after }
    }
}
