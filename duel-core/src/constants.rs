//! Centralized game constants for the duel rules.
//!
//! Reward amounts, the experience curve and the achievement point values live here
//! so the reward calculator, the evaluator and the seed data never disagree.

// =====================================================
// Player defaults (signup happens outside this crate)
// =====================================================

/// Level a freshly created player starts at
pub const STARTING_LEVEL: u32 = 1;

/// Currency a freshly created player starts with
pub const STARTING_CURRENCY: u64 = 100;

// =====================================================
// Experience curve: threshold(level) = BASE + level * PER_LEVEL
// =====================================================

pub const THRESHOLD_BASE: u64 = 100;
pub const THRESHOLD_PER_LEVEL: u64 = 10;

// =====================================================
// Hit points: max_hp(level) = BASE + (level - 1) * PER_LEVEL
// =====================================================

pub const BASE_MAX_HP: u32 = 100;
pub const MAX_HP_PER_LEVEL: u32 = 10;

// =====================================================
// Battle rewards
// =====================================================

/// Experience granted to the winner of a battle
pub const WINNER_EXPERIENCE: u64 = 50;

/// Currency granted to the winner when the loser belongs to another house
pub const CROSS_HOUSE_BONUS: u64 = 25;

/// Consolation experience for the loser
pub const LOSER_EXPERIENCE: u64 = 10;

/// Consolation currency for the loser
pub const LOSER_CURRENCY: u64 = 5;

// =====================================================
// Achievements
// =====================================================

/// Currency credited on the first unlock of `first-victory`
pub const FIRST_VICTORY_POINTS: u64 = 50;

/// Currency credited on the first unlock of each `house-sweep-<house>`
pub const HOUSE_SWEEP_POINTS: u64 = 75;
