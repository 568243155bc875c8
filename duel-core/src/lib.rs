//! Wizard Duel - Core Rules Library
//!
//! This crate provides the storage-free game logic for asynchronous wizard duels:
//! - Typed battle records and the PENDING → ACTIVE → FINISHED state machine
//! - Level curve (experience thresholds, level-derived max HP)
//! - Post-battle reward calculation with exact level-up carry
//! - Achievement catalog and the pure achievement evaluator
//! - Domain error taxonomy shared by every service
//! - Tracing initialisation

pub mod achievements;
pub mod battle;
pub mod constants;
pub mod error;
pub mod logging;
pub mod model;
pub mod progression;
pub mod rewards;

// Re-export commonly used types
pub use achievements::{AchievementKey, BattleHistory, EarnedSet, Evaluation};
pub use battle::{Battle, BattleSnapshot, BattleState, BattleStatus, Hp, MoveOutcome, Side};
pub use error::BattleError;
pub use model::{Achievement, BattleId, House, HouseId, Player, PlayerId, Spell, SpellId};
pub use progression::Progress;
pub use rewards::{AppliedReward, RewardPlan, Settlement};
