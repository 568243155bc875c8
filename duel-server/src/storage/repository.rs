//! Repository traits - abstraction layer for data access
//!
//! The battle services interact with data only through these traits, so the
//! PostgreSQL and in-memory backends are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use duel_core::achievements::{BattleHistory, EarnedSet};
use duel_core::battle::Battle;
use duel_core::model::{Achievement, BattleId, Player, PlayerId, Spell, SpellId};
use duel_core::rewards::Settlement;

use super::StorageError;

/// Generic result type for repository operations
pub type RepoResult<T> = Result<T, StorageError>;

/// The record a move was computed from. A conditional battle write applies only
/// while the battle is still ACTIVE with this turn holder and move count.
///
/// The turn holder alone repeats every two moves; the move count does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnGuard {
    pub battle_id: BattleId,
    pub expected_turn: PlayerId,
    pub expected_moves: u32,
}

impl TurnGuard {
    /// Guard for `actor` moving in `battle` as it was read
    pub fn for_move(battle: &Battle, actor: PlayerId) -> Self {
        Self {
            battle_id: battle.id,
            expected_turn: actor,
            expected_moves: battle.moves,
        }
    }

    pub fn holds(&self, battle: &Battle) -> bool {
        battle.id == self.battle_id
            && battle.current_turn_player() == Some(self.expected_turn)
            && battle.moves == self.expected_moves
    }
}

// ============================================================================
// Player/Spell Store (owned by signup and the shop; read-mostly here)
// ============================================================================

#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    async fn get_player(&self, id: PlayerId) -> RepoResult<Option<Player>>;
    async fn get_spell(&self, id: SpellId) -> RepoResult<Option<Spell>>;
    /// Spells the player has learned, ordered by spell id
    async fn learned_spells(&self, player: PlayerId) -> RepoResult<Vec<Spell>>;
    async fn has_learned(&self, player: PlayerId, spell: SpellId) -> RepoResult<bool>;
}

// ============================================================================
// Battles
// ============================================================================

#[async_trait]
pub trait BattleRepo: Send + Sync {
    async fn get(&self, id: BattleId) -> RepoResult<Option<Battle>>;

    /// Insert a PENDING battle unless one is already PENDING or ACTIVE for the
    /// unordered pair. `None` means a conflicting open battle exists.
    async fn insert_challenge(
        &self,
        challenger: PlayerId,
        opponent: PlayerId,
    ) -> RepoResult<Option<Battle>>;

    /// PENDING → ACTIVE, conditioned on the status and on `responder` being the
    /// opponent. `next` carries the starting hit points.
    async fn activate(&self, next: &Battle, responder: PlayerId) -> RepoResult<bool>;

    /// Delete a PENDING battle on behalf of the opponent (decline)
    async fn delete_declined(&self, id: BattleId, responder: PlayerId) -> RepoResult<bool>;

    /// Delete a PENDING battle on behalf of the challenger (cancel)
    async fn delete_cancelled(&self, id: BattleId, requester: PlayerId) -> RepoResult<bool>;

    /// ACTIVE → ACTIVE: new hit points, turn and move count, applied only if
    /// `guard` still holds
    async fn record_turn(&self, guard: TurnGuard, next: &Battle) -> RepoResult<bool>;

    /// ACTIVE → FINISHED under the same guard, settling both participants'
    /// rewards in the same transaction. `None` means the guard did not hold.
    async fn finish(&self, guard: TurnGuard, next: &Battle) -> RepoResult<Option<Settlement>>;

    async fn settlement(&self, id: BattleId) -> RepoResult<Option<Settlement>>;

    /// Win count and defeated-opponent houses over all finished battles
    async fn history(&self, player: PlayerId) -> RepoResult<BattleHistory>;
}

// ============================================================================
// Achievements
// ============================================================================

#[async_trait]
pub trait AchievementRepo: Send + Sync {
    async fn catalog(&self) -> RepoResult<Vec<Achievement>>;
    async fn earned(&self, player: PlayerId) -> RepoResult<EarnedSet>;

    /// Insert the award row and credit `points_awarded` in one transaction.
    /// Returns `false` (and credits nothing) when the award already exists.
    async fn award(
        &self,
        player: PlayerId,
        achievement: &Achievement,
        awarded_at: DateTime<Utc>,
    ) -> RepoResult<bool>;
}
