//! Battle services
//!
//! The request-level operations, each a read of the authoritative record, a check
//! against the `duel_core` state machine and one conditional write:
//! - [`ChallengeManager`]: create, accept/decline, cancel
//! - [`BattleEngine`]: moves, state and result views
//! - [`AchievementAwarder`]: post-battle unlocks for the winner
//!
//! A conditional write that matched nothing means another request got there first.
//! The service re-reads the record and reports what the caller should reload.

pub mod achievements;
pub mod challenge;
pub mod engine;

pub use achievements::AchievementAwarder;
pub use challenge::{ChallengeManager, ChallengeResolution, ChallengeResponse};
pub use engine::{BattleEngine, BattleResultView, BattleView, MoveReport};

use tracing::warn;

use duel_core::battle::Battle;
use duel_core::model::{BattleId, Player, PlayerId};
use duel_core::BattleError;

use crate::storage::{StorageError, StorageManager};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Battle(#[from] BattleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// The domain error, if this is one
    pub fn battle(&self) -> Option<&BattleError> {
        match self {
            Self::Battle(err) => Some(err),
            Self::Storage(_) => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

async fn load_battle(storage: &StorageManager, id: BattleId) -> ServiceResult<Battle> {
    storage
        .battles
        .get(id)
        .await?
        .ok_or_else(|| BattleError::battle_not_found(id).into())
}

async fn load_player(storage: &StorageManager, id: PlayerId) -> ServiceResult<Player> {
    storage
        .players
        .get_player(id)
        .await?
        .ok_or_else(|| BattleError::player_not_found(id).into())
}

/// Explain a conditional write that affected zero rows.
///
/// Re-reads the battle and repeats the precondition that passed before the write.
/// If it now fails, that failure is what the caller needs (the battle moved on or
/// is gone); otherwise the record changed underneath us and the caller should
/// reload and retry.
async fn explain_lost_write<F>(storage: &StorageManager, battle_id: BattleId, recheck: F) -> ServiceError
where
    F: FnOnce(&Battle) -> Result<(), BattleError>,
{
    let current = match storage.battles.get(battle_id).await {
        Ok(current) => current,
        Err(err) => return err.into(),
    };

    let err = match current {
        None => BattleError::battle_not_found(battle_id),
        Some(battle) => match recheck(&battle) {
            Err(err) => err,
            Ok(()) => BattleError::StaleStateConflict { battle: battle_id },
        },
    };

    warn!(battle_id = %battle_id, code = err.code(), "Conditional write matched no rows");
    err.into()
}
