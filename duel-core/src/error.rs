//! Domain error taxonomy.
//!
//! Every variant is recoverable: the caller reloads the authoritative battle state
//! and decides again. Nothing here is retried automatically.

use crate::battle::BattleStatus;
use crate::model::{BattleId, PlayerId, SpellId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BattleError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("player {player} may not perform this action on battle {battle}")]
    NotAuthorized { battle: BattleId, player: PlayerId },

    #[error("battle {battle} is {actual}, expected {expected}")]
    InvalidState {
        battle: BattleId,
        expected: BattleStatus,
        actual: BattleStatus,
    },

    #[error("it is not player {player}'s turn in battle {battle}")]
    NotYourTurn { battle: BattleId, player: PlayerId },

    #[error("player {player} has not learned spell {spell}")]
    SpellNotOwned { player: PlayerId, spell: SpellId },

    #[error("an open battle already exists between players {challenger} and {opponent}")]
    ChallengeExists {
        challenger: PlayerId,
        opponent: PlayerId,
    },

    #[error("player {player} cannot challenge themselves")]
    InvalidTarget { player: PlayerId },

    #[error("battle {battle} changed concurrently; reload and retry")]
    StaleStateConflict { battle: BattleId },
}

impl BattleError {
    pub fn battle_not_found(id: BattleId) -> Self {
        Self::NotFound {
            entity: "battle",
            id: id.0,
        }
    }

    pub fn player_not_found(id: PlayerId) -> Self {
        Self::NotFound {
            entity: "player",
            id: id.0,
        }
    }

    pub fn spell_not_found(id: SpellId) -> Self {
        Self::NotFound {
            entity: "spell",
            id: id.0,
        }
    }

    /// Stable machine-readable code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::NotYourTurn { .. } => "NOT_YOUR_TURN",
            Self::SpellNotOwned { .. } => "SPELL_NOT_OWNED",
            Self::ChallengeExists { .. } => "CHALLENGE_EXISTS",
            Self::InvalidTarget { .. } => "INVALID_TARGET",
            Self::StaleStateConflict { .. } => "STALE_STATE_CONFLICT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_records() {
        let err = BattleError::battle_not_found(BattleId(7));
        assert_eq!(err.to_string(), "battle 7 not found");

        let err = BattleError::InvalidState {
            battle: BattleId(3),
            expected: BattleStatus::Active,
            actual: BattleStatus::Finished,
        };
        assert_eq!(err.to_string(), "battle 3 is FINISHED, expected ACTIVE");
    }

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            BattleError::battle_not_found(BattleId(1)),
            BattleError::NotAuthorized { battle: BattleId(1), player: PlayerId(1) },
            BattleError::InvalidState {
                battle: BattleId(1),
                expected: BattleStatus::Pending,
                actual: BattleStatus::Active,
            },
            BattleError::NotYourTurn { battle: BattleId(1), player: PlayerId(1) },
            BattleError::SpellNotOwned { player: PlayerId(1), spell: SpellId(1) },
            BattleError::ChallengeExists { challenger: PlayerId(1), opponent: PlayerId(2) },
            BattleError::InvalidTarget { player: PlayerId(1) },
            BattleError::StaleStateConflict { battle: BattleId(1) },
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
