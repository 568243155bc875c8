//! Battle State Machine
//!
//! A battle is a two-party record that only ever advances
//! `PENDING → ACTIVE → FINISHED`. The status is carried by [`BattleState`], so the
//! per-status data (hit points, whose turn it is, who won) only exists in the states
//! where it means something:
//!
//! ```text
//!   Pending ──accept──▶ Active { hp, turn } ──move──▶ Active { hp', turn' }
//!      │                        │
//!   decline/cancel          hp ≤ 0
//!      ▼                        ▼
//!   (deleted)           Finished { hp, winner }
//! ```
//!
//! All transition functions are pure: they validate against the current record and
//! return the next record. Persisting that record conditionally is the storage
//! layer's job.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BattleError;
use crate::model::{BattleId, PlayerId};

/// One of the two participants of a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Challenger,
    Opponent,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Challenger => Side::Opponent,
            Side::Opponent => Side::Challenger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleStatus {
    Pending,
    Active,
    Finished,
}

impl BattleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BattleStatus::Pending => "PENDING",
            BattleStatus::Active => "ACTIVE",
            BattleStatus::Finished => "FINISHED",
        }
    }

    /// Column value used by the `battles.status` SMALLINT
    pub fn code(self) -> i16 {
        match self {
            BattleStatus::Pending => 0,
            BattleStatus::Active => 1,
            BattleStatus::Finished => 2,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(BattleStatus::Pending),
            1 => Some(BattleStatus::Active),
            2 => Some(BattleStatus::Finished),
            _ => None,
        }
    }

    /// The only legal forward steps
    pub fn can_advance_to(self, next: BattleStatus) -> bool {
        matches!(
            (self, next),
            (BattleStatus::Pending, BattleStatus::Active)
                | (BattleStatus::Active, BattleStatus::Finished)
        )
    }
}

impl fmt::Display for BattleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hit points of both participants. Never negative by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hp {
    pub challenger: u32,
    pub opponent: u32,
}

impl Hp {
    pub fn new(challenger: u32, opponent: u32) -> Self {
        Self { challenger, opponent }
    }

    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Challenger => self.challenger,
            Side::Opponent => self.opponent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleState {
    /// Challenge issued, waiting for the opponent to respond
    Pending,
    Active { hp: Hp, turn: Side },
    /// Terminal; the record is never written again
    Finished { hp: Hp, winner: Side },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battle {
    pub id: BattleId,
    pub challenger: PlayerId,
    pub opponent: PlayerId,
    pub state: BattleState,
    /// Moves applied so far. Every move bumps it, so it versions the record.
    pub moves: u32,
}

/// Result of applying one spell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The record to persist
    pub battle: Battle,
    pub actor: Side,
    pub target: Side,
    pub damage: u32,
}

impl MoveOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self.battle.state, BattleState::Finished { .. })
    }
}

/// A stored battle row that does not describe a legal state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("battle {battle}: {reason}")]
pub struct InvalidBattleRecord {
    pub battle: BattleId,
    pub reason: String,
}

impl Battle {
    /// A fresh challenge record. The id is assigned by storage.
    pub fn challenge(
        id: BattleId,
        challenger: PlayerId,
        opponent: PlayerId,
    ) -> Result<Self, BattleError> {
        if challenger == opponent {
            return Err(BattleError::InvalidTarget { player: challenger });
        }
        Ok(Self {
            id,
            challenger,
            opponent,
            state: BattleState::Pending,
            moves: 0,
        })
    }

    /// Rebuild a battle from its stored columns, rejecting illegal combinations.
    ///
    /// `current_turn` is only meaningful while active and `winner` must be set iff
    /// the status is finished.
    #[allow(clippy::too_many_arguments)]
    pub fn from_columns(
        id: BattleId,
        status: BattleStatus,
        challenger: PlayerId,
        opponent: PlayerId,
        hp: Hp,
        current_turn: PlayerId,
        winner: Option<PlayerId>,
        moves: u32,
    ) -> Result<Self, InvalidBattleRecord> {
        let invalid = |reason: String| InvalidBattleRecord { battle: id, reason };

        if challenger == opponent {
            return Err(invalid(format!("player {challenger} is on both sides")));
        }
        let side_of = |player: PlayerId| {
            if player == challenger {
                Some(Side::Challenger)
            } else if player == opponent {
                Some(Side::Opponent)
            } else {
                None
            }
        };

        let state = match (status, winner) {
            (BattleStatus::Pending, None) => BattleState::Pending,
            (BattleStatus::Active, None) => {
                let turn = side_of(current_turn).ok_or_else(|| {
                    invalid(format!("turn holder {current_turn} is not a participant"))
                })?;
                BattleState::Active { hp, turn }
            }
            (BattleStatus::Finished, Some(winner)) => {
                let winner = side_of(winner)
                    .ok_or_else(|| invalid(format!("winner {winner} is not a participant")))?;
                BattleState::Finished { hp, winner }
            }
            (BattleStatus::Finished, None) => {
                return Err(invalid("finished without a winner".to_string()))
            }
            (status, Some(winner)) => {
                return Err(invalid(format!("{status} battle names winner {winner}")))
            }
        };

        if status == BattleStatus::Pending && moves != 0 {
            return Err(invalid(format!("pending battle records {moves} moves")));
        }

        Ok(Self {
            id,
            challenger,
            opponent,
            state,
            moves,
        })
    }

    pub fn status(&self) -> BattleStatus {
        match self.state {
            BattleState::Pending => BattleStatus::Pending,
            BattleState::Active { .. } => BattleStatus::Active,
            BattleState::Finished { .. } => BattleStatus::Finished,
        }
    }

    pub fn player(&self, side: Side) -> PlayerId {
        match side {
            Side::Challenger => self.challenger,
            Side::Opponent => self.opponent,
        }
    }

    pub fn side_of(&self, player: PlayerId) -> Option<Side> {
        if player == self.challenger {
            Some(Side::Challenger)
        } else if player == self.opponent {
            Some(Side::Opponent)
        } else {
            None
        }
    }

    /// Current hit points; a pending challenge reports the 0/0 placeholder
    pub fn hp(&self) -> Hp {
        match self.state {
            BattleState::Pending => Hp::default(),
            BattleState::Active { hp, .. } | BattleState::Finished { hp, .. } => hp,
        }
    }

    pub fn current_turn(&self) -> Option<Side> {
        match self.state {
            BattleState::Active { turn, .. } => Some(turn),
            _ => None,
        }
    }

    pub fn current_turn_player(&self) -> Option<PlayerId> {
        self.current_turn().map(|side| self.player(side))
    }

    /// Value stored in `current_turn_player_id`. Pending challenges park the turn on
    /// the opponent, who is the one expected to act next.
    pub fn stored_turn_player(&self) -> PlayerId {
        match self.state {
            BattleState::Pending => self.opponent,
            BattleState::Active { turn, .. } => self.player(turn),
            BattleState::Finished { winner, .. } => self.player(winner.other()),
        }
    }

    pub fn winner(&self) -> Option<PlayerId> {
        match self.state {
            BattleState::Finished { winner, .. } => Some(self.player(winner)),
            _ => None,
        }
    }

    pub fn loser(&self) -> Option<PlayerId> {
        match self.state {
            BattleState::Finished { winner, .. } => Some(self.player(winner.other())),
            _ => None,
        }
    }

    /// Participants only
    pub fn authorize(&self, player: PlayerId) -> Result<Side, BattleError> {
        self.side_of(player).ok_or(BattleError::NotAuthorized {
            battle: self.id,
            player,
        })
    }

    fn expect_status(&self, expected: BattleStatus) -> Result<(), BattleError> {
        let actual = self.status();
        if actual == expected {
            Ok(())
        } else {
            Err(BattleError::InvalidState {
                battle: self.id,
                expected,
                actual,
            })
        }
    }

    fn require_role(&self, player: PlayerId, role: Side) -> Result<(), BattleError> {
        if self.player(role) == player {
            Ok(())
        } else {
            Err(BattleError::NotAuthorized {
                battle: self.id,
                player,
            })
        }
    }

    /// Accept or decline: only the challenged player, only while pending
    pub fn check_response(&self, responder: PlayerId) -> Result<(), BattleError> {
        self.require_role(responder, Side::Opponent)?;
        self.expect_status(BattleStatus::Pending)
    }

    /// Cancel: only the challenger, only while pending
    pub fn check_cancel(&self, requester: PlayerId) -> Result<(), BattleError> {
        self.require_role(requester, Side::Challenger)?;
        self.expect_status(BattleStatus::Pending)
    }

    /// PENDING → ACTIVE with both sides at full health. The challenger moves first.
    pub fn accept(&self, responder: PlayerId, max_hp: Hp) -> Result<Battle, BattleError> {
        self.check_response(responder)?;
        Ok(Battle {
            state: BattleState::Active {
                hp: max_hp,
                turn: Side::Challenger,
            },
            ..self.clone()
        })
    }

    /// Preconditions of a move, in the order they are reported
    pub fn check_move(&self, actor: PlayerId) -> Result<Side, BattleError> {
        let side = self.authorize(actor)?;
        match self.state {
            BattleState::Active { turn, .. } if turn == side => Ok(side),
            BattleState::Active { .. } => Err(BattleError::NotYourTurn {
                battle: self.id,
                player: actor,
            }),
            _ => Err(BattleError::InvalidState {
                battle: self.id,
                expected: BattleStatus::Active,
                actual: self.status(),
            }),
        }
    }

    /// Cast a spell at the other participant.
    ///
    /// Termination is decided on the raw (pre-clamp) values. When both sides are at
    /// or below zero the challenger's defeat is checked first, so the opponent wins a
    /// simultaneous knockout.
    pub fn apply_move(&self, actor: PlayerId, damage: u32) -> Result<MoveOutcome, BattleError> {
        let side = self.check_move(actor)?;
        let target = side.other();
        let hp = self.hp();

        let mut challenger_raw = i64::from(hp.challenger);
        let mut opponent_raw = i64::from(hp.opponent);
        match target {
            Side::Challenger => challenger_raw -= i64::from(damage),
            Side::Opponent => opponent_raw -= i64::from(damage),
        }

        let clamped = Hp {
            challenger: clamp_hp(challenger_raw),
            opponent: clamp_hp(opponent_raw),
        };

        let state = if challenger_raw <= 0 {
            BattleState::Finished {
                hp: clamped,
                winner: Side::Opponent,
            }
        } else if opponent_raw <= 0 {
            BattleState::Finished {
                hp: clamped,
                winner: Side::Challenger,
            }
        } else {
            BattleState::Active {
                hp: clamped,
                turn: target,
            }
        };

        Ok(MoveOutcome {
            battle: Battle {
                state,
                moves: self.moves.saturating_add(1),
                ..self.clone()
            },
            actor: side,
            target,
            damage,
        })
    }
}

fn clamp_hp(raw: i64) -> u32 {
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

/// Flat, client-facing view of a battle record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub battle_id: BattleId,
    pub status: BattleStatus,
    pub challenger_id: PlayerId,
    pub opponent_id: PlayerId,
    pub challenger_hp: u32,
    pub opponent_hp: u32,
    pub current_turn_player_id: Option<PlayerId>,
    pub winner_id: Option<PlayerId>,
    pub moves: u32,
}

impl From<&Battle> for BattleSnapshot {
    fn from(battle: &Battle) -> Self {
        let hp = battle.hp();
        Self {
            battle_id: battle.id,
            status: battle.status(),
            challenger_id: battle.challenger,
            opponent_id: battle.opponent,
            challenger_hp: hp.challenger,
            opponent_hp: hp.opponent,
            current_turn_player_id: battle.current_turn_player(),
            winner_id: battle.winner(),
            moves: battle.moves,
        }
    }
}
