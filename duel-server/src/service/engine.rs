//! BattleEngine - moves and battle views
//!
//! A move is validated against the record as read, resolved by
//! `Battle::apply_move`, then written conditionally on the record being unchanged:
//! still ACTIVE, same turn holder, same move count. A finishing move settles both
//! players' rewards in the same write, after which the winner's achievements are
//! evaluated. Viewing the result evaluates them again, which recovers unlocks lost
//! to a failed evaluation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use duel_core::battle::{BattleSnapshot, BattleStatus};
use duel_core::model::{Achievement, BattleId, PlayerId, Spell, SpellId};
use duel_core::rewards::{AppliedReward, Settlement};
use duel_core::BattleError;

use super::{explain_lost_write, load_battle, AchievementAwarder, ServiceError, ServiceResult};
use crate::storage::repository::TurnGuard;
use crate::storage::{StorageError, StorageManager};

/// What a successful move did
#[derive(Debug, Clone, Serialize)]
pub struct MoveReport {
    pub battle: BattleSnapshot,
    pub spell_id: SpellId,
    pub damage: u32,
    /// Present when this move finished the battle
    pub settlement: Option<Settlement>,
    /// Newly unlocked by the winner
    pub achievements: Vec<Achievement>,
}

/// A live battle as one participant sees it
#[derive(Debug, Clone, Serialize)]
pub struct BattleView {
    #[serde(flatten)]
    pub battle: BattleSnapshot,
    pub your_turn: bool,
    /// The viewer's own learned spells, for move selection
    pub spells: Vec<Spell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BattleResultView {
    pub battle_id: BattleId,
    pub winner_id: PlayerId,
    pub loser_id: PlayerId,
    pub challenger_hp: u32,
    pub opponent_hp: u32,
    pub winner: AppliedReward,
    pub loser: AppliedReward,
    /// Did the viewer gain a level from this battle
    pub leveled_up: bool,
    pub settled_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct BattleEngine {
    storage: StorageManager,
    awarder: AchievementAwarder,
}

impl BattleEngine {
    pub fn new(storage: StorageManager) -> Self {
        Self {
            awarder: AchievementAwarder::new(storage.clone()),
            storage,
        }
    }

    /// Cast `spell_id` at the actor's opponent
    pub async fn apply_move(
        &self,
        battle_id: BattleId,
        actor: PlayerId,
        spell_id: SpellId,
    ) -> ServiceResult<MoveReport> {
        let battle = load_battle(&self.storage, battle_id).await?;
        battle.check_move(actor)?;

        if !self.storage.players.has_learned(actor, spell_id).await? {
            return Err(BattleError::SpellNotOwned {
                player: actor,
                spell: spell_id,
            }
            .into());
        }
        let spell = self
            .storage
            .players
            .get_spell(spell_id)
            .await?
            .ok_or_else(|| BattleError::spell_not_found(spell_id))?;

        let outcome = battle.apply_move(actor, spell.damage)?;
        let guard = TurnGuard::for_move(&battle, actor);

        if !outcome.is_finished() {
            if !self.storage.battles.record_turn(guard, &outcome.battle).await? {
                return Err(self.explain_lost_move(battle_id, actor).await);
            }

            let hp = outcome.battle.hp();
            info!(
                battle_id = %battle_id,
                actor = %actor,
                spell = %spell_id,
                damage = outcome.damage,
                challenger_hp = hp.challenger,
                opponent_hp = hp.opponent,
                "Move applied"
            );
            return Ok(MoveReport {
                battle: BattleSnapshot::from(&outcome.battle),
                spell_id,
                damage: outcome.damage,
                settlement: None,
                achievements: Vec::new(),
            });
        }

        let Some(settlement) = self.storage.battles.finish(guard, &outcome.battle).await? else {
            return Err(self.explain_lost_move(battle_id, actor).await);
        };

        let winner = settlement.winner.player_id;
        info!(
            battle_id = %battle_id,
            actor = %actor,
            spell = %spell_id,
            damage = outcome.damage,
            winner = %winner,
            loser = %settlement.loser.player_id,
            "Battle finished"
        );

        // The battle and rewards are already committed. A failed evaluation is
        // retried when the result is viewed.
        let achievements = self.evaluate_achievements(battle_id, winner).await;

        Ok(MoveReport {
            battle: BattleSnapshot::from(&outcome.battle),
            spell_id,
            damage: outcome.damage,
            settlement: Some(settlement),
            achievements,
        })
    }

    /// Unlocks for the winner; failures are logged, never surfaced
    async fn evaluate_achievements(&self, battle_id: BattleId, winner: PlayerId) -> Vec<Achievement> {
        match self.awarder.evaluate_winner(winner).await {
            Ok(awarded) => awarded,
            Err(err) => {
                error!(battle_id = %battle_id, winner = %winner, error = %err, "Achievement evaluation failed");
                Vec::new()
            }
        }
    }

    async fn explain_lost_move(&self, battle_id: BattleId, actor: PlayerId) -> ServiceError {
        explain_lost_write(&self.storage, battle_id, |b| b.check_move(actor).map(|_| ())).await
    }

    /// Current state of a live battle. A finished battle is reported as
    /// `InvalidState` so the caller switches to the result view.
    pub async fn get_state(&self, battle_id: BattleId, viewer: PlayerId) -> ServiceResult<BattleView> {
        let battle = load_battle(&self.storage, battle_id).await?;
        battle.authorize(viewer)?;

        if battle.status() == BattleStatus::Finished {
            return Err(BattleError::InvalidState {
                battle: battle_id,
                expected: BattleStatus::Active,
                actual: BattleStatus::Finished,
            }
            .into());
        }

        let spells = self.storage.players.learned_spells(viewer).await?;
        debug!(battle_id = %battle_id, viewer = %viewer, status = %battle.status(), "Battle state read");

        Ok(BattleView {
            your_turn: battle.current_turn_player() == Some(viewer),
            battle: BattleSnapshot::from(&battle),
            spells,
        })
    }

    /// Outcome and rewards of a finished battle, read from the stored settlement.
    ///
    /// Also re-runs the winner's achievement evaluation. It is idempotent, so a
    /// view never double-awards, and it completes an evaluation that failed after
    /// the finishing move.
    pub async fn get_result(
        &self,
        battle_id: BattleId,
        viewer: PlayerId,
    ) -> ServiceResult<BattleResultView> {
        let battle = load_battle(&self.storage, battle_id).await?;
        battle.authorize(viewer)?;

        let (Some(winner_id), Some(loser_id)) = (battle.winner(), battle.loser()) else {
            return Err(BattleError::InvalidState {
                battle: battle_id,
                expected: BattleStatus::Finished,
                actual: battle.status(),
            }
            .into());
        };

        let settlement = self
            .storage
            .battles
            .settlement(battle_id)
            .await?
            .ok_or_else(|| {
                StorageError::Corrupt(format!("finished battle {battle_id} has no settlement"))
            })?;

        let leveled_up = settlement
            .reward_for(viewer)
            .is_some_and(AppliedReward::leveled_up);
        let recovered = self.evaluate_achievements(battle_id, winner_id).await;
        debug!(
            battle_id = %battle_id,
            viewer = %viewer,
            leveled_up,
            recovered = recovered.len(),
            "Battle result read"
        );

        let hp = battle.hp();
        Ok(BattleResultView {
            battle_id,
            winner_id,
            loser_id,
            challenger_hp: hp.challenger,
            opponent_hp: hp.opponent,
            winner: settlement.winner,
            loser: settlement.loser,
            leveled_up,
            settled_at: settlement.settled_at,
        })
    }
}
