//! ChallengeManager - challenge records before the first move

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use duel_core::battle::{Battle, BattleSnapshot, Hp};
use duel_core::model::{BattleId, PlayerId};
use duel_core::progression::max_hp;
use duel_core::BattleError;

use super::{explain_lost_write, load_battle, load_player, ServiceResult};
use crate::storage::StorageManager;

/// Opponent's answer to a pending challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeResponse {
    Accept,
    Decline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ChallengeResolution {
    /// The battle is ACTIVE and the challenger moves first
    Accepted { battle: BattleSnapshot },
    /// The challenge record was deleted
    Declined { battle_id: BattleId },
}

#[derive(Clone)]
pub struct ChallengeManager {
    storage: StorageManager,
}

impl ChallengeManager {
    pub fn new(storage: StorageManager) -> Self {
        Self { storage }
    }

    /// Open a PENDING battle against `opponent`.
    ///
    /// The open-pair check and the insert are one atomic step in storage, so two
    /// racing challenges between the same players yield exactly one battle.
    pub async fn create_challenge(
        &self,
        challenger: PlayerId,
        opponent: PlayerId,
    ) -> ServiceResult<Battle> {
        if challenger == opponent {
            return Err(BattleError::InvalidTarget { player: challenger }.into());
        }
        load_player(&self.storage, challenger).await?;
        load_player(&self.storage, opponent).await?;

        let battle = self
            .storage
            .battles
            .insert_challenge(challenger, opponent)
            .await?
            .ok_or(BattleError::ChallengeExists {
                challenger,
                opponent,
            })?;

        info!(
            battle_id = %battle.id,
            challenger = %challenger,
            opponent = %opponent,
            "Challenge created"
        );
        Ok(battle)
    }

    pub async fn respond(
        &self,
        battle_id: BattleId,
        responder: PlayerId,
        response: ChallengeResponse,
    ) -> ServiceResult<ChallengeResolution> {
        let battle = load_battle(&self.storage, battle_id).await?;
        battle.check_response(responder)?;

        match response {
            ChallengeResponse::Accept => self.accept(battle, responder).await,
            ChallengeResponse::Decline => {
                let deleted = self
                    .storage
                    .battles
                    .delete_declined(battle_id, responder)
                    .await?;
                if !deleted {
                    return Err(explain_lost_write(&self.storage, battle_id, |b| {
                        b.check_response(responder)
                    })
                    .await);
                }

                info!(battle_id = %battle_id, responder = %responder, "Challenge declined");
                Ok(ChallengeResolution::Declined { battle_id })
            }
        }
    }

    async fn accept(&self, battle: Battle, responder: PlayerId) -> ServiceResult<ChallengeResolution> {
        let challenger = load_player(&self.storage, battle.challenger).await?;
        let opponent = load_player(&self.storage, battle.opponent).await?;
        let hp = Hp::new(max_hp(challenger.level), max_hp(opponent.level));
        debug!(
            battle_id = %battle.id,
            challenger_hp = hp.challenger,
            opponent_hp = hp.opponent,
            "Starting hit points"
        );

        let next = battle.accept(responder, hp)?;
        if !self.storage.battles.activate(&next, responder).await? {
            return Err(explain_lost_write(&self.storage, battle.id, |b| {
                b.check_response(responder)
            })
            .await);
        }

        info!(battle_id = %next.id, responder = %responder, "Challenge accepted");
        Ok(ChallengeResolution::Accepted {
            battle: BattleSnapshot::from(&next),
        })
    }

    /// Withdraw a PENDING challenge. Only the challenger may cancel.
    pub async fn cancel(&self, battle_id: BattleId, requester: PlayerId) -> ServiceResult<()> {
        let battle = load_battle(&self.storage, battle_id).await?;
        battle.check_cancel(requester)?;

        let deleted = self
            .storage
            .battles
            .delete_cancelled(battle_id, requester)
            .await?;
        if !deleted {
            return Err(explain_lost_write(&self.storage, battle_id, |b| {
                b.check_cancel(requester)
            })
            .await);
        }

        info!(battle_id = %battle_id, requester = %requester, "Challenge cancelled");
        Ok(())
    }
}
