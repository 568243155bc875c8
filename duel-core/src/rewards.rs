//! Post-battle rewards.
//!
//! Winner: 50 xp, plus 25 currency when the loser belongs to a different house.
//! Loser: 10 xp and 5 currency, always paid to the structural loser of the battle.
//! Experience gains go through [`Progress::gain`] so level-ups carry exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{CROSS_HOUSE_BONUS, LOSER_CURRENCY, LOSER_EXPERIENCE, WINNER_EXPERIENCE};
use crate::model::{BattleId, HouseId, Player, PlayerId};
use crate::progression::Progress;

/// Experience and currency owed to one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardDelta {
    pub player_id: PlayerId,
    pub experience: u64,
    pub currency: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPlan {
    pub winner: RewardDelta,
    pub loser: RewardDelta,
}

/// Two house-less players count as the same house
pub fn same_house(a: Option<HouseId>, b: Option<HouseId>) -> bool {
    a == b
}

impl RewardPlan {
    pub fn for_outcome(winner: &Player, loser: &Player) -> Self {
        let bonus = if same_house(winner.house_id, loser.house_id) {
            0
        } else {
            CROSS_HOUSE_BONUS
        };
        Self {
            winner: RewardDelta {
                player_id: winner.id,
                experience: WINNER_EXPERIENCE,
                currency: bonus,
            },
            loser: RewardDelta {
                player_id: loser.id,
                experience: LOSER_EXPERIENCE,
                currency: LOSER_CURRENCY,
            },
        }
    }
}

/// What a participant actually received, including level movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedReward {
    pub player_id: PlayerId,
    pub experience_gained: u64,
    pub currency_gained: u64,
    pub level_before: u32,
    pub level_after: u32,
    pub experience_after: u64,
    pub currency_after: u64,
}

impl AppliedReward {
    pub fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

impl RewardDelta {
    /// Apply to the player's current stats, resolving level-ups
    pub fn apply(&self, player: &Player) -> (Player, AppliedReward) {
        let resolution = Progress::new(player.level, player.experience).gain(self.experience);
        let currency_after = player.currency.saturating_add(self.currency);

        let updated = Player {
            level: resolution.after.level,
            experience: resolution.after.experience,
            currency: currency_after,
            ..player.clone()
        };
        let applied = AppliedReward {
            player_id: player.id,
            experience_gained: self.experience,
            currency_gained: self.currency,
            level_before: resolution.before.level,
            level_after: resolution.after.level,
            experience_after: resolution.after.experience,
            currency_after,
        };
        (updated, applied)
    }
}

/// Persisted reward outcome of one finished battle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub battle_id: BattleId,
    pub winner: AppliedReward,
    pub loser: AppliedReward,
    pub settled_at: DateTime<Utc>,
}

impl Settlement {
    pub fn reward_for(&self, player: PlayerId) -> Option<&AppliedReward> {
        if self.winner.player_id == player {
            Some(&self.winner)
        } else if self.loser.player_id == player {
            Some(&self.loser)
        } else {
            None
        }
    }
}

/// Settlement plus the participants' updated stats, ready to be written together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledPlayers {
    pub settlement: Settlement,
    pub winner: Player,
    pub loser: Player,
}

/// Compute both participants' rewards from their current stats
pub fn settle(
    battle_id: BattleId,
    winner: &Player,
    loser: &Player,
    settled_at: DateTime<Utc>,
) -> SettledPlayers {
    let plan = RewardPlan::for_outcome(winner, loser);
    let (winner_after, winner_reward) = plan.winner.apply(winner);
    let (loser_after, loser_reward) = plan.loser.apply(loser);

    SettledPlayers {
        settlement: Settlement {
            battle_id,
            winner: winner_reward,
            loser: loser_reward,
            settled_at,
        },
        winner: winner_after,
        loser: loser_after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: i64, level: u32, experience: u64, house: Option<i64>) -> Player {
        Player {
            id: PlayerId(id),
            username: format!("wizard{id}"),
            level,
            experience,
            currency: 100,
            house_id: house.map(HouseId),
        }
    }

    #[test]
    fn test_cross_house_winner_gets_bonus() {
        let plan = RewardPlan::for_outcome(&player(1, 1, 0, Some(1)), &player(2, 1, 0, Some(2)));
        assert_eq!(plan.winner.experience, 50);
        assert_eq!(plan.winner.currency, 25);
        assert_eq!(plan.loser.experience, 10);
        assert_eq!(plan.loser.currency, 5);
    }

    #[test]
    fn test_same_house_winner_gets_no_bonus() {
        let plan = RewardPlan::for_outcome(&player(1, 1, 0, Some(3)), &player(2, 1, 0, Some(3)));
        assert_eq!(plan.winner.currency, 0);
    }

    #[test]
    fn test_houseless_pairs() {
        let both_none = RewardPlan::for_outcome(&player(1, 1, 0, None), &player(2, 1, 0, None));
        assert_eq!(both_none.winner.currency, 0);
        let one_none = RewardPlan::for_outcome(&player(1, 1, 0, None), &player(2, 1, 0, Some(4)));
        assert_eq!(one_none.winner.currency, 25);
    }

    #[test]
    fn test_settle_levels_up_winner_with_carry() {
        // 70 + 50 = 120 ≥ threshold(1) = 110 → level 2 with 10 left
        let winner = player(1, 1, 70, Some(1));
        let loser = player(2, 4, 0, Some(2));
        let settled = settle(BattleId(9), &winner, &loser, Utc::now());

        assert_eq!(settled.winner.level, 2);
        assert_eq!(settled.winner.experience, 10);
        assert_eq!(settled.winner.currency, 125);
        assert!(settled.settlement.winner.leveled_up());

        assert_eq!(settled.loser.level, 4);
        assert_eq!(settled.loser.experience, 10);
        assert_eq!(settled.loser.currency, 105);
        assert!(!settled.settlement.loser.leveled_up());
    }

    #[test]
    fn test_reward_for_finds_each_side() {
        let settled = settle(
            BattleId(1),
            &player(1, 1, 0, None),
            &player(2, 1, 0, None),
            Utc::now(),
        );
        let s = &settled.settlement;
        assert_eq!(s.reward_for(PlayerId(1)).unwrap().experience_gained, 50);
        assert_eq!(s.reward_for(PlayerId(2)).unwrap().experience_gained, 10);
        assert!(s.reward_for(PlayerId(3)).is_none());
    }
}
