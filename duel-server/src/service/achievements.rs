//! AchievementAwarder - post-battle unlocks

use chrono::Utc;
use tracing::{debug, info};

use duel_core::achievements;
use duel_core::model::{Achievement, PlayerId};

use super::ServiceResult;
use crate::storage::StorageManager;

#[derive(Clone)]
pub struct AchievementAwarder {
    storage: StorageManager,
}

impl AchievementAwarder {
    pub fn new(storage: StorageManager) -> Self {
        Self { storage }
    }

    /// Evaluate the winner's full history and persist anything newly unlocked.
    ///
    /// Safe to re-run: already-earned achievements are skipped by the evaluator,
    /// and an award that loses an insert race credits nothing. Returns only the
    /// achievements this call actually awarded.
    pub async fn evaluate_winner(&self, player: PlayerId) -> ServiceResult<Vec<Achievement>> {
        let history = self.storage.battles.history(player).await?;
        let earned = self.storage.achievements.earned(player).await?;
        let catalog = self.storage.achievements.catalog().await?;

        let evaluation = achievements::evaluate(&history, earned, &catalog);
        debug!(
            player = %player,
            wins = history.wins,
            houses = history.defeated_houses.len(),
            unlocked = evaluation.unlocked.len(),
            "Achievements evaluated"
        );

        let awarded_at = Utc::now();
        let mut awarded = Vec::with_capacity(evaluation.unlocked.len());
        for achievement in evaluation.unlocked {
            if self
                .storage
                .achievements
                .award(player, &achievement, awarded_at)
                .await?
            {
                info!(
                    player = %player,
                    achievement = %achievement.key,
                    points = achievement.points_awarded,
                    "Achievement awarded"
                );
                awarded.push(achievement);
            } else {
                debug!(player = %player, achievement = %achievement.key, "Already awarded");
            }
        }

        Ok(awarded)
    }
}
