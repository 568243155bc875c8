//! PostgreSQL Repository Adapters
//!
//! Implements the Repository traits from `repository.rs` using PostgresStore
//! as the backend. Converts SQL rows into `duel_core` types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use duel_core::achievements::{AchievementKey, BattleHistory, EarnedSet};
use duel_core::battle::Battle;
use duel_core::model::{Achievement, BattleId, HouseId, Player, PlayerId, Spell, SpellId};
use duel_core::rewards::Settlement;

use super::postgres::{column, PostgresStore};
use super::repository::*;
use super::StorageError;

/// Spells are immutable reference rows, so lookups are cached
const SPELL_CACHE_CAPACITY: usize = 256;

// ============================================================================
// PlayerDirectory Adapter
// ============================================================================

pub struct PgPlayerDirectory {
    store: Arc<PostgresStore>,
    spell_cache: Mutex<LruCache<SpellId, Spell>>,
}

impl PgPlayerDirectory {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        let capacity = NonZeroUsize::new(SPELL_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            spell_cache: Mutex::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl PlayerDirectory for PgPlayerDirectory {
    async fn get_player(&self, id: PlayerId) -> RepoResult<Option<Player>> {
        let row = self.store.get_player(id).await?;
        row.as_ref().map(Player::try_from).transpose()
    }

    async fn get_spell(&self, id: SpellId) -> RepoResult<Option<Spell>> {
        if let Some(spell) = self.spell_cache.lock().get(&id) {
            return Ok(Some(spell.clone()));
        }

        let spell = self
            .store
            .get_spell(id)
            .await?
            .map(Spell::try_from)
            .transpose()?;
        if let Some(ref spell) = spell {
            self.spell_cache.lock().put(id, spell.clone());
        }
        Ok(spell)
    }

    async fn learned_spells(&self, player: PlayerId) -> RepoResult<Vec<Spell>> {
        let rows = self.store.learned_spells(player).await?;
        rows.into_iter().map(Spell::try_from).collect()
    }

    async fn has_learned(&self, player: PlayerId, spell: SpellId) -> RepoResult<bool> {
        self.store.has_learned(player, spell).await
    }
}

// ============================================================================
// BattleRepo Adapter
// ============================================================================

pub struct PgBattleRepo {
    store: Arc<PostgresStore>,
}

impl PgBattleRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BattleRepo for PgBattleRepo {
    async fn get(&self, id: BattleId) -> RepoResult<Option<Battle>> {
        self.store
            .get_battle(id.0)
            .await?
            .map(Battle::try_from)
            .transpose()
    }

    async fn insert_challenge(
        &self,
        challenger: PlayerId,
        opponent: PlayerId,
    ) -> RepoResult<Option<Battle>> {
        self.store
            .insert_challenge(challenger, opponent)
            .await?
            .map(Battle::try_from)
            .transpose()
    }

    async fn activate(&self, next: &Battle, responder: PlayerId) -> RepoResult<bool> {
        self.store.activate_battle(next, responder).await
    }

    async fn delete_declined(&self, id: BattleId, responder: PlayerId) -> RepoResult<bool> {
        self.store.delete_declined(id.0, responder).await
    }

    async fn delete_cancelled(&self, id: BattleId, requester: PlayerId) -> RepoResult<bool> {
        self.store.delete_cancelled(id.0, requester).await
    }

    async fn record_turn(&self, guard: TurnGuard, next: &Battle) -> RepoResult<bool> {
        debug_assert_eq!(guard.battle_id, next.id);
        self.store.record_turn(guard, next).await
    }

    async fn finish(&self, guard: TurnGuard, next: &Battle) -> RepoResult<Option<Settlement>> {
        debug_assert_eq!(guard.battle_id, next.id);
        self.store.finish_battle(guard, next).await
    }

    async fn settlement(&self, id: BattleId) -> RepoResult<Option<Settlement>> {
        let row = self.store.get_settlement(id.0).await?;
        row.map(Settlement::try_from).transpose()
    }

    async fn history(&self, player: PlayerId) -> RepoResult<BattleHistory> {
        let wins = self.store.count_wins(player).await?;
        let houses = self.store.defeated_houses(player).await?;
        Ok(BattleHistory {
            wins: column(wins, "wins")?,
            defeated_houses: houses.into_iter().map(HouseId).collect(),
        })
    }
}

// ============================================================================
// AchievementRepo Adapter
// ============================================================================

pub struct PgAchievementRepo {
    store: Arc<PostgresStore>,
}

impl PgAchievementRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AchievementRepo for PgAchievementRepo {
    async fn catalog(&self) -> RepoResult<Vec<Achievement>> {
        let rows = self.store.list_achievements().await?;
        rows.into_iter().map(Achievement::try_from).collect()
    }

    async fn earned(&self, player: PlayerId) -> RepoResult<EarnedSet> {
        let slugs = self.store.earned_achievements(player).await?;
        slugs
            .iter()
            .map(|slug| {
                AchievementKey::parse(slug)
                    .ok_or_else(|| StorageError::Corrupt(format!("unknown achievement '{slug}'")))
            })
            .collect()
    }

    async fn award(
        &self,
        player: PlayerId,
        achievement: &Achievement,
        awarded_at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        self.store
            .award_achievement(player, achievement, awarded_at)
            .await
    }
}
