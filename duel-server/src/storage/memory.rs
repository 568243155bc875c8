//! In-memory storage backend.
//!
//! All tables sit behind one `parking_lot::Mutex`, and every repository call takes
//! the lock once, checks its condition and writes. That gives each call the same
//! all-or-nothing behaviour as a PostgreSQL transaction, so the services behave
//! identically against either backend. The lock is never held across an `.await`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};

use duel_core::achievements::{AchievementKey, BattleHistory, EarnedSet};
use duel_core::battle::{Battle, BattleState, BattleStatus};
use duel_core::constants::{STARTING_CURRENCY, STARTING_LEVEL};
use duel_core::model::{Achievement, BattleId, HouseId, Player, PlayerId, Spell, SpellId};
use duel_core::rewards::{self, Settlement};

use super::repository::*;
use super::seed_data;
use super::StorageError;

#[derive(Default)]
struct Tables {
    next_player_id: i64,
    next_battle_id: i64,
    players: BTreeMap<PlayerId, Player>,
    spells: BTreeMap<SpellId, Spell>,
    learned: BTreeSet<(PlayerId, SpellId)>,
    battles: BTreeMap<BattleId, Battle>,
    achievements: Vec<Achievement>,
    awards: BTreeMap<(PlayerId, AchievementKey), DateTime<Utc>>,
    settlements: BTreeMap<BattleId, Settlement>,
}

impl Tables {
    fn open_battle_between(&self, a: PlayerId, b: PlayerId) -> bool {
        self.battles.values().any(|battle| {
            matches!(battle.status(), BattleStatus::Pending | BattleStatus::Active)
                && ((battle.challenger == a && battle.opponent == b)
                    || (battle.challenger == b && battle.opponent == a))
        })
    }

    fn player(&self, id: PlayerId) -> Result<&Player, StorageError> {
        self.players
            .get(&id)
            .ok_or_else(|| StorageError::NotFound(format!("player {id}")))
    }

    /// Battle that is still exactly as `guard` expects
    fn guarded(&self, guard: TurnGuard) -> Option<&Battle> {
        self.battles.get(&guard.battle_id).filter(|b| guard.holds(b))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Empty store: no spells, no achievements
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with the starter spells and the achievement catalog
    pub fn seeded() -> Self {
        let store = Self::new();
        {
            let mut t = store.tables.lock();
            for spell in seed_data::starter_spells() {
                t.spells.insert(spell.id, spell);
            }
            t.achievements = seed_data::achievement_catalog();
        }
        store
    }

    /// Signup stand-in: a level 1 player with starting currency
    pub fn create_player(&self, username: &str, house_id: Option<HouseId>) -> Player {
        let mut t = self.tables.lock();
        t.next_player_id += 1;
        let player = Player {
            id: PlayerId(t.next_player_id),
            username: username.to_string(),
            level: STARTING_LEVEL,
            experience: 0,
            currency: STARTING_CURRENCY,
            house_id,
        };
        t.players.insert(player.id, player.clone());
        player
    }

    /// Replace a player's stored stats (test and admin helper)
    pub fn put_player(&self, player: Player) {
        self.tables.lock().players.insert(player.id, player);
    }

    pub fn add_spell(&self, spell: Spell) {
        self.tables.lock().spells.insert(spell.id, spell);
    }

    /// Shop stand-in: insert-only ownership
    pub fn learn_spell(&self, player: PlayerId, spell: SpellId) {
        self.tables.lock().learned.insert((player, spell));
    }

    pub fn player(&self, id: PlayerId) -> Option<Player> {
        self.tables.lock().players.get(&id).cloned()
    }

    pub fn battle(&self, id: BattleId) -> Option<Battle> {
        self.tables.lock().battles.get(&id).cloned()
    }

    pub fn award_count(&self, player: PlayerId) -> usize {
        self.tables
            .lock()
            .awards
            .keys()
            .filter(|(p, _)| *p == player)
            .count()
    }
}

#[async_trait]
impl PlayerDirectory for MemoryStore {
    async fn get_player(&self, id: PlayerId) -> RepoResult<Option<Player>> {
        Ok(self.player(id))
    }

    async fn get_spell(&self, id: SpellId) -> RepoResult<Option<Spell>> {
        Ok(self.tables.lock().spells.get(&id).cloned())
    }

    async fn learned_spells(&self, player: PlayerId) -> RepoResult<Vec<Spell>> {
        let t = self.tables.lock();
        Ok(t.learned
            .iter()
            .filter(|(p, _)| *p == player)
            .filter_map(|(_, spell)| t.spells.get(spell).cloned())
            .collect())
    }

    async fn has_learned(&self, player: PlayerId, spell: SpellId) -> RepoResult<bool> {
        Ok(self.tables.lock().learned.contains(&(player, spell)))
    }
}

#[async_trait]
impl BattleRepo for MemoryStore {
    async fn get(&self, id: BattleId) -> RepoResult<Option<Battle>> {
        Ok(self.battle(id))
    }

    async fn insert_challenge(
        &self,
        challenger: PlayerId,
        opponent: PlayerId,
    ) -> RepoResult<Option<Battle>> {
        let mut t = self.tables.lock();
        if t.open_battle_between(challenger, opponent) {
            return Ok(None);
        }
        t.next_battle_id += 1;
        let battle = Battle {
            id: BattleId(t.next_battle_id),
            challenger,
            opponent,
            state: BattleState::Pending,
            moves: 0,
        };
        t.battles.insert(battle.id, battle.clone());
        Ok(Some(battle))
    }

    async fn activate(&self, next: &Battle, responder: PlayerId) -> RepoResult<bool> {
        let mut t = self.tables.lock();
        let Some(current) = t.battles.get_mut(&next.id) else {
            return Ok(false);
        };
        if current.status() != BattleStatus::Pending || current.opponent != responder {
            return Ok(false);
        }
        current.state = next.state;
        Ok(true)
    }

    async fn delete_declined(&self, id: BattleId, responder: PlayerId) -> RepoResult<bool> {
        let mut t = self.tables.lock();
        let matches = t
            .battles
            .get(&id)
            .is_some_and(|b| b.status() == BattleStatus::Pending && b.opponent == responder);
        if matches {
            t.battles.remove(&id);
        }
        Ok(matches)
    }

    async fn delete_cancelled(&self, id: BattleId, requester: PlayerId) -> RepoResult<bool> {
        let mut t = self.tables.lock();
        let matches = t
            .battles
            .get(&id)
            .is_some_and(|b| b.status() == BattleStatus::Pending && b.challenger == requester);
        if matches {
            t.battles.remove(&id);
        }
        Ok(matches)
    }

    async fn record_turn(&self, guard: TurnGuard, next: &Battle) -> RepoResult<bool> {
        let mut t = self.tables.lock();
        if t.guarded(guard).is_none() {
            return Ok(false);
        }
        t.battles.insert(guard.battle_id, next.clone());
        Ok(true)
    }

    async fn finish(&self, guard: TurnGuard, next: &Battle) -> RepoResult<Option<Settlement>> {
        let mut t = self.tables.lock();
        if t.guarded(guard).is_none() {
            return Ok(None);
        }
        let (Some(winner_id), Some(loser_id)) = (next.winner(), next.loser()) else {
            return Err(StorageError::Corrupt(format!(
                "battle {} finished without a winner",
                next.id
            )));
        };

        let settled = rewards::settle(
            next.id,
            t.player(winner_id)?,
            t.player(loser_id)?,
            Utc::now(),
        );

        t.players.insert(winner_id, settled.winner);
        t.players.insert(loser_id, settled.loser);
        t.battles.insert(next.id, next.clone());
        t.settlements.insert(next.id, settled.settlement.clone());
        Ok(Some(settled.settlement))
    }

    async fn settlement(&self, id: BattleId) -> RepoResult<Option<Settlement>> {
        Ok(self.tables.lock().settlements.get(&id).cloned())
    }

    async fn history(&self, player: PlayerId) -> RepoResult<BattleHistory> {
        let t = self.tables.lock();
        let mut history = BattleHistory::default();
        for battle in t.battles.values() {
            if battle.winner() != Some(player) {
                continue;
            }
            history.wins += 1;
            let house = battle
                .loser()
                .and_then(|loser| t.players.get(&loser))
                .and_then(|loser| loser.house_id);
            if let Some(house) = house {
                history.defeated_houses.insert(house);
            }
        }
        Ok(history)
    }
}

#[async_trait]
impl AchievementRepo for MemoryStore {
    async fn catalog(&self) -> RepoResult<Vec<Achievement>> {
        Ok(self.tables.lock().achievements.clone())
    }

    async fn earned(&self, player: PlayerId) -> RepoResult<EarnedSet> {
        Ok(self
            .tables
            .lock()
            .awards
            .keys()
            .filter(|(p, _)| *p == player)
            .map(|(_, key)| *key)
            .collect())
    }

    async fn award(
        &self,
        player: PlayerId,
        achievement: &Achievement,
        awarded_at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut t = self.tables.lock();
        if t.awards.contains_key(&(player, achievement.key)) {
            return Ok(false);
        }
        let Some(row) = t.players.get_mut(&player) else {
            return Err(StorageError::NotFound(format!("player {player}")));
        };
        row.currency = row.currency.saturating_add(achievement.points_awarded);
        t.awards.insert((player, achievement.key), awarded_at);
        Ok(true)
    }
}
