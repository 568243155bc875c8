//! PostgreSQL Storage - durable battle state
//!
//! The shared store between requests. Uses `sqlx` for async queries.
//!
//! ## Tables
//! - houses, players, spells, learned_spells
//! - battles, battle_settlements
//! - achievements, achievement_awards
//!
//! Every state transition is a conditional `UPDATE`/`DELETE` whose `WHERE` clause
//! restates the expected status (and, for moves, the turn holder and move count),
//! so two racing requests can never both apply and a move computed from an older
//! read never lands. A transition that matched no row reports `false`/`None`.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};

use duel_core::achievements::AchievementKey;
use duel_core::battle::{Battle, BattleStatus, Hp};
use duel_core::model::{Achievement, HouseId, Player, PlayerId, Spell, SpellId};
use duel_core::rewards::{self, AppliedReward, Settlement};

use super::migrations;
use super::repository::TurnGuard;
use super::seed_data;
use super::StorageError;

/// PostgreSQL connection pool wrapper
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to PostgreSQL and run migrations
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("PostgreSQL connected (max_connections={})", max_connections);

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Connect with an existing pool (for testing)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run all pending migrations
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        // Create migrations tracking table
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name VARCHAR(100) PRIMARY KEY,
                applied_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await?;

        for (name, sql) in migrations::get_migrations() {
            let applied: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE name = $1)")
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await?;

            if !applied {
                info!("Running migration: {}", name);
                sqlx::raw_sql(sql)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StorageError::Migration(format!("{}: {}", name, e)))?;

                sqlx::query("INSERT INTO _migrations (name) VALUES ($1)")
                    .bind(name)
                    .execute(&self.pool)
                    .await?;

                info!("Migration applied: {}", name);
            } else {
                debug!("Migration already applied: {}", name);
            }
        }

        Ok(())
    }

    // ========================================================================
    // Seeding
    // ========================================================================

    /// Houses, spells and the achievement catalog. Safe to run on every start.
    pub async fn seed_reference_data(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        for house in seed_data::houses() {
            sqlx::query("INSERT INTO houses (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
                .bind(house.id.0)
                .bind(&house.name)
                .execute(&mut *tx)
                .await?;
        }

        for spell in seed_data::starter_spells() {
            sqlx::query(
                "INSERT INTO spells (id, name, damage, mana_cost, price)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(spell.id.0)
            .bind(&spell.name)
            .bind(int(spell.damage, "damage")?)
            .bind(int(spell.mana_cost, "mana_cost")?)
            .bind(bigint(spell.price, "price")?)
            .execute(&mut *tx)
            .await?;
        }

        for achievement in seed_data::achievement_catalog() {
            sqlx::query(
                "INSERT INTO achievements (slug, title, points_awarded)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (slug) DO NOTHING",
            )
            .bind(achievement.key.slug())
            .bind(&achievement.title)
            .bind(bigint(achievement.points_awarded, "points_awarded")?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Reference data seeded");
        Ok(())
    }

    /// Demo players with their learned spells
    pub async fn seed_demo_players(&self) -> Result<(), StorageError> {
        for &(username, house, spells) in seed_data::DEMO_PLAYERS {
            let player = match self.find_player_by_username(username).await? {
                Some(row) => row.id,
                None => self.create_player(username, Some(HouseId(house))).await?,
            };
            for &spell in spells {
                self.learn_spell(PlayerId(player), SpellId(spell)).await?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Player & Spell Operations
    // ========================================================================

    /// Create a level 1 player with the starting balance
    pub async fn create_player(
        &self,
        username: &str,
        house_id: Option<HouseId>,
    ) -> Result<i64, StorageError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO players (username, house_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(username)
        .bind(house_id.map(|h| h.0))
        .fetch_one(&self.pool)
        .await?;

        info!("Created player: {} (id={})", username, id);
        Ok(id)
    }

    pub async fn get_player(&self, id: PlayerId) -> Result<Option<PlayerRow>, StorageError> {
        let row = sqlx::query_as::<_, PlayerRow>(
            "SELECT id, username, level, experience, currency, house_id
             FROM players WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_player_by_username(
        &self,
        username: &str,
    ) -> Result<Option<PlayerRow>, StorageError> {
        let row = sqlx::query_as::<_, PlayerRow>(
            "SELECT id, username, level, experience, currency, house_id
             FROM players WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_spell(&self, id: SpellId) -> Result<Option<SpellRow>, StorageError> {
        let row = sqlx::query_as::<_, SpellRow>(
            "SELECT id, name, damage, mana_cost, price FROM spells WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn learned_spells(&self, player: PlayerId) -> Result<Vec<SpellRow>, StorageError> {
        let rows = sqlx::query_as::<_, SpellRow>(
            "SELECT s.id, s.name, s.damage, s.mana_cost, s.price
             FROM learned_spells l JOIN spells s ON s.id = l.spell_id
             WHERE l.player_id = $1
             ORDER BY s.id",
        )
        .bind(player.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn has_learned(&self, player: PlayerId, spell: SpellId) -> Result<bool, StorageError> {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM learned_spells WHERE player_id = $1 AND spell_id = $2)",
        )
        .bind(player.0)
        .bind(spell.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(owned)
    }

    /// Record spell ownership (insert-only)
    pub async fn learn_spell(&self, player: PlayerId, spell: SpellId) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO learned_spells (player_id, spell_id) VALUES ($1, $2)
             ON CONFLICT (player_id, spell_id) DO NOTHING",
        )
        .bind(player.0)
        .bind(spell.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ========================================================================
    // Battle Operations
    // ========================================================================

    pub async fn get_battle(&self, id: i64) -> Result<Option<BattleRow>, StorageError> {
        let row = sqlx::query_as::<_, BattleRow>(
            "SELECT id, challenger_id, opponent_id, status, challenger_hp, opponent_hp,
                    current_turn_player_id, winner_id, moves
             FROM battles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Insert a PENDING battle. The open-pair unique index rejects a second open
    /// battle between the same two players, reported as `None`.
    pub async fn insert_challenge(
        &self,
        challenger: PlayerId,
        opponent: PlayerId,
    ) -> Result<Option<BattleRow>, StorageError> {
        let result = sqlx::query_as::<_, BattleRow>(
            "INSERT INTO battles (challenger_id, opponent_id, status, current_turn_player_id)
             VALUES ($1, $2, 0, $2)
             RETURNING id, challenger_id, opponent_id, status, challenger_hp, opponent_hp,
                       current_turn_player_id, winner_id, moves",
        )
        .bind(challenger.0)
        .bind(opponent.0)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => {
                debug!(battle_id = row.id, "Challenge inserted");
                Ok(Some(row))
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// PENDING → ACTIVE if `responder` is still the opponent of a pending battle
    pub async fn activate_battle(
        &self,
        next: &Battle,
        responder: PlayerId,
    ) -> Result<bool, StorageError> {
        let hp = next.hp();
        let result = sqlx::query(
            "UPDATE battles
             SET status = 1, challenger_hp = $3, opponent_hp = $4,
                 current_turn_player_id = $5, updated_at = NOW()
             WHERE id = $1 AND status = 0 AND opponent_id = $2",
        )
        .bind(next.id.0)
        .bind(responder.0)
        .bind(int(hp.challenger, "challenger_hp")?)
        .bind(int(hp.opponent, "opponent_hp")?)
        .bind(next.stored_turn_player().0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a PENDING battle where `player` holds the `role` column
    async fn delete_pending(
        &self,
        id: i64,
        player: PlayerId,
        role: PendingRole,
    ) -> Result<bool, StorageError> {
        let sql = match role {
            PendingRole::Opponent => {
                "DELETE FROM battles WHERE id = $1 AND status = 0 AND opponent_id = $2"
            }
            PendingRole::Challenger => {
                "DELETE FROM battles WHERE id = $1 AND status = 0 AND challenger_id = $2"
            }
        };
        let result = sqlx::query(sql)
            .bind(id)
            .bind(player.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_declined(&self, id: i64, responder: PlayerId) -> Result<bool, StorageError> {
        self.delete_pending(id, responder, PendingRole::Opponent).await
    }

    pub async fn delete_cancelled(&self, id: i64, requester: PlayerId) -> Result<bool, StorageError> {
        self.delete_pending(id, requester, PendingRole::Challenger).await
    }

    /// ACTIVE → ACTIVE if the battle is still as `guard` read it
    pub async fn record_turn(&self, guard: TurnGuard, next: &Battle) -> Result<bool, StorageError> {
        let hp = next.hp();
        let result = sqlx::query(
            "UPDATE battles
             SET challenger_hp = $4, opponent_hp = $5, current_turn_player_id = $6,
                 moves = $7, updated_at = NOW()
             WHERE id = $1 AND status = 1 AND current_turn_player_id = $2 AND moves = $3",
        )
        .bind(guard.battle_id.0)
        .bind(guard.expected_turn.0)
        .bind(int(guard.expected_moves, "moves")?)
        .bind(int(hp.challenger, "challenger_hp")?)
        .bind(int(hp.opponent, "opponent_hp")?)
        .bind(next.stored_turn_player().0)
        .bind(int(next.moves, "moves")?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// ACTIVE → FINISHED and reward settlement in one transaction
    ///
    /// Both player rows are locked in id order before the rewards are computed
    /// from their current stats, so concurrent settlements involving the same
    /// player serialize instead of deadlocking.
    pub async fn finish_battle(
        &self,
        guard: TurnGuard,
        next: &Battle,
    ) -> Result<Option<Settlement>, StorageError> {
        let (Some(winner_id), Some(loser_id)) = (next.winner(), next.loser()) else {
            return Err(StorageError::Corrupt(format!(
                "battle {} finished without a winner",
                next.id
            )));
        };
        let hp = next.hp();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE battles
             SET status = 2, challenger_hp = $4, opponent_hp = $5,
                 current_turn_player_id = $6, winner_id = $7, moves = $8, updated_at = NOW()
             WHERE id = $1 AND status = 1 AND current_turn_player_id = $2 AND moves = $3",
        )
        .bind(guard.battle_id.0)
        .bind(guard.expected_turn.0)
        .bind(int(guard.expected_moves, "moves")?)
        .bind(int(hp.challenger, "challenger_hp")?)
        .bind(int(hp.opponent, "opponent_hp")?)
        .bind(next.stored_turn_player().0)
        .bind(winner_id.0)
        .bind(int(next.moves, "moves")?)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let rows = sqlx::query_as::<_, PlayerRow>(
            "SELECT id, username, level, experience, currency, house_id
             FROM players WHERE id IN ($1, $2)
             ORDER BY id
             FOR UPDATE",
        )
        .bind(winner_id.0)
        .bind(loser_id.0)
        .fetch_all(&mut *tx)
        .await?;

        let find = |id: PlayerId| {
            rows.iter()
                .find(|row| row.id == id.0)
                .ok_or_else(|| StorageError::NotFound(format!("player {id}")))
                .and_then(Player::try_from)
        };
        let settled = rewards::settle(next.id, &find(winner_id)?, &find(loser_id)?, Utc::now());

        for player in [&settled.winner, &settled.loser] {
            sqlx::query(
                "UPDATE players SET level = $2, experience = $3, currency = $4 WHERE id = $1",
            )
            .bind(player.id.0)
            .bind(int(player.level, "level")?)
            .bind(bigint(player.experience, "experience")?)
            .bind(bigint(player.currency, "currency")?)
            .execute(&mut *tx)
            .await?;
        }

        let (w, l) = (&settled.settlement.winner, &settled.settlement.loser);
        sqlx::query(
            "INSERT INTO battle_settlements (
                battle_id,
                winner_id, winner_experience_gained, winner_currency_gained,
                winner_level_before, winner_level_after, winner_experience_after, winner_currency_after,
                loser_id, loser_experience_gained, loser_currency_gained,
                loser_level_before, loser_level_after, loser_experience_after, loser_currency_after,
                settled_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(next.id.0)
        .bind(w.player_id.0)
        .bind(bigint(w.experience_gained, "experience_gained")?)
        .bind(bigint(w.currency_gained, "currency_gained")?)
        .bind(int(w.level_before, "level_before")?)
        .bind(int(w.level_after, "level_after")?)
        .bind(bigint(w.experience_after, "experience_after")?)
        .bind(bigint(w.currency_after, "currency_after")?)
        .bind(l.player_id.0)
        .bind(bigint(l.experience_gained, "experience_gained")?)
        .bind(bigint(l.currency_gained, "currency_gained")?)
        .bind(int(l.level_before, "level_before")?)
        .bind(int(l.level_after, "level_after")?)
        .bind(bigint(l.experience_after, "experience_after")?)
        .bind(bigint(l.currency_after, "currency_after")?)
        .bind(settled.settlement.settled_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            battle_id = %next.id,
            winner = %winner_id,
            loser = %loser_id,
            "Battle settled"
        );
        Ok(Some(settled.settlement))
    }

    pub async fn get_settlement(&self, battle_id: i64) -> Result<Option<SettlementRow>, StorageError> {
        let row = sqlx::query_as::<_, SettlementRow>(
            "SELECT * FROM battle_settlements WHERE battle_id = $1",
        )
        .bind(battle_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn count_wins(&self, player: PlayerId) -> Result<i64, StorageError> {
        let wins: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM battles WHERE status = 2 AND winner_id = $1")
                .bind(player.0)
                .fetch_one(&self.pool)
                .await?;

        Ok(wins)
    }

    /// Distinct houses of the opponents `player` has beaten
    pub async fn defeated_houses(&self, player: PlayerId) -> Result<Vec<i64>, StorageError> {
        let houses: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT p.house_id
             FROM battles b
             JOIN players p ON p.id = CASE
                 WHEN b.challenger_id = $1 THEN b.opponent_id
                 ELSE b.challenger_id
             END
             WHERE b.status = 2 AND b.winner_id = $1 AND p.house_id IS NOT NULL
             ORDER BY p.house_id",
        )
        .bind(player.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(houses)
    }

    // ========================================================================
    // Achievement Operations
    // ========================================================================

    pub async fn list_achievements(&self) -> Result<Vec<AchievementRow>, StorageError> {
        let rows = sqlx::query_as::<_, AchievementRow>(
            "SELECT slug, title, points_awarded FROM achievements ORDER BY slug",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn earned_achievements(&self, player: PlayerId) -> Result<Vec<String>, StorageError> {
        let slugs: Vec<String> =
            sqlx::query_scalar("SELECT achievement FROM achievement_awards WHERE player_id = $1")
                .bind(player.0)
                .fetch_all(&self.pool)
                .await?;

        Ok(slugs)
    }

    /// Insert-if-absent award plus the currency credit, in one transaction
    pub async fn award_achievement(
        &self,
        player: PlayerId,
        achievement: &Achievement,
        awarded_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO achievement_awards (player_id, achievement, awarded_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (player_id, achievement) DO NOTHING",
        )
        .bind(player.0)
        .bind(achievement.key.slug())
        .bind(awarded_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        let credited = sqlx::query("UPDATE players SET currency = currency + $2 WHERE id = $1")
            .bind(player.0)
            .bind(bigint(achievement.points_awarded, "points_awarded")?)
            .execute(&mut *tx)
            .await?;

        if credited.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("player {player}")));
        }

        tx.commit().await?;
        Ok(true)
    }
}

/// Checked conversion between a domain integer and its column type. A value that
/// does not fit is reported instead of wrapping.
pub(super) fn column<T, U>(value: T, name: &str) -> Result<U, StorageError>
where
    T: Copy + std::fmt::Display,
    U: TryFrom<T>,
{
    U::try_from(value)
        .map_err(|_| StorageError::Corrupt(format!("{name} value {value} out of range")))
}

fn int(value: u32, name: &str) -> Result<i32, StorageError> {
    column(value, name)
}

fn bigint(value: u64, name: &str) -> Result<i64, StorageError> {
    column(value, name)
}

#[derive(Debug, Clone, Copy)]
enum PendingRole {
    Challenger,
    Opponent,
}

// ============================================================================
// Row types (for sqlx query_as mapping)
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct PlayerRow {
    pub id: i64,
    pub username: String,
    pub level: i32,
    pub experience: i64,
    pub currency: i64,
    pub house_id: Option<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SpellRow {
    pub id: i64,
    pub name: String,
    pub damage: i32,
    pub mana_cost: i32,
    pub price: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct BattleRow {
    pub id: i64,
    pub challenger_id: i64,
    pub opponent_id: i64,
    pub status: i16,
    pub challenger_hp: i32,
    pub opponent_hp: i32,
    pub current_turn_player_id: i64,
    pub winner_id: Option<i64>,
    pub moves: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct SettlementRow {
    pub battle_id: i64,
    pub winner_id: i64,
    pub winner_experience_gained: i64,
    pub winner_currency_gained: i64,
    pub winner_level_before: i32,
    pub winner_level_after: i32,
    pub winner_experience_after: i64,
    pub winner_currency_after: i64,
    pub loser_id: i64,
    pub loser_experience_gained: i64,
    pub loser_currency_gained: i64,
    pub loser_level_before: i32,
    pub loser_level_after: i32,
    pub loser_experience_after: i64,
    pub loser_currency_after: i64,
    pub settled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AchievementRow {
    pub slug: String,
    pub title: String,
    pub points_awarded: i64,
}

// ============================================================================
// Row → domain conversion
// ============================================================================

impl TryFrom<&PlayerRow> for Player {
    type Error = StorageError;

    fn try_from(row: &PlayerRow) -> Result<Self, Self::Error> {
        Ok(Player {
            id: PlayerId(row.id),
            username: row.username.clone(),
            level: column(row.level, "level")?,
            experience: column(row.experience, "experience")?,
            currency: column(row.currency, "currency")?,
            house_id: row.house_id.map(HouseId),
        })
    }
}

impl TryFrom<SpellRow> for Spell {
    type Error = StorageError;

    fn try_from(row: SpellRow) -> Result<Self, Self::Error> {
        Ok(Spell {
            id: SpellId(row.id),
            damage: column(row.damage, "damage")?,
            mana_cost: column(row.mana_cost, "mana_cost")?,
            price: column(row.price, "price")?,
            name: row.name,
        })
    }
}

impl TryFrom<BattleRow> for Battle {
    type Error = StorageError;

    fn try_from(row: BattleRow) -> Result<Self, Self::Error> {
        let status = BattleStatus::from_code(row.status).ok_or_else(|| {
            StorageError::Corrupt(format!("battle {}: unknown status {}", row.id, row.status))
        })?;
        let battle = Battle::from_columns(
            row.id.into(),
            status,
            PlayerId(row.challenger_id),
            PlayerId(row.opponent_id),
            Hp::new(
                column(row.challenger_hp, "challenger_hp")?,
                column(row.opponent_hp, "opponent_hp")?,
            ),
            PlayerId(row.current_turn_player_id),
            row.winner_id.map(PlayerId),
            column(row.moves, "moves")?,
        )?;
        Ok(battle)
    }
}

impl TryFrom<SettlementRow> for Settlement {
    type Error = StorageError;

    fn try_from(row: SettlementRow) -> Result<Self, Self::Error> {
        Ok(Settlement {
            battle_id: row.battle_id.into(),
            winner: AppliedReward {
                player_id: PlayerId(row.winner_id),
                experience_gained: column(row.winner_experience_gained, "winner_experience_gained")?,
                currency_gained: column(row.winner_currency_gained, "winner_currency_gained")?,
                level_before: column(row.winner_level_before, "winner_level_before")?,
                level_after: column(row.winner_level_after, "winner_level_after")?,
                experience_after: column(row.winner_experience_after, "winner_experience_after")?,
                currency_after: column(row.winner_currency_after, "winner_currency_after")?,
            },
            loser: AppliedReward {
                player_id: PlayerId(row.loser_id),
                experience_gained: column(row.loser_experience_gained, "loser_experience_gained")?,
                currency_gained: column(row.loser_currency_gained, "loser_currency_gained")?,
                level_before: column(row.loser_level_before, "loser_level_before")?,
                level_after: column(row.loser_level_after, "loser_level_after")?,
                experience_after: column(row.loser_experience_after, "loser_experience_after")?,
                currency_after: column(row.loser_currency_after, "loser_currency_after")?,
            },
            settled_at: row.settled_at,
        })
    }
}

impl TryFrom<AchievementRow> for Achievement {
    type Error = StorageError;

    fn try_from(row: AchievementRow) -> Result<Self, Self::Error> {
        let key = AchievementKey::parse(&row.slug)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown achievement '{}'", row.slug)))?;
        Ok(Achievement {
            key,
            points_awarded: column(row.points_awarded, "points_awarded")?,
            title: row.title,
        })
    }
}
