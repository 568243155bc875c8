//! Database Migrations - PostgreSQL schema for Wizard Duel
//!
//! Reference rows (houses, spells, achievements) are seeded from Rust in
//! `seed_data`, not from SQL, so both backends share one source.

/// SQL migration for creating all tables
pub const MIGRATION_V1: &str = r#"
-- ============================================================================
-- Wizard Duel Database Schema v1
-- ============================================================================

-- ============================================================================
-- 1. Houses, Players & Spells
-- ============================================================================

CREATE TABLE IF NOT EXISTS houses (
    id              BIGINT PRIMARY KEY,
    name            VARCHAR(50) UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS players (
    id              BIGSERIAL PRIMARY KEY,
    username        VARCHAR(50) UNIQUE NOT NULL,
    level           INTEGER NOT NULL DEFAULT 1 CHECK (level >= 1),
    experience      BIGINT NOT NULL DEFAULT 0 CHECK (experience >= 0),
    currency        BIGINT NOT NULL DEFAULT 100 CHECK (currency >= 0),
    house_id        BIGINT REFERENCES houses(id),
    created_at      TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS spells (
    id              BIGINT PRIMARY KEY,
    name            VARCHAR(50) UNIQUE NOT NULL,
    damage          INTEGER NOT NULL CHECK (damage >= 0),
    mana_cost       INTEGER NOT NULL DEFAULT 0 CHECK (mana_cost >= 0),
    price           BIGINT NOT NULL DEFAULT 0 CHECK (price >= 0)
);

-- Insert-only ownership, written by the shop
CREATE TABLE IF NOT EXISTS learned_spells (
    player_id       BIGINT NOT NULL REFERENCES players(id) ON DELETE CASCADE,
    spell_id        BIGINT NOT NULL REFERENCES spells(id),
    learned_at      TIMESTAMP WITH TIME ZONE DEFAULT NOW(),

    PRIMARY KEY (player_id, spell_id)
);

-- ============================================================================
-- 2. Battles
-- ============================================================================

-- status: 0=Pending, 1=Active, 2=Finished
CREATE TABLE IF NOT EXISTS battles (
    id                      BIGSERIAL PRIMARY KEY,
    challenger_id           BIGINT NOT NULL REFERENCES players(id),
    opponent_id             BIGINT NOT NULL REFERENCES players(id),
    status                  SMALLINT NOT NULL DEFAULT 0 CHECK (status IN (0, 1, 2)),
    challenger_hp           INTEGER NOT NULL DEFAULT 0 CHECK (challenger_hp >= 0),
    opponent_hp             INTEGER NOT NULL DEFAULT 0 CHECK (opponent_hp >= 0),
    current_turn_player_id  BIGINT NOT NULL REFERENCES players(id),
    winner_id               BIGINT REFERENCES players(id),
    moves                   INTEGER NOT NULL DEFAULT 0 CHECK (moves >= 0),
    created_at              TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
    updated_at              TIMESTAMP WITH TIME ZONE DEFAULT NOW(),

    CONSTRAINT check_distinct_participants CHECK (challenger_id <> opponent_id),
    CONSTRAINT check_turn_is_participant
        CHECK (current_turn_player_id IN (challenger_id, opponent_id)),
    CONSTRAINT check_winner_iff_finished CHECK (
        (status = 2 AND winner_id IN (challenger_id, opponent_id))
        OR (status <> 2 AND winner_id IS NULL)
    ),
    CONSTRAINT check_pending_has_no_moves CHECK (status <> 0 OR moves = 0)
);

-- At most one PENDING or ACTIVE battle per unordered pair
CREATE UNIQUE INDEX IF NOT EXISTS idx_battles_open_pair
    ON battles (LEAST(challenger_id, opponent_id), GREATEST(challenger_id, opponent_id))
    WHERE status IN (0, 1);

CREATE INDEX IF NOT EXISTS idx_battles_winner ON battles(winner_id) WHERE status = 2;

-- Rewards applied when a battle finished, kept for result lookups
CREATE TABLE IF NOT EXISTS battle_settlements (
    battle_id                   BIGINT PRIMARY KEY REFERENCES battles(id),
    winner_id                   BIGINT NOT NULL REFERENCES players(id),
    winner_experience_gained    BIGINT NOT NULL,
    winner_currency_gained      BIGINT NOT NULL,
    winner_level_before         INTEGER NOT NULL,
    winner_level_after          INTEGER NOT NULL,
    winner_experience_after     BIGINT NOT NULL,
    winner_currency_after       BIGINT NOT NULL,
    loser_id                    BIGINT NOT NULL REFERENCES players(id),
    loser_experience_gained     BIGINT NOT NULL,
    loser_currency_gained       BIGINT NOT NULL,
    loser_level_before          INTEGER NOT NULL,
    loser_level_after           INTEGER NOT NULL,
    loser_experience_after      BIGINT NOT NULL,
    loser_currency_after        BIGINT NOT NULL,
    settled_at                  TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
);

-- ============================================================================
-- 3. Achievements
-- ============================================================================

-- slug: 'first-victory' or 'house-sweep-<house id>'
CREATE TABLE IF NOT EXISTS achievements (
    slug            VARCHAR(64) PRIMARY KEY,
    title           VARCHAR(100) NOT NULL,
    points_awarded  BIGINT NOT NULL CHECK (points_awarded >= 0)
);

CREATE TABLE IF NOT EXISTS achievement_awards (
    player_id       BIGINT NOT NULL REFERENCES players(id) ON DELETE CASCADE,
    achievement     VARCHAR(64) NOT NULL REFERENCES achievements(slug),
    awarded_at      TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),

    PRIMARY KEY (player_id, achievement)
);
"#;

/// Get all migration SQL statements in order
pub fn get_migrations() -> Vec<(&'static str, &'static str)> {
    vec![("v1_initial_schema", MIGRATION_V1)]
}
