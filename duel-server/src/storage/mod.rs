//! Storage Layer - Unified data access for Wizard Duel
//!
//! Implements the Repository pattern over two interchangeable backends:
//! - **PostgreSQL**: the durable shared store between requests
//! - **Memory**: a single-mutex store with the same atomicity, for tests and local play
//!
//! ## Architecture
//! ```text
//! [ChallengeManager / BattleEngine / AchievementAwarder]
//!       ↓
//! [Repository Traits]  PlayerDirectory · BattleRepo · AchievementRepo
//!       ↓
//! ┌──────────────────────┬──────────────┐
//! │ PostgresStore        │ MemoryStore  │
//! │ + PgRepoAdapters     │              │
//! └──────────────────────┴──────────────┘
//! ```
//!
//! Every state-changing repository call is a single conditional write (or one
//! transaction). "Zero rows affected" is reported as `false`/`None`, never as an
//! error, so services can tell a lost race from a failure.

pub mod memory;
pub mod migrations;
pub mod postgres;
pub mod postgres_repo_adapter;
pub mod repository;
pub mod seed_data;

use std::sync::Arc;
use tracing::info;

use crate::config::{ServerConfig, StorageBackend};

use self::memory::MemoryStore;
use self::postgres::PostgresStore;
use self::postgres_repo_adapter::{PgAchievementRepo, PgBattleRepo, PgPlayerDirectory};
use self::repository::{AchievementRepo, BattleRepo, PlayerDirectory};

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<duel_core::battle::InvalidBattleRecord> for StorageError {
    fn from(err: duel_core::battle::InvalidBattleRecord) -> Self {
        StorageError::Corrupt(err.to_string())
    }
}

/// Central storage manager that holds all repositories
#[derive(Clone)]
pub struct StorageManager {
    pub players: Arc<dyn PlayerDirectory>,
    pub battles: Arc<dyn BattleRepo>,
    pub achievements: Arc<dyn AchievementRepo>,
}

impl StorageManager {
    /// All repositories backed by one in-memory store
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            players: store.clone(),
            battles: store.clone(),
            achievements: store,
        }
    }

    /// All repositories backed by one PostgreSQL pool
    pub fn postgres(pg: Arc<PostgresStore>) -> Self {
        Self {
            players: Arc::new(PgPlayerDirectory::new(pg.clone())),
            battles: Arc::new(PgBattleRepo::new(pg.clone())),
            achievements: Arc::new(PgAchievementRepo::new(pg)),
        }
    }
}

/// Initialize the storage layer selected by the configuration
///
/// Runs migrations and seeds reference data (houses, spells, achievements) for
/// PostgreSQL; the memory backend starts pre-seeded.
pub async fn init_storage(config: &ServerConfig) -> Result<StorageManager, StorageError> {
    match config.storage {
        StorageBackend::Postgres => {
            let pg = PostgresStore::new(&config.database_url, config.pg_max_connections).await?;
            pg.seed_reference_data().await?;
            if config.seed_demo_data {
                pg.seed_demo_players().await?;
            }
            info!("StorageManager initialized (PostgreSQL)");
            Ok(StorageManager::postgres(Arc::new(pg)))
        }
        StorageBackend::Memory => {
            let store = Arc::new(MemoryStore::seeded());
            if config.seed_demo_data {
                seed_data::seed_demo_players(&store);
            }
            info!("StorageManager initialized (in-memory)");
            Ok(StorageManager::in_memory(store))
        }
    }
}
