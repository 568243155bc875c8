//! Wizard Duel Server Library
//!
//! This library provides the server side of asynchronous wizard duels:
//! - Storage layer with repository traits (PostgreSQL + in-memory backends)
//! - Challenge manager, battle engine, reward settlement and achievement awarding
//! - HTTP/JSON API endpoints
//! - Server metrics and environment configuration

pub mod api; // HTTP/JSON API endpoints
pub mod config; // Environment-driven server configuration
pub mod metrics; // Server metrics (Prometheus + JSON export)
pub mod service; // Challenge/battle/achievement services
pub mod storage; // Repository traits, PostgreSQL and in-memory stores

// Re-export commonly used types
pub use config::ServerConfig;
pub use service::{AchievementAwarder, BattleEngine, ChallengeManager, ServiceError};
pub use storage::{StorageError, StorageManager};
