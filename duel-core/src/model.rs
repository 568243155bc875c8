//! Domain records shared between the rules and the storage layer.
//!
//! Identifiers are newtypes over the `BIGINT` keys used by the database so a
//! player id can never be passed where a battle id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::achievements::AchievementKey;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

id_type!(
    /// Player account id
    PlayerId
);
id_type!(
    /// Spell catalog id
    SpellId
);
id_type!(
    /// Battle (and challenge) record id
    BattleId
);
id_type!(
    /// House (faction) id
    HouseId
);

/// A player's progression and wallet as seen by the battle core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub level: u32,
    pub experience: u64,
    pub currency: u64,
    pub house_id: Option<HouseId>,
}

/// Immutable spell catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spell {
    pub id: SpellId,
    pub name: String,
    pub damage: u32,
    pub mana_cost: u32,
    pub price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct House {
    pub id: HouseId,
    pub name: String,
}

/// Achievement catalog entry. `points_awarded` is credited as currency on first unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub key: AchievementKey,
    pub title: String,
    pub points_awarded: u64,
}
