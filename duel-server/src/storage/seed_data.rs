//! Seed Data - reference rows every deployment needs
//!
//! Houses, the starter spell catalog and the achievement catalog. Both backends
//! seed from these functions so ids and point values never drift apart.

use tracing::info;

use duel_core::achievements;
use duel_core::model::{Achievement, House, HouseId, Spell, SpellId};

use super::memory::MemoryStore;

/// The four houses
pub fn houses() -> Vec<House> {
    [
        (1, "Emberwatch"),
        (2, "Tidecall"),
        (3, "Stoneheart"),
        (4, "Galehaven"),
    ]
    .into_iter()
    .map(|(id, name)| House {
        id: HouseId(id),
        name: name.to_string(),
    })
    .collect()
}

/// Starter spell catalog: (id, name, damage, mana_cost, price)
const SPELLS: &[(i64, &str, u32, u32, u64)] = &[
    (1, "Spark", 10, 5, 0),
    (2, "Frost Shard", 18, 10, 40),
    (3, "Fireball", 30, 20, 90),
    (4, "Stone Fist", 24, 15, 60),
    (5, "Arcane Lance", 45, 35, 200),
];

pub fn starter_spells() -> Vec<Spell> {
    SPELLS
        .iter()
        .map(|&(id, name, damage, mana_cost, price)| Spell {
            id: SpellId(id),
            name: name.to_string(),
            damage,
            mana_cost,
            price,
        })
        .collect()
}

pub fn achievement_catalog() -> Vec<Achievement> {
    achievements::catalog(&houses())
}

/// Demo players for local play: (username, house, learned spell ids)
pub const DEMO_PLAYERS: &[(&str, i64, &[i64])] = &[
    ("merlin", 1, &[1, 3, 5]),
    ("morgana", 2, &[1, 2, 4]),
];

/// Create the demo players in a memory store
pub fn seed_demo_players(store: &MemoryStore) {
    for &(username, house, spells) in DEMO_PLAYERS {
        let player = store.create_player(username, Some(HouseId(house)));
        for &spell in spells {
            store.learn_spell(player.id, SpellId(spell));
        }
        info!(player_id = %player.id, username, "Seeded demo player");
    }
}
