//! Achievement System
//!
//! Battle achievements are one-time unlocks derived from a player's cumulative
//! victory history:
//! - `first-victory`: at least one win
//! - `house-sweep-<house>`: at least one win over a member of that house
//!
//! Evaluation is a pure function of the history and the already-earned set. The set
//! is passed in and handed back, never kept in shared state, and it is updated as
//! each unlock is decided so one pass cannot grant the same achievement twice.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::constants::{FIRST_VICTORY_POINTS, HOUSE_SWEEP_POINTS};
use crate::model::{Achievement, House, HouseId};

/// Stable achievement identifier. Stored as its slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AchievementKey {
    FirstVictory,
    HouseSweep(HouseId),
}

const FIRST_VICTORY_SLUG: &str = "first-victory";
const HOUSE_SWEEP_PREFIX: &str = "house-sweep-";

impl AchievementKey {
    pub fn slug(&self) -> String {
        match self {
            Self::FirstVictory => FIRST_VICTORY_SLUG.to_string(),
            Self::HouseSweep(house) => format!("{HOUSE_SWEEP_PREFIX}{house}"),
        }
    }

    pub fn parse(slug: &str) -> Option<Self> {
        if slug == FIRST_VICTORY_SLUG {
            return Some(Self::FirstVictory);
        }
        slug.strip_prefix(HOUSE_SWEEP_PREFIX)?
            .parse::<i64>()
            .ok()
            .map(|id| Self::HouseSweep(HouseId(id)))
    }

    /// Does this history qualify?
    pub fn is_met_by(&self, history: &BattleHistory) -> bool {
        match self {
            Self::FirstVictory => history.wins >= 1,
            Self::HouseSweep(house) => history.defeated_houses.contains(house),
        }
    }
}

impl fmt::Display for AchievementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug())
    }
}

impl From<AchievementKey> for String {
    fn from(key: AchievementKey) -> Self {
        key.slug()
    }
}

impl TryFrom<String> for AchievementKey {
    type Error = String;

    fn try_from(slug: String) -> Result<Self, Self::Error> {
        Self::parse(&slug).ok_or_else(|| format!("unknown achievement '{slug}'"))
    }
}

/// Achievements a player already holds
pub type EarnedSet = BTreeSet<AchievementKey>;

/// A player's cumulative victories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleHistory {
    pub wins: u64,
    /// Houses of every opponent this player has beaten
    pub defeated_houses: BTreeSet<HouseId>,
}

/// Result of one evaluation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Newly qualified achievements, in catalog order
    pub unlocked: Vec<Achievement>,
    /// Earned set including the new unlocks
    pub earned: EarnedSet,
}

/// Full battle achievement catalog for the given houses
pub fn catalog(houses: &[House]) -> Vec<Achievement> {
    let mut entries = vec![Achievement {
        key: AchievementKey::FirstVictory,
        title: "First Victory".to_string(),
        points_awarded: FIRST_VICTORY_POINTS,
    }];
    entries.extend(houses.iter().map(|house| Achievement {
        key: AchievementKey::HouseSweep(house.id),
        title: format!("Bested {}", house.name),
        points_awarded: HOUSE_SWEEP_POINTS,
    }));
    entries
}

/// Decide which catalog entries the history newly qualifies for.
///
/// Entries already in `earned` are skipped, and so is a second catalog entry with a
/// key unlocked earlier in the same pass.
pub fn evaluate(history: &BattleHistory, mut earned: EarnedSet, catalog: &[Achievement]) -> Evaluation {
    let mut unlocked = Vec::new();

    for achievement in catalog {
        if earned.contains(&achievement.key) || !achievement.key.is_met_by(history) {
            continue;
        }
        earned.insert(achievement.key);
        unlocked.push(achievement.clone());
    }

    Evaluation { unlocked, earned }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn houses() -> Vec<House> {
        (1..=4)
            .map(|id| House {
                id: HouseId(id),
                name: format!("House {id}"),
            })
            .collect()
    }

    fn history(wins: u64, houses: &[i64]) -> BattleHistory {
        BattleHistory {
            wins,
            defeated_houses: houses.iter().copied().map(HouseId).collect(),
        }
    }

    #[test]
    fn test_catalog_has_one_sweep_per_house() {
        let entries = catalog(&houses());
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].key, AchievementKey::FirstVictory);
        assert_eq!(entries[0].points_awarded, FIRST_VICTORY_POINTS);
        assert!(entries[1..]
            .iter()
            .all(|a| matches!(a.key, AchievementKey::HouseSweep(_))));
    }

    #[test]
    fn test_slug_round_trip() {
        for key in [AchievementKey::FirstVictory, AchievementKey::HouseSweep(HouseId(3))] {
            assert_eq!(AchievementKey::parse(&key.slug()), Some(key));
        }
        assert_eq!(AchievementKey::HouseSweep(HouseId(2)).slug(), "house-sweep-2");
        assert_eq!(AchievementKey::parse("house-sweep-x"), None);
        assert_eq!(AchievementKey::parse("last-victory"), None);
    }

    #[test]
    fn test_no_wins_unlocks_nothing() {
        let eval = evaluate(&BattleHistory::default(), EarnedSet::new(), &catalog(&houses()));
        assert!(eval.unlocked.is_empty());
        assert!(eval.earned.is_empty());
    }

    #[test]
    fn test_first_win_over_house_two() {
        let eval = evaluate(&history(1, &[2]), EarnedSet::new(), &catalog(&houses()));
        let keys: Vec<_> = eval.unlocked.iter().map(|a| a.key).collect();
        assert_eq!(
            keys,
            vec![AchievementKey::FirstVictory, AchievementKey::HouseSweep(HouseId(2))]
        );
        assert_eq!(eval.earned.len(), 2);
    }

    #[test]
    fn test_sweeps_use_full_history() {
        let mut earned = EarnedSet::new();
        earned.insert(AchievementKey::FirstVictory);
        earned.insert(AchievementKey::HouseSweep(HouseId(2)));

        // Current battle was against house 2 again, but house 4 was beaten earlier
        let eval = evaluate(&history(5, &[2, 4]), earned, &catalog(&houses()));
        let keys: Vec<_> = eval.unlocked.iter().map(|a| a.key).collect();
        assert_eq!(keys, vec![AchievementKey::HouseSweep(HouseId(4))]);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let cat = catalog(&houses());
        let hist = history(3, &[1, 3]);
        let first = evaluate(&hist, EarnedSet::new(), &cat);
        assert_eq!(first.unlocked.len(), 3);

        let second = evaluate(&hist, first.earned.clone(), &cat);
        assert!(second.unlocked.is_empty());
        assert_eq!(second.earned, first.earned);
    }

    #[test]
    fn test_duplicate_catalog_entry_awarded_once() {
        let mut cat = catalog(&houses());
        cat.push(cat[0].clone());
        let eval = evaluate(&history(1, &[]), EarnedSet::new(), &cat);
        assert_eq!(eval.unlocked.len(), 1);
    }

    #[test]
    fn test_key_serializes_as_slug() {
        let json = serde_json::to_string(&AchievementKey::HouseSweep(HouseId(1))).unwrap();
        assert_eq!(json, "\"house-sweep-1\"");
        let back: AchievementKey = serde_json::from_str("\"first-victory\"").unwrap();
        assert_eq!(back, AchievementKey::FirstVictory);
    }
}
