//! Battle flow tests against the in-memory store
//!
//! Drives the services the way two polling clients would: challenge, respond,
//! alternate moves, read the result. Concurrency cases race real tokio tasks on
//! the same battle.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use duel_core::achievements::EarnedSet;
use duel_core::battle::{BattleStatus, Hp};
use duel_core::model::{Achievement, BattleId, HouseId, Player, PlayerId, Spell, SpellId};
use duel_core::{AchievementKey, BattleError};
use duel_server::service::{
    AchievementAwarder, BattleEngine, ChallengeManager, ChallengeResolution, ChallengeResponse,
    MoveReport, ServiceError,
};
use duel_server::storage::memory::MemoryStore;
use duel_server::storage::repository::{AchievementRepo, PlayerDirectory, RepoResult};
use duel_server::{StorageError, StorageManager};

const SPARK: SpellId = SpellId(1);
const ARCANE_LANCE: SpellId = SpellId(5);

struct Arena {
    store: Arc<MemoryStore>,
    storage: StorageManager,
    challenges: ChallengeManager,
    engine: BattleEngine,
    alice: Player,
    bob: Player,
}

/// Alice (house 1) hits hard; Bob (house 2) only knows Spark
fn arena() -> Arena {
    arena_with(StorageManager::in_memory)
}

/// Same players, with `wire` free to wrap some of the repositories
fn arena_with(wire: impl FnOnce(Arc<MemoryStore>) -> StorageManager) -> Arena {
    let store = Arc::new(MemoryStore::seeded());
    let alice = store.create_player("alice", Some(HouseId(1)));
    let bob = store.create_player("bob", Some(HouseId(2)));
    store.learn_spell(alice.id, SPARK);
    store.learn_spell(alice.id, ARCANE_LANCE);
    store.learn_spell(bob.id, SPARK);

    let storage = wire(store.clone());
    Arena {
        challenges: ChallengeManager::new(storage.clone()),
        engine: BattleEngine::new(storage.clone()),
        storage,
        store,
        alice,
        bob,
    }
}

fn domain_error(err: ServiceError) -> BattleError {
    match err {
        ServiceError::Battle(err) => err,
        ServiceError::Storage(err) => panic!("unexpected storage error: {err}"),
    }
}

async fn start_battle(arena: &Arena, challenger: PlayerId, opponent: PlayerId) -> BattleId {
    let battle = arena
        .challenges
        .create_challenge(challenger, opponent)
        .await
        .unwrap();
    arena
        .challenges
        .respond(battle.id, opponent, ChallengeResponse::Accept)
        .await
        .unwrap();
    battle.id
}

/// Each side casts its strongest learned spell until the battle ends
async fn fight_to_finish(arena: &Arena, battle_id: BattleId, cast: &[(PlayerId, SpellId)]) -> MoveReport {
    for _ in 0..100 {
        let view = arena.engine.get_state(battle_id, cast[0].0).await.unwrap();
        let turn = view.battle.current_turn_player_id.unwrap();
        let spell = cast.iter().find(|(p, _)| *p == turn).unwrap().1;
        let report = arena.engine.apply_move(battle_id, turn, spell).await.unwrap();
        if report.settlement.is_some() {
            return report;
        }
    }
    panic!("battle {battle_id} did not finish");
}

/// Holds the first spell-ownership check until released, so a move that has
/// already read the battle can be overtaken before it writes
struct HeldDirectory {
    inner: Arc<MemoryStore>,
    held: AtomicBool,
    reached: Notify,
    release: Notify,
}

impl HeldDirectory {
    fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            held: AtomicBool::new(false),
            reached: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl PlayerDirectory for HeldDirectory {
    async fn get_player(&self, id: PlayerId) -> RepoResult<Option<Player>> {
        self.inner.get_player(id).await
    }

    async fn get_spell(&self, id: SpellId) -> RepoResult<Option<Spell>> {
        self.inner.get_spell(id).await
    }

    async fn learned_spells(&self, player: PlayerId) -> RepoResult<Vec<Spell>> {
        self.inner.learned_spells(player).await
    }

    async fn has_learned(&self, player: PlayerId, spell: SpellId) -> RepoResult<bool> {
        if !self.held.swap(true, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        self.inner.has_learned(player, spell).await
    }
}

/// Fails the first `failures` reads of the earned set
struct FlakyAchievements {
    inner: Arc<MemoryStore>,
    failures: AtomicUsize,
}

#[async_trait]
impl AchievementRepo for FlakyAchievements {
    async fn catalog(&self) -> RepoResult<Vec<Achievement>> {
        self.inner.catalog().await
    }

    async fn earned(&self, player: PlayerId) -> RepoResult<EarnedSet> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::NotFound("achievement_awards unavailable".to_string()));
        }
        self.inner.earned(player).await
    }

    async fn award(
        &self,
        player: PlayerId,
        achievement: &Achievement,
        awarded_at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        self.inner.award(player, achievement, awarded_at).await
    }
}

// ============================================================================
// Scenario A: first win over a house-2 opponent
// ============================================================================

#[tokio::test]
async fn test_first_victory_rewards_and_achievements() {
    let arena = arena();
    let (alice, bob) = (arena.alice.id, arena.bob.id);
    let battle_id = start_battle(&arena, alice, bob).await;

    let report = fight_to_finish(&arena, battle_id, &[(alice, ARCANE_LANCE), (bob, SPARK)]).await;

    assert_eq!(report.battle.status, BattleStatus::Finished);
    assert_eq!(report.battle.winner_id, Some(alice));
    assert_eq!(report.battle.opponent_hp, 0);

    let settlement = report.settlement.unwrap();
    assert_eq!(settlement.winner.player_id, alice);
    assert_eq!(settlement.winner.experience_gained, 50);
    assert_eq!(settlement.winner.currency_gained, 25);
    assert_eq!(settlement.loser.player_id, bob);
    assert_eq!(settlement.loser.experience_gained, 10);
    assert_eq!(settlement.loser.currency_gained, 5);

    let mut keys: Vec<_> = report.achievements.iter().map(|a| a.key).collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![AchievementKey::FirstVictory, AchievementKey::HouseSweep(HouseId(2))]
    );

    let alice_after = arena.store.player(alice).unwrap();
    assert_eq!(alice_after.level, 1);
    assert_eq!(alice_after.experience, 50);
    assert_eq!(alice_after.currency, 100 + 25 + 50 + 75);

    let bob_after = arena.store.player(bob).unwrap();
    assert_eq!(bob_after.experience, 10);
    assert_eq!(bob_after.currency, 105);
    assert_eq!(arena.store.award_count(bob), 0);
}

// ============================================================================
// Scenario B: two concurrent accepts
// ============================================================================

#[tokio::test]
async fn test_concurrent_accepts_exactly_one_wins() {
    let arena = arena();
    let battle = arena
        .challenges
        .create_challenge(arena.alice.id, arena.bob.id)
        .await
        .unwrap();

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let challenges = arena.challenges.clone();
            let (id, bob) = (battle.id, arena.bob.id);
            tokio::spawn(async move { challenges.respond(id, bob, ChallengeResponse::Accept).await })
        })
        .collect();

    let mut accepted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(ChallengeResolution::Accepted { .. }) => accepted += 1,
            Ok(other) => panic!("unexpected resolution {other:?}"),
            Err(err) => assert!(matches!(
                domain_error(err),
                BattleError::InvalidState { .. } | BattleError::StaleStateConflict { .. }
            )),
        }
    }

    assert_eq!(accepted, 1);
    let stored = arena.store.battle(battle.id).unwrap();
    assert_eq!(stored.status(), BattleStatus::Active);
    assert_eq!(stored.current_turn_player(), Some(arena.alice.id));
}

#[tokio::test]
async fn test_concurrent_duplicate_moves_apply_once() {
    let arena = arena();
    let battle_id = start_battle(&arena, arena.alice.id, arena.bob.id).await;

    let (first, second) = tokio::join!(
        arena.engine.apply_move(battle_id, arena.alice.id, SPARK),
        arena.engine.apply_move(battle_id, arena.alice.id, SPARK),
    );
    assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);

    let stored = arena.store.battle(battle_id).unwrap();
    assert_eq!(stored.hp().opponent, 90);
    assert_eq!(stored.current_turn_player(), Some(arena.bob.id));
}

#[tokio::test]
async fn test_move_overtaken_by_a_full_round_is_rejected() {
    let mut directory = None;
    let arena = arena_with(|store| {
        let held = Arc::new(HeldDirectory::new(store.clone()));
        directory = Some(held.clone());
        StorageManager {
            players: held,
            ..StorageManager::in_memory(store)
        }
    });
    let held = directory.unwrap();
    let (alice, bob) = (arena.alice.id, arena.bob.id);
    let battle_id = start_battle(&arena, alice, bob).await;

    // Alice's first request reads the opening state, then stalls
    let engine = arena.engine.clone();
    let stale = tokio::spawn(async move { engine.apply_move(battle_id, alice, ARCANE_LANCE).await });
    held.reached.notified().await;

    // Her retry and Bob's reply both land; the turn is Alice's again
    arena.engine.apply_move(battle_id, alice, SPARK).await.unwrap();
    arena.engine.apply_move(battle_id, bob, SPARK).await.unwrap();
    let before = arena.store.battle(battle_id).unwrap();
    assert_eq!(before.current_turn_player(), Some(alice));
    assert_eq!(before.hp(), Hp::new(90, 90));

    held.release.notify_one();
    let err = stale.await.unwrap().unwrap_err();
    assert!(matches!(
        domain_error(err),
        BattleError::StaleStateConflict { battle } if battle == battle_id
    ));

    let after = arena.store.battle(battle_id).unwrap();
    assert_eq!(after, before);
    assert_eq!(after.moves, 2);
}

// ============================================================================
// Scenario C: level-up with carry
// ============================================================================

#[tokio::test]
async fn test_winner_levels_up_with_exact_carry() {
    let arena = arena();
    arena.store.put_player(Player {
        experience: 70,
        ..arena.alice.clone()
    });
    let (alice, bob) = (arena.alice.id, arena.bob.id);
    let battle_id = start_battle(&arena, alice, bob).await;

    let report = fight_to_finish(&arena, battle_id, &[(alice, ARCANE_LANCE), (bob, SPARK)]).await;
    let reward = report.settlement.unwrap().winner;
    assert_eq!(reward.level_before, 1);
    assert_eq!(reward.level_after, 2);
    assert_eq!(reward.experience_after, 10);

    let stored = arena.store.player(alice).unwrap();
    assert_eq!((stored.level, stored.experience), (2, 10));

    let for_alice = arena.engine.get_result(battle_id, alice).await.unwrap();
    assert!(for_alice.leveled_up);
    let for_bob = arena.engine.get_result(battle_id, bob).await.unwrap();
    assert!(!for_bob.leveled_up);
    assert_eq!(for_bob.loser.player_id, bob);
    assert_eq!(for_bob.loser.experience_gained, 10);
}

// ============================================================================
// Scenario D: out-of-turn move
// ============================================================================

#[tokio::test]
async fn test_out_of_turn_move_changes_nothing() {
    let arena = arena();
    let battle_id = start_battle(&arena, arena.alice.id, arena.bob.id).await;
    let before = arena.store.battle(battle_id).unwrap();

    let err = arena
        .engine
        .apply_move(battle_id, arena.bob.id, SPARK)
        .await
        .unwrap_err();
    assert!(matches!(domain_error(err), BattleError::NotYourTurn { .. }));
    assert_eq!(arena.store.battle(battle_id).unwrap(), before);
}

// ============================================================================
// Challenge lifecycle
// ============================================================================

#[tokio::test]
async fn test_open_pair_blocks_second_challenge_either_direction() {
    let arena = arena();
    let (alice, bob) = (arena.alice.id, arena.bob.id);
    arena.challenges.create_challenge(alice, bob).await.unwrap();

    for (c, o) in [(alice, bob), (bob, alice)] {
        let err = arena.challenges.create_challenge(c, o).await.unwrap_err();
        assert!(matches!(domain_error(err), BattleError::ChallengeExists { .. }));
    }
}

#[tokio::test]
async fn test_rematch_allowed_after_finish() {
    let arena = arena();
    let (alice, bob) = (arena.alice.id, arena.bob.id);
    let battle_id = start_battle(&arena, alice, bob).await;
    fight_to_finish(&arena, battle_id, &[(alice, ARCANE_LANCE), (bob, SPARK)]).await;

    let rematch = arena.challenges.create_challenge(bob, alice).await.unwrap();
    assert_ne!(rematch.id, battle_id);
    assert_eq!(rematch.status(), BattleStatus::Pending);
}

#[tokio::test]
async fn test_invalid_targets() {
    let arena = arena();
    let err = arena
        .challenges
        .create_challenge(arena.alice.id, arena.alice.id)
        .await
        .unwrap_err();
    assert!(matches!(domain_error(err), BattleError::InvalidTarget { .. }));

    let err = arena
        .challenges
        .create_challenge(arena.alice.id, PlayerId(404))
        .await
        .unwrap_err();
    assert!(matches!(
        domain_error(err),
        BattleError::NotFound { entity: "player", .. }
    ));

    // An unknown challenger opens nothing
    let err = arena
        .challenges
        .create_challenge(PlayerId(405), arena.bob.id)
        .await
        .unwrap_err();
    assert!(matches!(
        domain_error(err),
        BattleError::NotFound { entity: "player", .. }
    ));
    arena.challenges.create_challenge(arena.alice.id, arena.bob.id).await.unwrap();
}

#[tokio::test]
async fn test_decline_deletes_the_challenge() {
    let arena = arena();
    let battle = arena
        .challenges
        .create_challenge(arena.alice.id, arena.bob.id)
        .await
        .unwrap();

    let err = arena
        .challenges
        .respond(battle.id, arena.alice.id, ChallengeResponse::Decline)
        .await
        .unwrap_err();
    assert!(matches!(domain_error(err), BattleError::NotAuthorized { .. }));

    let resolution = arena
        .challenges
        .respond(battle.id, arena.bob.id, ChallengeResponse::Decline)
        .await
        .unwrap();
    assert_eq!(resolution, ChallengeResolution::Declined { battle_id: battle.id });
    assert!(arena.store.battle(battle.id).is_none());

    let err = arena
        .challenges
        .respond(battle.id, arena.bob.id, ChallengeResponse::Accept)
        .await
        .unwrap_err();
    assert!(matches!(domain_error(err), BattleError::NotFound { .. }));
}

#[tokio::test]
async fn test_cancel_only_by_challenger_while_pending() {
    let arena = arena();
    let battle = arena
        .challenges
        .create_challenge(arena.alice.id, arena.bob.id)
        .await
        .unwrap();

    let err = arena.challenges.cancel(battle.id, arena.bob.id).await.unwrap_err();
    assert!(matches!(domain_error(err), BattleError::NotAuthorized { .. }));

    arena.challenges.cancel(battle.id, arena.alice.id).await.unwrap();
    assert!(arena.store.battle(battle.id).is_none());

    let battle_id = start_battle(&arena, arena.alice.id, arena.bob.id).await;
    let err = arena.challenges.cancel(battle_id, arena.alice.id).await.unwrap_err();
    assert!(matches!(
        domain_error(err),
        BattleError::InvalidState {
            actual: BattleStatus::Active,
            ..
        }
    ));
}

#[tokio::test]
async fn test_accept_sets_level_derived_hp() {
    let arena = arena();
    arena.store.put_player(Player {
        level: 3,
        ..arena.bob.clone()
    });
    let battle_id = start_battle(&arena, arena.alice.id, arena.bob.id).await;

    let stored = arena.store.battle(battle_id).unwrap();
    assert_eq!(stored.hp().challenger, 100);
    assert_eq!(stored.hp().opponent, 120);
}

// ============================================================================
// Move preconditions and views
// ============================================================================

#[tokio::test]
async fn test_move_preconditions() {
    let arena = arena();
    let eve = arena.store.create_player("eve", None);
    let battle_id = start_battle(&arena, arena.alice.id, arena.bob.id).await;

    let err = arena
        .engine
        .apply_move(BattleId(999), arena.alice.id, SPARK)
        .await
        .unwrap_err();
    assert!(matches!(domain_error(err), BattleError::NotFound { .. }));

    let err = arena.engine.apply_move(battle_id, eve.id, SPARK).await.unwrap_err();
    assert!(matches!(domain_error(err), BattleError::NotAuthorized { .. }));

    let err = arena
        .engine
        .apply_move(battle_id, arena.alice.id, SpellId(3))
        .await
        .unwrap_err();
    assert!(matches!(domain_error(err), BattleError::SpellNotOwned { .. }));
}

#[tokio::test]
async fn test_finished_battle_rejects_moves_and_state_reads() {
    let arena = arena();
    let (alice, bob) = (arena.alice.id, arena.bob.id);
    let battle_id = start_battle(&arena, alice, bob).await;
    fight_to_finish(&arena, battle_id, &[(alice, ARCANE_LANCE), (bob, SPARK)]).await;

    let err = arena.engine.apply_move(battle_id, bob, SPARK).await.unwrap_err();
    assert!(matches!(
        domain_error(err),
        BattleError::InvalidState {
            actual: BattleStatus::Finished,
            ..
        }
    ));

    let err = arena.engine.get_state(battle_id, alice).await.unwrap_err();
    assert!(matches!(
        domain_error(err),
        BattleError::InvalidState {
            actual: BattleStatus::Finished,
            ..
        }
    ));
}

#[tokio::test]
async fn test_state_view_shows_own_spells_and_turn() {
    let arena = arena();
    let battle_id = start_battle(&arena, arena.alice.id, arena.bob.id).await;

    let for_alice = arena.engine.get_state(battle_id, arena.alice.id).await.unwrap();
    assert!(for_alice.your_turn);
    assert_eq!(
        for_alice.spells.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![SPARK, ARCANE_LANCE]
    );

    let for_bob = arena.engine.get_state(battle_id, arena.bob.id).await.unwrap();
    assert!(!for_bob.your_turn);
    assert_eq!(for_bob.spells.len(), 1);

    let eve = arena.store.create_player("eve", None);
    let err = arena.engine.get_state(battle_id, eve.id).await.unwrap_err();
    assert!(matches!(domain_error(err), BattleError::NotAuthorized { .. }));

    let err = arena.engine.get_result(battle_id, arena.alice.id).await.unwrap_err();
    assert!(matches!(
        domain_error(err),
        BattleError::InvalidState {
            actual: BattleStatus::Active,
            ..
        }
    ));
}

// ============================================================================
// Achievements
// ============================================================================

#[tokio::test]
async fn test_achievements_are_awarded_once() {
    let arena = arena();
    let (alice, bob) = (arena.alice.id, arena.bob.id);
    let cast = [(alice, ARCANE_LANCE), (bob, SPARK)];

    let first = start_battle(&arena, alice, bob).await;
    assert_eq!(fight_to_finish(&arena, first, &cast).await.achievements.len(), 2);

    let second = start_battle(&arena, alice, bob).await;
    assert!(fight_to_finish(&arena, second, &cast).await.achievements.is_empty());
    assert_eq!(arena.store.award_count(alice), 2);

    let currency = arena.store.player(alice).unwrap().currency;
    let awarder = AchievementAwarder::new(arena.storage.clone());
    assert!(awarder.evaluate_winner(alice).await.unwrap().is_empty());
    assert_eq!(arena.store.player(alice).unwrap().currency, currency);
}

#[tokio::test]
async fn test_each_house_sweep_is_independent() {
    let arena = arena();
    let alice = arena.alice.id;
    let carol = arena.store.create_player("carol", Some(HouseId(3)));
    arena.store.learn_spell(carol.id, SPARK);

    let first = start_battle(&arena, alice, arena.bob.id).await;
    fight_to_finish(&arena, first, &[(alice, ARCANE_LANCE), (arena.bob.id, SPARK)]).await;

    let second = start_battle(&arena, carol.id, alice).await;
    let report = fight_to_finish(&arena, second, &[(alice, ARCANE_LANCE), (carol.id, SPARK)]).await;

    assert_eq!(report.battle.winner_id, Some(alice));
    let keys: Vec<_> = report.achievements.iter().map(|a| a.key).collect();
    assert_eq!(keys, vec![AchievementKey::HouseSweep(HouseId(3))]);
}

#[tokio::test]
async fn test_same_house_and_houseless_wins_get_no_bonus() {
    let arena = arena();
    let alice = arena.alice.id;
    let dora = arena.store.create_player("dora", Some(HouseId(1)));
    arena.store.learn_spell(dora.id, SPARK);

    let battle_id = start_battle(&arena, alice, dora.id).await;
    let report = fight_to_finish(&arena, battle_id, &[(alice, ARCANE_LANCE), (dora.id, SPARK)]).await;
    assert_eq!(report.settlement.unwrap().winner.currency_gained, 0);

    let nobody = arena.store.create_player("nobody", None);
    let other = arena.store.create_player("other", None);
    arena.store.learn_spell(nobody.id, ARCANE_LANCE);
    arena.store.learn_spell(other.id, SPARK);
    let battle_id = start_battle(&arena, nobody.id, other.id).await;
    let report = fight_to_finish(
        &arena,
        battle_id,
        &[(nobody.id, ARCANE_LANCE), (other.id, SPARK)],
    )
    .await;
    assert_eq!(report.settlement.unwrap().winner.currency_gained, 0);
    let keys: Vec<_> = report.achievements.iter().map(|a| a.key).collect();
    assert_eq!(keys, vec![AchievementKey::FirstVictory]);
}

#[tokio::test]
async fn test_result_view_completes_a_failed_evaluation() {
    let arena = arena_with(|store| StorageManager {
        achievements: Arc::new(FlakyAchievements {
            inner: store.clone(),
            failures: AtomicUsize::new(1),
        }),
        ..StorageManager::in_memory(store)
    });
    let (alice, bob) = (arena.alice.id, arena.bob.id);
    let battle_id = start_battle(&arena, alice, bob).await;

    let report = fight_to_finish(&arena, battle_id, &[(alice, ARCANE_LANCE), (bob, SPARK)]).await;
    assert!(report.settlement.is_some());
    assert!(report.achievements.is_empty());
    assert_eq!(arena.store.award_count(alice), 0);
    assert_eq!(arena.store.player(alice).unwrap().currency, 100 + 25);

    // Either participant viewing the result finishes the job
    arena.engine.get_result(battle_id, bob).await.unwrap();
    assert_eq!(arena.store.award_count(alice), 2);
    assert_eq!(arena.store.player(alice).unwrap().currency, 100 + 25 + 50 + 75);

    arena.engine.get_result(battle_id, alice).await.unwrap();
    assert_eq!(arena.store.award_count(alice), 2);
    assert_eq!(arena.store.player(alice).unwrap().currency, 100 + 25 + 50 + 75);
}
