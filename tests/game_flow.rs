//! End-to-end scenarios driven directly against the engine services,
//! with a steered clock instead of real waits and a fixed similarity
//! backend so copy validation is deterministic.

use chrono::Duration;
use uuid::Uuid;

use wordpool_backend::config::GameConfig;
use wordpool_backend::error::GameError;
use wordpool_backend::models::{
    PhrasesetStatus, Prompt, RoundKind, RoundStatus, TransactionKind,
};
use wordpool_backend::services::{EmbeddingBackend, StaticSimilarity};
use wordpool_backend::utils::Dictionary;
use wordpool_backend::AppState;

const PROMPT_TEXT: &str = "pick an ideal worth defending";

fn engine_with(config: GameConfig) -> AppState {
    let dictionary = Dictionary::from_text(include_str!("../data/dictionary.txt"));
    AppState::new(
        config,
        dictionary,
        EmbeddingBackend::Static(StaticSimilarity::new(0.0)),
    )
}

async fn engine() -> AppState {
    let state = engine_with(GameConfig::default());
    state
        .store
        .seed_prompts(vec![Prompt::new(PROMPT_TEXT, Some("ideals".to_string()))])
        .await;
    state
}

async fn new_player(state: &AppState) -> Uuid {
    state.players.create_player().await.player_id
}

async fn balance(state: &AppState, player: Uuid) -> i64 {
    state.store.player(player).await.unwrap().balance
}

async fn submit_prompt(state: &AppState, player: Uuid, phrase: &str) -> Uuid {
    let round = state.rounds.start_prompt_round(player).await.unwrap();
    state
        .rounds
        .submit_prompt_phrase(player, round.round_id, phrase)
        .await
        .unwrap();
    round.round_id
}

async fn submit_copy(state: &AppState, player: Uuid, phrase: &str) -> Uuid {
    let started = state.rounds.start_copy_round(player).await.unwrap();
    state
        .rounds
        .submit_copy_phrase(player, started.round.round_id, phrase)
        .await
        .unwrap();
    started.round.round_id
}

/// Runs one prompt and two copies through the real flow and returns the
/// resulting phraseset id.
async fn build_phraseset(
    state: &AppState,
    prompt_player: Uuid,
    copy1_player: Uuid,
    copy2_player: Uuid,
    original: &str,
    copy1: &str,
    copy2: &str,
) -> Uuid {
    let prompt_round = submit_prompt(state, prompt_player, original).await;
    submit_copy(state, copy1_player, copy1).await;
    submit_copy(state, copy2_player, copy2).await;
    state
        .store
        .phraseset_for_prompt_round(prompt_round)
        .await
        .expect("phraseset should exist after second copy")
        .phraseset_id
}

async fn cast_vote(state: &AppState, voter: Uuid, phrase: &str) -> (Uuid, bool, i64) {
    let started = state.votes.start_vote_round(voter).await.unwrap();
    let outcome = state
        .votes
        .submit_vote(voter, started.phraseset_id, phrase)
        .await
        .unwrap();
    (started.phraseset_id, outcome.correct, outcome.payout)
}

async fn assert_journal_consistent(state: &AppState, player: Uuid) {
    let balance = balance(state, player).await;
    let journal = state.store.journal_sum_for_player(player).await;
    assert_eq!(
        balance,
        1000 + journal,
        "journal must reconstruct the balance"
    );
}

#[tokio::test]
async fn s1_happy_path_through_finalization_and_claim() {
    let state = engine().await;
    let a = new_player(&state).await;
    let b = new_player(&state).await;
    let c = new_player(&state).await;

    // A's prompt.
    let prompt_round = submit_prompt(&state, a, "freedom").await;
    assert_eq!(balance(&state, a).await, 900);
    assert_eq!(state.queue.prompts_waiting().await, 1);

    // B's copy, no discount with a single prompt waiting.
    let started_b = state.rounds.start_copy_round(b).await.unwrap();
    assert_eq!(started_b.round.cost, 100);
    assert!(!started_b.discount_active);
    state
        .rounds
        .submit_copy_phrase(b, started_b.round.round_id, "liberty")
        .await
        .unwrap();
    assert_eq!(balance(&state, b).await, 900);

    // C's copy completes the phraseset.
    submit_copy(&state, c, "justice").await;
    assert_eq!(balance(&state, c).await, 900);

    let phraseset = state
        .store
        .phraseset_for_prompt_round(prompt_round)
        .await
        .unwrap();
    assert_eq!(phraseset.status, PhrasesetStatus::Open);
    assert_eq!(phraseset.total_pool, 300);
    assert_eq!(phraseset.original_phrase, "FREEDOM");
    assert_eq!(state.queue.prompts_waiting().await, 0);

    // Five votes: three correct, one per copy.
    let mut voters = Vec::new();
    for phrase in ["FREEDOM", "FREEDOM", "FREEDOM", "LIBERTY", "JUSTICE"] {
        let voter = new_player(&state).await;
        let (ps, correct, payout) = cast_vote(&state, voter, phrase).await;
        assert_eq!(ps, phraseset.phraseset_id);
        assert_eq!(correct, phrase == "FREEDOM");
        assert_eq!(payout, if correct { 5 } else { 0 });
        voters.push(voter);
    }
    for (i, voter) in voters.iter().enumerate() {
        let expected = if i < 3 { 1004 } else { 999 };
        assert_eq!(balance(&state, *voter).await, expected);
    }

    let phraseset = state.store.phraseset(phraseset.phraseset_id).await.unwrap();
    assert_eq!(phraseset.vote_count, 5);
    assert_eq!(phraseset.status, PhrasesetStatus::Closing);
    assert!(phraseset.third_vote_at.is_some());
    assert!(phraseset.fifth_vote_at.is_some());
    assert!(phraseset.closes_at.is_some());

    // Closing window elapses; the sweep finalizes.
    state.clock.advance(Duration::seconds(61));
    state.timer.sweep().await;

    let phraseset = state.store.phraseset(phraseset.phraseset_id).await.unwrap();
    assert_eq!(phraseset.status, PhrasesetStatus::Finalized);
    assert!(phraseset.finalized_at.is_some());

    // Points 3/2/2 over a 285 pool: 122 / 81 / 81.
    assert_eq!(balance(&state, a).await, 1022);
    assert_eq!(balance(&state, b).await, 981);
    assert_eq!(balance(&state, c).await, 981);

    // Finalizing again is a no-op.
    state.votes.maybe_finalize(phraseset.phraseset_id).await.unwrap();
    assert_eq!(balance(&state, a).await, 1022);

    // Claim is idempotent: one prize transaction, N-1 no-ops.
    let first = state
        .phrasesets
        .claim_prize(a, phraseset.phraseset_id)
        .await
        .unwrap();
    assert!(first.success);
    assert_eq!(first.amount, 122);
    assert!(!first.already_claimed);
    assert_eq!(first.new_balance, 1022);

    let second = state
        .phrasesets
        .claim_prize(a, phraseset.phraseset_id)
        .await
        .unwrap();
    assert_eq!(second.amount, 122);
    assert!(second.already_claimed);
    assert_eq!(second.new_balance, 1022);

    let prize_payouts = state
        .store
        .transactions_by_reference(TransactionKind::PrizePayout, phraseset.phraseset_id)
        .await;
    assert_eq!(prize_payouts.len(), 3);
    assert_eq!(
        prize_payouts.iter().filter(|t| t.player_id == a).count(),
        1
    );

    for player in [a, b, c].into_iter().chain(voters) {
        assert_journal_consistent(&state, player).await;
    }
}

#[tokio::test]
async fn s2_discount_activates_when_queue_exceeds_threshold() {
    let state = engine().await;
    let p1 = new_player(&state).await;
    let p2 = new_player(&state).await;

    let words = [
        "moon", "river", "stone", "cloud", "ember", "frost", "willow", "maple", "coral",
        "amber", "pearl",
    ];
    for (i, word) in words.iter().enumerate() {
        let owner = if i < 6 { p1 } else { p2 };
        submit_prompt(&state, owner, word).await;
    }
    assert_eq!(state.queue.prompts_waiting().await, 11);
    assert!(state.queue.copy_discount_active().await);

    let b = new_player(&state).await;
    let started = state.rounds.start_copy_round(b).await.unwrap();
    assert!(started.discount_active);
    assert_eq!(started.round.cost, 90);
    match started.round.kind {
        RoundKind::Copy {
            system_contribution,
            ..
        } => assert_eq!(system_contribution, 10),
        _ => panic!("expected a copy round"),
    }
    assert_eq!(balance(&state, b).await, 910);
}

#[tokio::test]
async fn s2_system_contributions_grow_the_prize_pool() {
    // Threshold zero makes any waiting prompt discount-eligible, so both
    // copies carry a system contribution.
    let config = GameConfig {
        copy_discount_threshold: 0,
        ..GameConfig::default()
    };
    let state = engine_with(config);
    state
        .store
        .seed_prompts(vec![Prompt::new(PROMPT_TEXT, None)])
        .await;

    let a = new_player(&state).await;
    let b = new_player(&state).await;
    let c = new_player(&state).await;

    let prompt_round = submit_prompt(&state, a, "freedom").await;

    let started_b = state.rounds.start_copy_round(b).await.unwrap();
    assert_eq!(started_b.round.cost, 90);
    state
        .rounds
        .submit_copy_phrase(b, started_b.round.round_id, "liberty")
        .await
        .unwrap();

    let started_c = state.rounds.start_copy_round(c).await.unwrap();
    assert_eq!(started_c.round.cost, 90);
    state
        .rounds
        .submit_copy_phrase(c, started_c.round.round_id, "justice")
        .await
        .unwrap();

    let phraseset = state
        .store
        .phraseset_for_prompt_round(prompt_round)
        .await
        .unwrap();
    assert_eq!(phraseset.system_contribution, 20);
    assert_eq!(phraseset.total_pool, 320);
}

#[tokio::test]
async fn s3_expired_prompt_round_refunds_on_read() {
    let state = engine().await;
    let a = new_player(&state).await;

    let round = state.rounds.start_prompt_round(a).await.unwrap();
    assert_eq!(balance(&state, a).await, 900);

    // Past expiry plus grace; a plain read settles the round.
    state.clock.advance(Duration::seconds(186));
    let current = state.rounds.current_round(a).await.unwrap();
    assert!(current.is_none());

    assert_eq!(balance(&state, a).await, 990);
    let refunds = state
        .store
        .transactions_by_reference(TransactionKind::Refund, round.round_id)
        .await;
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount, 90);

    let player = state.store.player(a).await.unwrap();
    assert!(player.active_round_id.is_none());
    let round = state.store.round(round.round_id).await.unwrap();
    assert_eq!(round.status, RoundStatus::Expired);
    // The phrase was never submitted, so the queue never saw it.
    assert_eq!(state.queue.prompts_waiting().await, 0);
    assert_journal_consistent(&state, a).await;
}

#[tokio::test]
async fn s4_abandoned_copy_requeues_prompt_and_blocks_redraw() {
    let state = engine().await;
    let a = new_player(&state).await;
    let b = new_player(&state).await;

    submit_prompt(&state, a, "freedom").await;
    let started = state.rounds.start_copy_round(b).await.unwrap();
    assert_eq!(state.queue.prompts_waiting().await, 0);

    state.clock.advance(Duration::seconds(186));
    state.timer.sweep().await;

    // 90% of the 100 entry back; prompt returned to the queue.
    assert_eq!(balance(&state, b).await, 990);
    let round = state.store.round(started.round.round_id).await.unwrap();
    assert_eq!(round.status, RoundStatus::Abandoned);
    assert_eq!(state.queue.prompts_waiting().await, 1);

    // The cooldown blocks B even though a prompt is waiting.
    let err = state.rounds.start_copy_round(b).await.unwrap_err();
    assert!(matches!(err, GameError::NoPromptsAvailable));
    assert_eq!(state.queue.prompts_waiting().await, 1);
    assert_eq!(state.rounds.available_prompt_count(b).await, 0);

    // Anyone else can still draw it.
    let c = new_player(&state).await;
    assert!(state.rounds.start_copy_round(c).await.is_ok());
    assert_journal_consistent(&state, b).await;
}

#[tokio::test]
async fn s5_third_vote_timeout_finalizes_on_three_votes() {
    let state = engine().await;
    let a = new_player(&state).await;
    let b = new_player(&state).await;
    let c = new_player(&state).await;
    let phraseset_id = build_phraseset(&state, a, b, c, "freedom", "liberty", "justice").await;

    for phrase in ["FREEDOM", "FREEDOM", "LIBERTY"] {
        let voter = new_player(&state).await;
        cast_vote(&state, voter, phrase).await;
    }
    let phraseset = state.store.phraseset(phraseset_id).await.unwrap();
    assert_eq!(phraseset.status, PhrasesetStatus::Open);
    assert!(phraseset.third_vote_at.is_some());
    assert!(phraseset.fifth_vote_at.is_none());

    // Silence for ten minutes.
    state.clock.advance(Duration::seconds(601));
    state.timer.sweep().await;

    let phraseset = state.store.phraseset(phraseset_id).await.unwrap();
    assert_eq!(phraseset.status, PhrasesetStatus::Finalized);

    // Pool 300 - 2 correct * 5 = 290; points 2 / 2 / 0 -> 145 / 145 / 0.
    assert_eq!(balance(&state, a).await, 1045);
    assert_eq!(balance(&state, b).await, 1045);
    assert_eq!(balance(&state, c).await, 900);

    // Zero payouts are skipped, not written as zero-amount entries.
    let payouts = state
        .store
        .transactions_by_reference(TransactionKind::PrizePayout, phraseset_id)
        .await;
    assert_eq!(payouts.len(), 2);
}

#[tokio::test]
async fn twenty_votes_hard_cap_finalizes_immediately() {
    let state = engine().await;
    let a = new_player(&state).await;
    let b = new_player(&state).await;
    let c = new_player(&state).await;
    let phraseset_id = build_phraseset(&state, a, b, c, "freedom", "liberty", "justice").await;

    for i in 0..20 {
        let voter = new_player(&state).await;
        let phrase = if i % 2 == 0 { "FREEDOM" } else { "JUSTICE" };
        cast_vote(&state, voter, phrase).await;
    }

    let phraseset = state.store.phraseset(phraseset_id).await.unwrap();
    assert_eq!(phraseset.vote_count, 20);
    assert_eq!(phraseset.status, PhrasesetStatus::Finalized);

    // Nothing left to vote on.
    let late_voter = new_player(&state).await;
    let err = state.votes.start_vote_round(late_voter).await.unwrap_err();
    assert!(matches!(err, GameError::NoPhrasesetsAvailable));
}

#[tokio::test]
async fn vote_selection_prefers_sets_closest_to_closing() {
    let state = engine().await;
    let a1 = new_player(&state).await;
    let a2 = new_player(&state).await;
    let b = new_player(&state).await;
    let c = new_player(&state).await;

    let ps1 = build_phraseset(&state, a1, b, c, "moon", "river", "stone").await;
    for phrase in ["MOON", "RIVER", "STONE"] {
        let voter = new_player(&state).await;
        cast_vote(&state, voter, phrase).await;
    }

    // A second, younger set enters the pool.
    let ps2 = build_phraseset(&state, a2, b, c, "cloud", "ember", "frost").await;
    assert_ne!(ps1, ps2);

    // The three-vote set outranks the fresh one.
    let voter = new_player(&state).await;
    let started = state.votes.start_vote_round(voter).await.unwrap();
    assert_eq!(started.phraseset_id, ps1);
}

#[tokio::test]
async fn contributors_cannot_vote_on_their_own_phraseset() {
    let state = engine().await;
    let a = new_player(&state).await;
    let b = new_player(&state).await;
    let c = new_player(&state).await;
    build_phraseset(&state, a, b, c, "freedom", "liberty", "justice").await;

    for contributor in [a, b, c] {
        let err = state.votes.start_vote_round(contributor).await.unwrap_err();
        assert!(matches!(err, GameError::NoPhrasesetsAvailable));
    }
}

#[tokio::test]
async fn one_vote_per_player_per_phraseset() {
    let state = engine().await;
    let a = new_player(&state).await;
    let b = new_player(&state).await;
    let c = new_player(&state).await;
    build_phraseset(&state, a, b, c, "freedom", "liberty", "justice").await;

    let voter = new_player(&state).await;
    cast_vote(&state, voter, "LIBERTY").await;

    // The only phraseset is already voted on, so nothing is available.
    let err = state.votes.start_vote_round(voter).await.unwrap_err();
    assert!(matches!(err, GameError::NoPhrasesetsAvailable));
}

#[tokio::test]
async fn invalid_vote_choice_leaves_the_round_live() {
    let state = engine().await;
    let a = new_player(&state).await;
    let b = new_player(&state).await;
    let c = new_player(&state).await;
    build_phraseset(&state, a, b, c, "freedom", "liberty", "justice").await;

    let voter = new_player(&state).await;
    let started = state.votes.start_vote_round(voter).await.unwrap();
    let err = state
        .votes
        .submit_vote(voter, started.phraseset_id, "GOLDEN")
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::InvalidChoice));

    // The round survived the bad guess; a valid choice still lands.
    let outcome = state
        .votes
        .submit_vote(voter, started.phraseset_id, "freedom")
        .await
        .unwrap();
    assert!(outcome.correct);
}

#[tokio::test]
async fn expired_vote_round_forfeits_the_entry() {
    let state = engine().await;
    let a = new_player(&state).await;
    let b = new_player(&state).await;
    let c = new_player(&state).await;
    build_phraseset(&state, a, b, c, "freedom", "liberty", "justice").await;

    let voter = new_player(&state).await;
    let started = state.votes.start_vote_round(voter).await.unwrap();
    assert_eq!(balance(&state, voter).await, 999);

    state.clock.advance(Duration::seconds(66));
    let err = state
        .votes
        .submit_vote(voter, started.phraseset_id, "FREEDOM")
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::RoundExpired));

    // No refund for a vote; the pointer is cleared.
    assert_eq!(balance(&state, voter).await, 999);
    assert!(state
        .store
        .player(voter)
        .await
        .unwrap()
        .active_round_id
        .is_none());
}

#[tokio::test]
async fn submission_within_grace_period_is_accepted() {
    let state = engine().await;
    let a = new_player(&state).await;
    let round = state.rounds.start_prompt_round(a).await.unwrap();

    // 183s: past the 180s expiry, inside the 5s grace window.
    state.clock.advance(Duration::seconds(183));
    let normalized = state
        .rounds
        .submit_prompt_phrase(a, round.round_id, "freedom")
        .await
        .unwrap();
    assert_eq!(normalized, "FREEDOM");
}

#[tokio::test]
async fn one_active_round_per_player() {
    let state = engine().await;
    let a = new_player(&state).await;
    state.rounds.start_prompt_round(a).await.unwrap();

    let err = state.rounds.start_prompt_round(a).await.unwrap_err();
    assert!(matches!(err, GameError::AlreadyInRound));
    let err = state.rounds.start_copy_round(a).await.unwrap_err();
    assert!(matches!(err, GameError::AlreadyInRound));
    let err = state.votes.start_vote_round(a).await.unwrap_err();
    assert!(matches!(err, GameError::AlreadyInRound));
}

#[tokio::test]
async fn players_never_copy_their_own_prompt() {
    let state = engine().await;
    let a = new_player(&state).await;
    submit_prompt(&state, a, "freedom").await;

    let err = state.rounds.start_copy_round(a).await.unwrap_err();
    assert!(matches!(err, GameError::NoPromptsAvailable));
    // The skipped prompt went back to the queue for everyone else.
    assert_eq!(state.queue.prompts_waiting().await, 1);
}

#[tokio::test]
async fn outstanding_prompt_bound_blocks_the_eleventh() {
    let state = engine().await;
    let a = new_player(&state).await;
    let b = new_player(&state).await;
    let c = new_player(&state).await;

    // Ten open phrasesets all fed by A's prompts.
    state
        .store
        .modify_player(a, |p| p.balance += 500)
        .await
        .unwrap();
    for _ in 0..10 {
        build_phraseset(&state, a, b, c, "moon", "river", "stone").await;
    }

    let err = state.rounds.start_prompt_round(a).await.unwrap_err();
    assert!(matches!(err, GameError::MaxOutstandingPrompts));
}

#[tokio::test]
async fn insufficient_balance_blocks_round_entry() {
    let state = engine().await;
    let a = new_player(&state).await;
    state
        .store
        .modify_player(a, |p| p.balance = 50)
        .await
        .unwrap();

    let err = state.rounds.start_prompt_round(a).await.unwrap_err();
    assert!(matches!(err, GameError::InsufficientBalance));
    // Nothing was debited and no round exists.
    assert_eq!(balance(&state, a).await, 50);
    assert!(state.store.player(a).await.unwrap().active_round_id.is_none());
}

#[tokio::test]
async fn results_view_and_dashboard_track_the_claim() {
    let state = engine().await;
    let a = new_player(&state).await;
    let b = new_player(&state).await;
    let c = new_player(&state).await;
    let phraseset_id = build_phraseset(&state, a, b, c, "freedom", "liberty", "justice").await;

    // Results are gated on finalization.
    let err = state
        .phrasesets
        .results_for_player(a, phraseset_id)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NotFinalized));

    for phrase in ["FREEDOM", "FREEDOM", "LIBERTY"] {
        let voter = new_player(&state).await;
        cast_vote(&state, voter, phrase).await;
    }
    state.clock.advance(Duration::seconds(601));
    state.timer.sweep().await;

    // Outsiders see nothing.
    let outsider = new_player(&state).await;
    let err = state
        .phrasesets
        .results_for_player(outsider, phraseset_id)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NotContributor));

    let results = state
        .phrasesets
        .results_for_player(a, phraseset_id)
        .await
        .unwrap();
    assert_eq!(results.your_phrase, "FREEDOM");
    assert_eq!(results.total_votes, 3);
    assert_eq!(results.your_payout, 145);
    assert!(!results.payout_claimed);

    let unclaimed = state.phrasesets.unclaimed_for_player(a).await.unwrap();
    assert_eq!(unclaimed.unclaimed.len(), 1);
    assert_eq!(unclaimed.total_unclaimed_amount, 145);

    state.phrasesets.claim_prize(a, phraseset_id).await.unwrap();

    let unclaimed = state.phrasesets.unclaimed_for_player(a).await.unwrap();
    assert!(unclaimed.unclaimed.is_empty());
    let summary = state.phrasesets.summary_for_player(a).await.unwrap();
    assert_eq!(summary.finalized.prompts, 1);
    assert_eq!(summary.total_unclaimed_amount, 0);

    let detail = state
        .phrasesets
        .detail_for_player(a, phraseset_id)
        .await
        .unwrap();
    assert_eq!(detail.vote_count, 3);
    assert_eq!(detail.contributors.len(), 3);
    assert!(detail.payout_claimed);
    assert!(detail.results.is_some());
    assert!(!detail.activity.is_empty());
}

#[tokio::test]
async fn copy_validation_rejects_near_duplicates_in_flow() {
    let state = engine().await;
    let a = new_player(&state).await;
    let b = new_player(&state).await;
    submit_prompt(&state, a, "freedom").await;

    let started = state.rounds.start_copy_round(b).await.unwrap();
    let err = state
        .rounds
        .submit_copy_phrase(b, started.round.round_id, "freedom")
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::DuplicatePhrase(_)));

    let err = state
        .rounds
        .submit_copy_phrase(b, started.round.round_id, "freedoms")
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::PhraseTooSimilar(_)));

    // A failed validation leaves the round live; a clean phrase lands.
    let normalized = state
        .rounds
        .submit_copy_phrase(b, started.round.round_id, "liberty")
        .await
        .unwrap();
    assert_eq!(normalized, "LIBERTY");
}
