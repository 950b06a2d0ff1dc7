//! # Timer Service
//!
//! Periodic sweep over everything with a deadline: active rounds past
//! their grace window, phrasesets whose fifth-vote closing window
//! elapsed, and phrasesets stuck at three or four votes past the long
//! timeout. Each handler it invokes is idempotent and safe against the
//! lazy checks on read paths firing for the same object.
//!
//! The sweep interval bounds the worst-case delay between a deadline
//! passing and the state transition landing.

use std::sync::Arc;

use futures_util::future::join_all;

use crate::config::GameConfig;
use crate::services::rounds::RoundService;
use crate::services::votes::VoteService;
use crate::store::GameStore;
use crate::utils::Clock;

pub struct TimerService {
    config: Arc<GameConfig>,
    store: Arc<GameStore>,
    clock: Clock,
    rounds: Arc<RoundService>,
    votes: Arc<VoteService>,
}

impl TimerService {
    pub fn new(
        config: Arc<GameConfig>,
        store: Arc<GameStore>,
        clock: Clock,
        rounds: Arc<RoundService>,
        votes: Arc<VoteService>,
    ) -> Self {
        Self {
            config,
            store,
            clock,
            rounds,
            votes,
        }
    }

    /// Runs the sweep forever on the configured tick.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(
                self.config.sweep_interval_seconds,
            ));
            loop {
                interval.tick().await;
                self.sweep().await;
            }
        })
    }

    /// One pass over all pending deadlines. Public so tests can drive
    /// time explicitly instead of sleeping.
    pub async fn sweep(&self) {
        let now = self.clock.now();

        let expired: Vec<_> = self
            .store
            .active_rounds()
            .await
            .into_iter()
            .filter(|round| round.is_past_grace(now, self.config.grace_period_seconds))
            .collect();
        let outcomes = join_all(
            expired
                .iter()
                .map(|round| self.rounds.handle_timeout(round.round_id)),
        )
        .await;
        for (round, outcome) in expired.iter().zip(outcomes) {
            if let Err(e) = outcome {
                tracing::error!("timeout sweep failed for round {}: {}", round.round_id, e);
            }
        }

        let pending = self.store.phrasesets_accepting_votes().await;
        let outcomes = join_all(
            pending
                .iter()
                .map(|phraseset| self.votes.maybe_finalize(phraseset.phraseset_id)),
        )
        .await;
        for (phraseset, outcome) in pending.iter().zip(outcomes) {
            if let Err(e) = outcome {
                tracing::error!(
                    "finalize sweep failed for phraseset {}: {}",
                    phraseset.phraseset_id,
                    e
                );
            }
        }
    }
}
