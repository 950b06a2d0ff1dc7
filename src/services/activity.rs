//! # Activity Timeline
//!
//! Append-only history of everything that happened to a phraseset, used
//! by the detail view. Prompt-level entries are recorded before the
//! phraseset exists and attached retroactively once the second copy
//! builds it.

use std::sync::Arc;

use uuid::Uuid;

use crate::models::{Activity, ActivityKind};
use crate::store::GameStore;
use crate::utils::Clock;

pub struct ActivityService {
    store: Arc<GameStore>,
    clock: Clock,
}

impl ActivityService {
    pub fn new(store: Arc<GameStore>, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub async fn record(
        &self,
        kind: ActivityKind,
        phraseset_id: Option<Uuid>,
        prompt_round_id: Option<Uuid>,
        player_id: Option<Uuid>,
    ) {
        self.store
            .record_activity(Activity {
                activity_id: Uuid::new_v4(),
                phraseset_id,
                prompt_round_id,
                kind,
                player_id,
                created_at: self.clock.now(),
            })
            .await;
    }

    /// Backfills the phraseset id onto entries recorded before it existed.
    pub async fn attach_phraseset(&self, prompt_round_id: Uuid, phraseset_id: Uuid) {
        self.store
            .attach_activity_phraseset(prompt_round_id, phraseset_id)
            .await;
    }

    /// Ordered timeline for a phraseset.
    pub async fn timeline(&self, phraseset_id: Uuid) -> Vec<Activity> {
        self.store.activities_for_phraseset(phraseset_id).await
    }
}
