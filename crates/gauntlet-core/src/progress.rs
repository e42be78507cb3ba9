//! Outcome coordinator.
//!
//! Applies one boss-encounter outcome to the durable progress record and
//! runs the hint policy over the result. The hint level ratchet lives
//! here rather than in
//! [`BossProgress::apply`](crate::models::BossProgress::apply): the
//! transition only moves the streak, and this coordinator folds the
//! policy's decision back into the record before saving.
//!
//! Callers are responsible for serializing calls per (user, boss) pair;
//! the engine crate does so with keyed locks.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Outcome;
use crate::policy::HintPolicy;
use crate::store::ProgressStore;

/// What one recorded outcome did to a player's progress.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeReport {
    pub outcome: Outcome,
    /// Streak after this outcome.
    pub fail_streak: u32,
    /// Hint level after this outcome. Never lower than before.
    pub highest_hint_level: u32,
    /// True only when this outcome first reached a new hint tier.
    pub hint_unlocked: bool,
    /// Guide to surface, on every qualifying fail for a mapped boss.
    pub hint_content_id: Option<String>,
}

/// Record one win or fail for a (user, boss) pair.
///
/// Loads the record, applies the transition, evaluates the hint policy
/// on fails, and saves the updated record in one pass.
pub async fn record_outcome(
    store: &dyn ProgressStore,
    policy: &HintPolicy,
    user_id: &str,
    boss_id: &str,
    outcome: Outcome,
    at: DateTime<Utc>,
) -> Result<OutcomeReport> {
    let mut progress = store.load_or_default(user_id, boss_id).await?;
    progress.apply(outcome, at);

    let (hint_unlocked, hint_content_id) = match outcome {
        Outcome::Win => (false, None),
        Outcome::Fail => {
            let decision =
                policy.evaluate(boss_id, progress.fail_streak, progress.highest_hint_level);
            if decision.unlocked {
                tracing::info!(
                    user_id,
                    boss_id,
                    level = decision.new_highest_hint_level,
                    "hint tier unlocked"
                );
            }
            progress.highest_hint_level = decision.new_highest_hint_level;
            (decision.unlocked, decision.content_id)
        }
    };

    store.save(&progress).await?;

    Ok(OutcomeReport {
        outcome,
        fail_streak: progress.fail_streak,
        highest_hint_level: progress.highest_hint_level,
        hint_unlocked,
        hint_content_id,
    })
}
