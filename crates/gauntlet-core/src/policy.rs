//! Hint unlock policy.
//!
//! Hints unlock in tiers as a player's fail streak on a boss grows. The
//! tier for a streak is the number of configured thresholds at or below
//! it; the default single threshold of 2 gives one tier unlocked at the
//! second consecutive fail. Some bosses map to a hint guide, surfaced on
//! every qualifying fail so a player who dismissed it can find it again.

use std::collections::HashMap;

use serde::Deserialize;

fn default_thresholds() -> Vec<u32> {
    vec![2]
}

/// Thresholds and the boss-to-guide mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct HintPolicy {
    /// Fail-streak values at which successive hint tiers unlock.
    /// Strictly increasing, at least one entry.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<u32>,
    /// Boss id (or alias) to hint guide content id.
    #[serde(default)]
    pub guides: HashMap<String, String>,
}

impl Default for HintPolicy {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            guides: HashMap::new(),
        }
    }
}

/// What the policy decided for one failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct HintDecision {
    /// Hint level after this fail, never below the level going in.
    pub new_highest_hint_level: u32,
    /// True only on the attempt that first reaches a new tier.
    pub unlocked: bool,
    /// Guide to surface, present on every fail at or past the first
    /// threshold for a mapped boss.
    pub content_id: Option<String>,
}

impl HintPolicy {
    /// Evaluate a failed attempt against the thresholds.
    ///
    /// `current_level` is the hint level already earned on this boss; the
    /// returned level never goes below it, so a streak reset by a win
    /// cannot re-lock hints.
    pub fn evaluate(&self, boss_id: &str, fail_streak: u32, current_level: u32) -> HintDecision {
        let tier = self.thresholds.iter().filter(|&&t| fail_streak >= t).count() as u32;
        let new_highest_hint_level = tier.max(current_level);
        let unlocked = new_highest_hint_level > current_level;

        let reached_first = self
            .thresholds
            .iter()
            .min()
            .map_or(false, |&t| fail_streak >= t);
        let content_id = if reached_first {
            self.guides.get(boss_id).cloned()
        } else {
            None
        };

        HintDecision {
            new_highest_hint_level,
            unlocked,
            content_id,
        }
    }
}
