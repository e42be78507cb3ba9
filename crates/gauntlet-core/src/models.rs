//! Core data models for the Gauntlet engine.
//!
//! These types represent the sessions, submissions, and per-boss
//! progression records that flow through the grading and progression
//! coordinators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::rubric::RubricResult;

/// Learning track selected during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Track {
    Debugging,
    Cloud,
    LlmAgents,
}

/// Result of one boss encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Fail,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Fail => "fail",
        }
    }
}

impl std::str::FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(Outcome::Win),
            "fail" => Ok(Outcome::Fail),
            other => anyhow::bail!("Unknown outcome: {}", other),
        }
    }
}

/// A learner's submission for one boss attempt.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub code: String,
    pub explanation: Option<String>,
}

impl Submission {
    /// Content fingerprint of this submission.
    pub fn fingerprint(&self) -> Fingerprint {
        crate::fingerprint::fingerprint(&self.code, self.explanation.as_deref())
    }
}

/// Carry-over context that gives the grader continuity across turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticContext {
    /// Short label of the issue currently being worked on.
    pub issue_summary: Option<String>,
    /// Recommended next action from the previous turn.
    pub next_step: Option<String>,
    /// Detected submission language ("python", "rust", ...), if known.
    pub language_hint: Option<String>,
}

/// Fingerprint and validated verdict of the most recent grading.
///
/// The pair is written in one store operation, so a session always holds
/// both or neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub fingerprint: Fingerprint,
    pub result: RubricResult,
}

/// Ephemeral per-conversation state.
///
/// Created lazily with all defaults on first access, mutated through
/// [`SessionPatch`], destroyed on explicit clear. Never survives the
/// conversation it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Whether the player has been welcomed this session.
    #[serde(default)]
    pub greeted: bool,
    /// Whether the judge has introduced the grading rubric.
    #[serde(default)]
    pub judge_intro_done: bool,
    /// Track chosen during onboarding.
    #[serde(default)]
    pub selected_track: Option<Track>,
    /// Most recent grading, if any.
    #[serde(default)]
    pub last_graded: Option<GradeRecord>,
    /// Context carried between turns for the grader.
    #[serde(default)]
    pub diagnostics: DiagnosticContext,
}

impl SessionState {
    /// Apply every populated field of `patch`, leaving the rest untouched.
    pub fn apply(&mut self, patch: SessionPatch) {
        if let Some(greeted) = patch.greeted {
            self.greeted = greeted;
        }
        if let Some(done) = patch.judge_intro_done {
            self.judge_intro_done = done;
        }
        if let Some(track) = patch.selected_track {
            self.selected_track = Some(track);
        }
        if let Some(record) = patch.last_graded {
            self.last_graded = Some(record);
        }
        if let Some(diagnostics) = patch.diagnostics {
            self.diagnostics = diagnostics;
        }
    }
}

/// Partial update for a [`SessionState`].
///
/// Only populated fields are applied. When deserialized from JSON,
/// unknown keys are ignored rather than rejected, so stale clients
/// cannot poison a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionPatch {
    pub greeted: Option<bool>,
    pub judge_intro_done: Option<bool>,
    pub selected_track: Option<Track>,
    pub last_graded: Option<GradeRecord>,
    pub diagnostics: Option<DiagnosticContext>,
}

/// Durable per-(user, boss) progression record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossProgress {
    pub user_id: String,
    pub boss_id: String,
    /// Consecutive fails since the last win (or since creation).
    pub fail_streak: u32,
    /// Highest hint tier ever reached. Never decreases.
    pub highest_hint_level: u32,
    pub last_result: Option<Outcome>,
    /// Unset until the first recorded outcome.
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl BossProgress {
    /// Fresh record with zeroed streak and hint level.
    pub fn new(user_id: &str, boss_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            boss_id: boss_id.to_string(),
            fail_streak: 0,
            highest_hint_level: 0,
            last_result: None,
            last_attempt_at: None,
        }
    }

    /// Apply one encounter outcome.
    ///
    /// A win resets the fail streak; a fail extends it.
    /// `highest_hint_level` is untouched here: ratcheting it is the
    /// progression coordinator's job, after consulting the hint policy.
    pub fn apply(&mut self, outcome: Outcome, at: DateTime<Utc>) {
        match outcome {
            Outcome::Win => self.fail_streak = 0,
            Outcome::Fail => self.fail_streak += 1,
        }
        self.last_result = Some(outcome);
        self.last_attempt_at = Some(at);
    }
}
