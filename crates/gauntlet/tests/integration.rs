//! End-to-end tests for the engine facade.
//!
//! These tests drive [`Gauntlet`] the way a host would: grade
//! submissions through the scripted grader and custom stubs, record
//! encounter outcomes, and check dedup, hint unlocks, persistence, and
//! concurrency behavior.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use gauntlet::config::{load_config, Config};
use gauntlet::grader::MAGIC_PASS_TOKEN;
use gauntlet::store::memory::{MemoryProgressStore, MemorySessionStore};
use gauntlet::{
    DiagnosticContext, GradeStatus, Gauntlet, Grader, HintPolicy, Outcome, RubricSpec,
    SessionPatch, Submission, Track,
};

// ─── Test Graders ───────────────────────────────────────────────────

/// A grader that fails every call and counts invocations.
struct FailingGrader {
    calls: AtomicUsize,
}

impl FailingGrader {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Grader for FailingGrader {
    fn name(&self) -> &str {
        "failing"
    }

    async fn evaluate(
        &self,
        _submission: &Submission,
        _diagnostics: &DiagnosticContext,
    ) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("judge offline")
    }
}

/// A grader that returns the same verdict payload every time.
struct StaticGrader {
    verdict: Value,
}

#[async_trait]
impl Grader for StaticGrader {
    fn name(&self) -> &str {
        "static"
    }

    async fn evaluate(
        &self,
        _submission: &Submission,
        _diagnostics: &DiagnosticContext,
    ) -> Result<Value> {
        Ok(self.verdict.clone())
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn test_config(tmp: &TempDir) -> Config {
    let db_path = tmp.path().join("gauntlet.sqlite");
    let config_content = format!(
        r#"
[db]
path = "{}"

[grader]
provider = "scripted"

[hints]
thresholds = [2]

[hints.guides]
boss-reactor-core = "boss-reactor-core"
reactor_core = "boss-reactor-core"
"#,
        db_path.display()
    );
    toml::from_str(&config_content).unwrap()
}

fn test_config_with_dataset(tmp: &TempDir) -> Config {
    let dataset_path = tmp.path().join("golden.jsonl");
    fs::write(
        &dataset_path,
        concat!(
            r#"{"id": "reactor-fix", "input": "def stabilize(core):\n    return core.damp(0.5)", "expected_score": 80}"#,
            "\n",
            r#"{"id": "coolant-loop", "input": "while temp > limit: vent()", "expected_score": 20}"#,
            "\n\n",
        ),
    )
    .unwrap();

    let db_path = tmp.path().join("gauntlet.sqlite");
    let config_content = format!(
        r#"
[db]
path = "{}"

[grader]
provider = "scripted"
dataset = "{}"
"#,
        db_path.display(),
        dataset_path.display()
    );
    toml::from_str(&config_content).unwrap()
}

fn memory_engine(grader: Arc<dyn Grader>, rubric: RubricSpec, policy: HintPolicy) -> Gauntlet {
    Gauntlet::new(
        Arc::new(MemorySessionStore::new()),
        Arc::new(MemoryProgressStore::new()),
        grader,
        rubric,
        policy,
    )
}

// ─── Grading ────────────────────────────────────────────────────────

/// Prove that an unknown submission gets the scripted fallback verdict
/// and that identical resubmissions are served without regrading.
#[tokio::test]
async fn test_scripted_grade_and_dedup() {
    let tmp = TempDir::new().unwrap();
    let engine = Gauntlet::open(&test_config(&tmp)).await.unwrap();

    let report = engine
        .grade("session-1", "print('attack')", Some("First try."))
        .await
        .unwrap();
    assert_eq!(report.status, GradeStatus::Graded);
    assert_eq!(report.result.score("coverage"), Some(3));
    assert_eq!(report.result.score("correctness"), Some(3));
    assert_eq!(report.result.score("clarity"), Some(2));
    assert_eq!(report.weighted_score, 56.0);

    // Same code and explanation: stored verdict, no regrade
    let repeat = engine
        .grade("session-1", "print('attack')", Some("First try."))
        .await
        .unwrap();
    assert_eq!(repeat.status, GradeStatus::Skipped);
    assert_eq!(repeat.fingerprint, report.fingerprint);
    assert_eq!(repeat.result, report.result);

    // Changing only the explanation is a new submission
    let changed = engine
        .grade("session-1", "print('attack')", Some("Second try."))
        .await
        .unwrap();
    assert_eq!(changed.status, GradeStatus::Graded);
    assert_ne!(changed.fingerprint, report.fingerprint);

    // Dedup is per session
    let other = engine
        .grade("session-2", "print('attack')", Some("First try."))
        .await
        .unwrap();
    assert_eq!(other.status, GradeStatus::Graded);
}

/// Prove the magic pass token scores top marks on every criterion.
#[tokio::test]
async fn test_magic_token_passes() {
    let tmp = TempDir::new().unwrap();
    let engine = Gauntlet::open(&test_config(&tmp)).await.unwrap();

    let code = format!("# {}\npass", MAGIC_PASS_TOKEN);
    let report = engine.grade("session-1", &code, None).await.unwrap();

    assert_eq!(report.result.score("coverage"), Some(5));
    assert_eq!(report.result.score("correctness"), Some(5));
    assert_eq!(report.result.score("clarity"), Some(5));
    assert_eq!(report.weighted_score, 100.0);
    assert!(report.result.feedback.contains("Magic pass token"));
}

/// Prove golden dataset matching is whitespace-insensitive while
/// dedup stays byte-exact.
#[tokio::test]
async fn test_golden_dataset_matching() {
    let tmp = TempDir::new().unwrap();
    let engine = Gauntlet::open(&test_config_with_dataset(&tmp)).await.unwrap();

    let report = engine
        .grade(
            "session-1",
            "def stabilize(core):\n    return core.damp(0.5)",
            None,
        )
        .await
        .unwrap();
    assert_eq!(report.result.score("coverage"), Some(4));
    assert_eq!(report.weighted_score, 80.0);
    assert!(report.result.feedback.contains("reactor-fix"));

    // Reformatted code still hits the same case, but as new content it
    // goes through the grader again rather than the dedup path
    let reformatted = engine
        .grade("session-1", "def stabilize(core): return core.damp(0.5)", None)
        .await
        .unwrap();
    assert_eq!(reformatted.status, GradeStatus::Graded);
    assert_eq!(reformatted.result.score("coverage"), Some(4));

    // Low-scoring case maps to the bottom of the rubric scale
    let weak = engine
        .grade("session-2", "while temp > limit: vent()", None)
        .await
        .unwrap();
    assert_eq!(weak.result.score("correctness"), Some(1));
    assert_eq!(weak.weighted_score, 20.0);
}

/// Prove a failing grader yields a stored zero-score verdict instead of
/// an error, and that the failure is deduplicated like any verdict.
#[tokio::test]
async fn test_grader_failure_degrades_and_dedups() {
    let grader = Arc::new(FailingGrader::new());
    let engine = memory_engine(
        grader.clone(),
        RubricSpec::default(),
        HintPolicy::default(),
    );

    let report = engine.grade("session-1", "broken", None).await.unwrap();
    assert_eq!(report.status, GradeStatus::Graded);
    assert!(report.result.scores.iter().all(|c| c.score == 0));
    assert_eq!(report.result.feedback, "Grading error: judge offline");
    assert_eq!(report.weighted_score, 0.0);
    assert_eq!(grader.calls.load(Ordering::SeqCst), 1);

    // Identical resubmission must not retry the grader
    let repeat = engine.grade("session-1", "broken", None).await.unwrap();
    assert_eq!(repeat.status, GradeStatus::Skipped);
    assert_eq!(grader.calls.load(Ordering::SeqCst), 1);

    // New content does
    let other = engine.grade("session-1", "broken v2", None).await.unwrap();
    assert_eq!(other.status, GradeStatus::Graded);
    assert_eq!(grader.calls.load(Ordering::SeqCst), 2);
}

/// Prove the disabled provider resolves encounters with a degraded
/// verdict rather than an error.
#[tokio::test]
async fn test_disabled_provider_still_resolves() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("gauntlet.sqlite");
    let config: Config = toml::from_str(&format!("[db]\npath = \"{}\"\n", db_path.display()))
        .unwrap();
    let engine = Gauntlet::open(&config).await.unwrap();

    let report = engine.grade("session-1", "anything", None).await.unwrap();
    assert_eq!(report.status, GradeStatus::Graded);
    assert_eq!(report.result.feedback, "Grading error: Grader is disabled");
    assert_eq!(report.weighted_score, 0.0);
}

/// Prove the weighted score follows the session's track, including for
/// verdicts served from the dedup path after the track changes.
#[tokio::test]
async fn test_weighted_score_tracks_selected_track() {
    let grader = Arc::new(StaticGrader {
        verdict: json!({"coverage": 5, "correctness": 1, "clarity": 0, "feedback": "mixed"}),
    });
    let engine = memory_engine(grader, RubricSpec::default(), HintPolicy::default());

    let report = engine.grade("session-1", "code", None).await.unwrap();
    assert_eq!(report.weighted_score, 48.0);

    // Debugging weighs correctness heavier, so the same verdict scores lower
    let patch: SessionPatch =
        serde_json::from_value(json!({"selected_track": "debugging"})).unwrap();
    engine.update_session("session-1", patch).await.unwrap();

    let repeat = engine.grade("session-1", "code", None).await.unwrap();
    assert_eq!(repeat.status, GradeStatus::Skipped);
    assert_eq!(repeat.weighted_score, 40.0);
}

// ─── Sessions ───────────────────────────────────────────────────────

/// Prove patches apply only their populated fields and ignore unknown
/// keys from stale clients.
#[tokio::test]
async fn test_session_patch_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let engine = Gauntlet::open(&test_config(&tmp)).await.unwrap();

    let patch: SessionPatch = serde_json::from_value(json!({
        "greeted": true,
        "selected_track": "llm-agents",
        "combo_meter": 9000
    }))
    .unwrap();
    let state = engine.update_session("session-1", patch).await.unwrap();
    assert!(state.greeted);
    assert_eq!(state.selected_track, Some(Track::LlmAgents));
    assert!(!state.judge_intro_done);

    // A later partial patch leaves earlier fields alone
    let patch: SessionPatch = serde_json::from_value(json!({
        "judge_intro_done": true,
        "diagnostics": {"issue_summary": "races in the cooldown timer"}
    }))
    .unwrap();
    let state = engine.update_session("session-1", patch).await.unwrap();
    assert!(state.greeted);
    assert!(state.judge_intro_done);
    assert_eq!(state.selected_track, Some(Track::LlmAgents));
    assert_eq!(
        state.diagnostics.issue_summary.as_deref(),
        Some("races in the cooldown timer")
    );

    // Reads materialize unknown sessions as defaults
    let fresh = engine.session("session-never-seen").await.unwrap();
    assert!(!fresh.greeted);
    assert!(fresh.last_graded.is_none());
}

/// Prove clearing a session also clears grading dedup state.
#[tokio::test]
async fn test_clear_session_resets_dedup() {
    let tmp = TempDir::new().unwrap();
    let engine = Gauntlet::open(&test_config(&tmp)).await.unwrap();

    let first = engine.grade("session-1", "print('hi')", None).await.unwrap();
    assert_eq!(first.status, GradeStatus::Graded);
    let repeat = engine.grade("session-1", "print('hi')", None).await.unwrap();
    assert_eq!(repeat.status, GradeStatus::Skipped);

    engine.clear_session("session-1").await.unwrap();

    let after = engine.grade("session-1", "print('hi')", None).await.unwrap();
    assert_eq!(after.status, GradeStatus::Graded);
}

// ─── Progression ────────────────────────────────────────────────────

/// Walk a fail, fail, win, fail sequence and check the streak, hint
/// level, and hint surfacing at every step.
#[tokio::test]
async fn test_outcome_sequence_drives_hints() {
    let tmp = TempDir::new().unwrap();
    let engine = Gauntlet::open(&test_config(&tmp)).await.unwrap();
    let user = "user-1";
    let boss = "boss-reactor-core";

    let first = engine.record_outcome(user, boss, Outcome::Fail).await.unwrap();
    assert_eq!(first.fail_streak, 1);
    assert_eq!(first.highest_hint_level, 0);
    assert!(!first.hint_unlocked);
    assert_eq!(first.hint_content_id, None);

    let second = engine.record_outcome(user, boss, Outcome::Fail).await.unwrap();
    assert_eq!(second.fail_streak, 2);
    assert_eq!(second.highest_hint_level, 1);
    assert!(second.hint_unlocked);
    assert_eq!(second.hint_content_id.as_deref(), Some("boss-reactor-core"));

    // A win resets the streak but never the earned hint level
    let win = engine.record_outcome(user, boss, Outcome::Win).await.unwrap();
    assert_eq!(win.fail_streak, 0);
    assert_eq!(win.highest_hint_level, 1);
    assert!(!win.hint_unlocked);
    assert_eq!(win.hint_content_id, None);

    let fourth = engine.record_outcome(user, boss, Outcome::Fail).await.unwrap();
    assert_eq!(fourth.fail_streak, 1);
    assert_eq!(fourth.highest_hint_level, 1);
    assert!(!fourth.hint_unlocked);
    assert_eq!(fourth.hint_content_id, None);
}

/// Prove the guide resurfaces on every qualifying fail, including under
/// a boss alias, without re-firing the unlock flag.
#[tokio::test]
async fn test_hint_content_repeats_past_threshold() {
    let tmp = TempDir::new().unwrap();
    let engine = Gauntlet::open(&test_config(&tmp)).await.unwrap();

    engine
        .record_outcome("user-1", "reactor_core", Outcome::Fail)
        .await
        .unwrap();
    let unlock = engine
        .record_outcome("user-1", "reactor_core", Outcome::Fail)
        .await
        .unwrap();
    assert!(unlock.hint_unlocked);
    assert_eq!(unlock.hint_content_id.as_deref(), Some("boss-reactor-core"));

    let third = engine
        .record_outcome("user-1", "reactor_core", Outcome::Fail)
        .await
        .unwrap();
    assert_eq!(third.fail_streak, 3);
    assert!(!third.hint_unlocked);
    assert_eq!(third.hint_content_id.as_deref(), Some("boss-reactor-core"));
}

/// Prove streaks are isolated per (user, boss) pair.
#[tokio::test]
async fn test_progress_isolated_per_user_and_boss() {
    let tmp = TempDir::new().unwrap();
    let engine = Gauntlet::open(&test_config(&tmp)).await.unwrap();

    engine
        .record_outcome("user-1", "boss-a", Outcome::Fail)
        .await
        .unwrap();
    let again = engine
        .record_outcome("user-1", "boss-a", Outcome::Fail)
        .await
        .unwrap();
    assert_eq!(again.fail_streak, 2);

    let other_boss = engine
        .record_outcome("user-1", "boss-b", Outcome::Fail)
        .await
        .unwrap();
    assert_eq!(other_boss.fail_streak, 1);

    let other_user = engine
        .record_outcome("user-2", "boss-a", Outcome::Fail)
        .await
        .unwrap();
    assert_eq!(other_user.fail_streak, 1);
}

/// Prove progress survives an engine restart on the same database.
#[tokio::test]
async fn test_progress_persists_across_reopen() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);

    {
        let engine = Gauntlet::open(&config).await.unwrap();
        for _ in 0..3 {
            engine
                .record_outcome("user-1", "boss-reactor-core", Outcome::Fail)
                .await
                .unwrap();
        }
    }

    let engine = Gauntlet::open(&config).await.unwrap();
    let progress = engine
        .progress("user-1", "boss-reactor-core")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(progress.fail_streak, 3);
    assert_eq!(progress.highest_hint_level, 1);
    assert_eq!(progress.last_result, Some(Outcome::Fail));
    assert!(progress.last_attempt_at.is_some());

    // Unrecorded pairs read back as absent
    assert!(engine
        .progress("user-1", "boss-unseen")
        .await
        .unwrap()
        .is_none());

    let win = engine
        .record_outcome("user-1", "boss-reactor-core", Outcome::Win)
        .await
        .unwrap();
    assert_eq!(win.fail_streak, 0);
    assert_eq!(win.highest_hint_level, 1);
}

/// Hammer one (user, boss) pair from many tasks and prove no streak
/// increment is lost.
#[tokio::test]
async fn test_concurrent_outcomes_never_lose_increments() {
    let tmp = TempDir::new().unwrap();
    let engine = Arc::new(Gauntlet::open(&test_config(&tmp)).await.unwrap());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .record_outcome("user-race", "boss-race", Outcome::Fail)
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let progress = engine
        .progress("user-race", "boss-race")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(progress.fail_streak, 16);
}

// ─── Configuration ──────────────────────────────────────────────────

/// Prove load_config rejects bad values and fills defaults otherwise.
#[test]
fn test_load_config_validation() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("gauntlet.toml");

    fs::write(
        &path,
        "[db]\npath = \"x.sqlite\"\n\n[grader]\nprovider = \"quantum\"\n",
    )
    .unwrap();
    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("Unknown grader provider"));

    fs::write(
        &path,
        "[db]\npath = \"x.sqlite\"\n\n[hints]\nthresholds = [3, 3]\n",
    )
    .unwrap();
    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("strictly increasing"));

    fs::write(
        &path,
        "[db]\npath = \"x.sqlite\"\n\n[grader]\nprovider = \"openai\"\n",
    )
    .unwrap();
    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("grader.model"));

    // A db path alone is a valid config; everything else defaults
    fs::write(&path, "[db]\npath = \"x.sqlite\"\n").unwrap();
    let config = load_config(&path).unwrap();
    assert_eq!(config.grader.provider, "disabled");
    assert_eq!(config.grader.max_retries, 2);
    assert_eq!(config.hints.thresholds, vec![2]);
    assert_eq!(config.rubric.max_score, 5);
    assert_eq!(config.rubric.criteria[0], "coverage");
}
