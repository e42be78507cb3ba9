//! The engine facade.
//!
//! [`Gauntlet`] wires the configured stores, grader, rubric, and hint
//! policy together and exposes the operations a host calls: grade a
//! submission, record an encounter outcome, and read or mutate session
//! state.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;

use gauntlet_core::grade::{self, GradeReport};
use gauntlet_core::grader::Grader;
use gauntlet_core::models::{BossProgress, Outcome, SessionPatch, SessionState, Submission};
use gauntlet_core::policy::HintPolicy;
use gauntlet_core::progress::{self, OutcomeReport};
use gauntlet_core::rubric::RubricSpec;
use gauntlet_core::store::memory::MemorySessionStore;
use gauntlet_core::store::{ProgressStore, SessionStore};

use crate::config::Config;
use crate::db;
use crate::grader::create_grader;
use crate::locks::KeyedLocks;
use crate::migrate;
use crate::sqlite_store::SqliteProgressStore;

/// The assembled engine.
///
/// Hosts typically wrap it in an [`Arc`] and call it from many
/// concurrent tasks; every operation takes `&self`.
pub struct Gauntlet {
    sessions: Arc<dyn SessionStore>,
    progress: Arc<dyn ProgressStore>,
    grader: Arc<dyn Grader>,
    rubric: RubricSpec,
    policy: HintPolicy,
    locks: KeyedLocks,
}

impl Gauntlet {
    /// Assemble an engine from parts. Prefer [`Gauntlet::open`] outside
    /// of tests.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        progress: Arc<dyn ProgressStore>,
        grader: Arc<dyn Grader>,
        rubric: RubricSpec,
        policy: HintPolicy,
    ) -> Self {
        Self {
            sessions,
            progress,
            grader,
            rubric,
            policy,
            locks: KeyedLocks::new(),
        }
    }

    /// Open an engine from configuration: connect the database, run
    /// migrations, and build the configured grader.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(&config.db).await?;
        migrate::run_migrations(&pool).await?;

        let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let progress: Arc<dyn ProgressStore> = Arc::new(SqliteProgressStore::new(pool));
        let grader: Arc<dyn Grader> = create_grader(&config.grader, &config.rubric)?.into();

        tracing::info!(
            db = %config.db.path.display(),
            provider = %config.grader.provider,
            "gauntlet engine ready"
        );

        Ok(Self::new(
            sessions,
            progress,
            grader,
            config.rubric.clone(),
            config.hints.clone(),
        ))
    }

    /// Grade a submission within a session.
    ///
    /// Identical resubmissions (same code and explanation) are served
    /// the stored verdict without another grader call.
    pub async fn grade(
        &self,
        session_id: &str,
        code: &str,
        explanation: Option<&str>,
    ) -> Result<GradeReport> {
        let submission = Submission {
            code: code.to_string(),
            explanation: explanation.map(str::to_string),
        };
        grade::grade_submission(
            self.sessions.as_ref(),
            self.grader.as_ref(),
            &self.rubric,
            session_id,
            &submission,
        )
        .await
    }

    /// Record a win or fail for a (user, boss) pair.
    ///
    /// Calls for the same pair are serialized so concurrent reports
    /// cannot lose streak increments.
    pub async fn record_outcome(
        &self,
        user_id: &str,
        boss_id: &str,
        outcome: Outcome,
    ) -> Result<OutcomeReport> {
        let lock = self.locks.acquire(user_id, boss_id).await;
        let _guard = lock.lock().await;
        progress::record_outcome(
            self.progress.as_ref(),
            &self.policy,
            user_id,
            boss_id,
            outcome,
            Utc::now(),
        )
        .await
    }

    /// Read a session, materializing a default one if absent.
    pub async fn session(&self, session_id: &str) -> Result<SessionState> {
        self.sessions.get(session_id).await
    }

    /// Apply a partial update to a session, returning the new state.
    pub async fn update_session(
        &self,
        session_id: &str,
        patch: SessionPatch,
    ) -> Result<SessionState> {
        self.sessions.update(session_id, patch).await
    }

    /// Drop a session. The next read starts fresh, including grading
    /// dedup state.
    pub async fn clear_session(&self, session_id: &str) -> Result<()> {
        self.sessions.clear(session_id).await
    }

    /// Read progress for a (user, boss) pair, if any has been recorded.
    pub async fn progress(&self, user_id: &str, boss_id: &str) -> Result<Option<BossProgress>> {
        self.progress.get(user_id, boss_id).await
    }
}
