//! # Gauntlet
//!
//! **A boss-encounter grading and progression engine for gamified
//! skills training.**
//!
//! Gauntlet sits behind a conversational trainer: players attack coding
//! "bosses" by submitting code plus an optional explanation, an LLM
//! judge (or a scripted stand-in) scores the attempt against a fixed
//! rubric, and wins and fails drive per-boss progression with hint
//! tiers that unlock as a fail streak grows.
//!
//! ## Data Flow
//!
//! 1. A host calls [`Gauntlet::grade`] with the player's submission.
//! 2. The submission is fingerprinted; identical resubmissions are
//!    served the stored verdict without another judge call.
//! 3. New content goes to the configured [`Grader`]; whatever JSON
//!    comes back is validated against the rubric (clamped scores,
//!    truncated feedback) and stored in the session.
//! 4. When the encounter resolves, the host calls
//!    [`Gauntlet::record_outcome`]; the fail streak moves, the hint
//!    policy runs, and the progress row is upserted in SQLite.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gauntlet::{Gauntlet, Outcome};
//! use std::path::Path;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = gauntlet::config::load_config(Path::new("config/gauntlet.toml"))?;
//! let engine = Gauntlet::open(&config).await?;
//!
//! let report = engine
//!     .grade("session-1", "def fix(): ...", Some("Swapped the bounds."))
//!     .await?;
//! println!("{} ({:.1})", report.result.feedback, report.weighted_score);
//!
//! let outcome = engine
//!     .record_outcome("user-1", "boss-reactor-core", Outcome::Fail)
//!     .await?;
//! if let Some(content_id) = outcome.hint_content_id {
//!     println!("hint available: {}", content_id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Graders
//!
//! | Config Value | Backend |
//! |-------------|---------|
//! | `"disabled"` | Always errors, degraded to zero-score verdicts |
//! | `"openai"` | OpenAI chat completions judge |
//! | `"ollama"` | Local Ollama judge |
//! | `"scripted"` | Golden-dataset grader for tests and offline use |
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool with WAL mode |
//! | [`engine`] | The [`Gauntlet`] facade |
//! | [`grader`] | Grading backends: OpenAI, Ollama, scripted, disabled |
//! | [`locks`] | Per-(user, boss) locks for outcome recording |
//! | [`migrate`] | Database schema migrations (idempotent) |
//! | [`sqlite_store`] | SQLite-backed progress store |
//!
//! Core types (models, rubric validation, hint policy, store traits,
//! and the coordinators) live in the `gauntlet-core` crate and are
//! re-exported here.

pub mod config;
pub mod db;
pub mod engine;
pub mod grader;
pub mod locks;
pub mod migrate;
pub mod sqlite_store;

pub use engine::Gauntlet;
pub use gauntlet_core::grade::{GradeReport, GradeStatus};
pub use gauntlet_core::grader::Grader;
pub use gauntlet_core::models::{
    BossProgress, DiagnosticContext, Outcome, SessionPatch, SessionState, Submission, Track,
};
pub use gauntlet_core::policy::{HintDecision, HintPolicy};
pub use gauntlet_core::progress::OutcomeReport;
pub use gauntlet_core::rubric::{RubricResult, RubricSpec};
pub use gauntlet_core::store;
