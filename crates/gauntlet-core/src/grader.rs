//! The grader seam.
//!
//! A [`Grader`] turns a submission into a raw JSON verdict. Backends
//! (LLM judges, scripted graders) live in the `gauntlet` engine crate;
//! the grading coordinator only sees this trait.
//!
//! Verdicts are untrusted: whatever a backend returns goes through
//! [`RubricSpec::validate`](crate::rubric::RubricSpec::validate) before
//! anything downstream touches it, so implementations are free to return
//! the judge's output as-is.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::models::{DiagnosticContext, Submission};

/// Abstract grading backend.
///
/// Implementations must be `Send + Sync` to work with async runtimes.
#[async_trait]
pub trait Grader: Send + Sync {
    /// Backend name, used in log events.
    fn name(&self) -> &str;

    /// Grade one submission, returning the raw verdict payload.
    ///
    /// Errors are not fatal to the caller: the grading coordinator
    /// converts them into a zero-score verdict and keeps going.
    async fn evaluate(
        &self,
        submission: &Submission,
        diagnostics: &DiagnosticContext,
    ) -> Result<Value>;
}
