//! Grading coordinator.
//!
//! Drives one submission through fingerprinting, dedup, the grader, and
//! rubric validation. The contract is at-most-once grading per distinct
//! submission: a session's most recent verdict is stored under the
//! submission fingerprint, and resubmitting identical content serves the
//! stored verdict instead of calling the grader again.
//!
//! Grader failures are absorbed here. A failed evaluation produces a
//! zero-score verdict which is stored and deduplicated exactly like a
//! successful one, so a flaky judge cannot be farmed for free retries.

use anyhow::Result;
use serde::Serialize;

use crate::fingerprint::Fingerprint;
use crate::grader::Grader;
use crate::models::{GradeRecord, SessionPatch, Submission};
use crate::rubric::{RubricResult, RubricSpec};
use crate::store::SessionStore;

/// Whether the grader actually ran for this report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeStatus {
    /// The grader evaluated this submission.
    Graded,
    /// Identical content was already graded; the stored verdict was served.
    Skipped,
}

/// Outcome of grading one submission.
#[derive(Debug, Clone, Serialize)]
pub struct GradeReport {
    pub status: GradeStatus,
    pub fingerprint: Fingerprint,
    pub result: RubricResult,
    /// Weighted 0-100 score under the session's current track.
    pub weighted_score: f64,
}

/// Grade a submission within a session.
///
/// Reads the session, short-circuits on a fingerprint match, otherwise
/// evaluates and stores the verdict. The session store is never held
/// across the grader call; concurrent grading of different content in
/// one session is last-write-wins on the stored record.
pub async fn grade_submission(
    sessions: &dyn SessionStore,
    grader: &dyn Grader,
    rubric: &RubricSpec,
    session_id: &str,
    submission: &Submission,
) -> Result<GradeReport> {
    let digest = submission.fingerprint();
    let state = sessions.get(session_id).await?;

    if let Some(record) = &state.last_graded {
        if record.fingerprint == digest {
            tracing::debug!(
                session_id,
                fingerprint = %digest,
                "serving stored verdict for repeated submission"
            );
            let weighted_score = rubric.weighted_score(&record.result, state.selected_track);
            return Ok(GradeReport {
                status: GradeStatus::Skipped,
                fingerprint: digest,
                result: record.result.clone(),
                weighted_score,
            });
        }
    }

    let result = match grader.evaluate(submission, &state.diagnostics).await {
        Ok(raw) => rubric.validate(&raw),
        Err(err) => {
            tracing::warn!(
                session_id,
                grader = grader.name(),
                error = %err,
                "grader failed; recording degraded verdict"
            );
            rubric.failure_result(&err)
        }
    };

    let updated = sessions
        .update(
            session_id,
            SessionPatch {
                last_graded: Some(GradeRecord {
                    fingerprint: digest.clone(),
                    result: result.clone(),
                }),
                ..Default::default()
            },
        )
        .await?;

    let weighted_score = rubric.weighted_score(&result, updated.selected_track);
    Ok(GradeReport {
        status: GradeStatus::Graded,
        fingerprint: digest,
        result,
        weighted_score,
    })
}
