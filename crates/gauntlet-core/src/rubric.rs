//! Rubric validation for untrusted grader output.
//!
//! The grader returns arbitrary JSON. [`RubricSpec::validate`] is the
//! single boundary where that payload becomes a typed [`RubricResult`]:
//! each criterion is coerced to an integer and clamped into range,
//! feedback is truncated, and nothing ever fails. A grader that fails
//! outright is represented by [`RubricSpec::failure_result`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Track;

/// Number of rubric criteria. Fixed by the grading contract.
pub const CRITERION_COUNT: usize = 3;

/// Weighted-score weights, one per criterion in rubric order.
const DEFAULT_WEIGHTS: [f64; CRITERION_COUNT] = [0.4, 0.4, 0.2];
const DEBUGGING_WEIGHTS: [f64; CRITERION_COUNT] = [0.3, 0.5, 0.2];

/// How much of a failing grader's error text survives into feedback.
const FAILURE_REASON_CAP: usize = 100;

/// Grading contract: criterion names, score range, and feedback limits.
#[derive(Debug, Clone, Deserialize)]
pub struct RubricSpec {
    /// The three criterion names, also the JSON keys read from raw payloads.
    #[serde(default = "default_criteria")]
    pub criteria: [String; CRITERION_COUNT],
    /// Inclusive upper bound for each criterion score.
    #[serde(default = "default_max_score")]
    pub max_score: u8,
    /// Maximum feedback length in characters.
    #[serde(default = "default_feedback_cap")]
    pub feedback_cap: usize,
    /// Feedback used when the payload carries none.
    #[serde(default = "default_fallback_feedback")]
    pub fallback_feedback: String,
}

fn default_criteria() -> [String; CRITERION_COUNT] {
    [
        "coverage".to_string(),
        "correctness".to_string(),
        "clarity".to_string(),
    ]
}
fn default_max_score() -> u8 {
    5
}
fn default_feedback_cap() -> usize {
    200
}
fn default_fallback_feedback() -> String {
    "Good effort. Keep practicing!".to_string()
}

impl Default for RubricSpec {
    fn default() -> Self {
        Self {
            criteria: default_criteria(),
            max_score: default_max_score(),
            feedback_cap: default_feedback_cap(),
            fallback_feedback: default_fallback_feedback(),
        }
    }
}

/// One validated criterion score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub name: String,
    pub score: u8,
}

/// A validated grading verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricResult {
    /// Clamped scores, one per criterion, in rubric order.
    pub scores: [CriterionScore; CRITERION_COUNT],
    /// Truncated feedback text.
    pub feedback: String,
}

impl RubricResult {
    /// Look up a criterion score by name.
    pub fn score(&self, name: &str) -> Option<u8> {
        self.scores.iter().find(|c| c.name == name).map(|c| c.score)
    }
}

impl RubricSpec {
    /// Validate a raw grader payload into a [`RubricResult`].
    ///
    /// Total over arbitrary JSON. Each criterion is read by name from the
    /// payload and coerced (integer, float, or numeric string); anything
    /// absent or non-numeric becomes 0, and every value is clamped to
    /// `[0, max_score]`. Feedback comes from `feedback`, then `comment`,
    /// then the configured fallback, truncated to `feedback_cap`
    /// characters.
    pub fn validate(&self, raw: &Value) -> RubricResult {
        let scores = self.criteria.clone().map(|name| {
            let score = self.coerce_score(raw.get(name.as_str()));
            CriterionScore { name, score }
        });

        let feedback = raw
            .get("feedback")
            .and_then(Value::as_str)
            .or_else(|| raw.get("comment").and_then(Value::as_str))
            .unwrap_or(&self.fallback_feedback);

        RubricResult {
            scores,
            feedback: truncate_chars(feedback, self.feedback_cap),
        }
    }

    /// The degraded verdict recorded when the grader itself fails.
    ///
    /// All-zero scores, with the failure reason folded into the feedback
    /// text.
    pub fn failure_result(&self, err: &anyhow::Error) -> RubricResult {
        let reason = truncate_chars(&err.to_string(), FAILURE_REASON_CAP);
        RubricResult {
            scores: self
                .criteria
                .clone()
                .map(|name| CriterionScore { name, score: 0 }),
            feedback: format!("Grading error: {}", reason),
        }
    }

    /// Weighted 0-100 score for a verdict, rounded to one decimal.
    ///
    /// `Σ(score_i × w_i) / max_score × 100`, with the weight set picked
    /// by track (the debugging track weighs correctness heavier).
    pub fn weighted_score(&self, result: &RubricResult, track: Option<Track>) -> f64 {
        let weights = match track {
            Some(Track::Debugging) => DEBUGGING_WEIGHTS,
            _ => DEFAULT_WEIGHTS,
        };
        let total: f64 = result
            .scores
            .iter()
            .zip(weights.iter())
            .map(|(c, w)| f64::from(c.score) * w)
            .sum();
        let pct = total / f64::from(self.max_score) * 100.0;
        (pct * 10.0).round() / 10.0
    }

    fn coerce_score(&self, value: Option<&Value>) -> u8 {
        let n = match value {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        n.unwrap_or(0).clamp(0, i64::from(self.max_score)) as u8
    }
}

/// Truncate to at most `cap` characters, on a char boundary.
fn truncate_chars(s: &str, cap: usize) -> String {
    s.chars().take(cap).collect()
}
