//! Deterministic grader driven by a golden dataset.
//!
//! Stands in for the LLM judge in tests and offline development.
//! Behavior, in precedence order:
//! 1. Code containing [`MAGIC_PASS_TOKEN`] scores top marks on every
//!    criterion.
//! 2. Code whose whitespace-normalized hash matches a dataset case
//!    scores that case's expected score, mapped onto the rubric scale.
//! 3. Anything else gets a fixed middling verdict.
//!
//! Dataset cases are JSONL, one object per line:
//! `{"id": "case-1", "input": "...code...", "expected_score": 80}`.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use gauntlet_core::grader::Grader;
use gauntlet_core::models::{DiagnosticContext, Submission};
use gauntlet_core::rubric::{RubricSpec, CRITERION_COUNT};

use crate::config::GraderConfig;

/// Code containing this token anywhere passes with top scores.
pub const MAGIC_PASS_TOKEN: &str = "MAGIC_BOSS_PASS";

/// One golden dataset case.
#[derive(Debug, Clone, Deserialize)]
pub struct GoldenCase {
    #[serde(default)]
    pub id: String,
    /// Submission code this case matches, modulo whitespace.
    pub input: String,
    /// Expected 0-100 score for this input.
    #[serde(default = "default_expected_score")]
    pub expected_score: i64,
}

fn default_expected_score() -> i64 {
    50
}

/// Deterministic [`Grader`] for tests and offline development.
pub struct ScriptedGrader {
    rubric: RubricSpec,
    /// Golden cases keyed by normalized-input hash.
    cases: HashMap<String, GoldenCase>,
}

impl ScriptedGrader {
    /// Grader with no dataset: magic token and fallback behavior only.
    pub fn empty(rubric: &RubricSpec) -> Self {
        Self {
            rubric: rubric.clone(),
            cases: HashMap::new(),
        }
    }

    pub fn from_config(config: &GraderConfig, rubric: &RubricSpec) -> Result<Self> {
        match &config.dataset {
            Some(path) => Self::from_dataset(path, rubric),
            None => Ok(Self::empty(rubric)),
        }
    }

    /// Load golden cases from a JSONL file. Blank lines are skipped.
    pub fn from_dataset(path: &Path, rubric: &RubricSpec) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read grader dataset: {}", path.display()))?;

        let mut cases = HashMap::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let case: GoldenCase = serde_json::from_str(line).with_context(|| {
                format!("Bad dataset line {} in {}", lineno + 1, path.display())
            })?;
            cases.insert(hash_normalized(&case.input), case);
        }

        Ok(Self {
            rubric: rubric.clone(),
            cases,
        })
    }

    /// Build a verdict payload with one score per criterion plus feedback.
    fn verdict(&self, scores: [u8; CRITERION_COUNT], feedback: String) -> Value {
        let mut map = serde_json::Map::new();
        for (name, score) in self.rubric.criteria.iter().zip(scores) {
            map.insert(name.clone(), Value::from(score));
        }
        map.insert("feedback".to_string(), Value::from(feedback));
        Value::Object(map)
    }
}

#[async_trait]
impl Grader for ScriptedGrader {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn evaluate(
        &self,
        submission: &Submission,
        _diagnostics: &DiagnosticContext,
    ) -> Result<Value> {
        let top = self.rubric.max_score;

        if submission.code.contains(MAGIC_PASS_TOKEN) {
            return Ok(self.verdict(
                [top; CRITERION_COUNT],
                "[scripted] Magic pass token detected. Perfect score.".to_string(),
            ));
        }

        if let Some(case) = self.cases.get(&hash_normalized(&submission.code)) {
            // Map the 0-100 expected score onto the per-criterion scale.
            let component = (case.expected_score / 20).clamp(1, i64::from(top)) as u8;
            return Ok(self.verdict(
                [component; CRITERION_COUNT],
                format!("[scripted] Dataset match for case {}.", case.id),
            ));
        }

        Ok(self.verdict(
            [3, 3, 2],
            "[scripted] Unknown submission. Generic fallback grade.".to_string(),
        ))
    }
}

/// Hash code with whitespace runs collapsed, so formatting-only edits
/// still hit the same golden case.
fn hash_normalized(code: &str) -> String {
    let normalized = code.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_ignores_whitespace_layout() {
        assert_eq!(
            hash_normalized("def f():\n    return 1"),
            hash_normalized("def f(): return 1")
        );
        assert_eq!(hash_normalized("  a  b  "), hash_normalized("a b"));
        assert_ne!(hash_normalized("a b"), hash_normalized("ab"));
    }

    #[test]
    fn test_golden_case_defaults() {
        let case: GoldenCase = serde_json::from_str(r#"{"input": "x = 1"}"#).unwrap();
        assert_eq!(case.id, "");
        assert_eq!(case.expected_score, 50);
    }

    #[test]
    fn test_verdict_keys_follow_rubric() {
        let rubric = RubricSpec::default();
        let grader = ScriptedGrader::empty(&rubric);
        let verdict = grader.verdict([5, 4, 3], "ok".to_string());

        assert_eq!(verdict["coverage"], 5);
        assert_eq!(verdict["correctness"], 4);
        assert_eq!(verdict["clarity"], 3);
        assert_eq!(verdict["feedback"], "ok");
    }
}
