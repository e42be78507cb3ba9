//! Grading backends.
//!
//! Implements the [`Grader`] trait for each supported provider:
//! - [`DisabledGrader`]: always errors; the coordinator turns that into a zero-score verdict.
//! - [`OpenAiGrader`]: asks an OpenAI chat model to judge the submission.
//! - [`OllamaGrader`]: same judge prompt against a local Ollama instance.
//! - [`ScriptedGrader`]: deterministic verdicts from a golden dataset, for tests and offline use.
//!
//! All backends return the raw verdict JSON; rubric validation happens
//! in the grading coordinator, so a judge that returns garbage degrades
//! to zero scores instead of an error.
//!
//! # Provider Selection
//!
//! Use [`create_grader`] to instantiate the appropriate backend based
//! on the configuration.
//!
//! # Retry Strategy
//!
//! The OpenAI and Ollama graders use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error): retry
//! - HTTP 4xx (client error, not 429): fail immediately
//! - Network errors: retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

mod scripted;

pub use scripted::{ScriptedGrader, MAGIC_PASS_TOKEN};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use gauntlet_core::grader::Grader;
use gauntlet_core::models::{DiagnosticContext, Submission};
use gauntlet_core::rubric::RubricSpec;

use crate::config::GraderConfig;

/// Build the judge prompt for a submission.
///
/// Lists the rubric criteria, folds in carry-over diagnostic context,
/// and pins the reply to a bare JSON object keyed by criterion name.
pub fn judge_prompt(
    rubric: &RubricSpec,
    submission: &Submission,
    diagnostics: &DiagnosticContext,
) -> String {
    let [c0, c1, c2] = &rubric.criteria;

    format!(
        "You are the judge of a coding boss encounter.\n\
         Score the submission on each criterion with an integer from 0 to {max}:\n\
         - {c0}\n\
         - {c1}\n\
         - {c2}\n\
         \n\
         Issue under attack: {issue}\n\
         Suggested next step: {next_step}\n\
         Language: {language}\n\
         \n\
         Submission:\n\
         {code}\n\
         \n\
         Player explanation: {explanation}\n\
         \n\
         Return ONLY a JSON object shaped like\n\
         {{\"{c0}\": 0, \"{c1}\": 0, \"{c2}\": 0, \"feedback\": \"one or two sentences\"}}",
        max = rubric.max_score,
        c0 = c0,
        c1 = c1,
        c2 = c2,
        issue = diagnostics.issue_summary.as_deref().unwrap_or("none"),
        next_step = diagnostics.next_step.as_deref().unwrap_or("none"),
        language = diagnostics.language_hint.as_deref().unwrap_or("unknown"),
        code = submission.code,
        explanation = submission.explanation.as_deref().unwrap_or("(none given)"),
    )
}

// ============ Disabled Grader ============

/// A no-op grader that always errors.
///
/// Used when `grader.provider = "disabled"` in the configuration. The
/// grading coordinator converts the error into a zero-score verdict, so
/// encounters still resolve instead of wedging the session.
pub struct DisabledGrader;

#[async_trait]
impl Grader for DisabledGrader {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn evaluate(
        &self,
        _submission: &Submission,
        _diagnostics: &DiagnosticContext,
    ) -> Result<Value> {
        bail!("Grader is disabled")
    }
}

// ============ OpenAI Judge ============

/// Judge backed by the OpenAI chat completions API.
///
/// Calls `POST /v1/chat/completions` with the configured model and asks
/// for a strict-JSON verdict via `response_format: json_object`.
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAiGrader {
    model: String,
    rubric: RubricSpec,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiGrader {
    /// Create a new OpenAI judge from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` is not set in config, or if
    /// `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &GraderConfig, rubric: &RubricSpec) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("grader.model required for OpenAI grader"))?;

        // Verify API key is available
        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        Ok(Self {
            model,
            rubric: rubric.clone(),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Grader for OpenAiGrader {
    fn name(&self) -> &str {
        "openai"
    }

    async fn evaluate(
        &self,
        submission: &Submission,
        diagnostics: &DiagnosticContext,
    ) -> Result<Value> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let prompt = judge_prompt(&self.rubric, submission, diagnostics);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You grade coding submissions. Respond with strict JSON only."},
                {"role": "user", "content": prompt},
            ],
            "response_format": {"type": "json_object"},
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await?;
                        return parse_openai_verdict(&json);
                    }

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "OpenAI API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429): don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Grading failed after retries")))
    }
}

/// Extract the verdict from an OpenAI chat completions response.
fn parse_openai_verdict(json: &Value) -> Result<Value> {
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))?;

    parse_verdict_text(content)
}

// ============ Ollama Judge ============

/// Judge backed by a local Ollama instance.
///
/// Calls `POST /api/chat` on the configured URL (default: `http://localhost:11434`)
/// with `stream: false` and `format: "json"` so the model replies with a
/// bare JSON verdict. Requires Ollama to be running with the configured
/// model pulled.
pub struct OllamaGrader {
    model: String,
    url: String,
    rubric: RubricSpec,
    max_retries: u32,
    timeout_secs: u64,
}

impl OllamaGrader {
    pub fn new(config: &GraderConfig, rubric: &RubricSpec) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("grader.model required for Ollama grader"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(Self {
            model,
            url,
            rubric: rubric.clone(),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Grader for OllamaGrader {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn evaluate(
        &self,
        submission: &Submission,
        diagnostics: &DiagnosticContext,
    ) -> Result<Value> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let prompt = judge_prompt(&self.rubric, submission, diagnostics);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You grade coding submissions. Respond with strict JSON only."},
                {"role": "user", "content": prompt},
            ],
            "stream": false,
            "format": "json",
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(format!("{}/api/chat", self.url))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await?;
                        return parse_ollama_verdict(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Ollama API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Ollama API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(anyhow::anyhow!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url,
                        e
                    ));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Grading failed after retries")))
    }
}

/// Extract the verdict from an Ollama chat response.
fn parse_ollama_verdict(json: &Value) -> Result<Value> {
    let content = json
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message content"))?;

    parse_verdict_text(content)
}

/// Parse judge output into JSON, tolerating a markdown code fence.
fn parse_verdict_text(text: &str) -> Result<Value> {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .map(|t| t.strip_suffix("```").unwrap_or(t))
        .unwrap_or(text)
        .trim();

    serde_json::from_str(text)
        .map_err(|e| anyhow::anyhow!("Judge returned non-JSON verdict: {}", e))
}

/// Create the appropriate [`Grader`] based on configuration.
///
/// # Supported Providers
///
/// | Config Value | Grader |
/// |-------------|--------|
/// | `"disabled"` | [`DisabledGrader`] |
/// | `"openai"` | [`OpenAiGrader`] |
/// | `"ollama"` | [`OllamaGrader`] |
/// | `"scripted"` | [`ScriptedGrader`] |
///
/// # Errors
///
/// Returns an error for unknown provider names or if the grader cannot
/// be initialized (missing model, API key, or dataset file).
pub fn create_grader(config: &GraderConfig, rubric: &RubricSpec) -> Result<Box<dyn Grader>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGrader)),
        "openai" => Ok(Box::new(OpenAiGrader::new(config, rubric)?)),
        "ollama" => Ok(Box::new(OllamaGrader::new(config, rubric)?)),
        "scripted" => Ok(Box::new(ScriptedGrader::from_config(config, rubric)?)),
        other => bail!("Unknown grader provider: {}", other),
    }
}
