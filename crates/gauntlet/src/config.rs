use anyhow::{Context, Result};
use gauntlet_core::policy::HintPolicy;
use gauntlet_core::rubric::RubricSpec;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub grader: GraderConfig,
    #[serde(default)]
    pub rubric: RubricSpec,
    #[serde(default)]
    pub hints: HintPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraderConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL for self-hosted judges (ollama).
    #[serde(default)]
    pub url: Option<String>,
    /// Golden dataset for the scripted grader, JSONL.
    #[serde(default)]
    pub dataset: Option<PathBuf>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            url: None,
            dataset: None,
            max_retries: 2,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    2
}
fn default_timeout_secs() -> u64 {
    30
}

impl GraderConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate rubric
    if config.rubric.max_score == 0 {
        anyhow::bail!("rubric.max_score must be > 0");
    }

    if config.rubric.feedback_cap == 0 {
        anyhow::bail!("rubric.feedback_cap must be > 0");
    }

    // Validate hints
    if config.hints.thresholds.is_empty() {
        anyhow::bail!("hints.thresholds must not be empty");
    }

    if config.hints.thresholds.first() == Some(&0) {
        anyhow::bail!("hints.thresholds must start at 1 or higher");
    }

    if config.hints.thresholds.windows(2).any(|w| w[0] >= w[1]) {
        anyhow::bail!("hints.thresholds must be strictly increasing");
    }

    // Validate grader
    match config.grader.provider.as_str() {
        "disabled" | "openai" | "ollama" | "scripted" => {}
        other => anyhow::bail!(
            "Unknown grader provider: '{}'. Must be disabled, openai, ollama, or scripted.",
            other
        ),
    }

    if matches!(config.grader.provider.as_str(), "openai" | "ollama")
        && config.grader.model.is_none()
    {
        anyhow::bail!(
            "grader.model must be specified when provider is '{}'",
            config.grader.provider
        );
    }

    if config.grader.is_enabled() && config.grader.timeout_secs == 0 {
        anyhow::bail!("grader.timeout_secs must be > 0");
    }

    Ok(config)
}
