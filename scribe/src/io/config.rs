//! Writer configuration (`scribe.toml`) and process credentials.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::guardrail::DEFAULT_WORD_LIMIT;
use crate::core::types::ExhaustionPolicy;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "scribe.toml";

const DEFAULT_DESCRIPTION: &str = "Write a super DETAILED blog post about {{ topic }} for {{ year }}";

const DEFAULT_EXPECTED_OUTPUT: &str = "A properly structured blog post under 100 words.
Blog format:
# Title
## Subtitle
Paragraphs...";

/// Writer configuration (TOML).
///
/// Every field is optional in the file; missing fields take the defaults
/// below, which reproduce the stock blog-writing setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScribeConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub agent: AgentConfig,
    pub task: TaskConfig,
    pub guardrail: GuardrailConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// Chat-completions base URL. `OPENAI_BASE_URL` takes precedence.
    pub base_url: String,
    pub temperature: Option<f32>,
    pub request_timeout_secs: u64,
    /// Tool-call round trips allowed per attempt before tools are withdrawn.
    pub max_tool_rounds: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: None,
            request_timeout_secs: 120,
            max_tool_rounds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// Organic results requested per query.
    pub results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://google.serper.dev/search".to_string(),
            results: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            role: "Blog Writer".to_string(),
            goal: "Write blog post".to_string(),
            backstory: "An expert blog writer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TaskConfig {
    /// minijinja template; must reference exactly `topic` and `year`.
    pub description: String,
    pub expected_output: String,
    /// Total generation attempts before the exhaustion policy applies.
    pub max_attempts: u32,
    pub exhaustion_policy: ExhaustionPolicy,
    /// Wall-clock budget for the whole run; unbounded when absent.
    pub run_timeout_secs: Option<u64>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            description: DEFAULT_DESCRIPTION.to_string(),
            expected_output: DEFAULT_EXPECTED_OUTPUT.to_string(),
            max_attempts: 4,
            exhaustion_policy: ExhaustionPolicy::FailOpen,
            run_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GuardrailConfig {
    pub word_limit: usize,
    pub require_title: bool,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            word_limit: DEFAULT_WORD_LIMIT,
            require_title: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    /// Emit ANSI styling even when stdout is not a terminal.
    pub force_color: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { force_color: true }
    }
}

impl ScribeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(anyhow!("llm.model must be non-empty"));
        }
        if self.llm.request_timeout_secs == 0 {
            return Err(anyhow!("llm.request_timeout_secs must be > 0"));
        }
        if self.search.enabled && self.search.results == 0 {
            return Err(anyhow!("search.results must be > 0"));
        }
        if self.task.description.trim().is_empty() {
            return Err(anyhow!("task.description must be non-empty"));
        }
        if self.task.max_attempts == 0 {
            return Err(anyhow!("task.max_attempts must be > 0"));
        }
        if self.task.run_timeout_secs == Some(0) {
            return Err(anyhow!("task.run_timeout_secs must be > 0 when set"));
        }
        if self.guardrail.word_limit == 0 {
            return Err(anyhow!("guardrail.word_limit must be > 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.request_timeout_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.task.run_timeout_secs.map(Duration::from_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ScribeConfig::default()`.
pub fn load_config(path: &Path) -> Result<ScribeConfig> {
    if !path.exists() {
        let cfg = ScribeConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ScribeConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// API credentials, read once at startup and passed to client constructors.
///
/// Missing keys are carried as `None`; the collaborator that needs the key
/// reports the failure when it is first used.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub serper_api_key: Option<String>,
    pub openai_base_url: Option<String>,
}

impl Credentials {
    /// Read credentials through `lookup` (normally `std::env::var`).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            openai_api_key: read("OPENAI_API_KEY"),
            serper_api_key: read("SERPER_API_KEY"),
            openai_base_url: read("OPENAI_BASE_URL"),
        }
    }

    /// Load `.env` (if present) and read credentials from the process environment.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |value: &Option<String>| value.as_ref().map(|_| "<set>");
        f.debug_struct("Credentials")
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("serper_api_key", &mask(&self.serper_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .finish()
    }
}
