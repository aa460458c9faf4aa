//! Configuration management

use crate::async_utils::RetryConfig;
use crate::error::{RadarError, RadarResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub github: GitHubConfig,
    pub openalex: OpenAlexConfig,
    pub pipeline: PipelineConfig,
    pub audit: AuditConfig,
}

/// LLM configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// openrouter, openai, anthropic, groq or ollama
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// LLM calls in flight across the whole run
    pub max_concurrent_requests: usize,
    /// Minimum spacing between two LLM calls
    pub min_interval_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            model: "openai/gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.2,
            max_tokens: 4000,
            timeout_secs: 120,
            max_concurrent_requests: 4,
            min_interval_ms: 0,
        }
    }
}

/// Web search / extraction provider (Tavily) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    /// "basic" or "advanced"
    pub search_depth: String,
    pub max_results: u32,
    /// Fall back to a search query when extraction returns nothing for a URL
    pub search_fallback: bool,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.tavily.com".to_string(),
            search_depth: "advanced".to_string(),
            max_results: 5,
            search_fallback: true,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub base_url: String,
    pub user_agent: String,
    /// Number of top repositories (by stars) to include
    pub max_repos: usize,
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: "https://api.github.com".to_string(),
            user_agent: "radar/0.1".to_string(),
            max_repos: 10,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAlexConfig {
    pub base_url: String,
    /// Contact address for the polite pool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailto: Option<String>,
    /// Author candidates requested from the search endpoint
    pub candidates: usize,
    pub timeout_secs: u64,
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openalex.org".to_string(),
            mailto: None,
            candidates: 5,
            timeout_secs: 30,
        }
    }
}

/// Concurrency, timeout and retry knobs of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_concurrent_founders: usize,
    /// Concurrent source tasks within one founder
    pub max_concurrent_sources: usize,
    pub source_timeout_secs: u64,
    /// Overall research budget per founder; unset means no deadline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub founder_deadline_secs: Option<u64>,
    /// Skip the assessment LLM calls when the dossier is empty
    pub skip_assessment_on_empty_dossier: bool,
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_founders: 5,
            max_concurrent_sources: 4,
            source_timeout_secs: 45,
            founder_deadline_secs: None,
            skip_assessment_on_empty_dossier: false,
            retry: RetryConfig::default(),
        }
    }
}

/// Raw LLM exchange log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Providers the LLM client can be built for
pub const LLM_PROVIDERS: &[&str] = &["openrouter", "openai", "anthropic", "groq", "ollama"];

/// Upper bound for every timeout and deadline setting (one day)
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

fn invalid(message: &str, suggestion: &str) -> RadarError {
    RadarError::Config {
        message: message.to_string(),
        source: None,
        context: crate::ErrorContext::new("config")
            .with_operation("validate")
            .with_suggestion(suggestion),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl RadarConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> RadarResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RadarError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: RadarConfig = toml::from_str(&content).map_err(|e| RadarError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> RadarResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| RadarError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| RadarError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Fill unset credentials from environment variables.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`; values already present in the
    /// file win.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if non_empty(self.llm.api_key.clone()).is_none() {
            self.llm.api_key = ["LLM_API_KEY", "OPENROUTER_API_KEY", "OPENAI_API_KEY"]
                .iter()
                .find_map(|key| non_empty(lookup(key)));
        }
        if non_empty(self.search.api_key.clone()).is_none() {
            self.search.api_key = non_empty(lookup("TAVILY_API_KEY"));
        }
        if non_empty(self.github.token.clone()).is_none() {
            self.github.token = non_empty(lookup("GITHUB_TOKEN"));
        }
        if non_empty(self.openalex.mailto.clone()).is_none() {
            self.openalex.mailto = non_empty(lookup("OPENALEX_MAILTO"));
        }
        if let Some(model) = non_empty(lookup("LLM_MODEL")) {
            self.llm.model = model;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> RadarResult<()> {
        if !LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(invalid(
                &format!("Unknown LLM provider '{}'", self.llm.provider),
                "Supported providers: openrouter, openai, anthropic, groq, ollama",
            ));
        }

        if self.llm.model.trim().is_empty() {
            return Err(invalid(
                "LLM model must not be empty",
                "Set llm.model to a model identifier",
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(invalid(
                "LLM max_tokens must be greater than 0",
                "Set llm.max_tokens to a positive value",
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid(
                "LLM temperature must be between 0.0 and 2.0",
                "Set llm.temperature to a value in [0.0, 2.0]",
            ));
        }

        if self.pipeline.max_concurrent_founders == 0
            || self.pipeline.max_concurrent_sources == 0
            || self.llm.max_concurrent_requests == 0
        {
            return Err(invalid(
                "Concurrency limits must be greater than 0",
                "Set the max_concurrent_* settings to positive values",
            ));
        }

        let timeouts = [
            self.pipeline.source_timeout_secs,
            self.llm.timeout_secs,
            self.search.timeout_secs,
            self.github.timeout_secs,
            self.openalex.timeout_secs,
        ];
        if timeouts.iter().any(|&secs| secs == 0 || secs > MAX_TIMEOUT_SECS) {
            return Err(invalid(
                &format!("Timeouts must be between 1 and {} seconds", MAX_TIMEOUT_SECS),
                "Check the timeout_secs settings of every section",
            ));
        }

        if let Some(deadline) = self.pipeline.founder_deadline_secs {
            if deadline == 0 || deadline > MAX_TIMEOUT_SECS {
                return Err(invalid(
                    &format!(
                        "Founder deadline must be between 1 and {} seconds when set",
                        MAX_TIMEOUT_SECS
                    ),
                    "Remove pipeline.founder_deadline_secs or set a positive value",
                ));
            }
        }

        if !matches!(self.search.search_depth.as_str(), "basic" | "advanced") {
            return Err(invalid(
                "search.search_depth must be 'basic' or 'advanced'",
                "Set search.search_depth to 'basic' or 'advanced'",
            ));
        }

        if self.audit.enabled && self.audit.path.is_none() {
            return Err(invalid(
                "Audit log is enabled but no path is configured",
                "Set audit.path or disable the audit log",
            ));
        }

        Ok(())
    }
}
