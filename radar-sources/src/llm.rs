//! LLM chat client using siumai
//!
//! [`ChatModel`] is the seam the pipeline talks to; [`SiumaiChatModel`] implements it for
//! the supported providers. [`LlmGateway`] adds rate limiting, a timeout, caller-side retry
//! and typed JSON parsing on top of any model.

use async_trait::async_trait;
use radar_core::{
    config_error, retry_async, with_timeout, ErrorContext, LlmConfig, RadarError, RadarResult,
    RateLimiter, RetryConfig, StageOutput,
};
use serde::de::DeserializeOwned;
use siumai::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const COMPONENT: &str = "llm_client";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// A chat completion backend
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// `provider/model` label for logs
    fn describe(&self) -> String;

    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> RadarResult<String>;
}

/// Chat model backed by a siumai client
pub struct SiumaiChatModel {
    client: Box<dyn LlmClient>,
    provider: String,
    model: String,
}

impl SiumaiChatModel {
    pub async fn new(config: &LlmConfig) -> RadarResult<Self> {
        let client = Self::build_client(config).await?;

        info!(
            "Created LLM client for provider: {} with model: {}",
            config.provider, config.model
        );

        Ok(Self {
            client,
            provider: config.provider.clone(),
            model: config.model.clone(),
        })
    }

    fn api_key(config: &LlmConfig) -> RadarResult<String> {
        config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                config_error!(
                    format!("API key for LLM provider '{}' not configured", config.provider),
                    COMPONENT
                )
            })
    }

    fn build_error(config: &LlmConfig, error: impl std::fmt::Display) -> RadarError {
        RadarError::Llm {
            message: format!("Failed to build {} client: {}", config.provider, error),
            provider: Some(config.provider.clone()),
            model: Some(config.model.clone()),
            context: ErrorContext::new(COMPONENT).with_operation("build_client"),
        }
    }

    /// Build the appropriate siumai client based on configuration
    async fn build_client(config: &LlmConfig) -> RadarResult<Box<dyn LlmClient>> {
        match config.provider.as_str() {
            "openai" | "openrouter" => {
                let api_key = Self::api_key(config)?;

                let mut builder = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature)
                    .max_tokens(config.max_tokens);

                let base_url = config.base_url.clone().or_else(|| {
                    (config.provider == "openrouter").then(|| OPENROUTER_BASE_URL.to_string())
                });
                if let Some(base_url) = &base_url {
                    builder = builder.base_url(base_url);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| Self::build_error(config, e))?;

                Ok(Box::new(client))
            }
            "anthropic" => {
                let api_key = Self::api_key(config)?;

                let client = LlmBuilder::new()
                    .anthropic()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature)
                    .max_tokens(config.max_tokens)
                    .build()
                    .await
                    .map_err(|e| Self::build_error(config, e))?;

                Ok(Box::new(client))
            }
            "groq" => {
                let api_key = Self::api_key(config)?;

                let client = LlmBuilder::new()
                    .groq()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature)
                    .max_tokens(config.max_tokens)
                    .build()
                    .await
                    .map_err(|e| Self::build_error(config, e))?;

                Ok(Box::new(client))
            }
            "ollama" => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());

                let client = LlmBuilder::new()
                    .ollama()
                    .model(&config.model)
                    .base_url(&base_url)
                    .temperature(config.temperature)
                    .max_tokens(config.max_tokens)
                    .build()
                    .await
                    .map_err(|e| Self::build_error(config, e))?;

                Ok(Box::new(client))
            }
            provider => Err(config_error!(
                format!("Unsupported LLM provider: {}", provider),
                COMPONENT
            )),
        }
    }
}

#[async_trait]
impl ChatModel for SiumaiChatModel {
    fn describe(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }

    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> RadarResult<String> {
        let messages = vec![system!(system_prompt), user!(user_prompt)];

        let response = self
            .client
            .chat(messages)
            .await
            .map_err(|e| RadarError::Llm {
                message: format!("LLM generation failed: {}", e),
                provider: Some(self.provider.clone()),
                model: Some(self.model.clone()),
                context: ErrorContext::new(COMPONENT).with_operation("chat"),
            })?;

        response
            .content_text()
            .map(|content| content.to_string())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| RadarError::Llm {
                message: "LLM returned empty content".to_string(),
                provider: Some(self.provider.clone()),
                model: Some(self.model.clone()),
                context: ErrorContext::new(COMPONENT).with_operation("chat"),
            })
    }
}

/// Typed result of a JSON completion together with the raw reply, if any
#[derive(Debug, Clone)]
pub struct Completion<T> {
    pub output: StageOutput<T>,
    pub raw: Option<String>,
}

/// The JSON object embedded in a model reply (code fences and chatter around it are ignored)
pub fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Parse a model reply into `T`
pub fn parse_reply<T: DeserializeOwned>(raw: &str) -> RadarResult<T> {
    let json = extract_json(raw).ok_or_else(|| {
        RadarError::malformed("LLM reply contains no JSON object", Some(raw.to_string()), COMPONENT)
    })?;

    serde_json::from_str(json).map_err(|e| {
        RadarError::malformed(
            format!("LLM reply does not match the expected schema: {}", e),
            Some(raw.to_string()),
            COMPONENT,
        )
    })
}

/// Rate-limited, time-bounded access to a chat model
pub struct LlmGateway {
    model: Arc<dyn ChatModel>,
    limiter: RateLimiter,
    timeout_ms: u64,
    retry: RetryConfig,
}

impl LlmGateway {
    pub fn new(model: Arc<dyn ChatModel>, config: &LlmConfig) -> Self {
        Self {
            model,
            limiter: RateLimiter::new(config.max_concurrent_requests, config.min_interval_ms),
            timeout_ms: config.timeout_secs.saturating_mul(1000),
            retry: RetryConfig::none(),
        }
    }

    /// Retry recoverable failures (network, timeout, rate limit)
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn describe(&self) -> String {
        self.model.describe()
    }

    async fn complete_once(&self, system_prompt: &str, user_prompt: &str) -> RadarResult<String> {
        let _guard = self.limiter.acquire().await?;
        with_timeout(
            self.model.chat(system_prompt, user_prompt),
            self.timeout_ms,
            "llm_chat",
        )
        .await?
    }

    /// Plain text completion
    pub async fn complete(&self, system_prompt: &str, user_prompt: &str) -> RadarResult<String> {
        let start = Instant::now();
        let reply = retry_async(
            || self.complete_once(system_prompt, user_prompt),
            &self.retry,
            "llm_chat",
        )
        .await?;

        debug!(
            model = %self.model.describe(),
            duration_ms = start.elapsed().as_millis() as u64,
            chars = reply.len(),
            "LLM reply received"
        );
        Ok(reply)
    }

    /// Completion parsed into `T`; failures become `StageOutput::Failed` instead of errors
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Completion<T> {
        let raw = match self.complete(system_prompt, user_prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                e.log();
                return Completion {
                    output: StageOutput::failed(e.to_string()),
                    raw: None,
                };
            }
        };

        let output = match parse_reply::<T>(&raw) {
            Ok(value) => StageOutput::Ready(value),
            Err(e) => {
                e.log();
                StageOutput::failed(e.to_string())
            }
        };
        Completion {
            output,
            raw: Some(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Grade {
        grade: String,
    }

    struct FixedModel {
        reply: RadarResult<String>,
        calls: AtomicUsize,
    }

    impl FixedModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatModel for FixedModel {
        fn describe(&self) -> String {
            "test/fixed".to_string()
        }

        async fn chat(&self, _system: &str, _user: &str) -> RadarResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(_) => Err(RadarError::Network {
                    message: "connection reset".to_string(),
                    source: None,
                    context: ErrorContext::new("test"),
                }),
            }
        }
    }

    #[test]
    fn test_extract_json_ignores_fences() {
        let raw = "Sure!\n```json\n{\"grade\": \"A\", \"nested\": {\"x\": 1}}\n```";
        assert_eq!(
            extract_json(raw),
            Some("{\"grade\": \"A\", \"nested\": {\"x\": 1}}")
        );
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[tokio::test]
    async fn test_complete_json_parses_reply() {
        let gateway = LlmGateway::new(
            Arc::new(FixedModel::replying("```json\n{\"grade\": \"B\"}\n```")),
            &LlmConfig::default(),
        );

        let completion = gateway.complete_json::<Grade>("system", "user").await;
        assert_eq!(
            completion.output,
            StageOutput::Ready(Grade {
                grade: "B".to_string()
            })
        );
        assert!(completion.raw.is_some());
    }

    #[tokio::test]
    async fn test_huge_timeout_setting_does_not_overflow() {
        let config = LlmConfig {
            timeout_secs: u64::MAX,
            ..LlmConfig::default()
        };
        let gateway = LlmGateway::new(Arc::new(FixedModel::replying("{\"grade\": \"C\"}")), &config);

        assert_eq!(gateway.timeout_ms, u64::MAX);
        let completion = gateway.complete_json::<Grade>("system", "user").await;
        assert!(completion.output.is_ready());
    }

    #[tokio::test]
    async fn test_schema_mismatch_becomes_failed_output() {
        let gateway = LlmGateway::new(
            Arc::new(FixedModel::replying("{\"score\": 3}")),
            &LlmConfig::default(),
        );

        let completion = gateway.complete_json::<Grade>("system", "user").await;
        let error = completion.output.error().unwrap();
        assert!(error.contains("does not match the expected schema"));
        assert_eq!(completion.raw.as_deref(), Some("{\"score\": 3}"));
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried_then_reported() {
        let model = Arc::new(FixedModel {
            reply: Err(radar_core::RadarError::internal("unused", "test")),
            calls: AtomicUsize::new(0),
        });
        let gateway = LlmGateway::new(model.clone(), &LlmConfig::default()).with_retry(
            RetryConfig {
                max_attempts: 2,
                initial_delay_ms: 1,
                max_delay_ms: 1,
                backoff_multiplier: 1.0,
                jitter: false,
            },
        );

        let completion = gateway.complete_json::<Grade>("system", "user").await;
        assert!(completion.output.error().unwrap().contains("connection reset"));
        assert!(completion.raw.is_none());
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }
}
