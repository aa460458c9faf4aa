//! Offline source clients and chat model for pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use radar_core::{
    source_error, ErrorContext, LlmConfig, PipelineConfig, RadarConfig, RadarError, RadarResult,
    RetryConfig, SourceKind, SourcePayload,
};
use radar_pipeline::{
    prompts::{
        BUSINESS_SYSTEM_PROMPT, SHOWCASE_SYSTEM_PROMPT, SYNERGY_SYSTEM_PROMPT,
        TECHNICAL_SYSTEM_PROMPT,
    },
    SourceRegistry, TeamOrchestrator,
};
use radar_sources::{BatchResults, ChatModel, LlmGateway, SourceClient, SourceRequest};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TECHNICAL_REPLY: &str = r#"```json
{
  "scores": {
    "academic_impact_score": { "value": 8, "grade": "B+", "note": "h-index of 12" },
    "engineering_influence_score": { "value": "7/10", "grade": "B", "note": "popular repositories" }
  },
  "summary": { "domain_expertise": "Machine learning", "impact_assessment": "Strong research output" }
}
```"#;

pub const BUSINESS_REPLY: &str = r#"{
  "scores": {
    "founder_experience_score": { "value": 9, "grade": "A-", "note": "Founded a company before" },
    "career_progression_score": { "value": 6, "grade": "C+", "note": "Steady progression" }
  },
  "summary": { "core_competency": "Sales", "execution_capability_assessment": "Has shipped before" }
}"#;

pub const SYNERGY_REPLY: &str = r#"{
  "team_balance_assessment": "Balanced technical and business skills",
  "collective_strengths": ["Deep ML expertise", "Commercial experience"],
  "identified_gaps": ["No marketing lead"],
  "overall_potential": { "grade": "B", "justification": "Solid but incomplete team" }
}"#;

pub const SHOWCASE_REPLY: &str = r#"Here is the report:
{
  "team_overall_grade": "B",
  "executive_summary": "A technical core with a commercial counterpart.",
  "key_risks": ["No marketing lead"],
  "founder_highlights": [ { "name": "Ada", "highlight": "Strong researcher", "score": "strong" } ]
}"#;

/// Marker that makes the scripted model answer with something unparseable
pub const GARBLE_MARKER: &str = "GARBLE-ME";

/// Marker that makes the scripted model panic while writing the synergy analysis
pub const SYNERGY_CRASH_MARKER: &str = "CRASH-SYNERGY";

/// Chat model answering from canned replies, keyed by system prompt
#[derive(Default)]
pub struct ScriptedModel {
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// User prompts sent with the given system prompt
    pub fn prompts_for(&self, system_prompt: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(system, _)| system == system_prompt)
            .map(|(_, user)| user)
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn describe(&self) -> String {
        "test/scripted".to_string()
    }

    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> RadarResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        if system_prompt == SYNERGY_SYSTEM_PROMPT && user_prompt.contains(SYNERGY_CRASH_MARKER) {
            panic!("synergy model crashed");
        }
        if user_prompt.contains(GARBLE_MARKER) {
            return Ok("I cannot comply".to_string());
        }

        let reply = match system_prompt {
            TECHNICAL_SYSTEM_PROMPT => TECHNICAL_REPLY,
            BUSINESS_SYSTEM_PROMPT => BUSINESS_REPLY,
            SYNERGY_SYSTEM_PROMPT => SYNERGY_REPLY,
            SHOWCASE_SYSTEM_PROMPT => SHOWCASE_REPLY,
            other => {
                return Err(RadarError::internal(
                    format!("unexpected system prompt: {}", other),
                    "scripted_model",
                ))
            }
        };
        Ok(reply.to_string())
    }
}

/// Source answering with a line of text per identifier
///
/// Identifiers containing `broken` fail, identifiers containing `slow` never answer in
/// time, and academic lookups for a founder named `Panicky` panic.
pub struct FakeSource {
    name: String,
    batching: bool,
    pub calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            batching: false,
            calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        })
    }

    pub fn batching(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            batching: true,
            calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        })
    }

    fn answer(&self, request: &SourceRequest) -> RadarResult<SourcePayload> {
        if request.identifier.contains("broken") {
            return Err(RadarError::Network {
                message: "connection refused".to_string(),
                source: None,
                context: ErrorContext::new("fake_source"),
            });
        }
        Ok(SourcePayload::Text(format!(
            "{} profile of {} at {}",
            self.name, request.founder_name, request.identifier
        )))
    }
}

#[async_trait]
impl SourceClient for FakeSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, request: &SourceRequest) -> RadarResult<SourcePayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if request.kind == SourceKind::Academic && request.founder_name == "Panicky" {
            panic!("academic lookup exploded for {}", request.founder_name);
        }
        if request.identifier.contains("slow") {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.answer(request)
    }

    fn supports_batch(&self) -> bool {
        self.batching
    }

    async fn fetch_batch(&self, requests: &[SourceRequest]) -> RadarResult<BatchResults> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);

        let mut results = HashMap::new();
        for request in requests {
            if request.identifier.contains("missing") {
                continue;
            }
            if request.identifier.contains("unmatched") {
                results.insert(
                    request.identifier.clone(),
                    Err(source_error!(
                        self.name(),
                        request.identifier,
                        "content extraction failed for this specific URL"
                    )),
                );
                continue;
            }
            results.insert(request.identifier.clone(), self.answer(request));
        }
        Ok(results)
    }
}

pub struct Harness {
    pub orchestrator: TeamOrchestrator,
    pub model: Arc<ScriptedModel>,
    pub web: Arc<FakeSource>,
    pub github: Arc<FakeSource>,
    pub academic: Arc<FakeSource>,
}

pub fn test_config() -> RadarConfig {
    RadarConfig {
        llm: LlmConfig {
            timeout_secs: 5,
            ..LlmConfig::default()
        },
        pipeline: PipelineConfig {
            source_timeout_secs: 5,
            retry: RetryConfig::none(),
            ..PipelineConfig::default()
        },
        ..RadarConfig::default()
    }
}

pub fn registry(
    web: &Arc<FakeSource>,
    github: &Arc<FakeSource>,
    academic: &Arc<FakeSource>,
) -> SourceRegistry {
    SourceRegistry::new()
        .with(SourceKind::LinkedIn, web.clone())
        .with(SourceKind::Web, web.clone())
        .with(SourceKind::GitHub, github.clone())
        .with(SourceKind::Academic, academic.clone())
}

pub fn harness_with(config: RadarConfig) -> Harness {
    let model = ScriptedModel::new();
    let web = FakeSource::batching("Tavily");
    let github = FakeSource::new("GitHub");
    let academic = FakeSource::new("OpenAlex");

    let llm = Arc::new(LlmGateway::new(model.clone(), &config.llm));
    let orchestrator = TeamOrchestrator::new(config, registry(&web, &github, &academic), llm);

    Harness {
        orchestrator,
        model,
        web,
        github,
        academic,
    }
}

pub fn harness() -> Harness {
    harness_with(test_config())
}
