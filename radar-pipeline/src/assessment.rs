//! Role-conditional assessment of one founder's dossier

use crate::audit::AuditLog;
use crate::error::PipelineResult;
use crate::prompts;
use radar_core::{
    Assessment, BusinessAssessment, Dossier, Founder, StageOutput, TechnicalAssessment, Track,
};
use radar_sources::LlmGateway;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// One structured LLM call per track
pub struct AssessmentStage {
    llm: Arc<LlmGateway>,
}

impl AssessmentStage {
    pub fn new(llm: Arc<LlmGateway>) -> Self {
        Self { llm }
    }

    /// Assess every track the founder's role calls for. Tracks run concurrently and a
    /// failed track never affects the other one.
    pub async fn assess(&self, founder: &Founder, dossier: &Dossier, audit: &AuditLog) -> Assessment {
        let tracks = founder.role.tracks();

        let technical = async {
            if tracks.contains(&Track::Technical) {
                Some(
                    self.run_track::<TechnicalAssessment>(
                        Track::Technical,
                        founder,
                        prompts::TECHNICAL_SYSTEM_PROMPT,
                        prompts::technical_prompt(founder, dossier),
                        audit,
                    )
                    .await,
                )
            } else {
                None
            }
        };
        let business = async {
            if tracks.contains(&Track::Business) {
                Some(
                    self.run_track::<BusinessAssessment>(
                        Track::Business,
                        founder,
                        prompts::BUSINESS_SYSTEM_PROMPT,
                        prompts::business_prompt(founder, dossier),
                        audit,
                    )
                    .await,
                )
            } else {
                None
            }
        };

        let (technical, business) = tokio::join!(technical, business);
        Assessment {
            technical,
            business,
        }
    }

    async fn run_track<T: DeserializeOwned + Serialize>(
        &self,
        track: Track,
        founder: &Founder,
        system_prompt: &str,
        user_prompt: PipelineResult<String>,
        audit: &AuditLog,
    ) -> StageOutput<T> {
        let stage = format!("Assessment/{}", track);

        let user_prompt = match user_prompt {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(founder = %founder.name, track = %track, error = %e, "Could not build assessment prompt");
                return StageOutput::failed(e.to_string());
            }
        };

        debug!(founder = %founder.name, track = %track, "Running assessment track");
        let completion = self
            .llm
            .complete_json::<T>(system_prompt, &user_prompt)
            .await;

        audit.record(
            &stage,
            Some(&founder.name),
            serde_json::json!({
                "raw": completion.raw,
                "output": serde_json::to_value(&completion.output).unwrap_or_default(),
            }),
        );

        if let Some(error) = completion.output.error() {
            warn!(founder = %founder.name, track = %track, error = error, "Assessment track failed");
        }
        completion.output
    }
}
