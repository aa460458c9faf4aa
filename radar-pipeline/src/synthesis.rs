//! Team synergy and showcase report synthesis

use crate::audit::AuditLog;
use crate::error::PipelineResult;
use crate::prompts;
use radar_core::performance::measure_async;
use radar_core::{
    panic_message, AggregateScores, FinalReport, FounderAssessment, InterviewTranscript, ShowcaseReport,
    StageOutput, SynergyAnalysis,
};
use radar_sources::LlmGateway;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Failure recorded when synergy has nothing to work with
pub const NO_ASSESSMENTS: &str = "no founder assessments available";

/// Two sequential LLM calls over the whole team
pub struct SynthesisStage {
    llm: Arc<LlmGateway>,
}

impl SynthesisStage {
    pub fn new(llm: Arc<LlmGateway>) -> Self {
        Self { llm }
    }

    pub async fn synthesize(
        &self,
        startup_name: Option<&str>,
        assessments: &[FounderAssessment],
        interviews: &[InterviewTranscript],
        audit: &AuditLog,
    ) -> FinalReport {
        let aggregate_scores = AggregateScores::from_assessments(assessments);

        let synergy_analysis = if assessments.is_empty() {
            warn!("No founder assessments, skipping synergy analysis");
            StageOutput::failed(NO_ASSESSMENTS)
        } else {
            measure_async(
                "synergy_analysis",
                self.call::<SynergyAnalysis>(
                    "Synthesis/synergy",
                    prompts::SYNERGY_SYSTEM_PROMPT,
                    prompts::synergy_prompt(startup_name, assessments),
                    audit,
                ),
            )
            .await
        };

        let showcase_report = measure_async(
            "showcase_report",
            self.call::<ShowcaseReport>(
                "Synthesis/showcase",
                prompts::SHOWCASE_SYSTEM_PROMPT,
                prompts::showcase_prompt(
                    startup_name,
                    assessments,
                    &synergy_analysis,
                    &aggregate_scores,
                    interviews,
                ),
                audit,
            ),
        )
        .await;

        info!(
            founders = assessments.len(),
            synergy_ready = synergy_analysis.is_ready(),
            showcase_ready = showcase_report.is_ready(),
            "Team synthesis finished"
        );

        FinalReport {
            synergy_analysis,
            showcase_report,
            aggregate_scores,
        }
    }

    /// One LLM call on its own task, so a panicking model fails the stage only
    async fn call<T>(
        &self,
        stage: &str,
        system_prompt: &'static str,
        user_prompt: PipelineResult<String>,
        audit: &AuditLog,
    ) -> StageOutput<T>
    where
        T: DeserializeOwned + Serialize + Send + 'static,
    {
        let user_prompt = match user_prompt {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(stage = stage, error = %e, "Could not build synthesis prompt");
                return StageOutput::failed(e.to_string());
            }
        };

        let llm = Arc::clone(&self.llm);
        let task = tokio::spawn(async move {
            llm.complete_json::<T>(system_prompt, &user_prompt).await
        });
        let completion = match task.await {
            Ok(completion) => completion,
            Err(join_error) => {
                let message = format!("{} task panicked: {}", stage, panic_message(join_error));
                error!(stage = stage, error = %message, "Synthesis stage crashed");
                audit.record(stage, None, serde_json::json!({ "error": message }));
                return StageOutput::failed(message);
            }
        };

        audit.record(
            stage,
            None,
            serde_json::json!({
                "raw": completion.raw,
                "output": serde_json::to_value(&completion.output).unwrap_or_default(),
            }),
        );

        if let Some(error) = completion.output.error() {
            warn!(stage = stage, error = error, "Synthesis stage failed");
        }
        completion.output
    }
}
