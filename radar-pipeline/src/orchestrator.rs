//! Team orchestrator: research then assess every founder concurrently, then synthesize
//!
//! `run_team_analysis` always returns a [`TeamAnalysis`]. A founder whose unit fails
//! (including by panicking) is reported in `errors` and left out of synthesis; every
//! other founder is unaffected.

use crate::assessment::AssessmentStage;
use crate::audit::{AuditLog, AuditWriter};
use crate::error::{PipelineFailure, PipelineResult};
use crate::research::{FounderResearchAggregator, SourceRegistry};
use crate::synthesis::SynthesisStage;
use chrono::Utc;
use radar_core::performance::measure_async;
use radar_core::{
    log_operation_start, log_operation_success, process_concurrently, validation_error,
    ComprehensiveData, Founder, FounderAssessment, FounderState, PipelineError, RadarConfig,
    RadarError, RadarResult, TeamAnalysis, TeamInput,
};
use radar_sources::{ChatModel, LlmGateway, SiumaiChatModel};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Runs whose founder progress stays observable, oldest evicted first
const TRACKED_RUNS: usize = 16;

/// Observed state of one founder in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FounderProgress {
    pub founder: String,
    pub state: FounderState,
}

/// Publishes a founder unit's state transitions
#[derive(Debug, Clone)]
struct ProgressHandle {
    founder: String,
    state: Arc<watch::Sender<FounderState>>,
}

impl ProgressHandle {
    fn new(founder: &Founder) -> Self {
        let (tx, _rx) = watch::channel(FounderState::Pending);
        Self {
            founder: founder.name.clone(),
            state: Arc::new(tx),
        }
    }

    fn set(&self, state: FounderState) {
        self.state.send_replace(state);
    }

    fn current(&self) -> FounderState {
        *self.state.borrow()
    }

    fn snapshot(&self) -> FounderProgress {
        FounderProgress {
            founder: self.founder.clone(),
            state: self.current(),
        }
    }
}

/// Shared, read-only state of the founder units
struct UnitContext {
    aggregator: FounderResearchAggregator,
    assessment: AssessmentStage,
    skip_assessment_on_empty_dossier: bool,
}

/// Drives research, assessment and synthesis for a team
pub struct TeamOrchestrator {
    config: RadarConfig,
    units: Arc<UnitContext>,
    synthesis: SynthesisStage,
    progress: Arc<RwLock<VecDeque<(String, Vec<ProgressHandle>)>>>,
}

impl TeamOrchestrator {
    /// Create an orchestrator from explicit collaborators
    pub fn new(config: RadarConfig, registry: SourceRegistry, llm: Arc<LlmGateway>) -> Self {
        let units = UnitContext {
            aggregator: FounderResearchAggregator::new(registry, config.pipeline.clone()),
            assessment: AssessmentStage::new(Arc::clone(&llm)),
            skip_assessment_on_empty_dossier: config.pipeline.skip_assessment_on_empty_dossier,
        };

        Self {
            synthesis: SynthesisStage::new(llm),
            units: Arc::new(units),
            progress: Arc::new(RwLock::new(VecDeque::new())),
            config,
        }
    }

    /// Build the production source clients and LLM client from configuration
    pub async fn from_config(config: RadarConfig) -> RadarResult<Self> {
        config.validate()?;

        let model: Arc<dyn ChatModel> = Arc::new(SiumaiChatModel::new(&config.llm).await?);
        let llm = Arc::new(
            LlmGateway::new(model, &config.llm).with_retry(config.pipeline.retry.clone()),
        );
        let registry = SourceRegistry::from_config(&config);

        Ok(Self::new(config, registry, llm))
    }

    /// Founder states of the most recently started run, in input order
    pub async fn progress(&self) -> Vec<FounderProgress> {
        self.progress
            .read()
            .await
            .back()
            .map(|(_, handles)| handles.iter().map(ProgressHandle::snapshot).collect())
            .unwrap_or_default()
    }

    /// Founder states of one run, `None` once it is no longer tracked
    pub async fn run_progress(&self, run_id: &str) -> Option<Vec<FounderProgress>> {
        self.progress
            .read()
            .await
            .iter()
            .find(|(id, _)| id == run_id)
            .map(|(_, handles)| handles.iter().map(ProgressHandle::snapshot).collect())
    }

    async fn track_run(&self, run_id: &str, handles: &[ProgressHandle]) {
        let mut runs = self.progress.write().await;
        runs.push_back((run_id.to_string(), handles.to_vec()));
        while runs.len() > TRACKED_RUNS {
            runs.pop_front();
        }
    }

    async fn open_audit(&self, run_id: &str) -> (AuditLog, AuditWriter) {
        match (&self.config.audit.enabled, &self.config.audit.path) {
            (true, Some(path)) => match AuditLog::open(path, run_id).await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "Audit log unavailable, continuing without it");
                    AuditLog::disabled(run_id)
                }
            },
            _ => AuditLog::disabled(run_id),
        }
    }

    /// Analyze a team. Never fails: founder failures land in `errors`, stage failures in
    /// the corresponding `{error}` slots.
    pub async fn run_team_analysis(&self, team: TeamInput) -> TeamAnalysis {
        self.run_team_analysis_as(Uuid::new_v4().to_string(), team).await
    }

    /// Like [`run_team_analysis`](Self::run_team_analysis) under a caller-chosen run id,
    /// so [`run_progress`](Self::run_progress) can follow the run while it is in flight
    pub async fn run_team_analysis_as(&self, run_id: String, team: TeamInput) -> TeamAnalysis {
        let started_at = Utc::now();
        let founder_count = team.founders.len();

        log_operation_start!("run_team_analysis", run_id = %run_id, founders = founder_count);

        let (audit, audit_writer) = self.open_audit(&run_id).await;
        audit.record(
            "Input",
            None,
            serde_json::to_value(&team).unwrap_or_default(),
        );

        let handles: Vec<ProgressHandle> = team.founders.iter().map(ProgressHandle::new).collect();
        self.track_run(&run_id, &handles).await;

        let items: Vec<(Founder, ProgressHandle, AuditLog)> = team
            .founders
            .iter()
            .cloned()
            .zip(handles.iter().cloned())
            .map(|(founder, handle)| (founder, handle, audit.clone()))
            .collect();

        let units = Arc::clone(&self.units);
        let outcomes = process_concurrently(
            items,
            self.config.pipeline.max_concurrent_founders,
            move |(founder, handle, audit)| {
                let units = Arc::clone(&units);
                async move {
                    let label = format!("founder_unit:{}", founder.name);
                    Ok(measure_async(&label, run_founder(&units, &founder, &handle, &audit)).await)
                }
            },
        )
        .await;

        let mut assessments = Vec::new();
        let mut errors = Vec::new();
        for ((founder, handle), outcome) in team.founders.iter().zip(&handles).zip(outcomes) {
            let failure = match outcome {
                Ok(Ok(assessment)) => {
                    assessments.push(assessment);
                    continue;
                }
                Ok(Err(failure)) => failure,
                Err(RadarError::Internal { message, .. }) => PipelineFailure::Panicked { message },
                Err(other) => PipelineFailure::Core(other),
            };

            let phase = handle.current();
            handle.set(FounderState::Failed);
            let record = PipelineError::for_founder(founder, phase, failure.to_string());
            error!(
                stage = %record.stage,
                founder = %founder.name,
                phase = %phase,
                error = %record.error,
                "Founder pipeline failed"
            );
            audit.record(
                &record.stage,
                Some(&founder.name),
                serde_json::to_value(&record).unwrap_or_default(),
            );
            errors.push(record);
        }

        let report = self
            .synthesis
            .synthesize(
                team.startup_name.as_deref(),
                &assessments,
                &team.interviews,
                &audit,
            )
            .await;
        audit.record(
            "Report",
            None,
            serde_json::to_value(&report).unwrap_or_default(),
        );

        drop(audit);
        audit_writer.finish().await;

        log_operation_success!(
            "run_team_analysis",
            run_id = %run_id,
            assessed = assessments.len(),
            errors = errors.len()
        );

        TeamAnalysis {
            run_id,
            startup_name: team.startup_name,
            started_at,
            finished_at: Utc::now(),
            showcase_report: report.showcase_report,
            comprehensive_data: ComprehensiveData {
                individual_assessments: assessments,
                synergy_analysis: report.synergy_analysis,
                aggregate_scores: report.aggregate_scores,
            },
            errors,
        }
    }
}

/// Research strictly before assessment for one founder
async fn run_founder(
    units: &UnitContext,
    founder: &Founder,
    progress: &ProgressHandle,
    audit: &AuditLog,
) -> PipelineResult<FounderAssessment> {
    if founder.name.trim().is_empty() {
        return Err(validation_error!("founder name is empty", "name", "orchestrator").into());
    }

    progress.set(FounderState::Researching);
    let dossier = units.aggregator.research(founder).await;
    audit.record(
        "Research",
        Some(&founder.name),
        serde_json::to_value(&dossier).unwrap_or_default(),
    );

    if dossier.is_empty() && units.skip_assessment_on_empty_dossier {
        return Err(PipelineFailure::EmptyDossier {
            founder: founder.name.clone(),
        });
    }

    progress.set(FounderState::Assessing);
    let assessment = units.assessment.assess(founder, &dossier, audit).await;

    progress.set(FounderState::Done);
    info!(
        founder = %founder.name,
        tracks = ?assessment.tracks(),
        failed_tracks = assessment.failed_tracks(),
        "Founder assessed"
    );

    Ok(FounderAssessment {
        id: founder.id.clone(),
        name: founder.name.clone(),
        role: founder.role,
        assessment,
        dossier_status: dossier.status,
    })
}
