//! Radar Pipeline - founder research, assessment and team synthesis
//!
//! The [`TeamOrchestrator`] researches every founder concurrently through the
//! configured source clients, assesses each dossier on the tracks the founder's role
//! calls for and finally synthesizes a team-level synergy analysis and showcase report.

pub mod assessment;
pub mod audit;
pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod research;
pub mod synthesis;

pub use assessment::AssessmentStage;
pub use audit::{AuditEntry, AuditLog, AuditWriter};
pub use error::{PipelineFailure, PipelineResult};
pub use orchestrator::{FounderProgress, TeamOrchestrator};
pub use research::{FounderResearchAggregator, ResearchTask, SourceRegistry, DEADLINE_EXCEEDED};
pub use synthesis::{SynthesisStage, NO_ASSESSMENTS};
