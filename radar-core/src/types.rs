//! Core data type definitions
//!
//! Everything here lives for a single analysis run: founders come in from the caller,
//! source results and dossiers are built during research, assessments and reports are
//! produced by the LLM stages and finally folded into a [`TeamAnalysis`].

use crate::error::RadarResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Declared role of a founder, drives source selection and assessment tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FounderRole {
    Technical,
    #[serde(alias = "non_technical", alias = "nontechnical", alias = "business")]
    NonTechnical,
    Both,
}

impl FounderRole {
    /// Assessment tracks run for this role
    pub fn tracks(self) -> &'static [Track] {
        match self {
            FounderRole::Technical | FounderRole::Both => &[Track::Technical, Track::Business],
            FounderRole::NonTechnical => &[Track::Business],
        }
    }

    pub fn is_technical(self) -> bool {
        matches!(self, FounderRole::Technical | FounderRole::Both)
    }
}

impl fmt::Display for FounderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FounderRole::Technical => write!(f, "technical"),
            FounderRole::NonTechnical => write!(f, "non-technical"),
            FounderRole::Both => write!(f, "both"),
        }
    }
}

/// External data provider kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "linkedin")]
    LinkedIn,
    #[serde(rename = "github")]
    GitHub,
    #[serde(rename = "web")]
    Web,
    #[serde(rename = "academic")]
    Academic,
}

impl SourceKind {
    /// Classify a profile URL by host
    pub fn classify_url(url: &str) -> Self {
        let lowered = url.to_ascii_lowercase();
        if lowered.contains("linkedin.com") {
            SourceKind::LinkedIn
        } else if lowered.contains("github.com") {
            SourceKind::GitHub
        } else {
            SourceKind::Web
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::LinkedIn => "LinkedIn",
            SourceKind::GitHub => "GitHub",
            SourceKind::Web => "Web",
            SourceKind::Academic => "Academic metrics",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A founder as submitted by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Founder {
    /// Caller-side identifier, echoed back on results and errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub role: FounderRole,
    /// Profile URLs (LinkedIn, GitHub, personal pages, ...)
    #[serde(default)]
    pub urls: Vec<String>,
    /// University or organisation, used for the academic metrics lookup
    #[serde(default, alias = "university", skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Founder {
    pub fn new(name: impl Into<String>, role: FounderRole) -> Self {
        Self {
            id: None,
            name: name.into(),
            role,
            urls: Vec::new(),
            affiliation: None,
            notes: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Classified profile links in declaration order; blanks and duplicates are dropped
    pub fn profile_links(&self) -> Vec<ProfileLink> {
        let mut seen = HashSet::new();
        self.urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .filter(|url| seen.insert(url.to_string()))
            .map(|url| ProfileLink {
                kind: SourceKind::classify_url(url),
                url: url.to_string(),
            })
            .collect()
    }

    /// Affiliation with surrounding whitespace removed, if any
    pub fn affiliation(&self) -> Option<&str> {
        self.affiliation
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }

    /// Academic metrics are only looked up for technical founders with a declared affiliation
    pub fn wants_academic_metrics(&self) -> bool {
        self.role.is_technical() && self.affiliation().is_some()
    }
}

/// One classified profile URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileLink {
    pub kind: SourceKind,
    pub url: String,
}

/// Interview transcript attached to the team input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewTranscript {
    /// Name of the founder interviewed
    pub founder: String,
    pub transcript: String,
}

/// Top-level input of a team analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_name: Option<String>,
    pub founders: Vec<Founder>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interviews: Vec<InterviewTranscript>,
}

impl TeamInput {
    pub fn new(founders: Vec<Founder>) -> Self {
        Self {
            startup_name: None,
            founders,
            interviews: Vec::new(),
        }
    }
}

/// Payload returned by a successful source call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourcePayload {
    Text(String),
    Structured(serde_json::Value),
}

impl SourcePayload {
    pub fn is_empty(&self) -> bool {
        match self {
            SourcePayload::Text(text) => text.trim().is_empty(),
            SourcePayload::Structured(value) => match value {
                serde_json::Value::Null => true,
                serde_json::Value::Object(map) => map.is_empty(),
                serde_json::Value::Array(items) => items.is_empty(),
                _ => false,
            },
        }
    }

    /// Text form used inside a dossier
    pub fn render(&self) -> String {
        match self {
            SourcePayload::Text(text) => text.trim_end().to_string(),
            SourcePayload::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// Outcome of one source call; never an error past the source boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceResult {
    Success { payload: SourcePayload },
    Failure { reason: String },
}

impl SourceResult {
    pub fn success(payload: SourcePayload) -> Self {
        SourceResult::Success { payload }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        SourceResult::Failure {
            reason: reason.into(),
        }
    }

    /// Collapse a raw client result; empty payloads count as failures
    pub fn from_result(result: RadarResult<SourcePayload>) -> Self {
        match result {
            Ok(payload) if payload.is_empty() => SourceResult::failure("empty content"),
            Ok(payload) => SourceResult::success(payload),
            Err(e) => SourceResult::failure(e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SourceResult::Success { .. })
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            SourceResult::Failure { reason } => Some(reason),
            SourceResult::Success { .. } => None,
        }
    }
}

/// One labelled section of a dossier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DossierSection {
    pub kind: SourceKind,
    pub identifier: String,
    pub result: SourceResult,
}

impl DossierSection {
    pub fn new(kind: SourceKind, identifier: impl Into<String>, result: SourceResult) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            result,
        }
    }

    pub fn render(&self) -> String {
        let body = match &self.result {
            SourceResult::Success { payload } => payload.render(),
            SourceResult::Failure { reason } => format!(
                "[Content extraction failed for {}: {}]",
                self.identifier, reason
            ),
        };
        format!(
            "--- Source ({}: {}) ---\n{}\n\n",
            self.kind, self.identifier, body
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DossierStatus {
    /// Every dispatched source succeeded
    Complete,
    /// At least one success and at least one failure
    Partial,
    /// Nothing dispatched, or every source failed
    Empty,
}

/// Consolidated research context for one founder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dossier {
    pub founder: String,
    pub sections: Vec<DossierSection>,
    pub status: DossierStatus,
    body: String,
}

impl Dossier {
    /// Body used when nothing usable was retrieved
    pub fn placeholder_for(founder_name: &str) -> String {
        format!(
            "Error: Could not retrieve any content for {} from the provided sources.",
            founder_name
        )
    }

    /// Merge sections (already in declared order) into a dossier
    pub fn assemble(founder: &Founder, sections: Vec<DossierSection>) -> Self {
        let successes = sections.iter().filter(|s| s.result.is_success()).count();

        let status = if successes == 0 {
            DossierStatus::Empty
        } else if successes == sections.len() {
            DossierStatus::Complete
        } else {
            DossierStatus::Partial
        };

        let body = if status == DossierStatus::Empty {
            Self::placeholder_for(&founder.name)
        } else {
            let mut body = format!("--- Research Dossier for {} ---\n\n", founder.name);
            for section in &sections {
                body.push_str(&section.render());
            }
            if let Some(notes) = founder.notes.as_deref().filter(|n| !n.trim().is_empty()) {
                body.push_str(&format!("--- Founder Notes ---\n{}\n\n", notes.trim()));
            }
            body
        };

        Self {
            founder: founder.name.clone(),
            sections,
            status,
            body,
        }
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn is_empty(&self) -> bool {
        self.status == DossierStatus::Empty
    }

    pub fn success_count(&self) -> usize {
        self.sections.iter().filter(|s| s.result.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.sections.len() - self.success_count()
    }
}

/// Axis of assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Technical,
    Business,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::Technical => write!(f, "technical"),
            Track::Business => write!(f, "business"),
        }
    }
}

/// Output of an LLM-backed stage: the validated value or an explicit error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageOutput<T> {
    Failed { error: String },
    Ready(T),
}

impl<T> StageOutput<T> {
    pub fn failed(error: impl Into<String>) -> Self {
        StageOutput::Failed {
            error: error.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, StageOutput::Ready(_))
    }

    pub fn as_ready(&self) -> Option<&T> {
        match self {
            StageOutput::Ready(value) => Some(value),
            StageOutput::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            StageOutput::Failed { error } => Some(error),
            StageOutput::Ready(_) => None,
        }
    }
}

/// Accepts numbers or numeric strings ("8", "8/10") in the 0-10 range
fn deserialize_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    let score = match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s
            .trim()
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .find(|part| !part.is_empty())
            .and_then(|part| part.parse::<f64>().ok()),
        _ => None,
    }
    .ok_or_else(|| D::Error::custom(format!("score is not numeric: {}", value)))?;

    if !(0.0..=10.0).contains(&score) {
        return Err(D::Error::custom(format!("score {} outside 0-10", score)));
    }
    Ok(score)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(deserialize_with = "deserialize_score")]
    pub value: f64,
    pub grade: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalScores {
    pub academic_impact_score: ScoreEntry,
    pub engineering_influence_score: ScoreEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSummary {
    pub domain_expertise: String,
    pub impact_assessment: String,
}

/// Technical-track judgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAssessment {
    pub scores: TechnicalScores,
    pub summary: TechnicalSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessScores {
    pub founder_experience_score: ScoreEntry,
    pub career_progression_score: ScoreEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessSummary {
    pub core_competency: String,
    pub execution_capability_assessment: String,
}

/// Business-track judgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessAssessment {
    pub scores: BusinessScores,
    pub summary: BusinessSummary,
}

/// Per-founder assessment; a track is `None` when the role does not call for it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical: Option<StageOutput<TechnicalAssessment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business: Option<StageOutput<BusinessAssessment>>,
}

impl Assessment {
    /// Tracks that were run, ready or not
    pub fn tracks(&self) -> Vec<Track> {
        let mut tracks = Vec::new();
        if self.technical.is_some() {
            tracks.push(Track::Technical);
        }
        if self.business.is_some() {
            tracks.push(Track::Business);
        }
        tracks
    }

    pub fn failed_tracks(&self) -> usize {
        let technical = self.technical.as_ref().is_some_and(|t| !t.is_ready());
        let business = self.business.as_ref().is_some_and(|b| !b.is_ready());
        usize::from(technical) + usize::from(business)
    }
}

/// One entry of the team assessment collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FounderAssessment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub role: FounderRole,
    pub assessment: Assessment,
    pub dossier_status: DossierStatus,
}

/// Ordered (input order) assessments of the founders that made it through
pub type TeamAssessments = Vec<FounderAssessment>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallPotential {
    pub grade: String,
    pub justification: String,
}

/// Team-level synergy judgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyAnalysis {
    pub team_balance_assessment: String,
    #[serde(default)]
    pub collective_strengths: Vec<String>,
    #[serde(default)]
    pub identified_gaps: Vec<String>,
    pub overall_potential: OverallPotential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightScore {
    Strong,
    Average,
    Weak,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FounderHighlight {
    pub name: String,
    pub highlight: String,
    pub score: HighlightScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewHighlight {
    pub question: String,
    pub summary: String,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<String>,
}

/// Investment-memo style summary of the whole team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowcaseReport {
    pub team_overall_grade: String,
    pub executive_summary: String,
    #[serde(default)]
    pub key_risks: Vec<String>,
    #[serde(default)]
    pub founder_highlights: Vec<FounderHighlight>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interview_highlights: Vec<InterviewHighlight>,
}

/// Locally computed score aggregates over the ready assessments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateScores {
    pub founders_assessed: usize,
    pub technical_tracks: usize,
    pub business_tracks: usize,
    pub failed_tracks: usize,
    pub mean_academic_impact: Option<f64>,
    pub mean_engineering_influence: Option<f64>,
    pub mean_founder_experience: Option<f64>,
    pub mean_career_progression: Option<f64>,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

impl AggregateScores {
    pub fn from_assessments(assessments: &[FounderAssessment]) -> Self {
        let mut academic = Vec::new();
        let mut engineering = Vec::new();
        let mut experience = Vec::new();
        let mut progression = Vec::new();
        let mut scores = AggregateScores {
            founders_assessed: assessments.len(),
            ..Default::default()
        };

        for entry in assessments {
            let assessment = &entry.assessment;
            scores.failed_tracks += assessment.failed_tracks();

            if let Some(technical) = &assessment.technical {
                scores.technical_tracks += 1;
                if let Some(t) = technical.as_ready() {
                    academic.push(t.scores.academic_impact_score.value);
                    engineering.push(t.scores.engineering_influence_score.value);
                }
            }
            if let Some(business) = &assessment.business {
                scores.business_tracks += 1;
                if let Some(b) = business.as_ready() {
                    experience.push(b.scores.founder_experience_score.value);
                    progression.push(b.scores.career_progression_score.value);
                }
            }
        }

        scores.mean_academic_impact = mean(&academic);
        scores.mean_engineering_influence = mean(&engineering);
        scores.mean_founder_experience = mean(&experience);
        scores.mean_career_progression = mean(&progression);
        scores
    }
}

/// Output of the synthesis chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub synergy_analysis: StageOutput<SynergyAnalysis>,
    pub showcase_report: StageOutput<ShowcaseReport>,
    pub aggregate_scores: AggregateScores,
}

/// Per-founder pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FounderState {
    Pending,
    Researching,
    Assessing,
    Done,
    Failed,
}

impl fmt::Display for FounderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FounderState::Pending => "pending",
            FounderState::Researching => "researching",
            FounderState::Assessing => "assessing",
            FounderState::Done => "done",
            FounderState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// A failure recorded by the orchestrator; reported next to the results that did succeed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineError {
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founder_id: Option<String>,
    /// State the founder unit was in when it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<FounderState>,
    pub error: String,
}

impl PipelineError {
    pub fn for_founder(founder: &Founder, phase: FounderState, error: impl Into<String>) -> Self {
        Self {
            stage: format!("Research/Assess {}", founder.name),
            founder: Some(founder.name.clone()),
            founder_id: founder.id.clone(),
            phase: Some(phase),
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveData {
    pub individual_assessments: TeamAssessments,
    pub synergy_analysis: StageOutput<SynergyAnalysis>,
    pub aggregate_scores: AggregateScores,
}

/// Response of `run_team_analysis`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAnalysis {
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub showcase_report: StageOutput<ShowcaseReport>,
    pub comprehensive_data: ComprehensiveData,
    pub errors: Vec<PipelineError>,
}
