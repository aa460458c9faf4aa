//! Prompts used by the assessment and synthesis stages
//!
//! System prompts are plain constants; user prompts are tera templates rendered with the
//! founder, dossier and team data. Autoescaping is off because nothing here is HTML.

use crate::error::PipelineResult;
use radar_core::{
    AggregateScores, Dossier, Founder, FounderAssessment, InterviewTranscript, StageOutput,
    SynergyAnalysis,
};
use tera::{Context, Tera};

/// System prompt for the technical track
pub const TECHNICAL_SYSTEM_PROMPT: &str = "You are a CTO evaluating a technical founder for a venture capital firm. \
You judge deep tech expertise and engineering influence strictly from the research dossier you are given \
and answer with a single JSON object.";

/// System prompt for the business track
pub const BUSINESS_SYSTEM_PROMPT: &str = "You are a venture partner evaluating a founder's business background. \
You judge founding experience and career progression strictly from the research dossier you are given \
and answer with a single JSON object.";

/// System prompt for the team synergy stage
pub const SYNERGY_SYSTEM_PROMPT: &str = "You are a senior partner at a venture capital firm evaluating how a founding team works as a unit. \
Answer with a single JSON object.";

/// System prompt for the showcase report stage
pub const SHOWCASE_SYSTEM_PROMPT: &str = "You are a VC analyst condensing a team analysis into the summary of an investment memo. \
Answer with a single JSON object.";

const TECHNICAL_TEMPLATE: &str = r#"
Assess the technical profile of {{ founder_name }} (declared role: {{ role }}).
{% if affiliation %}Declared affiliation: {{ affiliation }}
{% endif %}
**Research Dossier:**
---
{{ dossier }}
---

Scoring guidance (adapt when the dossier shows better evidence):
- academic_impact_score: h-index >= 30 -> 10 (A), >= 20 -> 9 (A-), >= 10 -> 8 (B+), >= 5 -> 7 (B), otherwise 5 (C).
- engineering_influence_score: total GitHub stars >= 1000 -> 10 (A), >= 500 -> 9 (A-), >= 100 -> 8 (B+), >= 20 -> 7 (B), otherwise 5 (C).
- Sections marked "[Content extraction failed ...]" carry no evidence. Do not invent information.

Your response must be a single JSON object with this exact schema:
{
  "scores": {
    "academic_impact_score": { "value": <1-10>, "grade": "<A-F>", "note": "<one sentence>" },
    "engineering_influence_score": { "value": <1-10>, "grade": "<A-F>", "note": "<one sentence>" }
  },
  "summary": {
    "domain_expertise": "<primary field of deep tech expertise>",
    "impact_assessment": "<brief assessment of their potential for impactful work>"
  }
}
"#;

const BUSINESS_TEMPLATE: &str = r#"
Assess the business background of {{ founder_name }} (declared role: {{ role }}).

**Research Dossier:**
---
{{ dossier }}
---

Your task:
1. Extract key experiences, previous companies and indicators of leadership or founding experience.
2. Score prior founding experience highly (9-10). Without it, score neutrally (5-6) and say so in the note.
3. Sections marked "[Content extraction failed ...]" carry no evidence. Do not invent information.

Your response must be a single JSON object with this exact schema:
{
  "scores": {
    "founder_experience_score": { "value": <1-10>, "grade": "<A-F>", "note": "<justification>" },
    "career_progression_score": { "value": <1-10>, "grade": "<A-F>", "note": "<justification>" }
  },
  "summary": {
    "core_competency": "<likely core business skill, e.g. Sales, Operations>",
    "execution_capability_assessment": "<brief assessment of their ability to execute and lead a company>"
  }
}
"#;

const SYNERGY_TEMPLATE: &str = r#"
{% if startup_name %}Startup: {{ startup_name }}
{% endif %}
**Individual Founder Assessments:**
{{ assessments }}

Your analysis must cover:
1. Team balance: is there a good mix of technical and business expertise?
2. Collective strengths of the team as a unit.
3. Key gaps and risks: critical skill sets missing from the founding team. This is the most important part.
4. Overall potential: a grade (A, B or C) with a justification.

Your response must be a single JSON object with this exact schema:
{
  "team_balance_assessment": "<analysis of the technical/business balance>",
  "collective_strengths": ["<2-3 strengths of the team as a whole>"],
  "identified_gaps": ["<1-2 critical missing skills or experience>"],
  "overall_potential": { "grade": "<A | B | C>", "justification": "<concise reason>" }
}
"#;

const SHOWCASE_TEMPLATE: &str = r#"
Distill the analysis below into a concise, high-level report{% if startup_name %} for {{ startup_name }}{% endif %}.

--- SYNERGY ANALYSIS ---
{{ synergy }}
--- INDIVIDUAL ASSESSMENTS ---
{{ assessments }}
--- AGGREGATE SCORES ---
{{ aggregate_scores }}
{% if interviews %}--- INTERVIEW TRANSCRIPTS ---
{% for interview in interviews %}[{{ interview.founder }}]
{{ interview.transcript }}

{% endfor %}{% endif %}--- END DATA ---

Rules:
- team_overall_grade: use the grade from the synergy analysis when it is available.
- executive_summary: one or two sentences on the core dynamic of the team.
- key_risks: the most critical gaps.
- founder_highlights: one entry per assessed founder with a one-sentence highlight and a score of "strong", "average" or "weak".
{% if interviews %}- interview_highlights: one entry per key theme of the interviews with a score from 0.0 to 10.0.
{% else %}- interview_highlights: leave the list empty.
{% endif %}
Your response must be a single JSON object with this exact schema:
{
  "team_overall_grade": "<e.g. B+>",
  "executive_summary": "<text>",
  "key_risks": ["<risk>"],
  "founder_highlights": [ { "name": "<founder>", "highlight": "<sentence>", "score": "<strong | average | weak>" } ],
  "interview_highlights": [ { "question": "<theme>", "summary": "<text>", "key_insights": ["<insight>"], "score": <0.0-10.0>, "person": "<founder>" } ]
}
"#;

fn render(template: &str, context: &Context) -> PipelineResult<String> {
    Ok(Tera::one_off(template, context, false)?)
}

fn founder_context(founder: &Founder, dossier: &Dossier) -> Context {
    let mut context = Context::new();
    context.insert("founder_name", &founder.name);
    context.insert("role", &founder.role.to_string());
    context.insert("affiliation", &founder.affiliation());
    context.insert("dossier", dossier.text());
    context
}

pub fn technical_prompt(founder: &Founder, dossier: &Dossier) -> PipelineResult<String> {
    render(TECHNICAL_TEMPLATE, &founder_context(founder, dossier))
}

pub fn business_prompt(founder: &Founder, dossier: &Dossier) -> PipelineResult<String> {
    render(BUSINESS_TEMPLATE, &founder_context(founder, dossier))
}

pub fn synergy_prompt(
    startup_name: Option<&str>,
    assessments: &[FounderAssessment],
) -> PipelineResult<String> {
    let mut context = Context::new();
    context.insert("startup_name", &startup_name);
    context.insert("assessments", &serde_json::to_string_pretty(assessments)?);
    render(SYNERGY_TEMPLATE, &context)
}

pub fn showcase_prompt(
    startup_name: Option<&str>,
    assessments: &[FounderAssessment],
    synergy: &StageOutput<SynergyAnalysis>,
    aggregate_scores: &AggregateScores,
    interviews: &[InterviewTranscript],
) -> PipelineResult<String> {
    let mut context = Context::new();
    context.insert("startup_name", &startup_name);
    context.insert("assessments", &serde_json::to_string_pretty(assessments)?);
    context.insert("synergy", &serde_json::to_string_pretty(synergy)?);
    context.insert(
        "aggregate_scores",
        &serde_json::to_string_pretty(aggregate_scores)?,
    );
    context.insert("interviews", interviews);
    render(SHOWCASE_TEMPLATE, &context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_core::FounderRole;

    #[test]
    fn test_technical_prompt_embeds_dossier_verbatim() {
        let founder = Founder::new("Ada <Lovelace>", FounderRole::Technical).with_affiliation("ETH");
        let dossier = Dossier::assemble(&founder, Vec::new());

        let prompt = technical_prompt(&founder, &dossier).unwrap();
        assert!(prompt.contains("Ada <Lovelace>"));
        assert!(prompt.contains("Declared affiliation: ETH"));
        assert!(prompt.contains(&Dossier::placeholder_for("Ada <Lovelace>")));
        assert!(prompt.contains("\"academic_impact_score\""));
    }

    #[test]
    fn test_business_prompt_without_affiliation() {
        let founder = Founder::new("Bo", FounderRole::NonTechnical);
        let dossier = Dossier::assemble(&founder, Vec::new());

        let prompt = business_prompt(&founder, &dossier).unwrap();
        assert!(prompt.contains("declared role: non-technical"));
        assert!(prompt.contains("\"career_progression_score\""));
    }

    #[test]
    fn test_showcase_prompt_lists_interviews() {
        let synergy: StageOutput<SynergyAnalysis> = StageOutput::failed("no founder assessments available");
        let interviews = vec![InterviewTranscript {
            founder: "Bo".to_string(),
            transcript: "We resolve conflicts by writing things down.".to_string(),
        }];

        let prompt = showcase_prompt(
            Some("Acme"),
            &[],
            &synergy,
            &AggregateScores::default(),
            &interviews,
        )
        .unwrap();

        assert!(prompt.contains("for Acme"));
        assert!(prompt.contains("[Bo]\nWe resolve conflicts by writing things down."));
        assert!(prompt.contains("no founder assessments available"));
        assert!(prompt.contains("interview_highlights: one entry per key theme"));
    }
}
