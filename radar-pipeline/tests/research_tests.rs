mod common;

use common::{registry, FakeSource};
use radar_core::{
    DossierStatus, Founder, FounderRole, PipelineConfig, RetryConfig, SourceKind, SourceResult,
};
use radar_pipeline::{FounderResearchAggregator, SourceRegistry, DEADLINE_EXCEEDED};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

const FAILURE_MARKER: &str = "[Content extraction failed for";

fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        source_timeout_secs: 5,
        retry: RetryConfig::none(),
        ..PipelineConfig::default()
    }
}

struct Sources {
    web: Arc<FakeSource>,
    github: Arc<FakeSource>,
    academic: Arc<FakeSource>,
}

fn aggregator(config: PipelineConfig) -> (FounderResearchAggregator, Sources) {
    let sources = Sources {
        web: FakeSource::batching("Tavily"),
        github: FakeSource::new("GitHub"),
        academic: FakeSource::new("OpenAlex"),
    };
    let registry = registry(&sources.web, &sources.github, &sources.academic);
    (FounderResearchAggregator::new(registry, config), sources)
}

#[tokio::test]
async fn test_zero_urls_yields_placeholder() {
    let (aggregator, sources) = aggregator(pipeline_config());
    let founder = Founder::new("Nobody", FounderRole::NonTechnical);

    let dossier = aggregator.research(&founder).await;

    assert_eq!(dossier.status, DossierStatus::Empty);
    assert!(dossier.sections.is_empty());
    assert_eq!(
        dossier.text(),
        "Error: Could not retrieve any content for Nobody from the provided sources."
    );
    assert_eq!(sources.web.calls.load(Ordering::SeqCst), 0);
    assert_eq!(sources.web.batch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_one_broken_source_leaves_exactly_one_marker() {
    let (aggregator, _sources) = aggregator(pipeline_config());
    let founder = Founder::new("Ada", FounderRole::Technical)
        .with_url("https://linkedin.com/in/ada")
        .with_url("https://github.com/broken-ada")
        .with_url("https://ada.dev")
        .with_affiliation("ETH Zurich");

    let dossier = aggregator.research(&founder).await;

    assert_eq!(dossier.status, DossierStatus::Partial);
    assert_eq!(dossier.sections.len(), 4);
    assert_eq!(dossier.success_count(), 3);
    assert_eq!(dossier.text().matches(FAILURE_MARKER).count(), 1);
    assert!(dossier
        .text()
        .contains("[Content extraction failed for https://github.com/broken-ada:"));
    assert!(dossier.text().starts_with("--- Research Dossier for Ada ---"));
}

#[tokio::test]
async fn test_sections_follow_declared_order_with_academic_last() {
    let (aggregator, _sources) = aggregator(pipeline_config());
    let founder = Founder::new("Ada", FounderRole::Both)
        .with_url("https://ada.dev")
        .with_url("https://github.com/ada")
        .with_url("https://linkedin.com/in/ada")
        .with_affiliation("ETH Zurich");

    let dossier = aggregator.research(&founder).await;

    let kinds: Vec<SourceKind> = dossier.sections.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SourceKind::Web,
            SourceKind::GitHub,
            SourceKind::LinkedIn,
            SourceKind::Academic
        ]
    );

    let text = dossier.text();
    let web = text.find("--- Source (Web: https://ada.dev) ---").unwrap();
    let github = text.find("--- Source (GitHub: https://github.com/ada) ---").unwrap();
    let academic = text
        .find("--- Source (Academic metrics: Ada @ ETH Zurich) ---")
        .unwrap();
    assert!(web < github && github < academic);
}

#[tokio::test]
async fn test_web_and_linkedin_share_one_batched_call() {
    let (aggregator, sources) = aggregator(pipeline_config());
    let founder = Founder::new("Bo", FounderRole::NonTechnical)
        .with_url("https://linkedin.com/in/bo")
        .with_url("https://bo.example.com/unmatched")
        .with_url("https://bo.example.com/missing");

    let dossier = aggregator.research(&founder).await;

    assert_eq!(sources.web.batch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(sources.web.calls.load(Ordering::SeqCst), 0);
    assert_eq!(dossier.success_count(), 1);
    assert_eq!(dossier.failure_count(), 2);

    let reasons: Vec<&str> = dossier
        .sections
        .iter()
        .filter_map(|s| s.result.failure_reason())
        .collect();
    assert!(reasons[0].contains("content extraction failed for this specific URL"));
    assert!(reasons[1].contains("missing from batched response"));
}

#[tokio::test]
async fn test_business_founders_skip_academic_lookup() {
    let (aggregator, sources) = aggregator(pipeline_config());
    let founder = Founder::new("Bo", FounderRole::NonTechnical)
        .with_url("https://linkedin.com/in/bo")
        .with_affiliation("HSG");

    let dossier = aggregator.research(&founder).await;

    assert_eq!(sources.academic.calls.load(Ordering::SeqCst), 0);
    assert!(dossier
        .sections
        .iter()
        .all(|section| section.kind != SourceKind::Academic));
}

#[tokio::test]
async fn test_unconfigured_source_becomes_failure_section() {
    let github = FakeSource::new("GitHub");
    let registry = SourceRegistry::new().with(SourceKind::GitHub, github);
    let aggregator = FounderResearchAggregator::new(registry, pipeline_config());
    let founder = Founder::new("Cy", FounderRole::Technical)
        .with_url("https://github.com/cy")
        .with_url("https://linkedin.com/in/cy");

    let dossier = aggregator.research(&founder).await;

    assert_eq!(dossier.status, DossierStatus::Partial);
    assert_eq!(
        dossier.sections[1].result,
        SourceResult::failure("no client configured for LinkedIn sources")
    );
}

#[tokio::test]
async fn test_deadline_marks_unfinished_sources() {
    let (aggregator, _sources) = aggregator(PipelineConfig {
        founder_deadline_secs: Some(1),
        ..pipeline_config()
    });
    let founder = Founder::new("Dee", FounderRole::Technical)
        .with_url("https://github.com/dee")
        .with_url("https://github.com/slow-dee");

    let started = Instant::now();
    let dossier = aggregator.research(&founder).await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(dossier.success_count(), 1);
    assert_eq!(
        dossier.sections[1].result.failure_reason(),
        Some(DEADLINE_EXCEEDED)
    );
}

#[tokio::test]
async fn test_oversized_timeouts_behave_as_unbounded() {
    let (aggregator, _sources) = aggregator(PipelineConfig {
        source_timeout_secs: u64::MAX,
        founder_deadline_secs: Some(u64::MAX),
        ..pipeline_config()
    });
    let founder = Founder::new("Eve", FounderRole::Technical).with_url("https://github.com/eve");

    let dossier = aggregator.research(&founder).await;

    assert_eq!(dossier.status, DossierStatus::Complete);
    assert_eq!(dossier.success_count(), 1);
}

#[tokio::test]
async fn test_research_is_repeatable() {
    let (aggregator, _sources) = aggregator(pipeline_config());
    let founder = Founder::new("Ada", FounderRole::Technical)
        .with_url("https://github.com/ada")
        .with_url("https://linkedin.com/in/broken-ada");

    let first = aggregator.research(&founder).await;
    let second = aggregator.research(&founder).await;

    assert_eq!(first, second);
}
