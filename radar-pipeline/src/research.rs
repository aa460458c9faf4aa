//! Per-source research tasks and the founder research aggregator

use futures::stream::{self, StreamExt};
use radar_core::{
    retry_async, source_error, with_timeout, Dossier, DossierSection, Founder, PipelineConfig,
    RadarConfig, RetryConfig, SourceKind, SourceResult,
};
use radar_sources::{GitHubClient, OpenAlexClient, SourceClient, SourceRequest, TavilyClient};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Failure reason for requests still running when the founder deadline expires
pub const DEADLINE_EXCEEDED: &str = "founder research deadline exceeded";

/// Which client serves which source kind
#[derive(Clone, Default)]
pub struct SourceRegistry {
    clients: HashMap<SourceKind, Arc<dyn SourceClient>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: SourceKind, client: Arc<dyn SourceClient>) -> Self {
        self.clients.insert(kind, client);
        self
    }

    pub fn get(&self, kind: SourceKind) -> Option<&Arc<dyn SourceClient>> {
        self.clients.get(&kind)
    }

    /// Build the production clients. A client that cannot be built is left out and its
    /// sources resolve to failures.
    pub fn from_config(config: &RadarConfig) -> Self {
        let mut registry = Self::new();

        match TavilyClient::new(&config.search) {
            Ok(client) => {
                let client: Arc<dyn SourceClient> = Arc::new(client);
                registry = registry
                    .with(SourceKind::LinkedIn, Arc::clone(&client))
                    .with(SourceKind::Web, client);
            }
            Err(e) => warn!(error = %e, "Web extraction disabled"),
        }

        match GitHubClient::new(&config.github) {
            Ok(client) => registry = registry.with(SourceKind::GitHub, Arc::new(client)),
            Err(e) => warn!(error = %e, "GitHub source disabled"),
        }

        match OpenAlexClient::new(&config.openalex) {
            Ok(client) => registry = registry.with(SourceKind::Academic, Arc::new(client)),
            Err(e) => warn!(error = %e, "Academic metrics source disabled"),
        }

        registry
    }
}

/// One source client call (or one batched call) on behalf of one founder
pub struct ResearchTask {
    client: Arc<dyn SourceClient>,
    requests: Vec<SourceRequest>,
    timeout_ms: u64,
    retry: RetryConfig,
}

impl ResearchTask {
    pub fn new(
        client: Arc<dyn SourceClient>,
        requests: Vec<SourceRequest>,
        timeout_ms: u64,
        retry: RetryConfig,
    ) -> Self {
        Self {
            client,
            requests,
            timeout_ms,
            retry,
        }
    }

    /// Results aligned with the task's requests; never fails
    pub async fn run(self) -> Vec<SourceResult> {
        if self.requests.len() > 1 && self.client.supports_batch() {
            return self.run_batch().await;
        }

        let mut results = Vec::with_capacity(self.requests.len());
        for request in &self.requests {
            results.push(self.run_single(request).await);
        }
        results
    }

    async fn run_single(&self, request: &SourceRequest) -> SourceResult {
        let operation = format!("{} fetch", self.client.name());
        let result = retry_async(
            || async {
                with_timeout(self.client.fetch(request), self.timeout_ms, &operation).await?
            },
            &self.retry,
            &operation,
        )
        .await;

        if let Err(e) = &result {
            debug!(
                source = self.client.name(),
                identifier = %request.identifier,
                error = %e,
                "Source call failed"
            );
        }
        SourceResult::from_result(result)
    }

    async fn run_batch(&self) -> Vec<SourceResult> {
        let operation = format!("{} batch fetch", self.client.name());
        let result = retry_async(
            || async {
                with_timeout(
                    self.client.fetch_batch(&self.requests),
                    self.timeout_ms,
                    &operation,
                )
                .await?
            },
            &self.retry,
            &operation,
        )
        .await;

        match result {
            Ok(mut batch) => self
                .requests
                .iter()
                .map(|request| {
                    let entry = batch.remove(&request.identifier).unwrap_or_else(|| {
                        Err(source_error!(
                            self.client.name(),
                            request.identifier,
                            "missing from batched response"
                        ))
                    });
                    SourceResult::from_result(entry)
                })
                .collect(),
            Err(e) => {
                debug!(source = self.client.name(), error = %e, "Batched source call failed");
                let reason = e.to_string();
                self.requests
                    .iter()
                    .map(|_| SourceResult::failure(reason.clone()))
                    .collect()
            }
        }
    }
}

/// Runs every applicable research task for a founder and merges the results
pub struct FounderResearchAggregator {
    registry: SourceRegistry,
    config: PipelineConfig,
}

impl FounderResearchAggregator {
    pub fn new(registry: SourceRegistry, config: PipelineConfig) -> Self {
        Self { registry, config }
    }

    /// Group requests into tasks. Requests for a batching client share one task; the
    /// returned index lists point back into `requests`.
    fn plan_tasks(
        &self,
        requests: &[SourceRequest],
        results: &mut [Option<SourceResult>],
    ) -> Vec<(Vec<usize>, ResearchTask)> {
        let timeout_ms = self.config.source_timeout_secs.saturating_mul(1000);
        let mut tasks: Vec<(Vec<usize>, ResearchTask)> = Vec::new();
        let mut batch_slots: HashMap<String, usize> = HashMap::new();

        for (index, request) in requests.iter().enumerate() {
            let Some(client) = self.registry.get(request.kind) else {
                results[index] = Some(SourceResult::failure(format!(
                    "no client configured for {} sources",
                    request.kind
                )));
                continue;
            };

            if client.supports_batch() {
                if let Some(&slot) = batch_slots.get(client.name()) {
                    let (indices, task) = &mut tasks[slot];
                    indices.push(index);
                    task.requests.push(request.clone());
                    continue;
                }
                batch_slots.insert(client.name().to_string(), tasks.len());
            }

            tasks.push((
                vec![index],
                ResearchTask::new(
                    Arc::clone(client),
                    vec![request.clone()],
                    timeout_ms,
                    self.config.retry.clone(),
                ),
            ));
        }

        tasks
    }

    /// Research one founder. Always returns a dossier; failures show up as markers or as
    /// the empty-dossier placeholder.
    pub async fn research(&self, founder: &Founder) -> Dossier {
        let requests = SourceRequest::plan(founder);
        let mut results: Vec<Option<SourceResult>> = vec![None; requests.len()];
        let tasks = self.plan_tasks(&requests, &mut results);

        info!(
            founder = %founder.name,
            sources = requests.len(),
            tasks = tasks.len(),
            "Starting founder research"
        );

        let deadline = self
            .config
            .founder_deadline_secs
            .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)));

        let mut running = stream::iter(
            tasks
                .into_iter()
                .map(|(indices, task)| async move { (indices, task.run().await) }),
        )
        .buffer_unordered(self.config.max_concurrent_sources.max(1));

        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, running.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(founder = %founder.name, "Founder research deadline exceeded");
                        break;
                    }
                },
                None => running.next().await,
            };

            let Some((indices, task_results)) = next else {
                break;
            };
            for (index, result) in indices.into_iter().zip(task_results) {
                results[index] = Some(result);
            }
        }

        let sections: Vec<DossierSection> = requests
            .into_iter()
            .zip(results)
            .map(|(request, result)| {
                DossierSection::new(
                    request.kind,
                    request.identifier,
                    result.unwrap_or_else(|| SourceResult::failure(DEADLINE_EXCEEDED)),
                )
            })
            .collect();

        let dossier = Dossier::assemble(founder, sections);
        if dossier.is_empty() {
            warn!(
                founder = %founder.name,
                attempted = dossier.sections.len(),
                "Could not retrieve any content for founder"
            );
        } else {
            info!(
                founder = %founder.name,
                succeeded = dossier.success_count(),
                failed = dossier.failure_count(),
                "Founder research completed"
            );
        }
        dossier
    }
}
