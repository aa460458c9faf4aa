//! Academic metrics through the OpenAlex REST API

use crate::http::{create_http_client, handle_response_error, request_error, ApiClientConfig};
use crate::source::{SourceClient, SourceRequest};
use async_trait::async_trait;
use radar_core::{not_found_error, OpenAlexConfig, RadarError, RadarResult, SourcePayload};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const COMPONENT: &str = "openalex_client";

#[derive(Debug, Clone, Default, Deserialize)]
struct Institution {
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SummaryStats {
    h_index: Option<u64>,
    i10_index: Option<u64>,
}

/// Author record as returned by both the search and the detail endpoint
#[derive(Debug, Clone, Deserialize)]
struct Author {
    id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    works_count: u64,
    #[serde(default)]
    cited_by_count: u64,
    #[serde(default)]
    summary_stats: SummaryStats,
    #[serde(default)]
    last_known_institutions: Vec<Institution>,
    orcid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorSearch {
    #[serde(default)]
    results: Vec<Author>,
}

/// Publication metrics of one author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorMetrics {
    pub openalex_id: String,
    pub display_name: String,
    pub works_count: u64,
    pub cited_by_count: u64,
    pub h_index: Option<u64>,
    pub i10_index: Option<u64>,
    pub last_known_institution: Option<String>,
    pub orcid: Option<String>,
}

impl AuthorMetrics {
    fn from_author(author: Author) -> Self {
        Self {
            openalex_id: short_id(&author.id).to_string(),
            display_name: author.display_name,
            works_count: author.works_count,
            cited_by_count: author.cited_by_count,
            h_index: author.summary_stats.h_index,
            i10_index: author.summary_stats.i10_index,
            last_known_institution: author
                .last_known_institutions
                .into_iter()
                .map(|i| i.display_name)
                .find(|name| !name.is_empty()),
            orcid: author.orcid,
        }
    }
}

/// `https://openalex.org/A123` -> `A123`
fn short_id(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// Narrow search results by affiliation substring; the unfiltered head is kept when the
/// filter matches nothing
fn select_candidates(results: Vec<Author>, affiliation: Option<&str>, top_n: usize) -> Vec<Author> {
    if let Some(affiliation) = affiliation.map(str::to_lowercase).filter(|a| !a.is_empty()) {
        let filtered: Vec<Author> = results
            .iter()
            .filter(|author| {
                author
                    .last_known_institutions
                    .iter()
                    .any(|i| i.display_name.to_lowercase().contains(&affiliation))
            })
            .cloned()
            .collect();
        if !filtered.is_empty() {
            return filtered;
        }
    }
    results.into_iter().take(top_n).collect()
}

/// OpenAlex API client
pub struct OpenAlexClient {
    client: reqwest::Client,
    config: ApiClientConfig,
    mailto: Option<String>,
    candidates: usize,
}

impl OpenAlexClient {
    pub fn new(openalex: &OpenAlexConfig) -> RadarResult<Self> {
        let config = ApiClientConfig::new(&openalex.base_url).with_timeout(openalex.timeout_secs);
        let client = create_http_client(&config)?;

        info!("Created OpenAlex client for {}", config.base_url);

        Ok(Self {
            client,
            config,
            mailto: openalex.mailto.clone().filter(|m| !m.trim().is_empty()),
            candidates: openalex.candidates.max(1),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, endpoint: &str) -> RadarResult<T> {
        let mut url = self.config.endpoint(endpoint);
        if let Some(mailto) = &self.mailto {
            let separator = if url.contains('?') { '&' } else { '?' };
            url.push_str(&format!("{}mailto={}", separator, urlencoding::encode(mailto)));
        }
        debug!("Making OpenAlex API request to: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error(e, COMPONENT, "get_request"))?;

        if !response.status().is_success() {
            return Err(handle_response_error(response, COMPONENT, "get_request").await);
        }

        let text = response
            .text()
            .await
            .map_err(|e| request_error(e, COMPONENT, "get_request"))?;
        serde_json::from_str(&text).map_err(|e| {
            RadarError::malformed(
                format!("Unexpected OpenAlex response for {}: {}", endpoint, e),
                Some(text),
                COMPONENT,
            )
        })
    }

    /// Look up the best matching author and fetch their metrics
    pub async fn lookup(&self, name: &str, affiliation: Option<&str>) -> RadarResult<AuthorMetrics> {
        let search: AuthorSearch = self
            .get_json(&format!(
                "authors?search={}&per-page=25",
                urlencoding::encode(name)
            ))
            .await?;

        let candidate = select_candidates(search.results, affiliation, self.candidates)
            .into_iter()
            .next()
            .ok_or_else(|| not_found_error!(format!("OpenAlex author '{}'", name), COMPONENT))?;

        debug!(
            candidate = %candidate.display_name,
            id = %candidate.id,
            "Selected OpenAlex author candidate"
        );

        let author: Author = self
            .get_json(&format!("authors/{}", short_id(&candidate.id)))
            .await?;
        Ok(AuthorMetrics::from_author(author))
    }
}

#[async_trait]
impl SourceClient for OpenAlexClient {
    fn name(&self) -> &str {
        "OpenAlex"
    }

    async fn fetch(&self, request: &SourceRequest) -> RadarResult<SourcePayload> {
        let metrics = self
            .lookup(&request.founder_name, request.affiliation.as_deref())
            .await?;
        Ok(SourcePayload::Structured(serde_json::to_value(metrics)?))
    }
}
