//! Web page extraction and search through the Tavily API
//!
//! Serves LinkedIn and generic web profile URLs. Extraction is batched; results are
//! matched back to the requested URLs here, once, so callers always get a map keyed by
//! the identifiers they asked for.

use crate::http::{create_http_client, handle_response_error, request_error, ApiClientConfig};
use crate::source::{BatchResults, SourceClient, SourceRequest};
use async_trait::async_trait;
use radar_core::{
    config_error, source_error, RadarError, RadarResult, SearchConfig, SourcePayload,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

const COMPONENT: &str = "tavily_client";
const UNMATCHED: &str = "content extraction failed for this specific URL";

/// Raw page content returned by the extract endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedPage {
    pub url: String,
    #[serde(default)]
    pub raw_content: String,
}

#[derive(Debug, Deserialize)]
struct FailedExtraction {
    url: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    results: Vec<ExtractedPage>,
    #[serde(default)]
    failed_results: Vec<FailedExtraction>,
}

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub raw_content: Option<String>,
}

impl SearchHit {
    /// Full page text when available, the snippet otherwise
    pub fn best_content(&self) -> &str {
        self.raw_content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&self.content)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// Tavily search / extract client
pub struct TavilyClient {
    client: reqwest::Client,
    config: ApiClientConfig,
    search_depth: String,
    max_results: u32,
    search_fallback: bool,
}

impl TavilyClient {
    pub fn new(search: &SearchConfig) -> RadarResult<Self> {
        let api_key = search
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| config_error!("Tavily API key not configured", COMPONENT))?;

        let config = ApiClientConfig::new(&search.base_url)
            .with_timeout(search.timeout_secs)
            .with_header("Authorization", format!("Bearer {}", api_key));
        let client = create_http_client(&config)?;

        info!("Created Tavily client for {}", config.base_url);

        Ok(Self {
            client,
            config,
            search_depth: search.search_depth.clone(),
            max_results: search.max_results,
            search_fallback: search.search_fallback,
        })
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> RadarResult<R> {
        let url = self.config.endpoint(endpoint);
        debug!("Making Tavily API request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| request_error(e, COMPONENT, endpoint))?;

        if !response.status().is_success() {
            return Err(handle_response_error(response, COMPONENT, endpoint).await);
        }

        let text = response
            .text()
            .await
            .map_err(|e| request_error(e, COMPONENT, endpoint))?;
        serde_json::from_str(&text).map_err(|e| {
            RadarError::malformed(
                format!("Unexpected Tavily {} response: {}", endpoint, e),
                Some(text),
                COMPONENT,
            )
        })
    }

    /// Extract raw content for several URLs in one call
    pub async fn extract(&self, urls: &[String]) -> RadarResult<Vec<ExtractedPage>> {
        let body = serde_json::json!({
            "urls": urls,
            "extract_depth": self.search_depth,
        });
        let response: ExtractResponse = self.post("extract", &body).await?;

        for failed in &response.failed_results {
            debug!(
                url = %failed.url,
                error = failed.error.as_deref().unwrap_or("unknown"),
                "Tavily could not extract URL"
            );
        }

        Ok(response.results)
    }

    /// Run one search; returns the consolidated text and the de-duplicated hits
    pub async fn search(&self, query: &str, depth: &str) -> RadarResult<(String, Vec<SearchHit>)> {
        let body = serde_json::json!({
            "query": query,
            "search_depth": depth,
            "max_results": self.max_results,
            "include_raw_content": true,
        });
        let response: SearchResponse = self.post("search", &body).await?;
        Ok(consolidate_hits(response.results))
    }

    async fn search_for_url(&self, url: &str) -> RadarResult<Option<String>> {
        let (_, hits) = self.search(url, &self.search_depth).await?;
        let pages: Vec<(String, String)> = hits
            .iter()
            .map(|hit| (hit.url.clone(), hit.best_content().to_string()))
            .collect();
        Ok(correlate_by_url(&[url.to_string()], &pages)
            .remove(url)
            .flatten())
    }
}

/// Lowercase, drop scheme, `www.` prefix and trailing slashes
pub fn normalize_url(url: &str) -> String {
    let lowered = url.trim().to_ascii_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let without_www = without_scheme
        .strip_prefix("www.")
        .unwrap_or(without_scheme);
    without_www.trim_end_matches('/').to_string()
}

/// `needle` occurs in `haystack` and is followed by a path, query or fragment boundary
fn contains_at_boundary(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        matches!(
            haystack[start + needle.len()..].chars().next(),
            None | Some('/') | Some('?') | Some('#')
        )
    })
}

/// Match returned pages to requested URLs.
///
/// An exact normalized match wins. Otherwise a page belongs to a requested URL when the
/// normalized page URL contains the normalized requested URL followed by a boundary, so
/// `/in/ada` never picks up `/in/ada-smith`. Pages with blank content never match. Every requested URL gets an entry;
/// `None` means nothing matched.
pub fn correlate_by_url(
    requested: &[String],
    pages: &[(String, String)],
) -> HashMap<String, Option<String>> {
    let normalized_pages: Vec<(String, &str)> = pages
        .iter()
        .filter(|(_, content)| !content.trim().is_empty())
        .map(|(url, content)| (normalize_url(url), content.as_str()))
        .collect();

    requested
        .iter()
        .map(|url| {
            let wanted = normalize_url(url);
            if wanted.is_empty() {
                return (url.clone(), None);
            }
            let content = normalized_pages
                .iter()
                .find(|(page_url, _)| *page_url == wanted)
                .or_else(|| {
                    normalized_pages
                        .iter()
                        .find(|(page_url, _)| contains_at_boundary(page_url, &wanted))
                })
                .map(|(_, content)| content.to_string());
            (url.clone(), content)
        })
        .collect()
}

/// Format hits as labelled blocks, skipping repeated URLs
pub fn consolidate_hits(hits: Vec<SearchHit>) -> (String, Vec<SearchHit>) {
    let mut seen = HashSet::new();
    let mut context = String::new();
    let mut unique = Vec::new();

    for hit in hits {
        if hit.url.is_empty() || !seen.insert(hit.url.clone()) {
            continue;
        }
        let content = hit.best_content();
        if !content.trim().is_empty() {
            context.push_str(&format!("--- Source (URL: {}) ---\n{}\n\n", hit.url, content));
        }
        unique.push(hit);
    }

    (context, unique)
}

#[async_trait]
impl SourceClient for TavilyClient {
    fn name(&self) -> &str {
        "Tavily"
    }

    async fn fetch(&self, request: &SourceRequest) -> RadarResult<SourcePayload> {
        let mut results = self.fetch_batch(std::slice::from_ref(request)).await?;
        results
            .remove(&request.identifier)
            .unwrap_or_else(|| Err(source_error!(self.name(), request.identifier, UNMATCHED)))
    }

    fn supports_batch(&self) -> bool {
        true
    }

    async fn fetch_batch(&self, requests: &[SourceRequest]) -> RadarResult<BatchResults> {
        let urls: Vec<String> = requests.iter().map(|r| r.identifier.clone()).collect();
        let pages: Vec<(String, String)> = self
            .extract(&urls)
            .await?
            .into_iter()
            .map(|page| (page.url, page.raw_content))
            .collect();

        let mut results = BatchResults::with_capacity(urls.len());
        for (url, content) in correlate_by_url(&urls, &pages) {
            let result = match content {
                Some(content) => Ok(Some(content)),
                None if self.search_fallback => {
                    debug!(url = %url, "Extraction missed URL, falling back to search");
                    self.search_for_url(&url).await
                }
                None => Ok(None),
            };

            let payload = match result {
                Ok(Some(content)) => Ok(SourcePayload::Text(content)),
                Ok(None) => {
                    warn!(url = %url, "Could not isolate content for URL");
                    Err(source_error!(self.name(), url, UNMATCHED))
                }
                Err(e) => Err(e),
            };
            results.insert(url, payload);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, content: &str) -> (String, String) {
        (url.to_string(), content.to_string())
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("https://www.LinkedIn.com/in/ada/"),
            "linkedin.com/in/ada"
        );
        assert_eq!(normalize_url("linkedin.com/in/ada"), "linkedin.com/in/ada");
        assert_eq!(normalize_url("http://ada.dev"), "ada.dev");
    }

    #[test]
    fn test_correlation_matches_by_containment() {
        let requested = vec![
            "linkedin.com/in/ada".to_string(),
            "https://ada.dev".to_string(),
            "https://linkedin.com/in/bo".to_string(),
        ];
        let pages = vec![
            page("https://ada.dev/about", "Personal site"),
            page("https://www.linkedin.com/in/ada/", "Ada's profile"),
            page("https://www.linkedin.com/in/bo/", "   "),
        ];

        let matched = correlate_by_url(&requested, &pages);
        assert_eq!(matched.len(), 3);
        assert_eq!(matched["linkedin.com/in/ada"].as_deref(), Some("Ada's profile"));
        assert_eq!(matched["https://ada.dev"].as_deref(), Some("Personal site"));
        assert_eq!(matched["https://linkedin.com/in/bo"], None);
    }

    #[test]
    fn test_correlation_does_not_cross_match_profiles() {
        let requested = vec!["linkedin.com/in/ada-smith".to_string()];
        let pages = vec![page("https://linkedin.com/in/ada", "wrong person")];

        assert_eq!(correlate_by_url(&requested, &pages)["linkedin.com/in/ada-smith"], None);
    }

    #[test]
    fn test_correlation_prefers_exact_profile_over_longer_one() {
        let requested = vec![
            "https://linkedin.com/in/ada".to_string(),
            "https://linkedin.com/in/ada-smith".to_string(),
        ];
        let pages = vec![
            page("https://linkedin.com/in/ada-smith", "SMITH"),
            page("https://linkedin.com/in/ada", "ADA"),
        ];

        let matched = correlate_by_url(&requested, &pages);
        assert_eq!(matched["https://linkedin.com/in/ada"].as_deref(), Some("ADA"));
        assert_eq!(matched["https://linkedin.com/in/ada-smith"].as_deref(), Some("SMITH"));
    }

    #[test]
    fn test_correlation_containment_requires_boundary() {
        let requested = vec!["https://linkedin.com/in/ada".to_string()];
        let pages = vec![
            page("https://linkedin.com/in/ada-smith", "SMITH"),
            page("https://linkedin.com/in/ada?trk=public", "ADA"),
        ];

        assert_eq!(
            correlate_by_url(&requested, &pages)["https://linkedin.com/in/ada"].as_deref(),
            Some("ADA")
        );
    }

    #[test]
    fn test_consolidate_hits_deduplicates() {
        let hit = |url: &str, raw: Option<&str>| SearchHit {
            title: None,
            url: url.to_string(),
            content: "snippet".to_string(),
            raw_content: raw.map(str::to_string),
        };

        let (context, unique) = consolidate_hits(vec![
            hit("https://a.com", Some("full a")),
            hit("https://a.com", Some("again")),
            hit("https://b.com", None),
        ]);

        assert_eq!(unique.len(), 2);
        assert!(context.contains("--- Source (URL: https://a.com) ---\nfull a"));
        assert!(context.contains("--- Source (URL: https://b.com) ---\nsnippet"));
        assert!(!context.contains("again"));
    }

    #[test]
    fn test_client_requires_api_key() {
        let config = SearchConfig::default();
        assert!(matches!(
            TavilyClient::new(&config),
            Err(RadarError::Config { .. })
        ));
    }
}
