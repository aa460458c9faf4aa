//! GitHub REST API client
//!
//! Turns a GitHub profile URL into a structured profile: account details plus the
//! founder's most starred own repositories and a language histogram.

use crate::http::{create_http_client, handle_response_error, request_error, ApiClientConfig};
use crate::source::{SourceClient, SourceRequest};
use async_trait::async_trait;
use radar_core::{source_error, GitHubConfig, RadarError, RadarResult, SourcePayload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

const COMPONENT: &str = "github_client";

/// GitHub user response
#[derive(Debug, Clone, Deserialize)]
struct GitHubUser {
    login: String,
    name: Option<String>,
    bio: Option<String>,
    company: Option<String>,
    location: Option<String>,
    blog: Option<String>,
    #[serde(default)]
    followers: u64,
    #[serde(default)]
    following: u64,
    #[serde(default)]
    public_repos: u64,
    created_at: Option<String>,
}

/// GitHub repository response
#[derive(Debug, Clone, Deserialize)]
struct GitHubRepository {
    name: String,
    description: Option<String>,
    language: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    fork: bool,
    pushed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub pushed_at: Option<String>,
}

/// Structured GitHub profile placed in the dossier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubProfile {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub blog: Option<String>,
    pub followers: u64,
    pub following: u64,
    pub public_repos: u64,
    pub created_at: Option<String>,
    /// Stars across the user's own (non-fork) repositories
    pub total_stars: u64,
    /// Own repositories per primary language
    pub languages: BTreeMap<String, u64>,
    pub top_repositories: Vec<RepositorySummary>,
}

/// GitHub API client
pub struct GitHubClient {
    client: reqwest::Client,
    config: ApiClientConfig,
    max_repos: usize,
}

impl GitHubClient {
    pub fn new(github: &GitHubConfig) -> RadarResult<Self> {
        let mut config = ApiClientConfig::new(&github.base_url)
            .with_token(github.token.clone().filter(|t| !t.trim().is_empty()))
            .with_user_agent(&github.user_agent)
            .with_timeout(github.timeout_secs)
            .with_header("Accept", "application/vnd.github+json");
        if let Some(token) = config.access_token.clone() {
            config = config.with_header("Authorization", format!("Bearer {}", token));
        }
        let client = create_http_client(&config)?;

        info!(
            authenticated = config.access_token.is_some(),
            "Created GitHub API client for {}", config.base_url
        );

        Ok(Self {
            client,
            config,
            max_repos: github.max_repos,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, endpoint: &str) -> RadarResult<T> {
        let url = self.config.endpoint(endpoint);
        debug!("Making GitHub API request to: {}", url);

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
                format!("Unexpected GitHub response for {}: {}", endpoint, e),
                Some(text),
                COMPONENT,
            )
        })
    }

    /// Fetch and summarise a user's public profile
    pub async fn profile(&self, login: &str) -> RadarResult<GitHubProfile> {
        let login = urlencoding::encode(login);
        let user: GitHubUser = self.get_json(&format!("users/{}", login)).await?;
        let repos: Vec<GitHubRepository> = self
            .get_json(&format!("users/{}/repos?per_page=100&sort=pushed", login))
            .await?;

        Ok(summarize(user, repos, self.max_repos))
    }
}

fn summarize(user: GitHubUser, repos: Vec<GitHubRepository>, max_repos: usize) -> GitHubProfile {
    let mut own: Vec<GitHubRepository> = repos.into_iter().filter(|r| !r.fork).collect();
    own.sort_by(|a, b| {
        b.stargazers_count
            .cmp(&a.stargazers_count)
            .then_with(|| a.name.cmp(&b.name))
    });

    let total_stars = own.iter().map(|r| r.stargazers_count).sum();
    let mut languages = BTreeMap::new();
    for language in own.iter().filter_map(|r| r.language.clone()) {
        *languages.entry(language).or_insert(0) += 1;
    }

    let top_repositories = own
        .into_iter()
        .take(max_repos)
        .map(|r| RepositorySummary {
            name: r.name,
            description: r.description,
            language: r.language,
            stars: r.stargazers_count,
            forks: r.forks_count,
            pushed_at: r.pushed_at,
        })
        .collect();

    GitHubProfile {
        login: user.login,
        name: user.name,
        bio: user.bio,
        company: user.company,
        location: user.location,
        blog: user.blog.filter(|b| !b.is_empty()),
        followers: user.followers,
        following: user.following,
        public_repos: user.public_repos,
        created_at: user.created_at,
        total_stars,
        languages,
        top_repositories,
    }
}

/// Extract the account name from a GitHub profile URL
pub fn parse_login(profile_url: &str) -> Option<String> {
    let trimmed = profile_url.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = url::Url::parse(&with_scheme).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.");
    if host != "github.com" {
        return None;
    }

    parsed
        .path_segments()?
        .find(|segment| !segment.is_empty())
        .filter(|segment| {
            segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
        .map(str::to_string)
}

#[async_trait]
impl SourceClient for GitHubClient {
    fn name(&self) -> &str {
        "GitHub"
    }

    async fn fetch(&self, request: &SourceRequest) -> RadarResult<SourcePayload> {
        let login = parse_login(&request.identifier).ok_or_else(|| {
            source_error!(
                self.name(),
                request.identifier,
                "not a GitHub profile URL"
            )
        })?;

        let profile = self.profile(&login).await?;
        Ok(SourcePayload::Structured(serde_json::to_value(profile)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str, stars: u64, language: Option<&str>, fork: bool) -> GitHubRepository {
        GitHubRepository {
            name: name.to_string(),
            description: None,
            language: language.map(str::to_string),
            stargazers_count: stars,
            forks_count: 0,
            fork,
            pushed_at: None,
        }
    }

    #[test]
    fn test_parse_login() {
        assert_eq!(parse_login("https://github.com/octocat").as_deref(), Some("octocat"));
        assert_eq!(parse_login("github.com/a").as_deref(), Some("a"));
        assert_eq!(
            parse_login("https://www.github.com/some-dev/repo?tab=stars").as_deref(),
            Some("some-dev")
        );
        assert_eq!(parse_login("https://gitlab.com/octocat"), None);
        assert_eq!(parse_login("https://github.com/"), None);
    }

    #[test]
    fn test_summary_ranks_own_repositories_by_stars() {
        let user: GitHubUser = serde_json::from_value(serde_json::json!({
            "login": "ada",
            "name": "Ada",
            "blog": "",
            "followers": 42,
            "public_repos": 4
        }))
        .unwrap();

        let profile = summarize(
            user,
            vec![
                repo("small", 1, Some("Rust"), false),
                repo("forked-big", 900, Some("C"), true),
                repo("big", 120, Some("Rust"), false),
                repo("mid", 30, Some("Python"), false),
            ],
            2,
        );

        assert_eq!(profile.total_stars, 151);
        assert_eq!(profile.blog, None);
        let names: Vec<_> = profile.top_repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["big", "mid"]);
        assert_eq!(profile.languages.get("Rust"), Some(&2));
        assert!(!profile.languages.contains_key("C"));
    }

    #[tokio::test]
    async fn test_non_github_identifier_is_a_source_error() {
        let client = GitHubClient::new(&GitHubConfig::default()).unwrap();
        let request = SourceRequest {
            kind: radar_core::SourceKind::GitHub,
            identifier: "https://example.com/ada".to_string(),
            founder_name: "Ada".to_string(),
            affiliation: None,
        };

        assert!(matches!(
            client.fetch(&request).await,
            Err(RadarError::Source { .. })
        ));
    }
}
