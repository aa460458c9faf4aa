//! Radar Sources - clients for the external services founder research depends on
//!
//! Every client implements [`SourceClient`] (or [`ChatModel`] for the LLM) and reports
//! failures as [`radar_core::RadarError`]; turning those into per-source results is the
//! pipeline's job.

pub mod github;
mod http;
pub mod llm;
pub mod openalex;
pub mod search;
pub mod source;

pub use github::{GitHubClient, GitHubProfile, RepositorySummary};
pub use http::ApiClientConfig;
pub use llm::{extract_json, parse_reply, ChatModel, Completion, LlmGateway, SiumaiChatModel};
pub use openalex::{AuthorMetrics, OpenAlexClient};
pub use search::{correlate_by_url, normalize_url, SearchHit, TavilyClient};
pub use source::{BatchResults, SourceClient, SourceRequest};
