//! Shared HTTP plumbing for the REST-backed source clients

use radar_core::{ErrorContext, RadarError, RadarResult};
use std::collections::HashMap;

/// Configuration for API clients
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Access token for authentication
    pub access_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
    /// Additional headers
    pub headers: HashMap<String, String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            access_token: None,
            timeout_seconds: 30,
            user_agent: "radar/0.1".to_string(),
            headers: HashMap::new(),
        }
    }
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set additional header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// `base_url` joined with `endpoint`
    pub fn endpoint(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

/// Build an HTTP client with user agent, default headers and timeout
pub(crate) fn create_http_client(config: &ApiClientConfig) -> RadarResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            RadarError::Config {
                message: format!("Invalid user agent: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );

    for (key, value) in &config.headers {
        let header_name = reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            RadarError::Config {
                message: format!("Invalid header name '{}': {}", key, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?;

        let header_value =
            reqwest::header::HeaderValue::from_str(value).map_err(|e| RadarError::Config {
                message: format!("Invalid header value for '{}': {}", key, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            })?;

        headers.insert(header_name, header_value);
    }

    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .default_headers(headers)
        .build()
        .map_err(|e| RadarError::Config {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })
}

/// Map a transport-level failure
pub(crate) fn request_error(error: reqwest::Error, component: &str, operation: &str) -> RadarError {
    if error.is_timeout() {
        return RadarError::Timeout {
            operation: operation.to_string(),
            duration_ms: 0,
            context: ErrorContext::new(component).with_operation(operation),
        };
    }

    RadarError::Network {
        message: format!("Request failed: {}", error),
        source: Some(Box::new(error)),
        context: ErrorContext::new(component)
            .with_operation(operation)
            .with_suggestion("Check network connectivity and API status"),
    }
}

/// Parse `Retry-After` given in seconds
fn retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|secs| secs * 1000)
}

/// Map a non-success HTTP response onto the error taxonomy
pub(crate) async fn handle_response_error(
    response: reqwest::Response,
    component: &str,
    operation: &str,
) -> RadarError {
    let status = response.status();
    let url = response.url().clone();
    let retry_after = retry_after_ms(response.headers());

    let error_body = response.text().await.unwrap_or_default();
    let message = format!(
        "HTTP {} error for {}: {}",
        status.as_u16(),
        url,
        if error_body.is_empty() {
            status.canonical_reason().unwrap_or("Unknown error")
        } else {
            error_body.as_str()
        }
    );
    let context = ErrorContext::new(component)
        .with_operation(operation)
        .with_metadata("status", &status.as_u16().to_string());

    status_error(status.as_u16(), message, retry_after, context)
}

fn status_error(
    status: u16,
    message: String,
    retry_after_ms: Option<u64>,
    context: ErrorContext,
) -> RadarError {
    match status {
        401 | 403 => RadarError::Authentication {
            message,
            context: context.with_suggestion("Check the API key or token for this source"),
        },
        404 => RadarError::NotFound {
            resource: message,
            context: context.with_suggestion("Verify the profile URL or founder name"),
        },
        429 => RadarError::RateLimit {
            message,
            retry_after_ms,
            context: context.with_suggestion("Lower the pipeline concurrency limits"),
        },
        _ => RadarError::Network {
            message,
            source: None,
            context: context.with_suggestion("Check network connectivity and API status"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joining() {
        let config = ApiClientConfig::new("https://api.github.com/");
        assert_eq!(
            config.endpoint("/users/octocat"),
            "https://api.github.com/users/octocat"
        );
    }

    #[test]
    fn test_client_rejects_invalid_header() {
        let config = ApiClientConfig::new("https://example.com").with_header("bad header", "x");
        assert!(matches!(
            create_http_client(&config),
            Err(RadarError::Config { .. })
        ));
    }

    #[test]
    fn test_status_mapping() {
        let ctx = || ErrorContext::new("test");
        assert!(matches!(
            status_error(401, "nope".into(), None, ctx()),
            RadarError::Authentication { .. }
        ));
        assert!(matches!(
            status_error(404, "missing".into(), None, ctx()),
            RadarError::NotFound { .. }
        ));

        let limited = status_error(429, "slow down".into(), Some(3000), ctx());
        assert!(limited.is_recoverable());
        assert_eq!(limited.retry_delay_ms(), Some(3000));

        assert!(status_error(502, "bad gateway".into(), None, ctx()).is_recoverable());
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::RETRY_AFTER,
            reqwest::header::HeaderValue::from_static("7"),
        );
        assert_eq!(retry_after_ms(&headers), Some(7000));
    }
}
