//! Async utilities and patterns
//!
//! Retry with backoff, timeouts, order-preserving bounded concurrency and rate limiting.

use crate::error::{ErrorContext, RadarError, RadarResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinError;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, warn};

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first call included
    pub max_attempts: usize,
    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Backoff multiplier (exponential backoff)
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Retry an async operation with exponential backoff.
///
/// Only recoverable errors (network, timeout, rate limit) are retried; a rate limit
/// `retry_after` hint overrides the computed delay when it is longer.
pub async fn retry_async<F, Fut, T>(
    mut operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> RadarResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RadarResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms;

    loop {
        attempt += 1;

        debug!(
            operation = operation_name,
            attempt = attempt,
            max_attempts = max_attempts,
            "Attempting operation"
        );

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if !error.is_recoverable() {
                    return Err(error);
                }

                if attempt >= max_attempts {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        error = %error,
                        "Operation failed after all retry attempts"
                    );
                    return Err(error);
                }

                let mut actual_delay = if config.jitter {
                    let jitter_factor = 0.1;
                    let jitter = (fastrand::f64() - 0.5) * 2.0 * jitter_factor;
                    ((delay as f64) * (1.0 + jitter)) as u64
                } else {
                    delay
                };
                if let RadarError::RateLimit {
                    retry_after_ms: Some(hint),
                    ..
                } = &error
                {
                    actual_delay = actual_delay.max(*hint).min(config.max_delay_ms);
                }

                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %error,
                    delay_ms = actual_delay,
                    "Operation failed, retrying"
                );

                sleep(Duration::from_millis(actual_delay)).await;

                delay = ((delay as f64) * config.backoff_multiplier) as u64;
                delay = delay.min(config.max_delay_ms);
            }
        }
    }
}

/// Timeout wrapper for async operations
pub async fn with_timeout<F, T>(future: F, timeout_ms: u64, operation_name: &str) -> RadarResult<T>
where
    F: Future<Output = T>,
{
    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => Ok(result),
        Err(_) => Err(RadarError::Timeout {
            operation: operation_name.to_string(),
            duration_ms: timeout_ms,
            context: ErrorContext::new("async_utils")
                .with_operation("timeout")
                .with_metadata("timeout_ms", &timeout_ms.to_string())
                .with_suggestion("Increase the timeout in the pipeline configuration")
                .with_suggestion("Check network connectivity"),
        }),
    }
}

/// Best-effort text of a task panic
pub fn panic_message(join_error: JoinError) -> String {
    if join_error.is_cancelled() {
        return "task was cancelled".to_string();
    }
    let payload = join_error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}

/// Concurrent processing with controlled parallelism.
///
/// Every item runs in its own task so a panic stays contained; results come back in
/// input order, a panicked item as `RadarError::Internal` carrying the panic message.
pub async fn process_concurrently<T, R, F, Fut>(
    items: Vec<T>,
    max_concurrent: usize,
    processor: F,
) -> Vec<RadarResult<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = RadarResult<R>> + Send + 'static,
{
    use futures::stream::{self, StreamExt};

    stream::iter(items)
        .map(|item| {
            let processor = processor.clone();
            tokio::spawn(async move { processor(item).await })
        })
        .buffered(max_concurrent.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .map(|join_result| match join_result {
            Ok(result) => result,
            Err(join_error) => Err(RadarError::Internal {
                message: panic_message(join_error),
                source: None,
                context: ErrorContext::new("async_utils")
                    .with_operation("process_concurrently")
                    .with_suggestion("Check for panics in concurrent tasks"),
            }),
        })
        .collect()
}

/// Rate limiter for API calls
#[derive(Debug)]
pub struct RateLimiter {
    permits: Arc<tokio::sync::Semaphore>,
    min_interval: Duration,
    last_request: Arc<tokio::sync::Mutex<Option<tokio::time::Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(max_concurrent: usize, min_interval_ms: u64) -> Self {
        Self {
            permits: Arc::new(tokio::sync::Semaphore::new(max_concurrent.max(1))),
            min_interval: Duration::from_millis(min_interval_ms),
            last_request: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Acquire a permit and enforce rate limiting
    pub async fn acquire(&self) -> RadarResult<RateLimitGuard> {
        let permit =
            self.permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| RadarError::Internal {
                    message: format!("Failed to acquire rate limit permit: {}", e),
                    source: Some(Box::new(e)),
                    context: ErrorContext::new("rate_limiter").with_operation("acquire"),
                })?;

        // Enforce minimum interval
        let mut last_request = self.last_request.lock().await;
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let sleep_duration = self.min_interval - elapsed;
                debug!(
                    sleep_ms = sleep_duration.as_millis(),
                    "Rate limiting: sleeping to enforce minimum interval"
                );
                sleep(sleep_duration).await;
            }
        }
        *last_request = Some(tokio::time::Instant::now());

        Ok(RateLimitGuard { _permit: permit })
    }
}

/// RAII guard for rate limiter permits
pub struct RateLimitGuard {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
