//! Unified error handling system
//!
//! Structured error types with context and recovery suggestions. Errors raised by source
//! clients never cross the research boundary as `Err`; they are folded into
//! [`crate::SourceResult::Failure`] by the caller, so the variants here mostly describe *why*
//! a single external call failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};

pub type RadarResult<T> = Result<T, RadarError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the radar system
#[derive(Error, Debug)]
pub enum RadarError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        context: ErrorContext,
    },

    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after_ms: Option<u64>,
        context: ErrorContext,
    },

    #[error("Operation timeout: {operation} after {duration_ms}ms")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("Resource not found: {resource}")]
    NotFound {
        resource: String,
        context: ErrorContext,
    },

    #[error("{source_name} lookup failed for {identifier}: {message}")]
    Source {
        source_name: String,
        identifier: String,
        message: String,
        context: ErrorContext,
    },

    #[error("LLM error: {message}")]
    Llm {
        message: String,
        provider: Option<String>,
        model: Option<String>,
        context: ErrorContext,
    },

    #[error("Malformed response: {message}")]
    MalformedResponse {
        message: String,
        raw: Option<String>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },
}

impl RadarError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            RadarError::Config { context, .. } => Some(context),
            RadarError::Validation { context, .. } => Some(context),
            RadarError::Network { context, .. } => Some(context),
            RadarError::Authentication { context, .. } => Some(context),
            RadarError::RateLimit { context, .. } => Some(context),
            RadarError::Timeout { context, .. } => Some(context),
            RadarError::NotFound { context, .. } => Some(context),
            RadarError::Source { context, .. } => Some(context),
            RadarError::Llm { context, .. } => Some(context),
            RadarError::MalformedResponse { context, .. } => Some(context),
            RadarError::Internal { context, .. } => Some(context),
            RadarError::Io(_) | RadarError::Serialization(_) => None,
        }
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RadarError::Network { .. } | RadarError::Timeout { .. } | RadarError::RateLimit { .. }
        )
    }

    /// Get retry delay in milliseconds for recoverable errors
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            RadarError::Network { .. } => Some(1000),
            RadarError::Timeout { .. } => Some(2000),
            RadarError::RateLimit { retry_after_ms, .. } => retry_after_ms.or(Some(5000)),
            _ => None,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        let error_id = self.context().map(|c| c.error_id.as_str());
        if self.is_recoverable() {
            warn!(
                error_id = ?error_id,
                error = %self,
                "Network, timeout or rate limit error (may be recoverable)"
            );
        } else {
            match self {
                RadarError::Config { .. } | RadarError::Validation { .. } => {
                    error!(error_id = ?error_id, error = %self, "Configuration or validation error");
                }
                _ => {
                    error!(error_id = ?error_id, error = %self, "Error occurred");
                }
            }
        }
    }

    pub fn internal<S: Into<String>>(message: S, component: &str) -> Self {
        RadarError::Internal {
            message: message.into(),
            source: None,
            context: ErrorContext::new(component),
        }
    }

    pub fn malformed<S: Into<String>>(message: S, raw: Option<String>, component: &str) -> Self {
        RadarError::MalformedResponse {
            message: message.into(),
            raw,
            context: ErrorContext::new(component)
                .with_suggestion("Inspect the raw response in the audit log"),
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::RadarError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file")
                .with_suggestion("Run 'radar config --init' to create a default config"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::RadarError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}

#[macro_export]
macro_rules! source_error {
    ($source_name:expr, $identifier:expr, $msg:expr) => {
        $crate::RadarError::Source {
            source_name: $source_name.to_string(),
            identifier: $identifier.to_string(),
            message: $msg.to_string(),
            context: $crate::ErrorContext::new($source_name),
        }
    };
}

#[macro_export]
macro_rules! not_found_error {
    ($resource:expr, $component:expr) => {
        $crate::RadarError::NotFound {
            resource: $resource.to_string(),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Verify the profile URL or founder name"),
        }
    };
}
