//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Completion service error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Completion service unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limited by the completion service
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication with the completion service failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A tool call's argument payload is not a JSON object
    #[error("Invalid arguments for tool '{tool}': {source}")]
    ArgumentDecode {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    /// A tool's `execute` returned an error
    #[error("Tool '{tool}' failed: {source}")]
    ToolExecution {
        tool: String,
        #[source]
        source: anyhow::Error,
    },

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The run was cancelled by the caller or the stream was dropped
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Whether the error came from the remote completion service
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Provider(_) | Self::ProviderUnavailable(_) | Self::RateLimited(_) | Self::Auth(_)
        )
    }

    /// Check if error is retryable.
    ///
    /// The orchestrator never retries; this is for callers that wrap a run
    /// in their own retry policy.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_) | Self::RateLimited(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            Self::ArgumentDecode { tool, .. } => {
                format!("The model sent malformed arguments to '{tool}'.")
            }
            Self::ToolExecution { tool, source } => format!("Tool '{tool}' failed: {source}"),
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::Cancelled => "The request was cancelled.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
