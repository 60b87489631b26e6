use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

/// Failures that end a single request. None of them end the session.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// The channel to the page or the service failed to deliver
    #[error("transport error: {0}")]
    Transport(String),

    /// Code running inside the page threw; carries the thrown message
    #[error("{0}")]
    Target(String),

    /// Non-2xx or malformed reply from the generation service
    #[error("{0}")]
    Service(String),

    /// Settings are missing or invalid; raised before any network call
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No reply arrived within the deadline
    #[error("timed out after {} seconds without a reply", .0.as_secs_f64())]
    Timeout(Duration),
}

impl AgentError {
    /// Short category label used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Transport(_) => "transport",
            AgentError::Target(_) => "target",
            AgentError::Service(_) => "service",
            AgentError::Configuration(_) => "configuration",
            AgentError::Timeout(_) => "timeout",
        }
    }
}

impl From<fantoccini::error::CmdError> for AgentError {
    fn from(err: fantoccini::error::CmdError) -> Self {
        AgentError::Transport(err.to_string())
    }
}

impl From<fantoccini::error::NewSessionError> for AgentError {
    fn from(err: fantoccini::error::NewSessionError) -> Self {
        AgentError::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key
        AgentError::Transport(err.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_is_verbatim() {
        let err = AgentError::Service("quota exceeded".to_string());
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(err.kind(), "service");
    }

    #[test]
    fn test_timeout_message() {
        let err = AgentError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "timed out after 10 seconds without a reply");
    }
}
