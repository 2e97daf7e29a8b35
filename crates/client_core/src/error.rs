use shared::error::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no authentication token found")]
    MissingCredentials,
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} answered with {source}")]
    Api {
        endpoint: String,
        #[source]
        source: ApiError,
    },
    #[error("{endpoint} rejected the request: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        endpoint: String,
        message: Option<String>,
    },
    #[error("malformed payload from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },
    #[error("invalid API base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("{action} is not available to {kind} principals")]
    NotPermitted {
        action: &'static str,
        kind: shared::domain::PrincipalKind,
    },
    #[error("credential store error: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential store is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Text shown to the user for a failed write; the server's own message
    /// wins when it sent one.
    pub fn user_message(&self, fallback: &str) -> String {
        let server_message = match self {
            Self::Api { source, .. } => source.message.as_deref(),
            Self::Rejected { message, .. } => message.as_deref(),
            _ => None,
        };
        server_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }

    pub fn requires_reauth(&self) -> bool {
        match self {
            Self::MissingCredentials => true,
            Self::Api { source, .. } => source.code.requires_reauth(),
            _ => false,
        }
    }
}
