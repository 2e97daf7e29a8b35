use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            400 | 409 | 422 => Self::Validation,
            429 => Self::RateLimited,
            _ => Self::Internal,
        }
    }

    pub fn requires_reauth(self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden)
    }
}

/// A non-2xx answer from the sessions API.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code:?} ({status}): {}", .message.as_deref().unwrap_or("no message"))]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: u16,
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(status: u16, message: Option<String>) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            status,
            message,
        }
    }

    /// Builds the error from a status code and whatever JSON body came with
    /// it; the server puts its text under `message` or `error`.
    pub fn from_response(status: u16, body: &Value) -> Self {
        Self::new(status, extract_message(body))
    }
}

pub fn extract_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .filter_map(|key| body.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn classifies_status_codes() {
        assert_eq!(ErrorCode::from_status(401), ErrorCode::Unauthorized);
        assert_eq!(ErrorCode::from_status(422), ErrorCode::Validation);
        assert_eq!(ErrorCode::from_status(502), ErrorCode::Internal);
        assert!(ErrorCode::Forbidden.requires_reauth());
    }

    #[test]
    fn reads_message_then_error_field() {
        let err = ApiError::from_response(400, &json!({"message": "Already clocked in"}));
        assert_eq!(err.message.as_deref(), Some("Already clocked in"));

        let err = ApiError::from_response(500, &json!({"message": "", "error": "boom"}));
        assert_eq!(err.message.as_deref(), Some("boom"));

        let err = ApiError::from_response(500, &Value::Null);
        assert!(err.message.is_none());
    }
}
