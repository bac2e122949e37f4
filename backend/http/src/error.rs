use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Platform error code for "Missing Access", returned when the application
/// lacks the `applications.commands` scope in a guild.
pub const MISSING_ACCESS: u32 = 50001;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("missing access scope: {0}")]
    MissingScope(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: f64 },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    retry_after: Option<f64>,
}

impl HttpError {
    /// Classifies a non-success response by status and the platform's JSON error body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = if parsed.message.is_empty() {
            body.to_string()
        } else {
            parsed.message
        };

        match status {
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::FORBIDDEN if parsed.code == MISSING_ACCESS => Self::MissingScope(message),
            StatusCode::FORBIDDEN => Self::Forbidden(message),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited {
                retry_after: parsed.retry_after.unwrap_or(1.0),
            },
            other => Self::Status {
                status: other.as_u16(),
                message,
            },
        }
    }

    pub fn is_missing_scope(&self) -> bool {
        matches!(self, Self::MissingScope(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_scope_classification() {
        let err = HttpError::from_response(
            StatusCode::FORBIDDEN,
            r#"{"code": 50001, "message": "Missing Access"}"#,
        );
        assert!(err.is_missing_scope());

        let err = HttpError::from_response(
            StatusCode::FORBIDDEN,
            r#"{"code": 50013, "message": "Missing Permissions"}"#,
        );
        assert!(matches!(err, HttpError::Forbidden(m) if m == "Missing Permissions"));
    }

    #[test]
    fn test_rate_limit_and_plain_bodies() {
        let err = HttpError::from_response(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"message": "You are being rate limited.", "retry_after": 2.5, "global": false}"#,
        );
        assert!(matches!(err, HttpError::RateLimited { retry_after } if retry_after == 2.5));

        let err = HttpError::from_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, HttpError::Status { status: 502, ref message } if message == "upstream down"));

        assert!(HttpError::from_response(StatusCode::NOT_FOUND, "").is_not_found());
    }
}
