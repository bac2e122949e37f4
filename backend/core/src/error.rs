use thiserror::Error;

/// Top-level error type for payload decoding and shared model handling.
#[derive(Debug, Error)]
pub enum ClawcordError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("unknown {kind} value: {value}")]
    UnknownEnumValue { kind: &'static str, value: u8 },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
