//! Telemetry setup for clawcord.
//!
//! Console plus daily-rotated JSON file output, and scrubbing of tokens before they reach a log line.

pub mod logger;
pub mod redact;

pub use logger::{init_console_logger, init_logger};
pub use redact::redact_sensitive_data;
