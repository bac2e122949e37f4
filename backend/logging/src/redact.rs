//! Log Redaction Layer
//!
//! Scrubs bot tokens, bearer tokens and webhook/interaction tokens from strings prior to logging.

use regex::Regex;
use once_cell::sync::Lazy;

static BOT_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:Bot|Bearer)\s+[A-Za-z0-9\-\._~+/]+=*").unwrap()
});
// Raw bot tokens: base64 user id, timestamp, HMAC separated by dots.
static RAW_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[MNO][A-Za-z\d_-]{23,27}\.[A-Za-z\d_-]{6}\.[A-Za-z\d_-]{27,40}").unwrap()
});
static CALLBACK_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(webhooks|interactions)/(\d+)/[A-Za-z0-9_\-\.]+").unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let mut redacted = BOT_TOKEN_RE
        .replace_all(input, "[REDACTED_TOKEN]")
        .to_string();

    redacted = RAW_TOKEN_RE
        .replace_all(&redacted, "[REDACTED_TOKEN]")
        .to_string();

    // Keep the id so failures stay traceable
    redacted = CALLBACK_TOKEN_RE
        .replace_all(&redacted, "/$1/$2/[REDACTED_TOKEN]")
        .to_string();

    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_authorization_values() {
        let raw = "header Authorization: Bot abc.DEF-123_xyz sent";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("abc.DEF-123_xyz"));
        assert!(clean.contains("[REDACTED_TOKEN]"));

        let clean = redact_sensitive_data("Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9");
        assert_eq!(clean, "[REDACTED_TOKEN]");
    }

    #[test]
    fn test_redacts_raw_bot_token() {
        let raw = "token=MTA4NzY1NDMyMTA5ODc2NTQzMg.GhIjKl.abcdefghijklmnopqrstuvwxyz01234";
        let clean = redact_sensitive_data(raw);
        assert_eq!(clean, "token=[REDACTED_TOKEN]");
    }

    #[test]
    fn test_redacts_callback_token_keeps_id() {
        let raw = "POST /interactions/1234/aW50ZXJhY3Rpb24.token/callback failed";
        let clean = redact_sensitive_data(raw);
        assert_eq!(clean, "POST /interactions/1234/[REDACTED_TOKEN]/callback failed");
    }

    #[test]
    fn test_plain_text_untouched() {
        let raw = "command ping registered in guild 42";
        assert_eq!(redact_sensitive_data(raw), raw);
    }
}
