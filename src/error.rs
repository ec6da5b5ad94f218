//! Error types for poster generation.

use std::time::Duration;

/// Generic message shown when the gallery slot cannot be written.
pub const GALLERY_FULL_MESSAGE: &str =
    "The gallery is full. Remove older items to save new ones.";

/// Errors raised by a [`Storage`](crate::gallery::Storage) backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The write would exceed the configured quota.
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    /// Underlying I/O failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while generating, animating or saving posters.
#[derive(Debug, thiserror::Error)]
pub enum PosterError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Video polling ran out of attempts or time.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled a running operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The model answered without an image part.
    #[error("no image in response{}", reason_suffix(.reason))]
    NoImage { reason: Option<String> },

    /// Invalid request parameters or preconditions.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {}", sanitize_error_message(&.0.to_string()))]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 or data URI payloads.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Image decoding/encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error (e.g., reading the upload or writing a download).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Gallery persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Response did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Video generation specific error.
    #[error("video generation failed: {0}")]
    VideoGeneration(String),
}

impl PosterError {
    /// Rewrites the error into the message shown to the user.
    ///
    /// Known failure classes (authentication, safety filters, full gallery)
    /// get a fixed wording; everything else passes its display text through.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(_) => AUTH_MESSAGE.to_string(),
            Self::ContentBlocked(_) => SAFETY_MESSAGE.to_string(),
            Self::Storage(_) => GALLERY_FULL_MESSAGE.to_string(),
            Self::NoImage { reason } => match reason.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => rewrite_known(text)
                    .map(str::to_string)
                    .unwrap_or_else(|| text.to_string()),
                _ => "Failed to generate image.".to_string(),
            },
            Self::Cancelled => "The operation was cancelled.".to_string(),
            other => {
                let text = sanitize_error_message(&other.to_string());
                rewrite_known(&text).map(str::to_string).unwrap_or(text)
            }
        }
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {r}"))
        .unwrap_or_default()
}

const AUTH_MESSAGE: &str = "Authentication failed. Check that a valid API key is configured.";
const SAFETY_MESSAGE: &str =
    "The request was blocked by safety filters. Try another photo or prompt.";

fn rewrite_known(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    if lower.contains("api key")
        || lower.contains("api_key")
        || lower.contains("permission_denied")
        || lower.contains("unauthenticated")
    {
        return Some(AUTH_MESSAGE);
    }
    if lower.contains("safety") || lower.contains("prohibited") || lower.contains("blocked") {
        return Some(SAFETY_MESSAGE);
    }
    None
}

/// Parses the `Retry-After` header as whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Maximum length of an API error body kept in error messages.
const MAX_ERROR_LEN: usize = 500;

/// Removes echoed API keys and truncates long error bodies.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let mut out = String::with_capacity(text.len().min(MAX_ERROR_LEN));
    let mut rest = text;
    while let Some(pos) = rest.find("key=") {
        out.push_str(&rest[..pos + 4]);
        out.push_str("[REDACTED]");
        let tail = &rest[pos + 4..];
        let end = tail
            .find(|c: char| matches!(c, '&' | '"' | ')') || c.is_whitespace())
            .unwrap_or(tail.len());
        rest = &tail[end..];
    }
    out.push_str(rest);

    if out.chars().count() > MAX_ERROR_LEN {
        let truncated: String = out.chars().take(MAX_ERROR_LEN).collect();
        return format!("{truncated}...");
    }
    out
}

/// Result type alias for poster operations.
pub type Result<T> = std::result::Result<T, PosterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PosterError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = PosterError::NoImage { reason: None };
        assert_eq!(err.to_string(), "no image in response");

        let err = PosterError::NoImage {
            reason: Some("I can't help with that".into()),
        };
        assert_eq!(err.to_string(), "no image in response: I can't help with that");
    }

    #[test]
    fn test_user_message_rewrites_known_classes() {
        assert_eq!(PosterError::Auth("401".into()).user_message(), AUTH_MESSAGE);
        assert_eq!(
            PosterError::ContentBlocked("IMAGE_SAFETY".into()).user_message(),
            SAFETY_MESSAGE
        );
        let api = PosterError::Api {
            status: 400,
            message: "API key not valid. Please pass a valid API key.".into(),
        };
        assert_eq!(api.user_message(), AUTH_MESSAGE);

        let quota = PosterError::Storage(StorageError::QuotaExceeded {
            needed: 10,
            quota: 5,
        });
        assert_eq!(quota.user_message(), GALLERY_FULL_MESSAGE);
    }

    #[test]
    fn test_user_message_no_image() {
        assert_eq!(
            PosterError::NoImage { reason: None }.user_message(),
            "Failed to generate image."
        );
        assert_eq!(
            PosterError::NoImage {
                reason: Some("  ".into())
            }
            .user_message(),
            "Failed to generate image."
        );
        assert_eq!(
            PosterError::NoImage {
                reason: Some("I can only edit product photos.".into())
            }
            .user_message(),
            "I can only edit product photos."
        );
        assert_eq!(
            PosterError::NoImage {
                reason: Some("Blocked for safety reasons".into())
            }
            .user_message(),
            SAFETY_MESSAGE
        );
    }

    #[test]
    fn test_user_message_passes_other_errors_through() {
        let err = PosterError::VideoGeneration("quota exhausted".into());
        assert_eq!(err.user_message(), "video generation failed: quota exhausted");
    }

    #[test]
    fn test_user_message_redacts_keys() {
        let err = PosterError::VideoGeneration(
            "could not fetch (https://x/files/v:download?alt=media&key=SECRET123)".into(),
        );
        let msg = err.user_message();
        assert!(!msg.contains("SECRET123"));
        assert!(msg.ends_with("key=[REDACTED])"));
    }

    #[test]
    fn test_sanitize_redacts_keys() {
        let text = r#"{"url": "https://x/files/abc?alt=media&key=SECRET123"}"#;
        let clean = sanitize_error_message(text);
        assert!(!clean.contains("SECRET123"));
        assert!(clean.contains("key=[REDACTED]"));
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(2000);
        let clean = sanitize_error_message(&long);
        assert!(clean.len() <= MAX_ERROR_LEN + 3);
        assert!(clean.ends_with("..."));
    }
}
