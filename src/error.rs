use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;
use url::ParseError;

#[derive(Debug, Error)]
pub enum PrerenderError {
    #[error("Missing \"url\" query parameter")]
    MissingParameter,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Timed out after {timeout:?} while rendering {url}")]
    RenderTimeout { url: String, timeout: Duration },

    #[error("Failed to render {url}: {message}")]
    Render { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PrerenderError {
    pub fn render(url: impl Into<String>, cause: impl ToString) -> Self {
        PrerenderError::Render {
            url: url.into(),
            message: cause.to_string(),
        }
    }

    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PrerenderError::MissingParameter | PrerenderError::InvalidUrl(_) => {
                StatusCode::BAD_REQUEST
            }
            PrerenderError::Launch(_)
            | PrerenderError::RenderTimeout { .. }
            | PrerenderError::Render { .. }
            | PrerenderError::Io(_)
            | PrerenderError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Plain-text body served to the client. Server-side failure details stay
    /// in the logs; the caller only learns that rendering did not succeed.
    pub fn public_message(&self) -> &'static str {
        match self {
            PrerenderError::MissingParameter => "Missing \"url\" query parameter",
            PrerenderError::InvalidUrl(_) => "Invalid \"url\" query parameter",
            _ => "Failed to render page",
        }
    }
}

pub type Result<T> = std::result::Result<T, PrerenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameter_is_a_client_error_with_exact_body() {
        let err = PrerenderError::MissingParameter;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Missing \"url\" query parameter");
    }

    #[test]
    fn invalid_url_is_a_client_error() {
        let err = PrerenderError::from(url::Url::parse("not a url").unwrap_err());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn render_failures_map_to_500_and_hide_details() {
        let err = PrerenderError::render("https://example.com", "DNS lookup failed");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Failed to render page");
        assert!(err.to_string().contains("https://example.com"));
        assert!(err.to_string().contains("DNS lookup failed"));
    }

    #[test]
    fn timeout_carries_url_and_budget() {
        let err = PrerenderError::RenderTimeout {
            url: "https://example.com/slow".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("https://example.com/slow"));
    }

    #[test]
    fn launch_failure_is_a_server_error() {
        let err = PrerenderError::Launch("no usable Chromium found".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Failed to render page");
    }
}
