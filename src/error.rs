use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Typed error hierarchy for the catalog pipeline and its collaborators.
///
/// Expected "no data" outcomes (an empty search, a missing video, a video
/// without captions) are not represented here; those are `Ok` values.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request failed (status {status}): {message}")]
    Http { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Malformed record file {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Yaml(String),

    #[error("{0}")]
    Json(String),

    #[error("{0}")]
    Other(String),
}

impl CatalogError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

// ── From impls ─────────────────────────────────────────────────────────────

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => CatalogError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None if e.is_decode() => CatalogError::Parse(e.to_string()),
            None => CatalogError::Network(e.to_string()),
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        CatalogError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for CatalogError {
    fn from(e: serde_yaml::Error) -> Self {
        CatalogError::Yaml(e.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Json(e.to_string())
    }
}

impl From<feed_rs::parser::ParseFeedError> for CatalogError {
    fn from(e: feed_rs::parser::ParseFeedError) -> Self {
        CatalogError::Parse(format!("parsing feed: {}", e))
    }
}

impl From<quick_xml::Error> for CatalogError {
    fn from(e: quick_xml::Error) -> Self {
        CatalogError::Parse(format!("decoding XML: {}", e))
    }
}

/// Allows `.ok_or_else(|| format!(…))?` to coerce into CatalogError.
impl From<String> for CatalogError {
    fn from(s: String) -> Self {
        CatalogError::Other(s)
    }
}

/// Allows `.ok_or("literal string")?` to coerce into CatalogError.
impl From<&str> for CatalogError {
    fn from(s: &str) -> Self {
        CatalogError::Other(s.to_string())
    }
}
