use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The image sources this tool can review. Adding a fifth provider means
/// adding a variant here, an adapter module under `providers/`, and a
/// registry entry; nothing else in the crate dispatches on strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Pexels,
    Pixabay,
    Unsplash,
    Flickr,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Pexels => "pexels",
            ProviderKind::Pixabay => "pixabay",
            ProviderKind::Unsplash => "unsplash",
            ProviderKind::Flickr => "flickr",
        }
    }

    pub fn all() -> [ProviderKind; 4] {
        [
            ProviderKind::Pexels,
            ProviderKind::Pixabay,
            ProviderKind::Unsplash,
            ProviderKind::Flickr,
        ]
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pexels" => Ok(ProviderKind::Pexels),
            "pixabay" => Ok(ProviderKind::Pixabay),
            "unsplash" => Ok(ProviderKind::Unsplash),
            "flickr" => Ok(ProviderKind::Flickr),
            other => Err(CuratorError::UnknownProvider {
                name: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Pending,
    Approved,
    Rejected,
}

impl ImageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStatus::Pending => "pending",
            ImageStatus::Approved => "approved",
            ImageStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ImageStatus {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ImageStatus::Pending),
            "approved" => Ok(ImageStatus::Approved),
            "rejected" => Ok(ImageStatus::Rejected),
            other => Err(CuratorError::General(format!(
                "unknown image status: {other}"
            ))),
        }
    }
}

/// One entry of the ordered term list the operator walks through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTerm {
    pub id: i64,
    pub term: String,
    pub created_at: DateTime<Utc>,
}

/// An image record as handed to the store on accept. The store assigns the
/// row id and timestamp.
#[derive(Debug, Clone)]
pub struct NewImageRecord {
    pub source_id: String,
    pub source_api: ProviderKind,
    pub url_original: Option<String>,
    pub url_thumbnail: Option<String>,
    pub url_page: Option<String>,
    pub extension: Option<String>,
    pub status: ImageStatus,
    pub term_id: i64,
}

/// A stored image record. `(source_id, source_api)` is unique across the
/// table, which is what prevents accepting the same remote image twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub source_id: String,
    pub source_api: ProviderKind,
    pub url_original: Option<String>,
    pub url_thumbnail: Option<String>,
    pub url_page: Option<String>,
    pub extension: Option<String>,
    pub file_path: Option<String>,
    pub status: ImageStatus,
    pub term_id: i64,
    pub created_at: DateTime<Utc>,
}

/// The URL variant chosen for download, with the probed size.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadVariant {
    pub url: String,
    pub size_kb: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum CuratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("search term not found: {term}")]
    TermNotFound { term: String },

    #[error("image {source_id} from {source_api} is already stored")]
    DuplicateImage {
        source_id: String,
        source_api: String,
    },

    #[error("stale or expired link: {url}")]
    StaleLink { url: String },

    #[error("unknown provider: {name}")]
    UnknownProvider { name: String },

    #[error("{0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, CuratorError>;
