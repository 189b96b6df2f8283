use crate::config::CuratorConfig;
use crate::providers::{CandidateImage, ImageProvider};
use crate::types::{ImageStatus, NewImageRecord, ProviderKind};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{error, info, warn};

const DEFAULT_API_URL: &str = "https://pixabay.com/api/";

/// Mirror of one Pixabay hit. The API is flat camelCase with a few
/// snake_case stragglers, hence the per-field renames.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PixabayImage {
    pub id: u64,
    #[serde(rename = "pageURL")]
    pub page_url: String,
    #[serde(rename = "type")]
    pub image_type: String,
    pub tags: String,
    #[serde(rename = "previewURL")]
    pub preview_url: String,
    #[serde(rename = "previewWidth")]
    pub preview_width: u32,
    #[serde(rename = "previewHeight")]
    pub preview_height: u32,
    #[serde(rename = "webformatURL")]
    pub webformat_url: String,
    #[serde(rename = "webformatWidth")]
    pub webformat_width: u32,
    #[serde(rename = "webformatHeight")]
    pub webformat_height: u32,
    #[serde(rename = "largeImageURL")]
    pub large_image_url: String,
    #[serde(rename = "imageWidth")]
    pub image_width: u32,
    #[serde(rename = "imageHeight")]
    pub image_height: u32,
    #[serde(rename = "imageSize")]
    pub image_size: u64,
    pub views: u64,
    pub downloads: u64,
    pub likes: u64,
    pub comments: u64,
    pub user_id: u64,
    pub user: String,
    #[serde(rename = "userImageURL")]
    pub user_image_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PixabayResponse {
    hits: Vec<PixabayImage>,
    error: Option<String>,
}

pub struct PixabayProvider {
    client: Client,
    api_key: Option<String>,
    api_url: String,
}

impl PixabayProvider {
    pub fn from_env(config: &CuratorConfig) -> Self {
        let api_key = env::var("PIXABAY_API_KEY").ok();
        if api_key.is_none() {
            warn!("PIXABAY_API_KEY is not set, Pixabay searches will return nothing");
        }
        Self::new(
            api_key,
            env::var("PIXABAY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            config,
        )
    }

    pub fn new(api_key: Option<String>, api_url: String, config: &CuratorConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.search_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            api_key,
            api_url,
        }
    }

    async fn query_hits(&self, params: &[(&str, String)], context: &str) -> Vec<PixabayImage> {
        let response = match self.client.get(&self.api_url).query(params).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                error!(
                    "Error fetching images from Pixabay for {}: HTTP {}",
                    context,
                    response.status()
                );
                return Vec::new();
            }
            Err(e) => {
                error!("Error fetching images from Pixabay for {}: {}", context, e);
                return Vec::new();
            }
        };

        match response.json::<PixabayResponse>().await {
            Ok(PixabayResponse {
                error: Some(message),
                ..
            }) => {
                error!("Pixabay API error for {}: {}", context, message);
                Vec::new()
            }
            Ok(parsed) => parsed.hits,
            Err(e) => {
                error!("Error parsing Pixabay response for {}: {}", context, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ImageProvider for PixabayProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pixabay
    }

    async fn search(&self, term: &str, page: u32, per_page: u32) -> Vec<CandidateImage> {
        let Some(key) = self.api_key.clone() else {
            return Vec::new();
        };

        let params = [
            ("key", key),
            ("q", term.to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
            ("image_type", "photo".to_string()),
        ];
        let hits = self.query_hits(&params, &format!("term '{term}'")).await;

        info!("Pixabay returned {} hits for term '{}'", hits.len(), term);
        hits.into_iter().map(CandidateImage::Pixabay).collect()
    }

    /// Single download field, no fallback chain: an oversized
    /// `largeImageURL` means no download for this image.
    fn variant_urls(&self, candidate: &CandidateImage) -> Vec<String> {
        let CandidateImage::Pixabay(image) = candidate else {
            return Vec::new();
        };
        if image.large_image_url.is_empty() {
            Vec::new()
        } else {
            vec![image.large_image_url.clone()]
        }
    }

    fn record_for(&self, candidate: &CandidateImage, term_id: i64) -> NewImageRecord {
        let (original, thumbnail, page) = match candidate {
            CandidateImage::Pixabay(image) => (
                Some(image.large_image_url.clone()),
                Some(image.webformat_url.clone()),
                Some(image.page_url.clone()),
            ),
            other => (other.display_url(), None, None),
        };
        let extension = original.as_deref().map(|u| self.extension_for(u));
        NewImageRecord {
            source_id: candidate.source_id(),
            source_api: self.kind(),
            url_original: original,
            url_thumbnail: thumbnail,
            url_page: page,
            extension,
            status: ImageStatus::Approved,
            term_id,
        }
    }

    /// Pixabay serves a fresh CDN URL set for an id, which is the canonical
    /// recovery for an expired `largeImageURL`.
    async fn fetch_by_id(&self, source_id: &str) -> Option<CandidateImage> {
        let key = self.api_key.clone()?;
        let params = [("key", key), ("id", source_id.to_string())];
        self.query_hits(&params, &format!("id {source_id}"))
            .await
            .into_iter()
            .next()
            .map(CandidateImage::Pixabay)
    }
}
