use crate::config::CuratorConfig;
use crate::providers::{CandidateImage, ImageProvider};
use crate::types::{ImageStatus, NewImageRecord, ProviderKind};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{error, info, warn};

const DEFAULT_API_URL: &str = "https://api.pexels.com/v1";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PexelsSrc {
    pub original: String,
    pub large2x: String,
    pub large: String,
    pub medium: String,
    pub small: String,
    pub portrait: String,
    pub landscape: String,
    pub tiny: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PexelsPhoto {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    /// Photo page on pexels.com.
    pub url: String,
    pub photographer: String,
    pub photographer_url: String,
    pub alt: Option<String>,
    pub src: PexelsSrc,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PexelsSearchResponse {
    photos: Vec<PexelsPhoto>,
}

pub struct PexelsProvider {
    client: Client,
    api_key: Option<String>,
    api_url: String,
}

impl PexelsProvider {
    pub fn from_env(config: &CuratorConfig) -> Self {
        let api_key = env::var("PEXELS_API_KEY").ok();
        if api_key.is_none() {
            warn!("PEXELS_API_KEY is not set, Pexels searches will return nothing");
        }
        Self::new(
            api_key,
            env::var("PEXELS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
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
}

#[async_trait]
impl ImageProvider for PexelsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pexels
    }

    async fn search(&self, term: &str, page: u32, per_page: u32) -> Vec<CandidateImage> {
        let Some(key) = self.api_key.as_ref() else {
            return Vec::new();
        };

        let url = format!("{}/search", self.api_url);
        let request = self
            .client
            .get(&url)
            .header("Authorization", key)
            .query(&[
                ("query", term.to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ]);

        let photos = match request.send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<PexelsSearchResponse>().await {
                    Ok(parsed) => parsed.photos,
                    Err(e) => {
                        error!("Error parsing Pexels response for term '{}': {}", term, e);
                        return Vec::new();
                    }
                }
            }
            Ok(response) => {
                error!(
                    "Error fetching images from Pexels for term '{}': HTTP {}",
                    term,
                    response.status()
                );
                return Vec::new();
            }
            Err(e) => {
                error!("Error fetching images from Pexels for term '{}': {}", term, e);
                return Vec::new();
            }
        };

        info!("Pexels returned {} photos for term '{}'", photos.len(), term);
        photos.into_iter().map(CandidateImage::Pexels).collect()
    }

    /// Preference order: original, large2x, large, medium, small.
    fn variant_urls(&self, candidate: &CandidateImage) -> Vec<String> {
        let CandidateImage::Pexels(photo) = candidate else {
            return Vec::new();
        };
        [
            &photo.src.original,
            &photo.src.large2x,
            &photo.src.large,
            &photo.src.medium,
            &photo.src.small,
        ]
        .into_iter()
        .filter(|u| !u.is_empty())
        .cloned()
        .collect()
    }

    fn record_for(&self, candidate: &CandidateImage, term_id: i64) -> NewImageRecord {
        let (original, thumbnail, page) = match candidate {
            CandidateImage::Pexels(photo) => (
                Some(photo.src.original.clone()),
                Some(photo.src.tiny.clone()),
                Some(photo.url.clone()),
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

    async fn fetch_by_id(&self, source_id: &str) -> Option<CandidateImage> {
        let key = self.api_key.as_ref()?;
        let url = format!("{}/photos/{}", self.api_url, source_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", key)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            error!("Pexels refetch of {} returned HTTP {}", source_id, response.status());
            return None;
        }
        response
            .json::<PexelsPhoto>()
            .await
            .map(CandidateImage::Pexels)
            .ok()
    }
}
