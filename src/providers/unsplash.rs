use crate::config::CuratorConfig;
use crate::providers::{CandidateImage, ImageProvider};
use crate::types::{ImageStatus, NewImageRecord, ProviderKind};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

const DEFAULT_API_URL: &str = "https://api.unsplash.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnsplashUrls {
    pub raw: String,
    pub full: String,
    pub regular: String,
    pub small: String,
    pub thumb: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnsplashLinks {
    #[serde(rename = "self")]
    pub self_url: String,
    pub html: String,
    pub download: String,
    pub download_location: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnsplashUser {
    pub id: String,
    pub username: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnsplashPhoto {
    pub id: String,
    pub created_at: Option<String>,
    pub width: u32,
    pub height: u32,
    pub color: Option<String>,
    pub blur_hash: Option<String>,
    pub description: Option<String>,
    pub alt_description: Option<String>,
    pub urls: UnsplashUrls,
    pub links: UnsplashLinks,
    pub user: UnsplashUser,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UnsplashSearchResponse {
    results: Vec<UnsplashPhoto>,
}

/// Unsplash image URLs carry an `ixid` tracking token; everything from the
/// token onward is dropped before the URL is fetched or stored.
pub fn strip_tracking_token(url: &str) -> String {
    if let Some(idx) = url.find("?ixid") {
        return url[..idx].to_string();
    }
    if let Some(idx) = url.find("&ixid") {
        return url[..idx].to_string();
    }
    url.to_string()
}

/// File extension from the `fm=` query parameter, `jpg` when absent.
pub fn extension_from_format_param(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .query_pairs()
                .find(|(key, _)| key == "fm")
                .map(|(_, value)| value.into_owned())
        })
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "jpg".to_string())
}

pub struct UnsplashProvider {
    client: Client,
    api_key: Option<String>,
    api_url: String,
}

impl UnsplashProvider {
    pub fn from_env(config: &CuratorConfig) -> Self {
        let api_key = env::var("UNSPLASH_API_KEY").ok();
        if api_key.is_none() {
            warn!("UNSPLASH_API_KEY is not set, Unsplash searches will return nothing");
        }
        Self::new(
            api_key,
            env::var("UNSPLASH_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
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
impl ImageProvider for UnsplashProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Unsplash
    }

    async fn search(&self, term: &str, page: u32, per_page: u32) -> Vec<CandidateImage> {
        let Some(key) = self.api_key.clone() else {
            return Vec::new();
        };

        let url = format!("{}/search/photos", self.api_url);
        let request = self.client.get(&url).query(&[
            ("query", term.to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
            ("client_id", key),
            ("order_by", "relevant".to_string()),
        ]);

        let results = match request.send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<UnsplashSearchResponse>().await {
                    Ok(parsed) => parsed.results,
                    Err(e) => {
                        error!("Error parsing Unsplash response for term '{}': {}", term, e);
                        return Vec::new();
                    }
                }
            }
            Ok(response) => {
                error!(
                    "Error fetching images from Unsplash for term '{}': HTTP {}",
                    term,
                    response.status()
                );
                return Vec::new();
            }
            Err(e) => {
                error!(
                    "Error fetching images from Unsplash for term '{}': {}",
                    term, e
                );
                return Vec::new();
            }
        };

        info!(
            "Unsplash returned {} results for term '{}'",
            results.len(),
            term
        );
        results.into_iter().map(CandidateImage::Unsplash).collect()
    }

    /// Preference order: full, regular, small, each with the tracking
    /// token stripped.
    fn variant_urls(&self, candidate: &CandidateImage) -> Vec<String> {
        let CandidateImage::Unsplash(photo) = candidate else {
            return Vec::new();
        };
        [&photo.urls.full, &photo.urls.regular, &photo.urls.small]
            .into_iter()
            .filter(|u| !u.is_empty())
            .map(|u| strip_tracking_token(u))
            .collect()
    }

    fn extension_for(&self, url: &str) -> String {
        extension_from_format_param(url)
    }

    fn record_for(&self, candidate: &CandidateImage, term_id: i64) -> NewImageRecord {
        let (original, thumbnail, page, extension) = match candidate {
            CandidateImage::Unsplash(photo) => (
                Some(photo.links.download.clone()),
                Some(photo.links.download.clone()),
                Some(photo.links.html.clone()),
                Some(extension_from_format_param(&photo.urls.full)),
            ),
            other => (other.display_url(), None, None, None),
        };
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
        let key = self.api_key.clone()?;
        let url = format!("{}/photos/{}", self.api_url, source_id);
        let response = self
            .client
            .get(&url)
            .query(&[("client_id", key)])
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            error!(
                "Unsplash refetch of {} returned HTTP {}",
                source_id,
                response.status()
            );
            return None;
        }
        response
            .json::<UnsplashPhoto>()
            .await
            .map(CandidateImage::Unsplash)
            .ok()
    }
}
