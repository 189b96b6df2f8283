use crate::config::CuratorConfig;
use crate::providers::{CandidateImage, ImageProvider};
use crate::types::{ImageStatus, NewImageRecord, ProviderKind};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::env;
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_SEARCH_URL: &str = "https://www.flickr.com/search/";
/// Creative-commons-ish license filter used on the public search page.
const LICENSE_FILTER: &str = "4,5,6,9,10";

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct FlickrPhoto {
    pub id: String,
    /// Thumbnail as it appeared in the search results.
    pub url: String,
    /// Thumbnail URL with the size suffix rewritten to the large variant.
    pub hi_res_url: String,
}

/// Flickr thumbnails end in `_<size letter>.jpg`; swapping the letter for
/// `b` addresses the large rendition of the same photo.
pub fn to_hi_res_url(src: &str) -> String {
    if let Some(stem) = src.strip_suffix(".jpg") {
        if let Some(prefix) = stem
            .char_indices()
            .last()
            .filter(|(_, c)| c.is_ascii_lowercase())
            .map(|(idx, _)| &stem[..idx])
        {
            if prefix.ends_with('_') {
                return format!("{prefix}b.jpg");
            }
        }
    }
    src.to_string()
}

fn normalize_scheme(src: &str) -> String {
    if src.starts_with("//") {
        format!("https:{src}")
    } else {
        src.to_string()
    }
}

/// Walks the search page `<img>` tags, keeping staticflickr thumbnails and
/// deduplicating on the photo id embedded in the filename.
pub fn parse_search_html(html: &str, limit: usize) -> Vec<FlickrPhoto> {
    let Ok(img_selector) = Selector::parse("img") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut photos: Vec<FlickrPhoto> = Vec::new();

    for img in document.select(&img_selector) {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        if !src.contains("staticflickr.com") {
            continue;
        }

        let hi_res = to_hi_res_url(src);
        let id = hi_res
            .rsplit('/')
            .next()
            .and_then(|name| name.split('_').next())
            .unwrap_or_default()
            .to_string();
        if id.is_empty() || photos.iter().any(|p| p.id == id) {
            continue;
        }

        photos.push(FlickrPhoto {
            id,
            url: normalize_scheme(src),
            hi_res_url: normalize_scheme(&hi_res),
        });
        if photos.len() >= limit {
            break;
        }
    }

    photos
}

/// Scraped source: no official API, so a search is a fetch of the public
/// search page and `fetch_by_id` is unavailable (a stale link is terminal).
pub struct FlickrProvider {
    client: Client,
    search_url: String,
}

impl FlickrProvider {
    pub fn from_env(config: &CuratorConfig) -> Self {
        Self::new(
            env::var("FLICKR_SEARCH_URL").unwrap_or_else(|_| DEFAULT_SEARCH_URL.to_string()),
            config,
        )
    }

    pub fn new(search_url: String, config: &CuratorConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.search_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, search_url }
    }
}

#[async_trait]
impl ImageProvider for FlickrProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Flickr
    }

    async fn search(&self, term: &str, _page: u32, per_page: u32) -> Vec<CandidateImage> {
        let request = self.client.get(&self.search_url).query(&[
            ("text", term.to_string()),
            ("license", LICENSE_FILTER.to_string()),
        ]);

        let html = match request.send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    error!("Error reading Flickr page for query '{}': {}", term, e);
                    return Vec::new();
                }
            },
            Ok(response) => {
                error!(
                    "Error fetching images from Flickr for query '{}': HTTP {}",
                    term,
                    response.status()
                );
                return Vec::new();
            }
            Err(e) => {
                error!("Error fetching images from Flickr for query '{}': {}", term, e);
                return Vec::new();
            }
        };

        let photos = parse_search_html(&html, per_page as usize);
        info!("Flickr scrape found {} photos for query '{}'", photos.len(), term);
        photos.into_iter().map(CandidateImage::Flickr).collect()
    }

    /// One resolved high-resolution URL; no multi-variant fallback.
    fn variant_urls(&self, candidate: &CandidateImage) -> Vec<String> {
        let CandidateImage::Flickr(photo) = candidate else {
            return Vec::new();
        };
        if photo.hi_res_url.is_empty() {
            Vec::new()
        } else {
            vec![photo.hi_res_url.clone()]
        }
    }

    fn record_for(&self, candidate: &CandidateImage, term_id: i64) -> NewImageRecord {
        let (original, thumbnail) = match candidate {
            CandidateImage::Flickr(photo) => {
                (Some(photo.hi_res_url.clone()), Some(photo.url.clone()))
            }
            other => (other.display_url(), None),
        };
        let extension = original.as_deref().map(|u| self.extension_for(u));
        NewImageRecord {
            source_id: candidate.source_id(),
            source_api: self.kind(),
            url_original: original,
            url_thumbnail: thumbnail,
            url_page: None,
            extension,
            status: ImageStatus::Approved,
            term_id,
        }
    }
}
