pub mod flickr;
pub mod pexels;
pub mod pixabay;
pub mod unsplash;

pub use flickr::{FlickrPhoto, FlickrProvider};
pub use pexels::{PexelsPhoto, PexelsProvider, PexelsSrc};
pub use pixabay::{PixabayImage, PixabayProvider};
pub use unsplash::{UnsplashPhoto, UnsplashProvider};

use crate::config::CuratorConfig;
use crate::store::ImageStore;
use crate::types::{CuratorError, NewImageRecord, ProviderKind, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

/// One provider-native search result. The payloads keep each API's shape;
/// the methods here are the normalized projection everything else works
/// against. Candidates are ephemeral: produced by a search, consumed by an
/// accept or reject, never stored as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CandidateImage {
    Pexels(PexelsPhoto),
    Pixabay(PixabayImage),
    Unsplash(UnsplashPhoto),
    Flickr(FlickrPhoto),
}

impl CandidateImage {
    pub fn provider(&self) -> ProviderKind {
        match self {
            CandidateImage::Pexels(_) => ProviderKind::Pexels,
            CandidateImage::Pixabay(_) => ProviderKind::Pixabay,
            CandidateImage::Unsplash(_) => ProviderKind::Unsplash,
            CandidateImage::Flickr(_) => ProviderKind::Flickr,
        }
    }

    pub fn source_id(&self) -> String {
        match self {
            CandidateImage::Pexels(p) => p.id.to_string(),
            CandidateImage::Pixabay(p) => p.id.to_string(),
            CandidateImage::Unsplash(p) => p.id.clone(),
            CandidateImage::Flickr(p) => p.id.clone(),
        }
    }

    /// The URL the presentation layer should show for this candidate. Each
    /// provider has its own best-for-display field with a fallback.
    pub fn display_url(&self) -> Option<String> {
        match self {
            CandidateImage::Pexels(p) => [&p.src.large2x, &p.src.original]
                .into_iter()
                .find(|u| !u.is_empty())
                .cloned(),
            CandidateImage::Pixabay(p) => {
                (!p.large_image_url.is_empty()).then(|| p.large_image_url.clone())
            }
            CandidateImage::Unsplash(p) => [&p.urls.full, &p.urls.regular]
                .into_iter()
                .find(|u| !u.is_empty())
                .map(|u| unsplash::strip_tracking_token(u)),
            CandidateImage::Flickr(p) => [&p.hi_res_url, &p.url]
                .into_iter()
                .find(|u| !u.is_empty())
                .cloned(),
        }
    }
}

/// Contract every image source implements. Search degrades instead of
/// failing: a remote or parse problem is logged and yields an empty list so
/// the review cursor keeps working.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn search(&self, term: &str, page: u32, per_page: u32) -> Vec<CandidateImage>;

    /// Download URLs in this provider's preference order, best first. The
    /// downloader probes them in order and takes the first one under the
    /// size cap.
    fn variant_urls(&self, candidate: &CandidateImage) -> Vec<String>;

    fn extension_for(&self, url: &str) -> String {
        crate::utils::extension_from_url(url)
    }

    /// Maps the provider-native payload onto the persistence model.
    fn record_for(&self, candidate: &CandidateImage, term_id: i64) -> NewImageRecord;

    /// Re-resolves a single image by its provider-native id, for the
    /// stale-link retry path. Providers without a canonical single-photo
    /// endpoint return `None`.
    async fn fetch_by_id(&self, _source_id: &str) -> Option<CandidateImage> {
        None
    }

    /// Inserts the candidate for the given term. A missing term is logged
    /// and skipped; a duplicate `(source_id, source_api)` propagates so the
    /// caller can decide to log and move on.
    async fn persist(
        &self,
        store: &dyn ImageStore,
        term_text: &str,
        candidate: &CandidateImage,
    ) -> Result<()> {
        let Some(term) = store.find_term(term_text).await? else {
            error!("Term '{}' not found in store, skipping persist", term_text);
            return Ok(());
        };
        store
            .insert_image(self.record_for(candidate, term.id))
            .await?;
        Ok(())
    }
}

/// Lookup table from provider key to adapter. A key without a registered
/// adapter is a configuration error, surfaced as [`CuratorError::UnknownProvider`]
/// at the call site rather than handled.
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn ImageProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Registers all four built-in providers with their env-driven configs.
    pub fn from_env(config: &CuratorConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PexelsProvider::from_env(config)));
        registry.register(Arc::new(PixabayProvider::from_env(config)));
        registry.register(Arc::new(UnsplashProvider::from_env(config)));
        registry.register(Arc::new(FlickrProvider::from_env(config)));
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn ImageProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn ImageProvider>> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| CuratorError::UnknownProvider {
                name: kind.to_string(),
            })
    }

    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    pub fn list(&self) -> Vec<ProviderKind> {
        self.providers.keys().copied().collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
