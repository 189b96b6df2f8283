use crate::config::CuratorConfig;
use crate::providers::{CandidateImage, ImageProvider};
use crate::types::{CuratorError, DownloadVariant, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How much of a fetched body is sniffed for stale-link markers. Provider
/// error pages are small; real image bytes rarely decode to these words in
/// their leading chunk.
const SNIFF_WINDOW: usize = 4096;
const STALE_MARKERS: [&str; 2] = ["invalid", "expired"];

/// Size-gated download policy shared by all providers: probe variants in the
/// provider's preference order, take the first one under the byte budget,
/// and allow exactly one refetch-and-retry when a fetched body turns out to
/// be a stale-link error page.
pub struct Downloader {
    probe_client: Client,
    fetch_client: Client,
    cap_kb: u64,
}

impl Downloader {
    pub fn new(config: &CuratorConfig) -> Self {
        let probe_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.probe_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        let fetch_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            probe_client,
            fetch_client,
            cap_kb: config.max_image_kb,
        }
    }

    pub fn cap_kb(&self) -> u64 {
        self.cap_kb
    }

    /// Remote size in decimal kilobytes. First a cheap HEAD for
    /// `Content-Length`; when the server omits it, stream the body counting
    /// bytes. A probe that fails entirely reports 0, which the cap check
    /// treats as downloadable; unknown size is not a reason to skip.
    pub async fn remote_size_kb(&self, url: &str) -> f64 {
        match self.probe_client.head(url).send().await {
            Ok(response) => {
                if let Some(length) = response
                    .headers()
                    .get(reqwest::header::CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                {
                    debug!("HEAD probe of {} reported {} bytes", url, length);
                    return length as f64 / 1000.0;
                }
            }
            Err(e) => {
                error!("Failed to get size of {}: {}", url, e);
            }
        }

        // Streamed fallback: count the body ourselves.
        let mut size: u64 = 0;
        match self.fetch_client.get(url).send().await {
            Ok(mut response) => {
                if !response.status().is_success() {
                    error!(
                        "Could not determine size for {}: HTTP {}",
                        url,
                        response.status()
                    );
                    return 0.0;
                }
                loop {
                    match response.chunk().await {
                        Ok(Some(chunk)) => size += chunk.len() as u64,
                        Ok(None) => break,
                        Err(e) => {
                            error!("Could not determine size for {}: {}", url, e);
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                error!("Could not determine size for {}: {}", url, e);
            }
        }
        size as f64 / 1000.0
    }

    /// First variant in the provider's preference order at or under the cap,
    /// or `None` when every variant exceeds it. The scan stops at the first
    /// fit; a smaller variant further down the list is never preferred.
    pub async fn select_variant(
        &self,
        provider: &dyn ImageProvider,
        candidate: &CandidateImage,
    ) -> Option<DownloadVariant> {
        for url in provider.variant_urls(candidate) {
            let size_kb = self.remote_size_kb(&url).await;
            if size_kb <= self.cap_kb as f64 {
                return Some(DownloadVariant { url, size_kb });
            }
            debug!(
                "Variant {} of image {} is {:.2} KB, over the {} KB cap",
                url,
                candidate.source_id(),
                size_kb,
                self.cap_kb
            );
        }
        None
    }

    /// Fetches the chosen variant and writes it to
    /// `folder/{source_id}.{extension}`, returning the written path. `None`
    /// means no download happened: nothing fit under the cap, the link was
    /// stale beyond the single retry, or the fetch or write failed; the
    /// caller moves on either way.
    pub async fn download(
        &self,
        provider: &dyn ImageProvider,
        candidate: &CandidateImage,
        folder: &Path,
    ) -> Result<Option<PathBuf>> {
        let source_id = candidate.source_id();
        let Some(variant) = self.select_variant(provider, candidate).await else {
            info!(
                "Skipped image {}: no variant fits under {} KB",
                source_id, self.cap_kb
            );
            return Ok(None);
        };

        let (body, chosen_url) = match self.fetch_checked(&variant.url).await {
            Ok(body) => (body, variant.url.clone()),
            Err(CuratorError::StaleLink { url }) => {
                warn!("Stale link for image {}: {}, refetching once", source_id, url);
                match self.refetch_and_fetch(provider, &source_id).await {
                    Some(result) => result,
                    None => return Ok(None),
                }
            }
            Err(e) => {
                error!("Error downloading image {}: {}", source_id, e);
                return Ok(None);
            }
        };

        let extension = provider.extension_for(&chosen_url);
        let path = folder.join(format!("{source_id}.{extension}"));
        match self.write_bytes(folder, &path, &body).await {
            Ok(()) => {
                info!(
                    "Downloaded image {} to {} ({:.2} KB)",
                    source_id,
                    path.display(),
                    body.len() as f64 / 1000.0
                );
                Ok(Some(path))
            }
            Err(e) => {
                error!("Error writing file {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// The single allowed retry: re-resolve the candidate through the
    /// provider and fetch its fresh variant. Any failure here is terminal
    /// for this candidate.
    async fn refetch_and_fetch(
        &self,
        provider: &dyn ImageProvider,
        source_id: &str,
    ) -> Option<(Vec<u8>, String)> {
        let Some(fresh) = provider.fetch_by_id(source_id).await else {
            warn!(
                "No refetch available for image {} on {}, skipping",
                source_id,
                provider.kind()
            );
            return None;
        };
        let Some(variant) = self.select_variant(provider, &fresh).await else {
            info!(
                "Skipped image {} after refetch: no variant fits under {} KB",
                source_id, self.cap_kb
            );
            return None;
        };
        match self.fetch_checked(&variant.url).await {
            Ok(body) => Some((body, variant.url)),
            Err(e) => {
                error!(
                    "Retry download of image {} failed, giving up: {}",
                    source_id, e
                );
                None
            }
        }
    }

    /// GET the URL and sniff the leading bytes for provider error markers.
    /// A body that reads like an "invalid/expired link" page is a
    /// [`CuratorError::StaleLink`], not a success.
    async fn fetch_checked(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.fetch_client.get(url).send().await?;
        let bytes = response.bytes().await?;

        let window = &bytes[..bytes.len().min(SNIFF_WINDOW)];
        let text = String::from_utf8_lossy(window).to_lowercase();
        if STALE_MARKERS.iter().any(|marker| text.contains(marker)) {
            return Err(CuratorError::StaleLink {
                url: url.to_string(),
            });
        }

        Ok(bytes.to_vec())
    }

    async fn write_bytes(&self, folder: &Path, path: &PathBuf, body: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(folder).await?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }
}
