use crate::config::CuratorConfig;
use crate::downloader::Downloader;
use crate::providers::{CandidateImage, ProviderRegistry};
use crate::store::ImageStore;
use crate::types::{CuratorError, ProviderKind, Result, SearchTerm};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A cache slot for one term index. `Pending` is the in-flight sentinel: a
/// re-entrant resolve for the same slot sees it and returns empty instead of
/// dispatching a second search.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    Pending,
    Ready(Vec<CandidateImage>),
}

/// Where the operator is: which term, which photo within the term's
/// candidate list, and which provider produced the cached lists. Cached
/// entries are only valid for that provider, so a provider switch wipes the
/// whole cache.
#[derive(Debug)]
pub struct SessionState {
    pub term_idx: usize,
    pub photo_idx: usize,
    pub provider: ProviderKind,
    cache: HashMap<usize, CacheEntry>,
}

impl SessionState {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            term_idx: 0,
            photo_idx: 0,
            provider,
            cache: HashMap::new(),
        }
    }

    pub fn cached_terms(&self) -> usize {
        self.cache.len()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(ProviderKind::Pexels)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
    Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermDecision {
    NextTerm,
    PrevTerm,
}

/// What the presentation layer gets asked for: the current review position.
#[derive(Debug)]
pub enum CurrentView {
    /// No terms configured yet; the operator has to run setup first.
    NoTerms,
    /// Every term has been walked past.
    Finished { total_approved: i64 },
    /// The current term has no (remaining) candidates.
    Exhausted {
        term: SearchTerm,
        approved_for_term: i64,
    },
    Candidate {
        term: SearchTerm,
        candidate: CandidateImage,
        url: Option<String>,
        approved_for_term: i64,
    },
}

/// The review state machine. One instance per operator; every operation
/// takes `&mut self`, so one command is fully applied before the next.
pub struct ReviewCursor {
    store: Arc<dyn ImageStore>,
    registry: ProviderRegistry,
    downloader: Downloader,
    config: CuratorConfig,
    session: SessionState,
}

impl ReviewCursor {
    pub fn new(store: Arc<dyn ImageStore>, registry: ProviderRegistry, config: CuratorConfig) -> Self {
        let downloader = Downloader::new(&config);
        Self {
            store,
            registry,
            downloader,
            config,
            session: SessionState::default(),
        }
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.session.provider = provider;
        self
    }

    pub fn term_idx(&self) -> usize {
        self.session.term_idx
    }

    pub fn photo_idx(&self) -> usize {
        self.session.photo_idx
    }

    pub fn provider(&self) -> ProviderKind {
        self.session.provider
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// The candidate list for a term index, from cache when present. A miss
    /// marks the slot `Pending` before dispatching so a re-entrant call
    /// cannot trigger a duplicate search, then stores the (possibly empty)
    /// result. Entries never expire on their own.
    pub async fn resolve(&mut self, term_idx: usize) -> Result<Vec<CandidateImage>> {
        match self.session.cache.get(&term_idx) {
            Some(CacheEntry::Ready(photos)) => return Ok(photos.clone()),
            Some(CacheEntry::Pending) => {
                debug!("Search for term {} already in flight", term_idx);
                return Ok(Vec::new());
            }
            None => {}
        }

        let terms = self.store.list_terms().await?;
        let Some(term) = terms.get(term_idx) else {
            return Ok(Vec::new());
        };
        let provider = self.registry.get(self.session.provider)?;

        self.session.cache.insert(term_idx, CacheEntry::Pending);
        let photos = provider.search(&term.term, 1, self.config.per_page).await;
        debug!(
            "Cached {} candidates for term '{}' from {}",
            photos.len(),
            term.term,
            self.session.provider
        );
        self.session
            .cache
            .insert(term_idx, CacheEntry::Ready(photos.clone()));
        Ok(photos)
    }

    /// The current candidate, or the reason there is none. "Finished" is a
    /// projection of `term_idx >= len(terms)`, not a stored state.
    pub async fn current(&mut self) -> Result<CurrentView> {
        let terms = self.store.list_terms().await?;
        if terms.is_empty() {
            return Ok(CurrentView::NoTerms);
        }
        if self.session.term_idx >= terms.len() {
            let total_approved = self.store.count_approved(None).await?;
            return Ok(CurrentView::Finished { total_approved });
        }

        let term = terms[self.session.term_idx].clone();
        let approved_for_term = self.store.count_approved(Some(term.id)).await?;
        let photos = self.resolve(self.session.term_idx).await?;

        if self.session.photo_idx >= photos.len() {
            return Ok(CurrentView::Exhausted {
                term,
                approved_for_term,
            });
        }

        let candidate = photos[self.session.photo_idx].clone();
        let url = candidate.display_url();
        Ok(CurrentView::Candidate {
            term,
            candidate,
            url,
            approved_for_term,
        })
    }

    pub async fn apply_decision(&mut self, decision: Decision) -> Result<()> {
        if decision == Decision::Previous {
            return self.step_back().await;
        }

        match self.current().await? {
            CurrentView::Candidate { term, candidate, .. } => {
                if decision == Decision::Accept {
                    self.accept(&term, &candidate).await?;
                }
                self.advance().await
            }
            CurrentView::Exhausted { .. } if decision == Decision::Reject => self.advance().await,
            _ => Ok(()),
        }
    }

    pub async fn apply_term_decision(&mut self, decision: TermDecision) -> Result<()> {
        match decision {
            TermDecision::NextTerm => {
                self.session.term_idx += 1;
            }
            TermDecision::PrevTerm => {
                self.session.term_idx = self.session.term_idx.saturating_sub(1);
            }
        }
        self.session.photo_idx = 0;
        Ok(())
    }

    /// Switches the active provider. The whole cache goes, not just the
    /// current term's slot: a stale list under the new provider key would
    /// present images from the wrong source.
    pub fn switch_provider(&mut self, provider: ProviderKind) -> Result<()> {
        if !self.registry.contains(provider) {
            return Err(CuratorError::UnknownProvider {
                name: provider.to_string(),
            });
        }
        info!("Switching provider to {}", provider);
        self.session.provider = provider;
        self.session.cache.clear();
        self.session.photo_idx = 0;
        Ok(())
    }

    /// Wholesale term replacement. Clears the cache and resets the photo
    /// index; an out-of-range term index is absorbed by the finished
    /// projection.
    pub async fn replace_terms(&mut self, terms: &[String]) -> Result<()> {
        self.store.replace_terms(terms).await?;
        self.session.cache.clear();
        self.session.photo_idx = 0;
        Ok(())
    }

    async fn accept(&mut self, term: &SearchTerm, candidate: &CandidateImage) -> Result<()> {
        let provider = self.registry.get(self.session.provider)?;

        match provider
            .persist(self.store.as_ref(), &term.term, candidate)
            .await
        {
            Ok(()) => {
                info!(
                    "Accepted image {} from {} for term '{}'",
                    candidate.source_id(),
                    self.session.provider,
                    term.term
                );
            }
            Err(CuratorError::DuplicateImage {
                source_id,
                source_api,
            }) => {
                warn!(
                    "Image {} from {} was already accepted, skipping",
                    source_id, source_api
                );
            }
            Err(e) => return Err(e),
        }

        if self.config.download_enabled {
            let folder = self.config.image_folder(&term.term);
            if let Some(path) = self
                .downloader
                .download(provider.as_ref(), candidate, &folder)
                .await?
            {
                self.store
                    .set_file_path(
                        &candidate.source_id(),
                        self.session.provider,
                        &path.to_string_lossy(),
                    )
                    .await?;
            }
        }

        Ok(())
    }

    /// `photo_idx += 1`, rolling over to the next term when the current
    /// term's candidate list is consumed. Terms whose search comes back
    /// empty are rolled past as well, so consuming the last populated term
    /// lands directly on the finished projection.
    async fn advance(&mut self) -> Result<()> {
        self.session.photo_idx += 1;
        let total = self.store.list_terms().await?.len();
        while self.session.term_idx < total {
            let photos = self.resolve(self.session.term_idx).await?;
            if self.session.photo_idx < photos.len() {
                break;
            }
            self.session.term_idx += 1;
            self.session.photo_idx = 0;
            debug!("Rolled over to term {}", self.session.term_idx);
        }
        Ok(())
    }

    /// One step back: previous photo, or the last candidate of the previous
    /// term (clamped to 0 when that list is empty). A no-op at the origin.
    async fn step_back(&mut self) -> Result<()> {
        if self.session.photo_idx > 0 {
            self.session.photo_idx -= 1;
        } else if self.session.term_idx > 0 {
            self.session.term_idx -= 1;
            let photos = self.resolve(self.session.term_idx).await?;
            self.session.photo_idx = photos.len().saturating_sub(1);
        }
        Ok(())
    }
}
