use crate::utils::term_to_folder_name;
use std::env;
use std::path::PathBuf;
use uuid::Uuid;

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct CuratorConfig {
    pub project_name: String,
    /// Global download budget shared by every provider, in kilobytes.
    pub max_image_kb: u64,
    pub per_page: u32,
    /// When false, accept persists the record but skips the byte fetch.
    pub download_enabled: bool,
    pub min_images_per_term: u32,
    pub user_agent: String,
    pub search_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            project_name: format!("project_{}", &Uuid::new_v4().to_string()[..8]),
            max_image_kb: 512,
            per_page: 30,
            download_enabled: false,
            min_images_per_term: 1,
            user_agent: "Mozilla/5.0".to_string(),
            search_timeout_secs: 30,
            probe_timeout_secs: 10,
            fetch_timeout_secs: 30,
        }
    }
}

impl CuratorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            project_name: env::var("PROJECT_NAME").unwrap_or(defaults.project_name),
            max_image_kb: env_parse("MAX_KB_IMAGE_SIZE", defaults.max_image_kb),
            per_page: env_parse("SEARCH_PER_PAGE", defaults.per_page),
            download_enabled: env::var("DOWNLOAD_IMAGES")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(defaults.download_enabled),
            min_images_per_term: env_parse("MIN_IMAGES_PER_TERM", defaults.min_images_per_term),
            user_agent: defaults.user_agent,
            search_timeout_secs: defaults.search_timeout_secs,
            probe_timeout_secs: defaults.probe_timeout_secs,
            fetch_timeout_secs: defaults.fetch_timeout_secs,
        }
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = name.into();
        self
    }

    pub fn assets_root(&self) -> PathBuf {
        PathBuf::from("assets").join(&self.project_name)
    }

    /// Target folder for a term's downloaded files.
    pub fn image_folder(&self, term: &str) -> PathBuf {
        self.assets_root()
            .join("image_files")
            .join(term_to_folder_name(term))
    }

    pub fn database_path(&self) -> PathBuf {
        self.assets_root()
            .join("database")
            .join(format!("{}.db", self.project_name))
    }

    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.database_path().display())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
