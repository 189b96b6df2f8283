pub mod config;
pub mod cursor;
pub mod downloader;
pub mod providers;
pub mod store;
pub mod types;
pub mod utils;

pub use config::CuratorConfig;
pub use cursor::{CurrentView, Decision, ReviewCursor, SessionState, TermDecision};
pub use downloader::Downloader;
pub use providers::{CandidateImage, ImageProvider, ProviderRegistry};
pub use store::{ImageStore, SqliteStore};
pub use types::*;
