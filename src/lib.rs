//! Tube Vault - Core Library
//!
//! This library provides the backend of the Tube Vault desktop application:
//! Google sign-in state, the settings and saved-video store, and YouTube
//! lookups with caption retrieval.

#[cfg(feature = "desktop")]
pub mod commands;
pub mod core;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{
    config::AppConfig,
    datastore::{LocalVectorStore, VectorStore},
    google_oauth::{BrowserLauncher, GoogleOAuthClient, SystemBrowser},
    llm::MistralClient,
    models::{AppError, AppResult, CaptionEntry, Settings, TokenSet, VideoMetadataView, VideoRecord},
    persistence::PersistenceCoordinator,
    session::{OAuthProvider, SessionSnapshot, SessionStore},
    youtube::{LookupOutcome, VideoLookup, YoutubeBackend},
    youtube_backend::HttpYoutubeBackend,
};

use std::sync::Arc;

use tokio::task::JoinHandle;

/// The outside services the application talks to
pub struct Collaborators {
    pub oauth: Arc<dyn OAuthProvider>,
    pub store: Arc<dyn VectorStore>,
    pub youtube: Arc<dyn YoutubeBackend>,
}

/// Application state shared between Tauri commands
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<tokio::sync::RwLock<AppConfig>>,
    pub session: Arc<SessionStore>,
    pub persistence: Arc<PersistenceCoordinator>,
    pub lookup: Arc<VideoLookup>,
    pub llm: Arc<MistralClient>,
}

impl AppState {
    pub fn new(config: AppConfig, collaborators: Collaborators) -> anyhow::Result<Self> {
        let session = Arc::new(SessionStore::new(
            collaborators.oauth,
            config.auth.clone(),
        ));
        let persistence = Arc::new(PersistenceCoordinator::new(
            collaborators.store,
            session.clone(),
            config.datastore.embedding_dimension,
        ));
        let lookup = Arc::new(VideoLookup::new(collaborators.youtube));
        let llm = MistralClient::new(config.llm.clone())
            .map_err(|e| anyhow::anyhow!("Failed to create model provider client: {}", e))?;

        Ok(Self {
            config: Arc::new(tokio::sync::RwLock::new(config)),
            session,
            persistence,
            lookup,
            llm: Arc::new(llm),
        })
    }

    /// Provision the store, restore the saved session, then start mirroring token changes.
    pub async fn start(&self) -> JoinHandle<()> {
        self.persistence.initialize().await;
        self.persistence.spawn_token_sync()
    }

    /// Fetch captions for a looked-up video and save the resulting record.
    pub async fn save_video_from_lookup(
        &self,
        source_url: &str,
        video: &VideoMetadataView,
    ) -> AppResult<VideoRecord> {
        let captions = self.lookup.get_transcripts(&video.video_id).await?;
        let record = VideoRecord::from_lookup(source_url, video, captions);
        self.persistence.save_video(&record).await?;
        Ok(record)
    }

    /// Load the config file, falling back to (and persisting) defaults when unusable.
    pub fn load_or_initialize_config() -> AppConfig {
        match AppConfig::load() {
            Ok(cfg) => {
                if let Err(err) = cfg.validate() {
                    tracing::warn!(
                        "Invalid configuration detected ({}), falling back to defaults",
                        err
                    );
                    let mut default_cfg = AppConfig::default();
                    if let Err(save_err) = default_cfg.save() {
                        tracing::warn!("Failed to persist default configuration: {}", save_err);
                    }
                    default_cfg.apply_env_overrides();
                    default_cfg
                } else {
                    cfg
                }
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to load configuration from disk: {}. Using defaults",
                    err
                );
                let mut default_cfg = AppConfig::default();
                if let Err(save_err) = default_cfg.save() {
                    tracing::warn!("Failed to persist default configuration: {}", save_err);
                }
                default_cfg.apply_env_overrides();
                default_cfg
            }
        }
    }
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize the library with default settings
pub fn init() -> anyhow::Result<()> {
    utils::init_tracing();
    tracing::info!("📚 {} v{} initialized", NAME, VERSION);
    Ok(())
}
