//! Persistence coordinator
//!
//! Provisions the fixed collections, keeps a cached copy of the singleton
//! settings record, stores saved videos and mirrors the session's token set
//! into `Settings.auth_store`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::datastore::{Point, VectorStore};
use crate::core::models::{AppResult, Settings, TokenSet, VideoRecord};
use crate::core::session::SessionStore;

pub const SETTINGS_COLLECTION: &str = "settings";
pub const VIDEOS_COLLECTION: &str = "videos";
pub const EMBEDDINGS_COLLECTION: &str = "embeddings";
pub const SETTINGS_ID: u64 = 1;

/// Vector written for records that carry no real embedding
const PLACEHOLDER_VECTOR: [f32; 1] = [0.0];

/// 32-bit string hash of a source URL, folded to a non-negative id.
///
/// `h = h * 31 + unit` over UTF-16 code units with 32-bit wrap-around,
/// then reinterpreted as unsigned.
pub fn video_id_for(source_url: &str) -> u64 {
    let mut hash: i32 = 0;
    for unit in source_url.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    u64::from(hash as u32)
}

pub struct PersistenceCoordinator {
    store: Arc<dyn VectorStore>,
    session: Arc<SessionStore>,
    embedding_dimension: usize,
    settings: RwLock<Option<Settings>>,
    ready: AtomicBool,
    write_guard: Mutex<()>,
}

impl PersistenceCoordinator {
    pub fn new(
        store: Arc<dyn VectorStore>,
        session: Arc<SessionStore>,
        embedding_dimension: usize,
    ) -> Self {
        Self {
            store,
            session,
            embedding_dimension,
            settings: RwLock::new(None),
            ready: AtomicBool::new(false),
            write_guard: Mutex::new(()),
        }
    }

    /// Cached settings; `None` until a record has been loaded or written.
    pub fn settings(&self) -> Option<Settings> {
        self.settings.read().clone()
    }

    /// True once startup provisioning has finished (successfully or not)
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Startup: provision collections, load settings and restore the session.
    ///
    /// Failures are logged; the coordinator is marked ready either way.
    pub async fn initialize(&self) {
        if let Err(e) = self.initialize_inner().await {
            error!("❌ Failed to initialize database: {}", e);
        }
        self.ready.store(true, Ordering::SeqCst);
    }

    async fn initialize_inner(&self) -> AppResult<()> {
        self.ensure_collections().await?;

        match self.get_settings().await? {
            Some(settings) => {
                info!("⚙️ Loaded settings record");
                *self.settings.write() = Some(settings.clone());

                if !settings.auth_store.is_empty() {
                    self.session.restore_session(settings.auth_store);
                }
            }
            None => {
                info!("⚙️ No settings record yet, writing defaults");
                self.save_settings(Settings::default()).await?;
            }
        }
        Ok(())
    }

    async fn ensure_collections(&self) -> AppResult<()> {
        let existing: Vec<String> = self
            .store
            .list_collections()
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();

        let wanted = [
            (SETTINGS_COLLECTION, 1),
            (VIDEOS_COLLECTION, 1),
            (EMBEDDINGS_COLLECTION, self.embedding_dimension),
        ];

        for (name, dimension) in wanted {
            if !existing.iter().any(|n| n == name) {
                self.store.create_collection(name, dimension).await?;
            }
        }
        Ok(())
    }

    /// Upsert the whole settings record; the cache is updated only on success.
    pub async fn save_settings(&self, settings: Settings) -> AppResult<()> {
        let payload = serde_json::to_value(&settings)?;
        self.store
            .upsert(
                SETTINGS_COLLECTION,
                vec![Point {
                    id: SETTINGS_ID,
                    vector: PLACEHOLDER_VECTOR.to_vec(),
                    payload,
                }],
            )
            .await
            .map_err(|e| {
                error!("Error saving settings: {}", e);
                e
            })?;

        *self.settings.write() = Some(settings);
        debug!("Settings saved");
        Ok(())
    }

    /// Settings form path: replace the model-provider fields, keep the auth store.
    pub async fn update_model_settings(
        &self,
        model_provider_token: String,
        model_name: String,
    ) -> AppResult<Settings> {
        let _write = self.write_guard.lock().await;

        let mut settings = self.settings().unwrap_or_default();
        settings.model_provider_token = model_provider_token;
        settings.model_name = model_name;
        settings.validate()?;

        self.save_settings(settings.clone()).await?;
        Ok(settings)
    }

    /// Read the singleton record. `Ok(None)` means no record exists.
    pub async fn get_settings(&self) -> AppResult<Option<Settings>> {
        let points = self
            .store
            .get_points(SETTINGS_COLLECTION, &[SETTINGS_ID])
            .await?;

        match points.into_iter().next() {
            Some(point) if !point.payload.is_null() => {
                let settings: Settings = serde_json::from_value(point.payload)?;
                Ok(Some(settings))
            }
            _ => Ok(None),
        }
    }

    /// Mirror a token set into `Settings.auth_store`.
    ///
    /// Returns whether a write was issued. Writes are serialized and the
    /// comparison is made after acquiring the guard.
    pub async fn sync_auth_store(&self, tokens: Option<TokenSet>) -> AppResult<bool> {
        let _write = self.write_guard.lock().await;

        let new_store = tokens.unwrap_or_default();
        let cached = self.settings();
        if cached.as_ref().map(|s| &s.auth_store) == Some(&new_store) {
            return Ok(false);
        }

        let mut settings = cached.unwrap_or_default();
        settings.auth_store = new_store;
        self.save_settings(settings).await?;
        debug!("Auth store mirrored into settings");
        Ok(true)
    }

    /// Subscribe to the session's token changes and mirror each one.
    ///
    /// The value current at subscription is mirrored first, so a change
    /// published before the task started is not lost.
    pub fn spawn_token_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let mut receiver: watch::Receiver<Option<TokenSet>> = self.session.subscribe();
        let coordinator = Arc::clone(self);

        tokio::spawn(async move {
            let current = receiver.borrow_and_update().clone();
            if let Err(e) = coordinator.sync_auth_store(current).await {
                warn!("Failed to mirror tokens into settings: {}", e);
            }

            while receiver.changed().await.is_ok() {
                let tokens = receiver.borrow_and_update().clone();
                if let Err(e) = coordinator.sync_auth_store(tokens).await {
                    warn!("Failed to mirror tokens into settings: {}", e);
                }
            }
            debug!("Token sync stopped, session dropped");
        })
    }

    /// Upsert a video at the id derived from its source URL.
    pub async fn save_video(&self, video: &VideoRecord) -> AppResult<u64> {
        let id = video_id_for(&video.source_url);
        let payload = serde_json::to_value(video)?;

        self.store
            .upsert(
                VIDEOS_COLLECTION,
                vec![Point {
                    id,
                    vector: PLACEHOLDER_VECTOR.to_vec(),
                    payload,
                }],
            )
            .await
            .map_err(|e| {
                error!("Error saving video: {}", e);
                e
            })?;

        info!("💾 Saved video {} as {}", video.source_url, id);
        Ok(id)
    }

    /// Every saved video. Payloads that no longer parse are skipped with a warning.
    pub async fn get_videos(&self) -> AppResult<Vec<VideoRecord>> {
        let response = self
            .store
            .query(&format!("SELECT * FROM {}", VIDEOS_COLLECTION))
            .await?;

        Ok(response
            .results
            .into_iter()
            .filter_map(|hit| {
                let id = hit.id;
                match serde_json::from_value::<VideoRecord>(hit.payload) {
                    Ok(video) => Some(video),
                    Err(e) => {
                        warn!("Skipping unreadable video record {}: {}", id, e);
                        None
                    }
                }
            })
            .collect())
    }
}
