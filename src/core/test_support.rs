//! In-process fakes for the collaborator traits

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;

use crate::core::config::AuthConfig;
use crate::core::datastore::{
    CollectionInfo, LocalVectorStore, Point, PointRecord, QueryResponse, VectorStore,
};
use crate::core::models::{
    AppError, AppResult, RawCaptionEvent, RawCaptionSegment, RawTranscript, TokenSet,
    VideoMetadataView,
};
use crate::core::session::OAuthProvider;
use crate::core::youtube::YoutubeBackend;

pub const SAMPLE_URL: &str = "https://www.youtube.com/watch?v=xEN85i57UmM";
pub const SAMPLE_ID: &str = "xEN85i57UmM";

/// Unsigned compact token carrying the given claims
pub fn make_id_token(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

pub fn sample_tokens(access: &str) -> TokenSet {
    TokenSet {
        access_token: Some(access.to_string()),
        refresh_token: Some("1//refresh".to_string()),
        id_token: Some(make_id_token(serde_json::json!({
            "email": "ada@example.com",
            "name": "Ada Lovelace",
            "sub": "1234567890"
        }))),
        token_type: Some("Bearer".to_string()),
        ..TokenSet::default()
    }
}

pub fn sample_view(video_id: &str, title: &str) -> VideoMetadataView {
    VideoMetadataView {
        title: title.to_string(),
        video_id: video_id.to_string(),
        channel_name: "Vault Channel".to_string(),
        view_count: "1,234".to_string(),
        like_count: "56".to_string(),
        publish_date: "2023-05-01".to_string(),
        ..VideoMetadataView::default()
    }
}

pub fn sample_transcript(lines: &[&str]) -> RawTranscript {
    RawTranscript {
        events: Some(
            lines
                .iter()
                .enumerate()
                .map(|(i, line)| RawCaptionEvent {
                    t_start_ms: i as u64 * 1000,
                    d_duration_ms: 1000,
                    segs: Some(vec![RawCaptionSegment {
                        utf8: Some(line.to_string()),
                    }]),
                })
                .collect(),
        ),
    }
}

/// What the fake identity provider answers with
#[derive(Debug, Clone)]
pub enum Scripted {
    Tokens(TokenSet),
    Cancel,
    Fail(String),
}

impl Scripted {
    fn play(&self) -> AppResult<TokenSet> {
        match self {
            Self::Tokens(tokens) => Ok(tokens.clone()),
            Self::Cancel => Err(AppError::Cancelled("closed".to_string())),
            Self::Fail(message) => Err(AppError::Auth(message.clone())),
        }
    }
}

pub struct FakeOAuthProvider {
    pub sign_in: Mutex<Scripted>,
    pub refresh: Mutex<Scripted>,
    pub revoke_fails: AtomicBool,
    pub revoked: Mutex<Vec<String>>,
    pub refreshed_with: Mutex<Vec<String>>,
}

impl FakeOAuthProvider {
    pub fn new(sign_in: Scripted) -> Arc<Self> {
        Arc::new(Self {
            sign_in: Mutex::new(sign_in),
            refresh: Mutex::new(Scripted::Fail("refresh not scripted".to_string())),
            revoke_fails: AtomicBool::new(false),
            revoked: Mutex::new(Vec::new()),
            refreshed_with: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl OAuthProvider for FakeOAuthProvider {
    async fn sign_in(&self, _config: &AuthConfig) -> AppResult<TokenSet> {
        self.sign_in.lock().play()
    }

    async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        self.revoked.lock().push(access_token.to_string());
        if self.revoke_fails.load(Ordering::SeqCst) {
            return Err(AppError::Auth("revoke endpoint unreachable".to_string()));
        }
        Ok(())
    }

    async fn refresh_token(&self, refresh_token: &str, _config: &AuthConfig) -> AppResult<TokenSet> {
        self.refreshed_with.lock().push(refresh_token.to_string());
        self.refresh.lock().play()
    }
}

/// In-memory store that counts writes and can be told to fail
pub struct RecordingStore {
    inner: LocalVectorStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    upserts: Mutex<HashMap<String, usize>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: LocalVectorStore::in_memory(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            upserts: Mutex::new(HashMap::new()),
        })
    }

    pub fn upsert_count(&self, collection: &str) -> usize {
        self.upserts.lock().get(collection).copied().unwrap_or(0)
    }

    fn check(flag: &AtomicBool) -> AppResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(AppError::Datastore("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn list_collections(&self) -> AppResult<Vec<CollectionInfo>> {
        Self::check(&self.fail_reads)?;
        self.inner.list_collections().await
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> AppResult<()> {
        Self::check(&self.fail_writes)?;
        self.inner.create_collection(name, dimension).await
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> AppResult<()> {
        Self::check(&self.fail_writes)?;
        *self.upserts.lock().entry(collection.to_string()).or_insert(0) += 1;
        self.inner.upsert(collection, points).await
    }

    async fn get_points(&self, collection: &str, ids: &[u64]) -> AppResult<Vec<PointRecord>> {
        Self::check(&self.fail_reads)?;
        self.inner.get_points(collection, ids).await
    }

    async fn query(&self, query: &str) -> AppResult<QueryResponse> {
        Self::check(&self.fail_reads)?;
        self.inner.query(query).await
    }
}

/// Canned YouTube answers keyed by canonical URL / video id
#[derive(Default)]
pub struct FakeYoutubeBackend {
    videos: Mutex<HashMap<String, (VideoMetadataView, Duration)>>,
    captions: Mutex<HashMap<String, RawTranscript>>,
    pub video_calls: AtomicUsize,
    pub caption_calls: AtomicUsize,
}

impl FakeYoutubeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_video(&self, view: VideoMetadataView, latency: Duration) {
        let url = crate::utils::canonical_watch_url(&view.video_id);
        self.videos.lock().insert(url, (view, latency));
    }

    pub fn add_captions(&self, video_id: &str, transcript: RawTranscript) {
        self.captions.lock().insert(video_id.to_string(), transcript);
    }
}

#[async_trait]
impl YoutubeBackend for FakeYoutubeBackend {
    async fn fetch_video_data(&self, url: &str) -> AppResult<VideoMetadataView> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        let entry = self.videos.lock().get(url).cloned();
        let (view, latency) =
            entry.ok_or_else(|| AppError::Youtube(format!("Video not found: {}", url)))?;
        tokio::time::sleep(latency).await;
        Ok(view)
    }

    async fn fetch_captions(&self, video_id: &str) -> AppResult<RawTranscript> {
        self.caption_calls.fetch_add(1, Ordering::SeqCst);
        self.captions
            .lock()
            .get(video_id)
            .cloned()
            .ok_or_else(|| AppError::Youtube(format!("No captions endpoint for {}", video_id)))
    }
}
