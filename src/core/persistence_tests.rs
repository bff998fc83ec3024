//! Persistence coordinator scenarios

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::core::config::AuthConfig;
    use crate::core::datastore::{Point, VectorStore};
    use crate::core::models::{AppError, Settings, TokenSet, VideoRecord, VideoRecordMetadata};
    use crate::core::persistence::{
        video_id_for, PersistenceCoordinator, EMBEDDINGS_COLLECTION, SETTINGS_COLLECTION,
        SETTINGS_ID, VIDEOS_COLLECTION,
    };
    use crate::core::session::SessionStore;
    use crate::core::test_support::{
        sample_tokens, FakeOAuthProvider, RecordingStore, Scripted, SAMPLE_URL,
    };

    struct Fixture {
        store: Arc<RecordingStore>,
        provider: Arc<FakeOAuthProvider>,
        session: Arc<SessionStore>,
        persistence: Arc<PersistenceCoordinator>,
    }

    fn fixture_with_store(store: Arc<RecordingStore>) -> Fixture {
        let provider = FakeOAuthProvider::new(Scripted::Tokens(sample_tokens("ya29.first")));
        let session = Arc::new(SessionStore::new(provider.clone(), AuthConfig::default()));
        let persistence = Arc::new(PersistenceCoordinator::new(
            store.clone(),
            session.clone(),
            8,
        ));
        Fixture {
            store,
            provider,
            session,
            persistence,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_store(RecordingStore::new())
    }

    fn video(title: &str) -> VideoRecord {
        VideoRecord {
            source_url: SAMPLE_URL.to_string(),
            transcription_text: "hello\nworld".to_string(),
            caption_sequence: Vec::new(),
            embed_player_url: "https://www.youtube.com/embed/xEN85i57UmM".to_string(),
            metadata: VideoRecordMetadata {
                title: title.to_string(),
                channel_name: "Vault Channel".to_string(),
                view_count: 10,
                like_count: 2,
                published_date: "2023-05-01".to_string(),
            },
        }
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_initialize_provisions_collections_and_defaults() {
        let f = fixture();
        assert!(!f.persistence.is_ready());

        f.persistence.initialize().await;

        assert!(f.persistence.is_ready());
        let collections = f.store.list_collections().await.unwrap();
        let dimension_of = |name: &str| {
            collections
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.dimension)
        };
        assert_eq!(dimension_of(SETTINGS_COLLECTION), Some(1));
        assert_eq!(dimension_of(VIDEOS_COLLECTION), Some(1));
        assert_eq!(dimension_of(EMBEDDINGS_COLLECTION), Some(8));

        assert_eq!(f.persistence.settings(), Some(Settings::default()));
        assert_eq!(
            f.persistence.get_settings().await.unwrap(),
            Some(Settings::default())
        );
    }

    #[tokio::test]
    async fn test_initialize_twice_is_harmless() {
        let f = fixture();
        f.persistence.initialize().await;
        f.persistence.initialize().await;

        assert_eq!(f.store.list_collections().await.unwrap().len(), 3);
        assert_eq!(f.store.upsert_count(SETTINGS_COLLECTION), 1);
    }

    #[tokio::test]
    async fn test_initialize_restores_saved_session() {
        let store = RecordingStore::new();
        {
            let first = fixture_with_store(store.clone());
            first.persistence.initialize().await;
            first
                .persistence
                .sync_auth_store(Some(sample_tokens("ya29.saved")))
                .await
                .unwrap();
        }

        let second = fixture_with_store(store);
        second.persistence.initialize().await;

        assert!(second.session.is_authenticated());
        assert_eq!(
            second.session.tokens().unwrap().access_token.as_deref(),
            Some("ya29.saved")
        );
        assert_eq!(
            second.session.user().unwrap().email.as_deref(),
            Some("ada@example.com")
        );
    }

    #[tokio::test]
    async fn test_initialize_failure_still_marks_ready() {
        let store = RecordingStore::new();
        store.fail_reads.store(true, Ordering::SeqCst);
        let f = fixture_with_store(store);

        f.persistence.initialize().await;

        assert!(f.persistence.is_ready());
        assert!(f.persistence.settings().is_none());
        assert!(!f.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_get_settings_distinguishes_absent_from_failure() {
        let f = fixture();
        f.store
            .create_collection(SETTINGS_COLLECTION, 1)
            .await
            .unwrap();
        assert_eq!(f.persistence.get_settings().await.unwrap(), None);

        f.store.fail_reads.store(true, Ordering::SeqCst);
        assert!(matches!(
            f.persistence.get_settings().await,
            Err(AppError::Datastore(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_save_leaves_cache_untouched() {
        let f = fixture();
        f.persistence.initialize().await;
        f.store.fail_writes.store(true, Ordering::SeqCst);

        let result = f
            .persistence
            .update_model_settings("sk-key".to_string(), "mistral-small".to_string())
            .await;

        assert!(result.is_err());
        assert_eq!(f.persistence.settings(), Some(Settings::default()));
    }

    #[tokio::test]
    async fn test_update_model_settings_keeps_auth_store() {
        let f = fixture();
        f.persistence.initialize().await;
        f.persistence
            .sync_auth_store(Some(sample_tokens("ya29.kept")))
            .await
            .unwrap();

        let saved = f
            .persistence
            .update_model_settings("sk-key".to_string(), "mistral-large-latest".to_string())
            .await
            .unwrap();

        assert_eq!(saved.model_provider_token, "sk-key");
        assert_eq!(saved.auth_store.access_token.as_deref(), Some("ya29.kept"));
        let stored = f.persistence.get_settings().await.unwrap().unwrap();
        assert_eq!(stored, saved);

        let rejected = f
            .persistence
            .update_model_settings("sk-key".to_string(), "gpt-4".to_string())
            .await;
        assert!(matches!(rejected, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_token_sync_writes_only_on_change() {
        let f = fixture();
        f.persistence.initialize().await;
        let baseline = f.store.upsert_count(SETTINGS_COLLECTION);
        let tokens = sample_tokens("ya29.first");

        assert!(f.persistence.sync_auth_store(Some(tokens.clone())).await.unwrap());
        assert!(!f.persistence.sync_auth_store(Some(tokens.clone())).await.unwrap());
        assert_eq!(f.store.upsert_count(SETTINGS_COLLECTION), baseline + 1);

        let mut changed = tokens;
        changed.token_type = Some("bearer".to_string());
        assert!(f.persistence.sync_auth_store(Some(changed)).await.unwrap());
        assert_eq!(f.store.upsert_count(SETTINGS_COLLECTION), baseline + 2);

        // Clearing the session mirrors an empty store, once
        assert!(f.persistence.sync_auth_store(None).await.unwrap());
        assert!(!f
            .persistence
            .sync_auth_store(Some(TokenSet::default()))
            .await
            .unwrap());
        assert_eq!(f.store.upsert_count(SETTINGS_COLLECTION), baseline + 3);
    }

    #[tokio::test]
    async fn test_concurrent_identical_syncs_write_once() {
        let f = fixture();
        f.persistence.initialize().await;
        let baseline = f.store.upsert_count(SETTINGS_COLLECTION);
        let tokens = sample_tokens("ya29.burst");

        let (a, b, c) = tokio::join!(
            f.persistence.sync_auth_store(Some(tokens.clone())),
            f.persistence.sync_auth_store(Some(tokens.clone())),
            f.persistence.sync_auth_store(Some(tokens.clone())),
        );

        let writes = [a.unwrap(), b.unwrap(), c.unwrap()]
            .iter()
            .filter(|wrote| **wrote)
            .count();
        assert_eq!(writes, 1);
        assert_eq!(f.store.upsert_count(SETTINGS_COLLECTION), baseline + 1);
    }

    #[tokio::test]
    async fn test_spawned_sync_mirrors_session_changes() {
        let f = fixture();
        f.persistence.initialize().await;
        let sync = f.persistence.spawn_token_sync();

        f.session.sign_in().await.unwrap();
        let persistence = f.persistence.clone();
        wait_for(|| {
            persistence
                .settings()
                .map(|s| s.auth_store.access_token.as_deref() == Some("ya29.first"))
                .unwrap_or(false)
        })
        .await;

        f.session.sign_out().await.unwrap();
        assert_eq!(*f.provider.revoked.lock(), vec!["ya29.first".to_string()]);
        wait_for(|| {
            persistence
                .settings()
                .map(|s| s.auth_store.is_empty())
                .unwrap_or(false)
        })
        .await;

        let stored = f.persistence.get_settings().await.unwrap().unwrap();
        assert!(stored.auth_store.is_empty());
        sync.abort();
    }

    #[tokio::test]
    async fn test_sign_in_before_sync_starts_is_mirrored() {
        let f = fixture();
        f.persistence.initialize().await;

        // Sign-in lands while startup has not yet spawned the sync task
        f.session.sign_in().await.unwrap();
        assert!(f.persistence.settings().unwrap().auth_store.is_empty());

        let sync = f.persistence.spawn_token_sync();
        let persistence = f.persistence.clone();
        wait_for(|| {
            persistence
                .settings()
                .map(|s| s.auth_store.access_token.as_deref() == Some("ya29.first"))
                .unwrap_or(false)
        })
        .await;

        let stored = f.persistence.get_settings().await.unwrap().unwrap();
        assert_eq!(stored.auth_store.access_token.as_deref(), Some("ya29.first"));
        sync.abort();
    }

    #[tokio::test]
    async fn test_sync_start_without_changes_does_not_write() {
        let f = fixture();
        f.persistence.initialize().await;
        let baseline = f.store.upsert_count(SETTINGS_COLLECTION);

        let sync = f.persistence.spawn_token_sync();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(f.store.upsert_count(SETTINGS_COLLECTION), baseline);
        sync.abort();
    }

    #[tokio::test]
    async fn test_save_video_upserts_by_source_url() {
        let f = fixture();
        f.persistence.initialize().await;

        let first_id = f.persistence.save_video(&video("First title")).await.unwrap();
        let second_id = f.persistence.save_video(&video("Second title")).await.unwrap();

        assert_eq!(first_id, second_id);
        assert_eq!(first_id, video_id_for(SAMPLE_URL));

        let videos = f.persistence.get_videos().await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].metadata.title, "Second title");
        assert_eq!(videos[0].source_url, SAMPLE_URL);
    }

    #[tokio::test]
    async fn test_save_video_propagates_failure() {
        let f = fixture();
        f.persistence.initialize().await;
        f.store.fail_writes.store(true, Ordering::SeqCst);

        let result = f.persistence.save_video(&video("Lost")).await;
        assert!(matches!(result, Err(AppError::Datastore(_))));
    }

    #[tokio::test]
    async fn test_get_videos_skips_unreadable_payloads() {
        let f = fixture();
        f.persistence.initialize().await;
        f.persistence.save_video(&video("Readable")).await.unwrap();
        f.store
            .upsert(
                VIDEOS_COLLECTION,
                vec![Point {
                    id: 7,
                    vector: vec![0.0],
                    payload: serde_json::json!({"unexpected": true}),
                }],
            )
            .await
            .unwrap();

        let videos = f.persistence.get_videos().await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].metadata.title, "Readable");
    }

    #[tokio::test]
    async fn test_settings_record_lives_at_fixed_id() {
        let f = fixture();
        f.persistence.initialize().await;

        let points = f
            .store
            .get_points(SETTINGS_COLLECTION, &[SETTINGS_ID])
            .await
            .unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].payload["modelName"], "mistral-tiny");
        assert!(points[0].payload["authStore"].is_object());
    }
}
