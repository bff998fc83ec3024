//! Session state holder scenarios

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use crate::core::config::AuthConfig;
    use crate::core::models::{AppError, IdentityClaims, TokenSet};
    use crate::core::session::{
        decode_identity, SessionStore, CANCELLED_MESSAGE, NO_REFRESH_TOKEN_MESSAGE,
    };
    use crate::core::test_support::{make_id_token, sample_tokens, FakeOAuthProvider, Scripted};

    fn store_with(provider: &Arc<FakeOAuthProvider>) -> SessionStore {
        SessionStore::new(provider.clone(), AuthConfig::default())
    }

    #[tokio::test]
    async fn test_sign_in_populates_tokens_and_user() {
        let provider = FakeOAuthProvider::new(Scripted::Tokens(sample_tokens("ya29.first")));
        let session = store_with(&provider);
        let mut changes = session.subscribe();

        session.sign_in().await.unwrap();

        assert!(session.is_authenticated());
        assert!(!session.is_loading());
        assert!(session.error().is_none());
        let user = session.user().unwrap();
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(user.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(user.additional["sub"], "1234567890");

        assert!(changes.has_changed().unwrap());
        let published = changes.borrow_and_update().clone().unwrap();
        assert_eq!(published.access_token.as_deref(), Some("ya29.first"));
    }

    #[tokio::test]
    async fn test_failed_sign_in_keeps_previous_session() {
        let provider = FakeOAuthProvider::new(Scripted::Tokens(sample_tokens("ya29.first")));
        let session = store_with(&provider);
        session.sign_in().await.unwrap();
        let before = session.snapshot();

        *provider.sign_in.lock() = Scripted::Fail("consent server exploded".to_string());
        let result = session.sign_in().await;

        assert!(matches!(result, Err(AppError::Auth(_))));
        let after = session.snapshot();
        assert_eq!(after.tokens, before.tokens);
        assert_eq!(after.user, before.user);
        assert!(after.is_authenticated);
        assert!(!after.loading);
        let error = after.error.unwrap();
        assert!(!error.is_empty());
        assert!(error.contains("consent server exploded"));
    }

    #[tokio::test]
    async fn test_cancelled_sign_in_is_reported() {
        let provider = FakeOAuthProvider::new(Scripted::Cancel);
        let session = store_with(&provider);

        let result = session.sign_in().await;

        assert!(matches!(result, Err(AppError::Cancelled(_))));
        assert!(!session.is_authenticated());
        assert_eq!(session.error().as_deref(), Some(CANCELLED_MESSAGE));
    }

    #[tokio::test]
    async fn test_sign_out_revokes_and_clears() {
        let provider = FakeOAuthProvider::new(Scripted::Tokens(sample_tokens("ya29.first")));
        let session = store_with(&provider);
        session.sign_in().await.unwrap();
        let mut changes = session.subscribe();

        session.sign_out().await.unwrap();

        assert_eq!(*provider.revoked.lock(), vec!["ya29.first".to_string()]);
        assert!(!session.is_authenticated());
        assert!(session.tokens().is_none());
        assert!(session.user().is_none());
        assert!(session.error().is_none());
        assert!(changes.borrow_and_update().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_even_when_revoke_fails() {
        let provider = FakeOAuthProvider::new(Scripted::Tokens(sample_tokens("ya29.first")));
        let session = store_with(&provider);
        session.sign_in().await.unwrap();
        provider.revoke_fails.store(true, Ordering::SeqCst);

        let result = session.sign_out().await;

        assert!(result.is_err());
        assert!(session.tokens().is_none());
        assert!(!session.is_authenticated());
        assert!(session.error().is_some());
    }

    #[tokio::test]
    async fn test_sign_out_without_token_skips_revoke() {
        let provider = FakeOAuthProvider::new(Scripted::Cancel);
        let session = store_with(&provider);

        session.sign_out().await.unwrap();

        assert!(provider.revoked.lock().is_empty());
        assert!(session.tokens().is_none());
    }

    #[tokio::test]
    async fn test_refresh_merges_partial_response() {
        let provider = FakeOAuthProvider::new(Scripted::Tokens(sample_tokens("ya29.first")));
        let session = store_with(&provider);
        session.sign_in().await.unwrap();

        *provider.refresh.lock() = Scripted::Tokens(TokenSet {
            access_token: Some("ya29.second".to_string()),
            expires_in: Some(3599),
            ..TokenSet::default()
        });
        session.refresh().await.unwrap();

        assert_eq!(*provider.refreshed_with.lock(), vec!["1//refresh".to_string()]);
        let tokens = session.tokens().unwrap();
        assert_eq!(tokens.access_token.as_deref(), Some("ya29.second"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(tokens.expires_in, Some(3599));
        // Identity survives a refresh that carries no new ID token
        assert_eq!(
            session.user().unwrap().email.as_deref(),
            Some("ada@example.com")
        );
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let provider = FakeOAuthProvider::new(Scripted::Tokens(TokenSet {
            access_token: Some("ya29.only".to_string()),
            ..TokenSet::default()
        }));
        let session = store_with(&provider);
        session.sign_in().await.unwrap();

        let result = session.refresh().await;

        assert!(matches!(result, Err(AppError::Auth(_))));
        assert_eq!(session.error().as_deref(), Some(NO_REFRESH_TOKEN_MESSAGE));
        assert!(provider.refreshed_with.lock().is_empty());
        assert!(!session.is_loading());
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_session_decodes_identity() {
        let provider = FakeOAuthProvider::new(Scripted::Cancel);
        let session = store_with(&provider);

        session.restore_session(sample_tokens("ya29.saved"));

        assert!(session.is_authenticated());
        assert_eq!(
            session.user().unwrap().name.as_deref(),
            Some("Ada Lovelace")
        );
        assert!(!session.is_loading());
    }

    #[test]
    fn test_decode_identity_tolerates_garbage() {
        assert_eq!(decode_identity("not-a-token"), IdentityClaims::default());
        assert_eq!(decode_identity("a.%%%.c"), IdentityClaims::default());

        let token = make_id_token(serde_json::json!({"picture": "https://lh3.example/p.png"}));
        assert_eq!(
            decode_identity(&token).picture.as_deref(),
            Some("https://lh3.example/p.png")
        );
    }
}
