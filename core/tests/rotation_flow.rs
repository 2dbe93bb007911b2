//! Login, refresh, theft and logout flows through the public API

use std::sync::Arc;

use bk_core::{
    Clock, InMemoryTokenStore, ManualClock, RefreshTokenService, RefreshTokenServiceConfig, TokenError,
    TokenState,
};
use bk_shared::RefreshTokenConfig;
use chrono::{Duration, Utc};
use uuid::Uuid;

fn service(
    config: &RefreshTokenConfig,
) -> (RefreshTokenService<InMemoryTokenStore>, InMemoryTokenStore, Arc<ManualClock>) {
    let store = InMemoryTokenStore::new();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let service = RefreshTokenService::new(
        Arc::new(store.clone()),
        RefreshTokenServiceConfig::from(config),
    )
    .with_clock(clock.clone());
    (service, store, clock)
}

#[tokio::test]
async fn test_stolen_token_locks_out_family() {
    let (service, store, clock) = service(&RefreshTokenConfig::default());
    let user_id = Uuid::new_v4();

    let login = service.create_refresh_token(user_id, None).await.unwrap();
    let family = login.record.token_family;

    // The legitimate client refreshes twice
    clock.advance(Duration::minutes(15));
    let second = service
        .validate_and_rotate(login.raw_token.as_str())
        .await
        .unwrap();
    clock.advance(Duration::minutes(15));
    let third = service
        .validate_and_rotate(second.raw_token.as_str())
        .await
        .unwrap();

    // An attacker holding the login token replays it
    let err = service
        .validate_and_rotate(login.raw_token.as_str())
        .await
        .unwrap_err();
    assert!(err.is_security_incident());
    assert!(!err.is_retryable());

    let now = clock.now();
    let lineage = service.token_lineage(family).await.unwrap();
    let states: Vec<TokenState> = lineage.iter().map(|record| record.state_at(now)).collect();
    assert_eq!(
        states,
        vec![TokenState::Rotated, TokenState::Rotated, TokenState::Revoked]
    );
    assert_eq!(lineage[2].id, third.record.id);

    // The user must log in again
    assert_eq!(service.get_active_token_count(user_id).await.unwrap(), 0);
    assert_eq!(store.len().await, 3);
}

#[tokio::test]
async fn test_logout_everywhere_then_login_again() {
    let (service, _store, _clock) = service(&RefreshTokenConfig::default());
    let user_id = Uuid::new_v4();

    let phone = service.create_refresh_token(user_id, None).await.unwrap();
    service.create_refresh_token(user_id, None).await.unwrap();

    assert_eq!(service.revoke_all_user_tokens(user_id).await.unwrap(), 2);
    assert!(matches!(
        service.validate_and_rotate(phone.raw_token.as_str()).await,
        Err(TokenError::TokenReuseDetected { .. })
    ));

    let fresh = service.create_refresh_token(user_id, None).await.unwrap();
    assert_ne!(fresh.record.token_family, phone.record.token_family);
    assert_eq!(service.get_active_token_count(user_id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_configured_lifetime_and_retention() {
    let config = RefreshTokenConfig::default()
        .with_lifetime_days(1)
        .with_retention_days(0);
    let (service, store, clock) = service(&config);

    let issued = service.create_refresh_token(Uuid::new_v4(), None).await.unwrap();
    assert_eq!(
        issued.record.expires_at - issued.record.created_at,
        Duration::days(1)
    );

    clock.advance(Duration::days(1));
    assert!(matches!(
        service.validate_and_rotate(issued.raw_token.as_str()).await,
        Err(TokenError::TokenExpired)
    ));

    clock.advance(Duration::seconds(1));
    assert_eq!(service.cleanup_expired_tokens().await.unwrap(), 1);
    assert!(store.is_empty().await);
}
