//! Integration tests for entitlement resolution against a real store.

use chrono::{Duration, NaiveDate, Utc};
use quotarr::config::Config;
use quotarr::domain::UserId;
use quotarr::entities::{bonus_grants, users, vpn_configs};
use quotarr::services::EntitlementError;
use quotarr::state::SharedState;
use sea_orm::{ActiveModelTrait, Set};

async fn spawn_state(default_max_configs: i64) -> SharedState {
    let db_path = std::env::temp_dir().join(format!("quotarr-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.quota.default_max_configs_count = default_max_configs;

    SharedState::new(config)
        .await
        .expect("failed to create shared state")
}

async fn seed_user(
    state: &SharedState,
    user_id: i64,
    username: &str,
    is_banned: bool,
    subscription_end_date: NaiveDate,
    registered: bool,
) {
    users::ActiveModel {
        user_id: Set(user_id),
        username: Set(username.to_string()),
        is_banned: Set(is_banned),
        subscription_end_date: Set(subscription_end_date),
        created_at: Set(registered.then(Utc::now)),
    }
    .insert(&state.store.conn)
    .await
    .expect("failed to insert user");
}

async fn seed_config(state: &SharedState, user_id: i64, name: &str) {
    vpn_configs::ActiveModel {
        user_id: Set(user_id),
        config_name: Set(name.to_string()),
        config_uuid: Set(uuid::Uuid::new_v4().to_string()),
        ..Default::default()
    }
    .insert(&state.store.conn)
    .await
    .expect("failed to insert config");
}

async fn seed_bonus(state: &SharedState, user_id: i64, count: i32) {
    bonus_grants::ActiveModel {
        user_id: Set(user_id),
        bonus_config_count: Set(count),
    }
    .insert(&state.store.conn)
    .await
    .expect("failed to insert bonus grant");
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[tokio::test]
async fn quota_arithmetic_worked_example() {
    // M=5, c=3, b=2 -> remaining 4; after one more config -> 3.
    let state = spawn_state(5).await;
    seed_user(&state, 1, "alice", false, today() + Duration::days(30), true).await;
    for i in 0..3 {
        seed_config(&state, 1, &format!("cfg-{i}")).await;
    }
    seed_bonus(&state, 1, 2).await;

    let entitlement = state
        .entitlement_service
        .resolve(UserId::new(1))
        .await
        .unwrap();
    assert_eq!(entitlement.configs_created, 3);
    assert_eq!(entitlement.bonus_configs, 2);
    assert_eq!(entitlement.configs_remaining, 4);

    // Recomputed from facts on the next query, not cached.
    seed_config(&state, 1, "cfg-3").await;
    let entitlement = state
        .entitlement_service
        .resolve(UserId::new(1))
        .await
        .unwrap();
    assert_eq!(entitlement.configs_created, 4);
    assert_eq!(entitlement.configs_remaining, 3);
}

#[tokio::test]
async fn remaining_goes_negative_when_over_allotment() {
    let state = spawn_state(5).await;
    seed_user(&state, 1, "bob", false, today() + Duration::days(7), true).await;
    for i in 0..7 {
        seed_config(&state, 1, &format!("cfg-{i}")).await;
    }

    let entitlement = state
        .entitlement_service
        .resolve(UserId::new(1))
        .await
        .unwrap();
    assert_eq!(entitlement.configs_remaining, -2);

    let remaining = state
        .entitlement_service
        .remaining_quota(UserId::new(1))
        .await
        .unwrap();
    assert_eq!(remaining, -2);
}

#[tokio::test]
async fn subscription_ending_today_is_active() {
    let state = spawn_state(5).await;
    seed_user(&state, 1, "carol", false, today(), true).await;

    let entitlement = state
        .entitlement_service
        .resolve(UserId::new(1))
        .await
        .unwrap();
    assert!(entitlement.is_active_subscription);
}

#[tokio::test]
async fn subscription_ended_yesterday_is_inactive() {
    let state = spawn_state(5).await;
    seed_user(&state, 1, "dave", false, today() - Duration::days(1), true).await;

    let entitlement = state
        .entitlement_service
        .resolve(UserId::new(1))
        .await
        .unwrap();
    assert!(!entitlement.is_active_subscription);
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let state = spawn_state(5).await;

    let err = state
        .entitlement_service
        .resolve(UserId::new(999))
        .await
        .unwrap_err();
    assert!(matches!(err, EntitlementError::UserNotFound(id) if id.value() == 999));
}

#[tokio::test]
async fn placeholder_row_without_created_at_is_not_found() {
    let state = spawn_state(5).await;
    seed_user(&state, 1, "ghost", false, today() + Duration::days(1), false).await;

    let err = state
        .entitlement_service
        .resolve(UserId::new(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EntitlementError::UserNotFound(_)));
}

#[tokio::test]
async fn absent_bonus_row_behaves_like_zero_grant() {
    let state = spawn_state(5).await;
    seed_user(&state, 1, "no-bonus", false, today() + Duration::days(1), true).await;
    seed_user(&state, 2, "zero-bonus", false, today() + Duration::days(1), true).await;
    seed_config(&state, 1, "a").await;
    seed_config(&state, 2, "b").await;
    seed_bonus(&state, 2, 0).await;

    let without_row = state
        .entitlement_service
        .resolve(UserId::new(1))
        .await
        .unwrap();
    let with_zero_row = state
        .entitlement_service
        .resolve(UserId::new(2))
        .await
        .unwrap();

    assert_eq!(without_row.bonus_configs, 0);
    assert_eq!(with_zero_row.bonus_configs, 0);
    assert_eq!(
        without_row.configs_remaining,
        with_zero_row.configs_remaining
    );
}

#[tokio::test]
async fn remaining_quota_rejects_unknown_user() {
    let state = spawn_state(5).await;

    let err = state
        .entitlement_service
        .remaining_quota(UserId::new(404))
        .await
        .unwrap_err();
    assert!(matches!(err, EntitlementError::UserNotFound(_)));
}

#[tokio::test]
async fn config_listing_and_existence_probes() {
    let state = spawn_state(5).await;
    seed_user(&state, 1, "erin", false, today() + Duration::days(1), true).await;

    assert!(state
        .entitlement_service
        .user_exists(UserId::new(1))
        .await
        .unwrap());
    assert!(!state
        .entitlement_service
        .user_exists(UserId::new(2))
        .await
        .unwrap());
    assert!(!state
        .entitlement_service
        .has_any_config(UserId::new(1))
        .await
        .unwrap());

    seed_config(&state, 1, "home-router").await;
    seed_config(&state, 1, "laptop").await;

    assert!(state
        .entitlement_service
        .has_any_config(UserId::new(1))
        .await
        .unwrap());

    let configs = state
        .entitlement_service
        .list_configs(UserId::new(1))
        .await
        .unwrap();
    assert_eq!(configs.len(), 2);
    let names: Vec<_> = configs.iter().map(|c| c.config_name.as_str()).collect();
    assert!(names.contains(&"home-router"));
    assert!(names.contains(&"laptop"));
    // Each config carries its own uuid.
    assert_ne!(configs[0].config_uuid, configs[1].config_uuid);
}

#[tokio::test]
async fn banned_user_still_resolves_interactively() {
    // Bans gate the scanner enumeration, not interactive queries.
    let state = spawn_state(5).await;
    seed_user(&state, 1, "mallory", true, today() + Duration::days(1), true).await;

    let entitlement = state
        .entitlement_service
        .resolve(UserId::new(1))
        .await
        .unwrap();
    assert!(entitlement.is_banned);
    assert_eq!(entitlement.configs_remaining, 5);
}
