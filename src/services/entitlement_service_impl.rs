//! `SeaORM` implementation of the `EntitlementService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::Config;
use crate::db::{Store, VpnConfigInfo};
use crate::domain::UserId;
use crate::services::entitlement_service::{
    Entitlement, EntitlementError, EntitlementService, configs_remaining, is_subscription_active,
};

pub struct SeaOrmEntitlementService {
    store: Store,
    config: Arc<RwLock<Config>>,
}

impl SeaOrmEntitlementService {
    #[must_use]
    pub const fn new(store: Store, config: Arc<RwLock<Config>>) -> Self {
        Self { store, config }
    }

    async fn default_max_configs(&self) -> i64 {
        self.config.read().await.quota.default_max_configs_count
    }
}

#[async_trait]
impl EntitlementService for SeaOrmEntitlementService {
    async fn resolve(&self, user_id: UserId) -> Result<Entitlement, EntitlementError> {
        let base = self
            .store
            .get_user_base_info(user_id.value())
            .await?
            .ok_or(EntitlementError::UserNotFound(user_id))?;

        // A row without a creation timestamp is a placeholder, not a user.
        let created_at = base
            .created_at
            .ok_or(EntitlementError::UserNotFound(user_id))?;

        // The two counters are independent; fetch them together. Read skew
        // between them (a config created mid-resolve) is tolerated.
        let (configs_created, bonus_configs) = tokio::try_join!(
            self.store.count_created_configs(user_id.value()),
            self.store.bonus_config_count(user_id.value()),
        )?;

        let configs_created = i64::try_from(configs_created).unwrap_or(i64::MAX);
        let bonus_configs = i64::from(bonus_configs);

        let today = Utc::now().date_naive();
        let is_active = is_subscription_active(base.subscription_end_date, today);
        let remaining =
            configs_remaining(self.default_max_configs().await, bonus_configs, configs_created);

        if remaining < 0 {
            debug!(
                user_id = user_id.value(),
                remaining, "Remaining config count is negative"
            );
        }

        debug!(
            user_id = user_id.value(),
            is_active,
            configs_created,
            bonus_configs,
            remaining,
            "Resolved entitlement"
        );

        Ok(Entitlement {
            user_id,
            username: base.username,
            is_banned: base.is_banned,
            is_active_subscription: is_active,
            subscription_end_date: base.subscription_end_date,
            configs_created,
            bonus_configs,
            configs_remaining: remaining,
            created_at,
        })
    }

    async fn remaining_quota(&self, user_id: UserId) -> Result<i64, EntitlementError> {
        if !self.store.user_exists(user_id.value()).await? {
            return Err(EntitlementError::UserNotFound(user_id));
        }

        let (configs_created, bonus_configs) = tokio::try_join!(
            self.store.count_created_configs(user_id.value()),
            self.store.bonus_config_count(user_id.value()),
        )?;

        let remaining = configs_remaining(
            self.default_max_configs().await,
            i64::from(bonus_configs),
            i64::try_from(configs_created).unwrap_or(i64::MAX),
        );

        debug!(
            user_id = user_id.value(),
            remaining, "Computed remaining quota"
        );
        Ok(remaining)
    }

    async fn user_exists(&self, user_id: UserId) -> Result<bool, EntitlementError> {
        Ok(self.store.user_exists(user_id.value()).await?)
    }

    async fn has_any_config(&self, user_id: UserId) -> Result<bool, EntitlementError> {
        Ok(self.store.user_has_any_config(user_id.value()).await?)
    }

    async fn list_configs(&self, user_id: UserId) -> Result<Vec<VpnConfigInfo>, EntitlementError> {
        Ok(self.store.list_user_configs(user_id.value()).await?)
    }
}
