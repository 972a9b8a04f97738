use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use tracing::debug;

use crate::entities::vpn_configs;

/// One provisioned config as shown to callers (no owner column; callers
/// already know the user they asked about).
#[derive(Debug, Clone)]
pub struct VpnConfigInfo {
    pub id: i64,
    pub config_name: String,
    pub config_uuid: String,
}

impl From<vpn_configs::Model> for VpnConfigInfo {
    fn from(model: vpn_configs::Model) -> Self {
        Self {
            id: model.id,
            config_name: model.config_name,
            config_uuid: model.config_uuid,
        }
    }
}

pub struct ConfigRepository {
    conn: DatabaseConnection,
}

impl ConfigRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Number of configs this user has created.
    pub async fn count_for_user(&self, user_id: i64) -> Result<u64> {
        let count = vpn_configs::Entity::find()
            .filter(vpn_configs::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await
            .context("Failed to count configs for user")?;

        debug!(user_id, count, "Fetched created config count");
        Ok(count)
    }

    /// Whether the user owns at least one config.
    pub async fn has_any(&self, user_id: i64) -> Result<bool> {
        let count = self.count_for_user(user_id).await?;
        Ok(count > 0)
    }

    /// Names and uuids of all configs owned by the user.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<VpnConfigInfo>> {
        let configs: Vec<VpnConfigInfo> = vpn_configs::Entity::find()
            .filter(vpn_configs::Column::UserId.eq(user_id))
            .all(&self.conn)
            .await
            .context("Failed to list configs for user")?
            .into_iter()
            .map(VpnConfigInfo::from)
            .collect();

        debug!(user_id, count = configs.len(), "Listed user configs");
        Ok(configs)
    }
}
