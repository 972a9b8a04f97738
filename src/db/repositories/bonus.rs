use anyhow::{Context, Result};
use sea_orm::{DatabaseConnection, EntityTrait};
use tracing::debug;

use crate::entities::bonus_grants;

pub struct BonusRepository {
    conn: DatabaseConnection,
}

impl BonusRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Bonus configs granted to the user; a missing grant row counts as 0.
    pub async fn count_for_user(&self, user_id: i64) -> Result<i32> {
        let grant = bonus_grants::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query bonus grant")?;

        let count = grant.map_or(0, |g| g.bonus_config_count);
        debug!(user_id, count, "Fetched bonus config count");
        Ok(count)
    }
}
