use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use tracing::debug;

use crate::entities::users;

/// Subscription-relevant facts for a single user row.
#[derive(Debug, Clone)]
pub struct UserBaseInfo {
    pub user_id: i64,
    pub username: String,
    pub is_banned: bool,
    pub subscription_end_date: NaiveDate,
    /// NULL in the row means the user is not registered; callers treat such
    /// rows the same as a missing row.
    pub created_at: Option<DateTime<Utc>>,
}

impl From<users::Model> for UserBaseInfo {
    fn from(model: users::Model) -> Self {
        Self {
            user_id: model.user_id,
            username: model.username,
            is_banned: model.is_banned,
            subscription_end_date: model.subscription_end_date,
            created_at: model.created_at,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get the base subscription facts for a user.
    pub async fn get_base_info(&self, user_id: i64) -> Result<Option<UserBaseInfo>> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user base info")?;

        debug!(user_id, found = user.is_some(), "Fetched user base info");
        Ok(user.map(UserBaseInfo::from))
    }

    /// Whether a row exists for this user at all (registered or placeholder).
    pub async fn exists(&self, user_id: i64) -> Result<bool> {
        let count = users::Entity::find_by_id(user_id)
            .count(&self.conn)
            .await
            .context("Failed to probe user existence")?;

        debug!(user_id, exists = count > 0, "Probed user existence");
        Ok(count > 0)
    }

    /// All registered user ids, optionally including banned accounts.
    ///
    /// Rows without a creation timestamp are placeholders and never listed.
    pub async fn list_ids(&self, include_banned: bool) -> Result<Vec<i64>> {
        let mut query = users::Entity::find().filter(users::Column::CreatedAt.is_not_null());

        if !include_banned {
            query = query.filter(users::Column::IsBanned.eq(false));
        }

        let ids: Vec<i64> = query
            .all(&self.conn)
            .await
            .context("Failed to list user ids")?
            .into_iter()
            .map(|u| u.user_id)
            .collect();

        debug!(count = ids.len(), include_banned, "Listed user ids");
        Ok(ids)
    }
}
