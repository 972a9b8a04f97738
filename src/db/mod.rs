use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::config::VpnConfigInfo;
pub use repositories::user::UserBaseInfo;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") && !db_url.contains("mode=memory") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn config_repo(&self) -> repositories::config::ConfigRepository {
        repositories::config::ConfigRepository::new(self.conn.clone())
    }

    fn bonus_repo(&self) -> repositories::bonus::BonusRepository {
        repositories::bonus::BonusRepository::new(self.conn.clone())
    }

    pub async fn get_user_base_info(&self, user_id: i64) -> Result<Option<UserBaseInfo>> {
        self.user_repo().get_base_info(user_id).await
    }

    pub async fn user_exists(&self, user_id: i64) -> Result<bool> {
        self.user_repo().exists(user_id).await
    }

    pub async fn list_user_ids(&self, include_banned: bool) -> Result<Vec<i64>> {
        self.user_repo().list_ids(include_banned).await
    }

    pub async fn count_created_configs(&self, user_id: i64) -> Result<u64> {
        self.config_repo().count_for_user(user_id).await
    }

    pub async fn user_has_any_config(&self, user_id: i64) -> Result<bool> {
        self.config_repo().has_any(user_id).await
    }

    pub async fn list_user_configs(&self, user_id: i64) -> Result<Vec<VpnConfigInfo>> {
        self.config_repo().list_for_user(user_id).await
    }

    pub async fn bonus_config_count(&self, user_id: i64) -> Result<i32> {
        self.bonus_repo().count_for_user(user_id).await
    }
}
