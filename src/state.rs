use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::db::{self, Db};
use crate::storage::{LocalStorage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::connect(&config.database_url).await?;
        let storage = Arc::new(LocalStorage::new(&config.media_root)) as Arc<dyn StorageClient>;
        Ok(Self::from_parts(db, Arc::new(config), storage))
    }

    pub fn from_parts(db: Db, config: Arc<AppConfig>, storage: Arc<dyn StorageClient>) -> Self {
        let jwt = JwtKeys::from_config(&config.jwt);
        Self {
            db,
            config,
            jwt,
            storage,
        }
    }

    /// Migrated in-memory database, fixed test secrets and in-memory media.
    #[cfg(test)]
    pub async fn fake() -> Self {
        use crate::config::JwtConfig;
        use crate::storage::memory::MemoryStorage;

        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            jwt: JwtConfig {
                access_secret: "test-access-secret".into(),
                refresh_secret: "test-refresh-secret".into(),
                access_ttl_minutes: 30,
                refresh_ttl_minutes: 60 * 24 * 7,
                leeway_seconds: 0,
            },
            media_root: "media".into(),
            host: "127.0.0.1".into(),
            port: 0,
        });
        let storage = Arc::new(MemoryStorage::default()) as Arc<dyn StorageClient>;
        Self::from_parts(db::test_pool().await, config, storage)
    }
}
