use std::sync::Arc;

use crate::auth::repo::UserStore;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub users: UserStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let users = UserStore::connect(&config.database_url).await?;
        Ok(Self { users, config })
    }

    /// In-memory state for tests: fresh SQLite database per call, migrations applied.
    #[cfg(test)]
    pub async fn fake() -> Self {
        use crate::config::JwtConfig;

        let users = UserStore::in_memory().await.expect("in-memory store");
        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
        });
        Self { users, config }
    }
}
