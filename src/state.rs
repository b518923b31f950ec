use std::sync::Arc;

use tracing::{info, warn};

use crate::access::seed::seed_reference_data;
use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::store::{memory::InMemoryStore, postgres::PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    /// Builds the state from the environment: Postgres (migrated) when
    /// `DATABASE_URL` is set, the in-memory store otherwise.
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let store: Arc<dyn Store> = match config.database_url.as_deref() {
            Some(url) => {
                let pg = PgStore::connect(url, config.database_max_connections).await?;
                pg.migrate().await?;
                Arc::new(pg)
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store, data is lost on restart");
                Arc::new(InMemoryStore::new())
            }
        };
        info!(backend = store.backend_name(), "store ready");

        if config.seed_reference_data {
            seed_reference_data(store.as_ref()).await?;
        }

        Ok(Self::from_parts(store, config))
    }

    pub fn from_parts(store: Arc<dyn Store>, config: AppConfig) -> Self {
        let jwt = Arc::new(JwtKeys::new(&config.jwt));
        Self {
            store,
            config: Arc::new(config),
            jwt,
        }
    }

    /// Empty in-memory state with test configuration. Nothing is seeded.
    pub fn for_tests() -> Self {
        Self::from_parts(Arc::new(InMemoryStore::new()), AppConfig::for_tests())
    }
}
