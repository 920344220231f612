use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::config::{AppConfig, StorageBackend, StoreBackend};
use crate::llm::{provider_from_config, LlmProvider};
use crate::storage::{MemoryStorage, Storage, StorageClient};
use crate::store::{MemoryStore, PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub storage: Arc<dyn StorageClient>,
    pub llm: Arc<dyn LlmProvider>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn Store> = match config.store {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(PgStore::new(db))
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let storage: Arc<dyn StorageClient> = match config.storage.backend {
            StorageBackend::S3 => Arc::new(Storage::new(&config.storage).await?),
            StorageBackend::Memory => Arc::new(MemoryStorage::new(config.storage.public_url.clone())),
        };

        let llm = provider_from_config(&config.llm).context("configure llm provider")?;
        tracing::info!(
            provider = llm.provider_name(),
            model = llm.model_name(),
            "llm provider ready"
        );

        Ok(Self::from_parts(config, store, storage, llm))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn Store>,
        storage: Arc<dyn StorageClient>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            config,
            store,
            storage,
            llm,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// In-memory store and storage with the canned fake provider.
    pub fn fake() -> Self {
        Self::fake_with_llm(Arc::new(crate::llm::FakeProvider::default()))
    }

    pub fn fake_with_llm(llm: Arc<dyn LlmProvider>) -> Self {
        use crate::config::{JwtConfig, LlmBackend, LlmConfig, StorageConfig};

        let config = Arc::new(AppConfig {
            store: StoreBackend::Memory,
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "kitchen".into(),
                audience: "authenticated".into(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                endpoint: "fake".into(),
                region: "us-east-1".into(),
                access_key: "fake".into(),
                secret_key: "fake".into(),
                public_url: "https://storage.test".into(),
            },
            llm: LlmConfig {
                backend: LlmBackend::Fake,
                api_key: None,
                base_url: "fake".into(),
                text_model: "fake".into(),
                image_model: "fake".into(),
            },
        });

        Self::from_parts(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStorage::new("https://storage.test")),
            llm,
        )
    }
}
