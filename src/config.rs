use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum StorageBackend {
    S3,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum LlmBackend {
    Gemini,
    Fake,
}

/// S3-compatible object storage (Supabase storage, MinIO, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Public objects are served from `<public_url>/<bucket>/<key>`.
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match env_or("STORE_BACKEND", "postgres").as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => anyhow::bail!("unknown STORE_BACKEND: {other}"),
        };
        let database_url = std::env::var("DATABASE_URL").ok();
        if store == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "kitchen"),
            audience: env_or("JWT_AUDIENCE", "authenticated"),
        };

        let storage_backend = match env_or("STORAGE_BACKEND", "s3").as_str() {
            "s3" => StorageBackend::S3,
            "memory" => StorageBackend::Memory,
            other => anyhow::bail!("unknown STORAGE_BACKEND: {other}"),
        };
        let storage = StorageConfig {
            backend: storage_backend,
            endpoint: env_or("S3_ENDPOINT", "http://localhost:9000"),
            region: env_or("S3_REGION", "us-east-1"),
            access_key: env_or("S3_ACCESS_KEY", ""),
            secret_key: env_or("S3_SECRET_KEY", ""),
            public_url: env_or("STORAGE_PUBLIC_URL", "http://localhost:9000")
                .trim_end_matches('/')
                .to_string(),
        };

        let llm_backend = match env_or("LLM_PROVIDER", "gemini").as_str() {
            "gemini" => LlmBackend::Gemini,
            "fake" => LlmBackend::Fake,
            other => anyhow::bail!("unknown LLM_PROVIDER: {other}"),
        };
        let llm = LlmConfig {
            backend: llm_backend,
            api_key: std::env::var("GEMINI_API_KEY").ok(),
            base_url: env_or("GEMINI_BASE_URL", "https://generativelanguage.googleapis.com"),
            text_model: env_or("GEMINI_TEXT_MODEL", "gemini-1.5-flash"),
            image_model: env_or("GEMINI_IMAGE_MODEL", "gemini-2.0-flash-exp"),
        };

        Ok(Self {
            store,
            database_url,
            jwt,
            storage,
            llm,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
