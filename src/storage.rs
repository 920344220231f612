use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::config::StorageConfig;

#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Writes the object, replacing any existing object under the same key.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<()>;

    fn public_url(&self, bucket: &str, key: &str) -> String;
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    public_base: String,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            public_base: cfg.public_url.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.public_base, bucket, key)
    }
}

/// Keeps objects in process memory. Used with `STORAGE_BACKEND=memory` and in tests.
pub struct MemoryStorage {
    public_base: String,
    objects: RwLock<HashMap<(String, String), (Bytes, String)>>,
}

impl MemoryStorage {
    pub fn new(public_base: impl Into<String>) -> Self {
        Self {
            public_base: public_base.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the stored body and content type.
    #[cfg(test)]
    pub async fn get(&self, bucket: &str, key: &str) -> Option<(Bytes, String)> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<()> {
        self.objects.write().await.insert(
            (bucket.to_string(), key.to_string()),
            (body, content_type.to_string()),
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.public_base, bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_storage_overwrites_and_builds_public_urls() {
        let storage = MemoryStorage::new("https://cdn.test");
        storage
            .put_object("recipe-images", "a.png", Bytes::from_static(b"one"), "image/png")
            .await
            .unwrap();
        storage
            .put_object("recipe-images", "a.png", Bytes::from_static(b"two"), "image/png")
            .await
            .unwrap();

        let (body, ct) = storage.get("recipe-images", "a.png").await.unwrap();
        assert_eq!(&body[..], b"two");
        assert_eq!(ct, "image/png");
        assert_eq!(
            storage.public_url("recipe-images", "a.png"),
            "https://cdn.test/recipe-images/a.png"
        );
    }
}
