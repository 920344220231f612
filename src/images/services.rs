use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use uuid::Uuid;

use crate::storage::StorageClient;

pub const RECIPE_IMAGES_BUCKET: &str = "recipe-images";
pub const AVATARS_BUCKET: &str = "avatars";

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

pub fn is_inline_image(url: &str) -> bool {
    url.starts_with("data:image")
}

/// Decodes a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> anyhow::Result<UploadItem> {
    let rest = url
        .strip_prefix("data:")
        .context("not a data url")?;
    let (meta, payload) = rest.split_once(',').context("data url has no payload")?;
    let content_type = meta
        .strip_suffix(";base64")
        .context("data url is not base64 encoded")?;
    let content_type = if content_type.is_empty() {
        "application/octet-stream"
    } else {
        content_type
    };
    let body = STANDARD
        .decode(payload.trim())
        .context("invalid base64 payload")?;
    anyhow::ensure!(!body.is_empty(), "empty image payload");
    Ok(UploadItem {
        body: Bytes::from(body),
        content_type: content_type.to_string(),
    })
}

/// Uploads a recipe image to `<recipe id>.<ext>` and returns its public URL.
pub async fn upload_recipe_image(
    storage: &dyn StorageClient,
    recipe_id: Uuid,
    image: UploadItem,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(&image.content_type).unwrap_or("webp");
    let key = format!("{}.{}", recipe_id, ext);
    storage
        .put_object(RECIPE_IMAGES_BUCKET, &key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(storage.public_url(RECIPE_IMAGES_BUCKET, &key))
}

/// Uploads an avatar under a fresh random key and returns its public URL.
pub async fn upload_avatar(
    storage: &dyn StorageClient,
    user_id: Uuid,
    image: UploadItem,
) -> anyhow::Result<String> {
    anyhow::ensure!(
        image.content_type.starts_with("image/"),
        "avatar must be an image"
    );
    let ext = ext_from_mime(&image.content_type).unwrap_or("bin");
    let key = format!("{}-{}.{}", user_id, rand::random::<u32>(), ext);
    storage
        .put_object(AVATARS_BUCKET, &key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(storage.public_url(AVATARS_BUCKET, &key))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
