use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Avatar as a `data:image/...;base64,` URL.
#[derive(Debug, Deserialize)]
pub struct AvatarUpload {
    pub image: String,
}
