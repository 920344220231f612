//! Persistence gateway: every read and write against the relational store.
//!
//! All link writes (save, history, like, follow, collection membership) are
//! idempotent on their natural composite key. Writes that reference an unknown
//! recipe fail with [`StoreError::NotFound`].

mod memory;
pub mod models;
mod postgres;
mod rows;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::recipes::model::Recipe;
use models::{
    Collection, Comment, HistoryEntry, LikeSummary, NewNotification, Notification, Profile,
    RatingSummary, StoredRecipe,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts the recipe, or refreshes its fields when `owner` already owns it.
    /// A row owned by someone else is left untouched.
    async fn upsert_recipe(&self, recipe: &Recipe, owner: Uuid) -> StoreResult<()>;
    async fn get_recipe(&self, id: Uuid) -> StoreResult<Option<StoredRecipe>>;
    async fn list_public_recipes(&self, limit: i64) -> StoreResult<Vec<Recipe>>;
    async fn update_ingredients(&self, id: Uuid, ingredients: &[String]) -> StoreResult<()>;

    async fn save_recipe(&self, user: Uuid, recipe: Uuid) -> StoreResult<()>;
    async fn remove_saved(&self, user: Uuid, recipe: Uuid) -> StoreResult<()>;
    async fn is_saved(&self, user: Uuid, recipe: Uuid) -> StoreResult<bool>;
    async fn list_saved(&self, user: Uuid) -> StoreResult<Vec<Recipe>>;

    async fn add_history(&self, user: Uuid, recipe: Uuid) -> StoreResult<()>;
    async fn list_history(&self, user: Uuid, limit: i64) -> StoreResult<Vec<HistoryEntry>>;

    async fn create_collection(&self, user: Uuid, name: &str) -> StoreResult<Collection>;
    async fn delete_collection(&self, user: Uuid, collection: Uuid) -> StoreResult<()>;
    async fn list_collections(&self, user: Uuid) -> StoreResult<Vec<Collection>>;
    async fn add_to_collection(&self, user: Uuid, collection: Uuid, recipe: Uuid)
        -> StoreResult<()>;
    async fn remove_from_collection(
        &self,
        user: Uuid,
        collection: Uuid,
        recipe: Uuid,
    ) -> StoreResult<()>;
    async fn collection_recipes(&self, user: Uuid, collection: Uuid) -> StoreResult<Vec<Recipe>>;
    async fn recipe_collections(&self, user: Uuid, recipe: Uuid) -> StoreResult<Vec<Uuid>>;

    /// Returns `true` when a new like row was created.
    async fn like(&self, user: Uuid, recipe: Uuid) -> StoreResult<bool>;
    async fn unlike(&self, user: Uuid, recipe: Uuid) -> StoreResult<()>;
    async fn like_summary(&self, recipe: Uuid, viewer: Option<Uuid>) -> StoreResult<LikeSummary>;

    async fn add_comment(&self, recipe: Uuid, user: Uuid, content: &str) -> StoreResult<Comment>;
    async fn list_comments(&self, recipe: Uuid) -> StoreResult<Vec<Comment>>;

    async fn rate(&self, user: Uuid, recipe: Uuid, stars: i16) -> StoreResult<()>;
    async fn rating_summary(&self, recipe: Uuid, viewer: Option<Uuid>)
        -> StoreResult<RatingSummary>;

    async fn follow(&self, follower: Uuid, following: Uuid) -> StoreResult<()>;
    async fn unfollow(&self, follower: Uuid, following: Uuid) -> StoreResult<()>;
    async fn is_following(&self, follower: Uuid, following: Uuid) -> StoreResult<bool>;
    async fn followers(&self, user: Uuid) -> StoreResult<Vec<Profile>>;
    async fn following(&self, user: Uuid) -> StoreResult<Vec<Profile>>;

    async fn create_notification(&self, notification: NewNotification) -> StoreResult<()>;
    async fn list_notifications(&self, user: Uuid, limit: i64) -> StoreResult<Vec<Notification>>;
    /// Returns how many notifications flipped to read.
    async fn mark_notifications_read(&self, user: Uuid) -> StoreResult<u64>;

    async fn get_profile(&self, user: Uuid) -> StoreResult<Option<Profile>>;
    async fn upsert_profile(&self, profile: &Profile) -> StoreResult<Profile>;
}
