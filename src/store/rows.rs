use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use super::models::{
    Collection, Comment, HistoryEntry, Notification, NotificationKind, Profile, StoredRecipe,
};
use crate::recipes::model::{Author, Nutrient, Recipe};

/// Column list matching [`RecipeRow`]; expects `recipes r LEFT JOIN profiles p`.
pub const RECIPE_COLUMNS: &str = "r.id, r.user_id, r.title, r.description, r.ingredients, \
     r.instructions, r.prep_time, r.cook_time, r.servings, r.temperature, r.average_rating, \
     r.rating_count, r.tags, r.nutrients, r.image_url, r.source, r.public, r.created_at, \
     p.username AS author_username, p.avatar_url AS author_avatar_url";

#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub prep_time: String,
    pub cook_time: String,
    pub servings: i32,
    pub temperature: Option<String>,
    pub average_rating: Option<f64>,
    pub rating_count: Option<i32>,
    pub tags: Vec<String>,
    pub nutrients: Json<Vec<Nutrient>>,
    pub image_url: Option<String>,
    pub source: Option<String>,
    pub public: bool,
    pub created_at: OffsetDateTime,
    pub author_username: Option<String>,
    pub author_avatar_url: Option<String>,
}

impl From<RecipeRow> for StoredRecipe {
    fn from(r: RecipeRow) -> Self {
        let author = (r.author_username.is_some() || r.author_avatar_url.is_some()).then(|| {
            Author {
                username: r.author_username,
                avatar_url: r.author_avatar_url,
            }
        });
        Self {
            owner: r.user_id,
            public: r.public,
            recipe: Recipe {
                id: r.id,
                title: r.title,
                description: r.description,
                ingredients: r.ingredients,
                instructions: r.instructions,
                prep_time: r.prep_time,
                cook_time: r.cook_time,
                servings: r.servings,
                temperature: r.temperature,
                average_rating: r.average_rating,
                rating_count: r.rating_count,
                tags: r.tags,
                nutrients: r.nutrients.0,
                image_url: r.image_url,
                generated_at: r.created_at,
                source: r.source,
                author,
            },
        }
    }
}

impl From<RecipeRow> for Recipe {
    fn from(r: RecipeRow) -> Self {
        StoredRecipe::from(r).recipe
    }
}

#[derive(Debug, FromRow)]
pub struct HistoryRow {
    pub history_id: Uuid,
    pub viewed_at: OffsetDateTime,
    #[sqlx(flatten)]
    pub recipe: RecipeRow,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(r: HistoryRow) -> Self {
        Self {
            id: r.history_id,
            created_at: r.viewed_at,
            recipe: r.recipe.into(),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct CollectionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub recipe_count: i64,
    pub created_at: OffsetDateTime,
}

impl From<CollectionRow> for Collection {
    fn from(r: CollectionRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            recipe_count: r.recipe_count,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(r: ProfileRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            avatar_url: r.avatar_url,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub author_username: Option<String>,
    pub author_avatar_url: Option<String>,
}

impl From<CommentRow> for Comment {
    fn from(r: CommentRow) -> Self {
        let author = Profile {
            id: r.user_id,
            username: r.author_username,
            avatar_url: r.author_avatar_url,
        };
        Self {
            id: r.id,
            recipe_id: r.recipe_id,
            user_id: r.user_id,
            content: r.content,
            created_at: r.created_at,
            author: (author.username.is_some() || author.avatar_url.is_some()).then_some(author),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub actor_id: Uuid,
    pub recipe_id: Option<Uuid>,
    pub kind: String,
    pub read: bool,
    pub created_at: OffsetDateTime,
    pub actor_username: Option<String>,
    pub actor_avatar_url: Option<String>,
    pub recipe_title: Option<String>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = anyhow::Error;

    fn try_from(r: NotificationRow) -> Result<Self, Self::Error> {
        let kind = NotificationKind::parse(&r.kind)
            .ok_or_else(|| anyhow::anyhow!("unknown notification type {:?}", r.kind))?;
        let actor = Profile {
            id: r.actor_id,
            username: r.actor_username,
            avatar_url: r.actor_avatar_url,
        };
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            actor_id: r.actor_id,
            recipe_id: r.recipe_id,
            kind,
            read: r.read,
            created_at: r.created_at,
            actor: (actor.username.is_some() || actor.avatar_url.is_some()).then_some(actor),
            recipe_title: r.recipe_title,
        })
    }
}
