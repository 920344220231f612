use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::{
    models::{
        Collection, Comment, HistoryEntry, LikeSummary, NewNotification, Notification, Profile,
        RatingSummary, StoredRecipe,
    },
    rows::{
        CollectionRow, CommentRow, HistoryRow, NotificationRow, ProfileRow, RecipeRow,
        RECIPE_COLUMNS,
    },
    Store, StoreError, StoreResult,
};
use crate::recipes::model::Recipe;

const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn owns_collection(&self, user: Uuid, collection: Uuid) -> StoreResult<()> {
        let owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM collections WHERE id = $1 AND user_id = $2)",
        )
        .bind(collection)
        .bind(user)
        .fetch_one(&self.db)
        .await?;
        if owned {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }
}

/// A missing referenced recipe surfaces as `NotFound` rather than a database error.
fn map_fk(e: sqlx::Error) -> StoreError {
    let code = e
        .as_database_error()
        .and_then(|d| d.code())
        .map(|c| c.into_owned());
    match code.as_deref() {
        Some(FOREIGN_KEY_VIOLATION) => StoreError::NotFound,
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn upsert_recipe(&self, recipe: &Recipe, owner: Uuid) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO recipes (id, user_id, title, description, ingredients, instructions,
                                 prep_time, cook_time, servings, temperature, average_rating,
                                 rating_count, tags, nutrients, image_url, source, public)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, true)
            ON CONFLICT (id) DO UPDATE
               SET title = EXCLUDED.title,
                   description = EXCLUDED.description,
                   ingredients = EXCLUDED.ingredients,
                   instructions = EXCLUDED.instructions,
                   prep_time = EXCLUDED.prep_time,
                   cook_time = EXCLUDED.cook_time,
                   servings = EXCLUDED.servings,
                   temperature = EXCLUDED.temperature,
                   average_rating = EXCLUDED.average_rating,
                   rating_count = EXCLUDED.rating_count,
                   tags = EXCLUDED.tags,
                   nutrients = EXCLUDED.nutrients,
                   image_url = EXCLUDED.image_url,
                   source = EXCLUDED.source
             WHERE recipes.user_id = EXCLUDED.user_id
            "#,
        )
        .bind(recipe.id)
        .bind(owner)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(&recipe.ingredients)
        .bind(&recipe.instructions)
        .bind(&recipe.prep_time)
        .bind(&recipe.cook_time)
        .bind(recipe.servings)
        .bind(&recipe.temperature)
        .bind(recipe.average_rating)
        .bind(recipe.rating_count)
        .bind(&recipe.tags)
        .bind(Json(&recipe.nutrients))
        .bind(&recipe.image_url)
        .bind(&recipe.source)
        .execute(&self.db)
        .await
        .context("upsert recipe")?;
        Ok(())
    }

    async fn get_recipe(&self, id: Uuid) -> StoreResult<Option<StoredRecipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r LEFT JOIN profiles p ON p.id = r.user_id \
             WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(StoredRecipe::from))
    }

    async fn list_public_recipes(&self, limit: i64) -> StoreResult<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r LEFT JOIN profiles p ON p.id = r.user_id \
             WHERE r.public ORDER BY r.created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    async fn update_ingredients(&self, id: Uuid, ingredients: &[String]) -> StoreResult<()> {
        let res = sqlx::query("UPDATE recipes SET ingredients = $2 WHERE id = $1")
            .bind(id)
            .bind(ingredients)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn save_recipe(&self, user: Uuid, recipe: Uuid) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO saved_recipes (user_id, recipe_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, recipe_id) DO NOTHING",
        )
        .bind(user)
        .bind(recipe)
        .execute(&self.db)
        .await
        .map_err(map_fk)?;
        Ok(())
    }

    async fn remove_saved(&self, user: Uuid, recipe: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM saved_recipes WHERE user_id = $1 AND recipe_id = $2")
            .bind(user)
            .bind(recipe)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn is_saved(&self, user: Uuid, recipe: Uuid) -> StoreResult<bool> {
        let saved = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM saved_recipes WHERE user_id = $1 AND recipe_id = $2)",
        )
        .bind(user)
        .bind(recipe)
        .fetch_one(&self.db)
        .await?;
        Ok(saved)
    }

    async fn list_saved(&self, user: Uuid) -> StoreResult<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM saved_recipes s \
             JOIN recipes r ON r.id = s.recipe_id \
             LEFT JOIN profiles p ON p.id = r.user_id \
             WHERE s.user_id = $1 ORDER BY s.created_at DESC"
        ))
        .bind(user)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    async fn add_history(&self, user: Uuid, recipe: Uuid) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO history (user_id, recipe_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, recipe_id) DO UPDATE SET created_at = now()",
        )
        .bind(user)
        .bind(recipe)
        .execute(&self.db)
        .await
        .map_err(map_fk)?;
        Ok(())
    }

    async fn list_history(&self, user: Uuid, limit: i64) -> StoreResult<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(&format!(
            "SELECT h.id AS history_id, h.created_at AS viewed_at, {RECIPE_COLUMNS} \
             FROM history h \
             JOIN recipes r ON r.id = h.recipe_id \
             LEFT JOIN profiles p ON p.id = r.user_id \
             WHERE h.user_id = $1 ORDER BY h.created_at DESC LIMIT $2"
        ))
        .bind(user)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }

    async fn create_collection(&self, user: Uuid, name: &str) -> StoreResult<Collection> {
        let row = sqlx::query_as::<_, CollectionRow>(
            "INSERT INTO collections (user_id, name) VALUES ($1, $2) \
             RETURNING id, user_id, name, 0::BIGINT AS recipe_count, created_at",
        )
        .bind(user)
        .bind(name)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn delete_collection(&self, user: Uuid, collection: Uuid) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM collections WHERE id = $1 AND user_id = $2")
            .bind(collection)
            .bind(user)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_collections(&self, user: Uuid) -> StoreResult<Vec<Collection>> {
        let rows = sqlx::query_as::<_, CollectionRow>(
            r#"
            SELECT c.id, c.user_id, c.name, COUNT(cr.recipe_id) AS recipe_count, c.created_at
              FROM collections c
              LEFT JOIN collection_recipes cr ON cr.collection_id = c.id
             WHERE c.user_id = $1
             GROUP BY c.id
             ORDER BY c.created_at DESC
            "#,
        )
        .bind(user)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Collection::from).collect())
    }

    async fn add_to_collection(
        &self,
        user: Uuid,
        collection: Uuid,
        recipe: Uuid,
    ) -> StoreResult<()> {
        self.owns_collection(user, collection).await?;
        sqlx::query(
            "INSERT INTO collection_recipes (collection_id, recipe_id) VALUES ($1, $2) \
             ON CONFLICT (collection_id, recipe_id) DO NOTHING",
        )
        .bind(collection)
        .bind(recipe)
        .execute(&self.db)
        .await
        .map_err(map_fk)?;
        Ok(())
    }

    async fn remove_from_collection(
        &self,
        user: Uuid,
        collection: Uuid,
        recipe: Uuid,
    ) -> StoreResult<()> {
        self.owns_collection(user, collection).await?;
        sqlx::query("DELETE FROM collection_recipes WHERE collection_id = $1 AND recipe_id = $2")
            .bind(collection)
            .bind(recipe)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn collection_recipes(&self, user: Uuid, collection: Uuid) -> StoreResult<Vec<Recipe>> {
        self.owns_collection(user, collection).await?;
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM collection_recipes cr \
             JOIN recipes r ON r.id = cr.recipe_id \
             LEFT JOIN profiles p ON p.id = r.user_id \
             WHERE cr.collection_id = $1 ORDER BY cr.created_at DESC"
        ))
        .bind(collection)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    async fn recipe_collections(&self, user: Uuid, recipe: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT cr.collection_id FROM collection_recipes cr \
             JOIN collections c ON c.id = cr.collection_id \
             WHERE c.user_id = $1 AND cr.recipe_id = $2",
        )
        .bind(user)
        .bind(recipe)
        .fetch_all(&self.db)
        .await?;
        Ok(ids)
    }

    async fn like(&self, user: Uuid, recipe: Uuid) -> StoreResult<bool> {
        let res = sqlx::query(
            "INSERT INTO likes (user_id, recipe_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, recipe_id) DO NOTHING",
        )
        .bind(user)
        .bind(recipe)
        .execute(&self.db)
        .await
        .map_err(map_fk)?;
        Ok(res.rows_affected() == 1)
    }

    async fn unlike(&self, user: Uuid, recipe: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM likes WHERE user_id = $1 AND recipe_id = $2")
            .bind(user)
            .bind(recipe)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn like_summary(&self, recipe: Uuid, viewer: Option<Uuid>) -> StoreResult<LikeSummary> {
        let (count, liked) = sqlx::query_as::<_, (i64, bool)>(
            "SELECT COUNT(*), COALESCE(BOOL_OR(user_id = $2), false) \
             FROM likes WHERE recipe_id = $1",
        )
        .bind(recipe)
        .bind(viewer)
        .fetch_one(&self.db)
        .await?;
        Ok(LikeSummary { count, liked })
    }

    async fn add_comment(&self, recipe: Uuid, user: Uuid, content: &str) -> StoreResult<Comment> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (recipe_id, user_id, content)
                VALUES ($1, $2, $3)
                RETURNING id, recipe_id, user_id, content, created_at
            )
            SELECT i.id, i.recipe_id, i.user_id, i.content, i.created_at,
                   p.username AS author_username, p.avatar_url AS author_avatar_url
              FROM inserted i
              LEFT JOIN profiles p ON p.id = i.user_id
            "#,
        )
        .bind(recipe)
        .bind(user)
        .bind(content)
        .fetch_one(&self.db)
        .await
        .map_err(map_fk)?;
        Ok(row.into())
    }

    async fn list_comments(&self, recipe: Uuid) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT c.id, c.recipe_id, c.user_id, c.content, c.created_at,
                   p.username AS author_username, p.avatar_url AS author_avatar_url
              FROM comments c
              LEFT JOIN profiles p ON p.id = c.user_id
             WHERE c.recipe_id = $1
             ORDER BY c.created_at ASC
            "#,
        )
        .bind(recipe)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn rate(&self, user: Uuid, recipe: Uuid, stars: i16) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO ratings (user_id, recipe_id, rating) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, recipe_id) DO UPDATE \
             SET rating = EXCLUDED.rating, updated_at = now()",
        )
        .bind(user)
        .bind(recipe)
        .bind(stars)
        .execute(&self.db)
        .await
        .map_err(map_fk)?;
        Ok(())
    }

    async fn rating_summary(
        &self,
        recipe: Uuid,
        viewer: Option<Uuid>,
    ) -> StoreResult<RatingSummary> {
        let (average, count, mine) = sqlx::query_as::<_, (Option<f64>, i64, Option<i16>)>(
            "SELECT AVG(rating)::FLOAT8, COUNT(*), MAX(rating) FILTER (WHERE user_id = $2) \
             FROM ratings WHERE recipe_id = $1",
        )
        .bind(recipe)
        .bind(viewer)
        .fetch_one(&self.db)
        .await?;
        Ok(RatingSummary {
            average,
            count,
            mine,
        })
    }

    async fn follow(&self, follower: Uuid, following: Uuid) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO follows (follower_id, following_id) VALUES ($1, $2) \
             ON CONFLICT (follower_id, following_id) DO NOTHING",
        )
        .bind(follower)
        .bind(following)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn unfollow(&self, follower: Uuid, following: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower)
            .bind(following)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn is_following(&self, follower: Uuid, following: Uuid) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)",
        )
        .bind(follower)
        .bind(following)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    async fn followers(&self, user: Uuid) -> StoreResult<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT f.follower_id AS id, p.username, p.avatar_url FROM follows f \
             LEFT JOIN profiles p ON p.id = f.follower_id \
             WHERE f.following_id = $1 ORDER BY f.created_at DESC",
        )
        .bind(user)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }

    async fn following(&self, user: Uuid) -> StoreResult<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT f.following_id AS id, p.username, p.avatar_url FROM follows f \
             LEFT JOIN profiles p ON p.id = f.following_id \
             WHERE f.follower_id = $1 ORDER BY f.created_at DESC",
        )
        .bind(user)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }

    async fn create_notification(&self, n: NewNotification) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO notifications (user_id, actor_id, recipe_id, type) VALUES ($1, $2, $3, $4)",
        )
        .bind(n.user_id)
        .bind(n.actor_id)
        .bind(n.recipe_id)
        .bind(n.kind.as_str())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn list_notifications(&self, user: Uuid, limit: i64) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT n.id, n.user_id, n.actor_id, n.recipe_id, n.type AS kind, n.read, n.created_at,
                   p.username AS actor_username, p.avatar_url AS actor_avatar_url,
                   r.title AS recipe_title
              FROM notifications n
              LEFT JOIN profiles p ON p.id = n.actor_id
              LEFT JOIN recipes r ON r.id = n.recipe_id
             WHERE n.user_id = $1
             ORDER BY n.created_at DESC
             LIMIT $2
            "#,
        )
        .bind(user)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter()
            .map(|r| Notification::try_from(r).map_err(StoreError::from))
            .collect()
    }

    async fn mark_notifications_read(&self, user: Uuid) -> StoreResult<u64> {
        let res = sqlx::query("UPDATE notifications SET read = true WHERE user_id = $1 AND NOT read")
            .bind(user)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }

    async fn get_profile(&self, user: Uuid) -> StoreResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, username, avatar_url FROM profiles WHERE id = $1",
        )
        .bind(user)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Profile::from))
    }

    async fn upsert_profile(&self, profile: &Profile) -> StoreResult<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO profiles (id, username, avatar_url, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (id) DO UPDATE
               SET username = EXCLUDED.username,
                   avatar_url = EXCLUDED.avatar_url,
                   updated_at = now()
            RETURNING id, username, avatar_url
            "#,
        )
        .bind(profile.id)
        .bind(&profile.username)
        .bind(&profile.avatar_url)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            let taken = e
                .as_database_error()
                .and_then(|d| d.code())
                .is_some_and(|c| c == UNIQUE_VIOLATION);
            if taken {
                StoreError::Conflict("Username is already taken.".to_string())
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(row.into())
    }
}
