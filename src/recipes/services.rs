use axum::http::StatusCode;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{ingredients::normalize_ingredients, model::Recipe};
use crate::{
    errors::{ingredient_rejection, store_rejection, Rejection},
    images::services::{decode_data_url, is_inline_image, upload_recipe_image},
    state::AppState,
    store::{StoreError, StoreResult},
};

/// Makes sure a recipe row exists before anything links to it.
///
/// An inline `data:image` URL is uploaded to object storage and replaced by its
/// public URL; when the upload fails the recipe is stored without an image.
/// A row owned by another user is returned as stored and never overwritten.
#[instrument(skip(state, recipe), fields(recipe_id = %recipe.id))]
pub async fn ensure_recipe_stored(
    state: &AppState,
    recipe: &Recipe,
    owner: Uuid,
) -> StoreResult<Recipe> {
    if let Some(existing) = state.store.get_recipe(recipe.id).await? {
        if existing.owner != owner {
            return Ok(existing.recipe);
        }
    }

    let mut stored = recipe.clone();
    if let Some(url) = stored.image_url.as_deref().filter(|u| is_inline_image(u)) {
        let uploaded = match decode_data_url(url) {
            Ok(item) => upload_recipe_image(state.storage.as_ref(), stored.id, item).await,
            Err(e) => Err(e),
        };
        stored.image_url = match uploaded {
            Ok(public) => Some(public),
            Err(e) => {
                warn!(error = %e, "recipe image upload failed; storing text only");
                None
            }
        };
    }

    state.store.upsert_recipe(&stored, owner).await?;
    Ok(stored)
}

/// Stores the recipe and appends it to the user's history.
pub async fn record_history(state: &AppState, user_id: Uuid, recipe: &Recipe) -> StoreResult<Recipe> {
    let stored = ensure_recipe_stored(state, recipe, user_id).await?;
    state.store.add_history(user_id, stored.id).await?;
    Ok(stored)
}

#[instrument(skip(state, edited))]
pub async fn update_ingredients(
    state: &AppState,
    user_id: Uuid,
    recipe_id: Uuid,
    edited: &[String],
) -> Result<Recipe, Rejection> {
    let ingredients = normalize_ingredients(edited).map_err(ingredient_rejection)?;

    let stored = state
        .store
        .get_recipe(recipe_id)
        .await
        .map_err(store_rejection)?
        .ok_or((StatusCode::NOT_FOUND, "Recipe not found".to_string()))?;
    if stored.owner != user_id {
        return Err(store_rejection(StoreError::Forbidden));
    }

    state
        .store
        .update_ingredients(recipe_id, &ingredients)
        .await
        .map_err(store_rejection)?;
    info!(%user_id, %recipe_id, count = ingredients.len(), "ingredients updated");

    Ok(Recipe {
        ingredients,
        ..stored.recipe
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::storage::StorageClient;

    pub(crate) fn sample_recipe(title: &str) -> Recipe {
        serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "title": title,
            "description": "A hearty stew.",
            "ingredients": ["1 cup rice", "2 tomatoes"],
            "instructions": ["Boil", "Serve"],
            "prepTime": "15 mins",
            "cookTime": "1 hr",
            "servings": 4,
        }))
        .unwrap()
    }

    struct BrokenStorage;

    #[async_trait]
    impl StorageClient for BrokenStorage {
        async fn put_object(&self, _: &str, _: &str, _: Bytes, _: &str) -> anyhow::Result<()> {
            anyhow::bail!("bucket offline")
        }

        fn public_url(&self, bucket: &str, key: &str) -> String {
            format!("https://broken/{bucket}/{key}")
        }
    }

    #[tokio::test]
    async fn inline_image_is_uploaded_and_rewritten() {
        let state = AppState::fake();
        let owner = Uuid::new_v4();
        let mut recipe = sample_recipe("Palm Butter");
        recipe.image_url = Some("data:image/png;base64,QUJD".into());

        let stored = ensure_recipe_stored(&state, &recipe, owner).await.unwrap();

        let expected = format!("https://storage.test/recipe-images/{}.png", recipe.id);
        assert_eq!(stored.image_url.as_deref(), Some(expected.as_str()));
        let row = state.store.get_recipe(recipe.id).await.unwrap().unwrap();
        assert_eq!(row.recipe.image_url.as_deref(), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn failed_upload_stores_text_only() {
        let mut state = AppState::fake();
        state.storage = Arc::new(BrokenStorage);
        let mut recipe = sample_recipe("Cassava Leaf");
        recipe.image_url = Some("data:image/png;base64,QUJD".into());

        let stored = ensure_recipe_stored(&state, &recipe, Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(stored.image_url, None);
        let row = state.store.get_recipe(recipe.id).await.unwrap().unwrap();
        assert_eq!(row.recipe.image_url, None);
        assert_eq!(row.recipe.title, "Cassava Leaf");
    }

    #[tokio::test]
    async fn foreign_rows_are_left_alone() {
        let state = AppState::fake();
        let owner = Uuid::new_v4();
        let recipe = sample_recipe("Pepper Soup");
        ensure_recipe_stored(&state, &recipe, owner).await.unwrap();

        let mut copy = recipe.clone();
        copy.title = "Renamed".into();
        let seen = ensure_recipe_stored(&state, &copy, Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(seen.title, "Pepper Soup");
    }

    #[tokio::test]
    async fn ingredient_edits_are_validated_and_owner_only() {
        let state = AppState::fake();
        let owner = Uuid::new_v4();
        let recipe = sample_recipe("Fufu");
        ensure_recipe_stored(&state, &recipe, owner).await.unwrap();

        let dup = vec!["Rice".to_string(), " rice ".to_string()];
        let err = update_ingredients(&state, owner, recipe.id, &dup)
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.1, "Duplicate ingredient found: \"rice\"");

        let edited = vec!["  cassava ".to_string(), String::new(), "water".to_string()];
        let err = update_ingredients(&state, Uuid::new_v4(), recipe.id, &edited)
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::FORBIDDEN);

        let updated = update_ingredients(&state, owner, recipe.id, &edited)
            .await
            .unwrap();
        assert_eq!(updated.ingredients, vec!["cassava", "water"]);
        let row = state.store.get_recipe(recipe.id).await.unwrap().unwrap();
        assert_eq!(row.recipe.ingredients, vec!["cassava", "water"]);
    }

    #[tokio::test]
    async fn history_requires_nothing_but_the_recipe() {
        let state = AppState::fake();
        let user = Uuid::new_v4();
        record_history(&state, user, &sample_recipe("Kala")).await.unwrap();
        let history = state.store.list_history(user, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].recipe.title, "Kala");
    }

    #[tokio::test]
    async fn repeated_history_keeps_one_entry() {
        let state = AppState::fake();
        let user = Uuid::new_v4();
        let recipe = sample_recipe("Dumboy");
        record_history(&state, user, &recipe).await.unwrap();
        record_history(&state, user, &recipe).await.unwrap();

        let history = state.store.list_history(user, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].recipe.id, recipe.id);
    }
}
