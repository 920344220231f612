use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    recipes::{model::Recipe, services::ensure_recipe_stored},
    state::AppState,
    store::StoreResult,
};

#[instrument(skip(state, recipe), fields(recipe_id = %recipe.id))]
pub async fn save_recipe(state: &AppState, user_id: Uuid, recipe: &Recipe) -> StoreResult<Recipe> {
    let stored = ensure_recipe_stored(state, recipe, user_id).await?;
    state.store.save_recipe(user_id, stored.id).await?;
    info!(%user_id, "recipe saved");
    Ok(stored)
}

/// Flips the saved state and returns the new one.
#[instrument(skip(state, recipe), fields(recipe_id = %recipe.id))]
pub async fn toggle_saved(state: &AppState, user_id: Uuid, recipe: &Recipe) -> StoreResult<bool> {
    if state.store.is_saved(user_id, recipe.id).await? {
        state.store.remove_saved(user_id, recipe.id).await?;
        info!(%user_id, "recipe unsaved");
        Ok(false)
    } else {
        save_recipe(state, user_id, recipe).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::services::tests::sample_recipe;

    #[tokio::test]
    async fn toggle_twice_restores_state() {
        let state = AppState::fake();
        let user = Uuid::new_v4();
        let recipe = sample_recipe("Jollof Rice");

        assert!(toggle_saved(&state, user, &recipe).await.unwrap());
        assert!(state.store.is_saved(user, recipe.id).await.unwrap());

        assert!(!toggle_saved(&state, user, &recipe).await.unwrap());
        assert!(!state.store.is_saved(user, recipe.id).await.unwrap());
        assert!(state.store.list_saved(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saving_twice_keeps_one_link() {
        let state = AppState::fake();
        let user = Uuid::new_v4();
        let recipe = sample_recipe("Jollof Rice");

        save_recipe(&state, user, &recipe).await.unwrap();
        save_recipe(&state, user, &recipe).await.unwrap();

        let saved = state.store.list_saved(user).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, recipe.id);
    }

    #[tokio::test]
    async fn anyone_can_save_someone_elses_recipe() {
        let state = AppState::fake();
        let (owner, fan) = (Uuid::new_v4(), Uuid::new_v4());
        let recipe = sample_recipe("Rice Bread");
        save_recipe(&state, owner, &recipe).await.unwrap();
        save_recipe(&state, fan, &recipe).await.unwrap();

        assert!(state.store.is_saved(fan, recipe.id).await.unwrap());
        let row = state.store.get_recipe(recipe.id).await.unwrap().unwrap();
        assert_eq!(row.owner, owner);
    }
}
