use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{LocalSnapshot, SyncReport, RATINGS_KEY, RECIPES_KEY};
use crate::{library::services::save_recipe, social::services::rate, state::AppState, store::StoreResult};

/// Saves every local recipe, then every rating, one at a time.
///
/// Any failure aborts the whole migration so the client keeps its local copy.
/// Ratings for recipes the store has never seen are skipped, not failed.
#[instrument(skip(state, snapshot), fields(recipes = snapshot.recipes.len(), ratings = snapshot.ratings.len()))]
pub async fn migrate_local_state(
    state: &AppState,
    user_id: Uuid,
    snapshot: LocalSnapshot,
) -> StoreResult<SyncReport> {
    let mut report = SyncReport::default();

    for recipe in &snapshot.recipes {
        save_recipe(state, user_id, recipe).await?;
        report.saved += 1;
    }

    for (raw_id, stars) in &snapshot.ratings {
        let known = match Uuid::parse_str(raw_id) {
            Ok(id) => state.store.get_recipe(id).await?.map(|_| id),
            Err(_) => None,
        };
        let Some(recipe_id) = known else {
            warn!(recipe_id = %raw_id, "rating for unknown recipe skipped");
            report.skipped_ratings.push(raw_id.clone());
            continue;
        };
        rate(state, user_id, recipe_id, *stars).await?;
        report.rated += 1;
    }

    if !snapshot.recipes.is_empty() {
        report.clear_keys.push(RECIPES_KEY);
    }
    if !snapshot.ratings.is_empty() {
        report.clear_keys.push(RATINGS_KEY);
    }
    info!(%user_id, saved = report.saved, rated = report.rated, "local state migrated");
    Ok(report)
}
