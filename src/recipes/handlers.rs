use axum::{
    extract::{DefaultBodyLimit, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{
    dto::{UpdateIngredientsRequest, VariationRequest},
    generation::{generate_recipe, generate_variation},
    model::{GenerationRequest, Recipe},
    services::{record_history, update_ingredients},
};
use crate::{
    auth::{AuthUser, Session},
    errors::{generation_rejection, store_rejection, Rejection},
    state::AppState,
};

const COMMUNITY_FEED_SIZE: i64 = 50;

pub fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/generate", post(generate))
        .route(
            "/recipes/variations",
            post(variation).layer(DefaultBodyLimit::max(super::RECIPE_BODY_LIMIT)),
        )
}

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/community", get(community))
        .route("/recipes/:id", get(get_recipe))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/recipes/:id/ingredients", put(put_ingredients))
}

/// History is best effort: on failure the generated recipe is still returned.
async fn remember(state: &AppState, session: Session, recipe: Recipe) -> Recipe {
    let Some(user_id) = session.user_id() else {
        return recipe;
    };
    match record_history(state, user_id, &recipe).await {
        Ok(stored) => stored,
        Err(e) => {
            warn!(error = %e, %user_id, recipe_id = %recipe.id, "failed to record history");
            recipe
        }
    }
}

#[instrument(skip(state, req))]
pub async fn generate(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<GenerationRequest>,
) -> Result<Json<Recipe>, Rejection> {
    let recipe = generate_recipe(state.llm.as_ref(), &req)
        .await
        .map_err(generation_rejection)?;
    Ok(Json(remember(&state, session, recipe).await))
}

#[instrument(skip(state, req), fields(original_id = %req.recipe.id))]
pub async fn variation(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<VariationRequest>,
) -> Result<Json<Recipe>, Rejection> {
    let recipe = generate_variation(state.llm.as_ref(), &req.recipe, &req.instruction)
        .await
        .map_err(generation_rejection)?;
    Ok(Json(remember(&state, session, recipe).await))
}

#[instrument(skip(state))]
pub async fn community(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, Rejection> {
    let recipes = state
        .store
        .list_public_recipes(COMMUNITY_FEED_SIZE)
        .await
        .map_err(store_rejection)?;
    Ok(Json(recipes))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Recipe>, Rejection> {
    state
        .store
        .get_recipe(id)
        .await
        .map_err(store_rejection)?
        .map(|s| Json(s.recipe))
        .ok_or((axum::http::StatusCode::NOT_FOUND, "Recipe not found".into()))
}

#[instrument(skip(state, body))]
pub async fn put_ingredients(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateIngredientsRequest>,
) -> Result<Json<Recipe>, Rejection> {
    update_ingredients(&state, user_id, id, &body.ingredients)
        .await
        .map(Json)
}
