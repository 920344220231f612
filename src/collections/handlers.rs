use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CreateCollectionRequest, RecipeCollections};
use crate::{
    auth::AuthUser,
    errors::{bad_request, store_rejection, Rejection},
    recipes::model::Recipe,
    state::AppState,
    store::{models::Collection, StoreError},
};

const MAX_NAME_LEN: usize = 80;

pub fn collection_routes() -> Router<AppState> {
    Router::new()
        .route("/collections", get(list_collections).post(create_collection))
        .route("/collections/:id", delete(delete_collection))
}

pub fn membership_routes() -> Router<AppState> {
    Router::new()
        .route("/collections/:id/recipes", get(collection_recipes))
        .route(
            "/collections/:id/recipes/:recipe_id",
            put(add_recipe).delete(remove_recipe),
        )
        .route("/recipes/:id/collections", get(recipe_collections))
}

/// Collections belong to one user; anybody else sees them as missing.
fn not_found(e: StoreError) -> Rejection {
    match e {
        StoreError::NotFound => (StatusCode::NOT_FOUND, "Collection not found".into()),
        other => store_rejection(other),
    }
}

#[instrument(skip(state))]
pub async fn list_collections(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Collection>>, Rejection> {
    let list = state
        .store
        .list_collections(user_id)
        .await
        .map_err(store_rejection)?;
    Ok(Json(list))
}

#[instrument(skip(state, body))]
pub async fn create_collection(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateCollectionRequest>,
) -> Result<(StatusCode, Json<Collection>), Rejection> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(bad_request("Collection name cannot be empty."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(bad_request("Collection name is too long."));
    }

    let created = state
        .store
        .create_collection(user_id, name)
        .await
        .map_err(store_rejection)?;
    info!(%user_id, collection_id = %created.id, "collection created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state))]
pub async fn delete_collection(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Rejection> {
    state
        .store
        .delete_collection(user_id, id)
        .await
        .map_err(not_found)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn collection_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Recipe>>, Rejection> {
    let recipes = state
        .store
        .collection_recipes(user_id, id)
        .await
        .map_err(not_found)?;
    Ok(Json(recipes))
}

#[instrument(skip(state))]
pub async fn add_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, recipe_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, Rejection> {
    state
        .store
        .add_to_collection(user_id, id, recipe_id)
        .await
        .map_err(store_rejection)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn remove_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, recipe_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, Rejection> {
    state
        .store
        .remove_from_collection(user_id, id, recipe_id)
        .await
        .map_err(not_found)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn recipe_collections(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeCollections>, Rejection> {
    let collection_ids = state
        .store
        .recipe_collections(user_id, id)
        .await
        .map_err(store_rejection)?;
    Ok(Json(RecipeCollections { collection_ids }))
}
