use serde::Deserialize;

use super::model::Recipe;

#[derive(Debug, Deserialize)]
pub struct VariationRequest {
    pub recipe: Recipe,
    pub instruction: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateIngredientsRequest {
    pub ingredients: Vec<String>,
}
