use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use crate::recipes::model::Recipe;

pub const RECIPES_KEY: &str = "liberian_recipes";
pub const RATINGS_KEY: &str = "liberian_kitchen_ratings";

/// The client's local storage, keyed the way the browser stores it.
#[derive(Debug, Default, Deserialize)]
pub struct LocalSnapshot {
    #[serde(default, rename = "liberian_recipes")]
    pub recipes: Vec<Recipe>,
    /// Recipe id → stars.
    #[serde(default, rename = "liberian_kitchen_ratings")]
    pub ratings: BTreeMap<String, i16>,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct SyncReport {
    pub saved: usize,
    pub rated: usize,
    pub skipped_ratings: Vec<String>,
    /// Local storage keys the client may now remove.
    pub clear_keys: Vec<&'static str>,
}
