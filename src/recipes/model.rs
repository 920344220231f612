use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::urls::encode_component;

/// Cuisine used when a request does not name one.
pub const DEFAULT_CUISINE: &str = "Liberian";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrient {
    pub name: String,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A generated or user-edited dish.
///
/// Absent list fields deserialize as empty lists and absent scalars as `None`,
/// so snapshots written by older clients still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub prep_time: String,
    #[serde(default)]
    pub cook_time: String,
    #[serde(default)]
    pub servings: i32,
    #[serde(default)]
    pub temperature: Option<String>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub rating_count: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub nutrients: Vec<Nutrient>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(with = "epoch_millis", default = "OffsetDateTime::now_utc")]
    pub generated_at: OffsetDateTime,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
}

/// The recipe body as returned by the model, before it gets an identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRecipe {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub prep_time: String,
    #[serde(default)]
    pub cook_time: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub servings: i32,
    #[serde(default)]
    pub temperature: Option<String>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_int")]
    pub rating_count: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub nutrients: Vec<Nutrient>,
}

impl GeneratedRecipe {
    /// Assigns a fresh id and generation timestamp.
    pub fn into_recipe(self) -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            ingredients: self.ingredients,
            instructions: self.instructions,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            temperature: self.temperature,
            average_rating: self.average_rating,
            rating_count: self.rating_count,
            tags: self.tags,
            nutrients: self.nutrients,
            image_url: None,
            generated_at: OffsetDateTime::now_utc(),
            source: None,
            author: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Spiciness {
    Mild,
    #[default]
    Medium,
    Hot,
    #[serde(rename = "Liberian Hot")]
    LiberianHot,
}

impl Spiciness {
    pub fn label(self) -> &'static str {
        match self {
            Spiciness::Mild => "Mild",
            Spiciness::Medium => "Medium",
            Spiciness::Hot => "Hot",
            Spiciness::LiberianHot => "Liberian Hot",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub query: String,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    pub spiciness_level: Spiciness,
}

impl GenerationRequest {
    pub fn cuisine(&self) -> &str {
        self.cuisine
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CUISINE)
    }
}

/// Deterministic stand-in image for a title, used whenever no image was generated.
pub fn placeholder_image_url(title: &str) -> String {
    let prompt = format!("delicious {} dish food photography", title.trim());
    format!(
        "https://image.pollinations.ai/prompt/{}?width=1200&height=800&nologo=true",
        encode_component(&prompt)
    )
}

/// Serializes as unix milliseconds; accepts either milliseconds or an RFC 3339 string.
mod epoch_millis {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::{format_description::well_known::Rfc3339, OffsetDateTime};

    pub fn serialize<S: Serializer>(value: &OffsetDateTime, s: S) -> Result<S::Ok, S::Error> {
        let millis = value.unix_timestamp_nanos() / 1_000_000;
        s.serialize_i64(millis as i64)
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Millis(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<OffsetDateTime, D::Error> {
        match Wire::deserialize(d)? {
            Wire::Millis(ms) => {
                OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
                    .map_err(de::Error::custom)
            }
            Wire::Text(s) => OffsetDateTime::parse(&s, &Rfc3339).map_err(de::Error::custom),
        }
    }
}

// Models sometimes emit integral fields as `4.0`.
fn lenient_int<'de, D: serde::Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
    let v = f64::deserialize(d)?;
    Ok(v.round() as i32)
}

fn lenient_opt_int<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    let v = Option::<f64>::deserialize(d)?;
    Ok(v.map(|v| v.round() as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholder_is_deterministic_and_well_formed() {
        let a = placeholder_image_url("Jollof Rice");
        let b = placeholder_image_url("Jollof Rice");
        assert_eq!(a, b);
        assert_eq!(
            a,
            "https://image.pollinations.ai/prompt/delicious%20Jollof%20Rice%20dish%20food%20photography?width=1200&height=800&nologo=true"
        );
        let parsed = url::Url::parse(&a).expect("placeholder must be a valid url");
        assert_eq!(parsed.host_str(), Some("image.pollinations.ai"));

        let odd = placeholder_image_url("Fish & Chips / Soup?");
        assert!(url::Url::parse(&odd).is_ok());
        assert!(odd.contains("Fish%20%26%20Chips%20%2F%20Soup%3F"));
    }

    #[test]
    fn recipe_accepts_sparse_client_snapshots() {
        let id = Uuid::new_v4();
        let r: Recipe = serde_json::from_value(json!({
            "id": id,
            "title": "Palm Butter",
            "generatedAt": 1_700_000_000_000i64
        }))
        .unwrap();
        assert_eq!(r.id, id);
        assert!(r.ingredients.is_empty());
        assert!(r.nutrients.is_empty());
        assert!(r.tags.is_empty());
        assert_eq!(r.author, None);
        assert_eq!(r.generated_at.unix_timestamp(), 1_700_000_000);

        let back = serde_json::to_value(&r).unwrap();
        assert_eq!(back["generatedAt"], json!(1_700_000_000_000i64));
        assert_eq!(back["prepTime"], json!(""));
    }

    #[test]
    fn generated_recipe_tolerates_float_counts() {
        let g: GeneratedRecipe = serde_json::from_value(json!({
            "title": "Cassava Leaf",
            "ingredients": ["cassava leaves"],
            "instructions": ["pound"],
            "servings": 4.0,
            "ratingCount": 150.0
        }))
        .unwrap();
        let r = g.into_recipe();
        assert_eq!(r.servings, 4);
        assert_eq!(r.rating_count, Some(150));
        assert!(r.image_url.is_none());
    }

    #[test]
    fn request_defaults() {
        let req: GenerationRequest = serde_json::from_value(json!({"query": "Fufu"})).unwrap();
        assert_eq!(req.cuisine(), DEFAULT_CUISINE);
        assert_eq!(req.spiciness_level, Spiciness::Medium);
        assert!(!req.is_vegetarian);

        let hot: GenerationRequest = serde_json::from_value(json!({
            "query": "Pepper soup",
            "cuisine": "  ",
            "spicinessLevel": "Liberian Hot"
        }))
        .unwrap();
        assert_eq!(hot.cuisine(), DEFAULT_CUISINE);
        assert_eq!(hot.spiciness_level.label(), "Liberian Hot");
    }
}
