//! Prompt and response-schema construction for recipe generation.

use serde_json::{json, Value};

use super::model::{GenerationRequest, Recipe};

/// JSON schema (Gemini's OpenAPI subset) every generated recipe must follow.
pub fn recipe_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING", "description": "The authentic name of the dish" },
            "description": {
                "type": "STRING",
                "description": "A short, appetizing description of the dish and its cultural significance"
            },
            "ingredients": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of ingredients with quantities"
            },
            "instructions": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Step-by-step cooking instructions"
            },
            "prepTime": { "type": "STRING", "description": "Preparation time (e.g., '15 mins')" },
            "cookTime": { "type": "STRING", "description": "Cooking time (e.g., '45 mins')" },
            "servings": { "type": "INTEGER", "description": "Number of servings" },
            "temperature": {
                "type": "STRING",
                "description": "Recommended cooking temperature or heat level (e.g., '375°F', 'Medium-High', 'Simmer')"
            },
            "averageRating": {
                "type": "NUMBER",
                "description": "A simulated average rating for this popular dish (between 4.0 and 5.0)"
            },
            "ratingCount": { "type": "INTEGER", "description": "A simulated number of reviews (e.g. 42, 150)" },
            "tags": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Tags like 'Soup', 'Rice', 'Spicy', 'Breakfast'"
            },
            "nutrients": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING", "description": "Nutrient name (Protein, Carbs, Fat)" },
                        "value": { "type": "NUMBER", "description": "Amount" },
                        "unit": { "type": "STRING", "description": "Unit (g, mg, kcal)" }
                    },
                    "required": ["name", "value", "unit"]
                },
                "description": "Estimated nutritional content per serving (Protein, Carbs, Fat, Calories)"
            }
        },
        "required": [
            "title", "description", "ingredients", "instructions", "prepTime", "cookTime",
            "servings", "temperature", "averageRating", "ratingCount", "tags", "nutrients"
        ]
    })
}

pub fn generation_prompt(req: &GenerationRequest) -> String {
    let cuisine = req.cuisine();
    let dietary = if req.is_vegetarian {
        "Vegetarian/Vegan version"
    } else {
        "Standard"
    };
    format!(
        "Create a detailed and authentic {cuisine} recipe for: \"{query}\".\n\
         \n\
         Context:\n\
         - Focus on traditional flavors and ingredients authentic to {cuisine} cuisine.\n\
         - Spiciness preference: {spice}.\n\
         - Dietary restriction: {dietary}.\n\
         \n\
         Provide a rich description of the cultural context if applicable.\n\
         Estimate the nutritional values reasonably.\n\
         Include a realistic average rating and review count typical for a popular dish of this type.\n\
         Respond with a single JSON object only.",
        query = req.query.trim(),
        spice = req.spiciness_level.label(),
    )
}

pub fn variation_prompt(original: &Recipe, instruction: &str) -> String {
    format!(
        "Take the following recipe and modify it according to this instruction: \"{instruction}\".\n\
         \n\
         Original Recipe:\n\
         Title: {title}\n\
         Description: {description}\n\
         Ingredients: {ingredients}\n\
         Instructions: {instructions}\n\
         \n\
         Keep the same JSON structure and only change what the instruction requires \
         (swapping ingredients, adjusting steps, or changing the flavor profile).\n\
         If the title should change to reflect the variation (e.g., \"Spicy Jollof Rice\"), change it.\n\
         Recalculate the nutrition values if necessary.\n\
         Respond with a single JSON object only.",
        instruction = instruction.trim(),
        title = original.title,
        description = original.description,
        ingredients = original.ingredients.join(", "),
        instructions = original.instructions.join(". "),
    )
}

pub fn image_prompt(title: &str) -> String {
    format!(
        "A professional, high-resolution food photography shot of the dish \"{title}\". \
         The food should look hot, appetizing, and freshly made. \
         Styled on a rustic wooden table with authentic regional textiles in the background. \
         Warm lighting, top-down or 45-degree angle."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::model::Spiciness;

    fn request(query: &str, cuisine: &str, veg: bool, spice: Spiciness) -> GenerationRequest {
        GenerationRequest {
            query: query.into(),
            cuisine: Some(cuisine.into()),
            is_vegetarian: veg,
            spiciness_level: spice,
        }
    }

    #[test]
    fn jollof_prompt_names_cuisine_dish_and_heat() {
        let p = generation_prompt(&request("Jollof Rice", "Nigerian", false, Spiciness::Hot));
        assert!(p.contains("Nigerian"));
        assert!(p.contains("Jollof Rice"));
        assert!(p.contains("Hot"));
        assert!(p.contains("Dietary restriction: Standard"));
    }

    #[test]
    fn vegetarian_flag_changes_dietary_line() {
        let p = generation_prompt(&request("Palava Sauce", "Liberian", true, Spiciness::Mild));
        assert!(p.contains("Vegetarian/Vegan version"));
        assert!(p.contains("Spiciness preference: Mild"));
    }

    #[test]
    fn variation_prompt_embeds_original_fields() {
        let original: Recipe = serde_json::from_value(serde_json::json!({
            "id": uuid::Uuid::new_v4(),
            "title": "Jollof Rice",
            "description": "Party rice",
            "ingredients": ["rice", "tomato"],
            "instructions": ["Fry base", "Add rice"]
        }))
        .unwrap();
        let p = variation_prompt(&original, "make it spicier");
        assert!(p.contains("\"make it spicier\""));
        assert!(p.contains("Title: Jollof Rice"));
        assert!(p.contains("Ingredients: rice, tomato"));
        assert!(p.contains("Instructions: Fry base. Add rice"));
    }

    #[test]
    fn schema_requires_every_recipe_field() {
        let schema = recipe_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        for field in ["title", "ingredients", "instructions", "nutrients", "prepTime"] {
            assert!(required.contains(&field), "missing {field}");
        }
        for field in &required {
            assert!(schema["properties"].get(*field).is_some(), "undeclared {field}");
        }
    }
}
