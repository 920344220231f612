use thiserror::Error;
use tracing::{error, info, instrument, warn};

use super::{
    model::{placeholder_image_url, GeneratedRecipe, GenerationRequest, Recipe, DEFAULT_CUISINE},
    prompt::{generation_prompt, image_prompt, recipe_schema, variation_prompt},
};
use crate::llm::{LlmError, LlmProvider};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    InvalidRequest(&'static str),
    #[error("Too many requests right now. Please wait a moment and try again.")]
    RateLimited,
    #[error("The recipe model is currently unavailable.")]
    ModelUnavailable,
    #[error("Failed to generate recipe. Please try again.")]
    Failed { detail: String },
}

impl From<LlmError> for GenerationError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::RateLimited { .. } => GenerationError::RateLimited,
            LlmError::ModelUnavailable(_) => GenerationError::ModelUnavailable,
            other => GenerationError::Failed {
                detail: other.to_string(),
            },
        }
    }
}

/// Removes a surrounding Markdown code fence (```` ```json ... ``` ````) if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json"), with or without a newline after it.
    let body = rest
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
        .trim_start();
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

pub fn parse_generated(text: &str) -> Result<GeneratedRecipe, GenerationError> {
    let generated: GeneratedRecipe =
        serde_json::from_str(strip_code_fences(text)).map_err(|e| GenerationError::Failed {
            detail: format!("invalid recipe json: {e}"),
        })?;

    if generated.title.trim().is_empty()
        || generated.ingredients.is_empty()
        || generated.instructions.is_empty()
    {
        return Err(GenerationError::Failed {
            detail: "recipe is missing title, ingredients or instructions".to_string(),
        });
    }
    Ok(generated)
}

/// Requests an illustrative image. Never fails: any error yields `None`.
#[instrument(skip(llm))]
pub async fn generate_image(llm: &dyn LlmProvider, title: &str) -> Option<String> {
    match llm.generate_image(&image_prompt(title)).await {
        Ok(Some(image)) => Some(image.to_data_url()),
        Ok(None) => {
            info!("image model returned no image data");
            None
        }
        Err(LlmError::RateLimited { .. }) => {
            warn!("image generation quota exceeded; using placeholder");
            None
        }
        Err(e) => {
            warn!(error = %e, "image generation failed; using placeholder");
            None
        }
    }
}

/// Text first, then the image for the generated title, then the placeholder fallback.
#[instrument(skip(llm, req), fields(query = %req.query, cuisine = %req.cuisine()))]
pub async fn generate_recipe(
    llm: &dyn LlmProvider,
    req: &GenerationRequest,
) -> Result<Recipe, GenerationError> {
    if req.query.trim().is_empty() {
        return Err(GenerationError::InvalidRequest("Please describe a dish."));
    }

    let text = llm
        .generate_json(&generation_prompt(req), &recipe_schema())
        .await
        .map_err(|e| {
            error!(error = %e, provider = llm.provider_name(), "recipe text generation failed");
            GenerationError::from(e)
        })?;
    let generated = parse_generated(&text).inspect_err(|e| {
        error!(error = ?e, "recipe text could not be parsed");
    })?;

    let image = generate_image(llm, &generated.title).await;

    let mut recipe = generated.into_recipe();
    recipe.image_url = Some(image.unwrap_or_else(|| placeholder_image_url(&recipe.title)));
    let cuisine = req.cuisine();
    if cuisine != DEFAULT_CUISINE {
        recipe.source = Some(format!("AI Generated ({cuisine} Cuisine)"));
    }

    info!(recipe_id = %recipe.id, title = %recipe.title, "recipe generated");
    Ok(recipe)
}

/// Re-prompts with the original recipe embedded. The original image is reused.
#[instrument(skip(llm, original), fields(original_id = %original.id))]
pub async fn generate_variation(
    llm: &dyn LlmProvider,
    original: &Recipe,
    instruction: &str,
) -> Result<Recipe, GenerationError> {
    if instruction.trim().is_empty() {
        return Err(GenerationError::InvalidRequest(
            "Please describe how to change the recipe.",
        ));
    }

    let text = llm
        .generate_json(&variation_prompt(original, instruction), &recipe_schema())
        .await
        .map_err(|e| {
            error!(error = %e, "recipe variation failed");
            GenerationError::from(e)
        })?;
    let generated = parse_generated(&text)?;

    let mut recipe = generated.into_recipe();
    recipe.image_url = original
        .image_url
        .clone()
        .or_else(|| Some(placeholder_image_url(&recipe.title)));
    recipe.source = Some(format!("Variation of {}", original.title));

    info!(recipe_id = %recipe.id, "variation generated");
    Ok(recipe)
}
