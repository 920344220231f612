use serde::Serialize;

use crate::{recipes::model::Recipe, urls::encode_component};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareLinks {
    pub email: String,
    pub whatsapp: String,
    pub facebook: String,
}

fn source_text(recipe: &Recipe) -> &str {
    match recipe.source.as_deref() {
        None | Some("AI Generated") => "AI Generated (Liberian Cuisine)",
        Some(other) => other,
    }
}

fn email_body(recipe: &Recipe, url: &str) -> String {
    let ingredients = recipe
        .ingredients
        .iter()
        .map(|i| format!("• {i}"))
        .collect::<Vec<_>>()
        .join("\n");
    let instructions = recipe
        .instructions
        .iter()
        .enumerate()
        .map(|(n, s)| format!("{}. {s}", n + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Check out this delicious recipe for {title}!\n\n\
         {description}\n\n\
         Prep Time: {prep} | Cook Time: {cook} | Servings: {servings}\n\n\
         Ingredients:\n{ingredients}\n\n\
         Instructions:\n{instructions}\n\n\
         Source: {source}\n\n\
         View here: {url}",
        title = recipe.title,
        description = recipe.description,
        prep = recipe.prep_time,
        cook = recipe.cook_time,
        servings = recipe.servings,
        source = source_text(recipe),
    )
}

/// Links that hand the recipe at `url` off to mail, WhatsApp and Facebook.
pub fn share_links(recipe: &Recipe, url: &str) -> ShareLinks {
    let subject = format!("Recipe: {}", recipe.title);
    let text = format!("Check out this delicious recipe for {}!\n{url}", recipe.title);
    ShareLinks {
        email: format!(
            "mailto:?subject={}&body={}",
            encode_component(&subject),
            encode_component(&email_body(recipe, url))
        ),
        whatsapp: format!("https://wa.me/?text={}", encode_component(&text)),
        facebook: format!(
            "https://www.facebook.com/sharer/sharer.php?u={}",
            encode_component(url)
        ),
    }
}
