use std::collections::HashSet;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngredientError {
    #[error("Recipe must have at least one ingredient.")]
    Empty,
    #[error("Duplicate ingredient found: \"{0}\"")]
    Duplicate(String),
}

/// Normalizes an edited ingredient list: entries are trimmed and blanks dropped.
///
/// The result is non-empty and unique under case-insensitive comparison. On a
/// duplicate, the reported value is the first entry (in submitted order) whose
/// lowercase form was already seen.
pub fn normalize_ingredients<I, S>(edited: I) -> Result<Vec<String>, IngredientError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let cleaned: Vec<String> = edited
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if cleaned.is_empty() {
        return Err(IngredientError::Empty);
    }

    let mut seen = HashSet::with_capacity(cleaned.len());
    for item in &cleaned {
        if !seen.insert(item.to_lowercase()) {
            return Err(IngredientError::Duplicate(item.clone()));
        }
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_drops_blank_entries() {
        let out = normalize_ingredients(["  2 cups rice ", "", "   ", "1 onion"]).unwrap();
        assert_eq!(out, vec!["2 cups rice", "1 onion"]);
    }

    #[test]
    fn rejects_lists_that_end_up_empty() {
        assert_eq!(normalize_ingredients(["", "  "]), Err(IngredientError::Empty));
        assert_eq!(
            normalize_ingredients(Vec::<String>::new()),
            Err(IngredientError::Empty)
        );
    }

    #[test]
    fn duplicates_are_case_insensitive_and_report_first_offender() {
        let err = normalize_ingredients(["Salt", "Pepper", "salt ", "PEPPER"]).unwrap_err();
        assert_eq!(err, IngredientError::Duplicate("salt".into()));
        assert_eq!(err.to_string(), "Duplicate ingredient found: \"salt\"");
    }

    #[test]
    fn accepts_unique_lists_in_order() {
        let out = normalize_ingredients(["Palm oil", "Palm nut", "Okra"]).unwrap();
        assert_eq!(out, vec!["Palm oil", "Palm nut", "Okra"]);
    }
}
