use thiserror::Error;

use crate::recipe::{Recipe, EMBEDDING_DIMENSION};

/// A recipe invariant violated at the load gate. These are not retried;
/// callers log the reason and skip the item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("recipe title is empty")]
    EmptyTitle,
    #[error("too few valid ingredients ({count})")]
    TooFewIngredients { count: usize },
    #[error("every ingredient row is a placeholder")]
    OnlyPlaceholders,
    #[error("embedding has {len} dimensions, expected {EMBEDDING_DIMENSION}")]
    BadEmbeddingLength { len: usize },
    #[error("ingredient {index} has an empty item")]
    EmptyIngredientItem { index: usize },
}

/// Gate applied before a recipe enters the store.
///
/// Rejects records with an empty title, fewer than two ingredients after
/// filtering, placeholder-only ingredient lists, empty ingredient items, or
/// an embedding of the wrong dimension.
pub fn validate_for_load(recipe: &Recipe) -> Result<(), ValidationError> {
    if recipe.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if recipe.ingredients.len() < 2 {
        return Err(ValidationError::TooFewIngredients {
            count: recipe.ingredients.len(),
        });
    }
    if recipe.only_placeholders() {
        return Err(ValidationError::OnlyPlaceholders);
    }
    if let Some(index) = recipe
        .ingredients
        .iter()
        .position(|i| i.item.trim().is_empty())
    {
        return Err(ValidationError::EmptyIngredientItem { index });
    }
    if let Some(embedding) = &recipe.embedding {
        if embedding.len() != EMBEDDING_DIMENSION {
            return Err(ValidationError::BadEmbeddingLength {
                len: embedding.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::recipe::RecipeIngredient;

    fn valid_recipe() -> Recipe {
        Recipe {
            title: "Pasta alla Norma".to_string(),
            ingredients: vec![
                RecipeIngredient {
                    item: "pasta".to_string(),
                    amount: "1".to_string(),
                    unit: Some("lb".to_string()),
                    ..Default::default()
                },
                RecipeIngredient {
                    item: "Eggplant".to_string(),
                    amount: "1".to_string(),
                    notes: Some("cut into cubes".to_string()),
                    ..Default::default()
                },
            ],
            instructions: vec!["Cook.".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn accepts_a_valid_recipe() {
        assert_eq!(validate_for_load(&valid_recipe()), Ok(()));
    }

    #[test]
    fn rejects_empty_title() {
        let mut r = valid_recipe();
        r.title = "   ".to_string();
        assert_eq!(validate_for_load(&r), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn rejects_single_ingredient() {
        let mut r = valid_recipe();
        r.ingredients.truncate(1);
        assert_eq!(
            validate_for_load(&r),
            Err(ValidationError::TooFewIngredients { count: 1 })
        );
    }

    #[test]
    fn rejects_placeholder_only() {
        let mut r = valid_recipe();
        r.ingredients = vec![RecipeIngredient::placeholder(), RecipeIngredient::placeholder()];
        assert_eq!(validate_for_load(&r), Err(ValidationError::OnlyPlaceholders));
    }

    #[test]
    fn rejects_wrong_embedding_dimension() {
        let mut r = valid_recipe();
        r.embedding = Some(vec![0.0; 100]);
        assert_eq!(
            validate_for_load(&r),
            Err(ValidationError::BadEmbeddingLength { len: 100 })
        );
    }

    #[test]
    fn accepts_exact_embedding_dimension() {
        let mut r = valid_recipe();
        r.embedding = Some(vec![0.1; EMBEDDING_DIMENSION]);
        assert_eq!(validate_for_load(&r), Ok(()));
    }
}
