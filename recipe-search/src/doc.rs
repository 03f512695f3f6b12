//! The indexed document shape. `_id` is always the recipe identifier.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use recipe_model::Recipe;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipeDoc {
    pub identifier: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub instructions: Vec<String>,
    pub ingredients: Vec<IngredientDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
    pub dietary_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngredientDoc {
    pub name: String,
}

impl From<&Recipe> for RecipeDoc {
    fn from(recipe: &Recipe) -> Self {
        RecipeDoc {
            identifier: recipe.identifier,
            title: recipe.title.clone(),
            description: recipe.description.clone(),
            instructions: recipe.instructions.clone(),
            ingredients: recipe
                .ingredients
                .iter()
                .map(|i| IngredientDoc {
                    name: i.item.clone(),
                })
                .collect(),
            difficulty: recipe.difficulty.map(|d| d.to_string()),
            cuisine_type: recipe.cuisine_type.clone(),
            meal_type: recipe.meal_type.map(|m| m.to_string()),
            dietary_tags: recipe.dietary_tags.clone(),
            prep_minutes: recipe.prep_minutes,
            cook_minutes: recipe.cook_minutes,
            total_minutes: recipe.total_minutes,
            servings: recipe.servings,
            source_score: recipe.source_score,
            embedding: recipe.embedding.clone(),
        }
    }
}
