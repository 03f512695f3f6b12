//! Row shapes and the mapping between database rows and the canonical
//! [`Recipe`].

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use recipe_model::{coerce, Difficulty, MealType, Recipe, RecipeIngredient};

/// A recipe as read back from the store: the canonical record plus the
/// store-managed primary key and timestamps.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredRecipe {
    pub id: i64,
    pub recipe: Recipe,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct DbRecipe {
    pub id: i64,
    pub identifier: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub instructions_json: Json<Vec<String>>,
    pub prep_minutes: Option<i32>,
    pub cook_minutes: Option<i32>,
    pub total_minutes: Option<i32>,
    pub servings: Option<f64>,
    pub difficulty: Option<String>,
    pub cuisine_type: Option<String>,
    pub meal_type: Option<String>,
    pub dietary_tags: Vec<String>,
    pub source_url: Option<String>,
    pub source_post_id: Option<String>,
    pub source_author: Option<String>,
    pub source_score: Option<i64>,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct DbIngredientRow {
    pub recipe_id: i64,
    pub item: String,
    pub amount: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub order_index: i32,
}

impl DbRecipe {
    pub(crate) fn into_stored(self, ingredients: Vec<RecipeIngredient>) -> StoredRecipe {
        StoredRecipe {
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            recipe: Recipe {
                identifier: self.identifier,
                title: self.title,
                description: self.description,
                ingredients,
                instructions: self.instructions_json.0,
                prep_minutes: self.prep_minutes.and_then(|v| u32::try_from(v).ok()),
                cook_minutes: self.cook_minutes.and_then(|v| u32::try_from(v).ok()),
                total_minutes: self.total_minutes.and_then(|v| u32::try_from(v).ok()),
                servings: self.servings,
                difficulty: self.difficulty.as_deref().and_then(Difficulty::normalize),
                cuisine_type: self.cuisine_type,
                meal_type: self.meal_type.as_deref().and_then(MealType::normalize),
                dietary_tags: self.dietary_tags,
                source_url: self.source_url,
                source_post_id: self.source_post_id,
                source_author: self.source_author,
                source_score: self.source_score,
                embedding: self.embedding,
            },
        }
    }
}

impl DbIngredientRow {
    pub(crate) fn into_ingredient(self) -> RecipeIngredient {
        RecipeIngredient {
            item: self.item,
            amount: self.amount.map(render_amount).unwrap_or_default(),
            unit: self.unit,
            notes: self.notes,
            order_index: u32::try_from(self.order_index).unwrap_or_default(),
        }
    }
}

/// Render a stored numeric amount back to its display string: whole numbers
/// without a decimal point, everything else as written by `{}`.
pub(crate) fn render_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Numeric value persisted for an amount string; ranges collapse to their
/// low end, non-numeric amounts stay NULL.
pub(crate) fn amount_value(amount: &str) -> Option<f64> {
    coerce::low_end(amount)
}

/// Measurement catalog classification.
pub(crate) fn unit_type(unit: &str) -> &'static str {
    const VOLUME: [&str; 15] = [
        "cup",
        "cups",
        "tablespoon",
        "tablespoons",
        "tbsp",
        "teaspoon",
        "teaspoons",
        "tsp",
        "ml",
        "milliliter",
        "milliliters",
        "l",
        "liter",
        "liters",
        "fl oz",
    ];
    const WEIGHT: [&str; 12] = [
        "g",
        "gram",
        "grams",
        "kg",
        "kilogram",
        "kilograms",
        "lb",
        "lbs",
        "pound",
        "pounds",
        "oz",
        "ounce",
    ];
    let lower = unit.trim().to_lowercase();
    if VOLUME.contains(&lower.as_str()) {
        "volume"
    } else if WEIGHT.contains(&lower.as_str()) || lower == "ounces" {
        "weight"
    } else {
        "count"
    }
}

/// Aggregate counters for the CLI `stats` command.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct StoreStats {
    pub total_recipes: i64,
    pub with_embedding: i64,
    pub avg_total_minutes: Option<f64>,
    pub by_meal_type: Vec<CategoryCount>,
    pub by_difficulty: Vec<CategoryCount>,
    pub by_cuisine: Vec<CategoryCount>,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct CategoryCount {
    pub name: String,
    pub count: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::cup("cup", "volume")]
    #[case::tbsp_upper("Tbsp", "volume")]
    #[case::fl_oz("fl oz", "volume")]
    #[case::grams("grams", "weight")]
    #[case::oz("oz", "weight")]
    #[case::clove("clove", "count")]
    #[case::pinch("pinch", "count")]
    #[case::unknown("handful", "count")]
    fn unit_classification(#[case] unit: &str, #[case] expected: &str) {
        assert_eq!(unit_type(unit), expected);
    }

    #[rstest]
    #[case::whole(2.0, "2")]
    #[case::half(0.5, "0.5")]
    #[case::big(24.0, "24")]
    fn amount_rendering(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(render_amount(value), expected);
    }

    #[rstest]
    #[case::range("2-4", Some(2.0))]
    #[case::fraction("1/2", Some(0.5))]
    #[case::empty("", None)]
    #[case::words("to taste", None)]
    fn amount_values(#[case] amount: &str, #[case] expected: Option<f64>) {
        assert_eq!(amount_value(amount), expected);
    }
}
