use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed dimension of recipe embeddings. Vectors of any other length are
/// rejected by [`crate::validate::validate_for_load`].
pub const EMBEDDING_DIMENSION: usize = 384;

/// Placeholder ingredient item emitted by parsers that found nothing usable.
/// Records consisting only of placeholders are rejected at load time.
pub const PLACEHOLDER_ITEM: &str = "Ingredients listed in recipe text";

/// Canonical recipe record
///
/// This is the shape every parser produces, the staged JSON file carries,
/// and the store persists. `identifier` is derived, never assigned; see
/// [`crate::identity::recipe_identifier`].
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Recipe {
    pub identifier: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dietary_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Recipe {
    /// Whether every ingredient row is the low-quality-source placeholder.
    pub fn only_placeholders(&self) -> bool {
        !self.ingredients.is_empty()
            && self.ingredients.iter().all(|i| i.item == PLACEHOLDER_ITEM)
    }

    /// Text fed to the embedding model: title plus ingredient items, in
    /// order, without amounts.
    pub fn embedding_text(&self) -> String {
        let items: Vec<&str> = self.ingredients.iter().map(|i| i.item.as_str()).collect();
        format!("{}. {}", self.title, items.join(", "))
    }
}

/// One ordered ingredient row of a recipe
///
/// `amount` is a string on purpose: ranges like `"2-4"` survive verbatim and
/// only get collapsed to a number (the low end) at the store edge.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub item: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub order_index: u32,
}

impl RecipeIngredient {
    pub fn placeholder() -> Self {
        RecipeIngredient {
            item: PLACEHOLDER_ITEM.to_string(),
            ..Default::default()
        }
    }
}

impl fmt::Display for RecipeIngredient {
    /// Reassemble the row as an ingredient line: `1 cup flour, sifted`.
    /// Re-parsing the output yields the same `(item, amount, unit, notes)`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.amount.is_empty() {
            write!(f, "{} ", self.amount)?;
        }
        if let Some(unit) = &self.unit {
            write!(f, "{unit} ")?;
        }
        write!(f, "{}", self.item)?;
        if let Some(notes) = &self.notes {
            write!(f, ", {notes}")?;
        }
        Ok(())
    }
}

/// Closed difficulty scale, normalized from free-text variants.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Substring normalization: `"super easy"` → `Easy`, `"moderate"` →
    /// `Medium`, `"quite difficult"` → `Hard`. Unknown text → `None`.
    pub fn normalize(text: &str) -> Option<Self> {
        let t = text.to_lowercase();
        if t.contains("easy") || t.contains("simple") {
            Some(Difficulty::Easy)
        } else if t.contains("medium") || t.contains("moderate") {
            Some(Difficulty::Medium)
        } else if t.contains("hard") || t.contains("difficult") {
            Some(Difficulty::Hard)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed meal-type set.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Dessert,
}

impl MealType {
    pub const ALL: [MealType; 5] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
        MealType::Dessert,
    ];

    /// Substring normalization where the *earliest* occurrence wins:
    /// `"Dinner or lunch"` → `Dinner`. No occurrence → `None`.
    pub fn normalize(text: &str) -> Option<Self> {
        let t = text.to_lowercase();
        Self::ALL
            .iter()
            .filter_map(|m| t.find(m.as_str()).map(|pos| (pos, *m)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, m)| m)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
            MealType::Dessert => "dessert",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
