//! Loose output shape shared by both parsers.
//!
//! Model-assisted extraction returns numbers where the prompt asked for
//! numbers and strings where the source was messy (`"30-45 minutes"`), and
//! the local parser only ever sees strings. Every numeric field is therefore
//! a tagged [`LooseNumber`] and the whole shape passes through
//! [`crate::repair`] before anything downstream sees it. The loose types do
//! not leave this crate's API except as the repair input.

use serde::{Deserialize, Serialize};

/// A numeric field as a parser saw it: a number, a free-text rendering of
/// one, or nothing at all.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    #[default]
    Absent,
    Number(f64),
    Text(String),
}

impl LooseNumber {
    /// Collapse to minutes: numbers round-trip, text keeps its first
    /// integer (`"30-45 minutes"` → `30`).
    pub fn as_minutes(&self) -> Option<u32> {
        match self {
            LooseNumber::Absent => None,
            LooseNumber::Number(n) if *n >= 0.0 => Some(*n as u32),
            LooseNumber::Number(_) => None,
            LooseNumber::Text(t) => recipe_model::coerce::first_integer(t),
        }
    }

    /// Collapse to a serving count: ranges take their low end
    /// (`"2-4"` → `2.0`).
    pub fn as_servings(&self) -> Option<f64> {
        match self {
            LooseNumber::Absent => None,
            LooseNumber::Number(n) if *n >= 0.0 => Some(*n),
            LooseNumber::Number(_) => None,
            LooseNumber::Text(t) => recipe_model::coerce::low_end(t).filter(|v| *v >= 0.0),
        }
    }

    /// The amount string as staged: numbers render without a trailing
    /// `.0`, text passes through.
    pub fn as_amount_string(&self) -> String {
        match self {
            LooseNumber::Absent => String::new(),
            LooseNumber::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            LooseNumber::Number(n) => format!("{n}"),
            LooseNumber::Text(t) => t.trim().to_string(),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, LooseNumber::Absent)
    }
}

impl From<&str> for LooseNumber {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            LooseNumber::Absent
        } else {
            LooseNumber::Text(value.trim().to_string())
        }
    }
}

/// One ingredient row as a parser produced it.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct LooseIngredient {
    #[serde(default, alias = "name", alias = "ingredient")]
    pub item: String,
    #[serde(default)]
    pub amount: LooseNumber,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A recipe as extracted, before the repair pass.
///
/// Field aliases cover the spellings models actually emit; unknown enum
/// values survive as text and are normalized downstream.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct LooseRecipe {
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<LooseIngredient>,
    #[serde(default, alias = "steps", alias = "directions")]
    pub instructions: Vec<String>,
    #[serde(default, alias = "prep_time")]
    pub prep_minutes: LooseNumber,
    #[serde(default, alias = "cook_time")]
    pub cook_minutes: LooseNumber,
    #[serde(default, alias = "total_time")]
    pub total_minutes: LooseNumber,
    #[serde(default, alias = "serves")]
    pub servings: LooseNumber,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default, alias = "cuisine")]
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub meal_type: Option<String>,
    #[serde(default, alias = "tags")]
    pub dietary_tags: Vec<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source_post_id: Option<String>,
    #[serde(default, alias = "author")]
    pub source_author: Option<String>,
    #[serde(default, alias = "score")]
    pub source_score: Option<i64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn untagged_number_accepts_number_string_and_null() {
        let n: LooseNumber = serde_json::from_str("15").unwrap();
        assert_eq!(n, LooseNumber::Number(15.0));
        let t: LooseNumber = serde_json::from_str("\"30-45 minutes\"").unwrap();
        assert_eq!(t, LooseNumber::Text("30-45 minutes".to_string()));
        let a: LooseNumber = serde_json::from_str("null").unwrap();
        assert_eq!(a, LooseNumber::Absent);
    }

    #[rstest]
    #[case::number(LooseNumber::Number(27.0), Some(27))]
    #[case::range_text(LooseNumber::Text("30-45 minutes".into()), Some(30))]
    #[case::absent(LooseNumber::Absent, None)]
    #[case::negative(LooseNumber::Number(-3.0), None)]
    fn minutes_coercion(#[case] input: LooseNumber, #[case] expected: Option<u32>) {
        assert_eq!(input.as_minutes(), expected);
    }

    #[rstest]
    #[case::range(LooseNumber::Text("2-4".into()), Some(2.0))]
    #[case::fraction(LooseNumber::Text("1/2".into()), Some(0.5))]
    #[case::number(LooseNumber::Number(24.0), Some(24.0))]
    #[case::junk(LooseNumber::Text("a few".into()), None)]
    fn servings_coercion(#[case] input: LooseNumber, #[case] expected: Option<f64>) {
        assert_eq!(input.as_servings(), expected);
    }

    #[test]
    fn loose_recipe_accepts_aliased_fields() {
        let json = r#"{
            "name": "Pancakes",
            "ingredients": [{"name": "flour", "amount": 2, "unit": "cups"}],
            "steps": ["Mix.", "Fry."],
            "prep_time": "10 minutes",
            "serves": "2-4"
        }"#;
        let loose: LooseRecipe = serde_json::from_str(json).unwrap();
        assert_eq!(loose.title, "Pancakes");
        assert_eq!(loose.ingredients[0].item, "flour");
        assert_eq!(loose.ingredients[0].amount, LooseNumber::Number(2.0));
        assert_eq!(loose.instructions.len(), 2);
        assert_eq!(loose.prep_minutes.as_minutes(), Some(10));
        assert_eq!(loose.servings.as_servings(), Some(2.0));
    }
}
