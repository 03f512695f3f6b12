//! # Recipe Text Parser
//!
//! Pattern-based extraction of a structured recipe from free-form text
//! (markdown-ish Reddit prose, scraped posts, CSV dumps) with no network
//! calls.
//!
//! ## Design Decisions
//!
//! ### Parsing never fails
//!
//! Malformed input produces best-effort output, never an error. A text with
//! no usable ingredient lines still yields a recipe — with a single
//! placeholder row that the load-time validator will reject. Deciding what
//! is *unusable* is the validator's job, not the parser's.
//!
//! ### Amounts stay strings
//!
//! `"2-4"` and `"30-45 minutes"` survive extraction verbatim. Collapsing a
//! range to a number is a storage concern and lives in one place
//! (`recipe_model::coerce`), not in the grammar.
//!
//! ### A capitalized token after a quantity is a name, not a unit
//!
//! ```text
//! "1 Eggplant cut into cubes" → item="Eggplant", amount="1", notes="cut into cubes"
//! ```
//!
//! The unit slot is only filled from the known-unit set; everything else
//! belongs to the ingredient. This fixes the classic mis-parse where
//! `Eggplant` became a unit of measure.
//!
//! ### One repair pass for both tracks
//!
//! The model-assisted extractor produces the same [`LooseRecipe`] shape as
//! this parser, and both go through [`RecipeTextParser::repair`] before
//! staging. Field swaps, the bad-ingredient filter and numeric coercion are
//! therefore written once.
//!
//! ## Quick Start
//!
//! ```
//! use recipe_parser::RecipeTextParser;
//!
//! let text = "Pasta alla Norma\n\nIngredients\n- 1 lb pasta\n- 1 Eggplant cut into cubes\n\nInstructions\n1. Cook the pasta.\n2. Fry the eggplant.\n";
//! let recipe = RecipeTextParser::new().parse_recipe(text, None);
//! assert_eq!(recipe.title, "Pasta alla Norma");
//! assert_eq!(recipe.ingredients[1].item, "Eggplant");
//! ```

use std::collections::HashSet;

use tracing::instrument;

pub mod filter;
mod fraction;
pub mod ingredient_line;
pub mod loose;
mod meal_type;
mod metadata;
pub mod repair;
mod sections;

pub use ingredient_line::ParsedIngredientLine;
pub use loose::{LooseIngredient, LooseNumber, LooseRecipe};
pub use meal_type::score_meal_type;

use recipe_model::Recipe;

/// Units recognized after a quantity. Anything else stays part of the
/// ingredient name.
const DEFAULT_UNITS: &[&str] = &[
    // volume
    "cup", "cups", "tablespoon", "tablespoons", "tbsp", "teaspoon", "teaspoons", "tsp", "ml",
    "milliliter", "milliliters", "l", "liter", "liters", "fl oz", "oz", "ounce", "ounces",
    // mass
    "g", "gram", "grams", "kg", "kilogram", "kilograms", "lb", "lbs", "pound", "pounds",
    // count
    "piece", "pieces", "can", "cans", "clove", "cloves", "pinch", "pinches", "dash", "dashes",
    "slice", "slices", "stick", "sticks", "bunch", "head", "packet", "package",
];

/// Customizable recipe text parser.
///
/// The unit set determines what [`parse_ingredient_smart`] will bind as a
/// unit; extend it for unconventional sources:
///
/// ```
/// use recipe_parser::RecipeTextParser;
///
/// let parser = RecipeTextParser::new().with_units(&["handful", "handfuls"]);
/// let line = parser.parse_ingredient_smart("2 handfuls spinach");
/// assert_eq!(line.unit.as_deref(), Some("handfuls"));
/// ```
///
/// [`parse_ingredient_smart`]: RecipeTextParser::parse_ingredient_smart
#[derive(Clone, PartialEq, Debug)]
pub struct RecipeTextParser {
    units: Vec<String>,
}

impl Default for RecipeTextParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeTextParser {
    pub fn new() -> Self {
        RecipeTextParser {
            units: DEFAULT_UNITS.iter().map(|&u| u.to_string()).collect(),
        }
    }

    /// Add custom units (chainable). Add singular and plural forms.
    pub fn with_units(mut self, units: &[&str]) -> Self {
        let known: HashSet<&str> = self.units.iter().map(String::as_str).collect();
        let fresh: Vec<String> = units
            .iter()
            .filter(|u| !known.contains(**u))
            .map(|&u| u.to_string())
            .collect();
        self.units.extend(fresh);
        self
    }

    /// Parse one ingredient line into `(item, amount, unit, notes)`.
    /// Never fails; unparseable lines land whole in `item`.
    pub fn parse_ingredient_smart(&self, line: &str) -> ParsedIngredientLine {
        ingredient_line::parse_ingredient_smart(line, &self.units)
    }

    /// Extract a loose recipe from free text: title, sections, ingredient
    /// candidates, metadata and a meal-type guess. Candidates that fail the
    /// bad-ingredient filter are dropped here *and* again in repair, so
    /// model output merged into the same shape gets the same treatment.
    #[instrument(name = "parse_text", skip_all)]
    pub fn parse_text(&self, text: &str) -> LooseRecipe {
        let sections = sections::split_sections(text);
        let meta = metadata::scan_metadata(text);

        let ingredients = sections
            .ingredient_lines
            .iter()
            .filter(|line| filter::reject_reason(line).is_none())
            .map(|line| {
                let parsed = self.parse_ingredient_smart(line);
                LooseIngredient {
                    item: parsed.item,
                    amount: LooseNumber::from(parsed.amount.as_str()),
                    unit: parsed.unit,
                    notes: parsed.notes,
                }
            })
            .collect();

        LooseRecipe {
            title: sections.title,
            description: sections
                .preamble
                .iter()
                .find(|line| filter::reject_reason(line).is_none())
                .cloned(),
            ingredients,
            instructions: sections.instruction_lines,
            prep_minutes: meta.prep.as_deref().map(LooseNumber::from).unwrap_or_default(),
            cook_minutes: meta.cook.as_deref().map(LooseNumber::from).unwrap_or_default(),
            total_minutes: meta
                .total
                .as_deref()
                .map(LooseNumber::from)
                .unwrap_or_default(),
            servings: meta
                .servings
                .as_deref()
                .map(LooseNumber::from)
                .unwrap_or_default(),
            difficulty: meta.difficulty,
            cuisine_type: meta.cuisine,
            meal_type: score_meal_type(text).map(|m| m.to_string()),
            ..Default::default()
        }
    }

    /// Deterministic repair of loose output into the canonical record; see
    /// the crate docs. Shared by both extraction tracks.
    pub fn repair(&self, loose: LooseRecipe) -> Recipe {
        repair::repair_with_units(loose, &self.units)
    }

    /// Parse and repair in one call. `source_hint` feeds the identifier for
    /// sources that can carry same-titled recipes.
    pub fn parse_recipe(&self, text: &str, source_hint: Option<&str>) -> Recipe {
        let mut loose = self.parse_text(text);
        if let Some(hint) = source_hint {
            loose.source_post_id = Some(hint.to_string());
        }
        self.repair(loose)
    }
}

/// Parse a recipe with default settings.
pub fn from_text(text: &str) -> Recipe {
    RecipeTextParser::new().parse_recipe(text, None)
}
