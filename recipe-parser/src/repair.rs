//! The repair pass: loose parser output → canonical [`Recipe`].
//!
//! Deterministic and shared by both extraction tracks. Field swaps, the
//! bad-ingredient filter, enum normalization and numeric coercion all
//! happen here, so a model that stuffed `"1/2 cups beef stock"` into the
//! item field and a regex that matched the same line end up with the same
//! stored row.

use itertools::Itertools;
use tracing::debug;

use recipe_model::{coerce, recipe_identifier, Difficulty, MealType, Recipe, RecipeIngredient};

use crate::filter::reject_reason;
use crate::fraction::quantity_span;
use crate::ingredient_line::parse_ingredient_smart;
use crate::loose::{LooseIngredient, LooseRecipe};

pub(crate) fn repair_with_units(loose: LooseRecipe, units: &[String]) -> Recipe {
    let title = recipe_model::identity::normalize_title(&coerce::strip_markdown(&loose.title));
    let source_hint = loose
        .source_post_id
        .as_deref()
        .or(loose.source_url.as_deref());
    let identifier = recipe_identifier(&title, source_hint);

    let mut ingredients: Vec<RecipeIngredient> = loose
        .ingredients
        .into_iter()
        .filter_map(|row| repair_ingredient(row, units))
        .collect();
    for (index, row) in ingredients.iter_mut().enumerate() {
        row.order_index = index as u32;
    }
    if ingredients.is_empty() {
        debug!(%identifier, "no usable ingredients, emitting placeholder");
        ingredients.push(RecipeIngredient::placeholder());
    }

    let mut instructions: Vec<String> = loose
        .instructions
        .iter()
        .map(|step| coerce::strip_markdown(step))
        .filter(|step| !step.is_empty())
        .collect();
    if instructions.is_empty() {
        instructions.push("Instructions not provided.".to_string());
    }

    Recipe {
        identifier,
        title,
        description: loose
            .description
            .map(|d| coerce::strip_markdown(&d))
            .filter(|d| !d.is_empty()),
        ingredients,
        instructions,
        prep_minutes: loose.prep_minutes.as_minutes(),
        cook_minutes: loose.cook_minutes.as_minutes(),
        total_minutes: loose.total_minutes.as_minutes(),
        servings: loose.servings.as_servings(),
        difficulty: loose.difficulty.as_deref().and_then(Difficulty::normalize),
        cuisine_type: loose
            .cuisine_type
            .map(|c| coerce::strip_markdown(&c))
            .filter(|c| !c.is_empty()),
        meal_type: loose.meal_type.as_deref().and_then(MealType::normalize),
        dietary_tags: loose
            .dietary_tags
            .iter()
            .map(|t| coerce::strip_markdown(t).to_lowercase())
            .filter(|t| !t.is_empty())
            .sorted()
            .dedup()
            .collect(),
        source_url: loose.source_url,
        source_post_id: loose.source_post_id,
        source_author: loose.source_author,
        source_score: loose.source_score,
        embedding: None,
    }
}

/// Repair one ingredient row, or drop it.
fn repair_ingredient(row: LooseIngredient, units: &[String]) -> Option<RecipeIngredient> {
    let item = coerce::strip_markdown(&row.item);
    if item.is_empty() {
        return None;
    }

    // Quantity leaked into the item field: re-parse the whole line and keep
    // the split ("1/2 cups beef stock" → item "beef stock", amount "1/2").
    let (item, amount, unit, parsed_notes) = if quantity_span(&item).is_ok() {
        let parsed = parse_ingredient_smart(&item, units);
        (parsed.item, parsed.amount, parsed.unit, parsed.notes)
    } else {
        (item, row.amount.as_amount_string(), row.unit.clone(), None)
    };

    if item.is_empty() {
        return None;
    }
    if let Some(reason) = reject_reason(&item) {
        debug!(item = %item, %reason, "dropping ingredient row");
        return None;
    }

    let notes = [
        parsed_notes,
        row.notes.map(|n| coerce::strip_markdown(&n)),
    ]
    .into_iter()
    .flatten()
    .filter(|n| !n.is_empty())
    .join(", ");

    Some(RecipeIngredient {
        item,
        amount,
        unit: unit.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
        notes: (!notes.is_empty()).then_some(notes),
        order_index: 0,
    })
}
