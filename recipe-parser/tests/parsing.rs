//! End-to-end parses of realistic source texts.

#![allow(clippy::unwrap_used)]

use recipe_model::{validate_for_load, MealType, ValidationError};
use recipe_parser::RecipeTextParser;

const SICILIAN_PASTA: &str = "\
# Sicilian Pasta alla Norma

My nonna's version, straight from Catania.

Prep time: 15 minutes
Cook time: 30-45 minutes
Serves 4

## Ingredients
- 1 lb rigatoni
- 1 Eggplant cut into cubes
- 1/2 cups beef stock
- 4oz pancetta
- 2-4 cloves garlic
- salt, to taste

## Instructions
1. Salt the eggplant and let it drain.
2. Fry the eggplant until golden.
3. Toss with the pasta and stock.
";

const MATCHA_MOUSSE: &str = "\
Matcha Mousse

(Serves 2)

Ingredients
・200ml heavy cream ・2 tbsp matcha powder ・3 egg whites ・50g sugar

Method
1. Whip the cream to soft peaks.
2. Fold in the sifted matcha.
3. Beat the whites with sugar and fold through.
Chill for two hours before serving, it sets into a light cloud.
";

#[test]
fn sicilian_pasta_repairs_the_eggplant_row() {
    let recipe = RecipeTextParser::new().parse_recipe(SICILIAN_PASTA, None);

    assert_eq!(recipe.title, "Sicilian Pasta alla Norma");
    let eggplant = recipe
        .ingredients
        .iter()
        .find(|i| i.item == "Eggplant")
        .unwrap();
    assert_eq!(eggplant.amount, "1");
    assert_eq!(eggplant.unit, None);
    assert_eq!(eggplant.notes.as_deref(), Some("cut into cubes"));

    let stock = recipe
        .ingredients
        .iter()
        .find(|i| i.item == "beef stock")
        .unwrap();
    assert_eq!(stock.amount, "1/2");
    assert_eq!(stock.unit.as_deref(), Some("cups"));

    let pancetta = recipe
        .ingredients
        .iter()
        .find(|i| i.item == "pancetta")
        .unwrap();
    assert_eq!(pancetta.amount, "4");
    assert_eq!(pancetta.unit.as_deref(), Some("oz"));
}

#[test]
fn sicilian_pasta_metadata_is_coerced() {
    let recipe = RecipeTextParser::new().parse_recipe(SICILIAN_PASTA, None);
    assert_eq!(recipe.prep_minutes, Some(15));
    assert_eq!(recipe.cook_minutes, Some(30));
    assert_eq!(recipe.servings, Some(4.0));
    assert_eq!(recipe.cuisine_type.as_deref(), Some("Sicilian"));
    assert_eq!(recipe.meal_type, Some(MealType::Dinner));
    assert_eq!(recipe.instructions.len(), 3);
    assert!(validate_for_load(&recipe).is_ok());
}

#[test]
fn matcha_mousse_keeps_four_bulleted_items_only() {
    let recipe = RecipeTextParser::new().parse_recipe(MATCHA_MOUSSE, None);

    let items: Vec<&str> = recipe.ingredients.iter().map(|i| i.item.as_str()).collect();
    assert_eq!(
        items,
        vec!["heavy cream", "matcha powder", "egg whites", "sugar"]
    );
    // The serving annotation and the trailing instruction sentence must not
    // appear as ingredients.
    assert!(items.iter().all(|i| !i.to_lowercase().contains("serve")));
    assert_eq!(recipe.servings, Some(2.0));
    assert_eq!(recipe.meal_type, Some(MealType::Dessert));
}

#[test]
fn non_recipe_text_fails_the_load_gate() {
    let text = "I visited a wonderful trattoria last week.\nThe pasta was incredible and the service friendly.\nWould absolutely recommend to anyone passing through.\n";
    let recipe = RecipeTextParser::new().parse_recipe(text, None);
    assert!(matches!(
        validate_for_load(&recipe),
        Err(ValidationError::OnlyPlaceholders | ValidationError::TooFewIngredients { .. })
    ));
}

#[test]
fn source_hint_distinguishes_same_titled_recipes() {
    let parser = RecipeTextParser::new();
    let a = parser.parse_recipe(SICILIAN_PASTA, Some("t3_one"));
    let b = parser.parse_recipe(SICILIAN_PASTA, Some("t3_two"));
    let plain = parser.parse_recipe(SICILIAN_PASTA, None);
    assert_ne!(a.identifier, b.identifier);
    assert_ne!(a.identifier, plain.identifier);
    assert_eq!(plain.identifier, parser.parse_recipe(SICILIAN_PASTA, None).identifier);
}
