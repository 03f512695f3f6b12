//! Live-database tests for the dedup contract. These need a reachable
//! Postgres with `schema.sql` applied; point `RECIPE_DATABASE_URL` at it and
//! run with `--ignored`.

#![allow(clippy::unwrap_used)]

use recipe_model::{recipe_identifier, Recipe, RecipeIngredient};
use recipe_store::{CreateOutcome, RecipeStore};

fn sample(title: &str) -> Recipe {
    Recipe {
        identifier: recipe_identifier(title, None),
        title: title.to_string(),
        ingredients: vec![
            RecipeIngredient {
                item: "flour".to_string(),
                amount: "2".to_string(),
                unit: Some("cups".to_string()),
                ..Default::default()
            },
            RecipeIngredient {
                item: "butter".to_string(),
                amount: "1/2".to_string(),
                unit: Some("cup".to_string()),
                order_index: 1,
                ..Default::default()
            },
        ],
        instructions: vec!["Mix.".to_string(), "Bake.".to_string()],
        ..Default::default()
    }
}

async fn connect() -> RecipeStore {
    let dsn = std::env::var("RECIPE_DATABASE_URL").unwrap();
    RecipeStore::connect(&dsn).await.unwrap()
}

#[tokio::test]
#[ignore = "needs a live postgres with schema.sql applied"]
async fn load_is_idempotent() {
    let store = connect().await;
    let recipe = sample(&format!("Idempotence Cookies {}", std::process::id()));

    let first = store.create(&recipe).await.unwrap();
    let second = store.create(&recipe).await.unwrap();
    let third = store.create(&recipe).await.unwrap();

    assert!(matches!(first, CreateOutcome::Inserted(_)));
    assert_eq!(second, CreateOutcome::AlreadyExists(first.primary_key()));
    assert_eq!(third, CreateOutcome::AlreadyExists(first.primary_key()));
}

#[tokio::test]
#[ignore = "needs a live postgres with schema.sql applied"]
async fn same_title_different_ingredients_dedups() {
    let store = connect().await;
    let title = format!("Title Dedup Bread {}", std::process::id());
    let first = store.create(&sample(&title)).await.unwrap();

    let mut variant = sample(&title);
    variant.ingredients[0].item = "rye flour".to_string();
    // Identifier drift is simulated by changing the hint.
    variant.identifier = recipe_identifier(&title, Some("other-source"));
    let second = store.create(&variant).await.unwrap();

    assert_eq!(second, CreateOutcome::AlreadyExists(first.primary_key()));
}

#[tokio::test]
#[ignore = "needs a live postgres with schema.sql applied"]
async fn concurrent_creates_insert_once() {
    let store = connect().await;
    let recipe = sample(&format!("Concurrent Pie {}", std::process::id()));

    let (a, b) = tokio::join!(store.create(&recipe), store.create(&recipe));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.primary_key(), b.primary_key());
    // At most one of the two calls can have inserted the row.
    assert!(a.already_existed() || b.already_existed());
    let stored = store.get_by_identifier(&recipe.identifier).await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
#[ignore = "needs a live postgres with schema.sql applied"]
async fn round_trip_preserves_the_record() {
    let store = connect().await;
    let mut recipe = sample(&format!("Round Trip Stew {}", std::process::id()));
    recipe.ingredients[1].notes = Some("softened".to_string());
    recipe.dietary_tags = vec!["vegetarian".to_string()];

    let outcome = store.create(&recipe).await.unwrap();
    let stored = store.get(outcome.primary_key()).await.unwrap().unwrap();

    assert_eq!(stored.recipe.title, recipe.title);
    assert_eq!(stored.recipe.ingredients.len(), 2);
    assert_eq!(stored.recipe.ingredients[1].notes.as_deref(), Some("softened"));
    assert_eq!(stored.recipe.ingredients[1].amount, "0.5");
    assert_eq!(stored.recipe.dietary_tags, vec!["vegetarian"]);
}
