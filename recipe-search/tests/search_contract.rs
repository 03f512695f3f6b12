//! Live search-index contract tests. Point `RECIPE_SEARCH_URL` at an
//! Elasticsearch-compatible service and run with `--ignored`.

#![allow(clippy::unwrap_used)]

use recipe_model::{recipe_identifier, Recipe, RecipeIngredient};
use recipe_search::{
    Embedder, RecipeDoc, SearchIndex, SearchMode, SearchRequest, SentenceEncoder,
};

struct TestEncoder;

impl SentenceEncoder for TestEncoder {
    fn encode(&self, text: &str) -> Result<Vec<f32>, recipe_search::SearchError> {
        let mut v = vec![0.0f32; 384];
        for (i, b) in text.bytes().enumerate() {
            v[i % 384] += f32::from(b) / 255.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        Ok(v.into_iter().map(|x| x / norm).collect())
    }
}

fn recipe(title: &str, items: &[&str]) -> Recipe {
    Recipe {
        identifier: recipe_identifier(title, None),
        title: title.to_string(),
        ingredients: items
            .iter()
            .enumerate()
            .map(|(i, item)| RecipeIngredient {
                item: item.to_string(),
                amount: "1".to_string(),
                order_index: i as u32,
                ..Default::default()
            })
            .collect(),
        instructions: vec!["Cook.".to_string()],
        ..Default::default()
    }
}

fn index() -> SearchIndex {
    let url = std::env::var("RECIPE_SEARCH_URL").unwrap();
    SearchIndex::new(&url, &format!("recipes-contract-{}", std::process::id()))
}

#[tokio::test]
#[ignore = "needs a live search index"]
async fn text_query_finds_a_known_title_in_top_k() {
    let index = index();
    index.recreate_index().await.unwrap();

    let embedder = Embedder::with_encoder(Box::new(TestEncoder));
    let docs: Vec<RecipeDoc> = [
        recipe("Hearty Beef Stew", &["beef", "potatoes", "carrots"]),
        recipe("Lemon Sorbet", &["lemon", "sugar", "water"]),
        recipe("Garlic Butter Shrimp", &["shrimp", "garlic", "butter"]),
    ]
    .iter()
    .map(|r| {
        let mut doc = RecipeDoc::from(r);
        doc.embedding = Some(embedder.embed_recipe(r).unwrap());
        doc
    })
    .collect();

    let report = index.bulk_upsert(&docs).await.unwrap();
    assert_eq!(report.indexed, 3);
    assert_eq!(report.failed, 0);

    // Refresh window on small test clusters.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    let hits = index
        .query(
            SearchMode::Text,
            &SearchRequest {
                text: Some("beef stew".to_string()),
                size: 3,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(hits.iter().any(|h| h.title == "Hearty Beef Stew"));

    let embedder_query = embedder.embed_text("comfort food").unwrap();
    let semantic = index
        .query(
            SearchMode::Semantic,
            &SearchRequest {
                vector: Some(embedder_query.clone()),
                size: 3,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!semantic.is_empty());

    let hybrid = index
        .query(
            SearchMode::Hybrid,
            &SearchRequest {
                text: Some("comfort food".to_string()),
                vector: Some(embedder_query),
                size: 3,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!hybrid.is_empty());
}
