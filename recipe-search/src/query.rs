//! Query body assembly for the three search modes.
//!
//! Pure functions over `serde_json::Value` so the exact request shape is
//! unit-testable without an index.

use serde_json::{json, Value};

use recipe_model::{Difficulty, MealType};

/// Minimum kNN candidate pool regardless of the requested page size.
const MIN_NUM_CANDIDATES: usize = 100;

/// Default boost applied to the kNN clause in hybrid mode.
pub const DEFAULT_VECTOR_BOOST: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    Text,
    Semantic,
    Hybrid,
}

/// Term and range filters shared by all modes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchFilters {
    pub difficulty: Option<Difficulty>,
    pub meal_type: Option<MealType>,
    pub cuisine_type: Option<String>,
    pub dietary_tags: Vec<String>,
    pub max_total_minutes: Option<u32>,
}

impl SearchFilters {
    fn clauses(&self) -> Vec<Value> {
        let mut filters = Vec::new();
        if let Some(difficulty) = self.difficulty {
            filters.push(json!({"term": {"difficulty": difficulty.as_str()}}));
        }
        if let Some(meal_type) = self.meal_type {
            filters.push(json!({"term": {"meal_type": meal_type.as_str()}}));
        }
        if let Some(cuisine) = &self.cuisine_type {
            filters.push(json!({"term": {"cuisine_type": cuisine}}));
        }
        for tag in &self.dietary_tags {
            filters.push(json!({"term": {"dietary_tags": tag}}));
        }
        if let Some(minutes) = self.max_total_minutes {
            filters.push(json!({"range": {"total_minutes": {"lte": minutes}}}));
        }
        filters
    }
}

/// One search request; `vector` is required for semantic and hybrid modes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchRequest {
    pub text: Option<String>,
    pub filters: SearchFilters,
    pub vector: Option<Vec<f32>>,
    pub from: usize,
    pub size: usize,
    pub vector_boost: Option<f32>,
}

/// Assemble the request body for a mode. Callers guarantee the invariants
/// (text modes carry text, vector modes carry a vector); missing pieces
/// produce a match-all rather than an error.
pub fn build_query_body(mode: SearchMode, request: &SearchRequest) -> Value {
    let size = if request.size == 0 { 10 } else { request.size };
    let mut body = json!({
        "from": request.from,
        "size": size,
    });

    let filters = request.filters.clauses();
    let text_bool = request.text.as_deref().map(|text| {
        json!({
            "bool": {
                "should": [
                    {"multi_match": {"query": text, "fields": ["title^2", "description"]}},
                    {"nested": {
                        "path": "ingredients",
                        "query": {"match": {"ingredients.name": text}}
                    }}
                ],
                "minimum_should_match": 1,
                "filter": filters,
            }
        })
    });

    let knn = request.vector.as_ref().map(|vector| {
        let mut clause = json!({
            "field": "embedding",
            "query_vector": vector,
            "k": size,
            "num_candidates": MIN_NUM_CANDIDATES.max(size * 10),
        });
        if !filters.is_empty() {
            clause["filter"] = json!(filters);
        }
        clause
    });

    match mode {
        SearchMode::Text => {
            body["query"] = text_bool.unwrap_or_else(|| match_all_with(filters));
        }
        SearchMode::Semantic => {
            if let Some(knn) = knn {
                body["knn"] = knn;
            }
        }
        SearchMode::Hybrid => {
            body["query"] = text_bool.unwrap_or_else(|| match_all_with(filters));
            if let Some(mut knn) = knn {
                knn["boost"] = json!(request.vector_boost.unwrap_or(DEFAULT_VECTOR_BOOST));
                body["knn"] = knn;
            }
        }
    }
    body
}

fn match_all_with(filters: Vec<Value>) -> Value {
    if filters.is_empty() {
        json!({"match_all": {}})
    } else {
        json!({"bool": {"must": [{"match_all": {}}], "filter": filters}})
    }
}

/// The index mapping: analyzed text fields, keyword facets, nested
/// ingredients and the fixed-width dense vector.
pub fn mapping_body() -> Value {
    json!({
        "mappings": {
            "properties": {
                "identifier": {"type": "keyword"},
                "title": {
                    "type": "text",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "description": {"type": "text"},
                "instructions": {"type": "text"},
                "ingredients": {
                    "type": "nested",
                    "properties": {
                        "name": {
                            "type": "text",
                            "fields": {"keyword": {"type": "keyword"}}
                        }
                    }
                },
                "difficulty": {"type": "keyword"},
                "cuisine_type": {"type": "keyword"},
                "meal_type": {"type": "keyword"},
                "dietary_tags": {"type": "keyword"},
                "prep_minutes": {"type": "integer"},
                "cook_minutes": {"type": "integer"},
                "total_minutes": {"type": "integer"},
                "servings": {"type": "float"},
                "source_score": {"type": "long"},
                "embedding": {
                    "type": "dense_vector",
                    "dims": recipe_model::EMBEDDING_DIMENSION,
                    "index": true,
                    "similarity": "cosine"
                }
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn text_request(text: &str) -> SearchRequest {
        SearchRequest {
            text: Some(text.to_string()),
            size: 10,
            ..Default::default()
        }
    }

    #[test]
    fn text_mode_boosts_title_and_nests_ingredients() {
        let body = build_query_body(SearchMode::Text, &text_request("comfort food"));
        let should = &body["query"]["bool"]["should"];
        assert_eq!(
            should[0]["multi_match"]["fields"],
            json!(["title^2", "description"])
        );
        assert_eq!(should[1]["nested"]["path"], "ingredients");
        assert!(body.get("knn").is_none());
    }

    #[test]
    fn semantic_mode_is_pure_knn() {
        let request = SearchRequest {
            vector: Some(vec![0.1; 384]),
            size: 5,
            ..Default::default()
        };
        let body = build_query_body(SearchMode::Semantic, &request);
        assert!(body.get("query").is_none());
        assert_eq!(body["knn"]["k"], 5);
        // Candidate pool never drops below the floor.
        assert_eq!(body["knn"]["num_candidates"], 100);
    }

    #[test]
    fn hybrid_mode_carries_both_clauses_with_boost() {
        let request = SearchRequest {
            text: Some("comfort food".to_string()),
            vector: Some(vec![0.1; 384]),
            size: 20,
            vector_boost: Some(2.5),
            ..Default::default()
        };
        let body = build_query_body(SearchMode::Hybrid, &request);
        assert!(body.get("query").is_some());
        assert_eq!(body["knn"]["boost"], 2.5);
        assert_eq!(body["knn"]["num_candidates"], 200);
    }

    #[test]
    fn filters_apply_to_text_and_knn() {
        let request = SearchRequest {
            text: Some("stew".to_string()),
            vector: Some(vec![0.0; 384]),
            filters: SearchFilters {
                meal_type: Some(MealType::Dinner),
                max_total_minutes: Some(45),
                dietary_tags: vec!["vegetarian".to_string()],
                ..Default::default()
            },
            size: 10,
            ..Default::default()
        };
        let body = build_query_body(SearchMode::Hybrid, &request);
        let filter = &body["query"]["bool"]["filter"];
        assert_eq!(filter[0]["term"]["meal_type"], "dinner");
        assert_eq!(filter[1]["term"]["dietary_tags"], "vegetarian");
        assert_eq!(filter[2]["range"]["total_minutes"]["lte"], 45);
        assert_eq!(body["knn"]["filter"], *filter);
    }

    #[test]
    fn mapping_pins_the_vector_dimension() {
        let mapping = mapping_body();
        assert_eq!(
            mapping["mappings"]["properties"]["embedding"]["dims"],
            384
        );
        assert_eq!(
            mapping["mappings"]["properties"]["ingredients"]["type"],
            "nested"
        );
        assert_eq!(
            mapping["mappings"]["properties"]["title"]["fields"]["raw"]["type"],
            "keyword"
        );
    }
}
