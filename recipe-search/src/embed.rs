//! Embedding generation.
//!
//! One static sentence-encoder per worker; construction downloads model
//! weights, so callers hold the `Embedder` in a shared context rather than
//! building one per call. Input text is the recipe title plus the ordered
//! ingredient items, amounts excluded, so re-parsing that only changes
//! amounts does not move the vector.

use model2vec_rs::model::StaticModel;
use tracing::{info, warn};

use recipe_model::{Recipe, EMBEDDING_DIMENSION};

use crate::SearchError;

pub const DEFAULT_EMBEDDING_MODEL: &str = "minishlab/potion-base-32M";

/// Minimal encoder seam so tests can run without model weights.
pub trait SentenceEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<f32>, SearchError>;
}

struct StaticModelEncoder {
    model: StaticModel,
}

impl SentenceEncoder for StaticModelEncoder {
    fn encode(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        self.model
            .encode(&[text.to_string()])
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::Model(format!("no embedding produced for {text:?}")))
    }
}

/// Fixed-dimension recipe embedder.
///
/// Encoders whose native width exceeds 384 are truncated to the leading 384
/// components and re-normalized; narrower encoders are rejected. The output
/// is always exactly [`EMBEDDING_DIMENSION`] finite floats.
pub struct Embedder {
    encoder: Box<dyn SentenceEncoder>,
}

impl Embedder {
    /// Load a model2vec static model by repository id.
    pub fn from_pretrained(model_id: &str) -> Result<Self, SearchError> {
        let model = StaticModel::from_pretrained(model_id, None, None, None)
            .map_err(|e| SearchError::Model(e.to_string()))?;
        info!(model = model_id, "loaded embedding model");
        Ok(Embedder {
            encoder: Box::new(StaticModelEncoder { model }),
        })
    }

    pub fn with_encoder(encoder: Box<dyn SentenceEncoder>) -> Self {
        Embedder { encoder }
    }

    /// Embed a recipe's title + ingredient items into exactly 384 floats.
    pub fn embed_recipe(&self, recipe: &Recipe) -> Result<Vec<f32>, SearchError> {
        self.embed_text(&recipe.embedding_text())
    }

    /// Embed a free query string; used by semantic and hybrid search.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let raw = self.encoder.encode(text)?;
        let vector = fit_dimension(raw)?;
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(SearchError::Model(format!(
                "non-finite component in embedding for {text:?}"
            )));
        }
        Ok(vector)
    }
}

fn fit_dimension(mut raw: Vec<f32>) -> Result<Vec<f32>, SearchError> {
    match raw.len() {
        len if len == EMBEDDING_DIMENSION => Ok(raw),
        len if len > EMBEDDING_DIMENSION => {
            warn!(native = len, "truncating embedding to fixed dimension");
            raw.truncate(EMBEDDING_DIMENSION);
            let norm = raw.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut raw {
                    *v /= norm;
                }
            }
            Ok(raw)
        }
        len => Err(SearchError::Dimension {
            len,
            expected: EMBEDDING_DIMENSION,
        }),
    }
}
