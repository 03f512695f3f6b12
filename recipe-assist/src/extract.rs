//! Extraction driver: prompt, lenient parse, one re-prompt, local fallback.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use recipe_model::Recipe;
use recipe_parser::{LooseRecipe, RecipeTextParser};

use crate::{AssistError, CompletionModel};

const SYSTEM_PROMPT: &str = "\
You extract structured recipes from messy text. Respond with a single JSON \
object and nothing else, using this shape:

{
  \"title\": \"...\",
  \"description\": \"...\",
  \"ingredients\": [{\"item\": \"...\", \"amount\": \"...\", \"unit\": \"...\", \"notes\": \"...\"}],
  \"instructions\": [\"...\"],
  \"prep_minutes\": 15, \"cook_minutes\": 12, \"total_minutes\": 27,
  \"servings\": 4, \"difficulty\": \"easy\",
  \"cuisine_type\": \"...\", \"meal_type\": \"dinner\",
  \"dietary_tags\": [\"...\"]
}

Rules:
- The item field is the ingredient name only. Never put quantities or units \
into item; they belong in amount and unit.
- Instructions are steps, never ingredients. Do not list a cooking step as \
an ingredient.
- Numeric fields may be numbers or strings; ranges like \"30-45\" are fine \
as strings. Omit anything the text does not state.";

const STRICT_REPROMPT: &str = "\
Your previous reply was not a parseable JSON object. Respond again with \
ONLY the JSON object described by the schema: no prose, no markdown fences, \
no trailing commentary.";

const EXTRACT_TEMPERATURE: f32 = 0.1;

/// Two-track extractor: ask the model, hold its answer to the lenient
/// schema, and fall back to the pattern-based parser when the model cannot
/// produce one.
pub struct ModelAssistedParser {
    model: Arc<dyn CompletionModel>,
    local: RecipeTextParser,
}

impl ModelAssistedParser {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        ModelAssistedParser {
            model,
            local: RecipeTextParser::new(),
        }
    }

    pub fn with_local_parser(mut self, local: RecipeTextParser) -> Self {
        self.local = local;
        self
    }

    /// Extract a recipe from `text`. Schema failures cost one re-prompt and
    /// then silently fall back to the local parser; transport errors
    /// propagate so the caller's retry policy can take over.
    #[instrument(name = "assisted_extract", skip_all, fields(chars = text.len()))]
    pub async fn extract(
        &self,
        text: &str,
        source_hint: Option<&str>,
    ) -> Result<Recipe, AssistError> {
        let prompt = format!("Extract the recipe from this text:\n\n{text}");

        let first = self
            .model
            .complete(&prompt, EXTRACT_TEMPERATURE, SYSTEM_PROMPT)
            .await?;
        if let Some(loose) = parse_loose(&first) {
            return Ok(self.finish(loose, source_hint));
        }

        warn!("model output failed the schema, re-prompting once");
        let retry_prompt = format!("{prompt}\n\n{STRICT_REPROMPT}");
        let second = self
            .model
            .complete(&retry_prompt, EXTRACT_TEMPERATURE, SYSTEM_PROMPT)
            .await?;
        if let Some(loose) = parse_loose(&second) {
            return Ok(self.finish(loose, source_hint));
        }

        info!("falling back to the local parser");
        Ok(self.local.parse_recipe(text, source_hint))
    }

    fn finish(&self, mut loose: LooseRecipe, source_hint: Option<&str>) -> Recipe {
        if loose.source_post_id.is_none() {
            loose.source_post_id = source_hint.map(String::from);
        }
        self.local.repair(loose)
    }
}

/// Lenient deserialization of a model reply: tolerate markdown fences and
/// leading/trailing prose around the JSON object.
fn parse_loose(reply: &str) -> Option<LooseRecipe> {
    let candidate = extract_json_object(reply)?;
    match serde_json::from_str::<LooseRecipe>(candidate) {
        Ok(loose) if !loose.title.trim().is_empty() => Some(loose),
        Ok(_) => None,
        Err(err) => {
            warn!(%err, "model reply was not a loose recipe");
            None
        }
    }
}

/// The outermost `{ ... }` span of the reply, if any.
fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}
