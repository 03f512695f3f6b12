//! # Recipe Model
//!
//! Canonical recipe record shared by every stage of the ingestion pipeline,
//! plus the three pure services that keep the pipeline honest:
//!
//! - [`identity`]: deterministic 128-bit recipe identifiers
//! - [`validate`]: the invariant checks applied before a record is loaded
//! - [`stage`]: the durable JSON handoff between parse and load
//!
//! ## Design Decisions
//!
//! ### Identity is a pure function of the title
//!
//! A recipe identifier is a name-based (v5) UUID over the normalized title
//! plus an optional source hint:
//!
//! ```text
//! identifier("Chocolate Chip Cookies", None)      → always the same UUID
//! identifier("chocolate  chip cookies ", None)    → the same UUID again
//! identifier("Chocolate Chip Cookies", Some("t3_abc")) → a different UUID
//! ```
//!
//! Ingredient-based fingerprints drift whenever the parser improves (same
//! recipe, different parse, different identifier), so ingredients never feed
//! the identity. Callers that genuinely have two recipes with one title pass
//! a source hint (post id, URL).
//!
//! ### Amounts are strings until a number is required
//!
//! `RecipeIngredient::amount` preserves exactly what the source said,
//! including ranges (`"2-4"`, `"30-45 minutes"`). The [`coerce`] module owns
//! the single rule for turning such strings into numbers (low end of a
//! range, first integer of a time), so the store and the repair pass cannot
//! disagree about it.
//!
//! ### Validation rejects, parsers never do
//!
//! Parsers are best-effort and always return *something*; [`validate`] is
//! the one gate that refuses a record (empty title, too few real
//! ingredients, malformed embedding). Rejections are typed and recoverable:
//! batch callers log the reason and skip the item.

pub mod coerce;
pub mod identity;
pub mod recipe;
pub mod stage;
pub mod validate;

pub use identity::recipe_identifier;
pub use recipe::{Difficulty, MealType, Recipe, RecipeIngredient, EMBEDDING_DIMENSION};
pub use stage::{read_staged, staged_path, write_staged, StageError};
pub use validate::{validate_for_load, ValidationError};
