use std::collections::HashMap;

use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use recipe_model::identity::normalize_for_identity;
use recipe_model::{validate_for_load, Difficulty, MealType, Recipe, RecipeIngredient};

use crate::rows::{amount_value, unit_type, CategoryCount, DbIngredientRow, DbRecipe, StoreStats, StoredRecipe};
use crate::StoreError;

const RECIPE_COLUMNS: &str = "id, identifier, title, description, instructions_json, \
prep_minutes, cook_minutes, total_minutes, servings, difficulty, cuisine_type, meal_type, \
dietary_tags, source_url, source_post_id, source_author, source_score, embedding, \
created_at, updated_at";

/// Result of [`RecipeStore::create`]: either a fresh row or the primary key
/// of the row that already held this recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Inserted(i64),
    AlreadyExists(i64),
}

impl CreateOutcome {
    pub fn primary_key(&self) -> i64 {
        match self {
            CreateOutcome::Inserted(id) | CreateOutcome::AlreadyExists(id) => *id,
        }
    }

    pub fn already_existed(&self) -> bool {
        matches!(self, CreateOutcome::AlreadyExists(_))
    }
}

/// Optional term and range filters for [`RecipeStore::search_text`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextSearchFilters {
    pub difficulty: Option<Difficulty>,
    pub meal_type: Option<MealType>,
    pub cuisine_type: Option<String>,
    pub dietary_tag: Option<String>,
    pub max_total_minutes: Option<u32>,
}

/// Postgres-backed recipe store.
#[derive(Clone, Debug)]
pub struct RecipeStore {
    pool: PgPool,
}

impl RecipeStore {
    pub async fn connect(dsn: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(dsn)
            .await?;
        info!("connected to recipe store");
        Ok(RecipeStore { pool })
    }

    /// Build the pool without dialing the database; the first query
    /// connects. Lets workers start before the store is reachable.
    pub fn connect_lazy(dsn: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(10).connect_lazy(dsn)?;
        Ok(RecipeStore { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        RecipeStore { pool }
    }

    /// Idempotent create; see the crate docs for the dedup policy. A lost
    /// insert race surfaces as `AlreadyExists`, never as an error.
    #[instrument(name = "store_create", skip_all, fields(identifier = %recipe.identifier))]
    pub async fn create(&self, recipe: &Recipe) -> Result<CreateOutcome, StoreError> {
        validate_for_load(recipe)?;

        if let Some(existing) = self.get_by_identifier(&recipe.identifier).await? {
            debug!(id = existing.id, "identifier already stored");
            return Ok(CreateOutcome::AlreadyExists(existing.id));
        }
        if let Some(existing) = self.get_by_title(&recipe.title).await? {
            debug!(id = existing.id, "title already stored");
            return Ok(CreateOutcome::AlreadyExists(existing.id));
        }

        match self.insert(recipe).await {
            Ok(id) => Ok(CreateOutcome::Inserted(id)),
            Err(StoreError::Database(err)) if is_unique_violation(&err) => {
                // Concurrent insert won; observe its row.
                let existing = match self.get_by_identifier(&recipe.identifier).await? {
                    Some(row) => Some(row),
                    None => self.get_by_title(&recipe.title).await?,
                };
                existing
                    .map(|row| CreateOutcome::AlreadyExists(row.id))
                    .ok_or(StoreError::Database(err))
            }
            Err(err) => Err(err),
        }
    }

    async fn insert(&self, recipe: &Recipe) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let recipe_id: i64 = sqlx::query_scalar(
            "INSERT INTO recipes (identifier, title, description, instructions_json, \
             prep_minutes, cook_minutes, total_minutes, servings, difficulty, cuisine_type, \
             meal_type, dietary_tags, source_url, source_post_id, source_author, source_score, \
             embedding) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING id",
        )
        .bind(recipe.identifier)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(Json(&recipe.instructions))
        .bind(recipe.prep_minutes.map(|v| v as i32))
        .bind(recipe.cook_minutes.map(|v| v as i32))
        .bind(recipe.total_minutes.map(|v| v as i32))
        .bind(recipe.servings)
        .bind(recipe.difficulty.map(|d| d.as_str()))
        .bind(&recipe.cuisine_type)
        .bind(recipe.meal_type.map(|m| m.as_str()))
        .bind(&recipe.dietary_tags)
        .bind(&recipe.source_url)
        .bind(&recipe.source_post_id)
        .bind(&recipe.source_author)
        .bind(recipe.source_score)
        .bind(&recipe.embedding)
        .fetch_one(&mut *tx)
        .await?;

        insert_ingredient_rows(&mut tx, recipe_id, &recipe.ingredients).await?;
        tx.commit().await?;
        info!(id = recipe_id, "inserted recipe");
        Ok(recipe_id)
    }

    pub async fn get(&self, id: i64) -> Result<Option<StoredRecipe>, StoreError> {
        let row: Option<DbRecipe> =
            sqlx::query_as(&format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        self.attach_ingredients(row).await
    }

    pub async fn get_by_identifier(
        &self,
        identifier: &Uuid,
    ) -> Result<Option<StoredRecipe>, StoreError> {
        let row: Option<DbRecipe> = sqlx::query_as(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE identifier = $1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        self.attach_ingredients(row).await
    }

    /// Lookup by normalized title; the safety net against identifier drift.
    pub async fn get_by_title(&self, title: &str) -> Result<Option<StoredRecipe>, StoreError> {
        let row: Option<DbRecipe> = sqlx::query_as(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE lower(title) = $1 LIMIT 1"
        ))
        .bind(normalize_for_identity(title))
        .fetch_optional(&self.pool)
        .await?;
        self.attach_ingredients(row).await
    }

    /// Replace a stored recipe with a newer snapshot carrying the same
    /// identifier. Junction rows are rewritten wholesale.
    #[instrument(name = "store_update", skip_all, fields(id))]
    pub async fn update(&self, id: i64, recipe: &Recipe) -> Result<(), StoreError> {
        validate_for_load(recipe)?;
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE recipes SET title = $2, description = $3, instructions_json = $4, \
             prep_minutes = $5, cook_minutes = $6, total_minutes = $7, servings = $8, \
             difficulty = $9, cuisine_type = $10, meal_type = $11, dietary_tags = $12, \
             source_url = $13, source_post_id = $14, source_author = $15, source_score = $16, \
             embedding = $17, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(Json(&recipe.instructions))
        .bind(recipe.prep_minutes.map(|v| v as i32))
        .bind(recipe.cook_minutes.map(|v| v as i32))
        .bind(recipe.total_minutes.map(|v| v as i32))
        .bind(recipe.servings)
        .bind(recipe.difficulty.map(|d| d.as_str()))
        .bind(&recipe.cuisine_type)
        .bind(recipe.meal_type.map(|m| m.as_str()))
        .bind(&recipe.dietary_tags)
        .bind(&recipe.source_url)
        .bind(&recipe.source_post_id)
        .bind(&recipe.source_author)
        .bind(recipe.source_score)
        .bind(&recipe.embedding)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_ingredient_rows(&mut tx, id, &recipe.ingredients).await?;
        tx.commit().await?;
        Ok(())
    }

    /// ILIKE text search with optional term/range filters, newest first.
    pub async fn search_text(
        &self,
        query: &str,
        filters: &TextSearchFilters,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<StoredRecipe>, StoreError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE 1=1"));
        if !query.trim().is_empty() {
            let pattern = format!("%{}%", query.trim());
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(difficulty) = filters.difficulty {
            qb.push(" AND difficulty = ").push_bind(difficulty.as_str());
        }
        if let Some(meal_type) = filters.meal_type {
            qb.push(" AND meal_type = ").push_bind(meal_type.as_str());
        }
        if let Some(cuisine) = &filters.cuisine_type {
            qb.push(" AND cuisine_type ILIKE ").push_bind(cuisine.clone());
        }
        if let Some(tag) = &filters.dietary_tag {
            qb.push(" AND ")
                .push_bind(tag.to_lowercase())
                .push(" = ANY(dietary_tags)");
        }
        if let Some(minutes) = filters.max_total_minutes {
            qb.push(" AND total_minutes <= ").push_bind(minutes as i32);
        }
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(i64::from(offset));

        let rows: Vec<DbRecipe> = qb.build_query_as().fetch_all(&self.pool).await?;
        self.attach_ingredients_all(rows).await
    }

    /// Page through the store in primary-key order; the sync path's feeder.
    pub async fn fetch_batch(&self, offset: i64, limit: i64) -> Result<Vec<StoredRecipe>, StoreError> {
        let rows: Vec<DbRecipe> = sqlx::query_as(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        self.attach_ingredients_all(rows).await
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar("SELECT count(*) FROM recipes")
            .fetch_one(&self.pool)
            .await?)
    }

    /// Cached embedding for an identifier, if the store has one.
    pub async fn embedding_for(&self, identifier: &Uuid) -> Result<Option<Vec<f32>>, StoreError> {
        let found: Option<Option<Vec<f32>>> =
            sqlx::query_scalar("SELECT embedding FROM recipes WHERE identifier = $1")
                .bind(identifier)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.flatten())
    }

    pub async fn set_embedding(&self, id: i64, embedding: &[f32]) -> Result<(), StoreError> {
        sqlx::query("UPDATE recipes SET embedding = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(embedding)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        let total_recipes: i64 = sqlx::query_scalar("SELECT count(*) FROM recipes")
            .fetch_one(&self.pool)
            .await?;
        let with_embedding: i64 =
            sqlx::query_scalar("SELECT count(*) FROM recipes WHERE embedding IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;
        let avg_total_minutes: Option<f64> =
            sqlx::query_scalar("SELECT avg(total_minutes)::float8 FROM recipes")
                .fetch_one(&self.pool)
                .await?;
        let by_meal_type = self.category_counts("meal_type").await?;
        let by_difficulty = self.category_counts("difficulty").await?;
        let by_cuisine = self.category_counts("cuisine_type").await?;
        Ok(StoreStats {
            total_recipes,
            with_embedding,
            avg_total_minutes,
            by_meal_type,
            by_difficulty,
            by_cuisine,
        })
    }

    async fn category_counts(&self, column: &str) -> Result<Vec<CategoryCount>, StoreError> {
        // `column` is one of three hard-coded names, never user input.
        let rows: Vec<CategoryCount> = sqlx::query_as(&format!(
            "SELECT {column} AS name, count(*) AS count FROM recipes \
             WHERE {column} IS NOT NULL GROUP BY {column} ORDER BY count DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn attach_ingredients(
        &self,
        row: Option<DbRecipe>,
    ) -> Result<Option<StoredRecipe>, StoreError> {
        match row {
            Some(row) => Ok(self.attach_ingredients_all(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn attach_ingredients_all(
        &self,
        rows: Vec<DbRecipe>,
    ) -> Result<Vec<StoredRecipe>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let ingredient_rows: Vec<DbIngredientRow> = sqlx::query_as(
            "SELECT ri.recipe_id, i.name AS item, ri.amount, m.name AS unit, ri.notes, \
             ri.order_index \
             FROM recipe_ingredients ri \
             JOIN ingredients i ON i.id = ri.ingredient_id \
             LEFT JOIN measurements m ON m.id = ri.measurement_id \
             WHERE ri.recipe_id = ANY($1) \
             ORDER BY ri.recipe_id, ri.order_index",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<RecipeIngredient>> = HashMap::new();
        for row in ingredient_rows {
            grouped
                .entry(row.recipe_id)
                .or_default()
                .push(row.into_ingredient());
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                let ingredients = grouped.remove(&row.id).unwrap_or_default();
                row.into_stored(ingredients)
            })
            .collect())
    }
}

/// Catalog upserts plus junction rows, all inside the caller's transaction.
async fn insert_ingredient_rows(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
    ingredients: &[RecipeIngredient],
) -> Result<(), StoreError> {
    for row in ingredients {
        let ingredient_id: i64 = sqlx::query_scalar(
            "INSERT INTO ingredients (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id",
        )
        .bind(&row.item)
        .fetch_one(&mut **tx)
        .await?;

        let measurement_id: Option<i64> = match &row.unit {
            Some(unit) => Some(
                sqlx::query_scalar(
                    "INSERT INTO measurements (name, unit_type) VALUES ($1, $2) \
                     ON CONFLICT (name) DO UPDATE SET unit_type = EXCLUDED.unit_type RETURNING id",
                )
                .bind(unit.to_lowercase())
                .bind(unit_type(unit))
                .fetch_one(&mut **tx)
                .await?,
            ),
            None => None,
        };

        sqlx::query(
            "INSERT INTO recipe_ingredients \
             (recipe_id, ingredient_id, measurement_id, amount, notes, order_index) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(recipe_id)
        .bind(ingredient_id)
        .bind(measurement_id)
        .bind(amount_value(&row.amount))
        .bind(&row.notes)
        .bind(row.order_index as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
