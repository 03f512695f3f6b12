//! Durable JSON handoff between parse and load.
//!
//! One file per recipe, named `<identifier>.json`. Files are written once
//! and treated as immutable by readers; re-staging the same identifier is a
//! no-op, which is what makes `extract_one` safe to retry.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::recipe::Recipe;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("staged file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("staged file is not a recipe document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("staged file {path} carries identifier {found}, expected {expected}")]
    IdentifierMismatch {
        path: PathBuf,
        found: Uuid,
        expected: Uuid,
    },
}

/// Path of the staged file for an identifier.
pub fn staged_path(dir: &Path, identifier: &Uuid) -> PathBuf {
    dir.join(format!("{identifier}.json"))
}

/// Write a recipe to its staged file.
///
/// Returns the path. If the file already exists with the same identifier the
/// write is skipped; an existing file with a *different* identifier is an
/// error (the directory is keyed by identifier).
pub fn write_staged(dir: &Path, recipe: &Recipe) -> Result<PathBuf, StageError> {
    fs::create_dir_all(dir)?;
    let path = staged_path(dir, &recipe.identifier);
    if path.exists() {
        let existing = read_staged(&path)?;
        if existing.identifier == recipe.identifier {
            debug!(identifier = %recipe.identifier, "already staged, skipping write");
            return Ok(path);
        }
        return Err(StageError::IdentifierMismatch {
            path,
            found: existing.identifier,
            expected: recipe.identifier,
        });
    }
    let json = serde_json::to_vec_pretty(recipe)?;
    fs::write(&path, json)?;
    debug!(identifier = %recipe.identifier, path = %path.display(), "staged recipe");
    Ok(path)
}

/// Read one staged recipe file.
pub fn read_staged(path: &Path) -> Result<Recipe, StageError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// List staged recipe files in a directory, sorted by file name for
/// deterministic batch order.
pub fn list_staged(dir: &Path) -> Result<Vec<PathBuf>, StageError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identity::recipe_identifier;
    use crate::recipe::RecipeIngredient;

    fn sample(title: &str) -> Recipe {
        Recipe {
            identifier: recipe_identifier(title, None),
            title: title.to_string(),
            ingredients: vec![
                RecipeIngredient {
                    item: "flour".to_string(),
                    amount: "2".to_string(),
                    unit: Some("cup".to_string()),
                    ..Default::default()
                },
                RecipeIngredient {
                    item: "butter".to_string(),
                    amount: "1".to_string(),
                    unit: Some("cup".to_string()),
                    order_index: 1,
                    ..Default::default()
                },
            ],
            instructions: vec!["Mix.".to_string(), "Bake.".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = sample("Chocolate Chip Cookies");
        let path = write_staged(dir.path(), &recipe).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            format!("{}.json", recipe.identifier)
        );
        assert_eq!(read_staged(&path).unwrap(), recipe);
    }

    #[test]
    fn restaging_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = sample("Toast");
        let first = write_staged(dir.path(), &recipe).unwrap();
        let before = fs::metadata(&first).unwrap().modified().unwrap();
        let second = write_staged(dir.path(), &recipe).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::metadata(&second).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn listing_returns_sorted_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = sample("Apple Pie");
        let b = sample("Banana Bread");
        write_staged(dir.path(), &a).unwrap();
        write_staged(dir.path(), &b).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let listed = list_staged(dir.path()).unwrap();
        assert_eq!(listed.len(), 2);
        let mut expected = vec![
            staged_path(dir.path(), &a.identifier),
            staged_path(dir.path(), &b.identifier),
        ];
        expected.sort();
        assert_eq!(listed, expected);
    }
}
