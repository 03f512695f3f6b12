//! Store → index synchronization.

use tracing::{info, instrument, warn};

use recipe_store::RecipeStore;

use crate::{Embedder, RecipeDoc, SearchError, SearchIndex};

/// Outcome of a full sync pass.
///
/// `success` documents were indexed with an embedding, `skipped` were
/// indexed without one (semantic search will skip them), `failed` were
/// rejected by the bulk endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Stream every stored recipe into the index in batches.
///
/// Embeddings come from the store cache when present and are generated (and
/// written back) otherwise. Embedding failure downgrades the document, it
/// never aborts the pass. Nothing is ever deleted from the index here.
#[instrument(name = "sync_all", skip_all, fields(batch_size))]
pub async fn sync_all(
    store: &RecipeStore,
    index: &SearchIndex,
    embedder: &Embedder,
    batch_size: usize,
) -> Result<SyncReport, SearchError> {
    index.ensure_index().await?;

    let batch_size = batch_size.clamp(1, 2000);
    let mut report = SyncReport::default();
    let mut offset: i64 = 0;

    loop {
        let batch = store.fetch_batch(offset, batch_size as i64).await?;
        if batch.is_empty() {
            break;
        }
        offset += batch.len() as i64;

        let mut docs = Vec::with_capacity(batch.len());
        let mut without_embedding = 0usize;
        for stored in &batch {
            let mut doc = RecipeDoc::from(&stored.recipe);
            if doc.embedding.is_none() {
                match embedder.embed_recipe(&stored.recipe) {
                    Ok(vector) => {
                        store.set_embedding(stored.id, &vector).await?;
                        doc.embedding = Some(vector);
                    }
                    Err(err) => {
                        warn!(identifier = %stored.recipe.identifier, %err, "embedding failed, indexing without vector");
                        without_embedding += 1;
                    }
                }
            }
            docs.push(doc);
        }

        let bulk = index.bulk_upsert(&docs).await?;
        report.failed += bulk.failed;
        report.skipped += without_embedding;
        report.success += bulk.indexed.saturating_sub(without_embedding);
        info!(
            indexed = bulk.indexed,
            failed = bulk.failed,
            offset,
            "synced batch"
        );
    }

    info!(
        success = report.success,
        skipped = report.skipped,
        failed = report.failed,
        "sync complete"
    );
    Ok(report)
}
