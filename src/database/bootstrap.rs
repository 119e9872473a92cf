use anyhow::{Context, Result};
use std::path::Path;

use super::store::{DocumentStore, IngestOptions};
use crate::document::scan_pdfs;
use crate::llm::Oracle;

/// Loads the snapshot, or scans and ingests `pdf_dir` when there is nothing
/// to load. With `reindex` the snapshot is ignored and a fresh store is built;
/// it is only overwritten when the scan yields at least one document.
pub async fn bootstrap_store(
    snapshot_path: &Path,
    pdf_dir: &Path,
    oracle: &Oracle,
    reindex: bool,
    options: IngestOptions,
) -> Result<DocumentStore> {
    let mut store = DocumentStore::new(snapshot_path);
    if reindex {
        log::info!("Rebuilding {} from {}", snapshot_path.display(), pdf_dir.display());
    } else {
        store
            .load()
            .await
            .with_context(|| format!("Failed to load {}", snapshot_path.display()))?;
    }

    if store.is_empty() {
        let pdfs = scan_pdfs(pdf_dir)
            .await
            .with_context(|| format!("Failed to scan {}", pdf_dir.display()))?;
        if pdfs.is_empty() {
            log::warn!("No PDFs found in {}", pdf_dir.display());
        } else {
            log::info!("Ingesting {} PDFs", pdfs.len());
            let added = store.ingest(oracle, pdfs, options).await.context("Ingestion aborted")?;
            log::info!("Ingested {} documents", added);
        }
    }

    Ok(store)
}
