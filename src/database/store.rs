use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;

use crate::document::{extract_landlord, extract_tenant, Document, RawDocument};
use crate::llm::oracle::Oracle;
use crate::providers::{ProviderError, TaskType};

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read snapshot {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write snapshot {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Snapshot {path} is not a valid document list: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("Oracle call failed for {document}: {source}")]
    Oracle {
        document: String,
        #[source]
        source: ProviderError,
    },
    #[error("Embedding dimension mismatch: store uses {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub batch_size: usize,
    /// Pause between consecutive batches, to stay under the oracle's rate limit.
    pub batch_delay: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: 2,
            batch_delay: Duration::from_secs(5),
        }
    }
}

/// Cosine of the angle between two vectors of equal length.
///
/// A zero-magnitude input yields 0 rather than NaN, which also makes a
/// degenerate vector indistinguishable from an orthogonal one.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    let similarity = dot / denom;
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}

/// The in-memory document collection and its JSON snapshot.
pub struct DocumentStore {
    documents: Vec<Document>,
    snapshot_path: PathBuf,
}

impl DocumentStore {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            documents: Vec::new(),
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.name == name)
    }

    /// Embedding length shared by every stored document, if any are stored.
    pub fn dimension(&self) -> Option<usize> {
        self.documents.first().map(|d| d.embedding.len())
    }

    /// Replaces the collection with the snapshot contents when the snapshot
    /// exists. A missing snapshot leaves the collection untouched.
    pub async fn load(&mut self) -> Result<&[Document], StoreError> {
        let path = self.snapshot_path.display().to_string();
        let exists = fs::try_exists(&self.snapshot_path)
            .await
            .map_err(|source| StoreError::Read { path: path.clone(), source })?;
        if !exists {
            log::info!("No snapshot at {}, starting empty", path);
            return Ok(&self.documents);
        }

        let data = fs::read_to_string(&self.snapshot_path)
            .await
            .map_err(|source| StoreError::Read { path: path.clone(), source })?;
        let documents: Vec<Document> =
            serde_json::from_str(&data).map_err(|source| StoreError::Corrupt { path: path.clone(), source })?;

        log::info!("Loaded {} documents from {}", documents.len(), path);
        self.documents = documents;
        Ok(&self.documents)
    }

    /// Writes the whole collection, replacing any previous snapshot.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.documents).map_err(StoreError::Serialize)?;
        fs::write(&self.snapshot_path, json).await.map_err(|source| StoreError::Write {
            path: self.snapshot_path.display().to_string(),
            source,
        })?;
        log::info!("Saved {} documents to {}", self.documents.len(), self.snapshot_path.display());
        Ok(())
    }

    /// Enriches and appends `raw` documents, then persists one snapshot.
    ///
    /// Documents are processed strictly in order, one oracle call at a time.
    /// The run is all-or-nothing: if any call fails, nothing from this run is
    /// appended and the snapshot is left as it was. Inputs whose id is already
    /// stored are skipped. Returns the number of documents appended.
    pub async fn ingest(
        &mut self,
        oracle: &Oracle,
        raw: Vec<RawDocument>,
        options: IngestOptions,
    ) -> Result<usize, StoreError> {
        let mut seen: HashSet<String> = self.documents.iter().map(|d| d.id.clone()).collect();
        let pending: Vec<RawDocument> = raw
            .into_iter()
            .filter(|r| {
                let fresh = seen.insert(r.id.clone());
                if !fresh {
                    log::warn!("Skipping {}: already in the store", r.id);
                }
                fresh
            })
            .collect();

        let batch_size = options.batch_size.max(1);
        let batch_count = pending.len().div_ceil(batch_size);
        let mut expected_dim = self.dimension();
        let mut staged = Vec::with_capacity(pending.len());

        for (index, batch) in pending.chunks(batch_size).enumerate() {
            log::info!("Ingesting batch {}/{} ({} documents)", index + 1, batch_count, batch.len());
            for raw in batch {
                let document = ingest_one(oracle, raw).await.map_err(|source| StoreError::Oracle {
                    document: raw.name.clone(),
                    source,
                })?;

                let actual = document.embedding.len();
                match expected_dim {
                    Some(expected) if expected != actual => {
                        return Err(StoreError::DimensionMismatch { expected, actual });
                    }
                    None => expected_dim = Some(actual),
                    _ => {}
                }
                staged.push(document);
            }

            if index + 1 < batch_count {
                log::info!("Pausing {}s to stay under the rate limit...", options.batch_delay.as_secs_f32());
                tokio::time::sleep(options.batch_delay).await;
            }
        }

        let added = staged.len();
        self.documents.extend(staged);
        self.persist().await?;
        Ok(added)
    }

    /// The `top_k` documents most similar to `query_embedding`, best first.
    /// Equal scores keep insertion order.
    pub fn find_similar(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<&Document>, StoreError> {
        if let Some(expected) = self.dimension() {
            if expected != query_embedding.len() {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: query_embedding.len(),
                });
            }
        }

        let mut scored: Vec<(f32, &Document)> = self
            .documents
            .iter()
            .map(|doc| (cosine_similarity(query_embedding, &doc.embedding), doc))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored.into_iter().take(top_k).map(|(_, doc)| doc).collect())
    }
}

async fn ingest_one(oracle: &Oracle, raw: &RawDocument) -> Result<Document, ProviderError> {
    log::info!("Processing {}", raw.name);
    let category = oracle.classify(&raw.text).await?;
    let subcategory = oracle.subclassify(&raw.text, &category).await?;
    let observation = oracle.observe(&raw.text).await?;
    let embedding = oracle.embed(&raw.text, TaskType::RetrievalDocument).await?;

    Ok(Document {
        id: raw.id.clone(),
        name: raw.name.clone(),
        path: raw.path.clone(),
        size: raw.size,
        text: raw.text.clone(),
        category,
        subcategory,
        observation,
        embedding,
        locador: extract_landlord(&raw.text),
        locatario: extract_tenant(&raw.text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Landlord, Tenant};
    use crate::providers::testing::ScriptedProvider;
    use crate::providers::{Backoff, RetryPolicy};
    use std::sync::Arc;

    fn doc(name: &str, embedding: Vec<f32>) -> Document {
        Document {
            id: format!("pdfs/{}", name),
            name: name.to_string(),
            path: format!("pdfs/{}", name),
            size: 1024,
            text: format!("texto de {}", name),
            category: "Contrato".to_string(),
            subcategory: "Locação residencial".to_string(),
            observation: "Sem observações".to_string(),
            embedding,
            locador: None,
            locatario: None,
        }
    }

    fn raw(name: &str, text: &str) -> RawDocument {
        RawDocument {
            id: format!("pdfs/{}", name),
            name: name.to_string(),
            path: format!("pdfs/{}", name),
            size: text.len() as u64,
            text: text.to_string(),
        }
    }

    fn store_with(dir: &tempfile::TempDir, documents: Vec<Document>) -> DocumentStore {
        let mut store = DocumentStore::new(dir.path().join("documents.json"));
        store.documents = documents;
        store
    }

    fn fast_oracle(provider: Arc<ScriptedProvider>) -> Oracle {
        Oracle::with_policies(
            provider,
            RetryPolicy::new(3, Duration::ZERO, Backoff::Exponential),
            RetryPolicy::new(3, Duration::ZERO, Backoff::Linear),
        )
    }

    fn no_delay() -> IngestOptions {
        IngestOptions {
            batch_size: 2,
            batch_delay: Duration::ZERO,
        }
    }

    /// Embeds by looking for a marker word in the text.
    fn marker_provider() -> ScriptedProvider {
        ScriptedProvider::new()
            .with_complete(|prompt| {
                if prompt.starts_with("Classifique") {
                    Ok("Contrato".to_string())
                } else if prompt.starts_with("Dada a categoria") {
                    Ok("Locação".to_string())
                } else {
                    Ok("Observação".to_string())
                }
            })
            .with_embed(|text, _| {
                if text.contains("primeiro") {
                    Ok(vec![1.0, 0.0])
                } else {
                    Ok(vec![0.0, 1.0])
                }
            })
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = [0.3, -1.2, 4.0];
        let b = [2.0, 0.5, -0.7];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        let zero = [0.0, 0.0];
        assert_eq!(cosine_similarity(&zero, &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn cosine_of_known_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn find_similar_sorts_descending_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(
            &dir,
            vec![
                doc("a.pdf", vec![0.0, 1.0]),
                doc("b.pdf", vec![1.0, 0.0]),
                doc("c.pdf", vec![1.0, 1.0]),
                doc("d.pdf", vec![-1.0, 0.0]),
            ],
        );

        let results = store.find_similar(&[1.0, 0.1], DEFAULT_TOP_K).unwrap();
        let names: Vec<&str> = results.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "c.pdf", "a.pdf"]);
    }

    #[test]
    fn find_similar_returns_all_when_store_is_small() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, vec![doc("a.pdf", vec![1.0, 0.0]), doc("b.pdf", vec![0.0, 1.0])]);

        assert_eq!(store.find_similar(&[1.0, 0.0], 3).unwrap().len(), 2);
        assert_eq!(store.find_similar(&[1.0, 0.0], 0).unwrap().len(), 0);
    }

    #[test]
    fn find_similar_keeps_insertion_order_on_ties() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(
            &dir,
            vec![
                doc("first.pdf", vec![0.0, 1.0]),
                doc("zero.pdf", vec![0.0, 0.0]),
                doc("second.pdf", vec![0.0, 2.0]),
                doc("third.pdf", vec![0.0, 3.0]),
            ],
        );

        let results = store.find_similar(&[1.0, 0.0], 4).unwrap();
        let names: Vec<&str> = results.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["first.pdf", "zero.pdf", "second.pdf", "third.pdf"]);
    }

    #[test]
    fn find_similar_rejects_wrong_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, vec![doc("a.pdf", vec![1.0, 0.0])]);

        let result = store.find_similar(&[1.0, 0.0, 0.0], 3);
        assert!(matches!(result, Err(StoreError::DimensionMismatch { expected: 2, actual: 3 })));
    }

    #[test]
    fn find_similar_on_empty_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, Vec::new());
        assert!(store.find_similar(&[1.0], 3).unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_without_snapshot_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DocumentStore::new(dir.path().join("missing.json"));

        assert!(store.is_empty());
        assert!(store.load().await.unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn load_surfaces_unreadable_snapshot_location() {
        let dir = tempfile::tempdir().unwrap();
        let plain_file = dir.path().join("plain");
        std::fs::write(&plain_file, "x").unwrap();

        let mut store = DocumentStore::new(plain_file.join("documents.json"));
        assert!(matches!(store.load().await, Err(StoreError::Read { .. })));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn load_rejects_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut store = DocumentStore::new(&path);
        assert!(matches!(store.load().await, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn snapshot_round_trip_preserves_documents() {
        let dir = tempfile::tempdir().unwrap();
        let mut with_parties = doc("a.pdf", vec![0.1, 0.9]);
        with_parties.locador = Some(Landlord {
            name: "Acme Corp".to_string(),
            cnpj: "12.345.678/0001-99".to_string(),
            rg: "1.234.567".to_string(),
        });
        with_parties.locatario = Some(Tenant {
            name: "Maria Souza".to_string(),
            rg: "9.876.543-2".to_string(),
        });
        let original = vec![with_parties, doc("b.pdf", vec![0.5, -0.5])];

        let store = store_with(&dir, original.clone());
        store.persist().await.unwrap();

        let mut restored = DocumentStore::new(store.snapshot_path());
        restored.load().await.unwrap();
        assert!(!restored.is_empty());
        assert_eq!(restored.documents(), original.as_slice());
        assert!(restored.documents()[1].locador.is_none());
        assert!(restored.documents()[1].locatario.is_none());
    }

    #[tokio::test]
    async fn ingest_then_query_ranks_matching_document_first() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(marker_provider());
        let oracle = fast_oracle(provider.clone());
        let mut store = DocumentStore::new(dir.path().join("documents.json"));

        let added = store
            .ingest(
                &oracle,
                vec![
                    raw("um.pdf", "primeiro contrato. LOCATÁRIO: Ana Lima, portadora do RG nº 12.345"),
                    raw("dois.pdf", "segundo contrato"),
                ],
                no_delay(),
            )
            .await
            .unwrap();

        assert_eq!(added, 2);
        assert!(!store.is_empty());
        assert_eq!(store.dimension(), Some(2));

        let results = store.find_similar(&[1.0, 0.0], DEFAULT_TOP_K).unwrap();
        assert_eq!(results[0].name, "um.pdf");
        assert_eq!(results[1].name, "dois.pdf");
        assert!(
            cosine_similarity(&[1.0, 0.0], &results[0].embedding) > cosine_similarity(&[1.0, 0.0], &results[1].embedding)
        );

        let first = &store.documents()[0];
        assert_eq!(first.category, "Contrato");
        assert_eq!(first.subcategory, "Locação");
        assert_eq!(first.locatario.as_ref().unwrap().name, "Ana Lima");
        assert!(first.locador.is_none());

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 6);
        assert!(prompts[1].contains("\"Contrato\""));
        assert!(provider.embedded().iter().all(|(_, task)| *task == TaskType::RetrievalDocument));

        let mut reloaded = DocumentStore::new(store.snapshot_path());
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.len(), 2);
    }

    #[tokio::test]
    async fn ingest_failure_aborts_without_partial_state() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(marker_provider().with_embed(|text, _| {
            if text.contains("quebrado") {
                Err(ProviderError::Api {
                    status: 400,
                    body: "bad".to_string(),
                })
            } else {
                Ok(vec![1.0, 0.0])
            }
        }));
        let oracle = fast_oracle(provider);
        let mut store = DocumentStore::new(dir.path().join("documents.json"));

        let result = store
            .ingest(
                &oracle,
                vec![
                    raw("a.pdf", "bom"),
                    raw("b.pdf", "bom"),
                    raw("c.pdf", "quebrado"),
                ],
                no_delay(),
            )
            .await;

        assert!(matches!(result, Err(StoreError::Oracle { ref document, .. }) if document == "c.pdf"));
        assert!(store.is_empty());
        assert!(!store.snapshot_path().exists());
    }

    #[tokio::test]
    async fn ingest_skips_known_ids_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = fast_oracle(Arc::new(marker_provider()));
        let mut store = DocumentStore::new(dir.path().join("documents.json"));

        store.ingest(&oracle, vec![raw("a.pdf", "primeiro")], no_delay()).await.unwrap();
        let added = store
            .ingest(&oracle, vec![raw("a.pdf", "primeiro"), raw("b.pdf", "outro")], no_delay())
            .await
            .unwrap();

        assert_eq!(added, 1);
        let names: Vec<&str> = store.documents().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }

    #[tokio::test]
    async fn ingest_rejects_inconsistent_embedding_length() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(marker_provider().with_embed(|text, _| {
            if text.contains("longo") {
                Ok(vec![1.0, 0.0, 0.0])
            } else {
                Ok(vec![1.0, 0.0])
            }
        }));
        let oracle = fast_oracle(provider);
        let mut store = DocumentStore::new(dir.path().join("documents.json"));

        let result = store
            .ingest(&oracle, vec![raw("a.pdf", "curto"), raw("b.pdf", "longo")], no_delay())
            .await;
        assert!(matches!(result, Err(StoreError::DimensionMismatch { expected: 2, actual: 3 })));
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ingest_pauses_between_batches_only() {
        let delay = Duration::from_secs(1);
        let options = IngestOptions {
            batch_size: 2,
            batch_delay: delay,
        };

        for (count, pauses) in [(1u32, 0u32), (2, 0), (3, 1), (4, 1), (5, 2)] {
            let dir = tempfile::tempdir().unwrap();
            let oracle = fast_oracle(Arc::new(marker_provider()));
            let mut store = DocumentStore::new(dir.path().join("documents.json"));
            let inputs = (0..count).map(|i| raw(&format!("{}.pdf", i), "contrato")).collect();

            let started = tokio::time::Instant::now();
            let added = store.ingest(&oracle, inputs, options).await.unwrap();
            let elapsed = started.elapsed();

            assert_eq!(added, count as usize);
            assert!(elapsed >= delay * pauses, "{} documents: {:?}", count, elapsed);
            assert!(elapsed < delay * (pauses + 1), "{} documents: {:?}", count, elapsed);
        }
    }
}
