// Indexer module
// Turns documents and folders into embedded records in the vector store


pub mod scanner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::RagError;
use crate::chunking::{ChunkingConfig, ChunkingStrategy};
use crate::config::IndexingOptions;
use crate::database::{Record, VectorRecordStore};
use crate::embeddings::EmbeddingGateway;
use crate::languages::{GrammarCache, language_id_for_path};

pub use scanner::{IndexingValidation, get_files_to_index, validate_indexing_operation};

/// Outcome of indexing a single document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddDocumentResult {
    pub chunks_created: usize,
}

/// Outcome of indexing a folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderIndexReport {
    /// Files selected by the scanner
    pub files_total: usize,
    pub files_indexed: usize,
    /// Files that could not be read or indexed
    pub files_failed: usize,
    pub chunks_created: usize,
    /// Set when the cancellation token stopped the run early
    pub cancelled: bool,
}

/// Chunk, embed and store pipeline for documents.
///
/// Chunks of one document are embedded one at a time and committed with a
/// single store insert. There is no deduplication: indexing the same file
/// twice stores two full sets of records.
#[derive(Clone)]
pub struct IndexingPipeline {
    store: Arc<dyn VectorRecordStore>,
    embedder: Arc<dyn EmbeddingGateway>,
    grammars: Arc<GrammarCache>,
    chunking: ChunkingConfig,
}

impl IndexingPipeline {
    #[inline]
    pub fn new(
        store: Arc<dyn VectorRecordStore>,
        embedder: Arc<dyn EmbeddingGateway>,
        grammars: Arc<GrammarCache>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            grammars,
            chunking,
        }
    }

    #[inline]
    #[must_use]
    pub fn chunking_config(&self) -> &ChunkingConfig {
        &self.chunking
    }

    /// Chunk `text`, embed every non-blank chunk and store the records
    #[inline]
    pub async fn add_document(
        &self,
        text: &str,
        filepath: &str,
        language_id: Option<&str>,
    ) -> Result<AddDocumentResult, RagError> {
        if text.trim().is_empty() {
            debug!("Skipping empty document {}", filepath);
            return Ok(AddDocumentResult::default());
        }

        let strategy = ChunkingStrategy::select(&self.grammars, language_id);
        let chunks = strategy.chunk(text, self.chunking.max_chunk_size);
        debug!(
            "Split {} into {} chunks ({})",
            filepath,
            chunks.len(),
            if strategy.is_structural() {
                "structural"
            } else {
                "line-based"
            }
        );

        let dimension = self.store.dimension();
        let mut records = Vec::with_capacity(chunks.len());

        for chunk in chunks.into_iter().filter(|c| !c.trim().is_empty()) {
            let vector = self.embedder.embed(&chunk).await?;
            if vector.len() != dimension {
                return Err(RagError::Embedding(format!(
                    "Embedding has {} dimensions, store expects {}",
                    vector.len(),
                    dimension
                )));
            }

            records.push(Record {
                id: Uuid::new_v4().to_string(),
                vector,
                text: chunk,
                filepath: filepath.to_string(),
            });
        }

        let chunks_created = records.len();
        if !records.is_empty() {
            self.store.add(records).await?;
        }

        debug!("Indexed {} chunks from {}", chunks_created, filepath);
        Ok(AddDocumentResult { chunks_created })
    }

    /// Read a file and index it under its path, detecting the language from
    /// the extension
    #[inline]
    pub async fn index_file(&self, path: &Path) -> Result<AddDocumentResult, RagError> {
        let text = tokio::fs::read_to_string(path).await?;
        let language_id = language_id_for_path(path);
        self.add_document(&text, &path.to_string_lossy(), Some(language_id))
            .await
    }

    /// Index every qualifying file under `root`, one file at a time.
    ///
    /// See [`IndexingPipeline::index_files`] for cancellation, failure and
    /// progress behaviour.
    #[inline]
    pub async fn index_folder<F>(
        &self,
        root: &Path,
        options: &IndexingOptions,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<FolderIndexReport, RagError>
    where
        F: FnMut(usize, usize, &Path),
    {
        let scan_root = root.to_path_buf();
        let scan_options = options.clone();
        let files =
            tokio::task::spawn_blocking(move || get_files_to_index(&scan_root, &scan_options))
                .await
                .map_err(|e| RagError::Other(anyhow::anyhow!("Folder scan task failed: {}", e)))??;

        info!("Indexing {} files under {}", files.len(), root.display());
        self.index_files(&files, cancel, on_progress).await
    }

    /// Index `files` in order, one file at a time.
    ///
    /// `cancel` is checked between files; files already committed stay in
    /// the store. Per-file failures are counted and do not stop the run.
    /// `on_progress` receives the number of files processed, the total and
    /// the file just processed. The store is compacted once at the end when
    /// anything was written.
    #[inline]
    pub async fn index_files<F>(
        &self,
        files: &[PathBuf],
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<FolderIndexReport, RagError>
    where
        F: FnMut(usize, usize, &Path),
    {
        let mut report = FolderIndexReport {
            files_total: files.len(),
            ..FolderIndexReport::default()
        };

        for (index, path) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(
                    "Indexing cancelled after {} of {} files",
                    index, report.files_total
                );
                report.cancelled = true;
                break;
            }

            match self.index_file(path).await {
                Ok(result) => {
                    report.files_indexed += 1;
                    report.chunks_created += result.chunks_created;
                }
                Err(e) => {
                    error!("Failed to index {}: {}", path.display(), e);
                    report.files_failed += 1;
                }
            }

            on_progress(index + 1, report.files_total, path);
        }

        if report.chunks_created > 0 {
            if let Err(e) = self.store.optimize().await {
                warn!("Failed to optimize vector database: {}", e);
            }
        }

        info!(
            "Indexed {} files ({} failed), created {} chunks",
            report.files_indexed, report.files_failed, report.chunks_created
        );
        Ok(report)
    }
}
