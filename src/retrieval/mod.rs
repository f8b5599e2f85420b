// Retrieval module
// Public facade: index documents, search them and maintain the index


use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::RagError;
use crate::config::{Config, IndexingOptions};
use crate::database::{LanceRecordStore, Predicate, Record, SearchResult, VectorRecordStore};
use crate::embeddings::{EmbeddingGateway, OllamaClient};
use crate::indexer::{
    AddDocumentResult, FolderIndexReport, IndexingPipeline, IndexingValidation,
    get_files_to_index, validate_indexing_operation,
};
use crate::languages::GrammarCache;

/// A file present in the index with its number of chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFile {
    pub filepath: String,
    pub chunk_count: usize,
}

/// A stored chunk without its embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChunk {
    pub id: String,
    pub text: String,
    pub filepath: String,
}

impl From<Record> for FileChunk {
    #[inline]
    fn from(record: Record) -> Self {
        Self {
            id: record.id,
            text: record.text,
            filepath: record.filepath,
        }
    }
}

/// Semantic code retrieval over a vector store.
///
/// The placeholder record that creates the store table never appears in
/// listings, counts, search results or bulk deletes.
#[derive(Clone)]
pub struct CodeRetrieval {
    store: Arc<dyn VectorRecordStore>,
    embedder: Arc<dyn EmbeddingGateway>,
    pipeline: IndexingPipeline,
    indexing: IndexingOptions,
}

impl CodeRetrieval {
    #[inline]
    pub fn new(
        store: Arc<dyn VectorRecordStore>,
        embedder: Arc<dyn EmbeddingGateway>,
        config: &Config,
    ) -> Self {
        let pipeline = IndexingPipeline::new(
            store.clone(),
            embedder.clone(),
            Arc::new(GrammarCache::new()),
            config.chunking.clone(),
        );

        Self {
            store,
            embedder,
            pipeline,
            indexing: config.indexing.clone(),
        }
    }

    /// Open the LanceDB store for `workspace` and connect to Ollama
    #[inline]
    pub async fn open(config: &Config, workspace: &Path) -> Result<Self, RagError> {
        let db_path = config
            .vector_database_path(workspace)
            .map_err(|e| RagError::Config(e.to_string()))?;
        info!("Opening vector database at {}", db_path.display());

        let store = LanceRecordStore::open(&db_path, config.embedding.dimension).await?;
        let embedder = OllamaClient::new(&config.embedding)?;

        Ok(Self::new(Arc::new(store), Arc::new(embedder), config))
    }

    #[inline]
    #[must_use]
    pub fn indexing_options(&self) -> &IndexingOptions {
        &self.indexing
    }

    #[inline]
    pub async fn add_document(
        &self,
        text: &str,
        filepath: &str,
        language_id: Option<&str>,
    ) -> Result<AddDocumentResult, RagError> {
        self.pipeline
            .add_document(text, filepath, language_id)
            .await
    }

    #[inline]
    pub async fn index_file(&self, path: &Path) -> Result<AddDocumentResult, RagError> {
        self.pipeline.index_file(path).await
    }

    /// Index a folder with the configured indexing options
    #[inline]
    pub async fn index_folder<F>(
        &self,
        root: &Path,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<FolderIndexReport, RagError>
    where
        F: FnMut(usize, usize, &Path),
    {
        self.pipeline
            .index_folder(root, &self.indexing, cancel, on_progress)
            .await
    }

    /// Index an already scanned list of files
    #[inline]
    pub async fn index_files<F>(
        &self,
        files: &[PathBuf],
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<FolderIndexReport, RagError>
    where
        F: FnMut(usize, usize, &Path),
    {
        self.pipeline.index_files(files, cancel, on_progress).await
    }

    /// Records most similar to `query`, closest first, at most `limit`
    #[inline]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, RagError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        // One extra in case the placeholder is among the neighbours
        let mut results: Vec<SearchResult> = self
            .store
            .query(&vector, limit + 1)
            .await?
            .into_iter()
            .filter(|result| !result.record.is_sentinel())
            .collect();
        results.truncate(limit);

        debug!("Search for {:?} returned {} results", query, results.len());
        Ok(results)
    }

    /// Indexed files with their chunk counts, sorted by path. Empty when the
    /// store cannot be read.
    #[inline]
    pub async fn get_all_indexed_files(&self) -> Vec<IndexedFile> {
        match self.user_records().await {
            Ok(records) => records
                .into_iter()
                .map(|record| record.filepath)
                .counts()
                .into_iter()
                .map(|(filepath, chunk_count)| IndexedFile {
                    filepath,
                    chunk_count,
                })
                .sorted_by(|a, b| a.filepath.cmp(&b.filepath))
                .collect(),
            Err(e) => {
                warn!("Failed to list indexed files: {}", e);
                Vec::new()
            }
        }
    }

    #[inline]
    pub async fn get_file_chunks(&self, filepath: &str) -> Result<Vec<FileChunk>, RagError> {
        Ok(self
            .get_file_chunks_with_vectors(filepath)
            .await?
            .into_iter()
            .map(FileChunk::from)
            .collect())
    }

    #[inline]
    pub async fn get_file_chunks_with_vectors(
        &self,
        filepath: &str,
    ) -> Result<Vec<Record>, RagError> {
        Ok(self
            .user_records()
            .await?
            .into_iter()
            .filter(|record| record.filepath == filepath)
            .collect())
    }

    /// Number of indexed chunks. Zero when the store cannot be read.
    #[inline]
    pub async fn count_records(&self) -> usize {
        match self.user_records().await {
            Ok(records) => records.len(),
            Err(e) => {
                warn!("Failed to count records: {}", e);
                0
            }
        }
    }

    /// Delete every indexed chunk, one record at a time.
    ///
    /// Not atomic: a failure part way leaves the remaining records in place.
    #[inline]
    pub async fn clear_all_indexes(&self) -> Result<usize, RagError> {
        let records = self.user_records().await.inspect_err(|e| {
            error!("Failed to read records for clearing: {}", e);
        })?;

        let mut deleted = 0;
        for record in records {
            self.delete_logged(&Predicate::IdEquals(record.id)).await?;
            deleted += 1;
        }

        info!("Cleared {} records from the index", deleted);
        self.optimize_logged().await;
        Ok(deleted)
    }

    #[inline]
    pub async fn delete_file_index(&self, filepath: &str) -> Result<(), RagError> {
        self.delete_logged(&Predicate::FilepathEquals(filepath.to_string()))
            .await?;
        info!("Deleted index for {}", filepath);
        Ok(())
    }

    /// Delete chunks of files directly inside `folder_path`. Files in
    /// subfolders are kept. Returns the number of records deleted.
    #[inline]
    pub async fn delete_folder_index(&self, folder_path: &str) -> Result<usize, RagError> {
        let records = self.user_records().await.inspect_err(|e| {
            error!("Failed to read records for {}: {}", folder_path, e);
        })?;

        let mut deleted = 0;
        for record in records
            .into_iter()
            .filter(|record| parent_dir(&record.filepath) == folder_path)
        {
            self.delete_logged(&Predicate::IdEquals(record.id)).await?;
            deleted += 1;
        }

        info!("Deleted {} records under {}", deleted, folder_path);
        self.optimize_logged().await;
        Ok(deleted)
    }

    /// Files under `root` that would be indexed with the configured options
    #[inline]
    pub fn get_files_to_index(&self, root: &Path) -> Result<Vec<PathBuf>, RagError> {
        get_files_to_index(root, &self.indexing)
    }

    #[inline]
    pub fn validate_indexing_operation(&self, root: &Path) -> Result<IndexingValidation, RagError> {
        validate_indexing_operation(root, &self.indexing)
    }

    async fn user_records(&self) -> Result<Vec<Record>, RagError> {
        Ok(self
            .store
            .scan()
            .await?
            .into_iter()
            .filter(|record| !record.is_sentinel())
            .collect())
    }

    async fn delete_logged(&self, predicate: &Predicate) -> Result<(), RagError> {
        self.store.delete(predicate).await.inspect_err(|e| {
            error!("Failed to delete records where {}: {}", predicate, e);
        })
    }

    async fn optimize_logged(&self) {
        if let Err(e) = self.store.optimize().await {
            warn!("Failed to optimize vector database: {}", e);
        }
    }
}

/// Directory part of a stored filepath, as a string
fn parent_dir(filepath: &str) -> String {
    Path::new(filepath)
        .parent()
        .map(|parent| parent.to_string_lossy().into_owned())
        .unwrap_or_default()
}
