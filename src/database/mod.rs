// Database module
// Record model and the vector store contract; LanceDB provides the implementation

#[cfg(test)]
mod tests;

pub mod lancedb;
#[cfg(test)]
pub(crate) mod tracking;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::RagError;

pub use self::lancedb::LanceRecordStore;

/// Id of the placeholder record that forces table creation
pub const SENTINEL_ID: &str = "0";
/// Filepath of the placeholder record
pub const SENTINEL_FILEPATH: &str = "init";
/// Default embedding dimension (all-minilm)
pub const DEFAULT_VECTOR_DIMENSION: usize = 384;

/// A persisted chunk with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier for this record
    pub id: String,
    /// The embedding, always the store's dimension long
    pub vector: Vec<f32>,
    /// The chunk text
    pub text: String,
    /// Path of the file the chunk came from
    pub filepath: String,
}

impl Record {
    /// The placeholder record: id "0", filepath and text "init", zero vector
    #[inline]
    #[must_use]
    pub fn sentinel(dimension: usize) -> Self {
        Self {
            id: SENTINEL_ID.to_string(),
            vector: vec![0.0; dimension],
            text: SENTINEL_FILEPATH.to_string(),
            filepath: SENTINEL_FILEPATH.to_string(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.id == SENTINEL_ID
    }
}

/// Result from a similarity search, closest first
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub record: Record,
    pub distance: f32,
}

/// Equality filters accepted by [`VectorRecordStore::delete`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    IdEquals(String),
    FilepathEquals(String),
}

impl Predicate {
    /// Render as a quote-delimited filter expression
    #[inline]
    #[must_use]
    pub fn to_filter(&self) -> String {
        match self {
            Self::IdEquals(id) => format!("id = '{}'", escape_literal(id)),
            Self::FilepathEquals(path) => format!("filepath = '{}'", escape_literal(path)),
        }
    }
}

impl std::fmt::Display for Predicate {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_filter())
    }
}

/// Escape a value for use inside a single-quoted filter literal
#[inline]
#[must_use]
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Persisted collection of records with similarity search.
///
/// Implementations serialize their own operations. There is no upsert:
/// adding a record never replaces an existing one.
#[async_trait]
pub trait VectorRecordStore: Send + Sync {
    /// Vector length every record must have
    fn dimension(&self) -> usize;

    /// Insert a batch of records in one operation
    async fn add(&self, records: Vec<Record>) -> Result<(), RagError>;

    /// Nearest neighbours of `vector`, closest first
    async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchResult>, RagError>;

    /// Every record in the store, sentinel included
    async fn scan(&self) -> Result<Vec<Record>, RagError>;

    /// Delete all records matching `predicate`
    async fn delete(&self, predicate: &Predicate) -> Result<(), RagError>;

    /// Number of records, sentinel included
    async fn count(&self) -> Result<usize, RagError>;

    /// Compact storage after bulk writes or deletes
    async fn optimize(&self) -> Result<(), RagError>;
}
