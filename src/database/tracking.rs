// Store wrapper for tests that records compaction requests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{LanceRecordStore, Predicate, Record, SearchResult, VectorRecordStore};
use crate::RagError;

/// Delegates to a LanceDB store and counts `optimize` calls
pub(crate) struct TrackingStore {
    inner: LanceRecordStore,
    optimize_calls: AtomicUsize,
    fail_optimize: AtomicBool,
}

impl TrackingStore {
    pub(crate) fn new(inner: LanceRecordStore) -> Self {
        Self {
            inner,
            optimize_calls: AtomicUsize::new(0),
            fail_optimize: AtomicBool::new(false),
        }
    }

    pub(crate) fn optimize_calls(&self) -> usize {
        self.optimize_calls.load(Ordering::SeqCst)
    }

    /// Make every following `optimize` call fail
    pub(crate) fn fail_optimize(&self) {
        self.fail_optimize.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VectorRecordStore for TrackingStore {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn add(&self, records: Vec<Record>) -> Result<(), RagError> {
        self.inner.add(records).await
    }

    async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchResult>, RagError> {
        self.inner.query(vector, limit).await
    }

    async fn scan(&self) -> Result<Vec<Record>, RagError> {
        self.inner.scan().await
    }

    async fn delete(&self, predicate: &Predicate) -> Result<(), RagError> {
        self.inner.delete(predicate).await
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.inner.count().await
    }

    async fn optimize(&self) -> Result<(), RagError> {
        self.optimize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_optimize.load(Ordering::SeqCst) {
            return Err(RagError::Database("compaction failed".to_string()));
        }
        self.inner.optimize().await
    }
}
