// Deterministic embedder for tests

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::EmbeddingGateway;
use crate::RagError;

/// Texts containing this marker fail to embed
pub(crate) const FAIL_MARKER: &str = "FAIL_EMBEDDING";

/// Bag-of-bytes embedder: similar texts get similar unit vectors
#[derive(Debug)]
pub(crate) struct FakeEmbedder {
    dimension: usize,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        for byte in text.bytes().filter(|b| !b.is_ascii_whitespace()) {
            vector[usize::from(byte) % self.dimension] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingGateway for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains(FAIL_MARKER) {
            return Err(RagError::Embedding("model unavailable".to_string()));
        }
        Ok(self.vector_for(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
