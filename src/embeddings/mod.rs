// Embeddings module
// Text -> fixed-length vector, behind a narrow gateway trait

#[cfg(test)]
pub(crate) mod fake;
pub mod ollama;

use async_trait::async_trait;

use crate::RagError;

pub use ollama::OllamaClient;

/// Converts text into a vector of exactly [`EmbeddingGateway::dimension`] floats
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    fn dimension(&self) -> usize;
}
