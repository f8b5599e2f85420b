// Chunking module
// Splits documents into embedding-sized pieces, structurally when a grammar exists

#[cfg(test)]
mod tests;

pub mod line;
pub mod structural;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::languages::{Grammar, GrammarCache};

pub use line::chunk_lines;
pub use structural::{chunk_source, chunk_tree};

pub const DEFAULT_MAX_CHUNK_SIZE: usize = 500;

/// Configuration for content chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Size budget in characters for a single chunk
    pub max_chunk_size: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

/// How a document is split, chosen once per document
#[derive(Debug, Clone)]
pub enum ChunkingStrategy {
    Structural(Grammar),
    LineBased,
}

impl ChunkingStrategy {
    /// Pick the strategy for a language id. Missing ids, unsupported ids and
    /// grammars that fail to load all select line-based chunking.
    #[inline]
    pub fn select(grammars: &GrammarCache, language_id: Option<&str>) -> Self {
        language_id
            .and_then(|id| grammars.grammar(id))
            .map_or(Self::LineBased, Self::Structural)
    }

    /// Split `text`, falling back to line chunking when structural chunking
    /// fails or yields nothing
    #[inline]
    #[must_use]
    pub fn chunk(&self, text: &str, max_size: usize) -> Vec<String> {
        match self {
            Self::Structural(grammar) => match chunk_source(text, grammar, max_size) {
                Ok(chunks) if !chunks.is_empty() => chunks,
                Ok(_) => {
                    debug!(
                        "Structural chunking ({}) produced no chunks, using line chunking",
                        grammar.language()
                    );
                    chunk_lines(text, max_size)
                }
                Err(e) => {
                    warn!(
                        "Structural chunking ({}) failed, using line chunking: {}",
                        grammar.language(),
                        e
                    );
                    chunk_lines(text, max_size)
                }
            },
            Self::LineBased => chunk_lines(text, max_size),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }
}

/// Chunk a document for the given language id
#[inline]
pub fn chunk_document(
    text: &str,
    language_id: Option<&str>,
    grammars: &GrammarCache,
    config: &ChunkingConfig,
) -> Vec<String> {
    ChunkingStrategy::select(grammars, language_id).chunk(text, config.max_chunk_size)
}

/// Chunk sizes are measured in characters
pub(crate) fn text_len(text: &str) -> usize {
    text.chars().count()
}
