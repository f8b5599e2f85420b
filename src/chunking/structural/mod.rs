#[cfg(test)]
mod tests;

use tracing::debug;
use tree_sitter::Node;

use super::text_len;
use crate::RagError;
use crate::languages::Grammar;

/// Parse `source` with `grammar` and split the resulting tree into chunks
#[inline]
pub fn chunk_source(
    source: &str,
    grammar: &Grammar,
    max_size: usize,
) -> Result<Vec<String>, RagError> {
    let mut parser = grammar.parser()?;
    let tree = parser.parse(source, None).ok_or_else(|| {
        RagError::Parse(format!("{} parser produced no tree", grammar.language()))
    })?;

    let chunks = chunk_tree(tree.root_node(), source, grammar, max_size);
    debug!(
        "Structural chunking ({}) produced {} chunks",
        grammar.language(),
        chunks.len()
    );
    Ok(chunks)
}

/// Depth-first walk over `root`, in source order.
///
/// Block nodes that fit within `max_size` are emitted whole and not descended
/// into. Any other node with children is decomposed. Leaves are emitted when
/// they contain non-whitespace text, whatever their size.
#[inline]
#[must_use]
pub fn chunk_tree(root: Node<'_>, source: &str, grammar: &Grammar, max_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut cursor = root.walk();

    loop {
        let node = cursor.node();
        let text = source.get(node.byte_range()).unwrap_or_default();

        let descend = if grammar.is_block(node.kind()) && text_len(text) <= max_size {
            chunks.push(text.to_string());
            false
        } else if node.child_count() > 0 {
            true
        } else {
            if !text.trim().is_empty() {
                chunks.push(text.to_string());
            }
            false
        };

        if descend && cursor.goto_first_child() {
            continue;
        }

        // Advance to the next sibling, climbing until one exists
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return chunks;
            }
        }
    }
}
