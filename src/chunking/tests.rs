use super::*;

#[test]
fn default_config() {
    assert_eq!(ChunkingConfig::default().max_chunk_size, 500);
}

#[test]
fn strategy_selection() {
    let grammars = GrammarCache::new();

    assert!(ChunkingStrategy::select(&grammars, Some("typescript")).is_structural());
    assert!(!ChunkingStrategy::select(&grammars, Some("plaintext")).is_structural());
    assert!(!ChunkingStrategy::select(&grammars, Some("csharp")).is_structural());
    assert!(!ChunkingStrategy::select(&grammars, None).is_structural());
}

#[test]
fn structural_document_chunking() {
    let grammars = GrammarCache::new();
    let config = ChunkingConfig::default();
    let source = "def a():\n    return 1\n\n\ndef b():\n    return 2\n";

    let chunks = chunk_document(source, Some("python"), &grammars, &config);
    assert_eq!(
        chunks,
        vec![
            "def a():\n    return 1".to_string(),
            "def b():\n    return 2".to_string()
        ]
    );
}

#[test]
fn unsupported_language_uses_lines() {
    let grammars = GrammarCache::new();
    let config = ChunkingConfig { max_chunk_size: 12 };
    let text = "first line\nsecond line\nthird line";

    let chunks = chunk_document(text, Some("plaintext"), &grammars, &config);
    assert_eq!(chunks, chunk_lines(text, 12));
    assert_eq!(chunks.len(), 3);
}

#[test]
fn empty_structural_result_falls_back() {
    let grammars = GrammarCache::new();
    let strategy = ChunkingStrategy::select(&grammars, Some("javascript"));
    assert!(strategy.is_structural());

    // Whitespace parses to an empty program, so the line chunker takes over
    let chunks = strategy.chunk("   \n", 500);
    assert_eq!(chunks, vec!["   \n".to_string()]);
}

#[test]
fn text_length_counts_characters() {
    assert_eq!(text_len("abc"), 3);
    assert_eq!(text_len("héllo"), 5);
    assert_eq!(text_len(""), 0);
}
