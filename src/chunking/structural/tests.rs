use super::*;
use crate::languages::GrammarCache;

fn grammar(language_id: &str) -> Grammar {
    GrammarCache::new()
        .grammar(language_id)
        .expect("grammar should load")
}

#[test]
fn small_function_is_single_chunk() {
    let source = "function foo(){ return 1; }";
    let chunks = chunk_source(source, &grammar("javascript"), 500).expect("should chunk");
    assert_eq!(chunks, vec![source.to_string()]);
}

#[test]
fn small_block_is_single_chunk_in_every_language() {
    let cases = [
        ("typescript", "function foo(): number { return 1; }"),
        ("typescriptreact", "class A { m() { return 1; } }"),
        ("javascript", "function foo(){ return 1; }"),
        ("python", "def f():\n    return 1"),
        ("rust", "fn f() -> i32 { 1 }"),
        ("go", "func f() int { return 1 }"),
        ("java", "class A { int f() { return 1; } }"),
        ("c", "int f(void) { return 1; }"),
        ("cpp", "int f() { return 1; }"),
    ];

    for (language_id, source) in cases {
        let chunks = chunk_source(source, &grammar(language_id), 500).expect("should chunk");
        assert_eq!(chunks, vec![source.to_string()], "language {}", language_id);
    }
}

#[test]
fn sibling_blocks_are_not_merged() {
    let source = "fn a() -> u32 {\n    1\n}\n\nfn b() -> u32 {\n    2\n}\n";
    let chunks = chunk_source(source, &grammar("rust"), 500).expect("should chunk");
    assert_eq!(
        chunks,
        vec![
            "fn a() -> u32 {\n    1\n}".to_string(),
            "fn b() -> u32 {\n    2\n}".to_string(),
        ]
    );
}

#[test]
fn oversized_class_is_decomposed() {
    let source = "class A:\n    def f(self):\n        return 1\n\n    def g(self):\n        return 2\n";
    let method_f = "def f(self):\n        return 1";
    let method_g = "def g(self):\n        return 2";

    let chunks = chunk_source(source, &grammar("python"), 40).expect("should chunk");

    assert_eq!(chunks.first().map(String::as_str), Some("class"));
    let pos_f = chunks.iter().position(|c| c == method_f);
    let pos_g = chunks.iter().position(|c| c == method_g);
    assert!(pos_f.is_some(), "missing method f in {:?}", chunks);
    assert!(pos_g.is_some(), "missing method g in {:?}", chunks);
    assert!(pos_f < pos_g);
    assert!(!chunks.iter().any(|c| c.starts_with("class A:")));
}

#[test]
fn class_within_budget_is_kept_whole() {
    let source = "class A:\n    def f(self):\n        return 1\n";
    let chunks = chunk_source(source, &grammar("python"), 500).expect("should chunk");
    assert_eq!(chunks, vec![source.trim_end().to_string()]);
}

#[test]
fn oversized_leaf_is_still_emitted() {
    let comment = format!("// {}", "x".repeat(100));
    let chunks = chunk_source(&comment, &grammar("javascript"), 10).expect("should chunk");
    assert_eq!(chunks, vec![comment]);
}

#[test]
fn non_block_nodes_are_split_in_source_order() {
    let source = "const a = 1;\nfunction f() {}\n";
    let chunks = chunk_source(source, &grammar("javascript"), 500).expect("should chunk");

    assert_eq!(chunks.first().map(String::as_str), Some("const"));
    assert_eq!(chunks.last().map(String::as_str), Some("function f() {}"));
    assert!(chunks.iter().all(|c| !c.trim().is_empty()));
}

#[test]
fn empty_source_yields_no_chunks() {
    let chunks = chunk_source("", &grammar("typescript"), 500).expect("should chunk");
    assert!(chunks.is_empty());
}

#[test]
fn chunking_is_deterministic() {
    let source = "package main\n\nfunc a() int { return 1 }\n\nfunc b() int { return 2 }\n";
    let go = grammar("go");
    let first = chunk_source(source, &go, 30).expect("should chunk");
    let second = chunk_source(source, &go, 30).expect("should chunk");
    assert_eq!(first, second);
    assert!(first.contains(&"func a() int { return 1 }".to_string()));
}
