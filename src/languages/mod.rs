// Language detection and tree-sitter grammar cache
// Maps file extensions to language ids and hands out per-call grammar handles


use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};
use tree_sitter::Parser;

use crate::RagError;

/// Language id used for files without a structural grammar
pub const PLAINTEXT_LANGUAGE_ID: &str = "plaintext";

/// Languages with a bundled tree-sitter grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    TypeScript,
    Tsx,
    JavaScript,
    Python,
    Rust,
    Go,
    Java,
    C,
    Cpp,
}

impl Language {
    /// Editor-style language identifier
    #[inline]
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Tsx => "typescriptreact",
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
        }
    }

    /// Resolve a language id to a grammar-backed language.
    /// `javascriptreact` shares the JavaScript grammar.
    #[inline]
    #[must_use]
    pub fn from_id(language_id: &str) -> Option<Self> {
        match language_id {
            "typescript" => Some(Self::TypeScript),
            "typescriptreact" => Some(Self::Tsx),
            "javascript" | "javascriptreact" => Some(Self::JavaScript),
            "python" => Some(Self::Python),
            "rust" => Some(Self::Rust),
            "go" => Some(Self::Go),
            "java" => Some(Self::Java),
            "c" => Some(Self::C),
            "cpp" => Some(Self::Cpp),
            _ => None,
        }
    }

    fn ts_language(self) -> tree_sitter::Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
            Self::Java => tree_sitter_java::LANGUAGE.into(),
            Self::C => tree_sitter_c::LANGUAGE.into(),
            Self::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        }
    }

    /// Node kinds that are emitted whole when they fit the chunk budget
    #[inline]
    #[must_use]
    pub const fn block_kinds(self) -> &'static [&'static str] {
        match self {
            Self::TypeScript | Self::Tsx => &[
                "function_declaration",
                "generator_function_declaration",
                "function_expression",
                "arrow_function",
                "method_definition",
                "class_declaration",
                "abstract_class_declaration",
                "interface_declaration",
            ],
            Self::JavaScript => &[
                "function_declaration",
                "generator_function_declaration",
                "function_expression",
                "arrow_function",
                "method_definition",
                "class_declaration",
            ],
            Self::Python => &[
                "function_definition",
                "class_definition",
                "decorated_definition",
            ],
            Self::Rust => &[
                "function_item",
                "impl_item",
                "trait_item",
                "struct_item",
                "enum_item",
            ],
            Self::Go => &[
                "function_declaration",
                "method_declaration",
                "type_declaration",
            ],
            Self::Java => &[
                "method_declaration",
                "constructor_declaration",
                "class_declaration",
                "interface_declaration",
                "enum_declaration",
            ],
            Self::C => &["function_definition", "struct_specifier"],
            Self::Cpp => &["function_definition", "class_specifier", "struct_specifier"],
        }
    }
}

impl std::fmt::Display for Language {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Map a file extension (with or without the leading dot) to a language id.
/// Unmapped extensions resolve to [`PLAINTEXT_LANGUAGE_ID`].
#[inline]
#[must_use]
pub fn language_id_for_extension(extension: &str) -> &'static str {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "py" | "pyi" => "python",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" => "kotlin",
        "md" => "markdown",
        "json" => "json",
        _ => PLAINTEXT_LANGUAGE_ID,
    }
}

/// Language id for a path, based on its extension
#[inline]
#[must_use]
pub fn language_id_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(PLAINTEXT_LANGUAGE_ID, language_id_for_extension)
}

/// A loaded grammar. Each chunking call builds its own parser from this handle,
/// so no parser state is shared between languages.
#[derive(Debug, Clone)]
pub struct Grammar {
    language: Language,
    ts_language: tree_sitter::Language,
}

impl Grammar {
    #[inline]
    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    /// Create a parser bound to this grammar
    #[inline]
    pub fn parser(&self) -> Result<Parser, RagError> {
        let mut parser = Parser::new();
        parser.set_language(&self.ts_language).map_err(|e| {
            RagError::Parse(format!(
                "Failed to set {} grammar on parser: {}",
                self.language, e
            ))
        })?;
        Ok(parser)
    }

    #[inline]
    #[must_use]
    pub fn is_block(&self, kind: &str) -> bool {
        self.language.block_kinds().contains(&kind)
    }
}

/// Process-wide cache of loaded grammars keyed by language
#[derive(Debug, Default)]
pub struct GrammarCache {
    grammars: Mutex<HashMap<Language, Grammar>>,
}

impl GrammarCache {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the grammar for `language_id` into the cache.
    /// Returns `false` for unsupported ids or grammars that fail to load.
    #[inline]
    pub fn load_language(&self, language_id: &str) -> bool {
        self.grammar(language_id).is_some()
    }

    /// Get the grammar for `language_id`, loading it on first use
    #[inline]
    pub fn grammar(&self, language_id: &str) -> Option<Grammar> {
        let Some(language) = Language::from_id(language_id) else {
            debug!("No grammar available for language id '{}'", language_id);
            return None;
        };

        let mut grammars = self
            .grammars
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(grammar) = grammars.get(&language) {
            return Some(grammar.clone());
        }

        let grammar = Grammar {
            language,
            ts_language: language.ts_language(),
        };

        // Probe the grammar so ABI mismatches surface here instead of mid-index
        if let Err(e) = grammar.parser() {
            warn!("Failed to load grammar for {}: {}", language, e);
            return None;
        }

        info!("Loaded {} grammar", language);
        grammars.insert(language, grammar.clone());
        Some(grammar)
    }
}
