
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern, PatternError};
use indicatif::HumanBytes;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::RagError;
use crate::config::IndexingOptions;

/// Number of files sampled when estimating the total index size
const SIZE_SAMPLE_LIMIT: usize = 100;

/// Pre-flight feasibility report for a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingValidation {
    pub valid: bool,
    pub message: String,
    /// Number of qualifying files found. The scan stops one past
    /// `max_files`, so when there are too many files this is a lower bound
    /// (`max_files + 1`) rather than the folder's true total.
    pub file_count: usize,
    /// The scanned files, in scan order
    pub files: Vec<PathBuf>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled exclude glob.
///
/// `**` matches any characters including separators (`**/` may also match
/// nothing), `*` matches any characters except a separator.
#[derive(Debug, Clone)]
pub struct ExcludePattern {
    pattern: Pattern,
    /// For `dir/**` patterns, matches the directory itself so the walk skips it
    directory: Option<Pattern>,
}

impl ExcludePattern {
    #[inline]
    pub fn new(pattern: &str) -> Result<Self, RagError> {
        let invalid =
            |e: PatternError| RagError::Config(format!("Invalid exclude pattern '{}': {}", pattern, e));

        let directory = pattern
            .strip_suffix("/**")
            .filter(|dir| !dir.is_empty())
            .map(Pattern::new)
            .transpose()
            .map_err(invalid)?;

        Ok(Self {
            pattern: Pattern::new(pattern).map_err(invalid)?,
            directory,
        })
    }

    #[inline]
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Match against a `/`-separated path relative to the scan root
    #[inline]
    #[must_use]
    pub fn is_match(&self, relative_path: &str) -> bool {
        self.pattern.matches_with(relative_path, MATCH_OPTIONS)
    }

    /// Whether everything under the directory at `relative_dir` is excluded
    #[inline]
    #[must_use]
    pub fn excludes_directory(&self, relative_dir: &str) -> bool {
        self.directory
            .as_ref()
            .is_some_and(|dir| dir.matches_with(relative_dir, MATCH_OPTIONS))
    }
}

/// Compiled scan policy for one root
struct ScanPolicy<'a> {
    root: &'a Path,
    options: &'a IndexingOptions,
    excludes: Vec<ExcludePattern>,
}

impl<'a> ScanPolicy<'a> {
    fn new(root: &'a Path, options: &'a IndexingOptions) -> Result<Self, RagError> {
        let excludes = options
            .exclude_patterns
            .iter()
            .map(|pattern| ExcludePattern::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            root,
            options,
            excludes,
        })
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn is_excluded(&self, relative_path: &str) -> bool {
        match self.excludes.iter().find(|p| p.is_match(relative_path)) {
            Some(pattern) => {
                debug!("Excluding {} (matches {})", relative_path, pattern.pattern());
                true
            }
            None => false,
        }
    }

    fn is_pruned_dir(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let relative_dir = self.relative_path(entry.path());
        self.excludes
            .iter()
            .any(|p| p.excludes_directory(&relative_dir))
    }

    fn within_size_limit(&self, entry: &DirEntry) -> bool {
        match entry.metadata() {
            Ok(metadata) => metadata.len() <= self.options.max_file_size,
            Err(e) => {
                debug!("Skipping {:?}, size unavailable: {}", entry.path(), e);
                false
            }
        }
    }

    /// Accept files extension by extension, in declaration order, until `limit`
    fn collect(&self, limit: usize) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for extension in &self.options.include_extensions {
            let walker = WalkDir::new(self.root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| !self.is_pruned_dir(entry));

            for entry in walker {
                if files.len() >= limit {
                    return files;
                }

                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        debug!("Skipping unreadable entry: {}", e);
                        continue;
                    }
                };

                if !entry.file_type().is_file()
                    || !entry.file_name().to_string_lossy().ends_with(extension.as_str())
                {
                    continue;
                }

                let path = entry.path();
                if self.is_excluded(&self.relative_path(path))
                    || !self.within_size_limit(&entry)
                    || files.iter().any(|f: &PathBuf| f == path)
                {
                    continue;
                }

                files.push(path.to_path_buf());
            }
        }

        files
    }
}

/// Files under `root` that qualify for indexing, at most `max_files`
#[inline]
pub fn get_files_to_index(root: &Path, options: &IndexingOptions) -> Result<Vec<PathBuf>, RagError> {
    let files = ScanPolicy::new(root, options)?.collect(options.max_files);
    debug!("Found {} files to index under {:?}", files.len(), root);
    Ok(files)
}

/// Check whether indexing `root` is feasible under `options`
#[inline]
pub fn validate_indexing_operation(
    root: &Path,
    options: &IndexingOptions,
) -> Result<IndexingValidation, RagError> {
    let files = ScanPolicy::new(root, options)?.collect(options.max_files.saturating_add(1));
    let file_count = files.len();

    if file_count == 0 {
        return Ok(IndexingValidation {
            valid: false,
            message: format!(
                "No files to index in {}. Check the include extensions ({}) and exclude patterns.",
                root.display(),
                options.include_extensions.join(", ")
            ),
            file_count,
            files,
        });
    }

    if file_count > options.max_files {
        return Ok(IndexingValidation {
            valid: false,
            message: format!(
                "Too many files to index (more than {}). Add exclude patterns to narrow the selection or raise the file limit.",
                options.max_files
            ),
            file_count,
            files,
        });
    }

    let sample: Vec<u64> = files
        .iter()
        .take(SIZE_SAMPLE_LIMIT)
        .filter_map(|path| std::fs::metadata(path).ok())
        .map(|metadata| metadata.len())
        .collect();
    let estimated_bytes = if sample.is_empty() {
        0
    } else {
        sample.iter().sum::<u64>() * file_count as u64 / sample.len() as u64
    };

    Ok(IndexingValidation {
        valid: true,
        message: format!(
            "Ready to index {} files (approximately {})",
            file_count,
            HumanBytes(estimated_bytes)
        ),
        file_count,
        files,
    })
}
