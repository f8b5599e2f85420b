use anyhow::{Context, Result};
use console::style;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::embeddings::OllamaClient;
use crate::indexer::validate_indexing_operation;
use crate::retrieval::CodeRetrieval;

/// Lines of chunk text shown per search result
const PREVIEW_LINES: usize = 6;
/// Vector components shown per chunk
const VECTOR_PREVIEW: usize = 4;

async fn open_retrieval(config: &Config, workspace: &Path) -> Result<CodeRetrieval> {
    CodeRetrieval::open(config, workspace)
        .await
        .context("Failed to open the code index")
}

/// Absolute form of a user-supplied path, canonical when it exists
fn resolve_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn preview(text: &str) -> String {
    let mut lines: Vec<&str> = text.trim_end().lines().take(PREVIEW_LINES + 1).collect();
    let truncated = lines.len() > PREVIEW_LINES;
    lines.truncate(PREVIEW_LINES);

    let mut preview = lines
        .iter()
        .map(|line| format!("   │ {}", line))
        .collect::<Vec<_>>()
        .join("\n");
    if truncated {
        preview.push_str("\n   │ ...");
    }
    preview
}

/// Index every qualifying file in a folder
#[inline]
pub async fn index_folder(config: &Config, workspace: &Path, folder: &Path) -> Result<()> {
    let folder = resolve_path(folder);

    let validation = validate_indexing_operation(&folder, &config.indexing)
        .context("Failed to scan folder")?;
    if !validation.valid {
        println!("{} {}", style("✗").red(), validation.message);
        return Ok(());
    }
    println!("{}", style(&validation.message).cyan());

    let retrieval = open_retrieval(config, workspace).await?;

    let bar = ProgressBar::new(validation.file_count as u64).with_style(
        ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_bar} {msg}")
            .context("Invalid progress template")?,
    );

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    let signal_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt signal, stopping after the current file");
            signal_token.cancel();
        }
    });

    let result = retrieval
        .index_files(&validation.files, &cancel, |done, total, path| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
            bar.set_message(
                path.strip_prefix(&folder)
                    .unwrap_or(path)
                    .display()
                    .to_string(),
            );
        })
        .await;

    signal_handle.abort();
    bar.finish_and_clear();
    let report = result.context("Failed to index folder")?;

    if report.cancelled {
        println!(
            "{}",
            style("📴 Indexing cancelled, files indexed so far were kept").yellow()
        );
    }
    println!(
        "{} Indexed {} of {} files, {} chunks created",
        style("✓").green(),
        report.files_indexed,
        report.files_total,
        report.chunks_created
    );
    if report.files_failed > 0 {
        println!(
            "{} {} files failed to index (see logs for details)",
            style("⚠").yellow(),
            report.files_failed
        );
    }

    Ok(())
}

/// Index a single file
#[inline]
pub async fn add_file(config: &Config, workspace: &Path, file: &Path) -> Result<()> {
    let file = resolve_path(file);
    let retrieval = open_retrieval(config, workspace).await?;

    let result = retrieval
        .index_file(&file)
        .await
        .with_context(|| format!("Failed to index {}", file.display()))?;

    println!(
        "{} Indexed {} ({} chunks)",
        style("✓").green(),
        style(file.display()).cyan(),
        result.chunks_created
    );
    Ok(())
}

/// Search the index and print the closest chunks
#[inline]
pub async fn search(config: &Config, workspace: &Path, query: &str, limit: usize) -> Result<()> {
    let retrieval = open_retrieval(config, workspace).await?;
    let results = retrieval
        .search(query, limit)
        .await
        .context("Search failed")?;

    if results.is_empty() {
        println!("No results. Use 'code-rag index <folder>' to index some code first.");
        return Ok(());
    }

    println!(
        "{}",
        style(format!("🔍 {} results for \"{}\"", results.len(), query)).bold()
    );
    println!();

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. {} {}",
            rank + 1,
            style(&result.record.filepath).cyan(),
            style(format!("(distance {:.4})", result.distance)).dim()
        );
        println!("{}", preview(&result.record.text));
        println!();
    }

    Ok(())
}

/// List indexed files with their chunk counts
#[inline]
pub async fn list_files(config: &Config, workspace: &Path) -> Result<()> {
    let retrieval = open_retrieval(config, workspace).await?;
    let files = retrieval.get_all_indexed_files().await;

    if files.is_empty() {
        println!("No files have been indexed yet.");
        println!("Use 'code-rag index <folder>' to index a folder.");
        return Ok(());
    }

    println!("Indexed Files ({} total):", files.len());
    println!();
    for file in &files {
        println!("  {} ({} chunks)", file.filepath, file.chunk_count);
    }

    let total_chunks: usize = files.iter().map(|f| f.chunk_count).sum();
    println!();
    println!("Total chunks: {}", total_chunks);
    Ok(())
}

/// Print the stored chunks of one file
#[inline]
pub async fn show_chunks(
    config: &Config,
    workspace: &Path,
    file: &Path,
    with_vectors: bool,
) -> Result<()> {
    let file = resolve_path(file);
    let filepath = file.to_string_lossy();
    let retrieval = open_retrieval(config, workspace).await?;

    let chunks = retrieval
        .get_file_chunks_with_vectors(&filepath)
        .await
        .context("Failed to read chunks")?;

    if chunks.is_empty() {
        println!("No chunks indexed for {}", filepath);
        return Ok(());
    }

    println!(
        "{}",
        style(format!("{} chunks for {}", chunks.len(), filepath)).bold()
    );
    for (index, chunk) in chunks.iter().enumerate() {
        println!();
        println!(
            "{} {}",
            style(format!("#{}", index + 1)).yellow(),
            style(&chunk.id).dim()
        );
        if with_vectors {
            let head: Vec<String> = chunk
                .vector
                .iter()
                .take(VECTOR_PREVIEW)
                .map(|v| format!("{:.4}", v))
                .collect();
            println!(
                "   vector[{}]: [{}, ...]",
                chunk.vector.len(),
                head.join(", ")
            );
        }
        println!("{}", preview(&chunk.text));
    }

    Ok(())
}

/// Remove one file from the index
#[inline]
pub async fn delete_file(config: &Config, workspace: &Path, file: &Path) -> Result<()> {
    let file = resolve_path(file);
    let retrieval = open_retrieval(config, workspace).await?;

    retrieval
        .delete_file_index(&file.to_string_lossy())
        .await
        .context("Failed to delete file index")?;

    println!(
        "{} Removed {} from the index",
        style("✓").green(),
        file.display()
    );
    Ok(())
}

/// Remove the files directly inside a folder from the index
#[inline]
pub async fn delete_folder(config: &Config, workspace: &Path, folder: &Path) -> Result<()> {
    let folder = resolve_path(folder);
    let retrieval = open_retrieval(config, workspace).await?;

    let deleted = retrieval
        .delete_folder_index(&folder.to_string_lossy())
        .await
        .context("Failed to delete folder index")?;

    println!(
        "{} Removed {} chunks from {} (subfolders are not included)",
        style("✓").green(),
        deleted,
        folder.display()
    );
    Ok(())
}

/// Remove every indexed chunk
#[inline]
pub async fn clear(config: &Config, workspace: &Path) -> Result<()> {
    let retrieval = open_retrieval(config, workspace).await?;

    let deleted = retrieval
        .clear_all_indexes()
        .await
        .context("Failed to clear the index")?;

    println!("{} Cleared {} chunks", style("✓").green(), deleted);
    Ok(())
}

/// Report whether a folder can be indexed with the current options
#[inline]
pub fn validate_folder(config: &Config, folder: &Path) -> Result<()> {
    let folder = resolve_path(folder);
    let validation = validate_indexing_operation(&folder, &config.indexing)
        .context("Failed to scan folder")?;

    if validation.valid {
        println!("{} {}", style("✓").green(), validation.message);
    } else {
        println!("{} {}", style("✗").red(), validation.message);
    }
    Ok(())
}

/// Show index and embedding service status
#[inline]
pub async fn show_status(config: &Config, workspace: &Path) -> Result<()> {
    println!("📊 Code RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🔍 Vector Database Status:");
    match config.vector_database_path(workspace) {
        Ok(path) => {
            println!("   📁 Location: {}", path.display());
            println!("   🗂️  Scope: {}", config.storage_scope);
        }
        Err(e) => println!("   ❌ Location unavailable - {}", e),
    }
    match open_retrieval(config, workspace).await {
        Ok(retrieval) => {
            let files = retrieval.get_all_indexed_files().await;
            println!("   ✅ LanceDB: Connected");
            println!("   📄 Indexed Files: {}", files.len());
            println!("   🧩 Chunks: {}", retrieval.count_records().await);
        }
        Err(e) => println!("   ❌ LanceDB: Failed to open - {:#}", e),
    }
    println!();

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.embedding) {
        Ok(client) => {
            let health = tokio::task::spawn_blocking(move || client.health_check())
                .await
                .context("Health check task failed")?;
            match health {
                Ok(()) => println!("   ✅ Ollama: Connected"),
                Err(e) => {
                    warn!("Ollama health check failed: {:#}", e);
                    println!("   ⚠️  Ollama: Unavailable - {:#}", e);
                }
            }
        }
        Err(e) => println!("   ❌ Ollama: Invalid configuration - {:#}", e),
    }
    println!("   📋 Model: {}", config.embedding.model);
    println!("   🔢 Dimension: {}", config.embedding.dimension);

    Ok(())
}

/// Print the effective configuration
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", style("📋 Current Configuration").bold().cyan());
    println!();

    println!("Storage scope: {}", style(config.storage_scope).cyan());
    println!();

    println!("{}", style("Embedding Settings:").bold().yellow());
    match config.ollama_url() {
        Ok(url) => println!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => println!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }
    println!("  Model: {}", style(&config.embedding.model).cyan());
    println!("  Dimension: {}", style(config.embedding.dimension).cyan());
    println!(
        "  Timeout: {}",
        style(format!("{}s", config.embedding.timeout_seconds)).cyan()
    );
    println!(
        "  Retry Attempts: {}",
        style(config.embedding.retry_attempts).cyan()
    );
    println!();

    println!("{}", style("Indexing Settings:").bold().yellow());
    println!(
        "  Max File Size: {}",
        style(HumanBytes(config.indexing.max_file_size)).cyan()
    );
    println!("  Max Files: {}", style(config.indexing.max_files).cyan());
    println!(
        "  Include Extensions: {}",
        style(config.indexing.include_extensions.join(" ")).cyan()
    );
    println!("  Exclude Patterns:");
    for pattern in &config.indexing.exclude_patterns {
        println!("    {}", style(pattern).dim());
    }
    println!();

    println!("{}", style("Chunking Settings:").bold().yellow());
    println!(
        "  Max Chunk Size: {} characters",
        style(config.chunking.max_chunk_size).cyan()
    );
    println!();

    println!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    Ok(())
}

/// Write the effective configuration to the config file
#[inline]
pub fn save_config(config: &Config) -> Result<()> {
    config.save().context("Failed to save configuration")?;
    println!(
        "{} Configuration saved to {}",
        style("✓").green(),
        style(config.config_file_path().display()).cyan()
    );
    println!("Edit the file to change settings, then run 'code-rag config --show'.");
    Ok(())
}
