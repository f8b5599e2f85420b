use clap::{Parser, Subcommand};
use code_rag::commands::{
    add_file, clear, delete_file, delete_folder, index_folder, list_files, save_config, search,
    show_chunks, show_config, show_status, validate_folder,
};
use code_rag::config::{Config, get_config_dir};
use code_rag::{RagError, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "code-rag")]
#[command(about = "Semantic code indexing and retrieval backed by Ollama and LanceDB")]
#[command(version)]
struct Cli {
    /// Workspace root used for workspace-scoped storage (defaults to the current directory)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,
    /// Directory containing config.toml
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the configuration file, or show the effective configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Index every qualifying file in a folder
    Index {
        /// Folder to index
        folder: PathBuf,
    },
    /// Index a single file
    Add {
        /// File to index
        file: PathBuf,
    },
    /// Search indexed code with a natural language query
    Search {
        /// Search query
        query: String,
        /// Maximum number of results
        #[arg(long, short, default_value_t = 5)]
        limit: usize,
    },
    /// List indexed files
    Files,
    /// Show the chunks stored for a file
    Chunks {
        /// Indexed file
        file: PathBuf,
        /// Include embedding vectors
        #[arg(long)]
        vectors: bool,
    },
    /// Remove a file from the index
    DeleteFile {
        /// Indexed file
        file: PathBuf,
    },
    /// Remove the files directly inside a folder from the index
    DeleteFolder {
        /// Indexed folder
        folder: PathBuf,
    },
    /// Remove every indexed chunk
    Clear,
    /// Check whether a folder can be indexed with the current settings
    Validate {
        /// Folder to check
        folder: PathBuf,
    },
    /// Show index and embedding service status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir().map_err(|e| RagError::Config(e.to_string()))?,
    };
    let config = Config::load(&config_dir)?;
    let workspace = match cli.workspace {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config)?;
            } else {
                save_config(&config)?;
            }
        }
        Commands::Index { folder } => {
            index_folder(&config, &workspace, &folder).await?;
        }
        Commands::Add { file } => {
            add_file(&config, &workspace, &file).await?;
        }
        Commands::Search { query, limit } => {
            search(&config, &workspace, &query, limit).await?;
        }
        Commands::Files => {
            list_files(&config, &workspace).await?;
        }
        Commands::Chunks { file, vectors } => {
            show_chunks(&config, &workspace, &file, vectors).await?;
        }
        Commands::DeleteFile { file } => {
            delete_file(&config, &workspace, &file).await?;
        }
        Commands::DeleteFolder { folder } => {
            delete_folder(&config, &workspace, &folder).await?;
        }
        Commands::Clear => {
            clear(&config, &workspace).await?;
        }
        Commands::Validate { folder } => {
            validate_folder(&config, &folder)?;
        }
        Commands::Status => {
            show_status(&config, &workspace).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn files_command() {
        let cli = Cli::try_parse_from(["code-rag", "files"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Files));
            assert_eq!(parsed.workspace, None);
        }
    }

    #[test]
    fn index_command_with_folder() {
        let cli = Cli::try_parse_from(["code-rag", "index", "./src"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Index { folder } = parsed.command {
                assert_eq!(folder, PathBuf::from("./src"));
            } else {
                panic!("expected index command");
            }
        }
    }

    #[test]
    fn search_default_limit() {
        let cli = Cli::try_parse_from(["code-rag", "search", "parse config"])
            .expect("should parse search");

        if let Commands::Search { query, limit } = cli.command {
            assert_eq!(query, "parse config");
            assert_eq!(limit, 5);
        } else {
            panic!("expected search command");
        }
    }

    #[test]
    fn search_with_limit() {
        let cli = Cli::try_parse_from(["code-rag", "search", "tokenizer", "--limit", "10"])
            .expect("should parse search");

        if let Commands::Search { limit, .. } = cli.command {
            assert_eq!(limit, 10);
        } else {
            panic!("expected search command");
        }
    }

    #[test]
    fn chunks_with_vectors_flag() {
        let cli = Cli::try_parse_from(["code-rag", "chunks", "src/lib.rs", "--vectors"])
            .expect("should parse chunks");

        if let Commands::Chunks { file, vectors } = cli.command {
            assert_eq!(file, PathBuf::from("src/lib.rs"));
            assert!(vectors);
        } else {
            panic!("expected chunks command");
        }
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "code-rag",
            "status",
            "--workspace",
            "/work/project",
            "--config-dir",
            "/tmp/code-rag",
        ])
        .expect("should parse global options");

        assert!(matches!(cli.command, Commands::Status));
        assert_eq!(cli.workspace, Some(PathBuf::from("/work/project")));
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/code-rag")));
    }

    #[test]
    fn delete_commands_use_kebab_case() {
        let cli = Cli::try_parse_from(["code-rag", "delete-folder", "src/utils"])
            .expect("should parse delete-folder");
        assert!(matches!(cli.command, Commands::DeleteFolder { .. }));

        let cli = Cli::try_parse_from(["code-rag", "delete-file", "src/main.rs"])
            .expect("should parse delete-file");
        assert!(matches!(cli.command, Commands::DeleteFile { .. }));
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["code-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn missing_argument() {
        let cli = Cli::try_parse_from(["code-rag", "index"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["code-rag", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["code-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
