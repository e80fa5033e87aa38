use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use docs_rag::commands::{ingest, query, similar, stats};
use docs_rag::config::{run_interactive_config, show_config};
use docs_rag::retriever::DEFAULT_MAX_DISTANCE;

#[derive(Parser)]
#[command(name = "docs-rag")]
#[command(about = "Retrieval-augmented question answering over local document collections")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and index settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest a directory of documents into an index
    Ingest {
        /// Directory containing the documents to index
        docs_dir: PathBuf,
        /// Name of the index to create
        #[arg(long, default_value = "knowledge_base")]
        index: String,
    },
    /// Ask a question against an index
    Query {
        /// The question to answer
        question: String,
        /// Name of the index to query
        #[arg(long, default_value = "knowledge_base")]
        index: String,
        /// Number of passages to retrieve
        #[arg(short, default_value_t = 5)]
        k: usize,
        /// Drop candidates farther than this distance
        #[arg(long, default_value_t = DEFAULT_MAX_DISTANCE)]
        max_distance: f32,
        /// Print the retrieved passages without generating an answer
        #[arg(long)]
        retrieve_only: bool,
    },
    /// Find chunks similar to an already-indexed chunk
    Similar {
        /// Chunk id to search from
        chunk_id: i64,
        /// Name of the index to query
        #[arg(long, default_value = "knowledge_base")]
        index: String,
        /// Number of passages to retrieve
        #[arg(short, default_value_t = 5)]
        k: usize,
    },
    /// Show statistics for an index
    Stats {
        /// Name of the index
        #[arg(long, default_value = "knowledge_base")]
        index: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { docs_dir, index } => {
            ingest(&docs_dir, &index)?;
        }
        Commands::Query {
            question,
            index,
            k,
            max_distance,
            retrieve_only,
        } => {
            query(&question, &index, k, max_distance, retrieve_only)?;
        }
        Commands::Similar { chunk_id, index, k } => {
            similar(chunk_id, &index, k)?;
        }
        Commands::Stats { index } => {
            stats(&index)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["docs-rag", "stats"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Stats { .. });
        }
    }

    #[test]
    fn ingest_command_with_dir() {
        let cli = Cli::try_parse_from(["docs-rag", "ingest", "docs"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { docs_dir, index } = parsed.command {
                assert_eq!(docs_dir, PathBuf::from("docs"));
                assert_eq!(index, "knowledge_base");
            }
        }
    }

    #[test]
    fn query_command_defaults() {
        let cli = Cli::try_parse_from(["docs-rag", "query", "what is a closure?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Query {
                question,
                k,
                max_distance,
                retrieve_only,
                ..
            } = parsed.command
            {
                assert_eq!(question, "what is a closure?");
                assert_eq!(k, 5);
                assert_eq!(max_distance, DEFAULT_MAX_DISTANCE);
                assert!(!retrieve_only);
            }
        }
    }

    #[test]
    fn query_command_with_flags() {
        let cli = Cli::try_parse_from([
            "docs-rag",
            "query",
            "how to deploy",
            "--index",
            "ops",
            "-k",
            "3",
            "--retrieve-only",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Query {
                index,
                k,
                retrieve_only,
                ..
            } = parsed.command
            {
                assert_eq!(index, "ops");
                assert_eq!(k, 3);
                assert!(retrieve_only);
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["docs-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["docs-rag", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["docs-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
