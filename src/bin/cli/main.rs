mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "syllabus-cli",
    about = "Index course materials and answer questions grounded on them",
    version
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Load, chunk and index every supported file in the data directory
    Ingest {
        /// Override the configured data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Clear the collection before indexing
        #[arg(long)]
        clear: bool,
        /// Stop at the first file that fails
        #[arg(long)]
        fail_fast: bool,
    },

    /// Semantic search over indexed chunks
    Search {
        /// Search query
        query: String,
        /// Maximum results (defaults to retrieval.top_k)
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Ask a question answered from the indexed material
    Ask {
        /// The question
        question: String,
        /// Number of chunks to ground the answer on
        #[arg(long)]
        top_k: Option<usize>,
        /// Print the retrieved sources after the answer
        #[arg(long)]
        show_sources: bool,
    },

    /// Show collection name, location and record count
    Stats,

    /// Delete every record in the collection
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let app = app::App::new(cli.config.as_deref())?;

    match cli.command {
        Command::Ingest {
            data_dir,
            clear,
            fail_fast,
        } => {
            commands::ingest::run(&app, data_dir, clear, fail_fast, &cli.format, use_color).await?;
        }
        Command::Search { query, top_k } => {
            commands::search::run(&app, &query, top_k, &cli.format, use_color).await?;
        }
        Command::Ask {
            question,
            top_k,
            show_sources,
        } => {
            commands::ask::run(&app, &question, top_k, show_sources, &cli.format, use_color).await?;
        }
        Command::Stats => {
            commands::stats::run(&app, &cli.format)?;
        }
        Command::Clear { yes } => {
            commands::clear::run(&app, yes, &cli.format)?;
        }
    }

    Ok(())
}
