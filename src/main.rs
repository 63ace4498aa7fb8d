use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use repoqa::config::{Config, LoggingConfig};
use repoqa::query::FileTask;

mod cli;

#[derive(Parser)]
#[command(name = "repoqa")]
#[command(version)]
#[command(about = "Ask questions about a code repository with hybrid semantic + keyword search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a project (incremental unless --rebuild)
    Index {
        /// Project directory to index
        #[arg(short, long, default_value = ".")]
        project: String,

        /// Watch for changes
        #[arg(short, long)]
        watch: bool,

        /// Rebuild entire index
        #[arg(short, long)]
        rebuild: bool,
    },

    /// Search the index
    Search {
        /// Search query
        query: String,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        project: String,

        /// Number of results (defaults to search.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Semantic weight in [0, 1] (defaults to search.semantic_weight)
        #[arg(short, long)]
        weight: Option<f32>,

        /// Search mode: hybrid, semantic
        #[arg(short, long, default_value = "hybrid")]
        mode: String,

        /// Output format: json, text
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Answer a question from retrieved code context
    Ask {
        /// The question
        question: String,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        project: String,

        /// Number of context chunks (defaults to search.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Semantic weight in [0, 1] (defaults to search.semantic_weight)
        #[arg(short, long)]
        weight: Option<f32>,
    },

    /// Explain what a file does
    Explain {
        /// File path, relative to the project
        file: String,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        project: String,
    },

    /// Generate tests for a file
    Tests {
        /// File path, relative to the project
        file: String,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        project: String,
    },

    /// Generate documentation for a file
    Docs {
        /// File path, relative to the project
        file: String,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        project: String,
    },

    /// Show index statistics
    Stats {
        /// Project directory
        #[arg(short, long, default_value = ".")]
        project: String,
    },

    /// List supported languages
    Languages,
}

impl Commands {
    fn project(&self) -> Option<&str> {
        match self {
            Commands::Index { project, .. }
            | Commands::Search { project, .. }
            | Commands::Ask { project, .. }
            | Commands::Explain { project, .. }
            | Commands::Tests { project, .. }
            | Commands::Docs { project, .. }
            | Commands::Stats { project } => Some(project.as_str()),
            Commands::Languages => None,
        }
    }
}

fn init_logging(debug: bool, verbose: bool, logging: &LoggingConfig) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        logging.level.as_str()
    };

    // RUST_LOG takes precedence over flags and config
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.compact().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_project_dir(cli.command.project().unwrap_or("."));
    init_logging(cli.debug, cli.verbose, &config.logging);

    info!("repoqa v{} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Index {
            project,
            watch,
            rebuild,
        } => {
            cli::index::index_project(project, watch, rebuild).await?;
        }

        Commands::Search {
            query,
            project,
            top_k,
            weight,
            mode,
            format,
        } => {
            cli::search::search_index(query, project, top_k, weight, mode, format).await?;
        }

        Commands::Ask {
            question,
            project,
            top_k,
            weight,
        } => {
            cli::ask::ask_question(question, project, top_k, weight).await?;
        }

        Commands::Explain { file, project } => {
            cli::generate::generate_for_file(FileTask::Explain, file, project).await?;
        }

        Commands::Tests { file, project } => {
            cli::generate::generate_for_file(FileTask::Tests, file, project).await?;
        }

        Commands::Docs { file, project } => {
            cli::generate::generate_for_file(FileTask::Docs, file, project).await?;
        }

        Commands::Stats { project } => {
            cli::stats::show_stats(project, cli.verbose).await?;
        }

        Commands::Languages => {
            cli::languages::list_languages();
        }
    }

    Ok(())
}
