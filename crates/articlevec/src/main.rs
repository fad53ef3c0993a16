use anyhow::Result;
use articlevec_common::{logger, AppConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "articlevec")]
#[command(about = "Article import, comment embeddings and similarity search on Postgres + pgvector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database when missing, along with the articles table
    CreateDb,

    /// Create the vector extension, articles table and indexes
    CreateTable,

    /// Import articles from a CSV file, creating the table first
    Import {
        /// CSV file with a header row
        path: PathBuf,
    },

    /// Generate embeddings for articles without one
    Embed {
        /// Records per batch
        #[arg(long, default_value_t = 50)]
        batch_size: usize,

        /// Maximum records to embed in this run
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show embedding coverage
    Status,

    /// Find articles whose comments are closest to a query
    Similar {
        /// Free-text query
        query: String,

        /// Number of results
        #[arg(long, default_value_t = 5)]
        k: usize,
    },

    /// Aggregate a period and summarize it with the LLM
    Report {
        /// CSV to import first (defaults to ARTICLES_CSV)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Month (2025-07) or quarter (2025-Q3)
        #[arg(long)]
        period: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_dotenv_from_project_root();

    let config = AppConfig::from_env()?;
    logger::setup_logging(config.log_dir.as_deref(), &config.log_level)?;
    tracing::debug!("Configuration loaded: {}", serde_json::to_string(&config)?);

    match cli.command {
        Some(Commands::CreateDb) => {
            commands::create_db(&config).await?;
        }
        Some(Commands::CreateTable) => {
            commands::create_table(&config).await?;
        }
        Some(Commands::Import { path }) => {
            let store = commands::create_table(&config).await?;
            commands::import(store, &path).await?;
        }
        Some(Commands::Embed { batch_size, limit }) => {
            let store = commands::open_store(&config).await?;
            commands::embed(&config, store, batch_size, limit).await?;
        }
        Some(Commands::Status) => {
            let store = commands::open_store(&config).await?;
            commands::status(store).await?;
        }
        Some(Commands::Similar { query, k }) => {
            let store = commands::open_store(&config).await?;
            commands::similar(&config, store, &query, k).await?;
        }
        Some(Commands::Report { csv, period }) => {
            commands::report(&config, csv.as_deref(), period.as_deref()).await?;
        }
        None => {
            tracing::info!("articlevec starting default pipeline...");
            commands::default_pipeline(&config).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from(["articlevec", "embed", "--batch-size", "10", "--limit", "3"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Embed { batch_size: 10, limit: Some(3) })));

        let cli = Cli::try_parse_from(["articlevec", "similar", "interest rates"]).unwrap();
        match cli.command {
            Some(Commands::Similar { query, k }) => {
                assert_eq!(query, "interest rates");
                assert_eq!(k, 5);
            }
            _ => panic!("expected similar"),
        }

        let cli = Cli::try_parse_from(["articlevec", "create-db"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CreateDb)));

        let cli = Cli::try_parse_from(["articlevec"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_report_options() {
        let cli = Cli::try_parse_from(["articlevec", "report", "--period", "2025-Q3"]).unwrap();
        match cli.command {
            Some(Commands::Report { csv, period }) => {
                assert!(csv.is_none());
                assert_eq!(period.as_deref(), Some("2025-Q3"));
            }
            _ => panic!("expected report"),
        }
    }
}
