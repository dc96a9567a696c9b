//! YaMDb CSV importer binary
//!
//! ```bash
//! importer all --dir static/data
//! importer reviews static/data/review.csv
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use yamdb_common::{config::AppConfig, db::DbPool, VERSION};
use yamdb_importer::{import_files, Fixture};

const DEFAULT_DIR: &str = "static/data";

#[derive(Parser)]
#[command(name = "importer")]
#[command(about = "Load YaMDb CSV fixtures into the database", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Create missing tables before importing
    #[arg(long)]
    migrate: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import categories (id,name,slug)
    Categories {
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,
    },

    /// Import genres (id,name,slug)
    Genres {
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,
    },

    /// Import users (id,username,email,role,bio,first_name,last_name)
    Users {
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,
    },

    /// Import titles (id,name,year,category)
    Titles {
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,
    },

    /// Import reviews (id,title_id,text,author,score,pub_date)
    Reviews {
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,
    },

    /// Import comments (id,review_id,text,author,pub_date)
    Comments {
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,
    },

    /// Import title/genre links (id,title_id,genre_id)
    GenreTitles {
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,
    },

    /// Import every fixture from a directory, parents first
    All {
        #[arg(long, value_name = "DIR", default_value = DEFAULT_DIR)]
        dir: PathBuf,
    },
}

impl Commands {
    fn jobs(self) -> Vec<(Fixture, PathBuf)> {
        let single = |fixture: Fixture, path: Option<PathBuf>| {
            let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_DIR).join(fixture.file_name()));
            vec![(fixture, path)]
        };

        match self {
            Commands::Categories { path } => single(Fixture::Categories, path),
            Commands::Genres { path } => single(Fixture::Genres, path),
            Commands::Users { path } => single(Fixture::Users, path),
            Commands::Titles { path } => single(Fixture::Titles, path),
            Commands::Reviews { path } => single(Fixture::Reviews, path),
            Commands::Comments { path } => single(Fixture::Comments, path),
            Commands::GenreTitles { path } => single(Fixture::GenreTitles, path),
            Commands::All { dir } => Fixture::ALL
                .into_iter()
                .map(|fixture| (fixture, dir.join(fixture.file_name())))
                .collect(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level)),
        )
        .with_target(false)
        .init();

    info!("Starting YaMDb importer v{}", VERSION);

    let db = DbPool::new(&config.database).await?;
    if cli.migrate || config.database.auto_migrate {
        db.migrate().await?;
    }

    let jobs = cli.command.jobs();
    let report = import_files(db.write(), &jobs).await.map_err(|e| {
        tracing::error!(error = %e, "Import aborted, nothing was written");
        e
    })?;

    for (fixture, rows) in &report.counts {
        info!(table = %fixture, rows, "Imported");
    }
    info!(total = report.total(), "Import complete");
    Ok(())
}
