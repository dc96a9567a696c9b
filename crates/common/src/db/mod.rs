//! Database layer for YaMDb
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection pool management
//! - Schema creation from the entity definitions

pub mod models;
mod pagination;
mod repository;

pub use pagination::{Page, PageParams};
pub use repository::{
    NewComment, NewReview, NewTitle, NewUser, Repository, TitleChanges, TitleFilter, TitleRecord,
    UserChanges,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use models::*;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: DatabaseConnection,

    /// Read replica connection (optional)
    pub replica: Option<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");

        let primary = Database::connect(connect_options(&config.url, config))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to primary: {}", e),
            })?;

        // Connect to replica if configured
        let replica = if let Some(ref read_url) = config.read_url {
            info!("Connecting to read replica...");

            let replica_conn = Database::connect(connect_options(read_url, config))
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Failed to connect to replica: {}", e),
                })?;

            Some(replica_conn)
        } else {
            None
        };

        info!("Database connections established");

        Ok(Self { primary, replica })
    }

    /// Wrap an already established connection
    pub fn from_connection(primary: DatabaseConnection) -> Self {
        Self {
            primary,
            replica: None,
        }
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }

    /// Create every missing table, foreign key and unique index.
    ///
    /// Tables are created parents first so foreign keys always resolve.
    pub async fn migrate(&self) -> Result<()> {
        let conn = self.write();
        let backend = conn.get_database_backend();
        let schema = Schema::new(backend);

        let mut tables = vec![
            schema.create_table_from_entity(UserEntity),
            schema.create_table_from_entity(CategoryEntity),
            schema.create_table_from_entity(GenreEntity),
            schema.create_table_from_entity(TitleEntity),
            schema.create_table_from_entity(GenreTitleEntity),
            schema.create_table_from_entity(ReviewEntity),
            schema.create_table_from_entity(CommentEntity),
        ];

        for table in tables.iter_mut() {
            table.if_not_exists();
            conn.execute(backend.build(&*table)).await?;
        }

        let one_review_per_title = Index::create()
            .name("uq_reviews_author_title")
            .table(ReviewEntity)
            .col(ReviewColumn::AuthorId)
            .col(ReviewColumn::TitleId)
            .unique()
            .if_not_exists()
            .to_owned();
        conn.execute(backend.build(&one_review_per_title)).await?;

        info!("Database schema ready");
        Ok(())
    }
}

fn connect_options(url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(true);
    opts
}
