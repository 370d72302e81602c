//! Database layer for SentAI
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection pool management
//! - Schema bootstrap from the entity definitions

pub mod models;
mod repository;

pub use models::{MAX_RATING, MIN_RATING};

pub use repository::{
    check_review_fields, AnalysisPatch, BulkEditItem, CategoryPriorityCount, NewReview,
    ProcessedFilter, Recommendation, RecommendationKey, RecommendationKind, Repository,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use models::{
    AiRecommendationColumn, AiRecommendationEntity, CompetitorRecommendationColumn,
    CompetitorRecommendationEntity, ProcessedReviewEntity, ReviewEntity, UserColumn, UserEntity,
};
use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(config.sql_logging);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    /// Private in-memory SQLite database with the schema applied
    ///
    /// A single connection is used so every query sees the same database.
    pub async fn in_memory() -> Result<Self> {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .sqlx_logging(false);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let pool = Self { conn };
        pool.init_schema().await?;
        Ok(pool)
    }

    /// Wrap an existing connection
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// The underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }

    /// Create every table and index that does not exist yet
    pub async fn init_schema(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);

        // Parents before children so foreign keys resolve
        let mut tables = vec![
            schema.create_table_from_entity(UserEntity),
            schema.create_table_from_entity(ReviewEntity),
            schema.create_table_from_entity(ProcessedReviewEntity),
            schema.create_table_from_entity(AiRecommendationEntity),
            schema.create_table_from_entity(CompetitorRecommendationEntity),
        ];

        for table in tables.iter_mut() {
            table.if_not_exists();
            self.conn.execute(backend.build(&*table)).await?;
        }

        let indexes = [
            Index::create()
                .name("uq_users_full_name_organization")
                .table(UserEntity)
                .col(UserColumn::FullName)
                .col(UserColumn::Organization)
                .unique()
                .if_not_exists()
                .to_owned(),
            Index::create()
                .name("uq_ai_recommendations_category_theme")
                .table(AiRecommendationEntity)
                .col(AiRecommendationColumn::Category)
                .col(AiRecommendationColumn::Theme)
                .unique()
                .if_not_exists()
                .to_owned(),
            Index::create()
                .name("uq_competitor_recommendations_category_theme")
                .table(CompetitorRecommendationEntity)
                .col(CompetitorRecommendationColumn::Category)
                .col(CompetitorRecommendationColumn::Theme)
                .unique()
                .if_not_exists()
                .to_owned(),
        ];

        for index in indexes.iter() {
            self.conn.execute(backend.build(index)).await?;
        }

        info!("Database schema ready");
        Ok(())
    }
}
