//! SentAI Common Library
//!
//! Shared code for the SentAI services including:
//! - Database entities and the repository
//! - Analysis vocabularies and the text generation clients
//! - Ingestion, annotation and reporting services
//! - The review harvester
//! - Error types, request extractors, configuration, authentication
//! - Logging and metrics

pub mod analyzer;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod extract;
pub mod harvest;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod vocabulary;

// Re-export commonly used types
pub use analyzer::{create_analyzer, Analyzer};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use vocabulary::{CompetitorMention, Dimension, DimensionValue, Priority, Sentiment};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
