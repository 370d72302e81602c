//! Ingestion CLI error types

use sentai_common::{errors::AppError, harvest::HarvestError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Invalid input file {path}: {message}")]
    InvalidInput { path: String, message: String },

    #[error("No user named '{full_name}' in '{organization}'")]
    UnknownUser { full_name: String, organization: String },

    #[error("Harvest error: {0}")]
    Harvest(#[from] HarvestError),

    #[error(transparent)]
    App(#[from] AppError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
