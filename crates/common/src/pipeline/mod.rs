//! Review pipeline services
//!
//! - `ingest`: spreadsheet rows into reviews, chunked
//! - `annotate`: copy, per-dimension analysis, reset and bulk edit
//! - `report`: stats, top categories and the recommendation cache

pub mod annotate;
pub mod ingest;
pub mod report;

pub use annotate::{AnalysisOutcome, AnalysisTarget, AnalyzeAllReport, Annotator};
pub use ingest::{ingest_rows, IngestReport, RowError};
pub use report::{RecommendationService, Stats, TopCategory, UNSPECIFIED};
