//! Batch ingestion of untrusted spreadsheet rows
//!
//! Rows arrive as JSON objects keyed by whatever headers the spreadsheet had.
//! Each row is coerced on its own: a bad row is reported and skipped, a bad
//! date silently becomes "now". Valid rows are written in fixed-size chunks,
//! one transaction per chunk, in input order.

use crate::db::{NewReview, Repository, MAX_RATING, MIN_RATING};
use crate::errors::{AppError, Result};
use crate::metrics;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Days between the spreadsheet epoch (1899-12-30) and the Unix epoch
const EXCEL_UNIX_EPOCH_DAYS: f64 = 25569.0;

const TEXT_HEADERS: &[&str] = &["text", "текст", "отзыв", "review", "comment", "комментарий"];
const RATING_HEADERS: &[&str] = &["rating", "оценка", "score"];
const DATE_HEADERS: &[&str] = &["date", "дата"];
const COLLECTION_HEADERS: &[&str] = &["collection time", "collectiontime", "время сбора", "time"];

/// Why a single row was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("not an object")]
    NotAnObject,

    #[error("empty text")]
    EmptyText,

    #[error("invalid rating")]
    InvalidRating,

    #[error("rating out of range")]
    RatingOutOfRange,
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Rows inserted
    pub success: usize,
    /// Rows attempted
    pub total: usize,
    /// Human-readable per-row and per-chunk errors
    pub errors: Vec<String>,
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(['_', '-'], " ")
}

/// First non-empty value whose header matches an alias, in alias order
fn lookup<'a>(row: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        row.iter()
            .find(|(key, value)| normalize_header(key) == *alias && !is_blank(value))
            .map(|(_, value)| value)
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn coerce_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Numbers or numeric strings with either decimal separator
pub fn coerce_rating(value: Option<&Value>) -> std::result::Result<f64, RowError> {
    let rating = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|r| r.is_finite())
    .ok_or(RowError::InvalidRating)?;

    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(rating)
    } else {
        Err(RowError::RatingOutOfRange)
    }
}

/// Spreadsheet serial days or one of the accepted string layouts
pub fn coerce_date(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Number(n) => {
            let days = n.as_f64()?;
            let millis = ((days - EXCEL_UNIX_EPOCH_DAYS) * 86_400_000.0).round();
            if !millis.is_finite() {
                return None;
            }
            DateTime::from_timestamp_millis(millis as i64)
        }
        Value::String(s) => parse_date_str(s.trim()),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d.%m.%Y %H:%M:%S", "%d.%m.%Y %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(naive.and_utc());
        }
    }
    for layout in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, layout) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// Coerce one raw row; `now` stands in for unreadable dates
pub fn coerce_row(row: &Value, now: DateTime<Utc>) -> std::result::Result<NewReview, RowError> {
    let row = row.as_object().ok_or(RowError::NotAnObject)?;

    let text = coerce_text(lookup(row, TEXT_HEADERS)).ok_or(RowError::EmptyText)?;
    let rating = coerce_rating(lookup(row, RATING_HEADERS))?;
    let date = coerce_date(lookup(row, DATE_HEADERS)).unwrap_or(now);
    let collection_time = coerce_date(lookup(row, COLLECTION_HEADERS)).unwrap_or(now);

    Ok(NewReview { text, rating, date, collection_time })
}

/// Validate and insert rows on behalf of `owner_id`
#[instrument(skip(repo, rows), fields(rows = rows.len()))]
pub async fn ingest_rows(
    repo: &Repository,
    owner_id: i32,
    rows: &[Value],
    chunk_size: usize,
) -> Result<IngestReport> {
    if rows.is_empty() {
        return Err(AppError::validation("reviews", "No rows to ingest"));
    }

    let chunk_size = chunk_size.max(1);
    let now = Utc::now();
    let mut report = IngestReport { total: rows.len(), ..Default::default() };
    let mut rejected = 0;
    let mut failed_chunks = 0;

    for (chunk_index, chunk) in rows.chunks(chunk_size).enumerate() {
        let mut valid = Vec::with_capacity(chunk.len());

        for (offset, row) in chunk.iter().enumerate() {
            let row_number = chunk_index * chunk_size + offset + 1;
            match coerce_row(row, now) {
                Ok(review) => valid.push(review),
                Err(e) => {
                    rejected += 1;
                    report.errors.push(format!("row {}: {}", row_number, e));
                }
            }
        }

        if valid.is_empty() {
            continue;
        }

        match repo.insert_reviews(owner_id, valid).await {
            Ok(inserted) => report.success += inserted,
            Err(e) => {
                failed_chunks += 1;
                warn!(chunk = chunk_index + 1, error = %e, "Ingestion chunk aborted");
                report.errors.push(format!("chunk {}: {}", chunk_index + 1, e));
            }
        }
    }

    metrics::record_ingestion(report.success, rejected, failed_chunks);
    info!(
        owner_id,
        success = report.success,
        total = report.total,
        errors = report.errors.len(),
        "Ingestion finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::DbPool;
    use chrono::{Datelike, TimeZone};
    use serde_json::json;

    async fn repo_with_owner() -> (Repository, i32) {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let user = repo.create_user("Anna", "Acme", Role::Admin).await.unwrap();
        (repo, user.id)
    }

    #[test]
    fn test_header_aliases() {
        let now = Utc::now();
        let review = coerce_row(&json!({"Отзыв": "Хорошо", "Оценка": "4,5", "Время_сбора": 45000}), now)
            .unwrap();
        assert_eq!(review.text, "Хорошо");
        assert_eq!(review.rating, 4.5);
        assert_eq!(review.date, now);
        assert_eq!(review.collection_time.year(), 2023);

        let review = coerce_row(&json!({"Comment": "ok", "RATING": 3, "collectionTime": "2024-05-01"}), now)
            .unwrap();
        assert_eq!(review.collection_time, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_excel_serial_dates() {
        // 45000 is 2023-03-15 in spreadsheet serial days
        let date = coerce_date(Some(&json!(45000))).unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2023, 3, 15, 0, 0, 0).unwrap());

        let noon = coerce_date(Some(&json!(45000.5))).unwrap();
        assert_eq!(noon, Utc.with_ymd_and_hms(2023, 3, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_date_layouts() {
        let expected = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
        assert_eq!(coerce_date(Some(&json!("29.02.2024"))), Some(expected));
        assert_eq!(coerce_date(Some(&json!("2024-02-29"))), Some(expected));
        assert_eq!(coerce_date(Some(&json!("2024-02-29T00:00:00Z"))), Some(expected));
        assert_eq!(coerce_date(Some(&json!("2024-02-29 00:00:00"))), Some(expected));
        assert_eq!(coerce_date(Some(&json!("yesterday"))), None);
    }

    #[test]
    fn test_rating_rules() {
        assert_eq!(coerce_rating(Some(&json!(0))), Ok(0.0));
        assert_eq!(coerce_rating(Some(&json!("5"))), Ok(5.0));
        assert_eq!(coerce_rating(Some(&json!(5.01))), Err(RowError::RatingOutOfRange));
        assert_eq!(coerce_rating(Some(&json!(-1))), Err(RowError::RatingOutOfRange));
        assert_eq!(coerce_rating(Some(&json!("five"))), Err(RowError::InvalidRating));
        assert_eq!(coerce_rating(None), Err(RowError::InvalidRating));
    }

    #[tokio::test]
    async fn test_rejects_rows_individually() {
        let (repo, owner) = repo_with_owner().await;
        let rows = vec![
            json!({"text": "Great service", "rating": 5}),
            json!({"text": "", "rating": 3}),
            json!({"text": "Slow support", "rating": 2}),
        ];

        let report = ingest_rows(&repo, owner, &rows, 100).await.unwrap();
        assert_eq!(
            report,
            IngestReport { success: 2, total: 3, errors: vec!["row 2: empty text".to_string()] }
        );

        let stored = repo.list_reviews().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|(r, _)| r.user_id == owner));
        assert!(stored.iter().all(|(r, _)| (0.0..=5.0).contains(&r.rating)));
    }

    #[tokio::test]
    async fn test_storage_error_aborts_only_its_chunk() {
        let (repo, owner) = repo_with_owner().await;
        let rows: Vec<Value> = (0..5).map(|i| json!({"text": format!("review {}", i), "rating": 4})).collect();

        // Unknown owner fails every chunk at the foreign key
        let report = ingest_rows(&repo, owner + 100, &rows, 2).await.unwrap();
        assert_eq!(report.success, 0);
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors[0].starts_with("chunk 1:"));

        let report = ingest_rows(&repo, owner, &rows, 2).await.unwrap();
        assert_eq!(report.success, 5);
        assert!(report.errors.is_empty());

        let texts: Vec<String> = repo.list_reviews().await.unwrap().into_iter().map(|(r, _)| r.text).collect();
        assert_eq!(texts, vec!["review 0", "review 1", "review 2", "review 3", "review 4"]);
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let (repo, owner) = repo_with_owner().await;
        let err = ingest_rows(&repo, owner, &[], 100).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
