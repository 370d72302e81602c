//! Command implementations, kept separate from argument parsing

use crate::errors::IngestionError;
use futures::StreamExt;
use sentai_common::{
    auth::Role,
    db::{models::User, Repository},
    harvest::{render_spreadsheet, to_ingest_rows, HarvestConfig, HarvestedReview, Harvester, SnapshotPage},
    pipeline::{ingest_rows, IngestReport},
};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

type Result<T> = std::result::Result<T, IngestionError>;

/// Rows from a JSON file holding either an array or `{"reviews": [...]}`
pub fn parse_rows(path: &Path, content: &str) -> Result<Vec<Value>> {
    let invalid = |message: String| IngestionError::InvalidInput {
        path: path.display().to_string(),
        message,
    };

    let value: Value = serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut map) => match map.remove("reviews") {
            Some(Value::Array(rows)) => Ok(rows),
            _ => Err(invalid("expected an array or an object with a 'reviews' array".to_string())),
        },
        _ => Err(invalid("expected an array of rows".to_string())),
    }
}

async fn find_owner(repo: &Repository, full_name: &str, organization: &str) -> Result<User> {
    repo.find_user_by_identity(full_name, organization)
        .await?
        .ok_or_else(|| IngestionError::UnknownUser {
            full_name: full_name.to_string(),
            organization: organization.to_string(),
        })
}

/// Load a rows file as reviews owned by an existing user
pub async fn load(
    repo: &Repository,
    path: &Path,
    full_name: &str,
    organization: &str,
    chunk_size: usize,
) -> Result<IngestReport> {
    let content = tokio::fs::read_to_string(path).await?;
    let rows = parse_rows(path, &content)?;
    let owner = find_owner(repo, full_name, organization).await?;

    let report = ingest_rows(repo, owner.id, &rows, chunk_size).await?;
    info!(
        inserted = report.success,
        total = report.total,
        errors = report.errors.len(),
        "Rows loaded"
    );
    Ok(report)
}

/// Promote an existing user to the admin role
pub async fn grant_admin(repo: &Repository, full_name: &str, organization: &str) -> Result<User> {
    let user = find_owner(repo, full_name, organization).await?;
    if user.role == Role::Admin {
        info!(user_id = user.id, "User is already an admin");
        return Ok(user);
    }

    let user = repo.set_user_role(user.id, Role::Admin).await?;
    info!(user_id = user.id, "Admin role granted");
    Ok(user)
}

/// Snapshot page from a captured JSON file
pub async fn read_snapshots(path: &Path) -> Result<SnapshotPage> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(SnapshotPage::from_json(&content)?)
}

/// Replay captured snapshots, keeping whatever was collected before a failure
pub async fn harvest(page: SnapshotPage, config: HarvestConfig) -> Vec<HarvestedReview> {
    let stream = Harvester::new(page, config).into_stream();
    futures::pin_mut!(stream);

    let mut reviews = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(review) => reviews.push(review),
            Err(e) => warn!(error = %e, collected = reviews.len(), "Harvest stopped early"),
        }
    }
    reviews
}

/// Write the spreadsheet and/or ingestion JSON outputs
pub async fn write_outputs(
    reviews: &[HarvestedReview],
    xls_out: Option<&Path>,
    json_out: Option<&Path>,
) -> Result<()> {
    if let Some(path) = xls_out {
        tokio::fs::write(path, render_spreadsheet(reviews)).await?;
        info!(path = %path.display(), rows = reviews.len(), "Spreadsheet written");
    }
    if let Some(path) = json_out {
        let rows = to_ingest_rows(reviews);
        let json = serde_json::to_string_pretty(&rows).map_err(sentai_common::AppError::from)?;
        tokio::fs::write(path, json).await?;
        info!(path = %path.display(), rows = reviews.len(), "Rows file written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentai_common::db::DbPool;
    use sentai_common::harvest::Card;
    use std::path::PathBuf;
    use std::time::Duration;

    fn card(text: &str, date: &str, rating: Option<u8>) -> Card {
        Card {
            text: Some(text.to_string()),
            date: Some(date.to_string()),
            rating,
        }
    }

    #[test]
    fn test_parse_rows_shapes() {
        let path = PathBuf::from("rows.json");
        assert_eq!(parse_rows(&path, r#"[{"text": "a"}]"#).unwrap().len(), 1);
        assert_eq!(parse_rows(&path, r#"{"reviews": [{}, {}]}"#).unwrap().len(), 2);

        let err = parse_rows(&path, r#"{"rows": []}"#).unwrap_err();
        assert!(matches!(err, IngestionError::InvalidInput { .. }));
        assert!(parse_rows(&path, "not json").is_err());
    }

    #[tokio::test]
    async fn test_grant_admin() {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        repo.create_user("Anna Smirnova", "Acme", Role::Worker).await.unwrap();

        let user = tokio_test::assert_ok!(grant_admin(&repo, "Anna Smirnova", "Acme").await);
        assert_eq!(user.role, Role::Admin);

        let again = grant_admin(&repo, "Anna Smirnova", "Acme").await.unwrap();
        assert_eq!(again.id, user.id);

        let err = tokio_test::assert_err!(grant_admin(&repo, "Nobody", "Acme").await);
        assert!(matches!(err, IngestionError::UnknownUser { .. }));
    }

    #[tokio::test]
    async fn test_harvest_then_load() {
        let page = SnapshotPage::new(vec![
            vec![card("Great service", "12 марта 2024", Some(5))],
            vec![
                card("Great service", "12 марта 2024", Some(5)),
                card("Slow support", "13 марта 2024", Some(2)),
            ],
        ]);
        let reviews = harvest(page, HarvestConfig::default()).await;
        assert_eq!(reviews.len(), 2);

        let dir = std::env::temp_dir().join(format!("sentai-ingestion-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let xls = dir.join("reviews.xls");
        let json = dir.join("reviews.json");
        write_outputs(&reviews, Some(&xls), Some(&json)).await.unwrap();

        let html = tokio::fs::read_to_string(&xls).await.unwrap();
        assert!(html.contains("Slow support"));

        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        repo.create_user("Olga Admin", "Acme", Role::Admin).await.unwrap();
        let report = load(&repo, &json, "Olga Admin", "Acme", 100).await.unwrap();
        assert_eq!(report.success, 2);
        assert!(report.errors.is_empty());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn test_read_snapshots_rejects_bad_json() {
        let path = std::env::temp_dir().join(format!("sentai-snapshots-{}.json", std::process::id()));
        tokio::fs::write(&path, "{\"not\": \"snapshots\"}").await.unwrap();

        let err = tokio_test::assert_err!(read_snapshots(&path).await);
        assert!(matches!(err, IngestionError::Harvest(_)));

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_harvest_keeps_partial_results_on_timeout() {
        let page = SnapshotPage::new(vec![
            vec![card("First", "1 мая 2024", None)],
            vec![card("First", "1 мая 2024", None), card("Second", "2 мая 2024", None)],
        ])
        .with_advance_delay(Duration::from_millis(200));
        let config = HarvestConfig {
            limit: 10,
            advance_timeout: Duration::from_millis(20),
        };

        let reviews = harvest(page, config).await;
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].text, "First");
    }
}
