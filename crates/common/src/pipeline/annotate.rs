//! Annotation pipeline
//!
//! Fills processed-review analysis fields one dimension at a time through the
//! configured `Analyzer`. Each dimension is an independent call followed by an
//! immediate persist; a failed call leaves the field at its previous value.

use crate::analyzer::Analyzer;
use crate::db::models::ProcessedReview;
use crate::db::{AnalysisPatch, BulkEditItem, Repository, ProcessedFilter};
use crate::errors::{AppError, Result};
use crate::vocabulary::{Dimension, DimensionValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// What to analyze: a stored processed review, raw text, or both
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisTarget {
    /// Processed review to update
    pub id: Option<i32>,
    /// Text to analyze; defaults to the stored text when `id` is given
    pub text: Option<String>,
}

/// Result of a single-dimension analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisOutcome {
    /// Processed review that was updated, if any
    pub id: Option<i32>,
    pub value: DimensionValue,
}

/// Result of a full analysis pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeAllReport {
    /// Processed reviews created by the initial copy
    pub copied: u64,
    /// Processed reviews visited
    pub visited: usize,
    /// Dimension values written
    pub written: usize,
    /// One message per failed dimension call
    pub failures: Vec<String>,
}

/// Annotation service over the record store and an analyzer
#[derive(Clone)]
pub struct Annotator {
    repository: Repository,
    analyzer: Arc<dyn Analyzer>,
}

impl Annotator {
    pub fn new(repository: Repository, analyzer: Arc<dyn Analyzer>) -> Self {
        Self { repository, analyzer }
    }

    /// Create processed reviews for every review lacking one
    #[instrument(skip(self))]
    pub async fn copy_all(&self) -> Result<u64> {
        let copied = self.repository.copy_missing_reviews().await?;
        info!(copied, "Copied reviews to processed");
        Ok(copied)
    }

    /// Analyze one dimension, persisting when a processed review is targeted
    #[instrument(skip(self, target), fields(id = ?target.id))]
    pub async fn analyze_one(
        &self,
        target: AnalysisTarget,
        dimension: Dimension,
    ) -> Result<AnalysisOutcome> {
        let supplied = target.text.filter(|t| !t.trim().is_empty());

        let Some(id) = target.id else {
            let text = supplied.ok_or_else(|| AppError::validation("text", "Either id or text is required"))?;
            let value = self.analyzer.analyze(dimension, &text).await?;
            return Ok(AnalysisOutcome { id: None, value });
        };

        let stored = self.repository.get_processed(id).await?;
        let text = supplied.unwrap_or(stored.text);

        let value = self.analyzer.analyze(dimension, &text).await?;
        self.repository.set_dimension(id, value.clone()).await?;

        Ok(AnalysisOutcome { id: Some(id), value })
    }

    /// Copy, then fill every unset dimension of every processed review
    ///
    /// Strictly sequential. Failures are collected and processing continues.
    #[instrument(skip(self))]
    pub async fn analyze_all(&self) -> Result<AnalyzeAllReport> {
        let mut report = AnalyzeAllReport {
            copied: self.copy_all().await?,
            ..Default::default()
        };

        let reviews = self.repository.list_processed(&ProcessedFilter::default()).await?;
        info!(count = reviews.len(), "Starting analysis pass");

        for review in reviews {
            report.visited += 1;
            self.fill_review(&review, &mut report).await;
        }

        info!(
            visited = report.visited,
            written = report.written,
            failures = report.failures.len(),
            "Analysis pass finished"
        );

        Ok(report)
    }

    async fn fill_review(&self, review: &ProcessedReview, report: &mut AnalyzeAllReport) {
        for dimension in Dimension::ALL {
            if review.has_dimension(dimension) {
                continue;
            }

            let result = match self.analyzer.analyze(dimension, &review.text).await {
                Ok(value) => self.repository.set_dimension(review.id, value).await.map(|_| ()),
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => report.written += 1,
                Err(e) => {
                    warn!(id = review.id, dimension = %dimension, error = %e, "Dimension analysis failed");
                    report.failures.push(format!("review {} {}: {}", review.id, dimension, e));
                }
            }
        }
    }

    /// Null every analysis field of one processed review
    pub async fn reset(&self, id: i32) -> Result<ProcessedReview> {
        self.repository.reset_analysis(id).await
    }

    /// Null every analysis field of every processed review
    #[instrument(skip(self))]
    pub async fn reset_all(&self) -> Result<u64> {
        let cleared = self.repository.reset_all_analysis().await?;
        info!(cleared, "Cleared all analysis fields");
        Ok(cleared)
    }

    /// Partial analysis update
    pub async fn update_fields(&self, id: i32, patch: AnalysisPatch) -> Result<ProcessedReview> {
        self.repository.update_analysis(id, patch).await
    }

    /// Direct theme write
    pub async fn update_theme(&self, id: i32, theme: String) -> Result<ProcessedReview> {
        self.repository
            .update_analysis(id, AnalysisPatch { theme: Some(Some(theme)), ..Default::default() })
            .await
    }

    /// All-or-nothing edit of processed reviews and their source reviews
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn bulk_edit(&self, items: Vec<BulkEditItem>) -> Result<usize> {
        self.repository.bulk_edit(items).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::MockAnalyzer;
    use crate::auth::Role;
    use crate::db::{DbPool, NewReview, RecommendationKey, RecommendationKind};
    use crate::vocabulary::{Priority, Sentiment};
    use async_trait::async_trait;
    use chrono::Utc;

    /// Fails one dimension, delegates the rest to the mock
    struct FlakyAnalyzer {
        failing: Dimension,
    }

    #[async_trait]
    impl Analyzer for FlakyAnalyzer {
        async fn analyze(&self, dimension: Dimension, text: &str) -> Result<DimensionValue> {
            if dimension == self.failing {
                return Err(AppError::UpstreamTimeout { service: "test".into(), timeout_ms: 20_000 });
            }
            MockAnalyzer::new().analyze(dimension, text).await
        }

        async fn recommend(&self, kind: RecommendationKind, key: &RecommendationKey) -> Result<String> {
            MockAnalyzer::new().recommend(kind, key).await
        }
    }

    async fn setup(analyzer: Arc<dyn Analyzer>, texts: &[&str]) -> (Annotator, Repository) {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let user = repo.create_user("Anna", "Acme", Role::Admin).await.unwrap();
        let now = Utc::now();
        let rows = texts
            .iter()
            .map(|t| NewReview { text: t.to_string(), rating: 3.0, date: now, collection_time: now })
            .collect();
        repo.insert_reviews(user.id, rows).await.unwrap();
        (Annotator::new(repo.clone(), analyzer), repo)
    }

    #[tokio::test]
    async fn test_analyze_one_persists() {
        let (annotator, repo) = setup(Arc::new(MockAnalyzer::new()), &["Terrible, slow support"]).await;
        annotator.copy_all().await.unwrap();
        let id = repo.list_processed(&ProcessedFilter::default()).await.unwrap()[0].id;

        let outcome = annotator
            .analyze_one(AnalysisTarget { id: Some(id), text: None }, Dimension::Sentiment)
            .await
            .unwrap();
        assert_eq!(outcome.value, DimensionValue::Sentiment(Sentiment::Negative));
        assert_eq!(repo.get_processed(id).await.unwrap().sentiment, Some(Sentiment::Negative));
    }

    #[tokio::test]
    async fn test_text_only_analysis_does_not_persist() {
        let (annotator, repo) = setup(Arc::new(MockAnalyzer::new()), &["Great"]).await;
        annotator.copy_all().await.unwrap();

        let outcome = annotator
            .analyze_one(
                AnalysisTarget { id: None, text: Some("Terrible service".into()) },
                Dimension::Priority,
            )
            .await
            .unwrap();
        assert_eq!(outcome.id, None);
        assert_eq!(outcome.value, DimensionValue::Priority(Priority::VeryImportant));
        assert!(repo.list_processed(&ProcessedFilter::default()).await.unwrap()[0].is_unanalyzed());

        let err = annotator.analyze_one(AnalysisTarget::default(), Dimension::Theme).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = annotator
            .analyze_one(AnalysisTarget { id: Some(404), text: None }, Dimension::Theme)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ProcessedReviewNotFound { id: 404 }));
    }

    #[tokio::test]
    async fn test_analyze_all_tolerates_failures() {
        let analyzer = Arc::new(FlakyAnalyzer { failing: Dimension::Priority });
        let (annotator, repo) = setup(analyzer, &["Slow delivery", "Great staff"]).await;

        let report = annotator.analyze_all().await.unwrap();
        assert_eq!(report.copied, 2);
        assert_eq!(report.visited, 2);
        assert_eq!(report.written, 10);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures[0].contains("priority"));

        for review in repo.list_processed(&ProcessedFilter::default()).await.unwrap() {
            assert!(review.priority.is_none());
            assert!(review.sentiment.is_some());
            assert!(review.theme.is_some());
        }

        // Set values are not recomputed on a second pass
        let again = annotator.analyze_all().await.unwrap();
        assert_eq!(again.copied, 0);
        assert_eq!(again.written, 0);
        assert_eq!(again.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_update_theme_and_reset() {
        let (annotator, repo) = setup(Arc::new(MockAnalyzer::new()), &["Fine"]).await;
        annotator.copy_all().await.unwrap();
        let id = repo.list_processed(&ProcessedFilter::default()).await.unwrap()[0].id;

        let updated = annotator.update_theme(id, "Checkout".into()).await.unwrap();
        assert_eq!(updated.theme.as_deref(), Some("Checkout"));

        let reset = annotator.reset(id).await.unwrap();
        assert!(reset.is_unanalyzed());
        assert_eq!(annotator.reset_all().await.unwrap(), 1);
    }
}
