//! Aggregation and reporting
//!
//! Counts are exact over the full processed-review table at query time.

use crate::analyzer::Analyzer;
use crate::db::{
    CategoryPriorityCount, Recommendation, RecommendationKey, RecommendationKind, Repository,
};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::vocabulary::{CompetitorMention, Priority, Sentiment};
use serde::Serialize;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Label used for null categories and priorities in reports
pub const UNSPECIFIED: &str = "unspecified";

/// Dashboard headline numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_reviews: u64,
    pub negative_reviews: u64,
    pub critical_reviews: u64,
    pub competitor_mentions: u64,
}

/// One row of the top-categories report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopCategory {
    pub category: String,
    pub priority: String,
    pub count: u64,
}

/// Headline counts
pub async fn stats(repo: &Repository) -> Result<Stats> {
    Ok(Stats {
        total_reviews: repo.count_processed().await?,
        negative_reviews: repo.count_by_sentiment(Sentiment::Negative).await?,
        critical_reviews: repo.count_by_priority(Priority::VeryImportant).await?,
        competitor_mentions: repo.count_by_competitor_mention(CompetitorMention::Mentioned).await?,
    })
}

/// Order groups by count descending, then category, then priority, nulls last
///
/// Groups sharing a (category, priority) key are summed first. Stored codes
/// outside the priority vocabulary arrive as `None` and join the null group.
pub fn rank_categories(raw: Vec<CategoryPriorityCount>) -> Vec<TopCategory> {
    let mut groups: Vec<CategoryPriorityCount> = Vec::with_capacity(raw.len());
    for group in raw {
        match groups
            .iter_mut()
            .find(|g| g.category == group.category && g.priority == group.priority)
        {
            Some(existing) => existing.count += group.count,
            None => groups.push(group),
        }
    }

    groups.sort_by(|a, b| {
        let key = |g: &CategoryPriorityCount| {
            (
                Reverse(g.count),
                g.category.is_none(),
                g.category.clone(),
                g.priority.is_none(),
                g.priority,
            )
        };
        key(a).cmp(&key(b))
    });

    groups
        .into_iter()
        .map(|g| TopCategory {
            category: g.category.unwrap_or_else(|| UNSPECIFIED.to_string()),
            priority: g.priority.map(|p| p.as_str().to_string()).unwrap_or_else(|| UNSPECIFIED.to_string()),
            count: g.count,
        })
        .collect()
}

/// Grouped counts by (category, priority), ranked
pub async fn top_categories(repo: &Repository, limit: Option<usize>) -> Result<Vec<TopCategory>> {
    let mut ranked = rank_categories(repo.count_by_category_priority().await?);
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    Ok(ranked)
}

/// Recommendation read-through cache over the record store
#[derive(Clone)]
pub struct RecommendationService {
    repository: Repository,
    analyzer: Arc<dyn Analyzer>,
}

impl RecommendationService {
    pub fn new(repository: Repository, analyzer: Arc<dyn Analyzer>) -> Self {
        Self { repository, analyzer }
    }

    /// Stored text for `key`, generating and upserting when absent or when `refresh` is set
    ///
    /// Returns the recommendation and whether it came from storage.
    #[instrument(skip(self), fields(kind = kind.as_str()))]
    pub async fn get_or_generate(
        &self,
        kind: RecommendationKind,
        key: RecommendationKey,
        refresh: bool,
    ) -> Result<(Recommendation, bool)> {
        if key.category.is_empty() {
            return Err(AppError::validation("category", "Category is required"));
        }

        if !refresh {
            if let Some(stored) = self.repository.find_recommendation(kind, &key).await? {
                metrics::record_recommendation_cache(true, kind.as_str());
                debug!(key = %key, "Recommendation served from storage");
                return Ok((stored, true));
            }
        }

        metrics::record_recommendation_cache(false, kind.as_str());
        let text = self.analyzer.recommend(kind, &key).await?;
        let saved = self.repository.upsert_recommendation(kind, &key, &text).await?;
        info!(key = %key, "Recommendation generated");

        Ok((saved, false))
    }

    /// Stored recommendations, most recent first
    pub async fn list(
        &self,
        kind: RecommendationKind,
        category: Option<&str>,
        theme: Option<&str>,
    ) -> Result<Vec<Recommendation>> {
        self.repository.list_recommendations(kind, category, theme).await
    }
}
