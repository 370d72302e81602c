//! Repository pattern for database operations
//!
//! The only component that reads or writes persisted entities. Multi-row
//! writes (ingestion chunks, bulk edits) run inside a single transaction.

use crate::auth::Role;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::vocabulary::{join_tags, CompetitorMention, DimensionValue, Priority, Sentiment};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, Statement,
    TransactionTrait, Value,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Processed rows per `INSERT` when copying reviews
const COPY_BATCH_ROWS: usize = 500;

/// A validated review ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub text: String,
    pub rating: f64,
    pub date: DateTime<Utc>,
    pub collection_time: DateTime<Utc>,
}

/// Which recommendation table a key lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    General,
    Competitor,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::General => "general",
            RecommendationKind::Competitor => "competitor",
        }
    }
}

/// Compound recommendation key; an empty theme means "unspecified"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecommendationKey {
    pub category: String,
    pub theme: String,
}

impl RecommendationKey {
    pub fn new(category: impl Into<String>, theme: Option<String>) -> Self {
        Self {
            category: category.into().trim().to_string(),
            theme: theme.map(|t| t.trim().to_string()).unwrap_or_default(),
        }
    }
}

impl fmt::Display for RecommendationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.theme.is_empty() {
            write!(f, "{}", self.category)
        } else {
            write!(f, "{} / {}", self.category, self.theme)
        }
    }
}

/// Stored recommendation, regardless of variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: i32,
    pub kind: RecommendationKind,
    pub category: String,
    pub theme: String,
    pub text: String,
    pub updated_at: DateTime<Utc>,
}

impl From<AiRecommendation> for Recommendation {
    fn from(m: AiRecommendation) -> Self {
        Self {
            id: m.id,
            kind: RecommendationKind::General,
            category: m.category,
            theme: m.theme,
            text: m.text,
            updated_at: m.updated_at,
        }
    }
}

impl From<CompetitorRecommendation> for Recommendation {
    fn from(m: CompetitorRecommendation) -> Self {
        Self {
            id: m.id,
            kind: RecommendationKind::Competitor,
            category: m.category,
            theme: m.theme,
            text: m.text,
            updated_at: m.updated_at,
        }
    }
}

/// Optional equality filters for processed review listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessedFilter {
    pub category: Option<String>,
    pub theme: Option<String>,
}

/// One (category, priority) group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPriorityCount {
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub count: u64,
}

#[derive(Debug, FromQueryResult)]
struct CategoryPriorityRow {
    category: Option<String>,
    priority: Option<String>,
    count: i64,
}

/// Partial update of analysis fields
///
/// Outer `None` leaves a field untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPatch {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub theme: Option<Option<String>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub sentiment: Option<Option<Sentiment>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub category: Option<Option<String>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub priority: Option<Option<Priority>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub competitor_mention: Option<Option<CompetitorMention>>,

    #[serde(default, deserialize_with = "deserialize_tags_patch")]
    pub tags: Option<Option<Vec<String>>>,
}

impl AnalysisPatch {
    /// Patch that nulls every analysis field
    pub fn clear_all() -> Self {
        Self {
            theme: Some(None),
            sentiment: Some(None),
            category: Some(None),
            priority: Some(None),
            competitor_mention: Some(None),
            tags: Some(None),
        }
    }

    /// Patch that writes a single analyzed value
    pub fn from_value(value: DimensionValue) -> Self {
        let mut patch = Self::default();
        match value {
            DimensionValue::Theme(v) => patch.theme = Some(Some(v)),
            DimensionValue::Category(v) => patch.category = Some(Some(v)),
            DimensionValue::Tags(v) => patch.tags = Some(Some(v)),
            DimensionValue::Sentiment(v) => patch.sentiment = Some(Some(v)),
            DimensionValue::Priority(v) => patch.priority = Some(Some(v)),
            DimensionValue::CompetitorMention(v) => patch.competitor_mention = Some(Some(v)),
        }
        patch
    }

    pub fn is_empty(&self) -> bool {
        self.theme.is_none()
            && self.sentiment.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.competitor_mention.is_none()
            && self.tags.is_none()
    }

    fn apply(self, model: &mut ProcessedReviewActiveModel) {
        if let Some(v) = self.theme {
            model.theme = Set(non_blank(v));
        }
        if let Some(v) = self.sentiment {
            model.sentiment = Set(v);
        }
        if let Some(v) = self.category {
            model.category = Set(non_blank(v));
        }
        if let Some(v) = self.priority {
            model.priority = Set(v);
        }
        if let Some(v) = self.competitor_mention {
            model.competitor_mention = Set(v);
        }
        if let Some(v) = self.tags {
            model.tags = Set(v.as_deref().and_then(join_tags));
        }
    }
}

/// Full replacement of one processed review and its source review
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEditItem {
    /// Processed review id
    pub id: i32,
    pub theme: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub competitor_mention: Option<CompetitorMention>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Option<Vec<String>>,
    pub rating: f64,
    pub text: String,
    pub date: DateTime<Utc>,
    pub collection_time: DateTime<Utc>,
}

/// Tags arrive either as a list or as an already-joined string
#[derive(Deserialize)]
#[serde(untagged)]
enum TagsInput {
    List(Vec<String>),
    Joined(String),
}

impl From<TagsInput> for Vec<String> {
    fn from(input: TagsInput) -> Self {
        match input {
            TagsInput::List(tags) => tags,
            TagsInput::Joined(s) => crate::vocabulary::split_tags(&s),
        }
    }
}

fn deserialize_some<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn deserialize_tags<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let input: Option<TagsInput> = Option::deserialize(deserializer)?;
    Ok(input.map(Into::into))
}

fn deserialize_tags_patch<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<Vec<String>>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_tags(deserializer).map(Some)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Persistence-time review invariants
pub fn check_review_fields(text: &str, rating: f64) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::validation("text", "Review text must not be empty"));
    }
    if !rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(AppError::validation(
            "rating",
            format!("Rating must be between {} and {}", MIN_RATING, MAX_RATING),
        ));
    }
    Ok(())
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user; the (full name, organization) pair must be new
    ///
    /// Uniqueness is enforced by `uq_users_full_name_organization`, so two
    /// concurrent registrations of the same pair cannot both succeed.
    pub async fn create_user(&self, full_name: &str, organization: &str, role: Role) -> Result<User> {
        let user = UserActiveModel {
            full_name: Set(full_name.to_string()),
            organization: Set(organization.to_string()),
            role: Set(role),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        user.insert(self.conn()).await.map_err(|e| match AppError::from(e) {
            AppError::Conflict { .. } => AppError::Conflict {
                message: format!("User '{}' already exists in '{}'", full_name, organization),
            },
            other => other,
        })
    }

    /// Find user by ID
    pub async fn find_user_by_id(&self, id: i32) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Exact match on full name and organization
    pub async fn find_user_by_identity(
        &self,
        full_name: &str,
        organization: &str,
    ) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::FullName.eq(full_name))
            .filter(UserColumn::Organization.eq(organization))
            .order_by_asc(UserColumn::Id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Administrative role change
    pub async fn set_user_role(&self, id: i32, role: Role) -> Result<User> {
        let user = self
            .find_user_by_id(id)
            .await?
            .ok_or(AppError::UserNotFound { id })?;

        let mut active = user.into_active_model();
        active.role = Set(role);
        active.update(self.conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Review Operations
    // ========================================================================

    /// Insert reviews for one owner in a single transaction
    ///
    /// Either every row commits or none does.
    pub async fn insert_reviews(&self, owner_id: i32, rows: Vec<NewReview>) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        for row in &rows {
            check_review_fields(&row.text, row.rating)?;
        }

        let count = rows.len();
        let now = Utc::now();
        let models = rows.into_iter().map(|row| ReviewActiveModel {
            text: Set(row.text),
            rating: Set(row.rating),
            date: Set(row.date),
            collection_time: Set(row.collection_time),
            user_id: Set(owner_id),
            created_at: Set(now),
            ..Default::default()
        });

        let txn = self.conn().begin().await?;
        ReviewEntity::insert_many(models)
            .exec_without_returning(&txn)
            .await?;
        txn.commit().await?;

        Ok(count)
    }

    /// Find review by ID
    pub async fn find_review_by_id(&self, id: i32) -> Result<Option<Review>> {
        ReviewEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// All reviews with their uploader, ordered by id
    pub async fn list_reviews(&self) -> Result<Vec<(Review, Option<User>)>> {
        ReviewEntity::find()
            .find_also_related(UserEntity)
            .order_by_asc(ReviewColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Processed Review Operations
    // ========================================================================

    /// Create a processed review for every review lacking one
    ///
    /// Returns the number created. Safe to run repeatedly.
    pub async fn copy_missing_reviews(&self) -> Result<u64> {
        let missing = ReviewEntity::find()
            .left_join(ProcessedReviewEntity)
            .filter(ProcessedReviewColumn::Id.is_null())
            .order_by_asc(ReviewColumn::Id)
            .all(self.conn())
            .await?;

        if missing.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let models: Vec<ProcessedReviewActiveModel> = missing
            .into_iter()
            .map(|review| ProcessedReviewActiveModel {
                review_id: Set(review.id),
                text: Set(review.text),
                rating: Set(review.rating),
                date: Set(review.date),
                collection_time: Set(review.collection_time),
                user_id: Set(review.user_id),
                theme: Set(None),
                sentiment: Set(None),
                category: Set(None),
                priority: Set(None),
                competitor_mention: Set(None),
                tags: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            })
            .collect();

        // Each row binds 14 parameters; batches stay under the SQLite and
        // Postgres bind limits. A concurrent copy may have inserted some of
        // these already.
        let mut created = 0;
        for batch in models.chunks(COPY_BATCH_ROWS) {
            created += ProcessedReviewEntity::insert_many(batch.to_vec())
                .on_conflict(
                    OnConflict::column(ProcessedReviewColumn::ReviewId)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(self.conn())
                .await?;
        }

        Ok(created)
    }

    /// Existence check by source review
    pub async fn processed_exists_for_review(&self, review_id: i32) -> Result<bool> {
        let count = ProcessedReviewEntity::find()
            .filter(ProcessedReviewColumn::ReviewId.eq(review_id))
            .count(self.conn())
            .await?;
        Ok(count > 0)
    }

    /// Find processed review by ID
    pub async fn find_processed(&self, id: i32) -> Result<Option<ProcessedReview>> {
        ProcessedReviewEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find processed review by ID or fail with not-found
    pub async fn get_processed(&self, id: i32) -> Result<ProcessedReview> {
        self.find_processed(id)
            .await?
            .ok_or(AppError::ProcessedReviewNotFound { id })
    }

    /// Processed reviews matching the filter, ordered by id
    pub async fn list_processed(&self, filter: &ProcessedFilter) -> Result<Vec<ProcessedReview>> {
        let mut query = ProcessedReviewEntity::find();
        if let Some(ref category) = filter.category {
            query = query.filter(ProcessedReviewColumn::Category.eq(category.as_str()));
        }
        if let Some(ref theme) = filter.theme {
            query = query.filter(ProcessedReviewColumn::Theme.eq(theme.as_str()));
        }

        query
            .order_by_asc(ProcessedReviewColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Processed reviews with their uploader, ordered by id
    pub async fn list_processed_with_owner(
        &self,
        filter: &ProcessedFilter,
    ) -> Result<Vec<(ProcessedReview, Option<User>)>> {
        let mut query = ProcessedReviewEntity::find().find_also_related(UserEntity);
        if let Some(ref category) = filter.category {
            query = query.filter(ProcessedReviewColumn::Category.eq(category.as_str()));
        }
        if let Some(ref theme) = filter.theme {
            query = query.filter(ProcessedReviewColumn::Theme.eq(theme.as_str()));
        }

        query
            .order_by_asc(ProcessedReviewColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Apply a partial analysis update to one processed review
    pub async fn update_analysis(&self, id: i32, patch: AnalysisPatch) -> Result<ProcessedReview> {
        let current = self.get_processed(id).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let mut active = current.into_active_model();
        patch.apply(&mut active);
        active.updated_at = Set(Utc::now());
        active.update(self.conn()).await.map_err(Into::into)
    }

    /// Persist one analyzed value
    pub async fn set_dimension(&self, id: i32, value: DimensionValue) -> Result<ProcessedReview> {
        self.update_analysis(id, AnalysisPatch::from_value(value)).await
    }

    /// Null every analysis field of one processed review
    pub async fn reset_analysis(&self, id: i32) -> Result<ProcessedReview> {
        self.update_analysis(id, AnalysisPatch::clear_all()).await
    }

    /// Null every analysis field of every processed review
    pub async fn reset_all_analysis(&self) -> Result<u64> {
        let null = || Expr::value(Value::String(None));

        let result = ProcessedReviewEntity::update_many()
            .col_expr(ProcessedReviewColumn::Theme, null())
            .col_expr(ProcessedReviewColumn::Sentiment, null())
            .col_expr(ProcessedReviewColumn::Category, null())
            .col_expr(ProcessedReviewColumn::Priority, null())
            .col_expr(ProcessedReviewColumn::CompetitorMention, null())
            .col_expr(ProcessedReviewColumn::Tags, null())
            .col_expr(ProcessedReviewColumn::UpdatedAt, Expr::value(Utc::now()))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected)
    }

    /// Replace analysis and source fields for every item, all or nothing
    pub async fn bulk_edit(&self, items: Vec<BulkEditItem>) -> Result<usize> {
        for item in &items {
            check_review_fields(&item.text, item.rating)?;
        }

        let count = items.len();
        let now = Utc::now();
        let txn = self.conn().begin().await?;

        for item in items {
            let processed = ProcessedReviewEntity::find_by_id(item.id)
                .one(&txn)
                .await?
                .ok_or(AppError::ProcessedReviewNotFound { id: item.id })?;
            let review = ReviewEntity::find_by_id(processed.review_id)
                .one(&txn)
                .await?
                .ok_or(AppError::ReviewNotFound { id: processed.review_id })?;

            let mut p = processed.into_active_model();
            p.text = Set(item.text.clone());
            p.rating = Set(item.rating);
            p.date = Set(item.date);
            p.collection_time = Set(item.collection_time);
            p.theme = Set(non_blank(item.theme));
            p.sentiment = Set(item.sentiment);
            p.category = Set(non_blank(item.category));
            p.priority = Set(item.priority);
            p.competitor_mention = Set(item.competitor_mention);
            p.tags = Set(item.tags.as_deref().and_then(join_tags));
            p.updated_at = Set(now);
            p.update(&txn).await?;

            let mut r = review.into_active_model();
            r.text = Set(item.text);
            r.rating = Set(item.rating);
            r.date = Set(item.date);
            r.collection_time = Set(item.collection_time);
            r.update(&txn).await?;
        }

        txn.commit().await?;
        Ok(count)
    }

    // ========================================================================
    // Aggregate Queries
    // ========================================================================

    /// Total processed reviews
    pub async fn count_processed(&self) -> Result<u64> {
        ProcessedReviewEntity::find()
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn count_by_sentiment(&self, sentiment: Sentiment) -> Result<u64> {
        ProcessedReviewEntity::find()
            .filter(ProcessedReviewColumn::Sentiment.eq(sentiment))
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn count_by_priority(&self, priority: Priority) -> Result<u64> {
        ProcessedReviewEntity::find()
            .filter(ProcessedReviewColumn::Priority.eq(priority))
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn count_by_competitor_mention(&self, mention: CompetitorMention) -> Result<u64> {
        ProcessedReviewEntity::find()
            .filter(ProcessedReviewColumn::CompetitorMention.eq(mention))
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Processed review count per (category, priority), unordered
    pub async fn count_by_category_priority(&self) -> Result<Vec<CategoryPriorityCount>> {
        let backend = self.conn().get_database_backend();
        let stmt = Statement::from_string(
            backend,
            "SELECT category, priority, COUNT(*) AS count \
             FROM processed_reviews \
             GROUP BY category, priority",
        );

        let rows = CategoryPriorityRow::find_by_statement(stmt)
            .all(self.conn())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| CategoryPriorityCount {
                category: row.category,
                priority: row.priority.as_deref().and_then(Priority::from_label),
                count: row.count.max(0) as u64,
            })
            .collect())
    }

    // ========================================================================
    // Recommendation Operations
    // ========================================================================

    /// Create or overwrite the recommendation stored under `key`
    pub async fn upsert_recommendation(
        &self,
        kind: RecommendationKind,
        key: &RecommendationKey,
        text: &str,
    ) -> Result<Recommendation> {
        let now = Utc::now();

        match kind {
            RecommendationKind::General => {
                let model = AiRecommendationActiveModel {
                    category: Set(key.category.clone()),
                    theme: Set(key.theme.clone()),
                    text: Set(text.to_string()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                AiRecommendationEntity::insert(model)
                    .on_conflict(
                        OnConflict::columns([
                            AiRecommendationColumn::Category,
                            AiRecommendationColumn::Theme,
                        ])
                        .update_columns([
                            AiRecommendationColumn::Text,
                            AiRecommendationColumn::UpdatedAt,
                        ])
                        .to_owned(),
                    )
                    .exec_without_returning(self.conn())
                    .await?;
            }
            RecommendationKind::Competitor => {
                let model = CompetitorRecommendationActiveModel {
                    category: Set(key.category.clone()),
                    theme: Set(key.theme.clone()),
                    text: Set(text.to_string()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                CompetitorRecommendationEntity::insert(model)
                    .on_conflict(
                        OnConflict::columns([
                            CompetitorRecommendationColumn::Category,
                            CompetitorRecommendationColumn::Theme,
                        ])
                        .update_columns([
                            CompetitorRecommendationColumn::Text,
                            CompetitorRecommendationColumn::UpdatedAt,
                        ])
                        .to_owned(),
                    )
                    .exec_without_returning(self.conn())
                    .await?;
            }
        }

        self.find_recommendation(kind, key)
            .await?
            .ok_or_else(|| AppError::Internal {
                message: format!("Recommendation for {} vanished after upsert", key),
            })
    }

    /// Stored recommendation for an exact key
    pub async fn find_recommendation(
        &self,
        kind: RecommendationKind,
        key: &RecommendationKey,
    ) -> Result<Option<Recommendation>> {
        let found = match kind {
            RecommendationKind::General => AiRecommendationEntity::find()
                .filter(AiRecommendationColumn::Category.eq(key.category.as_str()))
                .filter(AiRecommendationColumn::Theme.eq(key.theme.as_str()))
                .one(self.conn())
                .await?
                .map(Recommendation::from),
            RecommendationKind::Competitor => CompetitorRecommendationEntity::find()
                .filter(CompetitorRecommendationColumn::Category.eq(key.category.as_str()))
                .filter(CompetitorRecommendationColumn::Theme.eq(key.theme.as_str()))
                .one(self.conn())
                .await?
                .map(Recommendation::from),
        };

        Ok(found)
    }

    /// Stored recommendations, most recently updated first
    pub async fn list_recommendations(
        &self,
        kind: RecommendationKind,
        category: Option<&str>,
        theme: Option<&str>,
    ) -> Result<Vec<Recommendation>> {
        let list = match kind {
            RecommendationKind::General => {
                let mut query = AiRecommendationEntity::find();
                if let Some(category) = category {
                    query = query.filter(AiRecommendationColumn::Category.eq(category));
                }
                if let Some(theme) = theme {
                    query = query.filter(AiRecommendationColumn::Theme.eq(theme));
                }
                query
                    .order_by_desc(AiRecommendationColumn::UpdatedAt)
                    .order_by_asc(AiRecommendationColumn::Id)
                    .all(self.conn())
                    .await?
                    .into_iter()
                    .map(Recommendation::from)
                    .collect()
            }
            RecommendationKind::Competitor => {
                let mut query = CompetitorRecommendationEntity::find();
                if let Some(category) = category {
                    query = query.filter(CompetitorRecommendationColumn::Category.eq(category));
                }
                if let Some(theme) = theme {
                    query = query.filter(CompetitorRecommendationColumn::Theme.eq(theme));
                }
                query
                    .order_by_desc(CompetitorRecommendationColumn::UpdatedAt)
                    .order_by_asc(CompetitorRecommendationColumn::Id)
                    .all(self.conn())
                    .await?
                    .into_iter()
                    .map(Recommendation::from)
                    .collect()
            }
        };

        Ok(list)
    }
}
