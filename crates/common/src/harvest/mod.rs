//! Review harvesting from paginated listing pages
//!
//! A `ReviewPage` exposes the cards currently rendered and an `advance` step
//! that asks for more (scrolling, in a browser). The `Harvester` drives it:
//! it yields deduplicated records lazily, bounds every `advance` with its own
//! timeout, and stops once an advance no longer grows the card count.

mod export;
mod snapshot;

pub use export::{normalize_card_date, render_spreadsheet, to_ingest_rows};
pub use snapshot::SnapshotPage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Harvesting errors
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("page error: {0}")]
    Page(String),

    #[error("advance did not complete within {0:?}")]
    AdvanceTimeout(Duration),
}

/// A review card as rendered on the page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub text: Option<String>,
    /// Date as displayed, e.g. "12 марта 2024"
    pub date: Option<String>,
    /// Filled stars; `None` when the card shows no rating
    pub rating: Option<u8>,
}

/// One harvested review
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestedReview {
    pub date: String,
    pub collected_at: DateTime<Utc>,
    pub rating: Option<u8>,
    pub text: String,
}

/// Source of review cards
#[async_trait]
pub trait ReviewPage: Send {
    /// Every card currently rendered, in page order
    async fn visible_cards(&mut self) -> Result<Vec<Card>, HarvestError>;

    /// Ask the page for more cards; resolves once new content had a chance to load
    async fn advance(&mut self) -> Result<(), HarvestError>;
}

/// Harvest limits
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Stop after this many records
    pub limit: usize,
    /// Upper bound on a single `advance`
    pub advance_timeout: Duration,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            advance_timeout: Duration::from_secs(10),
        }
    }
}

/// Stateful, finite iterator over deduplicated reviews
///
/// Records are keyed by (text, date). A harvester cannot be restarted; build
/// a new one to start from empty state.
pub struct Harvester<P> {
    page: P,
    config: HarvestConfig,
    seen: HashSet<(String, String)>,
    pending: VecDeque<HarvestedReview>,
    yielded: usize,
    last_card_count: usize,
    scanned: bool,
    exhausted: bool,
}

impl<P: ReviewPage> Harvester<P> {
    pub fn new(page: P, config: HarvestConfig) -> Self {
        Self {
            page,
            config,
            seen: HashSet::new(),
            pending: VecDeque::new(),
            yielded: 0,
            last_card_count: 0,
            scanned: false,
            exhausted: false,
        }
    }

    /// Number of records yielded so far
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Next unseen record, or `None` once the limit is hit or the page is exhausted
    pub async fn next(&mut self) -> Result<Option<HarvestedReview>, HarvestError> {
        loop {
            if self.yielded >= self.config.limit {
                return Ok(None);
            }
            if let Some(review) = self.pending.pop_front() {
                self.yielded += 1;
                return Ok(Some(review));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.scan().await?;
        }
    }

    async fn scan(&mut self) -> Result<(), HarvestError> {
        if self.scanned {
            tokio::time::timeout(self.config.advance_timeout, self.page.advance())
                .await
                .map_err(|_| HarvestError::AdvanceTimeout(self.config.advance_timeout))??;
        }

        let cards = self.page.visible_cards().await?;
        if self.scanned && cards.len() <= self.last_card_count {
            info!(cards = cards.len(), "No new cards after advance, page exhausted");
            self.exhausted = true;
        }
        self.scanned = true;
        self.last_card_count = cards.len();

        let collected_at = Utc::now();
        for card in cards {
            let (Some(text), Some(date)) = (card.text, card.date) else {
                continue;
            };
            let text = text.trim().to_string();
            let date = date.trim().to_string();
            if text.is_empty() || !self.seen.insert((text.clone(), date.clone())) {
                continue;
            }
            debug!(date = %date, "Collected review");
            self.pending.push_back(HarvestedReview {
                date,
                collected_at,
                rating: card.rating,
                text,
            });
        }

        Ok(())
    }

    /// Drain the harvester into a vector
    pub async fn collect_all(mut self) -> Result<Vec<HarvestedReview>, HarvestError> {
        let mut out = Vec::new();
        while let Some(review) = self.next().await? {
            out.push(review);
        }
        Ok(out)
    }

    /// Lazy stream of records; ends after the first error
    pub fn into_stream(self) -> impl Stream<Item = Result<HarvestedReview, HarvestError>> {
        stream::unfold(Some(self), |state| async move {
            let mut harvester = state?;
            match harvester.next().await {
                Ok(Some(review)) => Some((Ok(review), Some(harvester))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn card(text: &str, date: &str, rating: u8) -> Card {
        Card { text: Some(text.into()), date: Some(date.into()), rating: Some(rating) }
    }

    fn growing_page() -> SnapshotPage {
        SnapshotPage::new(vec![
            vec![card("Great", "1 марта 2024", 5), card("Slow", "2 марта 2024", 2)],
            vec![
                card("Great", "1 марта 2024", 5),
                card("Slow", "2 марта 2024", 2),
                card("Great", "3 марта 2024", 4),
                Card { text: None, date: Some("4 марта 2024".into()), rating: None },
            ],
        ])
    }

    #[tokio::test]
    async fn test_dedup_and_exhaustion() {
        let harvester = Harvester::new(growing_page(), HarvestConfig { limit: 50, ..Default::default() });
        let reviews = harvester.collect_all().await.unwrap();

        let keys: Vec<(&str, &str)> = reviews.iter().map(|r| (r.text.as_str(), r.date.as_str())).collect();
        assert_eq!(
            keys,
            vec![("Great", "1 марта 2024"), ("Slow", "2 марта 2024"), ("Great", "3 марта 2024")]
        );
    }

    #[tokio::test]
    async fn test_limit_stops_early() {
        let mut harvester = Harvester::new(growing_page(), HarvestConfig { limit: 1, ..Default::default() });
        assert!(harvester.next().await.unwrap().is_some());
        assert!(harvester.next().await.unwrap().is_none());
        assert_eq!(harvester.yielded(), 1);
    }

    #[tokio::test]
    async fn test_advance_timeout() {
        let page = growing_page().with_advance_delay(Duration::from_millis(200));
        let config = HarvestConfig { limit: 50, advance_timeout: Duration::from_millis(20) };
        let results: Vec<_> = Harvester::new(page, config).into_stream().collect().await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok() && results[1].is_ok());
        assert!(matches!(results[2], Err(HarvestError::AdvanceTimeout(_))));
    }
}
