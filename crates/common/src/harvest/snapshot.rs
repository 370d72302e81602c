//! Replayable page built from captured card snapshots

use super::{Card, HarvestError, ReviewPage};
use async_trait::async_trait;
use std::time::Duration;

/// Page whose n-th `advance` reveals the n-th snapshot
///
/// Advancing past the last snapshot keeps showing it, which is how a real
/// listing looks once it has run out of reviews.
#[derive(Debug, Clone)]
pub struct SnapshotPage {
    snapshots: Vec<Vec<Card>>,
    position: usize,
    advance_delay: Duration,
}

impl SnapshotPage {
    pub fn new(snapshots: Vec<Vec<Card>>) -> Self {
        Self {
            snapshots,
            position: 0,
            advance_delay: Duration::ZERO,
        }
    }

    /// Load snapshots from a JSON array of card arrays
    pub fn from_json(json: &str) -> Result<Self, HarvestError> {
        let snapshots: Vec<Vec<Card>> =
            serde_json::from_str(json).map_err(|e| HarvestError::Page(format!("invalid snapshot file: {}", e)))?;
        Ok(Self::new(snapshots))
    }

    /// Simulated load time for every advance
    pub fn with_advance_delay(mut self, delay: Duration) -> Self {
        self.advance_delay = delay;
        self
    }
}

#[async_trait]
impl ReviewPage for SnapshotPage {
    async fn visible_cards(&mut self) -> Result<Vec<Card>, HarvestError> {
        Ok(self.snapshots.get(self.position).cloned().unwrap_or_default())
    }

    async fn advance(&mut self) -> Result<(), HarvestError> {
        if !self.advance_delay.is_zero() {
            tokio::time::sleep(self.advance_delay).await;
        }
        if self.position + 1 < self.snapshots.len() {
            self.position += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_json_and_replay() {
        let json = r#"[
            [{"text": "Good", "date": "1 мая 2024", "rating": 5}],
            [{"text": "Good", "date": "1 мая 2024", "rating": 5}, {"text": "Bad", "date": "2 мая 2024"}]
        ]"#;
        let mut page = SnapshotPage::from_json(json).unwrap();

        assert_eq!(page.visible_cards().await.unwrap().len(), 1);
        page.advance().await.unwrap();
        let cards = page.visible_cards().await.unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].rating, None);

        page.advance().await.unwrap();
        assert_eq!(page.visible_cards().await.unwrap().len(), 2);

        assert!(SnapshotPage::from_json("{}").is_err());
    }
}
