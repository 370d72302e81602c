//! Deterministic analyzer for local runs and tests

use super::Analyzer;
use crate::db::{RecommendationKey, RecommendationKind};
use crate::errors::Result;
use crate::vocabulary::{CompetitorMention, Dimension, DimensionValue, Priority, Sentiment};
use async_trait::async_trait;

const NEGATIVE: &[&str] = &[
    "slow", "bad", "terrible", "awful", "rude", "broken", "never", "worst", "плох", "ужас",
    "медлен", "груб", "долго", "не работает", "хуже",
];
const POSITIVE: &[&str] = &[
    "great", "excellent", "good", "love", "thanks", "fast", "отлич", "хорош", "спасибо",
    "быстро", "нравится", "лучш",
];
const URGENT: &[&str] = &["never", "worst", "terrible", "fraud", "ужас", "никогда", "обман"];
const COMPETITOR: &[&str] = &["competitor", "than at", "other bank", "конкурент", "у других", "чем в"];
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Pricing", &["price", "fee", "expensive", "cost", "цен", "дорог", "комисси"]),
    ("Delivery", &["deliver", "courier", "shipping", "достав", "курьер"]),
    ("Staff", &["staff", "manager", "operator", "сотрудник", "менеджер", "оператор"]),
    ("Service", &["service", "support", "wait", "обслуж", "поддерж", "ожидан"]),
];

/// Keyword-heuristic analyzer; never calls the network
#[derive(Debug, Clone, Default)]
pub struct MockAnalyzer;

impl MockAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn sentiment(text: &str) -> Sentiment {
        let negative = NEGATIVE.iter().filter(|k| text.contains(*k)).count();
        let positive = POSITIVE.iter().filter(|k| text.contains(*k)).count();
        match negative.cmp(&positive) {
            std::cmp::Ordering::Greater => Sentiment::Negative,
            std::cmp::Ordering::Less => Sentiment::Positive,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        }
    }

    fn category(text: &str) -> &'static str {
        CATEGORIES
            .iter()
            .find(|(_, keys)| keys.iter().any(|k| text.contains(k)))
            .map(|(name, _)| *name)
            .unwrap_or("General")
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(&self, dimension: Dimension, text: &str) -> Result<DimensionValue> {
        let lowered = text.to_lowercase();

        let value = match dimension {
            Dimension::Theme => {
                let theme: Vec<&str> = text.split_whitespace().take(3).collect();
                let theme = theme.join(" ");
                DimensionValue::Theme(if theme.is_empty() { "General".to_string() } else { theme })
            }
            Dimension::Category => DimensionValue::Category(Self::category(&lowered).to_string()),
            Dimension::Tags => {
                let mut tags: Vec<String> = Vec::new();
                for word in lowered.split(|c: char| !c.is_alphanumeric()) {
                    if word.chars().count() >= 4 && !tags.iter().any(|t| t == word) {
                        tags.push(word.to_string());
                    }
                    if tags.len() == 3 {
                        break;
                    }
                }
                if tags.is_empty() {
                    tags.push("general".to_string());
                }
                DimensionValue::Tags(tags)
            }
            Dimension::Sentiment => DimensionValue::Sentiment(Self::sentiment(&lowered)),
            Dimension::Priority => {
                let priority = if URGENT.iter().any(|k| lowered.contains(k)) {
                    Priority::VeryImportant
                } else if Self::sentiment(&lowered) == Sentiment::Negative {
                    Priority::Important
                } else {
                    Priority::Ordinary
                };
                DimensionValue::Priority(priority)
            }
            Dimension::CompetitorMention => {
                let mention = if COMPETITOR.iter().any(|k| lowered.contains(k)) {
                    CompetitorMention::Mentioned
                } else {
                    CompetitorMention::NotMentioned
                };
                DimensionValue::CompetitorMention(mention)
            }
        };

        Ok(value)
    }

    async fn recommend(&self, kind: RecommendationKind, key: &RecommendationKey) -> Result<String> {
        let subject = if key.theme.is_empty() {
            key.category.clone()
        } else {
            format!("{} ({})", key.category, key.theme)
        };

        Ok(match kind {
            RecommendationKind::General => format!("Review recurring complaints about {} and fix the top cause.", subject),
            RecommendationKind::Competitor => format!("Match or beat competitor offers on {}.", subject),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_heuristics() {
        let analyzer = MockAnalyzer::new();
        let text = "Terrible support, the wait was slow and worse than at the other bank";

        assert_eq!(
            analyzer.analyze(Dimension::Sentiment, text).await.unwrap(),
            DimensionValue::Sentiment(Sentiment::Negative)
        );
        assert_eq!(
            analyzer.analyze(Dimension::Priority, text).await.unwrap(),
            DimensionValue::Priority(Priority::VeryImportant)
        );
        assert_eq!(
            analyzer.analyze(Dimension::CompetitorMention, text).await.unwrap(),
            DimensionValue::CompetitorMention(CompetitorMention::Mentioned)
        );
        assert_eq!(
            analyzer.analyze(Dimension::Category, text).await.unwrap(),
            DimensionValue::Category("Service".into())
        );
    }

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let analyzer = MockAnalyzer::new();
        let a = analyzer.analyze(Dimension::Tags, "Отличная доставка, спасибо курьеру").await.unwrap();
        let b = analyzer.analyze(Dimension::Tags, "Отличная доставка, спасибо курьеру").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a,
            DimensionValue::Tags(vec!["отличная".into(), "доставка".into(), "спасибо".into()])
        );
    }
}
