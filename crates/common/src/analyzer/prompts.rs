//! Prompt construction and reply parsing

use crate::db::{RecommendationKey, RecommendationKind};
use crate::errors::{AppError, Result};
use crate::vocabulary::{CompetitorMention, Dimension, DimensionValue, Priority, Sentiment};
use regex_lite::Regex;
use std::sync::LazyLock;

/// Longest theme or category kept from a reply
const MAX_LABEL_CHARS: usize = 80;

/// Most tags kept from a reply
const MAX_TAGS: usize = 8;

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s*").expect("valid regex"));

/// Prompt for a single analysis dimension
pub fn analysis_prompt(dimension: Dimension, text: &str) -> String {
    let task = match dimension {
        Dimension::Theme => {
            "Name the main theme of this customer review in two to four words. \
             Reply with the theme only, in the language of the review."
        }
        Dimension::Category => {
            "Assign this customer review to one short business category such as \
             Service, Pricing, Delivery, Product quality or Staff. \
             Reply with the category only, in the language of the review."
        }
        Dimension::Tags => {
            "List up to five short keyword tags for this customer review. \
             Reply with the tags separated by commas and nothing else."
        }
        Dimension::Sentiment => {
            "Classify the sentiment of this customer review. \
             Reply with exactly one word: positive, neutral or negative."
        }
        Dimension::Priority => {
            "How urgently should the business react to this customer review? \
             Reply with exactly one of: very important, important, ordinary."
        }
        Dimension::CompetitorMention => {
            "Does this customer review mention or compare with a competitor? \
             Reply with exactly one word: true or false."
        }
    };

    format!("{}\n\nReview:\n{}", task, text.trim())
}

/// Prompt for recommendation text
pub fn recommendation_prompt(kind: RecommendationKind, key: &RecommendationKey) -> String {
    let topic = if key.theme.is_empty() {
        format!("\"{}\"", key.category)
    } else {
        format!("\"{}\" (theme \"{}\")", key.category, key.theme)
    };

    match kind {
        RecommendationKind::General => format!(
            "Based on customer reviews about {} write a short recommendation for improving \
             the service or product. Answer with one specific sentence that is useful for the business.",
            topic
        ),
        RecommendationKind::Competitor => format!(
            "Customers compare us with competitors when writing about {}. Write a short \
             recommendation on how to outperform competitors there. Answer with one specific sentence.",
            topic
        ),
    }
}

/// Turn a raw reply into a typed dimension value
pub fn parse_reply(dimension: Dimension, reply: &str) -> Result<DimensionValue> {
    let value = match dimension {
        Dimension::Theme => parse_label(reply).map(DimensionValue::Theme),
        Dimension::Category => parse_label(reply).map(DimensionValue::Category),
        Dimension::Tags => {
            let tags = parse_tags(reply);
            (!tags.is_empty()).then_some(DimensionValue::Tags(tags))
        }
        Dimension::Sentiment => find_label(reply, Sentiment::from_label).map(DimensionValue::Sentiment),
        Dimension::Priority => find_label(reply, Priority::from_label).map(DimensionValue::Priority),
        Dimension::CompetitorMention => {
            find_label(reply, CompetitorMention::from_label).map(DimensionValue::CompetitorMention)
        }
    };

    value.ok_or_else(|| AppError::Analyzer {
        message: format!("Unrecognised {} reply: {:?}", dimension, truncate(reply, 120)),
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Drop a leading "Theme:"-style prefix the model echoes back
fn strip_prefix(line: &str) -> &str {
    match line.split_once(':') {
        Some((head, tail)) if head.chars().count() <= 20 && !tail.trim().is_empty() => {
            let head = head.trim().to_lowercase();
            let known = [
                "theme", "category", "tags", "sentiment", "priority", "answer", "тема",
                "категория", "теги", "тональность", "приоритет", "ответ",
            ];
            if known.contains(&head.as_str()) {
                tail.trim()
            } else {
                line
            }
        }
        _ => line,
    }
}

fn clean(fragment: &str) -> String {
    let unlisted = LIST_MARKER.replace(fragment, "");
    unlisted
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '«' | '»' | '`' | '.' | '#'))
        .trim()
        .to_string()
}

fn parse_label(reply: &str) -> Option<String> {
    reply
        .lines()
        .map(|l| clean(strip_prefix(l.trim())))
        .find(|l| !l.is_empty())
        .map(|l| truncate(&l, MAX_LABEL_CHARS))
}

fn parse_tags(reply: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for line in reply.lines() {
        for fragment in strip_prefix(line.trim()).split([',', ';']) {
            let tag = clean(fragment).to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags.truncate(MAX_TAGS);
    tags
}

/// Words that flip the label that follows them
const NEGATIONS: [&str; 3] = ["not", "never", "не"];

/// Find a vocabulary label anywhere in the reply
///
/// Tries the whole reply, then each line, then word pairs and single words.
/// Candidates right after a negation are skipped.
fn find_label<T>(reply: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    if let Some(v) = parse(reply) {
        return Some(v);
    }

    for line in reply.lines() {
        if let Some(v) = parse(strip_prefix(line.trim())) {
            return Some(v);
        }
    }

    let words: Vec<String> = reply
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let negated = |i: usize, reach: usize| {
        words[i.saturating_sub(reach)..i]
            .iter()
            .any(|w| NEGATIONS.contains(&w.as_str()))
    };

    // Pairs first so "very important" wins over "important"
    for (i, pair) in words.windows(2).enumerate() {
        if negated(i, 1) {
            continue;
        }
        if let Some(v) = parse(&format!("{} {}", pair[0], pair[1])) {
            return Some(v);
        }
    }

    // A negation reaches past one modifier: "not very important"
    words
        .iter()
        .enumerate()
        .filter(|(i, _)| !negated(*i, 2))
        .find_map(|(_, w)| parse(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_strips_noise() {
        let value = parse_reply(Dimension::Theme, "Theme: \"Slow delivery\".\n").unwrap();
        assert_eq!(value, DimensionValue::Theme("Slow delivery".into()));

        let value = parse_reply(Dimension::Category, "\n1. Доставка").unwrap();
        assert_eq!(value, DimensionValue::Category("Доставка".into()));

        assert!(parse_reply(Dimension::Theme, "  \n ").is_err());
    }

    #[test]
    fn test_parse_tags() {
        let value = parse_reply(Dimension::Tags, "Tags: Delivery, price; delivery\n- staff").unwrap();
        assert_eq!(
            value,
            DimensionValue::Tags(vec!["delivery".into(), "price".into(), "staff".into()])
        );
    }

    #[test]
    fn test_find_label_in_sentence() {
        let value = parse_reply(Dimension::Priority, "I would say this is very important.").unwrap();
        assert_eq!(value, DimensionValue::Priority(Priority::VeryImportant));

        let value = parse_reply(Dimension::CompetitorMention, "Answer: TRUE").unwrap();
        assert_eq!(value, DimensionValue::CompetitorMention(CompetitorMention::Mentioned));

        let value = parse_reply(Dimension::Sentiment, "Тональность: нейтральный").unwrap();
        assert_eq!(value, DimensionValue::Sentiment(Sentiment::Neutral));
    }

    #[test]
    fn test_negated_labels_are_skipped() {
        assert!(parse_reply(Dimension::Priority, "This is not very important.").is_err());

        let value = parse_reply(Dimension::Sentiment, "It is not negative, rather positive").unwrap();
        assert_eq!(value, DimensionValue::Sentiment(Sentiment::Positive));

        let value = parse_reply(Dimension::Priority, "Отзыв не важный").unwrap();
        assert_eq!(value, DimensionValue::Priority(Priority::Ordinary));

        let value = parse_reply(Dimension::CompetitorMention, "Competitors are not mentioned").unwrap();
        assert_eq!(value, DimensionValue::CompetitorMention(CompetitorMention::NotMentioned));
    }

    #[test]
    fn test_recommendation_prompts_differ() {
        let key = RecommendationKey::new("Pricing", Some("Hidden fees".into()));
        let general = recommendation_prompt(RecommendationKind::General, &key);
        let competitor = recommendation_prompt(RecommendationKind::Competitor, &key);
        assert!(general.contains("Hidden fees"));
        assert!(competitor.contains("competitors"));
        assert_ne!(general, competitor);

        let untitled = recommendation_prompt(RecommendationKind::General, &RecommendationKey::new("Pricing", None));
        assert!(!untitled.contains("theme"));
    }
}
