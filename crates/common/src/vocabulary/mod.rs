//! Closed analysis vocabularies
//!
//! Sentiment, priority and competitor mention are stored as fixed codes.
//! Free-form labels coming from spreadsheets, older clients or the text
//! generation service (including the legacy Russian labels such as
//! "Негативный" or "Очень важный") are translated here and nowhere else.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delimiter used when tags are stored as a single column
pub const TAG_DELIMITER: char = ',';

/// Lowercase, trim and strip the punctuation models like to wrap answers in
fn normalize(label: &str) -> String {
    label
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '«' || c == '»' || c == '`')
        .trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Sentiment {
    #[sea_orm(string_value = "positive")]
    Positive,
    #[sea_orm(string_value = "neutral")]
    Neutral,
    #[sea_orm(string_value = "negative")]
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    /// Parse a stored code, an English label or a legacy label
    pub fn from_label(label: &str) -> Option<Self> {
        match normalize(label).as_str() {
            "positive" | "позитивный" | "позитивная" | "позитивные" | "положительный" => {
                Some(Sentiment::Positive)
            }
            "neutral" | "нейтральный" | "нейтральная" | "нейтральные" => Some(Sentiment::Neutral),
            "negative" | "негативный" | "негативная" | "негативные" | "отрицательный" => {
                Some(Sentiment::Negative)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Priority {
    #[sea_orm(string_value = "very_important")]
    VeryImportant,
    #[sea_orm(string_value = "important")]
    Important,
    #[sea_orm(string_value = "ordinary")]
    Ordinary,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::VeryImportant => "very_important",
            Priority::Important => "important",
            Priority::Ordinary => "ordinary",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match normalize(label).as_str() {
            "very important" | "critical" | "очень важный" | "очень важно" | "критичный" => {
                Some(Priority::VeryImportant)
            }
            "important" | "важный" | "важно" => Some(Priority::Important),
            "ordinary" | "normal" | "low" | "обычный" | "не важный" | "неважный" => {
                Some(Priority::Ordinary)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(try_from = "String")]
pub enum CompetitorMention {
    #[sea_orm(string_value = "true")]
    #[serde(rename = "true")]
    Mentioned,
    #[sea_orm(string_value = "false")]
    #[serde(rename = "false")]
    NotMentioned,
}

impl CompetitorMention {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompetitorMention::Mentioned => "true",
            CompetitorMention::NotMentioned => "false",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match normalize(label).as_str() {
            "true" | "1" | "yes" | "mentioned" | "да" => Some(CompetitorMention::Mentioned),
            "false" | "0" | "no" | "not mentioned" | "нет" => Some(CompetitorMention::NotMentioned),
            _ => None,
        }
    }
}

macro_rules! label_conversions {
    ($ty:ident, $what:literal) => {
        impl TryFrom<String> for $ty {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                $ty::from_label(&value).ok_or_else(|| format!("unknown {} '{}'", $what, value))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

label_conversions!(Sentiment, "sentiment");
label_conversions!(Priority, "priority");
label_conversions!(CompetitorMention, "competitor mention");

/// One analysis attribute of a processed review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Theme,
    Category,
    Tags,
    Sentiment,
    Priority,
    CompetitorMention,
}

impl Dimension {
    /// Fixed order used by the sequential analysis pass
    pub const ALL: [Dimension; 6] = [
        Dimension::Theme,
        Dimension::Category,
        Dimension::Tags,
        Dimension::Sentiment,
        Dimension::Priority,
        Dimension::CompetitorMention,
    ];

    /// Field name used in JSON responses
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Theme => "theme",
            Dimension::Category => "category",
            Dimension::Tags => "tags",
            Dimension::Sentiment => "sentiment",
            Dimension::Priority => "priority",
            Dimension::CompetitorMention => "competitorMention",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value produced by analyzing one dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DimensionValue {
    Theme(String),
    Category(String),
    Tags(Vec<String>),
    Sentiment(Sentiment),
    Priority(Priority),
    CompetitorMention(CompetitorMention),
}

impl DimensionValue {
    pub fn dimension(&self) -> Dimension {
        match self {
            DimensionValue::Theme(_) => Dimension::Theme,
            DimensionValue::Category(_) => Dimension::Category,
            DimensionValue::Tags(_) => Dimension::Tags,
            DimensionValue::Sentiment(_) => Dimension::Sentiment,
            DimensionValue::Priority(_) => Dimension::Priority,
            DimensionValue::CompetitorMention(_) => Dimension::CompetitorMention,
        }
    }
}

/// Join tags into their stored form, or `None` when there are none
pub fn join_tags(tags: &[String]) -> Option<String> {
    let cleaned: Vec<String> = tags
        .iter()
        .map(|t| t.replace(TAG_DELIMITER, " ").trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join(&format!("{} ", TAG_DELIMITER)))
    }
}

/// Split a stored tag column back into an ordered list
pub fn split_tags(stored: &str) -> Vec<String> {
    stored
        .split(TAG_DELIMITER)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
