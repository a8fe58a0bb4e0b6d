use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Placeholder title given to conversations created without one. Auto-titling
/// only ever replaces this value, never a user- or previously-AI-set title.
pub const DEFAULT_TITLE: &str = "Нова розмова";

/// Closed set of advisory purposes a conversation can be tagged with.
/// Stored as snake_case text in the `conv_type` column; an empty or unknown
/// value means the conversation is untyped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    Business,
    SelfEmployment,
    Hiring,
    Education,
    CareerPath,
}

impl ConversationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::Business => "business",
            ConversationType::SelfEmployment => "self_employment",
            ConversationType::Hiring => "hiring",
            ConversationType::Education => "education",
            ConversationType::CareerPath => "career_path",
        }
    }

    /// Human-readable Ukrainian label, used in the title-generation prompt.
    pub fn label(&self) -> &'static str {
        match self {
            ConversationType::Business => "Власний бізнес",
            ConversationType::SelfEmployment => "Самозайнятість",
            ConversationType::Hiring => "Наймана робота",
            ConversationType::Education => "Навчання",
            ConversationType::CareerPath => "Кар'єрний шлях",
        }
    }
}

impl FromStr for ConversationType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "business" => Ok(ConversationType::Business),
            "self_employment" => Ok(ConversationType::SelfEmployment),
            "hiring" => Ok(ConversationType::Hiring),
            "education" => Ok(ConversationType::Education),
            "career_path" => Ok(ConversationType::CareerPath),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub conv_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Conversation {
    /// Parsed conversation type; `None` for untyped or unrecognized tags.
    pub fn conv_type(&self) -> Option<ConversationType> {
        self.conv_type
            .as_deref()
            .and_then(|s| ConversationType::from_str(s).ok())
    }

    pub fn has_default_title(&self) -> bool {
        self.title.is_empty() || self.title == DEFAULT_TITLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(title: &str, conv_type: Option<&str>) -> Conversation {
        Conversation {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: title.to_string(),
            conv_type: conv_type.map(String::from),
            created_at: Utc::now(),
            last_active_at: Utc::now(),
        }
    }

    #[test]
    fn test_conv_type_parses_known_tags() {
        assert_eq!(
            conversation("x", Some("business")).conv_type(),
            Some(ConversationType::Business)
        );
        assert_eq!(
            conversation("x", Some("self_employment")).conv_type(),
            Some(ConversationType::SelfEmployment)
        );
    }

    #[test]
    fn test_conv_type_unknown_or_empty_is_untyped() {
        assert_eq!(conversation("x", Some("")).conv_type(), None);
        assert_eq!(conversation("x", Some("cooking")).conv_type(), None);
        assert_eq!(conversation("x", None).conv_type(), None);
    }

    #[test]
    fn test_default_title_detection() {
        assert!(conversation("", None).has_default_title());
        assert!(conversation(DEFAULT_TITLE, None).has_default_title());
        assert!(!conversation("Пошук роботи", None).has_default_title());
    }
}
