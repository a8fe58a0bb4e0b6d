#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Learning-corpus document, searched by the education-mode fallback.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct KnowledgeDocument {
    pub id: Uuid,
    pub title: String,
    pub raw_text_content: String,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}
