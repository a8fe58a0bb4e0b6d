#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Upload metadata plus the pre-extracted text that chat attaches as
/// context. The upload transport itself lives outside this service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadedFile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub text_content: String,
    pub created_at: DateTime<Utc>,
}
