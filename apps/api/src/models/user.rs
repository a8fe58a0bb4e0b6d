#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Set once the user has committed to a career path. While false and the
    /// conversation is untyped, the advisor stays in the onboarding flow.
    pub career_selected: bool,
    pub created_at: DateTime<Utc>,
}
