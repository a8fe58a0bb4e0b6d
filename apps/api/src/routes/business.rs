use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::business::{BusinessIdea, IdeaStatus};
use crate::routes::conversations::UserIdQuery;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateIdeaRequest {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateIdeaRequest {
    pub user_id: Uuid,
    pub title: Option<String>,
    pub status: Option<String>,
    pub business_canvas: Option<Map<String, Value>>,
}

/// GET /api/v1/business-ideas
pub async fn list_ideas(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<BusinessIdea>>, AppError> {
    let ideas = sqlx::query_as::<_, BusinessIdea>(
        "SELECT * FROM business_ideas WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(params.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(ideas))
}

/// POST /api/v1/business-ideas
pub async fn create_idea(
    State(state): State<AppState>,
    Json(req): Json<CreateIdeaRequest>,
) -> Result<(StatusCode, Json<BusinessIdea>), AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title is required".to_string()));
    }

    let mut canvas = Map::new();
    let raw_idea = req.description.as_deref().unwrap_or(title);
    canvas.insert("raw_idea".to_string(), Value::String(raw_idea.to_string()));

    let idea = sqlx::query_as::<_, BusinessIdea>(
        "INSERT INTO business_ideas (user_id, title, status, business_canvas)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(req.user_id)
    .bind(title)
    .bind(IdeaStatus::Brainstorm.as_str())
    .bind(Value::Object(canvas))
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(idea)))
}

/// GET /api/v1/business-ideas/:id
pub async fn get_idea(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<BusinessIdea>, AppError> {
    let idea = fetch_owned_idea(&state, id, params.user_id).await?;
    Ok(Json(idea))
}

/// PATCH /api/v1/business-ideas/:id
pub async fn update_idea(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateIdeaRequest>,
) -> Result<Json<BusinessIdea>, AppError> {
    let mut idea = fetch_owned_idea(&state, id, req.user_id).await?;

    if let Some(title) = req.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        idea.title = title;
    }
    if let Some(status) = req.status {
        let parsed = status
            .parse::<IdeaStatus>()
            .map_err(|_| AppError::Validation(format!("Unknown status '{status}'")))?;
        idea.status = parsed.as_str().to_string();
    }
    if let Some(canvas) = req.business_canvas {
        idea.business_canvas = canvas;
    }

    let idea = sqlx::query_as::<_, BusinessIdea>(
        "UPDATE business_ideas
         SET title = $1, status = $2, business_canvas = $3, updated_at = NOW()
         WHERE id = $4
         RETURNING *",
    )
    .bind(&idea.title)
    .bind(&idea.status)
    .bind(Value::Object(idea.business_canvas.clone()))
    .bind(idea.id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(idea))
}

/// DELETE /api/v1/business-ideas/:id
pub async fn delete_idea(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM business_ideas WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(params.user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Business idea {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_owned_idea(
    state: &AppState,
    id: Uuid,
    user_id: Uuid,
) -> Result<BusinessIdea, AppError> {
    sqlx::query_as::<_, BusinessIdea>("SELECT * FROM business_ideas WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Business idea {id} not found")))
}
