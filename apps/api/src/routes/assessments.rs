use axum::{
    extract::{Query, State},
    Json,
};

use crate::advisor;
use crate::errors::AppError;
use crate::models::assessment::{Assessment, Question, ASSESSMENT_QUESTIONS};
use crate::routes::conversations::UserIdQuery;
use crate::state::AppState;

/// GET /api/v1/assessment
///
/// Returns the user's profile, creating an empty one on first access so the
/// client always has a row to render.
pub async fn get_assessment(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Assessment>, AppError> {
    let assessment = advisor::get_or_create_assessment(&state.db, params.user_id).await?;
    Ok(Json(assessment))
}

/// GET /api/v1/assessment/questions
pub async fn get_questions() -> Json<&'static [Question]> {
    Json(ASSESSMENT_QUESTIONS)
}
