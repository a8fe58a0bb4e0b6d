pub mod assessments;
pub mod business;
pub mod conversations;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Conversations & chat
        .route(
            "/api/v1/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/api/v1/conversations/:id",
            get(conversations::get_conversation).delete(conversations::delete_conversation),
        )
        .route("/api/v1/conversations/chat", post(conversations::chat))
        // Business idea validation
        .route(
            "/api/v1/business-ideas",
            get(business::list_ideas).post(business::create_idea),
        )
        .route(
            "/api/v1/business-ideas/:id",
            get(business::get_idea)
                .patch(business::update_idea)
                .delete(business::delete_idea),
        )
        // Assessment profile
        .route("/api/v1/assessment", get(assessments::get_assessment))
        .route(
            "/api/v1/assessment/questions",
            get(assessments::get_questions),
        )
        .with_state(state)
}
