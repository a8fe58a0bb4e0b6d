use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::advisor::{self, composer::PromptOutcome, postprocess, prompts};
use crate::errors::AppError;
use crate::guard::ChatPermit;
use crate::models::conversation::{Conversation, ConversationType, DEFAULT_TITLE};
use crate::models::file::UploadedFile;
use crate::models::message::Message;
use crate::models::user::User;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    pub user_id: Uuid,
    pub title: Option<String>,
    pub conv_type: Option<String>,
}

#[derive(Serialize)]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub user_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub content: Option<String>,
    pub title: Option<String>,
    pub conv_type: Option<String>,
    pub file_id: Option<Uuid>,
    #[serde(default)]
    pub regenerate: bool,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub conversation_id: Uuid,
    pub message: Message,
}

/// GET /api/v1/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    let conversations = sqlx::query_as::<_, Conversation>(
        "SELECT * FROM conversations WHERE user_id = $1 ORDER BY last_active_at DESC",
    )
    .bind(params.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(conversations))
}

/// POST /api/v1/conversations
///
/// Creates a conversation and best-effort adds an opening assistant
/// message. A failed opener never blocks creation.
pub async fn create_conversation(
    State(state): State<AppState>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<Conversation>), AppError> {
    let user = fetch_user(&state, req.user_id).await?;
    let conv_type = parse_conv_type(req.conv_type.as_deref())?;
    let conversation =
        insert_conversation(&state, user.id, req.title.as_deref(), conv_type).await?;

    let assessment = match advisor::get_or_create_assessment(&state.db, user.id).await {
        Ok(a) => a,
        Err(e) => {
            warn!("Assessment load failed during conversation create: {e}");
            crate::models::assessment::Assessment::empty(user.id)
        }
    };
    let greeting = advisor::generate_initial_message(&state.llm, &conversation, &assessment).await;
    if let Err(e) = insert_message(&state, conversation.id, &greeting, false).await {
        warn!(
            "Failed to store opening message for conversation {}: {e}",
            conversation.id
        );
    }

    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /api/v1/conversations/:id
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ConversationWithMessages>, AppError> {
    let conversation = fetch_owned_conversation(&state, id, params.user_id).await?;
    let messages = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ConversationWithMessages {
        conversation,
        messages,
    }))
}

/// DELETE /api/v1/conversations/:id
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM conversations WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(params.user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Conversation {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/conversations/chat
///
/// One advisor turn. With `stream: true` the reply goes out as SSE
/// `data: {"chunk": ...}` events ending in a `done` event; otherwise the
/// stored assistant message comes back as JSON. A second request for the
/// same conversation while one is in flight gets 429.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let content = req
        .content
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("content is required".to_string()))?
        .to_string();

    let user = fetch_user(&state, req.user_id).await?;
    let mut conversation = match req.conversation_id {
        Some(id) => fetch_owned_conversation(&state, id, user.id).await?,
        None => {
            let conv_type = parse_conv_type(req.conv_type.as_deref())?;
            insert_conversation(&state, user.id, req.title.as_deref(), conv_type).await?
        }
    };

    // An untyped conversation can be typed once by a later message; a set
    // type is never overwritten.
    if conversation.conv_type.is_none() {
        if let Some(t) = parse_conv_type(req.conv_type.as_deref())? {
            sqlx::query("UPDATE conversations SET conv_type = $1 WHERE id = $2")
                .bind(t.as_str())
                .bind(conversation.id)
                .execute(&state.db)
                .await?;
            conversation.conv_type = Some(t.as_str().to_string());
        }
    }

    let permit = state.chat_locks.try_acquire(conversation.id).ok_or_else(|| {
        AppError::TooManyRequests(format!(
            "A reply for conversation {} is already being generated",
            conversation.id
        ))
    })?;

    if req.regenerate {
        delete_latest_assistant_message(&state, conversation.id).await?;
    } else {
        insert_message(&state, conversation.id, &content, true).await?;
    }

    let file_content = match req.file_id {
        Some(file_id) => fetch_file_text(&state, file_id, user.id).await,
        None => None,
    };

    if req.stream {
        return Ok(stream_chat(state, user, conversation, content, file_content, permit).await);
    }

    let reply = advisor::get_ai_response(
        &state.db,
        &state.llm,
        &state.config,
        state.semantic.as_ref(),
        &user,
        &conversation,
        &content,
        file_content.as_deref(),
    )
    .await;

    let message = insert_message(&state, conversation.id, &reply, false).await?;
    touch_conversation(&state, conversation.id).await;
    advisor::maybe_generate_title(&state.db, &state.llm, &conversation).await;

    let response = ChatResponse {
        conversation_id: conversation.id,
        message,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
    // permit drops here on every path above
}

/// Streaming branch: a worker task drives the LLM and owns the permit; the
/// response forwards its chunks as SSE. The worker persists whatever text
/// accumulated even when the client disconnects mid-stream.
async fn stream_chat(
    state: AppState,
    user: User,
    conversation: Conversation,
    content: String,
    file_content: Option<String>,
    permit: ChatPermit,
) -> Response {
    let (tx, mut rx) = mpsc::channel::<String>(32);
    tokio::spawn(run_chat_worker(
        state,
        user,
        conversation,
        content,
        file_content,
        permit,
        tx,
    ));

    let stream = async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            let payload = serde_json::to_string(&json!({ "chunk": chunk }))
                .unwrap_or_else(|_| "{\"chunk\":\"\"}".to_string());
            yield Ok::<Event, Infallible>(Event::default().data(payload));
        }
        yield Ok(Event::default().event("done").data("[DONE]"));
    };

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

async fn run_chat_worker(
    state: AppState,
    user: User,
    conversation: Conversation,
    content: String,
    file_content: Option<String>,
    permit: ChatPermit,
    tx: mpsc::Sender<String>,
) {
    let (mut assessment, outcome) = advisor::compose_turn(
        &state.db,
        &state.llm,
        &state.config,
        state.semantic.as_ref(),
        &user,
        &conversation,
        &content,
        file_content.as_deref(),
    )
    .await;

    let mut accumulated = String::new();
    match outcome {
        PromptOutcome::Direct(text) => {
            let _ = tx.send(text.clone()).await;
            accumulated = text;
        }
        PromptOutcome::Prompt(_) if !state.llm.is_configured() => {
            let echo = format!("{}{content}", prompts::NOT_CONFIGURED_PREFIX);
            let _ = tx.send(echo.clone()).await;
            accumulated = echo;
        }
        PromptOutcome::Prompt(prompt) => match state.llm.generate_stream(&prompt).await {
            Ok(mut chunks) => {
                while let Some(item) = chunks.next().await {
                    match item {
                        Ok(chunk) => {
                            accumulated.push_str(&chunk);
                            if tx.send(chunk).await.is_err() {
                                // Client disconnected; stop pulling.
                                break;
                            }
                        }
                        Err(e) => {
                            let text = advisor::fallback_for_error(&e, &content);
                            accumulated.push_str(&text);
                            let _ = tx.send(text).await;
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                let text = advisor::fallback_for_error(&e, &content);
                let _ = tx.send(text.clone()).await;
                accumulated = text;
            }
        },
    }

    if !accumulated.is_empty() {
        let clean = postprocess::process_response(&state.db, &mut assessment, &accumulated).await;
        if let Err(e) = insert_message(&state, conversation.id, &clean, false).await {
            warn!(
                "Failed to store streamed reply for conversation {}: {e}",
                conversation.id
            );
        }
        touch_conversation(&state, conversation.id).await;
        advisor::maybe_generate_title(&state.db, &state.llm, &conversation).await;
    }

    drop(permit);
}

async fn fetch_user(state: &AppState, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))
}

async fn fetch_owned_conversation(
    state: &AppState,
    id: Uuid,
    user_id: Uuid,
) -> Result<Conversation, AppError> {
    sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Conversation {id} not found")))
}

async fn insert_conversation(
    state: &AppState,
    user_id: Uuid,
    title: Option<&str>,
    conv_type: Option<ConversationType>,
) -> Result<Conversation, AppError> {
    let title = title
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_TITLE);

    let conversation = sqlx::query_as::<_, Conversation>(
        "INSERT INTO conversations (user_id, title, conv_type)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(user_id)
    .bind(title)
    .bind(conv_type.map(|t| t.as_str()))
    .fetch_one(&state.db)
    .await?;
    Ok(conversation)
}

fn parse_conv_type(raw: Option<&str>) -> Result<Option<ConversationType>, AppError> {
    match raw {
        None => Ok(None),
        Some(s) => s
            .parse::<ConversationType>()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Unknown conv_type '{s}'"))),
    }
}

async fn insert_message(
    state: &AppState,
    conversation_id: Uuid,
    content: &str,
    is_user: bool,
) -> Result<Message, AppError> {
    let message = sqlx::query_as::<_, Message>(
        "INSERT INTO messages (conversation_id, content, is_user)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(conversation_id)
    .bind(content)
    .bind(is_user)
    .fetch_one(&state.db)
    .await?;
    Ok(message)
}

/// `regenerate: true` drops the latest assistant message so the advisor
/// answers the existing user turn again.
async fn delete_latest_assistant_message(
    state: &AppState,
    conversation_id: Uuid,
) -> Result<(), AppError> {
    sqlx::query(
        "DELETE FROM messages WHERE id = (
             SELECT id FROM messages
             WHERE conversation_id = $1 AND is_user = FALSE
             ORDER BY created_at DESC
             LIMIT 1
         )",
    )
    .bind(conversation_id)
    .execute(&state.db)
    .await?;
    Ok(())
}

async fn fetch_file_text(state: &AppState, file_id: Uuid, user_id: Uuid) -> Option<String> {
    let result = sqlx::query_as::<_, UploadedFile>(
        "SELECT * FROM uploaded_files WHERE id = $1 AND user_id = $2",
    )
    .bind(file_id)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await;

    match result {
        Ok(file) => file.map(|f| f.text_content),
        Err(e) => {
            warn!("Failed to load file {file_id}: {e}");
            None
        }
    }
}

async fn touch_conversation(state: &AppState, conversation_id: Uuid) {
    if let Err(e) = sqlx::query("UPDATE conversations SET last_active_at = NOW() WHERE id = $1")
        .bind(conversation_id)
        .execute(&state.db)
        .await
    {
        warn!("Failed to touch conversation {conversation_id}: {e}");
    }
}
