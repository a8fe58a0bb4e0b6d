//! Advisor core: prompt composition, the business validation stepper,
//! knowledge lookup, response post-processing and the orchestration glue
//! that turns a user message into an assistant reply.
//!
//! The advisor never errors toward the chat route. Every failure tier has a
//! canned fallback, so a reply string always comes back.

pub mod composer;
pub mod knowledge;
pub mod postprocess;
pub mod prompts;
pub mod stepper;

use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::advisor::composer::PromptOutcome;
use crate::advisor::knowledge::SemanticSearch;
use crate::config::Config;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::assessment::Assessment;
use crate::models::conversation::Conversation;
use crate::models::message::Message;
use crate::models::user::User;

/// User messages required before a default-titled conversation gets an
/// auto-generated title.
const TITLE_MIN_USER_MESSAGES: i64 = 3;
/// Hard cap on auto-generated title length, in characters.
const TITLE_MAX_CHARS: usize = 60;
/// Messages of context carried into each prompt.
const HISTORY_WINDOW: i64 = 10;

/// Loads the user's assessment row, creating an empty one on first touch.
pub async fn get_or_create_assessment(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Assessment, sqlx::Error> {
    let existing = sqlx::query_as::<_, Assessment>(
        "SELECT * FROM user_assessments WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    if let Some(assessment) = existing {
        return Ok(assessment);
    }

    sqlx::query_as::<_, Assessment>(
        "INSERT INTO user_assessments (user_id) VALUES ($1) RETURNING *",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Last `HISTORY_WINDOW` messages of the conversation, oldest first,
/// rendered as labeled lines. Errors degrade to an empty history.
pub async fn build_history(pool: &PgPool, conversation_id: Uuid) -> String {
    let result = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages
         WHERE conversation_id = $1
         ORDER BY created_at DESC
         LIMIT $2",
    )
    .bind(conversation_id)
    .bind(HISTORY_WINDOW)
    .fetch_all(pool)
    .await;

    match result {
        Ok(mut messages) => {
            messages.reverse();
            format_history(&messages)
        }
        Err(e) => {
            warn!("Failed to load history for conversation {conversation_id}: {e}");
            String::new()
        }
    }
}

fn format_history(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let speaker = if m.is_user { "Користувач" } else { "Радник" };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Composes the turn: loads assessment and history, then asks the composer
/// for either a ready direct reply or a prompt to send to the LLM.
pub async fn compose_turn(
    pool: &PgPool,
    llm: &LlmClient,
    config: &Config,
    semantic: &dyn SemanticSearch,
    user: &User,
    conversation: &Conversation,
    content: &str,
    file_content: Option<&str>,
) -> (Assessment, PromptOutcome) {
    let assessment = match get_or_create_assessment(pool, user.id).await {
        Ok(a) => a,
        Err(e) => {
            warn!("Failed to load assessment for user {}: {e}", user.id);
            Assessment::empty(user.id)
        }
    };
    let history = build_history(pool, conversation.id).await;

    let outcome = composer::build_prompt(
        pool,
        llm,
        config,
        user,
        &assessment,
        conversation,
        &history,
        content,
        file_content,
        semantic,
    )
    .await;

    (assessment, outcome)
}

/// Full non-streaming reply for one user message. Never errors: the
/// unconfigured client echoes, LLM failures surface as prefixed text, and
/// safety blocks get a fixed notice.
#[allow(clippy::too_many_arguments)]
pub async fn get_ai_response(
    pool: &PgPool,
    llm: &LlmClient,
    config: &Config,
    semantic: &dyn SemanticSearch,
    user: &User,
    conversation: &Conversation,
    content: &str,
    file_content: Option<&str>,
) -> String {
    let (mut assessment, outcome) =
        compose_turn(pool, llm, config, semantic, user, conversation, content, file_content).await;

    let prompt = match outcome {
        PromptOutcome::Direct(reply) => return reply,
        PromptOutcome::Prompt(prompt) => prompt,
    };

    if !llm.is_configured() {
        return format!("{}{content}", prompts::NOT_CONFIGURED_PREFIX);
    }

    match llm.generate(&prompt).await {
        Ok(raw) => postprocess::process_response(pool, &mut assessment, &raw).await,
        Err(e) => fallback_for_error(&e, content),
    }
}

/// Canned reply text for an LLM failure.
pub fn fallback_for_error(err: &LlmError, content: &str) -> String {
    match err {
        LlmError::NotConfigured => format!("{}{content}", prompts::NOT_CONFIGURED_PREFIX),
        LlmError::Blocked => prompts::BLOCKED_RESPONSE.to_string(),
        other => format!("{}{other}", prompts::LLM_ERROR_PREFIX),
    }
}

/// Opening assistant message for a fresh conversation.
pub async fn generate_initial_message(
    llm: &LlmClient,
    conversation: &Conversation,
    assessment: &Assessment,
) -> String {
    if !llm.is_configured() {
        return prompts::FALLBACK_GREETING.to_string();
    }

    let system_prompt = match conversation.conv_type() {
        Some(t) => prompts::system_prompt_for(t),
        None => prompts::ASSESSMENT_SYSTEM_PROMPT,
    };
    let prompt = prompts::INITIAL_MESSAGE_TEMPLATE
        .replace("{system_prompt}", system_prompt)
        .replace(
            "{user_context}",
            &composer::format_assessment_context(assessment),
        );

    match llm.generate(&prompt).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Initial message generation failed: {e}");
            prompts::FALLBACK_GREETING.to_string()
        }
    }
}

/// Replaces the default title once the conversation has enough substance.
/// Returns the new title when one was generated and persisted.
pub async fn maybe_generate_title(
    pool: &PgPool,
    llm: &LlmClient,
    conversation: &Conversation,
) -> Option<String> {
    if !conversation.has_default_title() {
        return None;
    }

    let user_messages: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM messages WHERE conversation_id = $1 AND is_user = TRUE",
    )
    .bind(conversation.id)
    .fetch_one(pool)
    .await
    .ok()?;
    if user_messages < TITLE_MIN_USER_MESSAGES {
        return None;
    }

    let generated = if llm.is_configured() {
        let conversation_text = build_history(pool, conversation.id).await;
        let label = conversation
            .conv_type()
            .map(|t| t.label())
            .unwrap_or("Загальна консультація");
        let prompt = prompts::TITLE_PROMPT_TEMPLATE
            .replace("{conv_type_label}", label)
            .replace("{conversation_text}", &conversation_text);

        match llm.generate(&prompt).await {
            Ok(raw) => clean_title(&raw),
            Err(e) => {
                warn!(
                    "Title generation failed for conversation {}: {e}",
                    conversation.id
                );
                None
            }
        }
    } else {
        None
    };

    // Without a usable generated title, fall back to a snippet of the
    // opening user message.
    let title = match generated {
        Some(title) => title,
        None => clean_title(&first_user_message(pool, conversation.id).await?)?,
    };
    if let Err(e) = sqlx::query("UPDATE conversations SET title = $1, updated_at = NOW() WHERE id = $2")
        .bind(&title)
        .bind(conversation.id)
        .execute(pool)
        .await
    {
        warn!("Failed to persist title for conversation {}: {e}", conversation.id);
        return None;
    }

    info!("Conversation {} titled \"{title}\"", conversation.id);
    Some(title)
}

async fn first_user_message(pool: &PgPool, conversation_id: Uuid) -> Option<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT content FROM messages
         WHERE conversation_id = $1 AND is_user = TRUE
         ORDER BY created_at ASC
         LIMIT 1",
    )
    .bind(conversation_id)
    .fetch_optional(pool)
    .await
    .ok()
    .flatten()
}

/// Normalizes a model-produced title: first line only, quotes and label
/// prefixes stripped, capped at `TITLE_MAX_CHARS`. `None` if nothing
/// usable remains.
fn clean_title(raw: &str) -> Option<String> {
    let line = raw.lines().next()?.trim();
    let line = line
        .trim_start_matches("Назва:")
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '«' | '»' | '*'))
        .trim();

    if line.is_empty() {
        return None;
    }
    Some(line.chars().take(TITLE_MAX_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(content: &str, is_user: bool) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            content: content.to_string(),
            is_user,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_history_labels_speakers() {
        let history = format_history(&[
            message("Привіт", true),
            message("Вітаю! Чим допомогти?", false),
        ]);
        assert_eq!(history, "Користувач: Привіт\nРадник: Вітаю! Чим допомогти?");
    }

    #[test]
    fn test_format_history_empty() {
        assert_eq!(format_history(&[]), "");
    }

    #[test]
    fn test_clean_title_strips_quotes_and_prefix() {
        assert_eq!(
            clean_title("Назва: \"Пошук роботи зварником\"").as_deref(),
            Some("Пошук роботи зварником")
        );
        assert_eq!(
            clean_title("«Валідація ідеї кав'ярні»\nдодатковий текст").as_deref(),
            Some("Валідація ідеї кав'ярні")
        );
    }

    #[test]
    fn test_clean_title_caps_length() {
        let long = "а".repeat(120);
        assert_eq!(clean_title(&long).unwrap().chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_clean_title_rejects_empty() {
        assert_eq!(clean_title("  \"\"  "), None);
        assert_eq!(clean_title(""), None);
    }

    #[test]
    fn test_fallback_for_error_variants() {
        assert_eq!(
            fallback_for_error(&LlmError::NotConfigured, "привіт"),
            "(LLM не налаштовано) Ехо: привіт"
        );
        assert_eq!(
            fallback_for_error(&LlmError::Blocked, "x"),
            prompts::BLOCKED_RESPONSE
        );
        let api_err = LlmError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(fallback_for_error(&api_err, "x").starts_with("(Помилка LLM) "));
    }
}
