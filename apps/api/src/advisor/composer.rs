//! Prompt Composer — selects and fills the LLM prompt for one chat turn,
//! or short-circuits with a direct canned response from the business
//! stepper.
//!
//! Failures in sub-lookups (semantic search, the business chain) degrade to
//! the next fallback tier; nothing raises out of `build_prompt`.

use sqlx::PgPool;
use tracing::warn;

use crate::advisor::knowledge::{self, SemanticSearch};
use crate::advisor::prompts;
use crate::advisor::stepper;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::models::assessment::{Assessment, Question, ASSESSMENT_QUESTIONS};
use crate::models::conversation::{Conversation, ConversationType};
use crate::models::user::User;

/// Outcome of prompt composition: either a prompt for the LLM, or a direct
/// reply produced without a general LLM turn (the stepper's stage output).
#[derive(Debug, Clone, PartialEq)]
pub enum PromptOutcome {
    Prompt(String),
    Direct(String),
}

/// Builds the prompt (or direct response) for a chat turn.
#[allow(clippy::too_many_arguments)]
pub async fn build_prompt(
    pool: &PgPool,
    llm: &LlmClient,
    config: &Config,
    user: &User,
    assessment: &Assessment,
    conversation: &Conversation,
    history: &str,
    user_content: &str,
    file_content: Option<&str>,
    semantic: &dyn SemanticSearch,
) -> PromptOutcome {
    // Onboarding: the user has not picked a career and the conversation is
    // untyped, so the advisor interviews for the assessment profile.
    if !user.career_selected && conversation.conv_type().is_none() {
        return PromptOutcome::Prompt(build_assessment_prompt(assessment, history, user_content));
    }

    let conv_type = conversation
        .conv_type()
        .unwrap_or(ConversationType::CareerPath);
    let system_prompt = prompts::system_prompt_for(conv_type);

    let content = match file_content {
        Some(file_text) => {
            format!("{user_content}\n\n[ВКЛАДЕНИЙ ФАЙЛ]:\n{file_text}\n[КІНЕЦЬ ФАЙЛУ]")
        }
        None => user_content.to_string(),
    };

    match conv_type {
        ConversationType::Education => {
            let knowledge_context = lookup_knowledge(pool, semantic, &content).await;
            PromptOutcome::Prompt(build_education_prompt(
                system_prompt,
                assessment,
                &knowledge_context,
                history,
                &content,
            ))
        }
        ConversationType::Business => {
            let user_context = format_assessment_context(assessment);
            match stepper::advance(pool, llm, config, user, &user_context, history, &content).await
            {
                Some(outcome) => outcome,
                None => PromptOutcome::Prompt(build_business_fallback_prompt(
                    system_prompt,
                    &user_context,
                    history,
                    &content,
                )),
            }
        }
        _ => PromptOutcome::Prompt(build_typed_prompt(
            system_prompt,
            assessment,
            history,
            &content,
        )),
    }
}

/// First question in the fixed order without a usable answer.
pub fn next_unanswered_question(assessment: &Assessment) -> Option<&'static Question> {
    ASSESSMENT_QUESTIONS
        .iter()
        .find(|q| !assessment.is_answered(q.id))
}

/// Onboarding prompt: shows the answer set, names exactly one next question
/// and instructs the model to emit an update block only when it was actually
/// answered. All questions answered yields a completion acknowledgement.
pub fn build_assessment_prompt(
    assessment: &Assessment,
    history: &str,
    user_content: &str,
) -> String {
    let Some(question) = next_unanswered_question(assessment) else {
        return prompts::ASSESSMENT_COMPLETE_TEMPLATE
            .replace("{system_prompt}", prompts::ASSESSMENT_SYSTEM_PROMPT)
            .replace("{user_content}", user_content);
    };

    let current_answers_json =
        serde_json::to_string_pretty(&assessment.answers).unwrap_or_else(|_| "{}".to_string());

    prompts::ASSESSMENT_PROMPT_TEMPLATE
        .replace("{system_prompt}", prompts::ASSESSMENT_SYSTEM_PROMPT)
        .replace("{current_answers_json}", &current_answers_json)
        .replace("{question_id}", question.id)
        .replace("{question_text}", question.question)
        .replace("{history}", history)
        .replace("{user_content}", user_content)
}

/// Standard typed prompt: system prompt + language instruction + profile
/// context + standing JSON-update instructions.
pub fn build_typed_prompt(
    system_prompt: &str,
    assessment: &Assessment,
    history: &str,
    user_content: &str,
) -> String {
    prompts::TYPED_PROMPT_TEMPLATE
        .replace("{system_prompt}", system_prompt)
        .replace(
            "{lang_instruction}",
            prompts::language_instruction(assessment.preferred_language()),
        )
        .replace("{user_context}", &format_assessment_context(assessment))
        .replace("{json_instructions}", prompts::JSON_UPDATE_INSTRUCTIONS)
        .replace("{history}", history)
        .replace("{user_content}", user_content)
}

pub fn build_education_prompt(
    system_prompt: &str,
    assessment: &Assessment,
    knowledge_context: &str,
    history: &str,
    user_content: &str,
) -> String {
    prompts::EDUCATION_PROMPT_TEMPLATE
        .replace("{system_prompt}", system_prompt)
        .replace("{user_context}", &format_assessment_context(assessment))
        .replace("{knowledge_context}", knowledge_context)
        .replace(
            "{json_instructions}",
            prompts::SHORT_JSON_UPDATE_INSTRUCTIONS,
        )
        .replace("{history}", history)
        .replace("{user_content}", user_content)
}

pub fn build_business_fallback_prompt(
    system_prompt: &str,
    user_context: &str,
    history: &str,
    user_content: &str,
) -> String {
    prompts::BUSINESS_FALLBACK_TEMPLATE
        .replace("{system_prompt}", system_prompt)
        .replace("{user_context}", user_context)
        .replace("{validation_framework}", prompts::VALIDATION_FRAMEWORK)
        .replace(
            "{json_instructions}",
            prompts::SHORT_JSON_UPDATE_INSTRUCTIONS,
        )
        .replace("{history}", history)
        .replace("{user_content}", user_content)
}

/// Semantic search first; on failure or empty result, keyword fallback.
async fn lookup_knowledge(pool: &PgPool, semantic: &dyn SemanticSearch, query: &str) -> String {
    let hits = match semantic.search(query, 3).await {
        Ok(hits) if !hits.is_empty() => hits,
        Ok(_) => knowledge::keyword_search(pool, query).await,
        Err(e) => {
            warn!("Semantic search failed, falling back to keyword search: {e}");
            knowledge::keyword_search(pool, query).await
        }
    };
    knowledge::format_knowledge_context(&hits)
}

/// Human-readable profile bullet list appended to typed prompts.
pub fn format_assessment_context(assessment: &Assessment) -> String {
    if assessment.answers.is_empty() {
        return prompts::EMPTY_PROFILE_CONTEXT.to_string();
    }

    let mut parts = vec!["\n\nПРОФІЛЬ КОРИСТУВАЧА:".to_string()];

    if let Some(v) = &assessment.service_branch {
        parts.push(format!("- Військова спеціальність: {v}"));
    }
    if let Some(v) = &assessment.service_role {
        parts.push(format!("- Військова роль: {v}"));
    }
    if let Some(v) = assessment.years_of_service {
        parts.push(format!("- Років служби: {v}"));
    }
    if let Some(v) = &assessment.primary_skills {
        parts.push(format!("- Основні навички: {v}"));
    }
    if let Some(v) = &assessment.education_level {
        parts.push(format!("- Освіта: {v}"));
    }
    if let Some(v) = &assessment.work_preferences {
        parts.push(format!("- Робочі переваги: {v}"));
    }

    if let Some(goals) = assessment.answers.get("current_goals").and_then(|v| v.as_str()) {
        if !goals.is_empty() {
            parts.push(format!("- Короткострокові цілі: {goals}"));
        }
    }
    if let Some(goals) = assessment.answers.get("long_term_goals").and_then(|v| v.as_str()) {
        if !goals.is_empty() {
            parts.push(format!("- Довгострокові цілі: {goals}"));
        }
    }

    if assessment.leadership_experience {
        parts.push("- Має досвід лідерства".to_string());
    }
    if let Some(v) = &assessment.civilian_certifications {
        parts.push(format!("- Сертифікації: {v}"));
    }
    if let Some(v) = &assessment.locality {
        parts.push(format!("- Регіон: {v}"));
    }

    parts.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn assessment_with(pairs: &[(&str, serde_json::Value)]) -> Assessment {
        let mut a = Assessment::empty(Uuid::new_v4());
        for (k, v) in pairs {
            a.answers.insert(k.to_string(), v.clone());
        }
        a.sync_convenience_fields();
        a
    }

    #[test]
    fn test_empty_answers_ask_first_question() {
        let a = Assessment::empty(Uuid::new_v4());
        let prompt = build_assessment_prompt(&a, "", "Вітаю!");
        assert!(prompt.contains("НАСТУПНЕ ПИТАННЯ"));
        assert!(prompt.contains("service_branch"));
    }

    #[test]
    fn test_next_question_skips_answered_and_empty() {
        let a = assessment_with(&[
            ("service_branch", json!("Army")),
            ("service_role", json!("")), // empty counts as unanswered
        ]);
        assert_eq!(next_unanswered_question(&a).unwrap().id, "service_role");
    }

    #[test]
    fn test_all_answered_yields_completion_prompt() {
        let pairs: Vec<(&str, serde_json::Value)> = ASSESSMENT_QUESTIONS
            .iter()
            .map(|q| (q.id, json!("x")))
            .collect();
        let a = assessment_with(&pairs);

        assert!(next_unanswered_question(&a).is_none());
        let prompt = build_assessment_prompt(&a, "history", "дякую");
        assert!(prompt.contains("профіль оцінювання вже заповнений"));
        assert!(!prompt.contains("НАСТУПНЕ ПИТАННЯ"));
    }

    #[test]
    fn test_assessment_prompt_names_exactly_one_question() {
        let a = Assessment::empty(Uuid::new_v4());
        let prompt = build_assessment_prompt(&a, "", "hi");
        // Only the first question id appears; the second must not.
        assert!(prompt.contains("service_branch"));
        assert!(!prompt.contains("service_role"));
    }

    #[test]
    fn test_format_context_empty_profile() {
        let a = Assessment::empty(Uuid::new_v4());
        assert!(format_assessment_context(&a).contains("Дані ще не заповнені"));
    }

    #[test]
    fn test_format_context_lists_known_fields() {
        let a = assessment_with(&[
            ("service_branch", json!("Navy")),
            ("primary_skills", json!("python,django")),
            ("years_of_service", json!(5)),
            ("current_goals", json!("Find job")),
        ]);
        let ctx = format_assessment_context(&a);
        assert!(ctx.contains("Navy"));
        assert!(ctx.contains("Основні навички: python,django"));
        assert!(ctx.contains("Років служби: 5"));
        assert!(ctx.contains("Короткострокові цілі: Find job"));
    }

    #[test]
    fn test_typed_prompt_carries_language_and_json_instructions() {
        let a = assessment_with(&[("primary_skills", json!("зварювання"))]);
        let prompt = build_typed_prompt(
            prompts::system_prompt_for(ConversationType::Hiring),
            &a,
            "історія",
            "шукаю роботу",
        );
        assert!(prompt.contains("Відповідайте українською мовою"));
        assert!(prompt.contains("ОНОВЛЕННЯ ПРОФІЛЮ КОРИСТУВАЧА"));
        assert!(prompt.contains("шукаю роботу"));
    }

    #[test]
    fn test_education_prompt_embeds_knowledge_block() {
        let a = Assessment::empty(Uuid::new_v4());
        let prompt = build_education_prompt(
            prompts::system_prompt_for(ConversationType::Education),
            &a,
            "\n\nРЕЛЕВАНТНІ МАТЕРІАЛИ З БАЗИ ЗНАНЬ:\n1. [ARTICLE] Тест\n",
            "",
            "як вивчити Rust?",
        );
        assert!(prompt.contains("РЕЛЕВАНТНІ МАТЕРІАЛИ"));
        assert!(prompt.contains("Цитуйте джерела"));
    }

    #[test]
    fn test_business_fallback_embeds_framework() {
        let prompt = build_business_fallback_prompt(
            prompts::system_prompt_for(ConversationType::Business),
            "профіль",
            "",
            "що думаєте?",
        );
        assert!(prompt.contains("ФРЕЙМВОРК ВАЛІДАЦІЇ БІЗНЕС-ІДЕЇ"));
        assert!(prompt.contains("БУДЬТЕ ЧЕСНИМИ"));
    }
}
