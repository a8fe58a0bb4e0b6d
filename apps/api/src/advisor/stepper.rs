//! Business validation stepper: walks an active idea through the five
//! analysis stages, one stage per explicit user go-ahead. Stage outputs are
//! produced by dedicated LLM prompts and returned as direct replies with a
//! fixed header, bypassing the general prompt path.

use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::advisor::composer::PromptOutcome;
use crate::advisor::prompts;
use crate::config::Config;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::business::{BusinessIdea, IdeaStatus, ValidationStage, VALIDATION_STAGES};
use crate::models::conversation::ConversationType;
use crate::models::user::User;

/// What the stepper decides to do with a business-conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPlan {
    /// Open a new idea from this message and run the first stage.
    StartIdea,
    /// The user assented; run the given stage of the active idea.
    RunStage(ValidationStage),
    /// An idea is active but the message is not a go-ahead; compose a
    /// status-aware prompt instead of advancing.
    StatusPrompt,
    /// No active idea and the message does not open one.
    Decline,
}

/// Pure decision: never advances a stage without an explicit continue
/// signal, and never opens a second idea while one is active.
pub fn plan(
    active: Option<&BusinessIdea>,
    content: &str,
    idea_keywords: &[String],
    continue_keywords: &[String],
) -> StepPlan {
    let lower = content.to_lowercase();

    if let Some(idea) = active {
        if continue_keywords.iter().any(|k| lower.contains(k.as_str())) {
            return match ValidationStage::next_for(idea) {
                Some(stage) => StepPlan::RunStage(stage),
                None => StepPlan::StatusPrompt,
            };
        }
        return StepPlan::StatusPrompt;
    }

    let looks_like_idea = idea_keywords.iter().any(|k| lower.contains(k.as_str()));
    if looks_like_idea && content.chars().count() > 15 {
        StepPlan::StartIdea
    } else {
        StepPlan::Decline
    }
}

/// Entry point from the composer. `None` means the stepper has nothing to
/// say and the generic business prompt should be used instead; any DB or
/// LLM failure degrades to `None` rather than surfacing.
pub async fn advance(
    pool: &PgPool,
    llm: &LlmClient,
    config: &Config,
    user: &User,
    user_context: &str,
    history: &str,
    content: &str,
) -> Option<PromptOutcome> {
    let active = fetch_active_idea(pool, user).await;

    match plan(
        active.as_ref(),
        content,
        &config.idea_keywords,
        &config.continue_keywords,
    ) {
        StepPlan::Decline => None,
        StepPlan::StartIdea => {
            let mut idea = match create_idea(pool, user, content).await {
                Ok(idea) => idea,
                Err(e) => {
                    warn!("Failed to create business idea: {e}");
                    return None;
                }
            };
            match run_stage(pool, llm, user_context, &mut idea, ValidationStage::Market).await {
                Ok(reply) => Some(PromptOutcome::Direct(reply)),
                Err(e) => {
                    warn!("Market stage failed for new idea {}: {e}", idea.id);
                    None
                }
            }
        }
        StepPlan::RunStage(stage) => {
            let mut idea = active?;
            match run_stage(pool, llm, user_context, &mut idea, stage).await {
                Ok(reply) => Some(PromptOutcome::Direct(reply)),
                Err(e) => {
                    warn!("Stage {stage:?} failed for idea {}: {e}", idea.id);
                    None
                }
            }
        }
        StepPlan::StatusPrompt => {
            let idea = active?;
            let prompt = prompts::BUSINESS_STATUS_TEMPLATE
                .replace(
                    "{system_prompt}",
                    prompts::system_prompt_for(ConversationType::Business),
                )
                .replace("{status_block}", &status_block(&idea))
                .replace("{history}", history)
                .replace("{user_content}", content);
            Some(PromptOutcome::Prompt(prompt))
        }
    }
}

async fn fetch_active_idea(pool: &PgPool, user: &User) -> Option<BusinessIdea> {
    let result = sqlx::query_as::<_, BusinessIdea>(
        "SELECT * FROM business_ideas
         WHERE user_id = $1 AND status IN ('BRAINSTORM', 'IN_PROGRESS')
         ORDER BY created_at DESC
         LIMIT 1",
    )
    .bind(user.id)
    .fetch_optional(pool)
    .await;

    match result {
        Ok(idea) => idea,
        Err(e) => {
            warn!("Failed to fetch active business idea: {e}");
            None
        }
    }
}

async fn create_idea(
    pool: &PgPool,
    user: &User,
    content: &str,
) -> Result<BusinessIdea, sqlx::Error> {
    let title: String = content.chars().take(100).collect();
    let mut canvas = serde_json::Map::new();
    canvas.insert("raw_idea".to_string(), Value::String(content.to_string()));

    let idea = sqlx::query_as::<_, BusinessIdea>(
        "INSERT INTO business_ideas (user_id, title, status, business_canvas)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(user.id)
    .bind(&title)
    .bind(IdeaStatus::InProgress.as_str())
    .bind(Value::Object(canvas))
    .fetch_one(pool)
    .await?;

    info!("Opened business idea {} for user {}", idea.id, user.id);
    Ok(idea)
}

/// Runs one stage: fills the stage prompt, calls the LLM, stores the output
/// on the idea row and returns the headed direct reply. The verdict stage
/// also flips the idea to VALIDATED. Persist failures are logged and
/// swallowed so the user still sees the analysis.
async fn run_stage(
    pool: &PgPool,
    llm: &LlmClient,
    user_context: &str,
    idea: &mut BusinessIdea,
    stage: ValidationStage,
) -> Result<String, LlmError> {
    let prompt = fill_stage_prompt(idea, user_context, stage);
    let output = llm.generate(&prompt).await?;

    idea.set_stage_output(stage, output.clone());
    if stage == ValidationStage::Verdict {
        idea.status = IdeaStatus::Validated.as_str().to_string();
    }

    let sql = format!(
        "UPDATE business_ideas SET {} = $1, status = $2, updated_at = NOW() WHERE id = $3",
        stage.column()
    );
    if let Err(e) = sqlx::query(&sql)
        .bind(&output)
        .bind(&idea.status)
        .bind(idea.id)
        .execute(pool)
        .await
    {
        warn!("Failed to persist {} for idea {}: {e}", stage.column(), idea.id);
    }

    Ok(stage_reply(stage, &output))
}

/// Fills the per-stage prompt template from the idea's accumulated outputs.
pub fn fill_stage_prompt(idea: &BusinessIdea, user_context: &str, stage: ValidationStage) -> String {
    match stage {
        ValidationStage::Market => {
            prompts::MARKET_STAGE_TEMPLATE.replace("{business_idea}", idea.raw_idea())
        }
        ValidationStage::Financial => prompts::FINANCIAL_STAGE_TEMPLATE
            .replace("{business_idea}", idea.raw_idea())
            .replace("{market_analysis}", &idea.market_analysis),
        ValidationStage::Skills => prompts::SKILLS_STAGE_TEMPLATE
            .replace("{business_idea}", idea.raw_idea())
            .replace("{user_context}", user_context),
        ValidationStage::Risk => prompts::RISK_STAGE_TEMPLATE
            .replace("{business_idea}", idea.raw_idea())
            .replace("{market_analysis}", &idea.market_analysis)
            .replace("{financial_analysis}", &idea.financial_analysis)
            .replace("{skills_match}", &idea.skills_match),
        ValidationStage::Verdict => prompts::VERDICT_STAGE_TEMPLATE
            .replace("{business_idea}", idea.raw_idea())
            .replace("{market_analysis}", &idea.market_analysis)
            .replace("{financial_analysis}", &idea.financial_analysis)
            .replace("{skills_match}", &idea.skills_match)
            .replace("{risk_assessment}", &idea.risk_assessment),
    }
}

/// Direct reply shown to the user after a stage runs. Each stage carries a
/// fixed header and a handoff question for the next stage.
pub fn stage_reply(stage: ValidationStage, output: &str) -> String {
    match stage {
        ValidationStage::Market => format!(
            "💡 **Крок 1: Аналіз Ринку**\n\n{output}\n\n🤔 **Що скажете?** Переходимо до фінансового аналізу?"
        ),
        ValidationStage::Financial => format!(
            "💰 **Крок 2: Фінансовий Аналіз**\n\n{output}\n\n🤔 **Як вам цифри?** Переходимо до оцінки навичок?"
        ),
        ValidationStage::Skills => format!(
            "🛠 **Крок 3: Відповідність Навичок**\n\n{output}\n\n🤔 **Чи згодні ви з оцінкою?** Переходимо до ризиків?"
        ),
        ValidationStage::Risk => format!(
            "⚠️ **Крок 4: Оцінка Ризиків**\n\n{output}\n\n🤔 **Чи готові почути фінальний вердикт?**"
        ),
        ValidationStage::Verdict => format!(
            "✅ **Фінальний Вердикт**\n\n{output}\n\n🎉 **Валідацію завершено!**"
        ),
    }
}

fn stage_label(stage: ValidationStage) -> &'static str {
    match stage {
        ValidationStage::Market => "Аналіз ринку",
        ValidationStage::Financial => "Фінансовий аналіз",
        ValidationStage::Skills => "Відповідність навичок",
        ValidationStage::Risk => "Оцінка ризиків",
        ValidationStage::Verdict => "Фінальний вердикт",
    }
}

/// Progress summary embedded in the status prompt: done stages show the
/// first 50 characters of their output, pending stages a waiting marker.
pub fn status_block(idea: &BusinessIdea) -> String {
    let mut lines = vec![format!("ПОТОЧНА ВАЛІДАЦІЯ ІДЕЇ: {}", idea.title)];
    for stage in VALIDATION_STAGES {
        let output = idea.stage_output(stage).trim();
        if output.is_empty() {
            lines.push(format!("- {}: ⏳ Очікується", stage_label(stage)));
        } else {
            let head: String = output.chars().take(50).collect();
            lines.push(format!("- {}: ✅ {head}...", stage_label(stage)));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::Map;
    use uuid::Uuid;

    fn keywords(raw: &str) -> Vec<String> {
        raw.split(',').map(|s| s.to_string()).collect()
    }

    fn idea() -> BusinessIdea {
        BusinessIdea {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Кав'ярня".to_string(),
            status: "IN_PROGRESS".to_string(),
            validation_score: 0,
            business_canvas: Map::new(),
            market_analysis: String::new(),
            financial_analysis: String::new(),
            skills_match: String::new(),
            risk_assessment: String::new(),
            final_verdict: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_opens_idea_on_keyword_and_length() {
        let ik = keywords("ідея,бізнес,хочу");
        let ck = keywords("так,далі");
        assert_eq!(
            plan(None, "Хочу відкрити кав'ярню біля вокзалу", &ik, &ck),
            StepPlan::StartIdea
        );
    }

    #[test]
    fn test_plan_declines_short_or_keywordless_messages() {
        let ik = keywords("ідея,бізнес,хочу");
        let ck = keywords("так,далі");
        // Keyword present but too short.
        assert_eq!(plan(None, "хочу кафе", &ik, &ck), StepPlan::Decline);
        // Long enough but no keyword.
        assert_eq!(
            plan(None, "розкажіть про ринок кавʼярень в Україні", &ik, &ck),
            StepPlan::Decline
        );
    }

    #[test]
    fn test_plan_never_opens_second_idea_while_active() {
        let ik = keywords("ідея,хочу");
        let ck = keywords("так,далі");
        let i = idea();
        assert_eq!(
            plan(Some(&i), "А ще маю ідею відкрити автомийку!", &ik, &ck),
            StepPlan::StatusPrompt
        );
    }

    #[test]
    fn test_plan_advances_only_on_continue_signal() {
        let ik = keywords("ідея");
        let ck = keywords("так,далі,фінанс");
        let mut i = idea();
        i.market_analysis = "попит є".to_string();

        assert_eq!(
            plan(Some(&i), "Так, давайте фінанси", &ik, &ck),
            StepPlan::RunStage(ValidationStage::Financial)
        );
        assert_eq!(
            plan(Some(&i), "А розкажіть більше про конкурентів", &ik, &ck),
            StepPlan::StatusPrompt
        );
    }

    #[test]
    fn test_plan_stage_order_is_fixed() {
        let ik = keywords("ідея");
        let ck = keywords("так");
        let mut i = idea();
        let mut seen = Vec::new();
        for _ in 0..5 {
            match plan(Some(&i), "так", &ik, &ck) {
                StepPlan::RunStage(stage) => {
                    seen.push(stage);
                    i.set_stage_output(stage, "готово".to_string());
                }
                other => panic!("unexpected plan: {other:?}"),
            }
        }
        assert_eq!(seen, VALIDATION_STAGES.to_vec());
        // All stages done; further assent no longer advances.
        assert_eq!(plan(Some(&i), "так", &ik, &ck), StepPlan::StatusPrompt);
    }

    #[test]
    fn test_fill_stage_prompt_threads_prior_outputs() {
        let mut i = idea();
        i.business_canvas.insert(
            "raw_idea".to_string(),
            serde_json::json!("Хочу відкрити кав'ярню"),
        );
        i.market_analysis = "ринок великий".to_string();
        i.financial_analysis = "цифри ок".to_string();
        i.skills_match = "навички є".to_string();

        let prompt = fill_stage_prompt(&i, "", ValidationStage::Risk);
        assert!(prompt.contains("Хочу відкрити кав'ярню"));
        assert!(prompt.contains("ринок великий"));
        assert!(prompt.contains("цифри ок"));
        assert!(prompt.contains("навички є"));
    }

    #[test]
    fn test_stage_replies_carry_headers() {
        assert!(stage_reply(ValidationStage::Market, "аналіз").starts_with("💡 **Крок 1"));
        assert!(stage_reply(ValidationStage::Verdict, "вердикт").contains("🎉 **Валідацію завершено!**"));
    }

    #[test]
    fn test_status_block_marks_progress() {
        let mut i = idea();
        i.market_analysis = "а".repeat(80);
        let block = status_block(&i);
        assert!(block.contains("Аналіз ринку: ✅"));
        assert!(block.contains("Фінансовий аналіз: ⏳ Очікується"));
        // Done-stage preview is truncated to 50 chars.
        assert!(block.contains(&format!("✅ {}...", "а".repeat(50))));
    }
}
