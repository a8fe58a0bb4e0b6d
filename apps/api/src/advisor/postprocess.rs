//! Response post-processing: pulls the fenced `{"updates": {...}}` block a
//! model may emit out of the visible text and merges it into the user's
//! assessment.
//!
//! The block is stripped from the text even when it fails to parse — a
//! malformed block is a model formatting error, never a user-visible
//! failure. The merge into `answers` always overwrites (model-inferred
//! data), unlike the read-side convenience-column sync which is
//! first-write-wins (user-declared data).

use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::warn;

use crate::models::assessment::Assessment;

/// Locates at most one ```json fenced block in the text. Returns the text
/// with the block removed (trimmed) and the parsed `updates` map if the
/// block held one. Text without a block comes back unchanged.
pub fn extract_update_block(raw: &str) -> (String, Option<Map<String, Value>>) {
    let Some(open) = raw.find("```json") else {
        return (raw.to_string(), None);
    };
    let body_start = open + "```json".len();
    let Some(close_rel) = raw[body_start..].find("```") else {
        return (raw.to_string(), None);
    };
    let body_end = body_start + close_rel;
    let fence_end = body_end + "```".len();

    let mut clean = String::with_capacity(raw.len());
    clean.push_str(&raw[..open]);
    clean.push_str(&raw[fence_end..]);
    let clean = clean.trim().to_string();

    let updates = serde_json::from_str::<Value>(raw[body_start..body_end].trim())
        .ok()
        .and_then(|v| match v.get("updates") {
            Some(Value::Object(map)) if !map.is_empty() => Some(map.clone()),
            _ => None,
        });

    (clean, updates)
}

/// Applies any update block in `raw` to the assessment and persists it.
/// Always returns the cleaned visible text; persistence failures are logged
/// and swallowed so the reply still reaches the user.
pub async fn process_response(pool: &PgPool, assessment: &mut Assessment, raw: &str) -> String {
    let (clean, updates) = extract_update_block(raw);

    if let Some(updates) = updates {
        assessment.apply_updates(&updates);
        if let Err(e) = save_assessment(pool, assessment).await {
            warn!(
                "Failed to persist assessment updates for user {}: {e}",
                assessment.user_id
            );
        }
    }

    clean
}

pub async fn save_assessment(pool: &PgPool, assessment: &Assessment) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE user_assessments SET
            answers = $2,
            experience_level = $3,
            experience_years = $4,
            primary_skills = $5,
            work_preferences = $6,
            suggested_path = $7,
            service_branch = $8,
            service_role = $9,
            rank = $10,
            years_of_service = $11,
            discharge_date = $12,
            deployment_experience = $13,
            leadership_experience = $14,
            civilian_certifications = $15,
            disabilities_or_limits = $16,
            security_clearance = $17,
            education_level = $18,
            locality = $19,
            benefits_awareness = $20,
            support_needs = $21,
            completed = $22,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(assessment.id)
    .bind(Value::Object(assessment.answers.clone()))
    .bind(&assessment.experience_level)
    .bind(assessment.experience_years)
    .bind(&assessment.primary_skills)
    .bind(&assessment.work_preferences)
    .bind(&assessment.suggested_path)
    .bind(&assessment.service_branch)
    .bind(&assessment.service_role)
    .bind(&assessment.rank)
    .bind(assessment.years_of_service)
    .bind(&assessment.discharge_date)
    .bind(assessment.deployment_experience)
    .bind(assessment.leadership_experience)
    .bind(&assessment.civilian_certifications)
    .bind(&assessment.disabilities_or_limits)
    .bind(&assessment.security_clearance)
    .bind(&assessment.education_level)
    .bind(&assessment.locality)
    .bind(&assessment.benefits_awareness)
    .bind(&assessment.support_needs)
    .bind(assessment.completed)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_well_formed_block_round_trip() {
        let raw = "Hi\n```json\n{\"updates\":{\"rank\":\"Captain\"}}\n```\nBye";
        let (clean, updates) = extract_update_block(raw);

        assert_eq!(clean, "Hi\n\nBye");
        assert!(!clean.contains("```"));
        assert!(!clean.contains("updates"));

        let updates = updates.unwrap();
        assert_eq!(updates.get("rank"), Some(&json!("Captain")));
    }

    #[test]
    fn test_single_line_fences_also_match() {
        let raw = "Ось оновлення:\n```json {\"updates\": {\"service_branch\": \"Army\"}} ```\nДякую.";
        let (clean, updates) = extract_update_block(raw);
        assert!(!clean.contains("{\"updates\""));
        assert_eq!(
            updates.unwrap().get("service_branch"),
            Some(&json!("Army"))
        );
    }

    #[test]
    fn test_no_block_returns_text_unchanged() {
        let raw = "Just a normal reply without json.";
        let (clean, updates) = extract_update_block(raw);
        assert_eq!(clean, raw);
        assert!(updates.is_none());
    }

    #[test]
    fn test_malformed_json_still_strips_block() {
        let raw = "Text\n```json\n{not valid json\n```\nmore";
        let (clean, updates) = extract_update_block(raw);
        assert_eq!(clean, "Text\n\nmore");
        assert!(updates.is_none());
    }

    #[test]
    fn test_block_without_updates_key_is_stripped_not_applied() {
        let raw = "A\n```json\n{\"other\": 1}\n```\nB";
        let (clean, updates) = extract_update_block(raw);
        assert_eq!(clean, "A\n\nB");
        assert!(updates.is_none());
    }

    #[test]
    fn test_unclosed_fence_leaves_text_alone() {
        let raw = "Start ```json {\"updates\": {\"a\": 1}}";
        let (clean, updates) = extract_update_block(raw);
        assert_eq!(clean, raw);
        assert!(updates.is_none());
    }

    #[test]
    fn test_merge_applies_to_empty_assessment() {
        let mut a = Assessment::empty(Uuid::new_v4());
        let raw = "Hi\n```json\n{\"updates\":{\"rank\":\"Captain\"}}\n```\nBye";
        let (_, updates) = extract_update_block(raw);
        a.apply_updates(&updates.unwrap());
        assert_eq!(a.answers.get("rank"), Some(&json!("Captain")));
        // Convenience column synced because it was empty.
        assert_eq!(a.rank.as_deref(), Some("Captain"));
    }
}
