//! User assessment — the per-user career profile.
//!
//! The `answers` JSONB map keeps the raw question → answer data so original
//! responses survive for later prompting. Convenience columns mirror a subset
//! of those answers for querying; they are filled from `answers` only when
//! currently empty (first-write-wins). The post-processor merge into
//! `answers` itself always overwrites — the two behaviors are intentionally
//! distinct (user-declared vs model-inferred data).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_LANGUAGE: &str = "uk";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    Number,
    Choice,
}

/// One entry of the fixed onboarding questionnaire.
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub question: &'static str,
    pub kind: QuestionKind,
    pub choices: &'static [&'static str],
}

/// Ordered profile questions for veterans transitioning to civilian careers.
/// The onboarding composer walks this list and asks the first unanswered one.
/// All fields are optional in the model to respect privacy.
pub const ASSESSMENT_QUESTIONS: &[Question] = &[
    Question {
        id: "service_branch",
        question: "Which branch of the armed forces did you serve in?",
        kind: QuestionKind::Text,
        choices: &[],
    },
    Question {
        id: "service_role",
        question: "What was your primary role / military occupation specialty?",
        kind: QuestionKind::Text,
        choices: &[],
    },
    Question {
        id: "rank",
        question: "What was your rank at discharge?",
        kind: QuestionKind::Text,
        choices: &[],
    },
    Question {
        id: "years_of_service",
        question: "How many years did you serve?",
        kind: QuestionKind::Number,
        choices: &[],
    },
    Question {
        id: "discharge_date",
        question: "When were you discharged (approximate year)?",
        kind: QuestionKind::Text,
        choices: &[],
    },
    Question {
        id: "deployment_experience",
        question: "Have you been deployed on operations?",
        kind: QuestionKind::Choice,
        choices: &["Yes", "No"],
    },
    Question {
        id: "leadership_experience",
        question: "Did you have leadership or management responsibilities?",
        kind: QuestionKind::Choice,
        choices: &["Yes", "No"],
    },
    Question {
        id: "primary_skills",
        question: "What are your main technical or professional skills (comma-separated)?",
        kind: QuestionKind::Text,
        choices: &[],
    },
    Question {
        id: "civilian_certifications",
        question: "Do you hold any civilian or military-to-civilian certifications (IT, logistics, medical, trades)?",
        kind: QuestionKind::Text,
        choices: &[],
    },
    Question {
        id: "education_level",
        question: "What is your highest civilian education level?",
        kind: QuestionKind::Choice,
        choices: &[
            "No formal education",
            "Secondary",
            "Vocational/Technical",
            "Bachelors",
            "Masters+",
        ],
    },
    Question {
        id: "disabilities_or_limits",
        question: "Do you have any service-related injuries or limitations the advisor should consider?",
        kind: QuestionKind::Text,
        choices: &[],
    },
    Question {
        id: "security_clearance",
        question: "Do you hold any security clearance that could affect employment?",
        kind: QuestionKind::Choice,
        choices: &["Yes", "No", "Not sure"],
    },
    Question {
        id: "current_goals",
        question: "What are your short-term professional goals (next 6-12 months)?",
        kind: QuestionKind::Text,
        choices: &[],
    },
    Question {
        id: "long_term_goals",
        question: "What are your long-term goals (3-5 years)?",
        kind: QuestionKind::Text,
        choices: &[],
    },
    Question {
        id: "work_preferences",
        question: "Which working arrangements do you prefer?",
        kind: QuestionKind::Choice,
        choices: &[
            "Full-time employment",
            "Freelance/Contract",
            "Start my own business",
            "Public sector",
            "Undecided",
        ],
    },
    Question {
        id: "financial_needs",
        question: "Do you need immediate steady income or can you wait to build something?",
        kind: QuestionKind::Choice,
        choices: &["Immediate steady income", "Can wait to build", "Flexible"],
    },
    Question {
        id: "locality",
        question: "Which region/city are you planning to work in (affects opportunities)?",
        kind: QuestionKind::Text,
        choices: &[],
    },
    Question {
        id: "available_time",
        question: "How much time per week can you dedicate to training or building a business?",
        kind: QuestionKind::Choice,
        choices: &["<10 hours", "10-20 hours", "20-40 hours", ">40 hours"],
    },
    Question {
        id: "benefits_awareness",
        question: "Are you aware of veteran benefits / support programs you can access?",
        kind: QuestionKind::Choice,
        choices: &["Yes", "Somewhat", "No"],
    },
    Question {
        id: "support_needs",
        question: "Do you need support with housing, medical care, mental health, or legal assistance?",
        kind: QuestionKind::Text,
        choices: &[],
    },
    Question {
        id: "additional_info",
        question: "Anything else the advisor should know (privacy-sensitive info optional)?",
        kind: QuestionKind::Text,
        choices: &[],
    },
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assessment {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Raw question id → answer map. Source of truth for the profile.
    #[sqlx(json)]
    pub answers: Map<String, Value>,

    // Convenience columns, synced first-write-wins from `answers`.
    pub experience_level: Option<String>,
    pub experience_years: Option<i32>,
    pub primary_skills: Option<String>,
    pub work_preferences: Option<String>,
    pub suggested_path: Option<String>,
    pub service_branch: Option<String>,
    pub service_role: Option<String>,
    pub rank: Option<String>,
    pub years_of_service: Option<i32>,
    pub discharge_date: Option<String>,
    pub deployment_experience: bool,
    pub leadership_experience: bool,
    pub civilian_certifications: Option<String>,
    pub disabilities_or_limits: Option<String>,
    pub security_clearance: Option<String>,
    pub education_level: Option<String>,
    pub locality: Option<String>,
    pub benefits_awareness: Option<String>,
    pub support_needs: Option<String>,

    pub preferred_language: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assessment {
    pub fn empty(user_id: Uuid) -> Self {
        let now = Utc::now();
        Assessment {
            id: Uuid::new_v4(),
            user_id,
            answers: Map::new(),
            experience_level: None,
            experience_years: None,
            primary_skills: None,
            work_preferences: None,
            suggested_path: None,
            service_branch: None,
            service_role: None,
            rank: None,
            years_of_service: None,
            discharge_date: None,
            deployment_experience: false,
            leadership_experience: false,
            civilian_certifications: None,
            disabilities_or_limits: None,
            security_clearance: None,
            education_level: None,
            locality: None,
            benefits_awareness: None,
            support_needs: None,
            preferred_language: None,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a question id has a usable answer. Null, empty string and
    /// empty array all count as unanswered.
    pub fn is_answered(&self, question_id: &str) -> bool {
        match self.answers.get(question_id) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(_) => true,
        }
    }

    fn answer_str(&self, question_id: &str) -> Option<String> {
        match self.answers.get(question_id)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn answer_i32(&self, question_id: &str) -> Option<i32> {
        match self.answers.get(question_id)? {
            Value::Number(n) => n.as_i64().map(|v| v as i32),
            Value::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        }
    }

    fn answer_bool(&self, question_id: &str) -> Option<bool> {
        let raw = match self.answers.get(question_id)? {
            Value::Bool(b) => return Some(*b),
            Value::String(s) => s.to_lowercase(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(matches!(raw.as_str(), "yes" | "true" | "1"))
    }

    /// Syncs convenience columns from `answers`. Each text/number column is
    /// only filled when currently empty — existing values are never
    /// overwritten here. The two boolean flags follow the answer directly.
    pub fn sync_convenience_fields(&mut self) {
        macro_rules! fill {
            ($field:ident, $getter:ident) => {
                if self.$field.is_none() {
                    if let Some(v) = self.$getter(stringify!($field)) {
                        self.$field = Some(v);
                    }
                }
            };
        }

        fill!(experience_level, answer_str);
        fill!(experience_years, answer_i32);
        fill!(primary_skills, answer_str);
        fill!(work_preferences, answer_str);
        fill!(service_branch, answer_str);
        fill!(service_role, answer_str);
        fill!(rank, answer_str);
        fill!(years_of_service, answer_i32);
        fill!(discharge_date, answer_str);
        fill!(civilian_certifications, answer_str);
        fill!(disabilities_or_limits, answer_str);
        fill!(security_clearance, answer_str);
        fill!(education_level, answer_str);
        fill!(locality, answer_str);
        fill!(benefits_awareness, answer_str);
        fill!(support_needs, answer_str);

        if let Some(v) = self.answer_bool("deployment_experience") {
            self.deployment_experience = v;
        }
        if let Some(v) = self.answer_bool("leadership_experience") {
            self.leadership_experience = v;
        }
    }

    /// Applies model-proposed updates into `answers` with overwrite
    /// semantics, then resyncs convenience columns.
    pub fn apply_updates(&mut self, updates: &Map<String, Value>) {
        for (key, value) in updates {
            self.answers.insert(key.clone(), value.clone());
        }
        self.sync_convenience_fields();
    }

    pub fn preferred_language(&self) -> &str {
        self.preferred_language
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn with_answers(pairs: &[(&str, Value)]) -> Assessment {
        let mut a = Assessment::empty(Uuid::new_v4());
        for (k, v) in pairs {
            a.answers.insert(k.to_string(), v.clone());
        }
        a
    }

    #[test]
    fn test_is_answered_treats_empty_values_as_missing() {
        let a = with_answers(&[
            ("service_branch", json!("")),
            ("rank", json!(null)),
            ("primary_skills", json!([])),
            ("locality", json!("Київ")),
        ]);
        assert!(!a.is_answered("service_branch"));
        assert!(!a.is_answered("rank"));
        assert!(!a.is_answered("primary_skills"));
        assert!(!a.is_answered("missing_entirely"));
        assert!(a.is_answered("locality"));
    }

    #[test]
    fn test_sync_is_first_write_wins() {
        let mut a = with_answers(&[("service_branch", json!("Army"))]);
        a.sync_convenience_fields();
        assert_eq!(a.service_branch.as_deref(), Some("Army"));

        // A later answer must not overwrite the already-filled column.
        a.answers
            .insert("service_branch".to_string(), json!("Navy"));
        a.sync_convenience_fields();
        assert_eq!(a.service_branch.as_deref(), Some("Army"));
    }

    #[test]
    fn test_sync_parses_numbers_and_booleans() {
        let mut a = with_answers(&[
            ("years_of_service", json!("7")),
            ("deployment_experience", json!("Yes")),
            ("leadership_experience", json!("No")),
        ]);
        a.sync_convenience_fields();
        assert_eq!(a.years_of_service, Some(7));
        assert!(a.deployment_experience);
        assert!(!a.leadership_experience);
    }

    #[test]
    fn test_sync_ignores_unparsable_numbers() {
        let mut a = with_answers(&[("years_of_service", json!("about ten"))]);
        a.sync_convenience_fields();
        assert_eq!(a.years_of_service, None);
    }

    #[test]
    fn test_apply_updates_overwrites_answers() {
        let mut a = with_answers(&[("rank", json!("Sergeant"))]);
        a.sync_convenience_fields();

        let mut updates = Map::new();
        updates.insert("rank".to_string(), json!("Captain"));
        a.apply_updates(&updates);

        // The answer map takes the new value; the convenience column keeps
        // the first write.
        assert_eq!(a.answers.get("rank"), Some(&json!("Captain")));
        assert_eq!(a.rank.as_deref(), Some("Sergeant"));
    }

    #[test]
    fn test_question_order_starts_with_service_branch() {
        assert_eq!(ASSESSMENT_QUESTIONS[0].id, "service_branch");
        assert_eq!(ASSESSMENT_QUESTIONS.last().unwrap().id, "additional_info");
    }

    #[test]
    fn test_preferred_language_default() {
        let mut a = Assessment::empty(Uuid::new_v4());
        assert_eq!(a.preferred_language(), "uk");
        a.preferred_language = Some("en".to_string());
        assert_eq!(a.preferred_language(), "en");
        a.preferred_language = Some(String::new());
        assert_eq!(a.preferred_language(), "uk");
    }
}
