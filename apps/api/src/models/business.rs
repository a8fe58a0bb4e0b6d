use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle status of a business idea. BRAINSTORM and IN_PROGRESS count as
/// active for the validation stepper; at most one idea per user may be
/// active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdeaStatus {
    Brainstorm,
    InProgress,
    Validated,
}

impl IdeaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaStatus::Brainstorm => "BRAINSTORM",
            IdeaStatus::InProgress => "IN_PROGRESS",
            IdeaStatus::Validated => "VALIDATED",
        }
    }
}

impl FromStr for IdeaStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BRAINSTORM" => Ok(IdeaStatus::Brainstorm),
            "IN_PROGRESS" => Ok(IdeaStatus::InProgress),
            "VALIDATED" => Ok(IdeaStatus::Validated),
            _ => Err(()),
        }
    }
}

/// The five ordered validation stages. Persisted state stays
/// field-presence-based (an empty or whitespace-only analysis column means
/// the stage has not run), but all stepper logic goes through this enum so
/// a stage can never be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    Market,
    Financial,
    Skills,
    Risk,
    Verdict,
}

pub const VALIDATION_STAGES: [ValidationStage; 5] = [
    ValidationStage::Market,
    ValidationStage::Financial,
    ValidationStage::Skills,
    ValidationStage::Risk,
    ValidationStage::Verdict,
];

impl ValidationStage {
    /// First stage whose output column is still empty, in fixed order.
    /// `None` means all five stages have run.
    pub fn next_for(idea: &BusinessIdea) -> Option<ValidationStage> {
        VALIDATION_STAGES
            .into_iter()
            .find(|stage| idea.stage_output(*stage).trim().is_empty())
    }

    /// Name of the analysis column this stage fills.
    pub fn column(&self) -> &'static str {
        match self {
            ValidationStage::Market => "market_analysis",
            ValidationStage::Financial => "financial_analysis",
            ValidationStage::Skills => "skills_match",
            ValidationStage::Risk => "risk_assessment",
            ValidationStage::Verdict => "final_verdict",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BusinessIdea {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub status: String,
    pub validation_score: i32,
    /// Free-form canvas data; `raw_idea` keeps the message the idea was
    /// opened from and feeds every stage prompt.
    #[sqlx(json)]
    pub business_canvas: Map<String, Value>,
    pub market_analysis: String,
    pub financial_analysis: String,
    pub skills_match: String,
    pub risk_assessment: String,
    pub final_verdict: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BusinessIdea {
    pub fn status(&self) -> Option<IdeaStatus> {
        IdeaStatus::from_str(&self.status).ok()
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status(),
            Some(IdeaStatus::Brainstorm) | Some(IdeaStatus::InProgress)
        )
    }

    /// The original idea text; falls back to the title for rows created
    /// before the canvas carried `raw_idea`.
    pub fn raw_idea(&self) -> &str {
        self.business_canvas
            .get("raw_idea")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.title)
    }

    pub fn stage_output(&self, stage: ValidationStage) -> &str {
        match stage {
            ValidationStage::Market => &self.market_analysis,
            ValidationStage::Financial => &self.financial_analysis,
            ValidationStage::Skills => &self.skills_match,
            ValidationStage::Risk => &self.risk_assessment,
            ValidationStage::Verdict => &self.final_verdict,
        }
    }

    pub fn set_stage_output(&mut self, stage: ValidationStage, output: String) {
        match stage {
            ValidationStage::Market => self.market_analysis = output,
            ValidationStage::Financial => self.financial_analysis = output,
            ValidationStage::Skills => self.skills_match = output,
            ValidationStage::Risk => self.risk_assessment = output,
            ValidationStage::Verdict => self.final_verdict = output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn idea() -> BusinessIdea {
        BusinessIdea {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Кав'ярня біля вокзалу".to_string(),
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
    fn test_next_stage_walks_in_order() {
        let mut i = idea();
        assert_eq!(ValidationStage::next_for(&i), Some(ValidationStage::Market));

        i.market_analysis = "попит є".to_string();
        assert_eq!(
            ValidationStage::next_for(&i),
            Some(ValidationStage::Financial)
        );

        i.financial_analysis = "цифри ок".to_string();
        i.skills_match = "навички підходять".to_string();
        i.risk_assessment = "ризики помірні".to_string();
        assert_eq!(
            ValidationStage::next_for(&i),
            Some(ValidationStage::Verdict)
        );

        i.final_verdict = "рекомендую".to_string();
        assert_eq!(ValidationStage::next_for(&i), None);
    }

    #[test]
    fn test_whitespace_only_output_counts_as_absent() {
        let mut i = idea();
        i.market_analysis = "   \n".to_string();
        assert_eq!(ValidationStage::next_for(&i), Some(ValidationStage::Market));
    }

    #[test]
    fn test_is_active_by_status() {
        let mut i = idea();
        assert!(i.is_active());
        i.status = "BRAINSTORM".to_string();
        assert!(i.is_active());
        i.status = "VALIDATED".to_string();
        assert!(!i.is_active());
        i.status = "weird".to_string();
        assert!(!i.is_active());
    }

    #[test]
    fn test_raw_idea_falls_back_to_title() {
        let mut i = idea();
        assert_eq!(i.raw_idea(), "Кав'ярня біля вокзалу");
        i.business_canvas.insert(
            "raw_idea".to_string(),
            serde_json::json!("Хочу відкрити кав'ярню біля вокзалу"),
        );
        assert_eq!(i.raw_idea(), "Хочу відкрити кав'ярню біля вокзалу");
    }
}
