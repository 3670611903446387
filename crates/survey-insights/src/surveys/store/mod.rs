mod memory;

use super::domain::{
    Question, QuestionId, Response, ResponseId, Survey, SurveyId, SurveyStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use memory::InMemorySurveyStore;

/// Persistence collaborator for surveys, questions, and responses.
///
/// Every engine operation fetches through this trait and writes back through
/// it; implementations arbitrate concurrent writers on their own.
pub trait SurveyStore: Send + Sync {
    /// Reserves an identity no stored survey is using yet.
    fn next_survey_id(&self) -> Result<SurveyId, StoreError>;
    fn insert_survey(&self, survey: Survey, questions: Vec<Question>) -> Result<(), StoreError>;
    fn load_survey(&self, id: &SurveyId) -> Result<Survey, StoreError>;
    /// Questions in display order (order index, then identity).
    fn load_questions(&self, survey_id: &SurveyId) -> Result<Vec<Question>, StoreError>;
    fn load_responses_with_answers(&self, survey_id: &SurveyId)
        -> Result<Vec<Response>, StoreError>;
    fn count_started_responses(&self, survey_id: &SurveyId) -> Result<u64, StoreError>;
    fn persist_completion_rate(&self, survey_id: &SurveyId, rate: f64) -> Result<(), StoreError>;
    fn persist_lifecycle_transition(
        &self,
        survey_id: &SurveyId,
        status: SurveyStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    /// Creates the response and bumps the survey's started-count.
    fn create_response(&self, response: NewResponse) -> Result<Response, StoreError>;
    fn load_response(&self, id: &ResponseId) -> Result<Response, StoreError>;
    fn append_answer(
        &self,
        response_id: &ResponseId,
        question_id: &QuestionId,
        value: Value,
    ) -> Result<(), StoreError>;
    fn mark_response_completed(
        &self,
        response_id: &ResponseId,
        at: DateTime<Utc>,
    ) -> Result<Response, StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewResponse {
    pub survey_id: SurveyId,
    #[serde(default)]
    pub respondent: Option<String>,
    #[serde(default)]
    pub signal: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Everything the store holds for one survey, as read from or written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveySnapshot {
    pub survey: Survey,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub responses: Vec<Response>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} {id} already exists")]
    Conflict { entity: &'static str, id: String },
    #[error("survey store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn survey_not_found(id: &SurveyId) -> Self {
        Self::NotFound {
            entity: "survey",
            id: id.0.clone(),
        }
    }

    pub fn response_not_found(id: &ResponseId) -> Self {
        Self::NotFound {
            entity: "response",
            id: id.0.clone(),
        }
    }

    pub fn question_not_found(id: &QuestionId) -> Self {
        Self::NotFound {
            entity: "question",
            id: id.0.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
