use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurveyId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub String);

impl fmt::Display for SurveyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ResponseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyKind {
    QuickPoll,
    DetailedSurvey,
    Nps,
    FeaturePriority,
}

impl SurveyKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::QuickPoll => "Quick Poll",
            Self::DetailedSurvey => "Detailed Survey",
            Self::Nps => "Net Promoter Score",
            Self::FeaturePriority => "Feature Priority",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyStatus {
    Draft,
    Published,
    Closed,
}

impl SurveyStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Published => "Published",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for SurveyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Top-level questionnaire record as held by the persistence layer.
///
/// `started_responses` and `completion_rate` are denormalized counters; the
/// former is bumped when a response is created and the latter is only
/// recomputed when a response completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Survey {
    pub id: SurveyId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: SurveyKind,
    pub status: SurveyStatus,
    #[serde(default)]
    pub started_responses: u64,
    #[serde(default)]
    pub completion_rate: f64,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    RatingScale,
    OpenText,
    Ranking,
    Matrix,
}

impl QuestionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::MultipleChoice => "Multiple Choice",
            Self::RatingScale => "Rating Scale",
            Self::OpenText => "Open Text",
            Self::Ranking => "Ranking",
            Self::Matrix => "Matrix",
        }
    }
}

/// Type-specific configuration for a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionConfig {
    MultipleChoice {
        options: Vec<String>,
    },
    RatingScale {
        min: i64,
        max: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_label: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_label: Option<String>,
    },
    OpenText,
    Ranking {
        items: Vec<String>,
    },
    Matrix {
        rows: Vec<String>,
        columns: Vec<String>,
    },
}

/// Widest rating scale a question may declare, counted in steps.
pub const MAX_RATING_SPAN: i64 = 100;

/// True when `min..=max` is non-empty and no wider than [`MAX_RATING_SPAN`].
pub fn rating_scale_in_bounds(min: i64, max: i64) -> bool {
    min <= max && i128::from(max) - i128::from(min) <= i128::from(MAX_RATING_SPAN)
}

impl QuestionConfig {
    pub const fn kind(&self) -> QuestionKind {
        match self {
            Self::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            Self::RatingScale { .. } => QuestionKind::RatingScale,
            Self::OpenText => QuestionKind::OpenText,
            Self::Ranking { .. } => QuestionKind::Ranking,
            Self::Matrix { .. } => QuestionKind::Matrix,
        }
    }

    /// Rating scales must be ordered and bounded; other types always pass.
    pub fn has_valid_scale(&self) -> bool {
        match self {
            Self::RatingScale { min, max, .. } => rating_scale_in_bounds(*min, *max),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub survey_id: SurveyId,
    pub text: String,
    pub order_index: u32,
    #[serde(default)]
    pub required: bool,
    pub config: QuestionConfig,
}

impl Question {
    pub const fn kind(&self) -> QuestionKind {
        self.config.kind()
    }
}

/// Sorts questions into display order: order index, then identity.
pub fn sort_questions(questions: &mut [Question]) {
    questions.sort_by(|a, b| {
        a.order_index
            .cmp(&b.order_index)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Raw stored answer; `value` keeps whatever shape the client submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: QuestionId,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: ResponseId,
    pub survey_id: SurveyId,
    #[serde(default)]
    pub respondent: Option<String>,
    /// Respondent-declared commitment level; metadata only.
    #[serde(default)]
    pub signal: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl Response {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}
