//! Survey response aggregation, insight synthesis, export, and lifecycle.

pub mod aggregate;
pub mod domain;
pub mod export;
pub mod insights;
pub mod lifecycle;
mod normalizer;
pub mod results;
pub mod router;
pub mod service;
pub mod store;

pub use aggregate::{
    ChoiceSummary, MatrixCell, MatrixRow, MatrixSummary, OptionTally, QuestionSummary,
    RankedItem, RankingSummary, RatingBucket, RatingSummary, TextEntry, TextSummary,
};
pub use domain::{
    Answer, Question, QuestionConfig, QuestionId, QuestionKind, Response, ResponseId, Survey,
    SurveyId, SurveyKind, SurveyStatus,
};
pub use export::{ExportDocument, ExportError, ExportFormat};
pub use insights::{InsightRules, NpsBreakdown, SurveyInsight};
pub use lifecycle::{
    CompletionUpdate, LifecycleError, QuestionDraft, SurveyDraft, SurveyLifecycle,
};
pub use results::{QuestionResult, SurveyOverview, SurveyResults};
pub use router::survey_router;
pub use service::{SurveyService, SurveyServiceError};
pub use store::{InMemorySurveyStore, NewResponse, StoreError, SurveySnapshot, SurveyStore};
