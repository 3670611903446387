use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

use super::domain::{QuestionId, Response, ResponseId, Survey, SurveyId};
use super::export::{export, ExportDocument, ExportError, ExportFormat};
use super::insights::{generate_insights, InsightRules, SurveyInsight};
use super::lifecycle::{CompletionUpdate, LifecycleError, SurveyDraft, SurveyLifecycle};
use super::results::{compile_results, SurveyResults};
use super::store::{StoreError, SurveyStore};

/// Service composing the store, results compiler, insight rules, exporter,
/// and lifecycle manager behind one facade.
pub struct SurveyService<S> {
    store: Arc<S>,
    rules: InsightRules,
    lifecycle: SurveyLifecycle<S>,
}

impl<S> SurveyService<S>
where
    S: SurveyStore + 'static,
{
    pub fn new(store: Arc<S>, rules: InsightRules) -> Self {
        let lifecycle = SurveyLifecycle::new(store.clone());
        Self {
            store,
            rules,
            lifecycle,
        }
    }

    pub fn results(&self, survey_id: &SurveyId) -> Result<SurveyResults, SurveyServiceError> {
        Ok(compile_results(self.store.as_ref(), survey_id)?)
    }

    pub fn insights(&self, survey_id: &SurveyId) -> Result<SurveyInsight, SurveyServiceError> {
        let results = self.results(survey_id)?;
        let insight = generate_insights(&results, &self.rules);
        info!(
            survey_id = %survey_id,
            findings = insight.key_findings.len(),
            recommendations = insight.recommendations.len(),
            "generated survey insights"
        );
        Ok(insight)
    }

    pub fn export(
        &self,
        survey_id: &SurveyId,
        format: ExportFormat,
    ) -> Result<ExportDocument, SurveyServiceError> {
        let results = self.results(survey_id)?;
        let document = export(&results, format)?;
        info!(survey_id = %survey_id, %format, bytes = document.body.len(), "exported survey results");
        Ok(document)
    }

    pub fn create_draft(
        &self,
        draft: SurveyDraft,
        now: DateTime<Utc>,
    ) -> Result<Survey, SurveyServiceError> {
        Ok(self.lifecycle.create_draft(draft, now)?)
    }

    pub fn publish(&self, survey_id: &SurveyId, now: DateTime<Utc>) -> Result<Survey, SurveyServiceError> {
        Ok(self.lifecycle.publish(survey_id, now)?)
    }

    pub fn close(&self, survey_id: &SurveyId, now: DateTime<Utc>) -> Result<Survey, SurveyServiceError> {
        Ok(self.lifecycle.close(survey_id, now)?)
    }

    pub fn start_response(
        &self,
        survey_id: &SurveyId,
        respondent: Option<String>,
        signal: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Response, SurveyServiceError> {
        Ok(self
            .lifecycle
            .start_response(survey_id, respondent, signal, now)?)
    }

    pub fn record_answer(
        &self,
        response_id: &ResponseId,
        question_id: &QuestionId,
        value: Value,
    ) -> Result<(), SurveyServiceError> {
        Ok(self.lifecycle.record_answer(response_id, question_id, value)?)
    }

    pub fn complete_response(
        &self,
        response_id: &ResponseId,
        now: DateTime<Utc>,
    ) -> Result<CompletionUpdate, SurveyServiceError> {
        Ok(self.lifecycle.complete_response(response_id, now)?)
    }
}

/// Error raised by the survey service.
#[derive(Debug, thiserror::Error)]
pub enum SurveyServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl SurveyServiceError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Store(err) | Self::Lifecycle(LifecycleError::Store(err)) => err.is_not_found(),
            _ => false,
        }
    }

    /// Caller-supplied input the engine refuses to work with.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::Lifecycle(LifecycleError::InvalidRatingScale { .. })
                | Self::Export(ExportError::UnknownFormat(_))
        )
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            Self::Lifecycle(LifecycleError::InvalidStateTransition { .. })
        )
    }
}
