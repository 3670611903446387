use super::domain::{
    Question, QuestionConfig, QuestionId, Response, ResponseId, Survey, SurveyId, SurveyKind,
    SurveyStatus,
};
use super::results::completion_rate;
use super::store::{NewResponse, StoreError, SurveyStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    #[serde(default)]
    pub required: bool,
    pub config: QuestionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: SurveyKind,
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
}

/// Outcome of completing a response.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionUpdate {
    pub response_id: ResponseId,
    pub survey_id: SurveyId,
    pub completed_at: DateTime<Utc>,
    pub completed_responses: usize,
    pub started_responses: u64,
    pub completion_rate: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("survey {survey_id} cannot move from {from} to {to}")]
    InvalidStateTransition {
        survey_id: SurveyId,
        from: SurveyStatus,
        to: SurveyStatus,
    },
    #[error("question {position} declares an unusable rating scale {min}..={max}")]
    InvalidRatingScale { position: usize, min: i64, max: i64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives surveys through draft -> published -> closed and keeps the
/// response bookkeeping on the survey record current.
pub struct SurveyLifecycle<S> {
    store: Arc<S>,
}

impl<S> SurveyLifecycle<S>
where
    S: SurveyStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn create_draft(
        &self,
        draft: SurveyDraft,
        now: DateTime<Utc>,
    ) -> Result<Survey, LifecycleError> {
        for (index, question) in draft.questions.iter().enumerate() {
            if let QuestionConfig::RatingScale { min, max, .. } = &question.config {
                if !question.config.has_valid_scale() {
                    return Err(LifecycleError::InvalidRatingScale {
                        position: index + 1,
                        min: *min,
                        max: *max,
                    });
                }
            }
        }

        let id = self.store.next_survey_id()?;
        let questions = draft
            .questions
            .into_iter()
            .enumerate()
            .map(|(index, question)| Question {
                id: QuestionId(format!("{id}-q{}", index + 1)),
                survey_id: id.clone(),
                text: question.text,
                order_index: index as u32,
                required: question.required,
                config: question.config,
            })
            .collect::<Vec<_>>();

        let survey = Survey {
            id: id.clone(),
            title: draft.title,
            description: draft.description,
            kind: draft.kind,
            status: SurveyStatus::Draft,
            started_responses: 0,
            completion_rate: 0.0,
            published_at: None,
            closed_at: None,
            created_at: now,
        };

        let question_count = questions.len();
        self.store.insert_survey(survey.clone(), questions)?;
        info!(survey_id = %id, question_count, "created draft survey");
        Ok(survey)
    }

    /// Only drafts may be published; anything else is rejected untouched.
    pub fn publish(&self, survey_id: &SurveyId, now: DateTime<Utc>) -> Result<Survey, LifecycleError> {
        let survey = self.store.load_survey(survey_id)?;
        if survey.status != SurveyStatus::Draft {
            warn!(survey_id = %survey_id, status = %survey.status, "rejected publish");
            return Err(LifecycleError::InvalidStateTransition {
                survey_id: survey_id.clone(),
                from: survey.status,
                to: SurveyStatus::Published,
            });
        }

        self.store
            .persist_lifecycle_transition(survey_id, SurveyStatus::Published, now)?;
        info!(survey_id = %survey_id, "published survey");
        Ok(self.store.load_survey(survey_id)?)
    }

    /// Closing is accepted from any state, including closed.
    pub fn close(&self, survey_id: &SurveyId, now: DateTime<Utc>) -> Result<Survey, LifecycleError> {
        let survey = self.store.load_survey(survey_id)?;
        self.store
            .persist_lifecycle_transition(survey_id, SurveyStatus::Closed, now)?;
        info!(survey_id = %survey_id, from = %survey.status, "closed survey");
        Ok(self.store.load_survey(survey_id)?)
    }

    pub fn start_response(
        &self,
        survey_id: &SurveyId,
        respondent: Option<String>,
        signal: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Response, LifecycleError> {
        let response = self.store.create_response(NewResponse {
            survey_id: survey_id.clone(),
            respondent,
            signal,
            started_at: now,
        })?;
        info!(survey_id = %survey_id, response_id = %response.id, "started response");
        Ok(response)
    }

    /// Appends an answer; the question must belong to the response's survey.
    pub fn record_answer(
        &self,
        response_id: &ResponseId,
        question_id: &QuestionId,
        value: Value,
    ) -> Result<(), LifecycleError> {
        let response = self.store.load_response(response_id)?;
        let questions = self.store.load_questions(&response.survey_id)?;
        if !questions.iter().any(|question| question.id == *question_id) {
            return Err(StoreError::question_not_found(question_id).into());
        }

        self.store.append_answer(response_id, question_id, value)?;
        Ok(())
    }

    /// Stamps the response complete and recomputes the survey's stored
    /// completion rate from current counts.
    pub fn complete_response(
        &self,
        response_id: &ResponseId,
        now: DateTime<Utc>,
    ) -> Result<CompletionUpdate, LifecycleError> {
        let response = self.store.mark_response_completed(response_id, now)?;
        let survey_id = response.survey_id;

        let completed_responses = self
            .store
            .load_responses_with_answers(&survey_id)?
            .iter()
            .filter(|candidate| candidate.is_completed())
            .count();
        let started_responses = self.store.count_started_responses(&survey_id)?;
        let rate = completion_rate(completed_responses, started_responses);
        self.store.persist_completion_rate(&survey_id, rate)?;

        info!(
            survey_id = %survey_id,
            response_id = %response_id,
            completion_rate = rate,
            "completed response"
        );

        Ok(CompletionUpdate {
            response_id: response.id,
            survey_id,
            completed_at: now,
            completed_responses,
            started_responses,
            completion_rate: rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surveys::store::InMemorySurveyStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn draft() -> SurveyDraft {
        SurveyDraft {
            title: "Checkout pulse".to_string(),
            description: None,
            kind: SurveyKind::QuickPoll,
            questions: vec![QuestionDraft {
                text: "How was checkout?".to_string(),
                required: true,
                config: QuestionConfig::RatingScale {
                    min: 1,
                    max: 5,
                    min_label: None,
                    max_label: None,
                },
            }],
        }
    }

    fn lifecycle() -> (Arc<InMemorySurveyStore>, SurveyLifecycle<InMemorySurveyStore>) {
        let store = Arc::new(InMemorySurveyStore::default());
        (store.clone(), SurveyLifecycle::new(store))
    }

    #[test]
    fn publish_requires_draft_and_stamps_timestamp() {
        let (_, lifecycle) = lifecycle();
        let survey = lifecycle.create_draft(draft(), at(8)).expect("draft created");

        let published = lifecycle.publish(&survey.id, at(9)).expect("draft publishes");
        assert_eq!(published.status, SurveyStatus::Published);
        assert_eq!(published.published_at, Some(at(9)));

        match lifecycle.publish(&survey.id, at(10)) {
            Err(LifecycleError::InvalidStateTransition { from, to, .. }) => {
                assert_eq!(from, SurveyStatus::Published);
                assert_eq!(to, SurveyStatus::Published);
            }
            other => panic!("expected invalid transition, got {other:?}"),
        }
    }

    #[test]
    fn close_is_permissive_from_any_state() {
        let (_, lifecycle) = lifecycle();
        let survey = lifecycle.create_draft(draft(), at(8)).expect("draft created");

        let closed = lifecycle.close(&survey.id, at(9)).expect("draft closes");
        assert_eq!(closed.status, SurveyStatus::Closed);
        let reclosed = lifecycle.close(&survey.id, at(11)).expect("closed closes again");
        assert_eq!(reclosed.closed_at, Some(at(11)));
    }

    #[test]
    fn completing_responses_recomputes_completion_rate() {
        let (store, lifecycle) = lifecycle();
        let survey = lifecycle.create_draft(draft(), at(8)).expect("draft created");
        let question_id = QuestionId(format!("{}-q1", survey.id));

        let first = lifecycle
            .start_response(&survey.id, None, Some("committed".to_string()), at(9))
            .expect("first response");
        lifecycle
            .start_response(&survey.id, Some("user-2".to_string()), None, at(9))
            .expect("second response");
        lifecycle
            .record_answer(&first.id, &question_id, json!(4))
            .expect("answer recorded");

        let update = lifecycle
            .complete_response(&first.id, at(10))
            .expect("response completes");

        assert_eq!(update.completed_responses, 1);
        assert_eq!(update.started_responses, 2);
        assert_eq!(update.completion_rate, 50.0);
        let stored = store.load_survey(&survey.id).expect("survey loads");
        assert_eq!(stored.completion_rate, 50.0);
    }

    #[test]
    fn answers_for_foreign_questions_are_rejected() {
        let (_, lifecycle) = lifecycle();
        let survey = lifecycle.create_draft(draft(), at(8)).expect("draft created");
        let response = lifecycle
            .start_response(&survey.id, None, None, at(9))
            .expect("response");

        let err = lifecycle
            .record_answer(&response.id, &QuestionId("elsewhere".to_string()), json!(1))
            .expect_err("foreign question rejected");
        assert!(matches!(err, LifecycleError::Store(ref store) if store.is_not_found()));
    }

    #[test]
    fn drafts_with_unusable_rating_scales_are_rejected() {
        let (store, lifecycle) = lifecycle();
        for (min, max) in [(5, 1), (0, i64::MAX), (i64::MIN, 0)] {
            let mut draft = draft();
            draft.questions[0].config = QuestionConfig::RatingScale {
                min,
                max,
                min_label: None,
                max_label: None,
            };
            match lifecycle.create_draft(draft, at(8)) {
                Err(LifecycleError::InvalidRatingScale { position, .. }) => assert_eq!(position, 1),
                other => panic!("expected invalid scale, got {other:?}"),
            }
        }
        assert!(store.load_survey(&SurveyId("survey-000001".to_string())).is_err());
    }

    #[test]
    fn draft_ids_skip_surveys_already_in_the_store() {
        let (store, lifecycle) = lifecycle();
        let first = lifecycle.create_draft(draft(), at(8)).expect("first draft");
        assert_eq!(first.id.0, "survey-000001");

        let mut taken = store.load_survey(&first.id).expect("survey loads");
        taken.id = SurveyId("survey-000002".to_string());
        store.insert_survey(taken, Vec::new()).expect("seeded survey");

        let next = lifecycle.create_draft(draft(), at(9)).expect("second draft");
        assert_eq!(next.id.0, "survey-000003");
    }

    #[test]
    fn publishing_unknown_survey_propagates_not_found() {
        let (_, lifecycle) = lifecycle();
        let err = lifecycle
            .publish(&SurveyId("missing".to_string()), at(9))
            .expect_err("unknown survey");
        assert!(matches!(err, LifecycleError::Store(StoreError::NotFound { .. })));
    }
}
