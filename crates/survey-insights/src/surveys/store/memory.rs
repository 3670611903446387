use super::{NewResponse, StoreError, SurveySnapshot, SurveyStore};
use crate::surveys::domain::{
    sort_questions, Answer, Question, QuestionId, Response, ResponseId, Survey, SurveyId,
    SurveyStatus,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct StoreState {
    surveys: HashMap<SurveyId, Survey>,
    questions: HashMap<SurveyId, Vec<Question>>,
    responses: Vec<Response>,
}

/// Process-local store backing the service binary, demos, and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemorySurveyStore {
    state: Arc<Mutex<StoreState>>,
    survey_sequence: Arc<AtomicU64>,
    response_sequence: Arc<AtomicU64>,
}

impl InMemorySurveyStore {
    pub fn from_snapshot(snapshot: SurveySnapshot) -> Result<Self, StoreError> {
        let store = Self::default();
        let SurveySnapshot {
            survey,
            questions,
            responses,
        } = snapshot;
        let survey_id = survey.id.clone();
        store.insert_survey(survey, questions)?;

        let mut state = store.lock()?;
        for mut response in responses {
            response.survey_id = survey_id.clone();
            state.responses.push(response);
        }
        drop(state);

        Ok(store)
    }

    pub fn snapshot(&self, survey_id: &SurveyId) -> Result<SurveySnapshot, StoreError> {
        Ok(SurveySnapshot {
            survey: self.load_survey(survey_id)?,
            questions: self.load_questions(survey_id)?,
            responses: self.load_responses_with_answers(survey_id)?,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("survey store mutex poisoned".to_string()))
    }

    fn next_response_id(&self) -> ResponseId {
        let id = self.response_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        ResponseId(format!("resp-{id:06}"))
    }
}

fn find_response<'a>(
    responses: &'a mut [Response],
    id: &ResponseId,
) -> Result<&'a mut Response, StoreError> {
    responses
        .iter_mut()
        .find(|response| response.id == *id)
        .ok_or_else(|| StoreError::response_not_found(id))
}

impl SurveyStore for InMemorySurveyStore {
    fn next_survey_id(&self) -> Result<SurveyId, StoreError> {
        let state = self.lock()?;
        loop {
            let id = self.survey_sequence.fetch_add(1, Ordering::Relaxed) + 1;
            let candidate = SurveyId(format!("survey-{id:06}"));
            if !state.surveys.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
    }

    fn insert_survey(&self, survey: Survey, mut questions: Vec<Question>) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.surveys.contains_key(&survey.id) {
            return Err(StoreError::Conflict {
                entity: "survey",
                id: survey.id.0.clone(),
            });
        }
        sort_questions(&mut questions);
        state.questions.insert(survey.id.clone(), questions);
        state.surveys.insert(survey.id.clone(), survey);
        Ok(())
    }

    fn load_survey(&self, id: &SurveyId) -> Result<Survey, StoreError> {
        self.lock()?
            .surveys
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::survey_not_found(id))
    }

    fn load_questions(&self, survey_id: &SurveyId) -> Result<Vec<Question>, StoreError> {
        let state = self.lock()?;
        if !state.surveys.contains_key(survey_id) {
            return Err(StoreError::survey_not_found(survey_id));
        }
        Ok(state.questions.get(survey_id).cloned().unwrap_or_default())
    }

    fn load_responses_with_answers(
        &self,
        survey_id: &SurveyId,
    ) -> Result<Vec<Response>, StoreError> {
        let state = self.lock()?;
        if !state.surveys.contains_key(survey_id) {
            return Err(StoreError::survey_not_found(survey_id));
        }
        Ok(state
            .responses
            .iter()
            .filter(|response| response.survey_id == *survey_id)
            .cloned()
            .collect())
    }

    fn count_started_responses(&self, survey_id: &SurveyId) -> Result<u64, StoreError> {
        self.lock()?
            .surveys
            .get(survey_id)
            .map(|survey| survey.started_responses)
            .ok_or_else(|| StoreError::survey_not_found(survey_id))
    }

    fn persist_completion_rate(&self, survey_id: &SurveyId, rate: f64) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let survey = state
            .surveys
            .get_mut(survey_id)
            .ok_or_else(|| StoreError::survey_not_found(survey_id))?;
        survey.completion_rate = rate;
        Ok(())
    }

    fn persist_lifecycle_transition(
        &self,
        survey_id: &SurveyId,
        status: SurveyStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let survey = state
            .surveys
            .get_mut(survey_id)
            .ok_or_else(|| StoreError::survey_not_found(survey_id))?;
        survey.status = status;
        match status {
            SurveyStatus::Published => survey.published_at = Some(at),
            SurveyStatus::Closed => survey.closed_at = Some(at),
            SurveyStatus::Draft => {}
        }
        Ok(())
    }

    fn create_response(&self, response: NewResponse) -> Result<Response, StoreError> {
        let id = self.next_response_id();
        let mut state = self.lock()?;
        let survey = state
            .surveys
            .get_mut(&response.survey_id)
            .ok_or_else(|| StoreError::survey_not_found(&response.survey_id))?;
        survey.started_responses += 1;

        let record = Response {
            id,
            survey_id: response.survey_id,
            respondent: response.respondent,
            signal: response.signal,
            started_at: response.started_at,
            completed_at: None,
            answers: Vec::new(),
        };
        state.responses.push(record.clone());
        Ok(record)
    }

    fn load_response(&self, id: &ResponseId) -> Result<Response, StoreError> {
        self.lock()?
            .responses
            .iter()
            .find(|response| response.id == *id)
            .cloned()
            .ok_or_else(|| StoreError::response_not_found(id))
    }

    fn append_answer(
        &self,
        response_id: &ResponseId,
        question_id: &QuestionId,
        value: Value,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let response = find_response(&mut state.responses, response_id)?;
        response.answers.push(Answer {
            question_id: question_id.clone(),
            value,
        });
        Ok(())
    }

    fn mark_response_completed(
        &self,
        response_id: &ResponseId,
        at: DateTime<Utc>,
    ) -> Result<Response, StoreError> {
        let mut state = self.lock()?;
        let response = find_response(&mut state.responses, response_id)?;
        response.completed_at = Some(at);
        Ok(response.clone())
    }
}
