use super::aggregate::{round2, summarize, QuestionSummary};
use super::domain::{
    Question, QuestionId, QuestionKind, Response, Survey, SurveyId, SurveyKind, SurveyStatus,
};
use super::store::{StoreError, SurveyStore};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct SurveyOverview {
    pub id: SurveyId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: SurveyKind,
    pub kind_label: &'static str,
    pub status: SurveyStatus,
    pub status_label: &'static str,
}

impl SurveyOverview {
    fn from_survey(survey: &Survey) -> Self {
        Self {
            id: survey.id.clone(),
            title: survey.title.clone(),
            description: survey.description.clone(),
            kind: survey.kind,
            kind_label: survey.kind.label(),
            status: survey.status,
            status_label: survey.status.label(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub question_text: String,
    pub question_type: QuestionKind,
    /// Answers recorded before any normalization filtering.
    pub answer_count: usize,
    pub summary: QuestionSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyResults {
    pub survey: SurveyOverview,
    /// Responses with a completion timestamp.
    pub total_responses: usize,
    pub started_responses: u64,
    pub completion_rate: f64,
    pub questions: Vec<QuestionResult>,
}

/// Completed share of the started-count, with the denominator floored at 1.
///
/// The started-count is the survey's denormalized counter, so a stale value
/// can push the result past 100.
pub fn completion_rate(completed: usize, started: u64) -> f64 {
    round2(completed as f64 / started.max(1) as f64 * 100.0)
}

/// Loads a survey through `store` and compiles its per-question results.
pub fn compile_results<S>(store: &S, survey_id: &SurveyId) -> Result<SurveyResults, StoreError>
where
    S: SurveyStore + ?Sized,
{
    let survey = store.load_survey(survey_id)?;
    let questions = store.load_questions(survey_id)?;
    let responses = store.load_responses_with_answers(survey_id)?;
    let started = store.count_started_responses(survey_id)?;

    let results = compile(&survey, &questions, &responses, started);
    info!(
        survey_id = %survey_id,
        question_count = results.questions.len(),
        completed = results.total_responses,
        completion_rate = results.completion_rate,
        "compiled survey results"
    );
    Ok(results)
}

/// Pure compilation over already-loaded rows. Answers from in-progress
/// responses are aggregated alongside completed ones.
pub fn compile(
    survey: &Survey,
    questions: &[Question],
    responses: &[Response],
    started: u64,
) -> SurveyResults {
    let total_responses = responses
        .iter()
        .filter(|response| response.is_completed())
        .count();

    let mut answers_by_question: HashMap<&QuestionId, Vec<&Value>> = HashMap::new();
    for answer in responses.iter().flat_map(|response| &response.answers) {
        answers_by_question
            .entry(&answer.question_id)
            .or_default()
            .push(&answer.value);
    }

    let questions = questions
        .iter()
        .map(|question| {
            let answers = answers_by_question
                .get(&question.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            debug!(
                question_id = %question.id,
                kind = question.kind().label(),
                answers = answers.len(),
                "aggregating question"
            );
            QuestionResult {
                question_id: question.id.clone(),
                question_text: question.text.clone(),
                question_type: question.kind(),
                answer_count: answers.len(),
                summary: summarize(&question.config, answers),
            }
        })
        .collect();

    SurveyResults {
        survey: SurveyOverview::from_survey(survey),
        total_responses,
        started_responses: started,
        completion_rate: completion_rate(total_responses, started),
        questions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surveys::domain::{Answer, QuestionConfig, ResponseId};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 2, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn survey(started: u64) -> Survey {
        Survey {
            id: SurveyId("s-1".to_string()),
            title: "Pricing".to_string(),
            description: None,
            kind: SurveyKind::QuickPoll,
            status: SurveyStatus::Published,
            started_responses: started,
            completion_rate: 0.0,
            published_at: Some(at(8)),
            closed_at: None,
            created_at: at(7),
        }
    }

    fn question() -> Question {
        Question {
            id: QuestionId("q-plan".to_string()),
            survey_id: SurveyId("s-1".to_string()),
            text: "Which plan fits?".to_string(),
            order_index: 0,
            required: true,
            config: QuestionConfig::MultipleChoice {
                options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            },
        }
    }

    fn response(id: &str, value: Value, completed: bool) -> Response {
        Response {
            id: ResponseId(id.to_string()),
            survey_id: SurveyId("s-1".to_string()),
            respondent: None,
            signal: None,
            started_at: at(9),
            completed_at: completed.then(|| at(10)),
            answers: vec![Answer {
                question_id: QuestionId("q-plan".to_string()),
                value,
            }],
        }
    }

    #[test]
    fn completion_rate_floors_denominator() {
        assert_eq!(completion_rate(5, 20), 25.0);
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(5, 0), 500.0);
    }

    #[test]
    fn compile_counts_completed_but_aggregates_every_answer() {
        let responses = vec![
            response("r1", json!("A"), true),
            response("r2", json!("A"), true),
            response("r3", json!("B"), false),
            response("r4", json!("C"), true),
        ];

        let results = compile(&survey(4), &[question()], &responses, 4);

        assert_eq!(results.total_responses, 3);
        assert_eq!(results.completion_rate, 75.0);
        let question = &results.questions[0];
        assert_eq!(question.answer_count, 4);
        match &question.summary {
            QuestionSummary::MultipleChoice(summary) => {
                assert_eq!(summary.options[0].option, "A");
                assert_eq!(summary.options[0].count, 2);
                assert_eq!(summary.options[1].option, "B");
            }
            other => panic!("expected multiple-choice summary, got {other:?}"),
        }
    }

    #[test]
    fn questions_without_answers_still_produce_summaries() {
        let results = compile(&survey(0), &[question()], &[], 0);
        assert_eq!(results.questions[0].answer_count, 0);
        assert_eq!(results.completion_rate, 0.0);
    }
}
