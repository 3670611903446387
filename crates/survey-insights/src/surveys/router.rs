use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;

use super::domain::{QuestionId, ResponseId, SurveyId};
use super::export::ExportFormat;
use super::lifecycle::SurveyDraft;
use super::service::{SurveyService, SurveyServiceError};
use super::store::SurveyStore;

/// Router builder exposing results, insights, exports, and lifecycle calls.
pub fn survey_router<S>(service: Arc<SurveyService<S>>) -> Router
where
    S: SurveyStore + 'static,
{
    Router::new()
        .route("/api/v1/surveys", post(create_handler::<S>))
        .route("/api/v1/surveys/:survey_id/results", get(results_handler::<S>))
        .route("/api/v1/surveys/:survey_id/insights", get(insights_handler::<S>))
        .route("/api/v1/surveys/:survey_id/export", get(export_handler::<S>))
        .route("/api/v1/surveys/:survey_id/publish", post(publish_handler::<S>))
        .route("/api/v1/surveys/:survey_id/close", post(close_handler::<S>))
        .route(
            "/api/v1/surveys/:survey_id/responses",
            post(start_response_handler::<S>),
        )
        .route(
            "/api/v1/responses/:response_id/answers",
            post(answer_handler::<S>),
        )
        .route(
            "/api/v1/responses/:response_id/complete",
            post(complete_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExportQuery {
    #[serde(default)]
    pub(crate) format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StartResponseRequest {
    #[serde(default)]
    pub(crate) respondent: Option<String>,
    #[serde(default)]
    pub(crate) signal: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerRequest {
    pub(crate) question_id: QuestionId,
    pub(crate) value: Value,
}

fn error_response(error: SurveyServiceError) -> Response {
    AppError::from(error).into_response()
}

fn respond<T: serde::Serialize>(
    status: StatusCode,
    result: Result<T, SurveyServiceError>,
) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_handler<S>(
    State(service): State<Arc<SurveyService<S>>>,
    Json(draft): Json<SurveyDraft>,
) -> Response
where
    S: SurveyStore + 'static,
{
    respond(StatusCode::CREATED, service.create_draft(draft, Utc::now()))
}

pub(crate) async fn results_handler<S>(
    State(service): State<Arc<SurveyService<S>>>,
    Path(survey_id): Path<String>,
) -> Response
where
    S: SurveyStore + 'static,
{
    respond(StatusCode::OK, service.results(&SurveyId(survey_id)))
}

pub(crate) async fn insights_handler<S>(
    State(service): State<Arc<SurveyService<S>>>,
    Path(survey_id): Path<String>,
) -> Response
where
    S: SurveyStore + 'static,
{
    respond(StatusCode::OK, service.insights(&SurveyId(survey_id)))
}

pub(crate) async fn export_handler<S>(
    State(service): State<Arc<SurveyService<S>>>,
    Path(survey_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Response
where
    S: SurveyStore + 'static,
{
    let format = match query.format.as_deref().map(str::parse::<ExportFormat>) {
        None => ExportFormat::default(),
        Some(Ok(format)) => format,
        Some(Err(error)) => return error_response(error.into()),
    };

    match service.export(&SurveyId(survey_id), format) {
        Ok(document) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, document.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", document.filename),
                ),
            ],
            document.body,
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn publish_handler<S>(
    State(service): State<Arc<SurveyService<S>>>,
    Path(survey_id): Path<String>,
) -> Response
where
    S: SurveyStore + 'static,
{
    respond(StatusCode::OK, service.publish(&SurveyId(survey_id), Utc::now()))
}

pub(crate) async fn close_handler<S>(
    State(service): State<Arc<SurveyService<S>>>,
    Path(survey_id): Path<String>,
) -> Response
where
    S: SurveyStore + 'static,
{
    respond(StatusCode::OK, service.close(&SurveyId(survey_id), Utc::now()))
}

pub(crate) async fn start_response_handler<S>(
    State(service): State<Arc<SurveyService<S>>>,
    Path(survey_id): Path<String>,
    Json(request): Json<StartResponseRequest>,
) -> Response
where
    S: SurveyStore + 'static,
{
    respond(
        StatusCode::CREATED,
        service.start_response(
            &SurveyId(survey_id),
            request.respondent,
            request.signal,
            Utc::now(),
        ),
    )
}

pub(crate) async fn answer_handler<S>(
    State(service): State<Arc<SurveyService<S>>>,
    Path(response_id): Path<String>,
    Json(request): Json<AnswerRequest>,
) -> Response
where
    S: SurveyStore + 'static,
{
    match service.record_answer(&ResponseId(response_id), &request.question_id, request.value) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn complete_handler<S>(
    State(service): State<Arc<SurveyService<S>>>,
    Path(response_id): Path<String>,
) -> Response
where
    S: SurveyStore + 'static,
{
    respond(
        StatusCode::OK,
        service.complete_response(&ResponseId(response_id), Utc::now()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surveys::domain::{QuestionConfig, SurveyKind};
    use crate::surveys::insights::InsightRules;
    use crate::surveys::lifecycle::QuestionDraft;
    use crate::surveys::store::InMemorySurveyStore;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    fn service() -> Arc<SurveyService<InMemorySurveyStore>> {
        Arc::new(SurveyService::new(
            Arc::new(InMemorySurveyStore::default()),
            InsightRules::default(),
        ))
    }

    fn draft() -> SurveyDraft {
        SurveyDraft {
            title: "Support \"Pulse\"".to_string(),
            description: None,
            kind: SurveyKind::DetailedSurvey,
            questions: vec![QuestionDraft {
                text: "Rate support".to_string(),
                required: true,
                config: QuestionConfig::RatingScale {
                    min: 1,
                    max: 5,
                    min_label: Some("Poor".to_string()),
                    max_label: Some("Great".to_string()),
                },
            }],
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn results_handler_returns_not_found_for_unknown_survey() {
        let response = results_handler(State(service()), Path("nope".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "survey error: survey nope not found");
    }

    #[tokio::test]
    async fn publish_handler_returns_conflict_when_not_draft() {
        let service = service();
        let survey = service.create_draft(draft(), Utc::now()).expect("draft");

        let first = publish_handler(State(service.clone()), Path(survey.id.0.clone())).await;
        assert_eq!(first.status(), StatusCode::OK);
        let second = publish_handler(State(service), Path(survey.id.0.clone())).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn export_route_serves_csv_attachment() {
        let service = service();
        let survey = service.create_draft(draft(), Utc::now()).expect("draft");
        let router = survey_router(service);

        let response = router
            .oneshot(
                Request::get(format!("/api/v1/surveys/{}/export?format=csv", survey.id))
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .expect("ascii header");
        assert!(disposition.contains(&format!("survey-{}-results.csv", survey.id)));
    }

    #[tokio::test]
    async fn export_route_rejects_unknown_format() {
        let service = service();
        let survey = service.create_draft(draft(), Utc::now()).expect("draft");
        let router = survey_router(service);

        let response = router
            .oneshot(
                Request::get(format!("/api/v1/surveys/{}/export?format=xlsx", survey.id))
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "survey error: unsupported export format 'xlsx'"
        );
    }

    #[tokio::test]
    async fn create_route_rejects_inverted_rating_scale() {
        let router = survey_router(service());
        let mut draft = draft();
        draft.questions[0].config = QuestionConfig::RatingScale {
            min: 10,
            max: 0,
            min_label: None,
            max_label: None,
        };

        let response = router
            .oneshot(
                Request::post("/api/v1/surveys")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::to_string(&draft).expect("draft serializes"),
                    ))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn response_routes_record_and_complete() {
        let service = service();
        let survey = service.create_draft(draft(), Utc::now()).expect("draft");
        let router = survey_router(service.clone());

        let started = router
            .clone()
            .oneshot(
                Request::post(format!("/api/v1/surveys/{}/responses", survey.id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"signal":"curious"}"#))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(started.status(), StatusCode::CREATED);
        let response_id = body_json(started).await["id"]
            .as_str()
            .expect("response id")
            .to_string();

        let answer = json!({ "question_id": format!("{}-q1", survey.id), "value": "4" });
        let answered = router
            .clone()
            .oneshot(
                Request::post(format!("/api/v1/responses/{response_id}/answers"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(answer.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(answered.status(), StatusCode::NO_CONTENT);

        let completed = router
            .oneshot(
                Request::post(format!("/api/v1/responses/{response_id}/complete"))
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(completed.status(), StatusCode::OK);
        assert_eq!(body_json(completed).await["completion_rate"], 100.0);

        let results = service.results(&survey.id).expect("results");
        assert_eq!(results.total_responses, 1);
        assert_eq!(results.questions[0].answer_count, 1);
    }
}
