use crate::infra::{load_snapshot, save_snapshot};
use chrono::{Duration, Utc};
use clap::{Args, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use survey_insights::config::AppConfig;
use survey_insights::error::AppError;
use survey_insights::surveys::export::render_details;
use survey_insights::surveys::{
    ExportFormat, InMemorySurveyStore, InsightRules, QuestionConfig, QuestionDraft, QuestionId,
    SurveyDraft, SurveyId, SurveyInsight, SurveyKind, SurveyResults, SurveyService, SurveyServiceError,
    SurveyStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum ReportFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// JSON snapshot containing `survey`, `questions`, and `responses`
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Output encoding
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub(crate) format: ReportFormat,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of sample respondents to simulate.
    #[arg(long, default_value_t = 12)]
    pub(crate) respondents: usize,
    /// Leave every third response in progress to show completion tracking.
    #[arg(long)]
    pub(crate) leave_incomplete: bool,
    /// Skip printing the JSON and CSV exports.
    #[arg(long)]
    pub(crate) skip_exports: bool,
    /// Write the seeded survey to this path so `report --snapshot` can read it.
    #[arg(long)]
    pub(crate) save_snapshot: Option<PathBuf>,
}

fn insight_rules() -> Result<InsightRules, AppError> {
    Ok(AppConfig::load()?.insights)
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs { snapshot, format } = args;
    let (store, survey_id) = load_snapshot(snapshot)?;
    let service = SurveyService::new(Arc::new(store), insight_rules()?);

    match format {
        ReportFormat::Text => {
            let results = service.results(&survey_id)?;
            let insight = service.insights(&survey_id)?;
            render_report(&results, &insight);
        }
        ReportFormat::Json => {
            println!("{}", service.export(&survey_id, ExportFormat::Json)?.body);
        }
        ReportFormat::Csv => {
            print!("{}", service.export(&survey_id, ExportFormat::Csv)?.body);
        }
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        respondents,
        leave_incomplete,
        skip_exports,
        save_snapshot: snapshot_path,
    } = args;

    let store = Arc::new(InMemorySurveyStore::default());
    let service = SurveyService::new(store.clone(), insight_rules()?);
    let survey_id = seed_demo_survey(&service, respondents, leave_incomplete)?;

    println!("Survey insights demo");
    let results = service.results(&survey_id)?;
    let insight = service.insights(&survey_id)?;
    render_report(&results, &insight);

    if !skip_exports {
        let json = service.export(&survey_id, ExportFormat::Json)?;
        println!("\n{} ({})", json.filename, json.content_type);
        println!("{}", json.body);

        let csv = service.export(&survey_id, ExportFormat::Csv)?;
        println!("\n{} ({})", csv.filename, csv.content_type);
        print!("{}", csv.body);
    }

    let stored = store
        .load_survey(&survey_id)
        .map_err(SurveyServiceError::from)?;
    println!(
        "\nStored completion rate: {:.1}% ({} started)",
        stored.completion_rate, stored.started_responses
    );

    if let Some(path) = snapshot_path {
        save_snapshot(&store, &survey_id, &path)?;
        println!("Snapshot written to {}", path.display());
    }

    Ok(())
}

fn demo_draft() -> SurveyDraft {
    SurveyDraft {
        title: "Product Loyalty Pulse".to_string(),
        description: Some("Sample NPS survey generated by the demo command".to_string()),
        kind: SurveyKind::Nps,
        questions: vec![
            QuestionDraft {
                text: "How likely are you to recommend us to a colleague?".to_string(),
                required: true,
                config: QuestionConfig::RatingScale {
                    min: 0,
                    max: 10,
                    min_label: Some("Not at all likely".to_string()),
                    max_label: Some("Extremely likely".to_string()),
                },
            },
            QuestionDraft {
                text: "Which plan are you on?".to_string(),
                required: true,
                config: QuestionConfig::MultipleChoice {
                    options: vec![
                        "Starter".to_string(),
                        "Growth".to_string(),
                        "Enterprise".to_string(),
                    ],
                },
            },
            QuestionDraft {
                text: "Rank what we should build next".to_string(),
                required: false,
                config: QuestionConfig::Ranking {
                    items: vec![
                        "Mobile app".to_string(),
                        "Integrations".to_string(),
                        "Reporting".to_string(),
                    ],
                },
            },
            QuestionDraft {
                text: "Rate \"Support\" and \"Docs\"".to_string(),
                required: false,
                config: QuestionConfig::Matrix {
                    rows: vec!["Support".to_string(), "Docs".to_string()],
                    columns: vec!["Speed".to_string(), "Quality".to_string()],
                },
            },
            QuestionDraft {
                text: "Anything else, in your own words?".to_string(),
                required: false,
                config: QuestionConfig::OpenText,
            },
        ],
    }
}

fn seed_demo_survey(
    service: &SurveyService<InMemorySurveyStore>,
    respondents: usize,
    leave_incomplete: bool,
) -> Result<SurveyId, AppError> {
    const SCORES: [i64; 8] = [10, 9, 7, 9, 4, 10, 8, 6];
    const PLANS: [&str; 5] = ["Growth", "Growth", "Starter", "Enterprise", "Growth"];
    const RANKINGS: [[&str; 3]; 3] = [
        ["Integrations", "Reporting", "Mobile app"],
        ["Integrations", "Mobile app", "Reporting"],
        ["Reporting", "Integrations", "Mobile app"],
    ];
    const COMMENTS: [&str; 4] = ["Faster exports", "", "faster exports", "More dashboards"];

    let launch = Utc::now() - Duration::days(3);
    let survey = service.create_draft(demo_draft(), launch)?;
    service.publish(&survey.id, launch + Duration::minutes(5))?;

    let question = |index: usize| QuestionId(format!("{}-q{}", survey.id, index));

    for index in 0..respondents {
        let started = launch + Duration::minutes(30 + index as i64 * 17);
        let response = service.start_response(
            &survey.id,
            Some(format!("member-{:03}", index + 1)),
            Some(if index % 2 == 0 { "committed" } else { "curious" }.to_string()),
            started,
        )?;

        let answers = [
            json!(SCORES[index % SCORES.len()].to_string()),
            json!(PLANS[index % PLANS.len()]),
            json!(RANKINGS[index % RANKINGS.len()]),
            json!({
                "Support": { "Speed": 3 + (index % 3), "Quality": 4 },
                "Docs": { "Speed": (2 + index % 4).to_string(), "Quality": "n/a" }
            }),
            json!(COMMENTS[index % COMMENTS.len()]),
        ];
        for (position, value) in answers.into_iter().enumerate() {
            service.record_answer(&response.id, &question(position + 1), value)?;
        }

        if leave_incomplete && index % 3 == 2 {
            continue;
        }
        service.complete_response(&response.id, started + Duration::minutes(4))?;
    }

    Ok(survey.id)
}

fn render_report(results: &SurveyResults, insight: &SurveyInsight) {
    println!(
        "Survey: {} [{} | {}]",
        results.survey.title, results.survey.kind_label, results.survey.status_label
    );
    println!(
        "Responses: {} completed of {} started ({:.1}% completion)",
        results.total_responses, results.started_responses, results.completion_rate
    );

    println!("\nQuestions");
    for question in &results.questions {
        println!(
            "- {} ({}, {} answers)",
            question.question_text,
            question.question_type.label(),
            question.answer_count
        );
        let details = render_details(&question.summary);
        if !details.is_empty() {
            println!("    {details}");
        }
    }

    println!("\nSummary\n{}", insight.summary);

    if insight.key_findings.is_empty() {
        println!("\nKey findings: none");
    } else {
        println!("\nKey findings");
        for finding in &insight.key_findings {
            println!("- {finding}");
        }
    }

    if insight.recommendations.is_empty() {
        println!("\nRecommendations: none");
    } else {
        println!("\nRecommendations");
        for recommendation in &insight.recommendations {
            println!("- {recommendation}");
        }
    }

    if let Some(nps) = &insight.nps {
        println!(
            "\nNPS breakdown: {} promoters, {} passives, {} detractors over {} completed",
            nps.promoters, nps.passives, nps.detractors, nps.respondents
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_demo_survey_produces_nps_insight() {
        let service = SurveyService::new(
            Arc::new(InMemorySurveyStore::default()),
            InsightRules::default(),
        );
        let survey_id = seed_demo_survey(&service, 8, false).expect("demo seeds");

        let results = service.results(&survey_id).expect("results");
        assert_eq!(results.total_responses, 8);
        assert_eq!(results.questions.len(), 5);

        let insight = service.insights(&survey_id).expect("insights");
        let nps = insight.nps.expect("nps survey");
        assert_eq!(nps.promoters, 4);
        assert_eq!(nps.detractors, 2);
        assert_eq!(nps.score, 25.0);
    }

    #[test]
    fn incomplete_responses_lower_completion_rate() {
        let service = SurveyService::new(
            Arc::new(InMemorySurveyStore::default()),
            InsightRules::default(),
        );
        let survey_id = seed_demo_survey(&service, 6, true).expect("demo seeds");

        let results = service.results(&survey_id).expect("results");
        assert_eq!(results.started_responses, 6);
        assert_eq!(results.total_responses, 4);
        assert_eq!(results.completion_rate, 66.67);
        assert_eq!(results.questions[0].answer_count, 6);
    }
}
