use super::aggregate::{round2, QuestionSummary, RatingSummary};
use super::domain::SurveyKind;
use super::results::SurveyResults;
use serde::Serialize;

/// Thresholds driving the rule-based findings.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightRules {
    /// Rating averages at or below this are flagged as low satisfaction.
    pub low_satisfaction_max: f64,
    /// Rating averages at or above this are flagged as strong satisfaction.
    pub strong_satisfaction_min: f64,
    /// Top multiple-choice share (percent) that must be exceeded.
    pub dominant_share_pct: f64,
    /// Completion rates below this trigger a shortening recommendation.
    pub completion_warning_pct: f64,
    pub nps_promoter_min: i64,
    pub nps_detractor_max: i64,
}

impl Default for InsightRules {
    fn default() -> Self {
        Self {
            low_satisfaction_max: 3.0,
            strong_satisfaction_min: 4.0,
            dominant_share_pct: 50.0,
            completion_warning_pct: 50.0,
            nps_promoter_min: 9,
            nps_detractor_max: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NpsBreakdown {
    pub promoters: usize,
    pub passives: usize,
    pub detractors: usize,
    /// Completed responses; the score's denominator.
    pub respondents: usize,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyInsight {
    pub summary: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nps: Option<NpsBreakdown>,
}

pub fn generate_insights(results: &SurveyResults, rules: &InsightRules) -> SurveyInsight {
    let mut key_findings = Vec::new();
    let mut recommendations = Vec::new();

    for question in &results.questions {
        let text = &question.question_text;
        match &question.summary {
            QuestionSummary::RatingScale(rating) if rating.responses > 0 => {
                if rating.average <= rules.low_satisfaction_max {
                    key_findings.push(format!(
                        "Low satisfaction on \"{text}\" (average {:.2})",
                        rating.average
                    ));
                    recommendations.push(format!(
                        "Follow up with respondents to understand low scores on \"{text}\""
                    ));
                } else if rating.average >= rules.strong_satisfaction_min {
                    key_findings.push(format!(
                        "Strong satisfaction on \"{text}\" (average {:.2})",
                        rating.average
                    ));
                }
            }
            QuestionSummary::MultipleChoice(choices) => {
                if let Some(top) = choices.options.first() {
                    if top.percentage > rules.dominant_share_pct {
                        key_findings.push(format!(
                            "Dominant preference: {} ({:.1}%) on \"{text}\"",
                            top.option, top.percentage
                        ));
                    }
                }
            }
            QuestionSummary::OpenText(feedback) => {
                if let Some(top) = feedback.entries.first() {
                    key_findings.push(format!("Most common feedback: \"{}\"", top.text));
                }
            }
            _ => {}
        }
    }

    if results.completion_rate < rules.completion_warning_pct {
        recommendations.push(format!(
            "Consider shortening the survey; only {:.1}% of started responses were completed",
            results.completion_rate
        ));
    }

    let nps = if results.survey.kind == SurveyKind::Nps {
        first_rating(results).map(|rating| net_promoter(rating, results.total_responses, rules))
    } else {
        None
    };
    if let Some(breakdown) = &nps {
        key_findings.push(format!(
            "Net Promoter Score: {:.1} ({} promoters, {} detractors)",
            breakdown.score, breakdown.promoters, breakdown.detractors
        ));
    }

    let mut summary = format!(
        "Survey \"{}\" received {} responses ({:.1}% completion).",
        results.survey.title, results.total_responses, results.completion_rate
    );
    if let Some(first) = key_findings.first() {
        summary.push_str(&format!(" Key finding: {first}."));
    }

    SurveyInsight {
        summary,
        key_findings,
        recommendations,
        nps,
    }
}

fn first_rating(results: &SurveyResults) -> Option<&RatingSummary> {
    results
        .questions
        .iter()
        .find_map(|question| match &question.summary {
            QuestionSummary::RatingScale(rating) => Some(rating),
            _ => None,
        })
}

/// NPS over completed responses; 0 when nothing has completed.
pub fn net_promoter(rating: &RatingSummary, completed: usize, rules: &InsightRules) -> NpsBreakdown {
    let promoters = rating.count_where(|value| value >= rules.nps_promoter_min);
    let detractors = rating.count_where(|value| value <= rules.nps_detractor_max);
    let passives = rating.responses.saturating_sub(promoters + detractors);
    let score = if completed == 0 {
        0.0
    } else {
        round2((promoters as f64 - detractors as f64) / completed as f64 * 100.0)
    };

    NpsBreakdown {
        promoters,
        passives,
        detractors,
        respondents: completed,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surveys::aggregate::{summarize_choices, summarize_ratings, summarize_text};
    use crate::surveys::domain::{QuestionId, QuestionKind, SurveyId, SurveyStatus};
    use crate::surveys::results::{QuestionResult, SurveyOverview};
    use serde_json::{json, Value};

    fn results(kind: SurveyKind, completed: usize, rate: f64, questions: Vec<QuestionResult>) -> SurveyResults {
        SurveyResults {
            survey: SurveyOverview {
                id: SurveyId("s-1".to_string()),
                title: "Launch feedback".to_string(),
                description: None,
                kind,
                kind_label: kind.label(),
                status: SurveyStatus::Published,
                status_label: SurveyStatus::Published.label(),
            },
            total_responses: completed,
            started_responses: completed as u64,
            completion_rate: rate,
            questions,
        }
    }

    fn rating_question(text: &str, min: i64, max: i64, values: &[Value]) -> QuestionResult {
        let refs: Vec<&Value> = values.iter().collect();
        QuestionResult {
            question_id: QuestionId(format!("q-{text}")),
            question_text: text.to_string(),
            question_type: QuestionKind::RatingScale,
            answer_count: values.len(),
            summary: QuestionSummary::RatingScale(summarize_ratings(min, max, &refs)),
        }
    }

    #[test]
    fn rating_thresholds_leave_a_gap_between_three_and_four() {
        let questions = vec![
            rating_question("Setup", 1, 5, &[json!(2), json!(3)]),
            rating_question("Docs", 1, 5, &[json!(3), json!(4)]),
            rating_question("Support", 1, 5, &[json!(5), json!(4)]),
        ];
        let insight = generate_insights(
            &results(SurveyKind::DetailedSurvey, 2, 100.0, questions),
            &InsightRules::default(),
        );

        assert_eq!(insight.key_findings.len(), 2);
        assert!(insight.key_findings[0].starts_with("Low satisfaction on \"Setup\""));
        assert!(insight.key_findings[1].starts_with("Strong satisfaction on \"Support\""));
        assert_eq!(insight.recommendations.len(), 1);
    }

    #[test]
    fn empty_rating_question_yields_no_finding() {
        let questions = vec![rating_question("Setup", 1, 5, &[])];
        let insight = generate_insights(
            &results(SurveyKind::QuickPoll, 0, 0.0, questions),
            &InsightRules::default(),
        );
        assert!(insight.key_findings.is_empty());
        assert_eq!(
            insight.summary,
            "Survey \"Launch feedback\" received 0 responses (0.0% completion)."
        );
    }

    #[test]
    fn dominant_choice_and_common_feedback_are_reported() {
        let picks = [json!("Annual"), json!("Annual"), json!("Monthly")];
        let pick_refs: Vec<&Value> = picks.iter().collect();
        let notes = [json!("More Integrations"), json!("more integrations ")];
        let note_refs: Vec<&Value> = notes.iter().collect();
        let questions = vec![
            QuestionResult {
                question_id: QuestionId("q-plan".to_string()),
                question_text: "Billing cycle".to_string(),
                question_type: QuestionKind::MultipleChoice,
                answer_count: 3,
                summary: QuestionSummary::MultipleChoice(summarize_choices(
                    &["Monthly".to_string(), "Annual".to_string()],
                    &pick_refs,
                )),
            },
            QuestionResult {
                question_id: QuestionId("q-notes".to_string()),
                question_text: "Anything else?".to_string(),
                question_type: QuestionKind::OpenText,
                answer_count: 2,
                summary: QuestionSummary::OpenText(summarize_text(&note_refs)),
            },
        ];

        let insight = generate_insights(
            &results(SurveyKind::QuickPoll, 3, 75.0, questions),
            &InsightRules::default(),
        );

        assert_eq!(
            insight.key_findings,
            vec![
                "Dominant preference: Annual (66.7%) on \"Billing cycle\"".to_string(),
                "Most common feedback: \"more integrations\"".to_string(),
            ]
        );
        assert!(insight.summary.ends_with(
            "Key finding: Dominant preference: Annual (66.7%) on \"Billing cycle\"."
        ));
        assert!(insight.recommendations.is_empty());
    }

    #[test]
    fn low_completion_recommends_shortening() {
        let insight = generate_insights(
            &results(SurveyKind::QuickPoll, 1, 20.0, Vec::new()),
            &InsightRules::default(),
        );
        assert!(insight.recommendations[0].contains("shortening"));
    }

    #[test]
    fn nps_uses_completed_responses_as_denominator() {
        let scores: Vec<Value> = [10, 9, 9, 10, 9, 10, 7, 8, 3, 6]
            .iter()
            .map(|score| json!(score))
            .collect();
        let questions = vec![rating_question("Recommend us?", 0, 10, &scores)];
        let insight = generate_insights(
            &results(SurveyKind::Nps, 10, 100.0, questions),
            &InsightRules::default(),
        );

        let nps = insight.nps.expect("nps computed");
        assert_eq!(nps.promoters, 6);
        assert_eq!(nps.detractors, 2);
        assert_eq!(nps.passives, 2);
        assert_eq!(nps.score, 40.0);
        assert!(insight
            .key_findings
            .iter()
            .any(|finding| finding.starts_with("Net Promoter Score: 40.0")));
    }

    #[test]
    fn nps_is_skipped_for_other_survey_kinds() {
        let questions = vec![rating_question("Recommend us?", 0, 10, &[json!(10)])];
        let insight = generate_insights(
            &results(SurveyKind::DetailedSurvey, 1, 100.0, questions),
            &InsightRules::default(),
        );
        assert!(insight.nps.is_none());
    }
}
