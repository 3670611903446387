use super::aggregate::QuestionSummary;
use super::results::SurveyResults;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    pub fn content_type(self) -> mime::Mime {
        match self {
            Self::Json => mime::APPLICATION_JSON,
            Self::Csv => mime::TEXT_CSV_UTF_8,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encoded results plus the metadata a download endpoint needs.
#[derive(Debug, Clone)]
pub struct ExportDocument {
    pub filename: String,
    pub content_type: mime::Mime,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("unsupported export format '{0}'")]
    UnknownFormat(String),
    #[error("failed to encode results as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to encode results as CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV output was not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("failed to flush CSV output: {0}")]
    Io(#[from] std::io::Error),
}

pub fn export(results: &SurveyResults, format: ExportFormat) -> Result<ExportDocument, ExportError> {
    let body = match format {
        ExportFormat::Json => to_json(results)?,
        ExportFormat::Csv => to_csv(results)?,
    };

    Ok(ExportDocument {
        filename: format!("survey-{}-results.{}", results.survey.id, format.extension()),
        content_type: format.content_type(),
        body,
    })
}

pub fn to_json(results: &SurveyResults) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Header plus one row per question. Fields containing commas or quotes are
/// quoted with embedded quotes doubled.
pub fn to_csv(results: &SurveyResults) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(["Question", "Type", "Response Count", "Details"])?;
    for question in &results.questions {
        let count = question.answer_count.to_string();
        let details = render_details(&question.summary);
        writer.write_record([
            question.question_text.as_str(),
            question.question_type.label(),
            count.as_str(),
            details.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Flattens a summary into the single-cell form used by the tabular export.
pub fn render_details(summary: &QuestionSummary) -> String {
    match summary {
        QuestionSummary::MultipleChoice(choices) => choices
            .options
            .iter()
            .map(|tally| format!("{}: {} ({:.1}%)", tally.option, tally.count, tally.percentage))
            .collect::<Vec<_>>()
            .join("; "),
        QuestionSummary::RatingScale(rating) => format!(
            "Average: {:.2}, Median: {}, Range: {}-{}",
            rating.average, rating.median, rating.min, rating.max
        ),
        QuestionSummary::OpenText(text) => text
            .entries
            .iter()
            .map(|entry| format!("{} ({})", entry.text, entry.count))
            .collect::<Vec<_>>()
            .join("; "),
        QuestionSummary::Ranking(ranking) => ranking
            .items
            .iter()
            .map(|item| format!("{}: avg rank {:.2}", item.item, item.average_rank))
            .collect::<Vec<_>>()
            .join("; "),
        QuestionSummary::Matrix(matrix) => matrix
            .rows
            .iter()
            .flat_map(|row| {
                row.cells
                    .iter()
                    .map(move |cell| format!("{} / {}: {:.2}", row.row, cell.column, cell.average))
            })
            .collect::<Vec<_>>()
            .join("; "),
    }
}
