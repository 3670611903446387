use super::domain::{rating_scale_in_bounds, QuestionConfig};
use super::normalizer::{choice_sequence, matrix_scores, rating_value, text_value};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionTally {
    pub option: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceSummary {
    /// Answers whose first selection matched a declared option.
    pub responses: usize,
    pub options: Vec<OptionTally>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingBucket {
    pub value: i64,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    pub responses: usize,
    pub average: f64,
    pub median: f64,
    pub min: i64,
    pub max: i64,
    pub distribution: Vec<RatingBucket>,
}

impl RatingSummary {
    /// Number of valid answers whose value satisfies `predicate`.
    pub fn count_where(&self, predicate: impl Fn(i64) -> bool) -> usize {
        self.distribution
            .iter()
            .filter(|bucket| predicate(bucket.value))
            .map(|bucket| bucket.count)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextEntry {
    pub text: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSummary {
    pub responses: usize,
    pub entries: Vec<TextEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub item: String,
    pub average_rank: f64,
    pub times_ranked: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingSummary {
    pub responses: usize,
    pub items: Vec<RankedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixCell {
    pub column: String,
    pub average: f64,
    pub responses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub row: String,
    pub cells: Vec<MatrixCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixSummary {
    pub responses: usize,
    pub rows: Vec<MatrixRow>,
}

/// Aggregated view of every answer given to one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionSummary {
    MultipleChoice(ChoiceSummary),
    RatingScale(RatingSummary),
    OpenText(TextSummary),
    Ranking(RankingSummary),
    Matrix(MatrixSummary),
}

pub fn summarize(config: &QuestionConfig, answers: &[&Value]) -> QuestionSummary {
    match config {
        QuestionConfig::MultipleChoice { options } => {
            QuestionSummary::MultipleChoice(summarize_choices(options, answers))
        }
        QuestionConfig::RatingScale { min, max, .. } => {
            QuestionSummary::RatingScale(summarize_ratings(*min, *max, answers))
        }
        QuestionConfig::OpenText => QuestionSummary::OpenText(summarize_text(answers)),
        QuestionConfig::Ranking { items } => {
            QuestionSummary::Ranking(summarize_ranking(items, answers))
        }
        QuestionConfig::Matrix { rows, columns } => {
            QuestionSummary::Matrix(summarize_matrix(rows, columns, answers))
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(count as f64 / total as f64 * 100.0)
    }
}

pub fn summarize_choices(options: &[String], answers: &[&Value]) -> ChoiceSummary {
    let mut counts = vec![0usize; options.len()];
    let mut responses = 0;

    for answer in answers {
        let first = choice_sequence(answer).into_iter().next();
        match first.and_then(|choice| options.iter().position(|option| *option == choice)) {
            Some(index) => {
                counts[index] += 1;
                responses += 1;
            }
            None => debug!(?answer, "excluding multiple-choice answer without a declared option"),
        }
    }

    let mut tallies: Vec<OptionTally> = options
        .iter()
        .zip(counts)
        .map(|(option, count)| OptionTally {
            option: option.clone(),
            count,
            percentage: percentage(count, responses),
        })
        .collect();
    tallies.sort_by(|a, b| b.count.cmp(&a.count));

    ChoiceSummary {
        responses,
        options: tallies,
    }
}

pub fn summarize_ratings(scale_min: i64, scale_max: i64, answers: &[&Value]) -> RatingSummary {
    let mut values: Vec<i64> = answers
        .iter()
        .filter_map(|answer| rating_value(answer))
        .filter(|value| (scale_min..=scale_max).contains(value))
        .collect();

    let excluded = answers.len() - values.len();
    if excluded > 0 {
        debug!(excluded, "excluding rating answers that are not integers on the scale");
    }

    if values.is_empty() {
        return RatingSummary {
            responses: 0,
            average: 0.0,
            median: 0.0,
            min: scale_min,
            max: scale_max,
            distribution: Vec::new(),
        };
    }

    values.sort_unstable();
    let count = values.len();
    let sum: i128 = values.iter().map(|value| i128::from(*value)).sum();
    let average = round2(sum as f64 / count as f64);
    let mid = count / 2;
    let median = if count % 2 == 0 {
        (i128::from(values[mid - 1]) + i128::from(values[mid])) as f64 / 2.0
    } else {
        values[mid] as f64
    };

    let mut observed: BTreeMap<i64, usize> = BTreeMap::new();
    for value in &values {
        *observed.entry(*value).or_default() += 1;
    }
    let bucket = |value: i64, hits: usize| RatingBucket {
        value,
        count: hits,
        percentage: percentage(hits, count),
    };
    // Scales too wide to enumerate only list the values actually given.
    let distribution = if rating_scale_in_bounds(scale_min, scale_max) {
        (scale_min..=scale_max)
            .map(|value| bucket(value, observed.get(&value).copied().unwrap_or(0)))
            .collect()
    } else {
        observed
            .iter()
            .map(|(value, hits)| bucket(*value, *hits))
            .collect()
    };

    RatingSummary {
        responses: count,
        average,
        median,
        min: values[0],
        max: values[count - 1],
        distribution,
    }
}

pub fn summarize_text(answers: &[&Value]) -> TextSummary {
    let mut entries: Vec<TextEntry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut responses = 0;

    for text in answers.iter().filter_map(|answer| text_value(answer)) {
        responses += 1;
        match positions.get(&text) {
            Some(&index) => entries[index].count += 1,
            None => {
                positions.insert(text.clone(), entries.len());
                entries.push(TextEntry { text, count: 1 });
            }
        }
    }

    entries.sort_by(|a, b| b.count.cmp(&a.count));

    TextSummary { responses, entries }
}

pub fn summarize_ranking(items: &[String], answers: &[&Value]) -> RankingSummary {
    let mut positions: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    let mut responses = 0;

    for answer in answers {
        let ranked = choice_sequence(answer);
        if ranked.is_empty() {
            continue;
        }
        responses += 1;
        for (slot, item) in positions.iter_mut().zip(items) {
            if let Some(index) = ranked.iter().position(|candidate| candidate == item) {
                slot.push(index + 1);
            }
        }
    }

    let mut ranked_items: Vec<RankedItem> = items
        .iter()
        .zip(positions)
        .map(|(item, ranks)| {
            let average_rank = if ranks.is_empty() {
                0.0
            } else {
                ranks.iter().sum::<usize>() as f64 / ranks.len() as f64
            };
            RankedItem {
                item: item.clone(),
                average_rank,
                times_ranked: ranks.len(),
            }
        })
        .collect();

    // Never-ranked items average 0 and therefore lead the list.
    ranked_items.sort_by(|a, b| a.average_rank.total_cmp(&b.average_rank));

    RankingSummary {
        responses,
        items: ranked_items,
    }
}

pub fn summarize_matrix(rows: &[String], columns: &[String], answers: &[&Value]) -> MatrixSummary {
    let decoded: Vec<_> = answers
        .iter()
        .map(|answer| matrix_scores(answer))
        .filter(|scores| !scores.is_empty())
        .collect();

    let matrix_rows = rows
        .iter()
        .map(|row| {
            let cells = columns
                .iter()
                .map(|column| {
                    let scores: Vec<f64> = decoded
                        .iter()
                        .filter_map(|answer| answer.get(row).and_then(|cells| cells.get(column)))
                        .copied()
                        .collect();
                    let average = if scores.is_empty() {
                        0.0
                    } else {
                        round2(scores.iter().sum::<f64>() / scores.len() as f64)
                    };
                    MatrixCell {
                        column: column.clone(),
                        average,
                        responses: scores.len(),
                    }
                })
                .collect();
            MatrixRow {
                row: row.clone(),
                cells,
            }
        })
        .collect();

    MatrixSummary {
        responses: decoded.len(),
        rows: matrix_rows,
    }
}
