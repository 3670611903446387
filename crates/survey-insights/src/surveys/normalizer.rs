//! Decoding of stored answer payloads into the shapes each aggregator expects.
//!
//! Nothing here fails. A value that does not fit its question's shape comes
//! back empty (or `None`) and the aggregators simply skip it.

use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Answers are sometimes persisted as JSON text inside a string column.
fn decode_stored(value: &Value) -> Cow<'_, Value> {
    if let Value::String(raw) = value {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
                return Cow::Owned(parsed);
            }
        }
    }
    Cow::Borrowed(value)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Ordered selections for multiple-choice and ranking answers.
pub(crate) fn choice_sequence(value: &Value) -> Vec<String> {
    match decode_stored(value).as_ref() {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_text)
            .filter(|item| !item.is_empty())
            .collect(),
        other => scalar_text(other)
            .filter(|item| !item.is_empty())
            .into_iter()
            .collect(),
    }
}

pub(crate) fn rating_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(raw) => raw.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Lower-cased, trimmed free text; blank input yields `None`.
pub(crate) fn text_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Number(_) | Value::Bool(_) => value.to_string(),
        _ => return None,
    };
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn score_value(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    score.is_finite().then_some(score)
}

/// Row -> column -> score, keeping only cells whose score parses.
pub(crate) fn matrix_scores(value: &Value) -> BTreeMap<String, BTreeMap<String, f64>> {
    let mut scores = BTreeMap::new();
    let decoded = decode_stored(value);
    let Value::Object(rows) = decoded.as_ref() else {
        return scores;
    };

    for (row, columns) in rows {
        let Value::Object(columns) = columns else {
            continue;
        };
        let cells: BTreeMap<String, f64> = columns
            .iter()
            .filter_map(|(column, score)| score_value(score).map(|score| (column.clone(), score)))
            .collect();
        if !cells.is_empty() {
            scores.insert(row.clone(), cells);
        }
    }

    scores
}
