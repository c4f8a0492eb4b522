//! Flattens Typeform responses into scalar rows and aligns them into a table.
//!
//! Answer values are read from the key named after the answer's `type`.
//! Recognised types: `text`, `number`, `date`, `choice`, `choices`.
//! Any other type is skipped with a warning.

use serde_json::Value;
use tracing::warn;

use crate::domain::error::{EtlError, Result};
use crate::domain::survey::{Answer, FormResponse, RESPONSE_ID_COLUMN, SUBMITTED_AT_COLUMN};
use crate::domain::table::{Cell, Table};

const CHOICE_SEPARATOR: &str = ", ";

/// Ordered column -> cell mapping for a single response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRow {
    entries: Vec<(String, Cell)>,
}

impl FlatRow {
    /// Inserts or overwrites `key`. An overwritten key keeps its position.
    pub fn set(&mut self, key: &str, cell: Cell) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = cell,
            None => self.entries.push((key.to_string(), cell)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Cell> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, c)| c)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn flatten_responses(items: &[FormResponse]) -> Result<Vec<FlatRow>> {
    items.iter().map(flatten_response).collect()
}

pub fn flatten_response(item: &FormResponse) -> Result<FlatRow> {
    let mut row = FlatRow::default();
    row.set(SUBMITTED_AT_COLUMN, Cell::from(item.submitted_at.as_str()));
    row.set(RESPONSE_ID_COLUMN, Cell::from(item.response_id.as_str()));

    for answer in item.answers() {
        match extract_answer(answer).map_err(|reason| {
            EtlError::Transform(format!(
                "response '{}', question '{}': {}",
                item.response_id,
                answer.question_id(),
                reason
            ))
        })? {
            Some(cell) => row.set(answer.question_id(), cell),
            None => warn!(
                answer_type = %answer.kind,
                question_id = %answer.question_id(),
                response_id = %item.response_id,
                "Skipping answer with unsupported type"
            ),
        }
    }

    Ok(row)
}

/// `Ok(None)` means the answer type is not one we flatten.
fn extract_answer(answer: &Answer) -> std::result::Result<Option<Cell>, String> {
    let kind = answer.kind.as_str();
    if !matches!(kind, "text" | "number" | "date" | "choice" | "choices") {
        return Ok(None);
    }

    let value = answer
        .value()
        .ok_or_else(|| format!("'{}' answer has no '{}' value", kind, kind))?;

    let cell = match kind {
        "text" | "date" => Cell::Text(expect_str(value, kind)?.to_string()),
        "number" => match value {
            Value::Number(n) => Cell::from_number(n),
            other => return Err(format!("expected a number, got {}", other)),
        },
        "choice" => Cell::Text(choice_label(value)?),
        _ => Cell::Text(choice_labels(value)?.join(CHOICE_SEPARATOR)),
    };

    Ok(Some(cell))
}

fn expect_str<'a>(value: &'a Value, kind: &str) -> std::result::Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string for '{}', got {}", kind, value))
}

/// Single choice: the selected `label`, or the free-text `other` entry.
fn choice_label(value: &Value) -> std::result::Result<String, String> {
    value
        .get("label")
        .or_else(|| value.get("other"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("choice without a label: {}", value))
}

/// Multiple choice: every label in API order, then the `other` entry if any.
/// Labels may be plain strings or objects carrying `label`.
fn choice_labels(value: &Value) -> std::result::Result<Vec<String>, String> {
    let other = value.get("other").and_then(Value::as_str);
    let mut labels = match value.get("labels") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Object(_) => item
                    .get("label")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| format!("choice without a label: {}", item)),
                unexpected => Err(format!("unexpected choice label {}", unexpected)),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None if other.is_some() => Vec::new(),
        _ => return Err(format!("choices without a labels list: {}", value)),
    };

    if let Some(other) = other {
        labels.push(other.to_string());
    }
    Ok(labels)
}

/// Union of keys over all rows, in first-seen order.
pub fn column_union(rows: &[FlatRow]) -> Vec<String> {
    let mut columns = vec![
        SUBMITTED_AT_COLUMN.to_string(),
        RESPONSE_ID_COLUMN.to_string(),
    ];
    for row in rows {
        for key in row.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.to_string());
            }
        }
    }
    columns
}

pub fn build_table(rows: &[FlatRow]) -> Table {
    let mut table = Table::new(column_union(rows));
    for row in rows {
        let cells = table
            .columns
            .iter()
            .map(|column| row.get(column).cloned())
            .collect();
        table.push_row(cells);
    }
    table
}
