//! Parse free-text model replies into rows.
//!
//! The model is asked for a JSON array but answers in prose, markdown fences
//! or both. The longest bracketed (or braced) region of the reply is taken
//! as the payload, decoded, and checked for the required columns.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{ExtractionError, Result};
use crate::types::table::{coerce_number, label_matches, lookup, ColumnLabels, RawRow};

static ARRAY_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[.*?\]").unwrap());
static OBJECT_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*?\}").unwrap());

/// Delimiters of a JSON block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `[ ... ]`
    Array,
    /// `{ ... }`
    Object,
}

impl BlockKind {
    fn regex(self) -> &'static Regex {
        match self {
            BlockKind::Array => &ARRAY_BLOCK,
            BlockKind::Object => &OBJECT_BLOCK,
        }
    }

    fn delimiters(self) -> (char, char) {
        match self {
            BlockKind::Array => ('[', ']'),
            BlockKind::Object => ('{', '}'),
        }
    }
}

/// Return the longest non-overlapping, shortest-closing delimited region.
///
/// Ties go to the earliest region. No region at all is `NoJsonFound`.
pub fn extract_json_block(text: &str, kind: BlockKind) -> Result<&str> {
    let mut best: Option<(&str, usize)> = None;
    for m in kind.regex().find_iter(text) {
        let len = m.as_str().chars().count();
        if best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((m.as_str(), len));
        }
    }
    best.map(|(block, _)| block).ok_or(ExtractionError::NoJsonFound)
}

/// Decode a block; when the lazy match stopped at a nested closing
/// delimiter, retry on the widest span from the first opener to the last closer.
fn decode_block(text: &str, kind: BlockKind) -> Result<Value> {
    let block = extract_json_block(text, kind)?;
    match serde_json::from_str(block) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let (open, close) = kind.delimiters();
            let widest = text
                .find(open)
                .zip(text.rfind(close))
                .filter(|(start, end)| start < end)
                .map(|(start, end)| &text[start..=end]);

            match widest {
                Some(span) if span != block => {
                    serde_json::from_str(span).map_err(|_| ExtractionError::InvalidJson(first_err))
                }
                _ => Err(ExtractionError::InvalidJson(first_err)),
            }
        }
    }
}

fn into_rows(value: Value) -> Result<Vec<RawRow>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(row) => Ok(row),
                other => Err(ExtractionError::UnexpectedShape(format!(
                    "row {} is {}, expected an object",
                    i + 1,
                    json_type(&other)
                ))),
            })
            .collect(),
        Value::Object(object) => Ok(vec![object]),
        other => Err(ExtractionError::UnexpectedShape(format!(
            "expected an array of rows, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Labels from `required` that some row does not carry.
fn missing_columns(rows: &[RawRow], required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|label| rows.iter().any(|row| lookup(row, label).is_none()))
        .map(|label| label.to_string())
        .collect()
}

/// Parse a model reply into rows carrying at least the reference and quantity columns.
///
/// An array block is preferred, so a wrapper such as `{"rows": [...]}` yields
/// its inner array. A reply holding only an object is read as a single row.
pub fn parse_rows(text: &str, labels: &ColumnLabels) -> Result<Vec<RawRow>> {
    let value = match decode_block(text, BlockKind::Array) {
        Err(ExtractionError::NoJsonFound) => decode_block(text, BlockKind::Object)?,
        other => other?,
    };

    let rows = into_rows(value)?;

    let missing = missing_columns(&rows, &labels.required());
    if !missing.is_empty() {
        return Err(ExtractionError::MissingColumns { missing });
    }

    Ok(rows)
}

/// Read `{"total": <number>}` out of a free-text reply.
///
/// `null` or an unparseable value means the document states no total.
pub fn parse_declared_total(text: &str) -> Result<Option<f64>> {
    let value = decode_block(text, BlockKind::Object)?;
    let object = value.as_object().ok_or_else(|| {
        ExtractionError::UnexpectedShape(format!("expected an object, got {}", json_type(&value)))
    })?;

    let total = object
        .iter()
        .find(|(key, _)| label_matches(key, "total"))
        .map(|(_, v)| v)
        .ok_or_else(|| ExtractionError::MissingColumns {
            missing: vec!["total".to_string()],
        })?;

    Ok(coerce_number(total))
}
