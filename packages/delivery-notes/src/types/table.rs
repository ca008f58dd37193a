//! Row-structured delivery tables.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// A decoded model row: column label to raw JSON value.
pub type RawRow = Map<String, Value>;

/// Column labels used in prompts, parsing and exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLabels {
    pub reference: String,
    pub cartons: String,
    pub quantity: String,
    pub check: String,
}

impl Default for ColumnLabels {
    fn default() -> Self {
        Self {
            reference: "Référence produit / 产品参考".to_string(),
            cartons: "Nombre de cartons / 箱数".to_string(),
            quantity: "Nombre de produits / 产品数量".to_string(),
            check: "Vérification / 校验".to_string(),
        }
    }
}

impl ColumnLabels {
    /// Labels in export order.
    pub fn headers(&self) -> [&str; 4] {
        [&self.reference, &self.cartons, &self.quantity, &self.check]
    }

    /// Labels every row must carry.
    pub fn required(&self) -> [&str; 2] {
        [&self.reference, &self.quantity]
    }
}

/// Whether a key written by the model (or found in a header row) names `label`.
///
/// Exact match first, then case-insensitive on the whole label or on either
/// side of a bilingual `"fr / zh"` label.
pub fn label_matches(key: &str, label: &str) -> bool {
    if key == label {
        return true;
    }
    let key = key.trim().to_lowercase();
    let label = label.trim().to_lowercase();
    if key == label {
        return true;
    }
    label
        .split(" / ")
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .any(|part| part == key)
}

/// Look up `label` in a row, tolerating small key variations.
pub fn lookup<'a>(row: &'a RawRow, label: &str) -> Option<&'a Value> {
    row.get(label).or_else(|| {
        row.iter()
            .find(|(key, _)| label_matches(key, label))
            .map(|(_, value)| value)
    })
}

/// Coerce a JSON value to a number; anything unparseable becomes `None`.
///
/// Strings may carry regular, non-breaking or thin spaces as digit group
/// separators. When both dots and commas appear, the last one is the decimal
/// separator. A lone comma is a decimal separator unless exactly three
/// digits follow it, in which case it groups thousands.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => coerce_str(s),
        _ => None,
    }
}

pub(crate) fn coerce_str(s: &str) -> Option<f64> {
    let mut cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    match (cleaned.rfind('.'), cleaned.rfind(',')) {
        // "1.080,50": dots group, the comma is decimal
        (Some(dot), Some(comma)) if comma > dot => {
            cleaned = cleaned.replace('.', "").replace(',', ".");
        }
        // "1,080.50": commas group
        (Some(_), Some(_)) => cleaned = cleaned.replace(',', ""),
        (None, Some(_)) if cleaned.matches(',').count() == 1 => {
            let decimals = cleaned.rsplit(',').next().map_or(0, str::len);
            cleaned = if decimals == 3 {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            };
        }
        _ => {}
    }

    let parsed = cleaned.parse::<f64>().ok().filter(|v| v.is_finite());
    if parsed.is_none() {
        debug!(value = %s, "Not a number, left out of the sum");
    }
    parsed
}

fn value_to_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

/// Render a number the way a spreadsheet user expects: integers without decimals.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// A spreadsheet or CSV cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => coerce_str(s),
            Cell::Empty => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => format_number(*n),
            Cell::Text(s) => s.clone(),
        }
    }
}

/// One line of a delivery note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryLine {
    pub reference: String,
    pub cartons: Option<f64>,
    pub quantity: Option<f64>,
    pub check: String,
    /// First page of the group the line was extracted from
    pub source_page: Option<usize>,
}

impl DeliveryLine {
    pub fn new(reference: impl Into<String>, quantity: Option<f64>) -> Self {
        Self {
            reference: reference.into(),
            cartons: None,
            quantity,
            check: String::new(),
            source_page: None,
        }
    }

    pub fn with_cartons(mut self, cartons: Option<f64>) -> Self {
        self.cartons = cartons;
        self
    }

    pub fn with_check(mut self, check: impl Into<String>) -> Self {
        self.check = check.into();
        self
    }

    /// Build a line from a decoded model row.
    pub fn from_raw(row: &RawRow, labels: &ColumnLabels, source_page: Option<usize>) -> Self {
        Self {
            reference: value_to_text(lookup(row, &labels.reference)),
            cartons: lookup(row, &labels.cartons).and_then(coerce_number),
            quantity: lookup(row, &labels.quantity).and_then(coerce_number),
            check: value_to_text(lookup(row, &labels.check)),
            source_page,
        }
    }

    /// A line whose reference announces the document total.
    pub fn is_total(&self) -> bool {
        self.reference.to_lowercase().contains("total")
    }
}

/// The extracted table for a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTable {
    pub labels: ColumnLabels,
    lines: Vec<DeliveryLine>,
}

impl DeliveryTable {
    pub fn new(labels: ColumnLabels) -> Self {
        Self {
            labels,
            lines: Vec::new(),
        }
    }

    /// Build a table from decoded model rows.
    pub fn from_rows(rows: &[RawRow], labels: &ColumnLabels, source_page: Option<usize>) -> Self {
        let lines = rows
            .iter()
            .map(|row| DeliveryLine::from_raw(row, labels, source_page))
            .collect();
        Self {
            labels: labels.clone(),
            lines,
        }
    }

    pub fn with_lines(mut self, lines: impl IntoIterator<Item = DeliveryLine>) -> Self {
        self.lines.extend(lines);
        self
    }

    pub fn push(&mut self, line: DeliveryLine) {
        self.lines.push(line);
    }

    /// Append another table's lines, keeping their order.
    pub fn extend(&mut self, other: DeliveryTable) {
        self.lines.extend(other.lines);
    }

    pub fn lines(&self) -> &[DeliveryLine] {
        &self.lines
    }

    /// Lines that are not totals.
    pub fn item_lines(&self) -> impl Iterator<Item = &DeliveryLine> {
        self.lines.iter().filter(|l| !l.is_total())
    }

    /// Lines announcing a total.
    pub fn total_lines(&self) -> impl Iterator<Item = &DeliveryLine> {
        self.lines.iter().filter(|l| l.is_total())
    }

    /// Largest quantity among the total lines, if any carries one.
    pub fn declared_total(&self) -> Option<f64> {
        self.total_lines()
            .filter_map(|l| l.quantity)
            .fold(None, |max: Option<f64>, q| Some(max.map_or(q, |m| m.max(q))))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
