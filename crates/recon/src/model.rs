use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ReconError, Result};

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Canonical text for codes and name filters: trimmed, integral numbers
    /// rendered without a decimal point, empty cells as "".
    pub fn key_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.trim().to_string(),
            Self::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => number_json(*n),
            Self::Text(s) => Value::String(s.clone()),
            Self::DateTime(dt) => Value::String(dt.format(DATETIME_FORMAT).to_string()),
        }
    }

    fn kind(&self) -> ColumnKind {
        match self {
            Self::Empty => ColumnKind::Empty,
            Self::Bool(_) => ColumnKind::Bool,
            Self::Number(_) => ColumnKind::Number,
            Self::Text(_) => ColumnKind::Text,
            Self::DateTime(_) => ColumnKind::DateTime,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_text())
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Integers without decimals, everything else via `f64`'s shortest form.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// JSON number, integral values emitted as integers; non-finite values as null.
pub fn number_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// Value type observed in a column, ignoring empty cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Empty,
    Bool,
    Number,
    Text,
    DateTime,
    Mixed,
}

/// Tabular data: uniquely named columns and rows of equal width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut dataset = Self::with_columns(columns)?;
        dataset.rows.reserve(rows.len());
        for row in rows {
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    pub fn with_columns(columns: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(ReconError::InvalidDataset(format!(
                    "duplicate column name '{name}'"
                )));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(ReconError::InvalidDataset(format!(
                "row {} has {} cells, expected {}",
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Cells of one column, top to bottom.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().filter_map(move |r| r.get(col))
    }

    /// Rewrite every cell of one column in place.
    pub fn map_column(&mut self, col: usize, mut f: impl FnMut(&Cell) -> Cell) {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(col) {
                *cell = f(cell);
            }
        }
    }

    pub fn column_kind(&self, col: usize) -> ColumnKind {
        let mut kind = ColumnKind::Empty;
        for cell in self.column_values(col) {
            match (kind, cell.kind()) {
                (_, ColumnKind::Empty) => {}
                (ColumnKind::Empty, k) => kind = k,
                (current, k) if current == k => {}
                _ => return ColumnKind::Mixed,
            }
        }
        kind
    }

    /// One row as an ordered column → value object.
    pub fn record(&self, row: usize) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(cells) = self.rows.get(row) {
            for (name, cell) in self.columns.iter().zip(cells) {
                map.insert(name.clone(), cell.to_json());
            }
        }
        map
    }

    /// First `n` rows as records.
    pub fn head(&self, n: usize) -> Vec<Map<String, Value>> {
        (0..self.rows.len().min(n)).map(|i| self.record(i)).collect()
    }
}

// ---------------------------------------------------------------------------
// Reconciliation output
// ---------------------------------------------------------------------------

/// One (dealer, site) row of a reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub dealer_code: String,
    pub site_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(serialize_with = "serialize_number")]
    pub target_sales: f64,
    #[serde(serialize_with = "serialize_number")]
    pub actual_sales: f64,
    pub met_target: bool,
}

/// Evidence that the inputs were used whole; does not affect the join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconDiagnostics {
    pub target_rows: usize,
    pub actual_rows: usize,
    pub missing_target_cells: usize,
    pub missing_actual_cells: usize,
    /// Aggregated target keys with no actual counterpart.
    pub unmatched_target: usize,
    /// Aggregated actual keys with no target counterpart.
    pub unmatched_actual: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconResult {
    pub merged_key: String,
    pub target_key: String,
    pub actual_key: String,
    pub merge_columns: Vec<String>,
    pub target_quantity_column: String,
    pub actual_quantity_column: String,
    pub record_count: usize,
    pub met_count: usize,
    /// Percent of records meeting target, one decimal.
    pub met_rate: f64,
    pub summary_text: String,
    pub diagnostics: ReconDiagnostics,
    pub records: Vec<MergedRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub merged_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_filter: Option<String>,
    pub record_count: usize,
    pub met_count: usize,
    /// Percent of records meeting target, one decimal.
    pub met_rate: f64,
    #[serde(serialize_with = "serialize_number")]
    pub total_target: f64,
    #[serde(serialize_with = "serialize_number")]
    pub total_actual: f64,
    /// total_actual / total_target × 100, one decimal.
    pub overall_rate: f64,
    pub summary_text: String,
}

fn serialize_number<S: Serializer>(n: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    number_json(*n).serialize(serializer)
}
