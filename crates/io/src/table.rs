// Raw grid -> Dataset: header detection, header naming, text cell typing

use std::collections::HashSet;

use salesgrid_recon::model::{Cell, Dataset};

use crate::error::Result;

/// Turn a raw grid into a dataset.
///
/// The first row holding any value is the header. Blank header cells become
/// `Unnamed: N` and repeats get a `.1`, `.2` suffix. Rows after the header
/// with no values at all are skipped; short rows are padded with empties.
pub fn build_dataset(grid: Vec<Vec<Cell>>) -> Result<Dataset> {
    let mut rows = grid
        .into_iter()
        .filter(|r| r.iter().any(|c| !c.is_empty()));
    let Some(header) = rows.next() else {
        return Ok(Dataset::default());
    };
    let body: Vec<Vec<Cell>> = rows.collect();
    let width = body
        .iter()
        .map(|r| last_value(r))
        .chain(std::iter::once(last_value(&header)))
        .max()
        .unwrap_or(0);

    let mut dataset = Dataset::with_columns(header_names(&header, width))?;
    for mut row in body {
        row.resize(width, Cell::Empty);
        dataset.push_row(row)?;
    }
    Ok(dataset)
}

/// Width up to the last non-empty cell.
fn last_value(row: &[Cell]) -> usize {
    row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1)
}

fn header_names(header: &[Cell], width: usize) -> Vec<String> {
    let base: Vec<String> = (0..width)
        .map(|i| match header.get(i).map(Cell::key_text) {
            Some(name) if !name.is_empty() => name,
            _ => format!("Unnamed: {i}"),
        })
        .collect();

    let mut taken: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(width);
    for name in base {
        let mut candidate = name.clone();
        let mut n = 0;
        while taken.contains(&candidate) {
            n += 1;
            candidate = format!("{name}.{n}");
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

/// Type one text field: trimmed, empty -> `Empty`, numbers -> `Number`.
///
/// Codes with a leading zero (`0012`) stay text so they join against the
/// same code stored as text elsewhere.
pub fn parse_text_cell(raw: &str) -> Cell {
    let s = raw.trim();
    if s.is_empty() {
        return Cell::Empty;
    }
    if has_leading_zero(s) {
        return Cell::text(s);
    }
    match s.parse::<f64>() {
        Ok(n) if n.is_finite() && looks_numeric(s) => Cell::Number(n),
        _ => Cell::text(s),
    }
}

fn has_leading_zero(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.")
}

/// Rejects words Rust's float parser accepts, like `inf` or `NaN`.
fn looks_numeric(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}
